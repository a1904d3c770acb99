use std::convert::Infallible;
use std::io;

use crate::Family;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not a valid OSC URL: {0:?}")]
    MalformedUrl(String),

    #[error("protocol '{0}' not supported by this version")]
    UnsupportedTransport(String),

    #[error("invalid protocol identifier: {0}")]
    InvalidProtocol(String),

    #[error("{message}")]
    Resolve { code: i32, message: String },

    #[error("failed to enumerate network interfaces: {0}")]
    Enumerate(#[source] io::Error),

    #[error("no matching network interface")]
    NoMatchingInterface,

    #[error("unparseable IP address: {0:?}")]
    UnparseableIp(String),

    #[error("IP address {ip} is not an {family} address")]
    WrongFamily { ip: String, family: Family },

    #[error("cannot determine address family")]
    UnknownFamily,
}

#[rustfmt::skip]
impl Error {
    pub const NO_MATCHING_INTERFACE: i32 = 1;
    pub const UNKNOWN_FAMILY:        i32 = 2;
    pub const WRONG_FAMILY:          i32 = 3;
    pub const UNPARSEABLE_IP:        i32 = 4;
    pub const ENUMERATE:             i32 = 5;
}

impl Error {
    /// Numeric code stored in an address' error slot.
    ///
    /// Interface errors use small fixed codes, resolution errors carry the
    /// `EAI_*` value from the resolver and the remaining kinds map onto errno.
    #[rustfmt::skip]
    pub fn code(&self) -> i32 {
        match self {
            Self::MalformedUrl(_)         => libc::EINVAL,
            Self::UnsupportedTransport(_) => libc::EPROTONOSUPPORT,
            Self::InvalidProtocol(_)      => libc::EPROTONOSUPPORT,
            Self::Resolve { code, .. }    => *code,
            Self::Enumerate(_)            => Self::ENUMERATE,
            Self::NoMatchingInterface     => Self::NO_MATCHING_INTERFACE,
            Self::UnparseableIp(_)        => Self::UNPARSEABLE_IP,
            Self::WrongFamily { .. }      => Self::WRONG_FAMILY,
            Self::UnknownFamily           => Self::UNKNOWN_FAMILY,
        }
    }
}

impl From<Infallible> for Error {
    fn from(value: Infallible) -> Self {
        match value {}
    }
}
