//! Endpoint addresses for OSC transports.
//!
//! An [`Address`] is built from an OSC URL such as `osc.udp://localhost:9000/`
//! or from an explicit protocol/host/port triple. It can be resolved into the
//! operating system's candidate socket addresses and pinned to a local network
//! interface before being handed to a transport.
//!
//! Every operation here is synchronous. Resolution and interface enumeration
//! block the calling thread.

pub mod address;
pub mod error;
pub mod iface;
pub mod resolve;
pub mod url;

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

pub use address::{Address, LastError, TTL_UNSET};
pub use error::{Error, Result};
pub use iface::{BoundInterface, Interface, InterfaceSource, SystemInterfaces, find_interface};
pub use resolve::{AddrInfoList, Candidate, FamilyPreference, Resolver, SocketType};

/// # Protocol
///
/// Transport an address is meant for. The numeric identifiers are stable and
/// accepted by [`Address::with_protocol`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Protocol {
    Udp,
    Tcp,
    Unix,
}

#[rustfmt::skip]
impl Protocol {
    pub const UDP_ID:  i32 = 0x1;
    pub const UNIX_ID: i32 = 0x2;
    pub const TCP_ID:  i32 = 0x4;
}

impl Protocol {
    #[rustfmt::skip]
    #[inline]
    pub fn id(&self) -> i32 {
        match self {
            Self::Udp  => Self::UDP_ID,
            Self::Tcp  => Self::TCP_ID,
            Self::Unix => Self::UNIX_ID,
        }
    }

    #[rustfmt::skip]
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Udp  => "udp",
            Self::Tcp  => "tcp",
            Self::Unix => "unix",
        }
    }

    #[rustfmt::skip]
    #[inline]
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "udp"  => Some(Self::Udp),
            "tcp"  => Some(Self::Tcp),
            "unix" => Some(Self::Unix),
            _      => None,
        }
    }
}

impl TryFrom<i32> for Protocol {
    type Error = Error;

    #[rustfmt::skip]
    fn try_from(value: i32) -> Result<Self> {
        match value {
            Self::UDP_ID  => Ok(Self::Udp),
            Self::TCP_ID  => Ok(Self::Tcp),
            Self::UNIX_ID => Ok(Self::Unix),
            n             => Err(Error::InvalidProtocol(n.to_string())),
        }
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s).ok_or_else(|| Error::InvalidProtocol(s.to_string()))
    }
}

impl TryFrom<&str> for Protocol {
    type Error = Error;

    #[inline]
    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// IP address family of a resolved candidate or a local interface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    #[inline]
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }

    #[inline]
    pub fn from_raw(family: libc::c_int) -> Option<Self> {
        match family {
            libc::AF_INET => Some(Self::V4),
            libc::AF_INET6 => Some(Self::V6),
            _ => None,
        }
    }

    #[inline]
    pub fn as_raw(&self) -> libc::c_int {
        match self {
            Self::V4 => libc::AF_INET,
            Self::V6 => libc::AF_INET6,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => f.write_str("IPv4"),
            Self::V6 => f.write_str("IPv6"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_ids() {
        for protocol in [Protocol::Udp, Protocol::Tcp, Protocol::Unix] {
            assert_eq!(Protocol::try_from(protocol.id()).unwrap(), protocol);
            assert_eq!(protocol.name().parse::<Protocol>().unwrap(), protocol);
        }
    }

    #[test]
    fn test_invalid_protocol() {
        assert!(matches!(
            Protocol::try_from(0x8_i32),
            Err(Error::InvalidProtocol(id)) if id == "8"
        ));
        assert!(matches!(
            "sctp".parse::<Protocol>(),
            Err(Error::InvalidProtocol(name)) if name == "sctp"
        ));
        // Names are case-sensitive, like the URL schemes.
        assert!("UDP".parse::<Protocol>().is_err());
    }

    #[test]
    fn test_family() {
        assert_eq!(Family::of(&"10.0.0.1".parse().unwrap()), Family::V4);
        assert_eq!(Family::of(&"fe80::1".parse().unwrap()), Family::V6);
        assert_eq!(Family::from_raw(libc::AF_INET6), Some(Family::V6));
        assert_eq!(Family::from_raw(libc::AF_UNIX), None);
        assert_eq!(Family::from_raw(Family::V4.as_raw()), Some(Family::V4));
    }
}
