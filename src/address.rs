use std::borrow::Cow;
use std::fmt::{self, Write};
use std::io;
use std::str::FromStr;

use socket2::Socket;

use crate::iface::{BoundInterface, InterfaceSource, SystemInterfaces, find_interface};
use crate::resolve::{AddrInfoList, Resolver, SocketType};
use crate::{Error, Protocol, Result, url};

/// TTL value of an address that never had one set.
pub const TTL_UNSET: i32 = -1;

const DEFAULT_HOST: &str = "localhost";

/// Last failure recorded on an [`Address`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    pub code: i32,
    pub message: Option<String>,
}

impl LastError {
    /// The recorded message, or the platform's description of `code`.
    pub fn message(&self) -> Cow<'_, str> {
        match &self.message {
            Some(message) => Cow::Borrowed(message),
            None => Cow::Owned(io::Error::from_raw_os_error(self.code).to_string()),
        }
    }
}

impl From<&Error> for LastError {
    fn from(err: &Error) -> Self {
        Self {
            code: err.code(),
            message: Some(err.to_string()),
        }
    }
}

/// # Address
///
/// ```text
///  osc.<protocol>://<host>:<port>/
/// ```
///
/// An OSC endpoint together with its resolution state, the local interface it
/// is pinned to and the socket a transport attached to it.
///
/// Fallible operations return the error and also record it, so it can be read
/// back later through [`Address::errno`] and [`Address::error_message`].
/// Everything the address owns is released when it is dropped.
#[derive(Debug)]
pub struct Address {
    protocol: Protocol,
    host: String,
    port: Option<String>,
    ttl: i32,
    resolver: Resolver,
    resolved: Option<AddrInfoList>,
    interface: Option<BoundInterface>,
    last_error: Option<LastError>,
    socket: Option<Socket>,
}

impl Address {
    /// A UDP address. `host` defaults to `localhost`.
    pub fn new(host: Option<&str>, port: Option<&str>) -> Self {
        Self::build(Protocol::Udp, host, port)
    }

    /// An address for `protocol`, given either as a [`Protocol`] or as one of
    /// its identifiers.
    ///
    /// The host of a Unix address is always `localhost`; its `port` is the
    /// socket path.
    pub fn with_protocol<P>(protocol: P, host: Option<&str>, port: Option<&str>) -> Result<Self>
    where
        P: TryInto<Protocol>,
        Error: From<P::Error>,
    {
        let protocol = protocol.try_into()?;
        Ok(Self::build(protocol, host, port))
    }

    /// Parses an OSC URL such as `osc.tcp://[::1]:9000/` or
    /// `osc.unix:///tmp/osc.sock`.
    pub fn from_url(url: &str) -> Result<Self> {
        let address = match url::parse_protocol(url)? {
            protocol @ (Protocol::Udp | Protocol::Tcp) => {
                Self::build(protocol, url::extract_host(url), url::extract_port(url))
            }
            Protocol::Unix => Self::build(Protocol::Unix, None, url::extract_path(url)),
        };

        Ok(address)
    }

    fn build(protocol: Protocol, host: Option<&str>, port: Option<&str>) -> Self {
        let host = match protocol {
            Protocol::Udp | Protocol::Tcp => host.unwrap_or(DEFAULT_HOST),
            Protocol::Unix => DEFAULT_HOST,
        };

        Self {
            protocol,
            host: host.to_string(),
            port: port.map(str::to_string),
            ttl: TTL_UNSET,
            resolver: Resolver::default(),
            resolved: None,
            interface: None,
            last_error: None,
            socket: None,
        }
    }

    #[inline]
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port or service name. For Unix addresses this is the socket path.
    #[inline]
    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    #[inline]
    pub fn path(&self) -> Option<&str> {
        match self.protocol {
            Protocol::Unix => self.port(),
            Protocol::Udp | Protocol::Tcp => None,
        }
    }

    #[inline]
    pub fn ttl(&self) -> i32 {
        self.ttl
    }

    /// Sets the multicast TTL. Ignored unless the address is UDP.
    pub fn set_ttl(&mut self, ttl: i32) {
        if self.protocol == Protocol::Udp {
            self.ttl = ttl;
        }
    }

    #[inline]
    pub fn resolver(&self) -> Resolver {
        self.resolver
    }

    /// Changes the resolver used by later calls to [`Address::resolve`].
    pub fn set_resolver(&mut self, resolver: Resolver) {
        self.resolver = resolver;
    }

    /// Resolves host and port into the system's candidate addresses.
    ///
    /// Any previous candidate list is released first. On failure the list
    /// stays empty. Unix addresses are never resolved and always succeed.
    pub fn resolve(&mut self) -> Result<()> {
        let Some(socket_type) = SocketType::for_protocol(self.protocol) else {
            return Ok(());
        };

        self.resolved = None;
        let result = self
            .resolver
            .lookup(&self.host, self.port.as_deref(), socket_type);

        match result {
            Ok(list) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("resolved {} into {} candidates", self, list.len());

                self.resolved = Some(list);
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    #[inline]
    pub fn resolved(&self) -> Option<&AddrInfoList> {
        self.resolved.as_ref()
    }

    /// Pins the address to the local interface called `name` or owning `ip`.
    ///
    /// The address is resolved first if it has not been, and the family of
    /// its first candidate selects which interface addresses are considered.
    pub fn set_interface(
        &mut self,
        name: Option<&str>,
        ip: Option<&str>,
    ) -> Result<&BoundInterface> {
        self.set_interface_with(&SystemInterfaces, name, ip)
    }

    /// Like [`Address::set_interface`], reading interfaces from `source`.
    pub fn set_interface_with<S>(
        &mut self,
        source: &S,
        name: Option<&str>,
        ip: Option<&str>,
    ) -> Result<&BoundInterface>
    where
        S: InterfaceSource + ?Sized,
    {
        if self.resolved.is_none() && self.resolve().is_err() {
            return Err(self.fail(Error::UnknownFamily));
        }

        let Some(family) = self.resolved.as_ref().and_then(AddrInfoList::family) else {
            return Err(self.fail(Error::UnknownFamily));
        };

        match find_interface(source, family, name, ip) {
            Ok(bound) => Ok(&*self.interface.insert(bound)),
            Err(err) => Err(self.fail(err)),
        }
    }

    #[inline]
    pub fn interface(&self) -> Option<&BoundInterface> {
        self.interface.as_ref()
    }

    #[inline]
    pub fn interface_name(&self) -> Option<&str> {
        self.interface.as_ref().map(BoundInterface::name)
    }

    /// Hands ownership of a transport socket to the address. A previously
    /// attached socket is closed.
    pub fn set_socket(&mut self, socket: Socket) {
        self.socket = Some(socket);
    }

    #[inline]
    pub fn socket(&self) -> Option<&Socket> {
        self.socket.as_ref()
    }

    pub fn take_socket(&mut self) -> Option<Socket> {
        self.socket.take()
    }

    /// Records a failure from a component outside this crate.
    pub fn set_error(&mut self, code: i32, message: Option<String>) {
        self.last_error = Some(LastError { code, message });
    }

    #[inline]
    pub fn last_error(&self) -> Option<&LastError> {
        self.last_error.as_ref()
    }

    /// Code of the last recorded failure, `0` if there was none.
    #[inline]
    pub fn errno(&self) -> i32 {
        self.last_error.as_ref().map_or(0, |err| err.code)
    }

    pub fn error_message(&self) -> Option<Cow<'_, str>> {
        self.last_error.as_ref().map(LastError::message)
    }

    fn fail(&mut self, err: Error) -> Error {
        self.last_error = Some(LastError::from(&err));
        err
    }

    /// Exact length of [`Address::url`].
    pub fn url_len(&self) -> usize {
        let mut counter = Counter(0);
        // Display and Counter never return an error.
        match fmt::write(&mut counter, format_args!("{self}")) {
            Ok(()) => counter.0,
            Err(_) => 0,
        }
    }

    /// Canonical URL of the address, `osc.<protocol>://<host>:<port>/`, with
    /// IPv6 hosts in brackets.
    ///
    /// The text is measured first and then written into a buffer of exactly
    /// that size, so `url().len() == url_len()`.
    ///
    /// Unix addresses do not survive a render and parse cycle unchanged:
    /// `osc.unix:///tmp/s` renders as `osc.unix://localhost:/tmp/s/`, whose
    /// path is `/tmp/s/`, and every further cycle appends another `/`.
    pub fn url(&self) -> String {
        let len = self.url_len();
        let mut url = String::with_capacity(len);
        write!(url, "{self}").expect("writing to a String cannot fail");

        debug_assert_eq!(url.len(), len);
        url
    }
}

struct Counter(usize);

impl Write for Counter {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let port = self.port.as_deref().unwrap_or_default();

        if self.host.contains(':') {
            write!(f, "osc.{}://[{}]:{}/", self.protocol, self.host, port)
        } else {
            write!(f, "osc.{}://{}:{}/", self.protocol, self.host, port)
        }
    }
}

impl FromStr for Address {
    type Err = Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        Self::from_url(s)
    }
}

impl TryFrom<&str> for Address {
    type Error = Error;

    #[inline]
    fn try_from(value: &str) -> Result<Self> {
        Self::from_url(value)
    }
}
