//! Name and service resolution through the system `getaddrinfo`.
//!
//! The result is kept as the OS-allocated `addrinfo` chain, owned by an
//! [`AddrInfoList`] and released with `freeaddrinfo` when it is dropped.

use std::ffi::{CStr, CString};
use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::mem;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::ptr::{self, NonNull};

use crate::{Error, Family, Protocol, Result};

/// Which address families a lookup may return.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FamilyPreference {
    Ipv4Only,
    DualStack,
}

impl Default for FamilyPreference {
    /// `DualStack` when the `ipv6` feature is enabled, `Ipv4Only` otherwise.
    fn default() -> Self {
        if cfg!(feature = "ipv6") {
            Self::DualStack
        } else {
            Self::Ipv4Only
        }
    }
}

impl FamilyPreference {
    #[inline]
    fn as_hint(&self) -> libc::c_int {
        match self {
            Self::Ipv4Only => libc::AF_INET,
            Self::DualStack => libc::AF_UNSPEC,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SocketType {
    Datagram,
    Stream,
    Other(i32),
}

impl SocketType {
    /// Socket type used to resolve addresses for `protocol`. Unix sockets are
    /// never resolved.
    #[inline]
    pub fn for_protocol(protocol: Protocol) -> Option<Self> {
        match protocol {
            Protocol::Udp => Some(Self::Datagram),
            Protocol::Tcp => Some(Self::Stream),
            Protocol::Unix => None,
        }
    }

    #[inline]
    fn from_raw(value: libc::c_int) -> Self {
        match value {
            libc::SOCK_DGRAM => Self::Datagram,
            libc::SOCK_STREAM => Self::Stream,
            n => Self::Other(n),
        }
    }

    #[inline]
    fn as_raw(&self) -> libc::c_int {
        match self {
            Self::Datagram => libc::SOCK_DGRAM,
            Self::Stream => libc::SOCK_STREAM,
            Self::Other(n) => *n,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Resolver {
    preference: FamilyPreference,
}

impl Resolver {
    pub fn new(preference: FamilyPreference) -> Self {
        Self { preference }
    }

    pub fn ipv4_only() -> Self {
        Self::new(FamilyPreference::Ipv4Only)
    }

    pub fn dual_stack() -> Self {
        Self::new(FamilyPreference::DualStack)
    }

    #[inline]
    pub fn preference(&self) -> FamilyPreference {
        self.preference
    }

    /// Resolves `host` and the optional `service` into every candidate the
    /// system returns for `socket_type`.
    ///
    /// Blocks for as long as the system resolver does.
    pub fn lookup(
        &self,
        host: &str,
        service: Option<&str>,
        socket_type: SocketType,
    ) -> Result<AddrInfoList> {
        let host = CString::new(host).map_err(|_| contains_nul())?;
        let service = service
            .map(CString::new)
            .transpose()
            .map_err(|_| contains_nul())?;

        let mut hints: libc::addrinfo = unsafe { mem::zeroed() };
        hints.ai_family = self.preference.as_hint();
        hints.ai_socktype = socket_type.as_raw();

        let mut res: *mut libc::addrinfo = ptr::null_mut();
        let code = unsafe {
            libc::getaddrinfo(
                host.as_ptr(),
                service.as_ref().map_or(ptr::null(), |s| s.as_ptr()),
                &hints,
                &mut res,
            )
        };

        if code != 0 {
            return Err(gai_error(code));
        }

        NonNull::new(res)
            .map(AddrInfoList::from_raw)
            .ok_or_else(|| gai_error(libc::EAI_NONAME))
    }
}

fn gai_error(code: libc::c_int) -> Error {
    let message = if code == libc::EAI_SYSTEM {
        io::Error::last_os_error().to_string()
    } else {
        // SAFETY: gai_strerror returns a pointer to a static string.
        unsafe { CStr::from_ptr(libc::gai_strerror(code)) }
            .to_string_lossy()
            .into_owned()
    };

    Error::Resolve { code, message }
}

fn contains_nul() -> Error {
    Error::Resolve {
        code: libc::EAI_NONAME,
        message: "host or service contains a NUL byte".to_string(),
    }
}

// Lists created and dropped on the current thread. A list sent to another
// thread and dropped there is not subtracted here.
#[cfg(test)]
thread_local! {
    pub(crate) static LIVE_LISTS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Owned `addrinfo` chain returned by a successful lookup.
pub struct AddrInfoList {
    head: NonNull<libc::addrinfo>,
}

// SAFETY: the chain is exclusively owned, never mutated after creation and
// `freeaddrinfo` may be called from any thread.
unsafe impl Send for AddrInfoList {}
unsafe impl Sync for AddrInfoList {}

impl AddrInfoList {
    fn from_raw(head: NonNull<libc::addrinfo>) -> Self {
        #[cfg(test)]
        LIVE_LISTS.with(|n| n.set(n.get() + 1));

        Self { head }
    }

    #[inline]
    pub fn iter(&self) -> Candidates<'_> {
        Candidates {
            next: self.head.as_ptr(),
            _list: PhantomData,
        }
    }

    #[inline]
    pub fn first(&self) -> Option<Candidate> {
        self.iter().next()
    }

    /// Family of the first candidate, which decides the family used for
    /// interface binding.
    #[inline]
    pub fn family(&self) -> Option<Family> {
        self.first().map(|candidate| candidate.family)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.first().is_none()
    }
}

impl Drop for AddrInfoList {
    fn drop(&mut self) {
        unsafe { libc::freeaddrinfo(self.head.as_ptr()) };

        #[cfg(test)]
        LIVE_LISTS.with(|n| n.set(n.get().saturating_sub(1)));
    }
}

impl fmt::Debug for AddrInfoList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a AddrInfoList {
    type Item = Candidate;
    type IntoIter = Candidates<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One resolved address.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub family: Family,
    pub socket_type: SocketType,
    pub protocol: i32,
    pub addr: SocketAddr,
}

/// Iterator over the IP entries of an [`AddrInfoList`], in resolver order.
pub struct Candidates<'a> {
    next: *const libc::addrinfo,
    _list: PhantomData<&'a AddrInfoList>,
}

impl Iterator for Candidates<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        loop {
            // SAFETY: `next` is either null or a node of the chain borrowed
            // for 'a, which stays allocated until the list is dropped.
            let info = unsafe { self.next.as_ref()? };
            self.next = info.ai_next.cast_const();

            let Some(family) = Family::from_raw(info.ai_family) else {
                continue;
            };
            let Some(addr) = (unsafe { socket_addr(info.ai_addr, family) }) else {
                continue;
            };

            return Some(Candidate {
                family,
                socket_type: SocketType::from_raw(info.ai_socktype),
                protocol: info.ai_protocol,
                addr,
            });
        }
    }
}

/// Reads a `sockaddr_in`/`sockaddr_in6` into a `SocketAddr`.
///
/// # Safety
///
/// `addr` must be null or point to a sockaddr of `family`.
pub(crate) unsafe fn socket_addr(
    addr: *const libc::sockaddr,
    family: Family,
) -> Option<SocketAddr> {
    if addr.is_null() {
        return None;
    }

    let addr = match family {
        Family::V4 => {
            let sin = unsafe { ptr::read_unaligned(addr as *const libc::sockaddr_in) };
            SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)),
                u16::from_be(sin.sin_port),
            ))
        }
        Family::V6 => {
            let sin6 = unsafe { ptr::read_unaligned(addr as *const libc::sockaddr_in6) };
            SocketAddr::V6(SocketAddrV6::new(
                Ipv6Addr::from(sin6.sin6_addr.s6_addr),
                u16::from_be(sin6.sin6_port),
                sin6.sin6_flowinfo,
                sin6.sin6_scope_id,
            ))
        }
    };

    Some(addr)
}
