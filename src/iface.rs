//! Local network interface selection.

use std::ffi::CStr;
use std::io;
use std::net::IpAddr;
use std::ptr;

use bytes::Bytes;

use crate::resolve::socket_addr;
use crate::{Error, Family, Result};

/// An IP address assigned to a local network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub addr: IpAddr,
}

impl Interface {
    pub fn new(name: impl Into<String>, addr: IpAddr) -> Self {
        Self {
            name: name.into(),
            addr,
        }
    }

    #[inline]
    pub fn family(&self) -> Family {
        Family::of(&self.addr)
    }
}

/// Source of the local interface table.
///
/// Interfaces with several addresses appear once per address. Order matters:
/// [`find_interface`] picks the first interface that matches.
pub trait InterfaceSource {
    fn interfaces(&self) -> io::Result<Vec<Interface>>;
}

impl InterfaceSource for [Interface] {
    fn interfaces(&self) -> io::Result<Vec<Interface>> {
        Ok(self.to_vec())
    }
}

/// The operating system's interface table, read with `getifaddrs`.
#[derive(Debug, Copy, Clone, Default)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn interfaces(&self) -> io::Result<Vec<Interface>> {
        let list = IfAddrs::new()?;
        Ok(list.interfaces())
    }
}

struct IfAddrs {
    head: *mut libc::ifaddrs,
}

impl IfAddrs {
    fn new() -> io::Result<Self> {
        let mut head = ptr::null_mut();
        if unsafe { libc::getifaddrs(&mut head) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { head })
    }

    /// IPv4 and IPv6 entries in the order the OS lists them.
    fn interfaces(&self) -> Vec<Interface> {
        let mut interfaces = Vec::new();
        let mut next = self.head.cast_const();

        // SAFETY: every node stays allocated until `freeifaddrs` in Drop.
        while let Some(ifa) = unsafe { next.as_ref() } {
            next = ifa.ifa_next.cast_const();

            if ifa.ifa_addr.is_null() || ifa.ifa_name.is_null() {
                continue;
            }

            let raw_family = unsafe { (*ifa.ifa_addr).sa_family } as libc::c_int;
            let Some(family) = Family::from_raw(raw_family) else {
                continue;
            };
            let Some(addr) = (unsafe { socket_addr(ifa.ifa_addr, family) }) else {
                continue;
            };

            let name = unsafe { CStr::from_ptr(ifa.ifa_name) };
            interfaces.push(Interface::new(name.to_string_lossy(), addr.ip()));
        }

        interfaces
    }
}

impl Drop for IfAddrs {
    fn drop(&mut self) {
        if !self.head.is_null() {
            unsafe { libc::freeifaddrs(self.head) };
        }
    }
}

/// The interface an address is pinned to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundInterface {
    name: String,
    ip: IpAddr,
    addr: Bytes,
}

impl BoundInterface {
    fn new(name: String, ip: IpAddr) -> Self {
        let addr = match ip {
            IpAddr::V4(v4) => Bytes::copy_from_slice(&v4.octets()),
            IpAddr::V6(v6) => Bytes::copy_from_slice(&v6.octets()),
        };

        Self { name, ip, addr }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    /// Address in network byte order: 4 bytes for IPv4, 16 for IPv6.
    #[inline]
    pub fn addr(&self) -> &Bytes {
        &self.addr
    }

    #[inline]
    pub fn family(&self) -> Family {
        Family::of(&self.ip)
    }
}

fn parse_ip(ip: &str, family: Family) -> Result<IpAddr> {
    let addr: IpAddr = ip
        .parse()
        .map_err(|_| Error::UnparseableIp(ip.to_string()))?;

    if Family::of(&addr) != family {
        return Err(Error::WrongFamily {
            ip: ip.to_string(),
            family,
        });
    }

    Ok(addr)
}

/// Finds the local interface of `family` that owns `ip` or is called `name`.
///
/// Interfaces are scanned once, in the order `source` lists them. For each
/// one the address match is tried before the name match, and the first
/// interface satisfying either is returned. A name match on an earlier
/// interface therefore wins over an address match on a later one.
pub fn find_interface<S>(
    source: &S,
    family: Family,
    name: Option<&str>,
    ip: Option<&str>,
) -> Result<BoundInterface>
where
    S: InterfaceSource + ?Sized,
{
    let target = ip.map(|ip| parse_ip(ip, family)).transpose()?;
    let interfaces = source.interfaces().map_err(Error::Enumerate)?;

    for interface in interfaces {
        if interface.family() != family {
            continue;
        }

        let by_ip = target.is_some_and(|target| interface.addr == target);
        let by_name = || name.is_some_and(|name| interface.name == name);

        if by_ip || by_name() {
            #[cfg(feature = "tracing")]
            tracing::debug!("bound to interface {} ({})", interface.name, interface.addr);

            return Ok(BoundInterface::new(interface.name, interface.addr));
        }
    }

    Err(Error::NoMatchingInterface)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unavailable;

    impl InterfaceSource for Unavailable {
        fn interfaces(&self) -> io::Result<Vec<Interface>> {
            Err(io::Error::from_raw_os_error(libc::EACCES))
        }
    }

    fn table() -> Vec<Interface> {
        vec![
            Interface::new("lo", "127.0.0.1".parse().unwrap()),
            Interface::new("eth0", "fe80::1".parse().unwrap()),
            Interface::new("eth0", "192.168.1.10".parse().unwrap()),
            Interface::new("wlan0", "10.0.0.2".parse().unwrap()),
        ]
    }

    #[test]
    fn test_match_by_name_respects_family() {
        let bound = find_interface(table().as_slice(), Family::V4, Some("eth0"), None).unwrap();
        assert_eq!(bound.name(), "eth0");
        assert_eq!(bound.ip(), "192.168.1.10".parse::<IpAddr>().unwrap());
        assert_eq!(bound.addr().as_ref(), &[192, 168, 1, 10]);

        let bound = find_interface(table().as_slice(), Family::V6, Some("eth0"), None).unwrap();
        assert_eq!(bound.family(), Family::V6);
        assert_eq!(bound.addr().len(), 16);
    }

    #[test]
    fn test_match_by_ip() {
        let bound = find_interface(table().as_slice(), Family::V4, None, Some("10.0.0.2")).unwrap();
        assert_eq!(bound.name(), "wlan0");
        assert_eq!(bound.addr().as_ref(), &[10, 0, 0, 2]);
    }

    #[test]
    fn test_earlier_name_match_beats_later_ip_match() {
        let bound = find_interface(
            table().as_slice(),
            Family::V4,
            Some("eth0"),
            Some("10.0.0.2"),
        )
        .unwrap();
        assert_eq!(bound.name(), "eth0");
    }

    #[test]
    fn test_earlier_ip_match_beats_later_name_match() {
        let bound = find_interface(
            table().as_slice(),
            Family::V4,
            Some("wlan0"),
            Some("127.0.0.1"),
        )
        .unwrap();
        assert_eq!(bound.name(), "lo");
    }

    #[test]
    fn test_no_match() {
        let result = find_interface(table().as_slice(), Family::V4, Some("eth9"), Some("10.9.9.9"));
        assert!(matches!(result, Err(Error::NoMatchingInterface)));

        // The name exists, but only with an IPv6 address.
        let table = vec![Interface::new("tun0", "fd00::5".parse().unwrap())];
        let result = find_interface(table.as_slice(), Family::V4, Some("tun0"), None);
        assert!(matches!(result, Err(Error::NoMatchingInterface)));

        let result = find_interface(table.as_slice(), Family::V6, None, None);
        assert!(matches!(result, Err(Error::NoMatchingInterface)));
    }

    #[test]
    fn test_ip_literal_errors() {
        let result = find_interface(table().as_slice(), Family::V4, None, Some("10.0.0.300"));
        assert!(matches!(result, Err(Error::UnparseableIp(ip)) if ip == "10.0.0.300"));

        let result = find_interface(table().as_slice(), Family::V4, None, Some("fe80::1"));
        assert!(matches!(
            result,
            Err(Error::WrongFamily { family: Family::V4, .. })
        ));

        let result = find_interface(table().as_slice(), Family::V6, None, Some("10.0.0.2"));
        assert!(matches!(
            result,
            Err(Error::WrongFamily { family: Family::V6, .. })
        ));
    }

    #[test]
    fn test_ip_literal_is_checked_before_enumeration() {
        let result = find_interface(&Unavailable, Family::V4, None, Some("bogus"));
        assert!(matches!(result, Err(Error::UnparseableIp(_))));
    }

    #[test]
    fn test_enumeration_error() {
        let result = find_interface(&Unavailable, Family::V4, Some("lo"), None);
        assert!(matches!(result, Err(Error::Enumerate(_))));
    }

    #[test]
    fn test_system_loopback() {
        let interfaces = SystemInterfaces.interfaces().unwrap();
        let loopback = interfaces
            .iter()
            .find(|i| i.addr == IpAddr::from([127, 0, 0, 1]))
            .expect("no IPv4 loopback interface");

        let bound = find_interface(&SystemInterfaces, Family::V4, None, Some("127.0.0.1")).unwrap();
        assert_eq!(bound.name(), loopback.name);

        let bound = find_interface(
            &SystemInterfaces,
            Family::V4,
            Some(loopback.name.as_str()),
            None,
        )
        .unwrap();
        assert_eq!(bound.name(), loopback.name);
        assert_eq!(bound.family(), Family::V4);
    }
}
