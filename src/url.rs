//! # OSC URL dialect
//!
//! ```text
//!  osc://HOST[:PORT][/PATH]            UDP, no transport given
//!  osc.udp://HOST[:PORT][/PATH]
//!  osc.tcp://HOST[:PORT][/PATH]
//!  osc.unix://[AUTHORITY]/PATH
//! ```
//!
//! HOST is either a name, an IPv4 literal or a bracketed IPv6 literal such as
//! `[::1]`. Schemes are matched case-sensitively.
//!
//! The extraction functions only slice the input and never allocate. They
//! return `None` when the URL does not have the component they look for.

use crate::{Error, Protocol, Result};

const SCHEME: &str = "osc";
const AUTHORITY_PREFIX: &str = "//";

#[derive(Debug, Copy, Clone, PartialEq)]
enum Scheme<'a> {
    /// Bare `osc:`, read as UDP.
    Implicit,
    /// `osc.<token>:`
    Explicit(&'a str),
}

/// Splits `url` into its scheme and everything after the scheme's `:`.
fn split_scheme(url: &str) -> Option<(Scheme<'_>, &str)> {
    let rest = url.strip_prefix(SCHEME)?;

    if let Some(rest) = rest.strip_prefix(':') {
        return Some((Scheme::Implicit, rest));
    }

    let rest = rest.strip_prefix('.')?;
    let end = rest.find([':', '/', '['])?;
    if end == 0 {
        return None;
    }

    let (token, rest) = rest.split_at(end);
    let rest = rest.strip_prefix(':')?;

    Some((Scheme::Explicit(token), rest))
}

/// Scheme plus everything after `://`.
fn split_hierarchy(url: &str) -> Option<(Scheme<'_>, &str)> {
    let (scheme, rest) = split_scheme(url)?;
    let rest = rest.strip_prefix(AUTHORITY_PREFIX)?;
    Some((scheme, rest))
}

/// Splits the text after `://` into authority and the remainder, which starts
/// at the first `/` outside an IPv6 bracket. An unclosed bracket ends at the
/// first `/`.
fn split_authority(hierarchy: &str) -> (&str, &str) {
    let search_from = if hierarchy.starts_with('[') {
        hierarchy.find(']').unwrap_or(0)
    } else {
        0
    };

    match hierarchy[search_from..].find('/') {
        Some(pos) => hierarchy.split_at(search_from + pos),
        None => (hierarchy, ""),
    }
}

#[inline]
fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

#[inline]
fn warn_implicit_udp() {
    #[cfg(feature = "tracing")]
    tracing::warn!("no protocol specified in URL, assuming UDP");
}

/// Determines the transport named by `url`.
///
/// A bare `osc:` scheme is accepted as UDP with an advisory warning. Any other
/// `osc.<token>:` scheme that is not `udp`, `tcp` or `unix` fails with
/// [`Error::UnsupportedTransport`] carrying the token, while strings that are
/// not OSC URLs at all fail with [`Error::MalformedUrl`].
pub fn parse_protocol(url: &str) -> Result<Protocol> {
    match split_scheme(url) {
        Some((Scheme::Implicit, _)) => {
            warn_implicit_udp();
            Ok(Protocol::Udp)
        }
        Some((Scheme::Explicit(token), _)) => Protocol::from_name(token).ok_or_else(|| {
            #[cfg(feature = "tracing")]
            tracing::warn!("protocol '{}' not supported by this version", token);
            Error::UnsupportedTransport(token.to_string())
        }),
        None => Err(Error::MalformedUrl(url.to_string())),
    }
}

/// Returns the raw transport token of `url`, `"udp"` for the bare `osc:`
/// scheme. The token is not checked against the supported transports.
pub fn protocol_token(url: &str) -> Option<&str> {
    match split_scheme(url)? {
        (Scheme::Implicit, _) => {
            warn_implicit_udp();
            Some(Protocol::Udp.name())
        }
        (Scheme::Explicit(token), _) => Some(token),
    }
}

/// Host part of the authority, with IPv6 brackets stripped.
pub fn extract_host(url: &str) -> Option<&str> {
    let (_, hierarchy) = split_hierarchy(url)?;
    let (authority, _) = split_authority(hierarchy);

    if let Some(bracketed) = authority.strip_prefix('[') {
        let end = bracketed.find([']', '/']).unwrap_or(bracketed.len());
        return non_empty(&bracketed[..end]);
    }

    let end = authority.find([':', '[']).unwrap_or(authority.len());
    non_empty(&authority[..end])
}

/// Digits following the `:` of the authority.
pub fn extract_port(url: &str) -> Option<&str> {
    let (_, hierarchy) = split_hierarchy(url)?;
    let (authority, _) = split_authority(hierarchy);

    let after_host = match authority.strip_prefix('[') {
        Some(bracketed) => &bracketed[bracketed.find(']')? + 1..],
        None => &authority[authority.find(':')?..],
    };

    let digits = after_host.strip_prefix(':')?;
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    non_empty(&digits[..end])
}

/// Path component of `url`.
///
/// For UDP and TCP this is everything after the authority, starting at its
/// `/`. For `osc.unix:` URLs the authority is ignored and the path starts at
/// the first `/` after `//`; a remainder without any `/` is taken whole.
pub fn extract_path(url: &str) -> Option<&str> {
    let (scheme, hierarchy) = split_hierarchy(url)?;

    if scheme == Scheme::Explicit(Protocol::Unix.name()) {
        let path = match hierarchy.find('/') {
            Some(pos) => &hierarchy[pos..],
            None => hierarchy,
        };
        return non_empty(path);
    }

    let (_, path) = split_authority(hierarchy);
    non_empty(path)
}
