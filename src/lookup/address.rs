//! Address input handling.

use std::net::{IpAddr, Ipv4Addr};

use crate::error_handling::AddressError;

/// Anything a lookup can be asked about.
///
/// Conversion never fails loudly: input that is not an IPv4 address
/// (including IPv6) converts to `None` and the lookup answers "unknown".
pub trait AddressInput {
    /// Converts to an IPv4 address if possible.
    fn to_ipv4(&self) -> Option<Ipv4Addr>;
}

impl AddressInput for str {
    fn to_ipv4(&self) -> Option<Ipv4Addr> {
        self.trim().parse().ok()
    }
}

impl AddressInput for String {
    fn to_ipv4(&self) -> Option<Ipv4Addr> {
        self.as_str().to_ipv4()
    }
}

impl AddressInput for Ipv4Addr {
    fn to_ipv4(&self) -> Option<Ipv4Addr> {
        Some(*self)
    }
}

impl AddressInput for IpAddr {
    fn to_ipv4(&self) -> Option<Ipv4Addr> {
        match self {
            IpAddr::V4(addr) => Some(*addr),
            IpAddr::V6(_) => None,
        }
    }
}

impl<T: AddressInput + ?Sized> AddressInput for &T {
    fn to_ipv4(&self) -> Option<Ipv4Addr> {
        (**self).to_ipv4()
    }
}

/// Parses a dotted-quad IPv4 address, reporting why a bad one was rejected.
///
/// Unlike [`AddressInput`] for `str`, surrounding whitespace is not trimmed.
///
/// # Errors
///
/// Returns `AddressError::Invalid` for empty input, IPv6 addresses and
/// anything else that is not exactly four decimal octets.
pub fn parse_ipv4(input: &str) -> Result<Ipv4Addr, AddressError> {
    let invalid = |reason: &str| AddressError::Invalid {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    if input.is_empty() {
        return Err(invalid("empty input"));
    }
    if input.contains(':') {
        return Err(invalid("IPv6 addresses are not supported"));
    }

    input.parse::<Ipv4Addr>().map_err(|_| {
        if input.split('.').count() != 4 {
            invalid("expected four dot-separated octets")
        } else {
            invalid("each octet must be a decimal number from 0 to 255")
        }
    })
}
