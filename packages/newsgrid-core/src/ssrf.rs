//! Outbound-fetch SSRF guard.
//!
//! Before the fetcher issues any request, the target host is resolved and
//! checked against loopback, private, link-local, and cloud-metadata ranges.
//! This is a defense against feed entries whose URL points back at internal
//! infrastructure.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Cloud metadata endpoint address used by AWS, GCP, and Azure alike.
const METADATA_ADDR: Ipv4Addr = Ipv4Addr::new(169, 254, 169, 254);

/// Returns `true` if `addr` must not be fetched from: loopback, private
/// (RFC 1918), link-local, the cloud metadata address, or other IANA
/// reserved ranges.
#[must_use]
pub fn is_blocked_address(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.is_unspecified()
                || v4 == METADATA_ADDR
        }
        IpAddr::V6(v6) => is_blocked_v6(v6),
    }
}

fn is_blocked_v6(v6: Ipv6Addr) -> bool {
    if v6.is_loopback() || v6.is_unspecified() {
        return true;
    }
    if let Some(v4) = v6.to_ipv4_mapped() {
        return is_blocked_address(IpAddr::V4(v4));
    }
    // Unique local addresses, fc00::/7.
    let segments = v6.segments();
    if (segments[0] & 0xfe00) == 0xfc00 {
        return true;
    }
    // Link-local, fe80::/10.
    if (segments[0] & 0xffc0) == 0xfe80 {
        return true;
    }
    false
}

/// Validates a resolved socket address is safe to fetch.
///
/// # Errors
///
/// Returns an error describing which check rejected the address.
pub fn guard_address(addr: IpAddr) -> Result<(), String> {
    if is_blocked_address(addr) {
        Err(format!("refusing to fetch blocked address {addr}"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_loopback() {
        assert!(is_blocked_address("127.0.0.1".parse().unwrap()));
        assert!(is_blocked_address("::1".parse().unwrap()));
    }

    #[test]
    fn blocks_private_ranges() {
        assert!(is_blocked_address("10.0.0.5".parse().unwrap()));
        assert!(is_blocked_address("192.168.1.1".parse().unwrap()));
        assert!(is_blocked_address("172.16.0.1".parse().unwrap()));
    }

    #[test]
    fn blocks_link_local_and_metadata() {
        assert!(is_blocked_address("169.254.1.1".parse().unwrap()));
        assert!(is_blocked_address("169.254.169.254".parse().unwrap()));
    }

    #[test]
    fn allows_public_address() {
        assert!(!is_blocked_address("93.184.216.34".parse().unwrap()));
    }

    #[test]
    fn blocks_ipv6_unique_local() {
        assert!(is_blocked_address("fd00::1".parse().unwrap()));
    }

    #[test]
    fn guard_address_reports_reason() {
        let err = guard_address("127.0.0.1".parse().unwrap()).unwrap_err();
        assert!(err.contains("127.0.0.1"));
    }
}
