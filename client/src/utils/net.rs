//! Address classification helpers

use std::net::{IpAddr, Ipv4Addr};

/// Whether an address is a publicly routable IPv4 address.
///
/// Loopback, link-local and the RFC 1918 private ranges are not public.
/// IPv6 addresses are never public IPv4.
pub fn is_public_ipv4(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => v6.to_ipv4_mapped().is_some_and(is_public_v4),
    }
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    !(ip.is_loopback() || ip.is_link_local() || ip.is_private() || ip.is_unspecified())
}
