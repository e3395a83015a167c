use std::net::Ipv4Addr;

use get_if_addrs::IfAddr;
use tracing::warn;

use crate::range::{ipv4_to_u32, prefix_to_mask, u32_to_ipv4};
use crate::targets;

/// Picks a sensible default scan range when `AgentConfig.scan_ranges` is
/// empty: the CIDR of the first non-loopback, non-link-local IPv4 interface.
/// Returns `None` on a host with no usable interface (containers without
/// `NET_ADMIN`, air-gapped test runners) rather than guessing.
pub fn default_discovery_cidr() -> Option<String> {
    let interfaces = get_if_addrs::get_if_addrs().ok()?;
    for iface in interfaces {
        let addr = match iface.addr {
            IfAddr::V4(v4) => v4,
            _ => continue,
        };
        if addr.ip.is_loopback() {
            continue;
        }
        let octets = addr.ip.octets();
        if octets[0] == 169 && octets[1] == 254 {
            continue;
        }

        let Some(prefix) = netmask_to_prefix(addr.netmask) else {
            continue;
        };
        if prefix == 32 {
            continue;
        }
        let mask = prefix_to_mask(prefix);
        let network = ipv4_to_u32(addr.ip) & mask;
        return Some(format!("{}/{}", u32_to_ipv4(network), prefix));
    }
    None
}

/// First non-loopback, non-link-local IPv4 address on the host, used to
/// derive a stable-ish agent identity when none is configured explicitly.
pub fn primary_interface_ip() -> Option<Ipv4Addr> {
    let interfaces = get_if_addrs::get_if_addrs().ok()?;
    for iface in interfaces {
        let addr = match iface.addr {
            IfAddr::V4(v4) => v4,
            _ => continue,
        };
        if addr.ip.is_loopback() {
            continue;
        }
        let octets = addr.ip.octets();
        if octets[0] == 169 && octets[1] == 254 {
            continue;
        }
        return Some(addr.ip);
    }
    None
}

fn netmask_to_prefix(mask: Ipv4Addr) -> Option<u8> {
    let mask_u32 = ipv4_to_u32(mask);
    let ones = mask_u32.count_ones();
    let prefix = u8::try_from(ones).ok()?;
    if prefix > 32 {
        return None;
    }
    let expected = prefix_to_mask(prefix);
    if mask_u32 == expected {
        Some(prefix)
    } else {
        warn!(target: targets::DISCOVERY, mask = %mask, "non-contiguous netmask ignored");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_contiguous_netmask() {
        assert_eq!(netmask_to_prefix(Ipv4Addr::new(255, 0, 255, 0)), None);
    }

    #[test]
    fn accepts_standard_slash_24() {
        assert_eq!(netmask_to_prefix(Ipv4Addr::new(255, 255, 255, 0)), Some(24));
    }
}
