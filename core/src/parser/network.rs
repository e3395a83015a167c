use super::debug::ParseDebug;

#[derive(Debug, Clone, Default)]
pub struct NetworkInfo {
    pub subnet_mask: Option<String>,
    pub gateway: Option<String>,
    pub dns_servers: Vec<String>,
    pub dhcp_server: Option<String>,
}

/// `ipAdEntNetMask`/`ipRouteNextHop` style varbinds arrive as dotted-quad
/// strings already rendered by the SNMP layer; this just validates shape
/// and dedups, it doesn't re-derive anything SNMP already resolved.
pub fn parse_network_info(
    subnet_mask: Option<&str>,
    gateway: Option<&str>,
    dns_servers: &[String],
    dhcp_server: Option<&str>,
    debug: &mut ParseDebug,
) -> NetworkInfo {
    let mut info = NetworkInfo::default();

    if let Some(mask) = subnet_mask.filter(|m| is_dotted_quad(m)) {
        info.subnet_mask = Some(mask.to_string());
    } else if let Some(mask) = subnet_mask {
        debug.rejected("subnet_mask", mask, "not a dotted-quad address");
    }

    if let Some(gw) = gateway.filter(|g| is_dotted_quad(g)) {
        info.gateway = Some(gw.to_string());
    } else if let Some(gw) = gateway {
        debug.rejected("gateway", gw, "not a dotted-quad address");
    }

    for server in dns_servers {
        if is_dotted_quad(server) && !info.dns_servers.contains(server) {
            info.dns_servers.push(server.clone());
        }
    }

    if let Some(dhcp) = dhcp_server.filter(|d| is_dotted_quad(d)) {
        info.dhcp_server = Some(dhcp.to_string());
    }

    info
}

fn is_dotted_quad(value: &str) -> bool {
    value.parse::<std::net::Ipv4Addr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_addresses_and_rejects_garbage() {
        let mut debug = ParseDebug::new();
        let info = parse_network_info(
            Some("255.255.255.0"),
            Some("not-an-ip"),
            &["8.8.8.8".to_string(), "8.8.8.8".to_string()],
            None,
            &mut debug,
        );
        assert_eq!(info.subnet_mask.as_deref(), Some("255.255.255.0"));
        assert_eq!(info.gateway, None);
        assert_eq!(info.dns_servers, vec!["8.8.8.8".to_string()]);
        assert!(debug.notes.iter().any(|n| n.contains("rejected")));
    }
}
