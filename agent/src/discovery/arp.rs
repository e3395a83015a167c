use std::net::Ipv4Addr;

use printfleet_core::targets;
use printfleet_core::Error;
use tracing::warn;

/// A row from `/proc/net/arp`: IP, hardware (MAC) address, and whether the
/// kernel considers the entry resolved (flags bit 0x2) rather than
/// incomplete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpEntry {
    pub ip: Ipv4Addr,
    pub mac: String,
    pub complete: bool,
}

const ARP_TABLE_PATH: &str = "/proc/net/arp";

pub fn read_arp_table() -> Result<Vec<ArpEntry>, Error> {
    let contents = std::fs::read_to_string(ARP_TABLE_PATH).map_err(|error| {
        Error::DiscoveryTransient {
            source_name: "arp".to_string(),
            details: error.to_string(),
        }
    })?;
    Ok(parse_arp_table(&contents))
}

fn parse_arp_table(contents: &str) -> Vec<ArpEntry> {
    let mut entries = Vec::new();
    for line in contents.lines().skip(1) {
        let columns: Vec<&str> = line.split_whitespace().collect();
        if columns.len() < 6 {
            continue;
        }
        let Ok(ip) = columns[0].parse::<Ipv4Addr>() else {
            continue;
        };
        let flags = i64::from_str_radix(columns[2].trim_start_matches("0x"), 16).unwrap_or(0);
        let mac = columns[3].to_string();
        if mac == "00:00:00:00:00:00" {
            continue;
        }
        entries.push(ArpEntry {
            ip,
            mac,
            complete: flags & 0x2 != 0,
        });
    }
    entries
}

pub fn log_unreadable(error: &Error) {
    warn!(target: targets::DISCOVERY, error = %error, "arp table unreadable");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_arp_table_rows() {
        let sample = "IP address       HW type     Flags       HW address            Mask     Device\n\
192.168.1.10      0x1         0x2         aa:bb:cc:dd:ee:ff     *        eth0\n\
192.168.1.11      0x1         0x0         00:00:00:00:00:00     *        eth0\n";
        let entries = parse_arp_table(sample);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].ip, Ipv4Addr::new(192, 168, 1, 10));
        assert!(entries[0].complete);
    }
}
