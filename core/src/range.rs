use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;

use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeExpansion {
    /// Deduplicated, insertion-ordered.
    pub ips: Vec<Ipv4Addr>,
    /// Normalized canonical form of each accepted line, same order as input.
    pub canonical_lines: Vec<String>,
    pub errors: Vec<LineError>,
}

impl RangeExpansion {
    pub fn count(&self) -> usize {
        self.ips.len()
    }
}

/// Parses a multi-line range-text grammar into a bounded, deduplicated set of
/// IPv4 addresses. Per-line failures are reported without aborting; only
/// exceeding `max_addrs` aborts the whole expansion.
pub fn parse_ranges(text: &str, max_addrs: usize) -> Result<RangeExpansion, Error> {
    let mut out = RangeExpansion::default();
    let mut seen: HashSet<Ipv4Addr> = HashSet::new();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if looks_like_ipv6(line) {
            out.errors.push(LineError {
                line: line_no,
                message: "IPv6 addresses are not supported".to_string(),
            });
            continue;
        }

        match parse_line(line) {
            Ok((ips, canonical)) => {
                let mut newly_added = 0usize;
                for ip in &ips {
                    if seen.insert(*ip) {
                        newly_added += 1;
                    }
                }
                if seen.len() > max_addrs {
                    return Err(Error::RangeTooLarge {
                        requested: seen.len(),
                        max: max_addrs,
                    });
                }
                let _ = newly_added;
                for ip in ips {
                    if !out.ips.contains(&ip) {
                        out.ips.push(ip);
                    }
                }
                out.canonical_lines.push(canonical);
            }
            Err(message) => out.errors.push(LineError {
                line: line_no,
                message,
            }),
        }
    }

    Ok(out)
}

fn looks_like_ipv6(line: &str) -> bool {
    line.contains(':') && !line.split('/').next().unwrap_or("").contains('.')
        || line.matches(':').count() >= 2
}

fn parse_line(line: &str) -> Result<(Vec<Ipv4Addr>, String), String> {
    if let Some((base, wildcard_octet)) = split_wildcard(line) {
        let _ = wildcard_octet;
        return expand_wildcard(line, base);
    }

    if let Some((network, prefix)) = line.split_once('/') {
        let network: Ipv4Addr = network
            .trim()
            .parse()
            .map_err(|_| format!("invalid IPv4 address: {network}"))?;
        let prefix: u8 = prefix
            .trim()
            .parse()
            .map_err(|_| format!("invalid CIDR prefix: {prefix}"))?;
        return expand_cidr(network, prefix);
    }

    if let Some((start, end)) = line.split_once('-') {
        return expand_dash_range(start.trim(), end.trim());
    }

    let ip: Ipv4Addr = line
        .parse()
        .map_err(|_| format!("invalid IPv4 address: {line}"))?;
    Ok((vec![ip], ip.to_string()))
}

fn split_wildcard(line: &str) -> Option<(&str, &str)> {
    if line.ends_with(".x") || line.ends_with(".X") {
        Some((&line[..line.len() - 2], "x"))
    } else if line.ends_with(".*") {
        Some((&line[..line.len() - 2], "*"))
    } else {
        None
    }
}

fn expand_wildcard(original: &str, base: &str) -> Result<(Vec<Ipv4Addr>, String), String> {
    let octets: Vec<&str> = base.split('.').collect();
    if octets.len() != 3 {
        return Err(format!("wildcard must follow a.b.c form: {original}"));
    }
    let mut parsed = [0u8; 3];
    for (slot, text) in parsed.iter_mut().zip(octets.iter()) {
        *slot = text
            .parse()
            .map_err(|_| format!("invalid octet in wildcard range: {original}"))?;
    }
    let ips = (0..=255u8)
        .map(|last| Ipv4Addr::new(parsed[0], parsed[1], parsed[2], last))
        .collect();
    Ok((ips, format!("{}.{}.{}.0/24", parsed[0], parsed[1], parsed[2])))
}

fn expand_cidr(network: Ipv4Addr, prefix: u8) -> Result<(Vec<Ipv4Addr>, String), String> {
    if prefix > 32 {
        return Err(format!("CIDR prefix out of range: {prefix}"));
    }
    let mask = prefix_to_mask(prefix);
    let base = ipv4_to_u32(network) & mask;
    let broadcast = base | !mask;
    let ips = (base..=broadcast).map(u32_to_ipv4).collect();
    Ok((ips, format!("{}/{prefix}", u32_to_ipv4(base))))
}

fn expand_dash_range(start: &str, end: &str) -> Result<(Vec<Ipv4Addr>, String), String> {
    let start_ip: Ipv4Addr = start
        .parse()
        .map_err(|_| format!("invalid range start: {start}"))?;

    let end_ip = if end.contains('.') {
        end.parse::<Ipv4Addr>()
            .map_err(|_| format!("invalid range end: {end}"))?
    } else {
        let start_octets = start_ip.octets();
        let end_octets: Vec<&str> = end.split('.').collect();
        if end_octets.is_empty() || end_octets.len() > 3 {
            return Err(format!("invalid range shorthand: {end}"));
        }
        let mut combined = start_octets;
        let prefix_len = 4 - end_octets.len();
        for (slot, text) in combined[prefix_len..].iter_mut().zip(end_octets.iter()) {
            *slot = text
                .parse()
                .map_err(|_| format!("invalid octet in range shorthand: {end}"))?;
        }
        Ipv4Addr::from(combined)
    };

    let start_u32 = ipv4_to_u32(start_ip);
    let end_u32 = ipv4_to_u32(end_ip);
    if end_u32 < start_u32 {
        return Err(format!("range end precedes start: {start}-{end}"));
    }
    let ips = (start_u32..=end_u32).map(u32_to_ipv4).collect();
    Ok((ips, format!("{start_ip}-{end_ip}")))
}

pub(crate) fn prefix_to_mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - prefix)
    }
}

pub(crate) fn ipv4_to_u32(ip: Ipv4Addr) -> u32 {
    u32::from_be_bytes(ip.octets())
}

pub(crate) fn u32_to_ipv4(value: u32) -> Ipv4Addr {
    Ipv4Addr::from(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_slash_thirty() {
        let out = parse_ranges("192.168.10.0/30", 1024).unwrap();
        assert_eq!(out.count(), 4);
        assert_eq!(
            out.ips,
            vec![
                Ipv4Addr::new(192, 168, 10, 0),
                Ipv4Addr::new(192, 168, 10, 1),
                Ipv4Addr::new(192, 168, 10, 2),
                Ipv4Addr::new(192, 168, 10, 3),
            ]
        );
    }

    #[test]
    fn expands_wildcard_last_octet() {
        let out = parse_ranges("192.168.100.x", 1024).unwrap();
        assert_eq!(out.count(), 256);
    }

    #[test]
    fn expands_dash_range_shorthand() {
        let out = parse_ranges("192.168.1.10-50", 1024).unwrap();
        assert_eq!(out.count(), 41);
        assert_eq!(out.ips.first(), Some(&Ipv4Addr::new(192, 168, 1, 10)));
        assert_eq!(out.ips.last(), Some(&Ipv4Addr::new(192, 168, 1, 50)));
    }

    #[test]
    fn rejects_ipv6() {
        let out = parse_ranges("2001:db8::1", 1024).unwrap();
        assert_eq!(out.count(), 0);
        assert_eq!(out.errors.len(), 1);
        assert!(out.errors[0].message.contains("IPv6"));
    }

    #[test]
    fn ignores_blank_and_comment_lines() {
        let out = parse_ranges("# comment\n\n192.168.1.1", 1024).unwrap();
        assert_eq!(out.count(), 1);
    }

    #[test]
    fn deduplicates_across_lines() {
        let out = parse_ranges("192.168.1.1\n192.168.1.1", 1024).unwrap();
        assert_eq!(out.count(), 1);
    }

    #[test]
    fn fails_hard_when_cap_exceeded() {
        let err = parse_ranges("10.0.0.0/8", 1024).unwrap_err();
        assert!(matches!(err, Error::RangeTooLarge { .. }));
    }

    #[test]
    fn reports_per_line_errors_without_aborting() {
        let out = parse_ranges("not-an-ip\n192.168.1.1", 1024).unwrap();
        assert_eq!(out.count(), 1);
        assert_eq!(out.errors.len(), 1);
    }
}
