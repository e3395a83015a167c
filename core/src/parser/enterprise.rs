/// SNMP enterprise-number prefixes, looked up against `sysObjectID`
/// (`1.3.6.1.4.1.<enterprise>...`) for vendor dispatch, as a table rather
/// than a single hard-coded vendor check.
const ENTERPRISE_TABLE: &[(&str, &str)] = &[
    ("1.3.6.1.4.1.367", "Ricoh"),
    ("1.3.6.1.4.1.11", "HP"),
    ("1.3.6.1.4.1.1347", "Kyocera"),
    ("1.3.6.1.4.1.1602", "Canon"),
    ("1.3.6.1.4.1.253", "Xerox"),
    ("1.3.6.1.4.1.1248", "Epson"),
    ("1.3.6.1.4.1.2435", "Brother"),
    ("1.3.6.1.4.1.641", "Lexmark"),
    ("1.3.6.1.4.1.18334", "Konica Minolta"),
    ("1.3.6.1.4.1.1229", "Sharp"),
    ("1.3.6.1.4.1.236", "Samsung"),
    ("1.3.6.1.4.1.683", "Xerox"),
];

/// Longest-prefix match against the enterprise table. Longer prefixes are
/// checked first so a vendor with two registered arcs (like Xerox above)
/// doesn't shadow a more specific one.
pub fn identify_manufacturer(sys_object_id: &str) -> Option<&'static str> {
    let sys_object_id = sys_object_id.trim();
    ENTERPRISE_TABLE
        .iter()
        .filter(|(prefix, _)| {
            sys_object_id == *prefix || sys_object_id.starts_with(&format!("{prefix}."))
        })
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, vendor)| *vendor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_hp_prefix() {
        assert_eq!(
            identify_manufacturer("1.3.6.1.4.1.11.2.3.9.1"),
            Some("HP")
        );
    }

    #[test]
    fn matches_exact_prefix_without_trailing_dot() {
        assert_eq!(identify_manufacturer("1.3.6.1.4.1.367"), Some("Ricoh"));
    }

    #[test]
    fn unknown_prefix_returns_none() {
        assert_eq!(identify_manufacturer("1.3.6.1.4.1.99999"), None);
    }

    #[test]
    fn does_not_match_unrelated_prefix_sharing_digits() {
        assert_eq!(identify_manufacturer("1.3.6.1.4.1.3671.1"), None);
    }
}
