/// Rejects values that are shaped like something other than what they claim
/// to be: a serial number that's actually a UUID some firmware stuffed into
/// the wrong OID, or a model string that's actually another OID.
pub fn looks_like_oid(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || !value.contains('.') {
        return false;
    }
    value.split('.').all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

pub fn looks_like_uuid(value: &str) -> bool {
    let value = value.trim();
    let parts: Vec<&str> = value.split('-').collect();
    if parts.len() != 5 {
        return false;
    }
    let expected_lengths = [8, 4, 4, 4, 12];
    parts
        .iter()
        .zip(expected_lengths)
        .all(|(part, len)| part.len() == len && part.chars().all(|c| c.is_ascii_hexdigit()))
}

pub fn is_plausible_serial(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    !looks_like_oid(value) && !looks_like_uuid(value)
}

pub fn is_plausible_model(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    !looks_like_oid(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_oid_shaped_strings() {
        assert!(looks_like_oid("1.3.6.1.4.1.367.1.1"));
        assert!(!looks_like_oid("ABC-1234"));
    }

    #[test]
    fn detects_uuid_shaped_strings() {
        assert!(looks_like_uuid("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!looks_like_uuid("SN12345678"));
    }

    #[test]
    fn rejects_oid_and_uuid_shaped_serials() {
        assert!(!is_plausible_serial("1.3.6.1.4.1.367"));
        assert!(!is_plausible_serial("550e8400-e29b-41d4-a716-446655440000"));
        assert!(is_plausible_serial("X7KP001234"));
    }
}
