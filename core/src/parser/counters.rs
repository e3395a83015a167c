use crate::model::{MeterProvenance, MeterValue};
use crate::snmp::{Oid, SnmpValue};

use super::debug::ParseDebug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    Bw,
    Color,
    Total,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterMode {
    /// The device reports this counter directly.
    Direct,
    /// Total was not reported; derived as the sum of bw + color.
    DerivedTotal,
    Unavailable,
}

/// OIDs known (from `LearnedOids`, prior polls, or a vendor table) to carry
/// each counter. Mirrors `CounterOidSet` from the single-vendor prototype,
/// generalized to carry raw varbinds instead of assuming one session per kind.
#[derive(Debug, Clone, Default)]
pub struct CounterOidSet {
    pub bw: Option<(Oid, SnmpValue)>,
    pub color: Option<(Oid, SnmpValue)>,
    pub total: Option<(Oid, SnmpValue)>,
}

#[derive(Debug, Clone)]
pub struct CounterResolution {
    pub page_count: Option<MeterValue>,
    pub mode: CounterMode,
}

/// Total preferred when the device reports it directly; otherwise derived
/// as bw + color with a debug note recording the fallback, per the base
/// spec's stance that a derived total is acceptable but must say so.
pub fn resolve_counters(oids: &CounterOidSet, debug: &mut ParseDebug) -> CounterResolution {
    if let Some((oid, value)) = &oids.total {
        if let Some(total) = value.as_u64() {
            debug.chosen("page_count", &total.to_string(), &oid.to_string());
            return CounterResolution {
                page_count: Some(MeterValue {
                    value: total,
                    provenance: MeterProvenance::Oid,
                }),
                mode: CounterMode::Direct,
            };
        }
    }

    let bw = oids.bw.as_ref().and_then(|(_, value)| value.as_u64());
    let color = oids.color.as_ref().and_then(|(_, value)| value.as_u64());

    match (bw, color) {
        (Some(bw), Some(color)) => {
            debug.note(format!(
                "page_count derived as bw({bw}) + color({color}); device did not report a total"
            ));
            CounterResolution {
                page_count: Some(MeterValue {
                    value: bw + color,
                    provenance: MeterProvenance::Oid,
                }),
                mode: CounterMode::DerivedTotal,
            }
        }
        (Some(bw), None) => {
            debug.note(format!("page_count = bw({bw}) only; no color counter available"));
            CounterResolution {
                page_count: Some(MeterValue {
                    value: bw,
                    provenance: MeterProvenance::Oid,
                }),
                mode: CounterMode::DerivedTotal,
            }
        }
        _ => {
            debug.note("page_count unavailable: no total, bw, or color counter reported");
            CounterResolution {
                page_count: None,
                mode: CounterMode::Unavailable,
            }
        }
    }
}

pub fn find_counter_value(oids: &CounterOidSet, kind: CounterKind) -> Option<u64> {
    match kind {
        CounterKind::Bw => oids.bw.as_ref(),
        CounterKind::Color => oids.color.as_ref(),
        CounterKind::Total => oids.total.as_ref(),
    }
    .and_then(|(_, value)| value.as_u64())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid() -> Oid {
        "1.3.6.1.2.1.43.10.2.1.4.1.1".parse().unwrap()
    }

    #[test]
    fn prefers_direct_total() {
        let mut oids = CounterOidSet::default();
        oids.total = Some((oid(), SnmpValue::Counter32(500)));
        oids.bw = Some((oid(), SnmpValue::Counter32(100)));
        let mut debug = ParseDebug::new();
        let resolution = resolve_counters(&oids, &mut debug);
        assert_eq!(resolution.page_count.unwrap().value, 500);
        assert_eq!(resolution.mode, CounterMode::Direct);
    }

    #[test]
    fn derives_total_from_components_with_a_warning_note() {
        let mut oids = CounterOidSet::default();
        oids.bw = Some((oid(), SnmpValue::Counter32(300)));
        oids.color = Some((oid(), SnmpValue::Counter32(200)));
        let mut debug = ParseDebug::new();
        let resolution = resolve_counters(&oids, &mut debug);
        assert_eq!(resolution.page_count.unwrap().value, 500);
        assert_eq!(resolution.mode, CounterMode::DerivedTotal);
        assert!(debug.notes.iter().any(|note| note.contains("derived")));
    }

    #[test]
    fn resolves_a_hex_encoded_total_reported_as_an_octet_string() {
        let mut oids = CounterOidSet::default();
        oids.total = Some((oid(), SnmpValue::OctetString(b"0xb3e7".to_vec())));
        let mut debug = ParseDebug::new();
        let resolution = resolve_counters(&oids, &mut debug);
        assert_eq!(resolution.page_count.unwrap().value, 45991);
        assert_eq!(resolution.mode, CounterMode::Direct);
    }

    #[test]
    fn unavailable_when_nothing_reported() {
        let oids = CounterOidSet::default();
        let mut debug = ParseDebug::new();
        let resolution = resolve_counters(&oids, &mut debug);
        assert!(resolution.page_count.is_none());
        assert_eq!(resolution.mode, CounterMode::Unavailable);
    }
}
