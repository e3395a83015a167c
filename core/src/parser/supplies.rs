use crate::snmp::SnmpValue;

use super::debug::ParseDebug;

/// A single `prtMarkerSuppliesTable` row: level, max capacity, and the
/// colorant-name guess used to classify it as cyan/magenta/yellow/black.
#[derive(Debug, Clone)]
pub struct SupplyRow {
    pub description: String,
    pub level: Option<i64>,
    pub max: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct SupplyLevels {
    pub cyan: Option<i64>,
    pub magenta: Option<i64>,
    pub yellow: Option<i64>,
    pub black: Option<i64>,
    pub alerts: Vec<String>,
    /// Raw level for every row, keyed by `normalize_supply_key`, so the same
    /// physical supply maps to the same key across scans of one device even
    /// after a firmware update reorders the marker supplies table.
    pub levels_by_key: std::collections::HashMap<String, i64>,
    /// Raw description of every row, for display where a colorant guess
    /// would be too lossy (exotic supplies: fuser units, waste toner boxes).
    pub consumables: Vec<String>,
}

/// Collapses whitespace and case so `" Black Toner "` and `"black  toner"`
/// land on the same key.
pub fn normalize_supply_key(description: &str) -> String {
    description
        .trim()
        .to_ascii_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `prtMarkerSuppliesLevel` reports -2 for "unknown but present" and -3 for
/// "unavailable"; both are excluded from the percentage but not from alerts.
const LEVEL_UNKNOWN: i64 = -2;
const LEVEL_UNAVAILABLE: i64 = -3;

pub fn classify_supplies(rows: &[SupplyRow], debug: &mut ParseDebug) -> SupplyLevels {
    let mut levels = SupplyLevels::default();

    for row in rows {
        if !levels.consumables.contains(&row.description) {
            levels.consumables.push(row.description.clone());
        }
        if let Some(level) = row.level {
            levels.levels_by_key.insert(normalize_supply_key(&row.description), level);
        }

        let lower = row.description.to_ascii_lowercase();
        let slot = if lower.contains("cyan") {
            Some(&mut levels.cyan)
        } else if lower.contains("magenta") {
            Some(&mut levels.magenta)
        } else if lower.contains("yellow") {
            Some(&mut levels.yellow)
        } else if lower.contains("black") || lower.contains("mono") || lower.contains("toner") {
            Some(&mut levels.black)
        } else {
            None
        };

        let Some(slot) = slot else {
            debug.note(format!("supply row '{}' did not match a known colorant", row.description));
            continue;
        };

        match row.level {
            Some(LEVEL_UNAVAILABLE) => {
                levels.alerts.push(format!("{}: level unavailable", row.description));
            }
            Some(LEVEL_UNKNOWN) => {
                levels.alerts.push(format!("{}: present, level unknown", row.description));
            }
            Some(level) => {
                let percent = row
                    .max
                    .filter(|max| *max > 0)
                    .map(|max| (level * 100) / max);
                *slot = percent.or(Some(level));
                if let Some(percent) = percent {
                    if percent <= 10 {
                        levels.alerts.push(format!("{} low: {percent}%", row.description));
                    }
                }
            }
            None => {}
        }
    }

    levels
}

pub fn supply_row_from_varbind(description: String, level: &SnmpValue, max: &SnmpValue) -> SupplyRow {
    SupplyRow {
        description,
        level: level.as_u64().map(|v| v as i64).or_else(|| match level {
            SnmpValue::Integer(v) => Some(*v),
            _ => None,
        }),
        max: max.as_u64().map(|v| v as i64).or_else(|| match max {
            SnmpValue::Integer(v) => Some(*v),
            _ => None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_colorant_keyword() {
        let rows = vec![
            SupplyRow { description: "Cyan Toner".into(), level: Some(40), max: Some(100) },
            SupplyRow { description: "Black Toner".into(), level: Some(5), max: Some(100) },
        ];
        let mut debug = ParseDebug::new();
        let levels = classify_supplies(&rows, &mut debug);
        assert_eq!(levels.cyan, Some(40));
        assert_eq!(levels.black, Some(5));
        assert!(levels.alerts.iter().any(|a| a.contains("low")));
    }

    #[test]
    fn every_row_is_recorded_as_a_consumable_with_a_normalized_key() {
        let rows = vec![
            SupplyRow { description: "  Black  Toner ".into(), level: Some(60), max: Some(100) },
            SupplyRow { description: "Waste Toner Box".into(), level: Some(30), max: Some(100) },
        ];
        let mut debug = ParseDebug::new();
        let levels = classify_supplies(&rows, &mut debug);
        assert_eq!(levels.consumables, vec!["  Black  Toner ".to_string(), "Waste Toner Box".to_string()]);
        assert_eq!(levels.levels_by_key.get("black toner"), Some(&60));
        assert_eq!(levels.levels_by_key.get("waste toner box"), Some(&30));
    }

    #[test]
    fn unavailable_level_becomes_an_alert_not_a_percentage() {
        let rows = vec![SupplyRow {
            description: "Yellow Toner".into(),
            level: Some(LEVEL_UNAVAILABLE),
            max: Some(100),
        }];
        let mut debug = ParseDebug::new();
        let levels = classify_supplies(&rows, &mut debug);
        assert_eq!(levels.yellow, None);
        assert!(levels.alerts.iter().any(|a| a.contains("unavailable")));
    }
}
