pub mod counters;
pub mod debug;
pub mod enterprise;
pub mod fields;
pub mod ieee1284;
pub mod network;
pub mod supplies;
pub mod validate;

pub use counters::{find_counter_value, resolve_counters, CounterKind, CounterMode, CounterOidSet, CounterResolution};
pub use debug::ParseDebug;
pub use enterprise::identify_manufacturer;
pub use fields::{derive_fields, DerivedFields, FieldSources};
pub use ieee1284::{parse_device_id, DeviceId};
pub use network::{parse_network_info, NetworkInfo};
pub use supplies::{classify_supplies, SupplyLevels, SupplyRow};

use crate::model::PrinterRecord;

/// Applies derived fields, counters, supplies, and network info onto a
/// record in place and returns the debug trail explaining each decision.
/// Called once per query cycle with whatever OIDs a given device answered.
pub fn apply_derived_fields(
    record: &mut PrinterRecord,
    sources: &FieldSources<'_>,
    counter_oids: &CounterOidSet,
    supply_rows: &[SupplyRow],
    network: Option<&NetworkInfo>,
) -> ParseDebug {
    let mut debug = ParseDebug::new();

    let derived = derive_fields(sources, &mut debug);
    if let Some(manufacturer) = derived.manufacturer {
        record.manufacturer = Some(manufacturer);
    }
    if let Some(model) = derived.model {
        record.model = Some(model);
    }
    if let Some(serial) = derived.serial {
        record.serial = Some(serial);
    }

    let counters = resolve_counters(counter_oids, &mut debug);
    if let Some(meter) = counters.page_count {
        record.page_count = Some(meter.value);
        record.meters.insert("page_count".to_string(), meter);
    }
    let expected_mode = crate::vendor::expected_counter_mode(record.manufacturer.as_deref());
    if counters.mode != CounterMode::Unavailable && counters.mode != expected_mode {
        debug.note(format!(
            "counter mode {:?} does not match {:?} expected for this vendor",
            counters.mode, expected_mode
        ));
    }
    record.mono_impressions = find_counter_value(counter_oids, CounterKind::Bw);

    let supplies = classify_supplies(supply_rows, &mut debug);
    if let Some(cyan) = supplies.cyan {
        record.cyan_toner_level = Some(cyan);
    }
    if let Some(magenta) = supplies.magenta {
        record.magenta_toner_level = Some(magenta);
    }
    if let Some(yellow) = supplies.yellow {
        record.yellow_toner_level = Some(yellow);
    }
    if let Some(black) = supplies.black {
        record.black_toner_level = Some(black);
    }
    for alert in supplies.alerts {
        if !record.toner_alerts.contains(&alert) {
            record.toner_alerts.push(alert);
        }
    }
    for consumable in &supplies.consumables {
        if !record.consumables.contains(consumable) {
            record.consumables.push(consumable.clone());
        }
    }
    for (key, level) in &supplies.levels_by_key {
        record.toner_levels.insert(key.clone(), *level);
    }
    if record.learned_oids.primary_supply_key.is_none() {
        if let Some(first) = supply_rows.first() {
            record.learned_oids.primary_supply_key =
                Some(supplies::normalize_supply_key(&first.description));
        }
    }

    if let Some(network) = network {
        if network.subnet_mask.is_some() {
            record.subnet_mask = network.subnet_mask.clone();
        }
        if network.gateway.is_some() {
            record.gateway = network.gateway.clone();
        }
        for dns in &network.dns_servers {
            if !record.dns_servers.contains(dns) {
                record.dns_servers.push(dns.clone());
            }
        }
        if network.dhcp_server.is_some() {
            record.dhcp_server = network.dhcp_server.clone();
        }
    }

    debug
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PrinterId;
    use crate::snmp::SnmpValue;

    #[test]
    fn applies_manufacturer_counters_and_supplies_in_one_pass() {
        let mut record = PrinterRecord::new(PrinterId::new("printer-1"));
        let sources = FieldSources {
            sys_object_id: Some("1.3.6.1.4.1.367.1.1"),
            sys_descr: Some("RICOH IM C3000"),
            ..Default::default()
        };
        let mut counter_oids = CounterOidSet::default();
        let oid: crate::snmp::Oid = "1.3.6.1.2.1.43.10.2.1.4.1.1".parse().unwrap();
        counter_oids.total = Some((oid, SnmpValue::Counter32(42)));
        let supply_rows = vec![SupplyRow {
            description: "Cyan Toner".into(),
            level: Some(20),
            max: Some(100),
        }];

        let debug = apply_derived_fields(&mut record, &sources, &counter_oids, &supply_rows, None);

        assert_eq!(record.manufacturer.as_deref(), Some("Ricoh"));
        assert_eq!(record.page_count, Some(42));
        assert_eq!(record.cyan_toner_level, Some(20));
        assert_eq!(record.consumables, vec!["Cyan Toner".to_string()]);
        assert_eq!(record.toner_levels.get("cyan toner"), Some(&20));
        assert_eq!(record.learned_oids.primary_supply_key.as_deref(), Some("cyan toner"));
        assert!(!debug.notes.is_empty());
    }
}
