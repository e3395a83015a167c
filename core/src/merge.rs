use crate::model::{EpochSeconds, PrinterRecord};

/// Folds a freshly queried record into whatever the store already had for
/// that printer. `incoming` wins on any field it actually populated;
/// `existing`'s set-like fields (open ports, discovery methods, detection
/// reasons) are unioned rather than replaced, and LastSeen only moves
/// forward — the invariants `PrinterRecord` itself enforces via
/// `touch_last_seen`/`add_open_port`.
pub fn merge_records(existing: PrinterRecord, incoming: PrinterRecord) -> PrinterRecord {
    let mut merged = existing;

    macro_rules! prefer_incoming {
        ($field:ident) => {
            if incoming.$field.is_some() {
                merged.$field = incoming.$field.clone();
            }
        };
    }

    prefer_incoming!(ip);
    prefer_incoming!(mac);
    prefer_incoming!(serial);
    prefer_incoming!(hostname);
    prefer_incoming!(manufacturer);
    prefer_incoming!(model);
    prefer_incoming!(description);
    prefer_incoming!(location);
    prefer_incoming!(admin_contact);
    prefer_incoming!(asset_id);
    prefer_incoming!(firmware);
    prefer_incoming!(sys_object_id);
    prefer_incoming!(page_count);
    prefer_incoming!(mono_impressions);
    prefer_incoming!(cyan_impressions);
    prefer_incoming!(magenta_impressions);
    prefer_incoming!(yellow_impressions);
    prefer_incoming!(cyan_toner_level);
    prefer_incoming!(magenta_toner_level);
    prefer_incoming!(yellow_toner_level);
    prefer_incoming!(black_toner_level);
    prefer_incoming!(subnet_mask);
    prefer_incoming!(gateway);
    prefer_incoming!(dhcp_server);
    prefer_incoming!(web_ui_url);
    prefer_incoming!(device_type);
    prefer_incoming!(form_factor);

    for (key, value) in incoming.meters {
        merged.meters.insert(key, value);
    }
    for (key, value) in incoming.toner_levels {
        merged.toner_levels.insert(key, value);
    }
    for (key, value) in incoming.paper_tray_status {
        merged.paper_tray_status.insert(key, value);
    }
    if !incoming.paper_trays.is_empty() {
        merged.paper_trays = incoming.paper_trays;
    }
    if !incoming.status_messages.is_empty() {
        merged.status_messages = incoming.status_messages;
    }

    for consumable in incoming.consumables {
        if !merged.consumables.contains(&consumable) {
            merged.consumables.push(consumable);
        }
    }
    for alert in incoming.toner_alerts {
        if !merged.toner_alerts.contains(&alert) {
            merged.toner_alerts.push(alert);
        }
    }
    for dns in incoming.dns_servers {
        if !merged.dns_servers.contains(&dns) {
            merged.dns_servers.push(dns);
        }
    }
    for port in incoming.open_ports {
        merged.add_open_port(port);
    }
    for method in incoming.discovery_methods {
        merged.add_discovery_method(method);
    }
    for reason in incoming.detection_reasons {
        merged.add_detection_reason(reason);
    }

    if incoming.is_color || incoming.is_mono {
        merged.set_color_classification(incoming.is_color);
    }
    merged.is_copier |= incoming.is_copier;
    merged.is_scanner |= incoming.is_scanner;
    merged.is_fax |= incoming.is_fax;
    merged.is_laser |= incoming.is_laser;
    merged.is_inkjet |= incoming.is_inkjet;
    merged.has_duplex |= incoming.has_duplex;

    if !incoming.learned_oids.is_empty() {
        merged.learned_oids = incoming.learned_oids;
    }

    if let Some(timestamp) = incoming.last_seen {
        merged.touch_last_seen(timestamp);
    }

    merged
}

pub fn touch_or_insert(
    existing: Option<PrinterRecord>,
    incoming: PrinterRecord,
    seen_at: EpochSeconds,
) -> PrinterRecord {
    let mut merged = match existing {
        Some(existing) => merge_records(existing, incoming),
        None => incoming,
    };
    merged.touch_last_seen(seen_at);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PrinterId;

    #[test]
    fn incoming_fields_win_but_set_like_fields_union() {
        let mut existing = PrinterRecord::new(PrinterId::new("printer-1"));
        existing.add_open_port(80);
        existing.add_discovery_method("mdns");
        existing.model = Some("Old Model".to_string());
        existing.touch_last_seen(100);

        let mut incoming = PrinterRecord::new(PrinterId::new("printer-1"));
        incoming.add_open_port(9100);
        incoming.add_discovery_method("ssdp");
        incoming.model = Some("New Model".to_string());
        incoming.touch_last_seen(50);

        let merged = merge_records(existing, incoming);
        assert_eq!(merged.open_ports, vec![80, 9100]);
        assert_eq!(merged.discovery_methods, vec!["mdns", "ssdp"]);
        assert_eq!(merged.model.as_deref(), Some("New Model"));
        assert_eq!(merged.last_seen, Some(100));
    }

    #[test]
    fn touch_or_insert_creates_a_new_record_when_none_existed() {
        let incoming = PrinterRecord::new(PrinterId::new("printer-1"));
        let merged = touch_or_insert(None, incoming, 42);
        assert_eq!(merged.last_seen, Some(42));
    }
}
