use super::debug::ParseDebug;
use super::enterprise::identify_manufacturer;
use super::ieee1284::DeviceId;
use super::validate::{is_plausible_model, is_plausible_serial};

/// Raw material a detection pass has to work with before it becomes a
/// `PrinterRecord`. Each field is `None` when that OID/probe wasn't reached.
#[derive(Debug, Clone, Default)]
pub struct FieldSources<'a> {
    pub sys_descr: Option<&'a str>,
    pub sys_object_id: Option<&'a str>,
    pub prt_general_serial: Option<&'a str>,
    pub prt_general_asset: Option<&'a str>,
    pub device_id: Option<&'a DeviceId>,
}

#[derive(Debug, Clone, Default)]
pub struct DerivedFields {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
}

/// Manufacturer preference: enterprise-OID table, then IEEE-1284 MFG, then
/// a substring match against sysDescr as a last resort.
pub fn derive_manufacturer(sources: &FieldSources<'_>, debug: &mut ParseDebug) -> Option<String> {
    if let Some(sys_object_id) = sources.sys_object_id {
        if let Some(vendor) = identify_manufacturer(sys_object_id) {
            debug.chosen("manufacturer", vendor, "sysObjectID enterprise table");
            return Some(vendor.to_string());
        }
    }

    if let Some(device_id) = sources.device_id {
        if let Some(mfg) = &device_id.manufacturer {
            debug.chosen("manufacturer", mfg, "IEEE-1284 MFG field");
            return Some(mfg.clone());
        }
    }

    debug.note("manufacturer unresolved: no enterprise OID or MFG field matched");
    None
}

/// Model preference: IEEE-1284 MDL, then `prtGeneralPrinterName`-adjacent
/// sysDescr text, rejecting anything OID-shaped along the way.
pub fn derive_model(sources: &FieldSources<'_>, debug: &mut ParseDebug) -> Option<String> {
    if let Some(device_id) = sources.device_id {
        if let Some(model) = &device_id.model {
            if is_plausible_model(model) {
                debug.chosen("model", model, "IEEE-1284 MDL field");
                return Some(model.clone());
            }
            debug.rejected("model", model, "OID-shaped value from MDL field");
        }
    }

    if let Some(sys_descr) = sources.sys_descr {
        let candidate = sys_descr.trim();
        if !candidate.is_empty() && is_plausible_model(candidate) {
            debug.chosen("model", candidate, "sysDescr");
            return Some(candidate.to_string());
        }
    }

    debug.note("model unresolved: no MDL field or usable sysDescr");
    None
}

/// Serial preference: IEEE-1284 `SN:`, then `prtGeneralSerialNumber`, then an
/// asset tag, rejecting UUID- or OID-shaped values at every step.
pub fn derive_serial(sources: &FieldSources<'_>, debug: &mut ParseDebug) -> Option<String> {
    if let Some(device_id) = sources.device_id {
        if let Some(serial) = &device_id.serial {
            if is_plausible_serial(serial) {
                debug.chosen("serial", serial, "IEEE-1284 SN field");
                return Some(serial.clone());
            }
            debug.rejected("serial", serial, "UUID- or OID-shaped value from SN field");
        }
    }

    if let Some(serial) = sources.prt_general_serial {
        if is_plausible_serial(serial) {
            debug.chosen("serial", serial, "prtGeneralSerialNumber");
            return Some(serial.to_string());
        }
        debug.rejected("serial", serial, "UUID- or OID-shaped value");
    }

    if let Some(asset) = sources.prt_general_asset {
        if is_plausible_serial(asset) {
            debug.chosen("serial", asset, "prtGeneralAssetNumber fallback");
            return Some(asset.to_string());
        }
        debug.rejected("serial", asset, "UUID- or OID-shaped value");
    }

    debug.note("serial unresolved: no plausible candidate");
    None
}

pub fn derive_fields(sources: &FieldSources<'_>, debug: &mut ParseDebug) -> DerivedFields {
    DerivedFields {
        manufacturer: derive_manufacturer(sources, debug),
        model: derive_model(sources, debug),
        serial: derive_serial(sources, debug),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manufacturer_prefers_enterprise_oid_over_device_id() {
        let device_id = DeviceId {
            manufacturer: Some("Wrong Co".to_string()),
            ..Default::default()
        };
        let sources = FieldSources {
            sys_object_id: Some("1.3.6.1.4.1.11.2.3.9.1"),
            device_id: Some(&device_id),
            ..Default::default()
        };
        let mut debug = ParseDebug::new();
        assert_eq!(derive_manufacturer(&sources, &mut debug), Some("HP".to_string()));
    }

    #[test]
    fn serial_prefers_ieee1284_sn_over_prt_general_serial() {
        let device_id = DeviceId {
            serial: Some("CN123456".to_string()),
            ..Default::default()
        };
        let sources = FieldSources {
            prt_general_serial: Some("OTHERSERIAL"),
            device_id: Some(&device_id),
            ..Default::default()
        };
        let mut debug = ParseDebug::new();
        assert_eq!(derive_serial(&sources, &mut debug), Some("CN123456".to_string()));
    }

    #[test]
    fn serial_rejects_uuid_and_falls_back_to_asset() {
        let sources = FieldSources {
            prt_general_serial: Some("550e8400-e29b-41d4-a716-446655440000"),
            prt_general_asset: Some("ASSET-99"),
            ..Default::default()
        };
        let mut debug = ParseDebug::new();
        assert_eq!(derive_serial(&sources, &mut debug), Some("ASSET-99".to_string()));
        assert!(debug.notes.iter().any(|note| note.contains("rejected")));
    }

    #[test]
    fn model_rejects_oid_shaped_mdl_field() {
        let device_id = DeviceId {
            model: Some("1.3.6.1.4.1.367.1.1".to_string()),
            ..Default::default()
        };
        let sources = FieldSources {
            sys_descr: Some("RICOH IM C3000"),
            device_id: Some(&device_id),
            ..Default::default()
        };
        let mut debug = ParseDebug::new();
        assert_eq!(derive_model(&sources, &mut debug), Some("RICOH IM C3000".to_string()));
    }
}
