use std::collections::HashMap;

/// A parsed IEEE-1284 device ID string, as returned by printers over
/// `prtInputDetectedErrorState`-adjacent OIDs or a raw TCP/9100 handshake.
/// The format is semicolon-separated `KEY:value` pairs with `MFG`/`MODEL`
/// aliases in common use (`MFG`/`MANUFACTURER`, `MDL`/`MODEL`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceId {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub commands: Vec<String>,
    pub class: Option<String>,
    pub description: Option<String>,
    pub fields: HashMap<String, String>,
}

pub fn parse_device_id(raw: &str) -> DeviceId {
    let mut device = DeviceId::default();

    for segment in raw.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let Some((key, value)) = segment.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_uppercase();
        let value = value.trim().to_string();
        if value.is_empty() {
            continue;
        }

        match key.as_str() {
            "MFG" | "MANUFACTURER" => device.manufacturer = Some(value.clone()),
            "MDL" | "MODEL" => device.model = Some(value.clone()),
            "SN" | "SERIAL" => device.serial = Some(value.clone()),
            "CLS" | "CLASS" => device.class = Some(value.clone()),
            "DES" | "DESCRIPTION" => device.description = Some(value.clone()),
            "CMD" | "COMMAND SET" => {
                device.commands = value.split(',').map(|cmd| cmd.trim().to_string()).collect();
            }
            _ => {}
        }

        device.fields.insert(key, value);
    }

    device
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_fields() {
        let device = parse_device_id("MFG:HP;MDL:LaserJet 4000;CMD:PJL,PCL,POSTSCRIPT;CLS:PRINTER;");
        assert_eq!(device.manufacturer.as_deref(), Some("HP"));
        assert_eq!(device.model.as_deref(), Some("LaserJet 4000"));
        assert_eq!(device.commands, vec!["PJL", "PCL", "POSTSCRIPT"]);
        assert_eq!(device.class.as_deref(), Some("PRINTER"));
    }

    #[test]
    fn parses_serial_field() {
        let device = parse_device_id("MFG:HP;MDL:LaserJet 400;SN:CN123456;DES:Workgroup printer;");
        assert_eq!(device.manufacturer.as_deref(), Some("HP"));
        assert_eq!(device.model.as_deref(), Some("LaserJet 400"));
        assert_eq!(device.serial.as_deref(), Some("CN123456"));
        assert_eq!(device.description.as_deref(), Some("Workgroup printer"));
    }

    #[test]
    fn ignores_malformed_segments() {
        let device = parse_device_id("garbage;MFG:Canon;;");
        assert_eq!(device.manufacturer.as_deref(), Some("Canon"));
    }

    #[test]
    fn empty_input_yields_empty_device() {
        let device = parse_device_id("");
        assert_eq!(device, DeviceId::default());
    }
}
