use crate::model::PrinterRecord;
use crate::vendor::quirks::infer_color_capable as vendor_infer_color;

/// Keywords checked against sysDescr/model text when the vendor quirk table
/// has no opinion on a given model string.
const COPIER_KEYWORDS: &[&str] = &["copier", "mfp", "multifunction"];
const SCANNER_KEYWORDS: &[&str] = &["scanner", "scan"];
const FAX_KEYWORDS: &[&str] = &["fax"];
const LASER_KEYWORDS: &[&str] = &["laser", "laserjet"];
const INKJET_KEYWORDS: &[&str] = &["inkjet", "officejet", "deskjet"];
const DUPLEX_KEYWORDS: &[&str] = &["duplex"];

/// Classifies device-type flags from whatever descriptive text was parsed,
/// preferring the vendor quirk table for color/mono and falling back to
/// generic keyword matching for everything else.
pub fn classify(record: &mut PrinterRecord) {
    let haystack = [record.description.as_deref(), record.model.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase();

    if !record.is_color && !record.is_mono {
        if let (Some(manufacturer), Some(model)) = (&record.manufacturer, &record.model) {
            if let Some(is_color) = vendor_infer_color(manufacturer, model) {
                record.set_color_classification(is_color);
            }
        }
    }

    record.is_copier |= contains_any(&haystack, COPIER_KEYWORDS);
    record.is_scanner |= contains_any(&haystack, SCANNER_KEYWORDS);
    record.is_fax |= contains_any(&haystack, FAX_KEYWORDS);
    record.is_laser |= contains_any(&haystack, LASER_KEYWORDS);
    record.is_inkjet |= contains_any(&haystack, INKJET_KEYWORDS);
    record.has_duplex |= contains_any(&haystack, DUPLEX_KEYWORDS);

    record.form_factor = Some(if record.is_copier || record.is_scanner || record.is_fax {
        "mfp".to_string()
    } else {
        "single-function".to_string()
    });

    record.device_type = Some(if record.is_laser {
        "laser".to_string()
    } else if record.is_inkjet {
        "inkjet".to_string()
    } else {
        "unknown".to_string()
    });
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| haystack.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PrinterId;

    #[test]
    fn classifies_mfp_from_keywords() {
        let mut record = PrinterRecord::new(PrinterId::new("printer-1"));
        record.description = Some("Color LaserJet MFP with duplex and fax".to_string());
        classify(&mut record);
        assert!(record.is_copier);
        assert!(record.is_fax);
        assert!(record.is_laser);
        assert!(record.has_duplex);
        assert_eq!(record.form_factor.as_deref(), Some("mfp"));
    }

    #[test]
    fn uses_vendor_table_for_color_classification() {
        let mut record = PrinterRecord::new(PrinterId::new("printer-1"));
        record.manufacturer = Some("Ricoh".to_string());
        record.model = Some("IM C3000".to_string());
        classify(&mut record);
        assert!(record.is_color);
        assert!(!record.is_mono);
    }
}
