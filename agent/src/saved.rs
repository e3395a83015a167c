use std::time::Duration;

use printfleet_core::model::PrinterRecord;
use printfleet_core::Error;
use printfleet_core::DeviceStore;

/// Bridges the scan pipeline to `DeviceStore`, answering "do we already
/// know enough about this host to skip an SNMP round trip this cycle" so
/// Detection doesn't query a device that was deep-scanned a minute ago.
/// A record older than `max_age` is treated as absent, forcing re-detection.
pub struct SavedDeviceChecker<'a> {
    store: &'a dyn DeviceStore,
    max_age: Duration,
}

impl<'a> SavedDeviceChecker<'a> {
    pub fn new(store: &'a dyn DeviceStore, max_age: Duration) -> Self {
        Self { store, max_age }
    }

    pub fn check(&self, ip: &str, now: u64) -> Result<Option<PrinterRecord>, Error> {
        let Some(record) = self.store.get_by_ip(ip)? else {
            return Ok(None);
        };
        let Some(last_seen) = record.last_seen else {
            return Ok(None);
        };
        if now.saturating_sub(last_seen) > self.max_age.as_secs() {
            return Ok(None);
        }
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printfleet_core::model::PrinterId;
    use printfleet_core::store::memory::InMemoryDeviceStore;

    #[test]
    fn stale_record_is_treated_as_absent() {
        let store = InMemoryDeviceStore::new();
        let mut record = PrinterRecord::new(PrinterId::new("printer-1"));
        record.ip = Some("10.0.0.5".to_string());
        record.touch_last_seen(100);
        store.upsert(record).unwrap();

        let checker = SavedDeviceChecker::new(&store, Duration::from_secs(60));
        assert!(checker.check("10.0.0.5", 1000).unwrap().is_none());
        assert!(checker.check("10.0.0.5", 130).unwrap().is_some());
    }
}
