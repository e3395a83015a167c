use crate::model::PrinterId;
use crate::{Error, PrinterRecord};

/// External persistence contract. A JSON-on-disk implementation lives in the
/// agent binary; tests substitute an in-memory store the same way SNMP tests
/// substitute `MockSnmpClient`.
pub trait DeviceStore: Send + Sync {
    fn get(&self, id: &PrinterId) -> Result<Option<PrinterRecord>, Error>;
    fn get_by_ip(&self, ip: &str) -> Result<Option<PrinterRecord>, Error>;
    fn upsert(&self, record: PrinterRecord) -> Result<(), Error>;
    fn all(&self) -> Result<Vec<PrinterRecord>, Error>;
    fn remove(&self, id: &PrinterId) -> Result<(), Error>;
}

pub mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Default)]
    pub struct InMemoryDeviceStore {
        records: Mutex<HashMap<PrinterId, PrinterRecord>>,
    }

    impl InMemoryDeviceStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl DeviceStore for InMemoryDeviceStore {
        fn get(&self, id: &PrinterId) -> Result<Option<PrinterRecord>, Error> {
            Ok(self.records.lock().unwrap().get(id).cloned())
        }

        fn get_by_ip(&self, ip: &str) -> Result<Option<PrinterRecord>, Error> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .values()
                .find(|record| record.ip.as_deref() == Some(ip))
                .cloned())
        }

        fn upsert(&self, record: PrinterRecord) -> Result<(), Error> {
            self.records.lock().unwrap().insert(record.id.clone(), record);
            Ok(())
        }

        fn all(&self) -> Result<Vec<PrinterRecord>, Error> {
            Ok(self.records.lock().unwrap().values().cloned().collect())
        }

        fn remove(&self, id: &PrinterId) -> Result<(), Error> {
            self.records.lock().unwrap().remove(id);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::InMemoryDeviceStore;
    use super::*;

    #[test]
    fn upsert_then_get_round_trips() {
        let store = InMemoryDeviceStore::new();
        let id = PrinterId::new("printer-1");
        let mut record = PrinterRecord::new(id.clone());
        record.ip = Some("10.0.0.5".to_string());
        store.upsert(record.clone()).unwrap();

        assert_eq!(store.get(&id).unwrap(), Some(record.clone()));
        assert_eq!(store.get_by_ip("10.0.0.5").unwrap(), Some(record));
    }

    #[test]
    fn remove_drops_the_record() {
        let store = InMemoryDeviceStore::new();
        let id = PrinterId::new("printer-1");
        store.upsert(PrinterRecord::new(id.clone())).unwrap();
        store.remove(&id).unwrap();
        assert_eq!(store.get(&id).unwrap(), None);
    }
}
