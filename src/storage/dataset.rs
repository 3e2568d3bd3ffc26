use log::{debug, warn};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use super::{DeviceId, StorageError};
use crate::session::CompositeRecord;

const EMPTY_DOCUMENT: &[u8] = b"[]";

/// One JSON array document per device under `base`.
///
/// Appends are a read-modify-rewrite of the whole document. The rewrite goes to a
/// sibling temp file that is renamed over the dataset, so an interrupted write loses
/// at most the record being appended and never leaves a truncated document behind.
pub struct DatasetStore {
    base: PathBuf,
    write_lock: Mutex<()>,
}

impl DatasetStore {
    pub fn new(base: PathBuf) -> Self {
        DatasetStore {
            base,
            write_lock: Mutex::new(()),
        }
    }

    pub fn dataset_path(&self, device: &DeviceId) -> PathBuf {
        self.base.join(format!("{}.json", device))
    }

    fn temp_path(&self, device: &DeviceId) -> PathBuf {
        self.base.join(format!("{}.json.tmp", device))
    }

    /// Appends `record` and returns the dataset length afterwards.
    ///
    /// A missing or unparseable document is treated as empty.
    pub fn append(&self, device: &DeviceId, record: &CompositeRecord) -> Result<usize, StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut documents = match self.read_documents(device) {
            Ok(documents) => documents,
            Err(e) => {
                warn!(
                    "Dataset {} unreadable, starting a new one: {}",
                    self.dataset_path(device).display(),
                    e
                );
                Vec::new()
            }
        };

        documents.push(serde_json::to_value(record)?);
        self.write_documents(device, &documents)?;
        debug!("Appended record {} for {}", documents.len(), device);
        Ok(documents.len())
    }

    pub fn read_all(&self, device: &DeviceId) -> Result<Vec<CompositeRecord>, StorageError> {
        let path = self.dataset_path(device);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read(&path)?;
        Ok(serde_json::from_slice(&content)?)
    }

    /// Truncates the dataset to an empty array, whatever it held before.
    pub fn reset(&self, device: &DeviceId) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.write_bytes(device, EMPTY_DOCUMENT)
    }

    /// The stored document exactly as it sits on disk. An absent dataset exports as `[]`.
    pub fn export_bytes(&self, device: &DeviceId) -> Result<Vec<u8>, StorageError> {
        match fs::read(self.dataset_path(device)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(EMPTY_DOCUMENT.to_vec()),
            Err(e) => Err(e.into()),
        }
    }

    fn read_documents(&self, device: &DeviceId) -> Result<Vec<Value>, StorageError> {
        let path = self.dataset_path(device);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read(&path)?;
        Ok(serde_json::from_slice(&content)?)
    }

    fn write_documents(&self, device: &DeviceId, documents: &[Value]) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(documents)?;
        self.write_bytes(device, &bytes)
    }

    fn write_bytes(&self, device: &DeviceId, bytes: &[u8]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base)?;
        let temp = self.temp_path(device);
        fs::write(&temp, bytes)?;
        fs::rename(&temp, self.dataset_path(device))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheSnapshot, LocationSample, MotionSample, ACCELEROMETER};
    use crate::session::ActivityType;
    use chrono::{TimeZone, Utc};

    fn store() -> (tempfile::TempDir, DatasetStore, DeviceId) {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path().to_path_buf());
        (dir, store, DeviceId::new("dev1").unwrap())
    }

    fn record(device: &DeviceId, second: u32) -> CompositeRecord {
        let mut snapshot = CacheSnapshot::default();
        snapshot.location = Some(LocationSample::new(second as f64, 2.0));
        snapshot
            .motion
            .insert(ACCELEROMETER.to_string(), MotionSample::new(0.1, 0.2, 9.8));
        CompositeRecord::assemble(
            snapshot,
            device,
            ActivityType::Walk,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, second).unwrap(),
        )
    }

    #[test]
    fn test_read_missing_is_empty() {
        let (_dir, store, device) = store();
        assert!(store.read_all(&device).unwrap().is_empty());
    }

    #[test]
    fn test_append_preserves_order() {
        let (_dir, store, device) = store();
        let records: Vec<_> = (0..5).map(|i| record(&device, i)).collect();
        for (i, r) in records.iter().enumerate() {
            assert_eq!(store.append(&device, r).unwrap(), i + 1);
        }
        assert_eq!(store.read_all(&device).unwrap(), records);
    }

    #[test]
    fn test_append_over_corrupt_document_starts_fresh() {
        let (dir, store, device) = store();
        fs::write(dir.path().join("dev1.json"), b"{not json").unwrap();

        assert!(store.read_all(&device).is_err());
        assert_eq!(store.append(&device, &record(&device, 1)).unwrap(), 1);
        assert_eq!(store.read_all(&device).unwrap().len(), 1);
    }

    #[test]
    fn test_append_keeps_foreign_fields() {
        let (dir, store, device) = store();
        let legacy = r#"[{"sensorData":{},"activityType":"2","deviceId":"dev1","timestamp":"2024-03-01T12:00:00.000Z","mocked":false}]"#;
        fs::write(dir.path().join("dev1.json"), legacy).unwrap();

        store.append(&device, &record(&device, 1)).unwrap();

        let raw: Vec<Value> =
            serde_json::from_slice(&store.export_bytes(&device).unwrap()).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0]["mocked"], Value::Bool(false));
    }

    #[test]
    fn test_reset_truncates() {
        let (_dir, store, device) = store();
        for i in 0..3 {
            store.append(&device, &record(&device, i)).unwrap();
        }
        store.reset(&device).unwrap();
        assert!(store.read_all(&device).unwrap().is_empty());
        assert_eq!(store.export_bytes(&device).unwrap(), b"[]");
    }

    #[test]
    fn test_reset_without_prior_dataset() {
        let (_dir, store, device) = store();
        store.reset(&device).unwrap();
        assert!(store.dataset_path(&device).exists());
        assert!(store.read_all(&device).unwrap().is_empty());
    }

    #[test]
    fn test_export_is_literal_document() {
        let (_dir, store, device) = store();
        assert_eq!(store.export_bytes(&device).unwrap(), b"[]");

        store.append(&device, &record(&device, 7)).unwrap();
        let on_disk = fs::read(store.dataset_path(&device)).unwrap();
        assert_eq!(store.export_bytes(&device).unwrap(), on_disk);
    }

    #[test]
    fn test_datasets_are_keyed_by_device() {
        let (_dir, store, device) = store();
        let other = DeviceId::new("dev2").unwrap();
        store.append(&device, &record(&device, 1)).unwrap();
        store.append(&other, &record(&other, 1)).unwrap();
        store.append(&other, &record(&other, 2)).unwrap();

        assert_eq!(store.read_all(&device).unwrap().len(), 1);
        assert_eq!(store.read_all(&other).unwrap().len(), 2);
    }
}
