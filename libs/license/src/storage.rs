//! Encrypted at-rest license storage, bound to the host (spec C3).
//!
//! The license record is serialized to JSON then AES-256-GCM-encrypted with
//! a key derived from the host's hardware fingerprint. This does not protect
//! against a sophisticated attacker with full disk access and knowledge of
//! the derivation scheme; it protects against casual copying of the license
//! blob to another machine, consistent with the hardware-binding invariant
//! in spec §3.

use std::path::{Path, PathBuf};

use tiktrue_model_crypto::block::{decrypt_block, encrypt_block};
use tiktrue_model_crypto::keys::AesKeyMaterial;

use crate::error::LicenseError;
use crate::hardware::generate_fingerprint;
use crate::record::LicenseRecord;

const STORAGE_PASSPHRASE: &str = "tiktrue-license-storage-v1";
const LICENSE_FILE_NAME: &str = "license.enc";
const BACKUP_FILE_NAME: &str = "license.enc.bak";

pub struct LicenseStorage {
    storage_dir: PathBuf,
}

impl LicenseStorage {
    pub fn new(storage_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let storage_dir = storage_dir.into();
        std::fs::create_dir_all(&storage_dir)?;
        Ok(Self { storage_dir })
    }

    fn license_path(&self) -> PathBuf {
        self.storage_dir.join(LICENSE_FILE_NAME)
    }

    fn backup_path(&self) -> PathBuf {
        self.storage_dir.join(BACKUP_FILE_NAME)
    }

    fn storage_key(&self) -> AesKeyMaterial {
        AesKeyMaterial::derive_hardware_bound(&generate_fingerprint(), STORAGE_PASSPHRASE)
    }

    /// Encrypts and writes `record`, replacing any existing file atomically
    /// (write to a temp path, then rename).
    pub fn save(&self, record: &LicenseRecord) -> Result<(), LicenseError> {
        let plaintext = serde_json::to_vec(record)
            .map_err(|e| LicenseError::StorageCorrupt(e.to_string()))?;
        let encrypted = encrypt_block(&plaintext, &self.storage_key())
            .map_err(|e| LicenseError::StorageCorrupt(e.to_string()))?;
        let blob = serde_json::to_vec(&encrypted).map_err(|e| LicenseError::StorageCorrupt(e.to_string()))?;

        let tmp_path = self.storage_dir.join(format!("{LICENSE_FILE_NAME}.tmp"));
        std::fs::write(&tmp_path, &blob)?;
        std::fs::rename(&tmp_path, self.license_path())?;
        Ok(())
    }

    /// Loads and decrypts the stored license, if any. Corrupt or missing
    /// storage yields `Ok(None)` rather than an error; a caller treats that
    /// the same as "no license loaded".
    pub fn load(&self) -> Result<Option<LicenseRecord>, LicenseError> {
        Self::load_from(&self.license_path(), &self.storage_key())
    }

    fn load_from(path: &Path, key: &AesKeyMaterial) -> Result<Option<LicenseRecord>, LicenseError> {
        if !path.exists() {
            return Ok(None);
        }
        let blob = std::fs::read(path)?;
        let encrypted = serde_json::from_slice(&blob).map_err(|e| LicenseError::StorageCorrupt(e.to_string()))?;
        let plaintext =
            decrypt_block(&encrypted, key).map_err(|e| LicenseError::StorageCorrupt(e.to_string()))?;
        let record: LicenseRecord =
            serde_json::from_slice(&plaintext).map_err(|e| LicenseError::StorageCorrupt(e.to_string()))?;
        Ok(Some(record))
    }

    /// Copies the current license file to a backup path.
    pub fn backup(&self) -> Result<(), LicenseError> {
        std::fs::copy(self.license_path(), self.backup_path())?;
        Ok(())
    }

    /// Restores the license file from its backup, overwriting any current one.
    pub fn restore_from_backup(&self) -> Result<Option<LicenseRecord>, LicenseError> {
        let backup = self.backup_path();
        if !backup.exists() {
            return Ok(None);
        }
        std::fs::copy(&backup, self.license_path())?;
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn sample_record() -> LicenseRecord {
        LicenseRecord::issue(
            "TIKT-PRO-6M-XYZ789",
            BTreeSet::new(),
            BTreeSet::new(),
            20,
            String::new(),
        )
        .unwrap()
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let storage = LicenseStorage::new(dir.path()).unwrap();
        let record = sample_record();

        storage.save(&record).unwrap();
        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded.license_key, record.license_key);
        assert_eq!(loaded.checksum, record.checksum);
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempdir().unwrap();
        let storage = LicenseStorage::new(dir.path()).unwrap();
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn backup_and_restore_recovers_an_overwritten_license() {
        let dir = tempdir().unwrap();
        let storage = LicenseStorage::new(dir.path()).unwrap();

        let original = sample_record();
        storage.save(&original).unwrap();
        storage.backup().unwrap();

        let replacement = LicenseRecord::issue(
            "TIKT-FREE-1M-AB12CD",
            BTreeSet::new(),
            BTreeSet::new(),
            3,
            String::new(),
        )
        .unwrap();
        storage.save(&replacement).unwrap();

        let restored = storage.restore_from_backup().unwrap().unwrap();
        assert_eq!(restored.license_key, original.license_key);
    }
}
