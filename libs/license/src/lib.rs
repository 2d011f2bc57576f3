//! License model, validation, hardware fingerprinting, and encrypted at-rest
//! storage (spec components C1-C3).

pub mod error;
pub mod hardware;
pub mod record;
pub mod storage;

pub use error::LicenseError;
pub use hardware::generate_fingerprint;
pub use record::{LicenseRecord, LicenseStatus, Tier};
pub use storage::LicenseStorage;

/// Process-wide license enforcer: owns the currently loaded license and
/// revalidates it against the host on every load (spec §9 "Global state").
pub struct LicenseEnforcer {
    storage: LicenseStorage,
    current: Option<LicenseRecord>,
}

impl LicenseEnforcer {
    pub fn new(storage_dir: impl Into<std::path::PathBuf>) -> Result<Self, LicenseError> {
        let storage = LicenseStorage::new(storage_dir)?;
        let mut enforcer = Self { storage, current: None };
        enforcer.reload()?;
        Ok(enforcer)
    }

    /// Reloads the license from disk and revalidates it against the current
    /// hardware fingerprint, per the load invariant in spec §3.
    pub fn reload(&mut self) -> Result<(), LicenseError> {
        let fingerprint = generate_fingerprint();
        self.current = self.storage.load()?.map(|mut record| {
            record.revalidate(&fingerprint);
            record
        });
        Ok(())
    }

    pub fn install(&mut self, record: LicenseRecord) -> Result<(), LicenseError> {
        self.storage.save(&record)?;
        self.current = Some(record);
        self.reload()
    }

    pub fn current(&self) -> Option<&LicenseRecord> {
        self.current.as_ref()
    }

    /// Returns `Ok(())` if a valid license is loaded, else the specific
    /// `LicenseError` explaining why not.
    pub fn require_valid(&self) -> Result<&LicenseRecord, LicenseError> {
        let record = self.current.as_ref().ok_or(LicenseError::Missing)?;
        match record.status {
            LicenseStatus::Valid => Ok(record),
            LicenseStatus::Expired => Err(LicenseError::Expired(record.expires_at.to_rfc3339())),
            LicenseStatus::Invalid => Err(LicenseError::HardwareMismatch),
            LicenseStatus::Suspended => Err(LicenseError::InvalidFormat("license suspended".to_string())),
        }
    }

    pub fn tier(&self) -> Option<Tier> {
        self.current.as_ref().map(|r| r.plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    #[test]
    fn enforcer_rejects_actions_with_no_license_loaded() {
        let dir = tempdir().unwrap();
        let enforcer = LicenseEnforcer::new(dir.path()).unwrap();
        assert_eq!(enforcer.require_valid().unwrap_err(), LicenseError::Missing);
    }

    #[test]
    fn installing_an_unbound_license_makes_it_valid() {
        let dir = tempdir().unwrap();
        let mut enforcer = LicenseEnforcer::new(dir.path()).unwrap();
        let record = LicenseRecord::issue(
            "TIKT-PRO-6M-XYZ789",
            BTreeSet::new(),
            BTreeSet::new(),
            20,
            String::new(),
        )
        .unwrap();
        enforcer.install(record).unwrap();
        assert!(enforcer.require_valid().is_ok());
        assert_eq!(enforcer.tier(), Some(Tier::Pro));
    }
}
