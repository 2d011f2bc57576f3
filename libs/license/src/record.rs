//! License record model, key parsing, and checksum computation (spec C2).

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::LicenseError;

/// License tier, ordered FREE < PRO < ENT (spec §3, §6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Free,
    Pro,
    Ent,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "FREE",
            Tier::Pro => "PRO",
            Tier::Ent => "ENT",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "FREE" => Some(Tier::Free),
            "PRO" => Some(Tier::Pro),
            "ENT" => Some(Tier::Ent),
            _ => None,
        }
    }

    /// The tier-keyed feature set of spec §6.2, additive from FREE upward.
    pub fn features(&self) -> BTreeSet<&'static str> {
        let mut features: BTreeSet<&'static str> = BTreeSet::new();
        features.insert("basic_inference");
        features.insert("single_network");
        features.insert("local_models");
        if *self >= Tier::Pro {
            features.insert("multi_network");
            features.insert("remote_models");
            features.insert("api_access");
            features.insert("basic_monitoring");
        }
        if *self >= Tier::Ent {
            features.insert("advanced_monitoring");
            features.insert("backup_restore");
            features.insert("custom_encryption");
            features.insert("priority_support");
            features.insert("unlimited_workers");
            features.insert("advanced_analytics");
        }
        features
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a license record (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LicenseStatus {
    Valid,
    Expired,
    Invalid,
    Suspended,
}

/// A fully parsed and validated license record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseRecord {
    pub license_key: String,
    pub plan: Tier,
    pub duration_months: u32,
    pub unique_id: String,
    pub expires_at: DateTime<Utc>,
    /// -1 means unlimited.
    pub max_clients: i64,
    pub allowed_models: BTreeSet<String>,
    pub allowed_features: BTreeSet<String>,
    pub status: LicenseStatus,
    /// Empty means unbound to any particular machine.
    pub hardware_signature: String,
    pub created_at: DateTime<Utc>,
    pub checksum: String,
}

fn checksum_over(
    license_key: &str,
    plan: Tier,
    duration_months: u32,
    unique_id: &str,
    expires_at: &DateTime<Utc>,
    max_clients: i64,
    allowed_models: &BTreeSet<String>,
    allowed_features: &BTreeSet<String>,
    hardware_signature: &str,
    created_at: &DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(license_key.as_bytes());
    hasher.update(plan.as_str().as_bytes());
    hasher.update(duration_months.to_le_bytes());
    hasher.update(unique_id.as_bytes());
    hasher.update(expires_at.to_rfc3339().as_bytes());
    hasher.update(max_clients.to_le_bytes());
    for model in allowed_models {
        hasher.update(model.as_bytes());
    }
    for feature in allowed_features {
        hasher.update(feature.as_bytes());
    }
    hasher.update(hardware_signature.as_bytes());
    hasher.update(created_at.to_rfc3339().as_bytes());
    hex::encode(hasher.finalize())
}

/// The parsed parts of a `TIKT-<TIER>-<N>M-<ID6>` license key (spec §6.1).
struct ParsedKey {
    tier: Tier,
    months: u32,
    unique_id: String,
}

fn parse_license_key(key: &str) -> Result<ParsedKey, LicenseError> {
    let parts: Vec<&str> = key.split('-').collect();
    if parts.len() != 4 || parts[0] != "TIKT" {
        return Err(LicenseError::InvalidFormat(key.to_string()));
    }

    let tier = Tier::parse(parts[1]).ok_or_else(|| LicenseError::InvalidFormat(key.to_string()))?;

    let months_part = parts[2];
    if !months_part.ends_with('M') {
        return Err(LicenseError::InvalidFormat(key.to_string()));
    }
    let months: u32 = months_part[..months_part.len() - 1]
        .parse()
        .map_err(|_| LicenseError::InvalidFormat(key.to_string()))?;

    let unique_id = parts[3];
    if unique_id.len() != 6 || !unique_id.chars().all(|c| c.is_ascii_alphanumeric() && (c.is_ascii_digit() || c.is_ascii_uppercase())) {
        return Err(LicenseError::InvalidFormat(key.to_string()));
    }

    Ok(ParsedKey {
        tier,
        months,
        unique_id: unique_id.to_string(),
    })
}

impl LicenseRecord {
    /// Builds and checksums a fresh license record from a well-formed key.
    /// Mirrors what the licensing backend would produce; exposed here so
    /// tests and local-dev tooling can mint records without a backend call.
    pub fn issue(
        license_key: &str,
        allowed_models: BTreeSet<String>,
        allowed_features: BTreeSet<String>,
        max_clients: i64,
        hardware_signature: String,
    ) -> Result<Self, LicenseError> {
        let parsed = parse_license_key(license_key)?;
        let created_at = Utc::now();
        let expires_at = created_at
            .checked_add_months(Months::new(parsed.months))
            .ok_or_else(|| LicenseError::InvalidFormat(license_key.to_string()))?;

        let checksum = checksum_over(
            license_key,
            parsed.tier,
            parsed.months,
            &parsed.unique_id,
            &expires_at,
            max_clients,
            &allowed_models,
            &allowed_features,
            &hardware_signature,
            &created_at,
        );

        Ok(Self {
            license_key: license_key.to_string(),
            plan: parsed.tier,
            duration_months: parsed.months,
            unique_id: parsed.unique_id,
            expires_at,
            max_clients,
            allowed_models,
            allowed_features,
            status: LicenseStatus::Valid,
            hardware_signature,
            created_at,
            checksum,
        })
    }

    /// Recomputes the checksum over this record's fields and compares it
    /// against the stored value.
    pub fn checksum_is_valid(&self) -> bool {
        let expected = checksum_over(
            &self.license_key,
            self.plan,
            self.duration_months,
            &self.unique_id,
            &self.expires_at,
            self.max_clients,
            &self.allowed_models,
            &self.allowed_features,
            &self.hardware_signature,
            &self.created_at,
        );
        expected == self.checksum
    }

    /// Validates this record against the current host, per spec §3's
    /// load invariant: `hardware_signature` must be empty (unbound) or equal
    /// to the current hardware fingerprint, else the record becomes INVALID.
    /// Also demotes to EXPIRED when past `expires_at`. Mutates `status` in
    /// place and returns the resulting status.
    pub fn revalidate(&mut self, current_hardware_signature: &str) -> LicenseStatus {
        if !self.checksum_is_valid() {
            self.status = LicenseStatus::Invalid;
            return self.status;
        }
        if !self.hardware_signature.is_empty() && self.hardware_signature != current_hardware_signature {
            self.status = LicenseStatus::Invalid;
            return self.status;
        }
        if self.status == LicenseStatus::Suspended {
            return self.status;
        }
        if Utc::now() > self.expires_at {
            self.status = LicenseStatus::Expired;
            return self.status;
        }
        self.status = LicenseStatus::Valid;
        self.status
    }

    pub fn is_valid(&self) -> bool {
        self.status == LicenseStatus::Valid
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.allowed_features.contains(feature) || self.plan.features().contains(feature)
    }

    pub fn allows_model(&self, model_id: &str) -> bool {
        self.allowed_models.is_empty() || self.allowed_models.contains(model_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_models() -> BTreeSet<String> {
        ["llama3_1_8b_fp16", "mistral_7b_int4"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn valid_key_parses_and_checksums() {
        let record = LicenseRecord::issue(
            "TIKT-PRO-6M-XYZ789",
            sample_models(),
            BTreeSet::new(),
            20,
            String::new(),
        )
        .unwrap();
        assert_eq!(record.plan, Tier::Pro);
        assert_eq!(record.duration_months, 6);
        assert!(record.checksum_is_valid());
    }

    #[test]
    fn malformed_keys_are_rejected() {
        for bad in ["TIKT-PRO-6M", "TIKT-XXX-6M-ABCDEF", "TIKT-PRO-6-ABCDEF", "TIKT-PRO-6M-abcdef"] {
            assert!(LicenseRecord::issue(bad, BTreeSet::new(), BTreeSet::new(), 1, String::new()).is_err());
        }
    }

    #[test]
    fn tampering_with_a_field_invalidates_the_checksum() {
        let mut record =
            LicenseRecord::issue("TIKT-FREE-1M-AB12CD", BTreeSet::new(), BTreeSet::new(), 3, String::new()).unwrap();
        record.max_clients = 999;
        assert!(!record.checksum_is_valid());
    }

    #[test]
    fn hardware_mismatch_invalidates_a_bound_license() {
        let mut record = LicenseRecord::issue(
            "TIKT-ENT-12M-AB12CD",
            BTreeSet::new(),
            BTreeSet::new(),
            -1,
            "hw-aaa".to_string(),
        )
        .unwrap();
        assert_eq!(record.revalidate("hw-bbb"), LicenseStatus::Invalid);
    }

    #[test]
    fn unbound_license_passes_any_hardware() {
        let mut record =
            LicenseRecord::issue("TIKT-FREE-1M-AB12CD", BTreeSet::new(), BTreeSet::new(), 3, String::new()).unwrap();
        assert_eq!(record.revalidate("hw-anything"), LicenseStatus::Valid);
    }

    #[test]
    fn tier_ordering_matches_spec() {
        assert!(Tier::Free < Tier::Pro);
        assert!(Tier::Pro < Tier::Ent);
    }

    #[test]
    fn ent_features_are_a_superset_of_pro_and_free() {
        let free = Tier::Free.features();
        let pro = Tier::Pro.features();
        let ent = Tier::Ent.features();
        assert!(free.is_subset(&pro));
        assert!(pro.is_subset(&ent));
    }
}
