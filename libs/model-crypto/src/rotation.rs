//! Key rotation: replace every live key for a model with a fresh one while
//! keeping the old key around (flagged `rotated`) so blocks already written
//! under it can still be decrypted.

use std::collections::HashMap;

use chrono::Utc;

use crate::keys::AesKeyMaterial;

/// Rotates every key in `keys_for_model` to a freshly generated replacement.
/// Hardware-bound lineage is preserved when `hardware_fingerprint` and
/// `license_key` are available; otherwise the replacement is a random key.
///
/// Returns a mapping `{old_key_id -> new_key_id}`. The caller is responsible
/// for persisting both the mutated old keys (now `rotated = true`) and the
/// newly created keys.
pub fn rotate_keys(
    keys_for_model: &mut [AesKeyMaterial],
    hardware_fingerprint: Option<&str>,
    license_key: Option<&str>,
) -> (HashMap<String, String>, Vec<AesKeyMaterial>) {
    let mut mapping = HashMap::new();
    let mut fresh_keys = Vec::new();
    let now = Utc::now();

    for old_key in keys_for_model.iter_mut() {
        if old_key.rotated {
            continue;
        }

        let replacement = match (old_key.hardware_bound, hardware_fingerprint, license_key) {
            (true, Some(fingerprint), Some(license)) => {
                AesKeyMaterial::derive_hardware_bound(fingerprint, license)
            }
            _ => AesKeyMaterial::generate_random(),
        };

        old_key.rotated = true;
        old_key.rotated_to = Some(replacement.key_id.clone());
        old_key.rotation_date = Some(now);

        mapping.insert(old_key.key_id.clone(), replacement.key_id.clone());
        fresh_keys.push(replacement);
    }

    (mapping, fresh_keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_preserves_hardware_binding_and_lineage() {
        let mut keys = vec![AesKeyMaterial::derive_hardware_bound("hw-1", "TIKT-PRO-12M-AB12CD")];
        let original_id = keys[0].key_id.clone();

        let (mapping, fresh) = rotate_keys(&mut keys, Some("hw-1"), Some("TIKT-PRO-12M-AB12CD"));

        assert!(keys[0].rotated);
        assert_eq!(keys[0].rotated_to.as_deref(), Some(fresh[0].key_id.as_str()));
        assert_eq!(mapping.get(&original_id), Some(&fresh[0].key_id));
        assert!(fresh[0].hardware_bound);
    }

    #[test]
    fn already_rotated_keys_are_skipped() {
        let mut key = AesKeyMaterial::generate_random();
        key.rotated = true;
        let mut keys = vec![key];
        let (mapping, fresh) = rotate_keys(&mut keys, None, None);
        assert!(mapping.is_empty());
        assert!(fresh.is_empty());
    }
}
