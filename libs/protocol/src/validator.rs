//! Validation with running counters, one per kind of failure (spec §4.2).

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::envelope::SupportedVersions;
use crate::message::ProtocolMessage;

#[derive(Debug, Clone, Default)]
pub struct ValidationCounters {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub failures_by_kind: HashMap<String, u64>,
}

/// Validates messages against the node's accepted protocol versions and each
/// payload's own field rules. Validation failures are reported, never raised.
pub struct ProtocolValidator {
    supported_versions: SupportedVersions,
    counters: RwLock<ValidationCounters>,
}

impl Default for ProtocolValidator {
    fn default() -> Self {
        Self::new(SupportedVersions::default())
    }
}

impl ProtocolValidator {
    pub fn new(supported_versions: SupportedVersions) -> Self {
        Self {
            supported_versions,
            counters: RwLock::new(ValidationCounters::default()),
        }
    }

    /// Returns `(is_valid, error)`. Never panics or propagates an error for a
    /// malformed message; that fact is the return value itself.
    pub fn validate_message(&self, message: &ProtocolMessage) -> (bool, Option<String>) {
        let mut counters = self.counters.write();
        counters.total += 1;

        if !self.supported_versions.accepts(message.header.protocol_version) {
            let reason = format!(
                "unsupported protocol version: {}",
                message.header.protocol_version.as_str()
            );
            counters.failed += 1;
            *counters
                .failures_by_kind
                .entry("unsupported_version".to_string())
                .or_insert(0) += 1;
            return (false, Some(reason));
        }

        let field_errors = message.payload.validate();
        if !field_errors.is_empty() {
            let reason = field_errors
                .iter()
                .map(|(field, reason)| format!("{field}: {reason}"))
                .collect::<Vec<_>>()
                .join("; ");
            counters.failed += 1;
            for (field, _) in &field_errors {
                *counters
                    .failures_by_kind
                    .entry(field.to_string())
                    .or_insert(0) += 1;
            }
            return (false, Some(reason));
        }

        counters.successful += 1;
        (true, None)
    }

    pub fn counters(&self) -> ValidationCounters {
        self.counters.read().clone()
    }

    pub fn reset_counters(&self) {
        *self.counters.write() = ValidationCounters::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{MessageHeader, MessageType, ProtocolVersion};
    use crate::payloads::{HeartbeatPayload, Payload};

    fn heartbeat(worker_id: &str, cpu: f64) -> ProtocolMessage {
        ProtocolMessage::new(
            MessageHeader::new(MessageType::Heartbeat, "worker-1"),
            Payload::Heartbeat(HeartbeatPayload {
                worker_id: worker_id.to_string(),
                cpu_percent: cpu,
                memory_percent: 10.0,
                active_sessions: 1,
                loaded_models: vec![],
            }),
        )
    }

    #[test]
    fn valid_message_passes_and_increments_successful() {
        let validator = ProtocolValidator::default();
        let (ok, err) = validator.validate_message(&heartbeat("w1", 50.0));
        assert!(ok);
        assert!(err.is_none());
        assert_eq!(validator.counters().successful, 1);
    }

    #[test]
    fn out_of_range_field_fails_and_is_counted_by_kind() {
        let validator = ProtocolValidator::default();
        let (ok, err) = validator.validate_message(&heartbeat("w1", 150.0));
        assert!(!ok);
        assert!(err.is_some());
        let counters = validator.counters();
        assert_eq!(counters.failed, 1);
        assert_eq!(*counters.failures_by_kind.get("cpu_percent").unwrap(), 1);
    }

    #[test]
    fn unsupported_version_is_rejected_before_payload_validation() {
        let validator = ProtocolValidator::new(SupportedVersions::new(vec![ProtocolVersion::V1_1]));
        let mut message = heartbeat("w1", 50.0);
        message.header.protocol_version = ProtocolVersion::V2_0;
        let (ok, err) = validator.validate_message(&message);
        assert!(!ok);
        assert!(err.unwrap().contains("unsupported protocol version"));
        let counters = validator.counters();
        assert_eq!(*counters.failures_by_kind.get("unsupported_version").unwrap(), 1);
    }

    #[test]
    fn counters_track_total_across_mixed_results() {
        let validator = ProtocolValidator::default();
        validator.validate_message(&heartbeat("w1", 50.0));
        validator.validate_message(&heartbeat("w1", 500.0));
        let counters = validator.counters();
        assert_eq!(counters.total, 2);
        assert_eq!(counters.successful, 1);
        assert_eq!(counters.failed, 1);
    }
}
