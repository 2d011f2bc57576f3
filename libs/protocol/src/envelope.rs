//! Message header and supported-version gating (spec §4.2, §6.8).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
    #[serde(rename = "1.1")]
    V1_1,
    #[serde(rename = "2.0")]
    V2_0,
}

impl ProtocolVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolVersion::V1_1 => "1.1",
            ProtocolVersion::V2_0 => "2.0",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    InferenceRequest,
    InferenceResponse,
    Heartbeat,
    StatusUpdate,
    Error,
    Authentication,
    LicenseCheck,
    NetworkDiscovery,
    WorkerRegistration,
    ModelSync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LicenseStatusProtocol {
    Valid,
    Expired,
    Invalid,
    Missing,
    Suspended,
}

/// Standard header carried by every protocol message (spec §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageHeader {
    pub message_id: String,
    pub message_type: MessageType,
    pub protocol_version: ProtocolVersion,
    pub timestamp: DateTime<Utc>,
    pub sender_id: Option<String>,
    pub recipient_id: Option<String>,
    pub correlation_id: Option<String>,
    pub license_hash: Option<String>,
    pub license_status: LicenseStatusProtocol,
    pub session_id: Option<String>,
}

impl MessageHeader {
    pub fn new(message_type: MessageType, sender_id: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            message_type,
            protocol_version: ProtocolVersion::V2_0,
            timestamp: Utc::now(),
            sender_id: Some(sender_id.into()),
            recipient_id: None,
            correlation_id: None,
            license_hash: None,
            license_status: LicenseStatusProtocol::Missing,
            session_id: None,
        }
    }
}

/// The set of protocol versions this node accepts (spec §4.2 default
/// `{1.1, 2.0}`, configurable per node).
#[derive(Debug, Clone)]
pub struct SupportedVersions(Vec<ProtocolVersion>);

impl Default for SupportedVersions {
    fn default() -> Self {
        Self(vec![ProtocolVersion::V1_1, ProtocolVersion::V2_0])
    }
}

impl SupportedVersions {
    pub fn new(versions: Vec<ProtocolVersion>) -> Self {
        Self(versions)
    }

    pub fn accepts(&self, version: ProtocolVersion) -> bool {
        self.0.contains(&version)
    }
}
