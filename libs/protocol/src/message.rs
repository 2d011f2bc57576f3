use serde::{Deserialize, Serialize};

use crate::envelope::MessageHeader;
use crate::payloads::Payload;

/// A complete wire message: header plus typed payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolMessage {
    pub header: MessageHeader,
    pub payload: Payload,
}

impl ProtocolMessage {
    pub fn new(header: MessageHeader, payload: Payload) -> Self {
        Self { header, payload }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
