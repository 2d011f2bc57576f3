//! Typed message payloads and their field-level validation (spec §4.2).

use serde::{Deserialize, Serialize};

/// A single field validation failure: `(field, reason)`.
pub type FieldError = (&'static str, String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRequestPayload {
    pub model_id: String,
    pub prompt: String,
    pub max_tokens: i64,
    pub temperature: f64,
    pub top_p: f64,
    pub stream: bool,
}

impl InferenceRequestPayload {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.model_id.trim().is_empty() {
            errors.push(("model_id", "model_id is required".to_string()));
        }
        if self.prompt.is_empty() {
            errors.push(("prompt", "prompt is required".to_string()));
        }
        if self.max_tokens <= 0 {
            errors.push(("max_tokens", "max_tokens must be greater than zero".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            errors.push(("temperature", "temperature must be within [0, 2]".to_string()));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            errors.push(("top_p", "top_p must be within [0, 1]".to_string()));
        }
        errors
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    Stop,
    Length,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResponsePayload {
    pub request_id: String,
    pub text: String,
    pub tokens_generated: i64,
    pub finish_reason: FinishReason,
    pub latency_ms: f64,
}

impl InferenceResponsePayload {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.request_id.trim().is_empty() {
            errors.push(("request_id", "request_id is required".to_string()));
        }
        if self.tokens_generated < 0 {
            errors.push(("tokens_generated", "tokens_generated cannot be negative".to_string()));
        }
        if self.latency_ms < 0.0 {
            errors.push(("latency_ms", "latency_ms cannot be negative".to_string()));
        }
        errors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatPayload {
    pub worker_id: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub active_sessions: i64,
    pub loaded_models: Vec<String>,
}

impl HeartbeatPayload {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.worker_id.trim().is_empty() {
            errors.push(("worker_id", "worker_id is required".to_string()));
        }
        if !(0.0..=100.0).contains(&self.cpu_percent) {
            errors.push(("cpu_percent", "cpu_percent must be within [0, 100]".to_string()));
        }
        if !(0.0..=100.0).contains(&self.memory_percent) {
            errors.push(("memory_percent", "memory_percent must be within [0, 100]".to_string()));
        }
        if self.active_sessions < 0 {
            errors.push(("active_sessions", "active_sessions cannot be negative".to_string()));
        }
        errors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ErrorPayload {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.code.trim().is_empty() {
            errors.push(("code", "code is required".to_string()));
        }
        if self.message.trim().is_empty() {
            errors.push(("message", "message is required".to_string()));
        }
        errors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseCheckPayload {
    pub license_key: String,
    pub hardware_fingerprint: String,
}

impl LicenseCheckPayload {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.license_key.trim().is_empty() {
            errors.push(("license_key", "license_key is required".to_string()));
        }
        if self.hardware_fingerprint.trim().is_empty() {
            errors.push(("hardware_fingerprint", "hardware_fingerprint is required".to_string()));
        }
        errors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryPayload {
    pub network_id: String,
    pub network_name: String,
    pub admin_address: String,
    pub admin_port: u16,
    pub worker_count: i64,
}

impl DiscoveryPayload {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.network_id.trim().is_empty() {
            errors.push(("network_id", "network_id is required".to_string()));
        }
        if self.admin_address.trim().is_empty() {
            errors.push(("admin_address", "admin_address is required".to_string()));
        }
        if self.admin_port == 0 {
            errors.push(("admin_port", "admin_port must be nonzero".to_string()));
        }
        errors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRegistrationPayload {
    pub worker_id: String,
    pub worker_name: String,
    pub hardware_fingerprint: String,
    pub capabilities: Vec<String>,
    pub public_key_pem: String,
}

impl WorkerRegistrationPayload {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.worker_id.trim().is_empty() {
            errors.push(("worker_id", "worker_id is required".to_string()));
        }
        if self.public_key_pem.trim().is_empty() {
            errors.push(("public_key_pem", "public_key_pem is required".to_string()));
        }
        errors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSyncPayload {
    pub model_id: String,
    pub block_count: i64,
    pub manifest_checksum: String,
}

impl ModelSyncPayload {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.model_id.trim().is_empty() {
            errors.push(("model_id", "model_id is required".to_string()));
        }
        if self.block_count < 0 {
            errors.push(("block_count", "block_count cannot be negative".to_string()));
        }
        if self.manifest_checksum.trim().is_empty() {
            errors.push(("manifest_checksum", "manifest_checksum is required".to_string()));
        }
        errors
    }
}

/// Every payload shape a message envelope can carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "payload_type", content = "payload")]
pub enum Payload {
    InferenceRequest(InferenceRequestPayload),
    InferenceResponse(InferenceResponsePayload),
    Heartbeat(HeartbeatPayload),
    Error(ErrorPayload),
    LicenseCheck(LicenseCheckPayload),
    Discovery(DiscoveryPayload),
    WorkerRegistration(WorkerRegistrationPayload),
    ModelSync(ModelSyncPayload),
}

impl Payload {
    pub fn validate(&self) -> Vec<FieldError> {
        match self {
            Payload::InferenceRequest(p) => p.validate(),
            Payload::InferenceResponse(p) => p.validate(),
            Payload::Heartbeat(p) => p.validate(),
            Payload::Error(p) => p.validate(),
            Payload::LicenseCheck(p) => p.validate(),
            Payload::Discovery(p) => p.validate(),
            Payload::WorkerRegistration(p) => p.validate(),
            Payload::ModelSync(p) => p.validate(),
        }
    }
}
