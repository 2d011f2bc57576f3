//! Wire protocol: message envelopes, typed payloads, and a validator.

pub mod envelope;
pub mod error;
pub mod message;
pub mod payloads;
pub mod validator;

pub use envelope::{LicenseStatusProtocol, MessageHeader, MessageType, ProtocolVersion, SupportedVersions};
pub use error::ProtocolError;
pub use message::ProtocolMessage;
pub use payloads::{
    DiscoveryPayload, ErrorPayload, FieldError, FinishReason, HeartbeatPayload,
    InferenceRequestPayload, InferenceResponsePayload, LicenseCheckPayload, ModelSyncPayload,
    Payload, WorkerRegistrationPayload,
};
pub use validator::{ProtocolValidator, ValidationCounters};
