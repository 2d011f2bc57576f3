//! Maps every domain error taxonomy (spec §7) to an HTTP status and a JSON
//! body, so handlers can propagate with `?` instead of hand-rolling
//! responses at every call site.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

macro_rules! impl_from_error {
    ($error_type:ty, $status:expr) => {
        impl From<$error_type> for ApiError {
            fn from(err: $error_type) -> Self {
                ApiError::new($status, err.to_string())
            }
        }
    };
}

impl_from_error!(tiktrue_license::LicenseError, StatusCode::FORBIDDEN);
impl_from_error!(tiktrue_network::NetworkError, StatusCode::CONFLICT);
impl_from_error!(tiktrue_discovery::DiscoveryError, StatusCode::BAD_GATEWAY);
impl_from_error!(tiktrue_failover::FailoverError, StatusCode::CONFLICT);
impl_from_error!(tiktrue_config_sync::ConfigSyncError, StatusCode::FORBIDDEN);
impl_from_error!(tiktrue_monitoring::MonitoringError, StatusCode::BAD_REQUEST);
impl_from_error!(tiktrue_resource_optimizer::OptimizerError, StatusCode::NOT_FOUND);
impl_from_error!(tiktrue_model_crypto::CryptoError, StatusCode::UNPROCESSABLE_ENTITY);
impl_from_error!(crate::resources::ResourceError, StatusCode::INSUFFICIENT_STORAGE);
impl_from_error!(std::io::Error, StatusCode::INTERNAL_SERVER_ERROR);
