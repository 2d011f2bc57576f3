//! Structured tracing initialization and panic capture shared by every
//! Tiktrue node (admin and worker alike).
//!
//! Production builds emit flat JSON events suitable for ingestion by a log
//! aggregator; debug builds emit compact, human-readable lines. Both modes
//! install a global panic hook so a collapse in a spawned task (discovery
//! loop, heartbeat loop, optimizer tick) is logged before the thread dies
//! instead of vanishing silently.

use std::panic;

use tracing::{error, info, instrument};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global tracing subscriber for `service_name`.
///
/// Honors `RUST_LOG` if set; otherwise defaults to `debug` for this crate's
/// own spans in debug builds and `info` in release builds, while quieting
/// the usual noisy dependencies.
///
/// # Panics
///
/// Panics if a global subscriber has already been installed in this
/// process.
#[instrument(skip_all)]
pub fn init_tracing(service_name: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "{service_name}={level},tower_http=warn,hyper=warn",
            level = if cfg!(debug_assertions) { "debug" } else { "info" }
        )
        .into()
    });

    if cfg!(debug_assertions) {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().flatten_event(true))
            .init();
    }

    let service_id = service_name.to_string();
    panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
            .unwrap_or("<no panic message>");

        error!(
            target: "panic",
            service = %service_id,
            location = %location,
            "thread panicked: {}",
            payload
        );
    }));

    info!(service = service_name, "tracing initialized");
}

#[cfg(test)]
mod tests {
    #[test]
    fn panic_payload_extraction_handles_str_and_string() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("literal");
        assert_eq!(boxed.downcast_ref::<&str>().copied(), Some("literal"));

        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(boxed.downcast_ref::<String>().map(String::as_str), Some("owned"));
    }
}
