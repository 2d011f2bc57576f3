//! HTTP handlers, grouped by the spec component they front.

pub mod config_sync;
pub mod health;
pub mod models;
pub mod monitoring;
pub mod networks;
pub mod optimizer;
pub mod workers;
