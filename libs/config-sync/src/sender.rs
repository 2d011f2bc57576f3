use futures::future::BoxFuture;

use crate::error::ConfigSyncError;
use crate::types::ConfigurationChange;

/// Transmits a configuration change to a target node. The wire transport
/// is left pluggable, matching how other control-plane components keep
/// their transport out of the state-machine crate.
pub trait ChangeSender: Send + Sync {
    fn send<'a>(&'a self, target_node: &'a str, change: &'a ConfigurationChange) -> BoxFuture<'a, Result<(), ConfigSyncError>>;
}
