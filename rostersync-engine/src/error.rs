//! Error types for rostersync-engine.

use thiserror::Error;

use crate::remote::RemoteError;

/// All errors that can arise from a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote call failed and was not recoverable for this group.
    #[error("remote error for group {group}: {source}")]
    Remote {
        group: String,
        #[source]
        source: RemoteError,
    },

    /// A group spec references a custom rule the registry does not know.
    #[error("unknown custom rule '{rule}'")]
    UnknownRule { rule: String },

    /// The requested group is not in the configuration.
    #[error("no such group in config: {0}")]
    UnknownGroup(String),
}

/// Convenience constructor for [`SyncError::Remote`].
pub(crate) fn remote_err(group: &rostersync_core::types::GroupId, source: RemoteError) -> SyncError {
    SyncError::Remote {
        group: group.0.clone(),
        source,
    }
}
