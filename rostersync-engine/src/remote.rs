//! Abstract remote group directory.
//!
//! The engine only ever talks to the remote service through
//! [`GroupDirectory`]; the HTTP adapter lives in `rostersync-directory`.
//! Every error carries an [`ErrorClass`] assigned by the adapter at
//! construction time — the engine never inspects error text to decide how
//! to react.

use thiserror::Error;

use rostersync_core::types::{GroupId, PermissionMode, Role};

/// Current remote state of one group member.
///
/// `email` may be in any display form the provider chooses; `id` is the
/// provider's opaque, stable member identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMember {
    pub email: String,
    pub role: Role,
    pub id: String,
}

/// How the engine should react to a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Likely to succeed on retry (rate limit, timeout, backend blip).
    Transient,
    /// The membership already exists; resolve as a success no-op.
    Duplicate,
    /// The address is unknown to the provider; skip, no retry.
    NotFound,
    /// Permanent or semantic failure; abandon the action.
    Fatal,
}

/// A classified failure from the remote directory.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub class: ErrorClass,
    pub message: String,
}

impl RemoteError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Transient,
            message: message.into(),
        }
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Duplicate,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::NotFound,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Fatal,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class == ErrorClass::Transient
    }
}

/// Blocking interface to the remote group service.
///
/// `list_members` returns the COMPLETE membership — adapters drain
/// pagination internally. Mutations are applied one at a time in the order
/// the diff emitted them.
pub trait GroupDirectory {
    /// Posting policy of the group (affects report wording only).
    fn permission_mode(&self, group: &GroupId) -> Result<PermissionMode, RemoteError>;

    /// Full current membership of the group.
    fn list_members(&self, group: &GroupId) -> Result<Vec<RemoteMember>, RemoteError>;

    /// Insert a new membership.
    fn insert(&self, group: &GroupId, email: &str, role: Role) -> Result<(), RemoteError>;

    /// Change an existing membership's role, addressed by email.
    fn update_role(&self, group: &GroupId, email: &str, role: Role) -> Result<(), RemoteError>;

    /// Remove a membership by its opaque id — never by address. An address
    /// can be re-bound to a different remote identity over time; the id
    /// unambiguously names the membership being removed.
    fn delete(&self, group: &GroupId, id: &str) -> Result<(), RemoteError>;
}
