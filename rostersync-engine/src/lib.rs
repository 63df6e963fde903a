//! # rostersync-engine
//!
//! Roster reconciliation: compute the target roster for a group, diff it
//! against the remote group's current membership, and apply the minimal set
//! of mutations.
//!
//! Call [`pipeline::run`] to process every configured group (or one, via
//! [`pipeline::SyncScope`]); the remote service is abstracted behind
//! [`remote::GroupDirectory`].

pub mod apply;
pub mod diff;
pub mod error;
pub mod identity;
pub mod pipeline;
pub mod remote;
pub mod retry;
pub mod roster;

pub use apply::{ChangeLogRow, SyncRunContext};
pub use diff::Action;
pub use error::SyncError;
pub use pipeline::{GroupOutcome, Notifier, SyncScope};
pub use remote::{ErrorClass, GroupDirectory, RemoteError, RemoteMember};
pub use roster::RosterEntry;
