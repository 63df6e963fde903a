//! Wire payloads and error classification for the Google group APIs.
//!
//! Everything here is a pure function of bytes already received, so the
//! interesting logic is testable without a network.

use serde::Deserialize;

use rostersync_core::types::{PermissionMode, Role};
use rostersync_engine::{RemoteError, RemoteMember};

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// One page of a group's member listing.
#[derive(Debug, Deserialize)]
pub(crate) struct MembersPage {
    #[serde(default)]
    pub members: Vec<WireMember>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMember {
    pub email: String,
    #[serde(default)]
    pub role: String,
    pub id: String,
}

impl WireMember {
    /// Lower-case everything the provider sent; display casing is noise.
    pub fn into_remote(self) -> RemoteMember {
        RemoteMember {
            email: self.email.to_lowercase(),
            role: role_from_wire(&self.role),
            id: self.id.to_lowercase(),
        }
    }
}

/// Subset of the Groups Settings resource.
#[derive(Debug, Deserialize)]
pub(crate) struct GroupSettings {
    #[serde(rename = "whoCanPostMessage")]
    pub who_can_post_message: Option<String>,
}

// ---------------------------------------------------------------------------
// Role / permission-mode mapping
// ---------------------------------------------------------------------------

pub(crate) fn role_to_wire(role: Role) -> &'static str {
    match role {
        Role::Owner => "OWNER",
        Role::Member => "MEMBER",
    }
}

/// `OWNER` is the elevated role; `MANAGER` and `MEMBER` both map to the
/// standard role.
pub(crate) fn role_from_wire(role: &str) -> Role {
    if role.eq_ignore_ascii_case("owner") {
        Role::Owner
    } else {
        Role::Member
    }
}

/// Map the group's posting policy onto broadcast vs discussion.
pub(crate) fn permission_mode_from_policy(who_can_post: Option<&str>) -> PermissionMode {
    match who_can_post {
        Some("ANYONE_CAN_POST") | Some("ALL_MEMBERS_CAN_POST") | Some("ALL_IN_DOMAIN_CAN_POST") => {
            PermissionMode::Discussion
        }
        _ => PermissionMode::Broadcast,
    }
}

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    errors: Vec<ErrorItem>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorItem {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

/// Classify a failed API call from its HTTP status and error body.
///
/// The structured `reason` strings are authoritative; the status code is
/// only a fallback for bodies that aren't the documented error shape.
pub(crate) fn classify(context: &str, status: u16, body: &str) -> RemoteError {
    let mut detail_message = String::new();

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(detail) = parsed.error {
            for item in &detail.errors {
                let reason = item.reason.as_str();
                let message = format!("{context}: {reason}: {}", item.message);
                if reason == "duplicate" || reason == "memberExists" {
                    return RemoteError::duplicate(message);
                }
                if reason == "notFound"
                    || reason == "memberNotFound"
                    || reason.contains("Resource Not Found")
                {
                    return RemoteError::not_found(message);
                }
                if matches!(
                    reason,
                    "rateLimitExceeded"
                        | "userRateLimitExceeded"
                        | "quotaExceeded"
                        | "backendError"
                ) {
                    return RemoteError::transient(message);
                }
            }
            detail_message = detail.message;
        }
    }

    let summary = if detail_message.is_empty() {
        format!("{context}: HTTP {status}")
    } else {
        format!("{context}: HTTP {status}: {detail_message}")
    };
    match status {
        409 => RemoteError::duplicate(summary),
        404 => RemoteError::not_found(summary),
        429 | 500..=599 => RemoteError::transient(summary),
        _ => RemoteError::fatal(summary),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
