//! Blocking client for the Google Admin Directory / Groups Settings APIs.

use std::time::Duration;

use rostersync_core::types::{GroupId, PermissionMode, Role};
use rostersync_engine::{GroupDirectory, RemoteError, RemoteMember};

use crate::wire;

/// Production base URL for the Admin Directory API.
pub const DIRECTORY_BASE: &str = "https://admin.googleapis.com";
/// Production base URL for the Groups Settings API.
pub const SETTINGS_BASE: &str = "https://www.googleapis.com";

/// Remote group directory over HTTPS.
///
/// One client serves any number of groups; it holds only the agent and the
/// bearer token. All calls are blocking with a fixed request timeout.
pub struct DirectoryClient {
    agent: ureq::Agent,
    token: String,
    directory_base: String,
    settings_base: String,
}

impl DirectoryClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_urls(token, DIRECTORY_BASE, SETTINGS_BASE)
    }

    /// Override the API endpoints; used by tests to point at a local server.
    pub fn with_base_urls(
        token: impl Into<String>,
        directory_base: impl Into<String>,
        settings_base: impl Into<String>,
    ) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(30))
                .build(),
            token: token.into(),
            directory_base: directory_base.into(),
            settings_base: settings_base.into(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn members_url(&self, group: &GroupId) -> String {
        format!(
            "{}/admin/directory/v1/groups/{}/members",
            self.directory_base,
            encode_segment(&group.0)
        )
    }
}

/// Map a ureq failure onto a classified remote error.
///
/// Transport-level failures (DNS, connect, timeout) are transient; HTTP
/// error statuses are classified from the response body.
fn remote_error(context: &str, err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            wire::classify(context, status, &body)
        }
        transport => RemoteError::transient(format!("{context}: {transport}")),
    }
}

fn parse_error(context: &str, err: std::io::Error) -> RemoteError {
    RemoteError::fatal(format!("{context}: malformed response: {err}"))
}

/// Percent-encode a URL path segment (group addresses and member keys
/// contain `@` and sometimes `+`).
fn encode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

impl GroupDirectory for DirectoryClient {
    fn permission_mode(&self, group: &GroupId) -> Result<PermissionMode, RemoteError> {
        let url = format!(
            "{}/groups/v1/groups/{}?fields=whoCanPostMessage&alt=json",
            self.settings_base,
            encode_segment(&group.0)
        );
        let response = self
            .agent
            .get(&url)
            .set("Authorization", &self.auth_header())
            .call()
            .map_err(|e| remote_error("fetch group settings", e))?;
        let settings: wire::GroupSettings = response
            .into_json()
            .map_err(|e| parse_error("fetch group settings", e))?;

        let mode = wire::permission_mode_from_policy(settings.who_can_post_message.as_deref());
        log::debug!(
            "{group}: whoCanPostMessage={:?} -> {mode}",
            settings.who_can_post_message
        );
        Ok(mode)
    }

    fn list_members(&self, group: &GroupId) -> Result<Vec<RemoteMember>, RemoteError> {
        let mut members = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!(
                "{}?maxResults=200&fields=nextPageToken,members(email,role,id)",
                self.members_url(group)
            );
            if let Some(token) = &page_token {
                url.push_str("&pageToken=");
                url.push_str(&encode_segment(token));
            }

            let response = self
                .agent
                .get(&url)
                .set("Authorization", &self.auth_header())
                .call()
                .map_err(|e| remote_error("list members", e))?;
            let page: wire::MembersPage = response
                .into_json()
                .map_err(|e| parse_error("list members", e))?;

            members.extend(page.members.into_iter().map(wire::WireMember::into_remote));
            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        log::debug!("{group}: {} remote member(s)", members.len());
        Ok(members)
    }

    fn insert(&self, group: &GroupId, email: &str, role: Role) -> Result<(), RemoteError> {
        self.agent
            .post(&self.members_url(group))
            .set("Authorization", &self.auth_header())
            .send_json(serde_json::json!({
                "email": email,
                "role": wire::role_to_wire(role),
            }))
            .map_err(|e| remote_error("insert member", e))?;
        Ok(())
    }

    fn update_role(&self, group: &GroupId, email: &str, role: Role) -> Result<(), RemoteError> {
        let url = format!("{}/{}", self.members_url(group), encode_segment(email));
        self.agent
            .put(&url)
            .set("Authorization", &self.auth_header())
            .send_json(serde_json::json!({
                "email": email,
                "role": wire::role_to_wire(role),
            }))
            .map_err(|e| remote_error("update member role", e))?;
        Ok(())
    }

    fn delete(&self, group: &GroupId, id: &str) -> Result<(), RemoteError> {
        let url = format!("{}/{}", self.members_url(group), encode_segment(id));
        self.agent
            .delete(&url)
            .set("Authorization", &self.auth_header())
            .call()
            .map_err(|e| remote_error("delete member", e))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
