//! YAML sync configuration.
//!
//! # File shape
//!
//! ```yaml
//! folding_domains:
//!   - gmail.com
//!   - googlemail.com
//! groups:
//!   - group: choir@example.org
//!     rules:
//!       - ministries: ["310-Adult Choir"]
//!     notify: [director-worship@example.org]
//!   - group: worship-chair@example.org
//!     rules:
//!       - custom:
//!           rule: ministry-chair
//!           params: { prefix: "103" }
//! ```
//!
//! Loading never touches the network; validation against the rule registry
//! is a separate step so callers can extend the registry first.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rules::RuleRegistry;
use crate::types::{GroupSpec, MatchRule};

/// Domains whose provider folds superficially different addresses into one
/// mailbox.
pub fn default_folding_domains() -> Vec<String> {
    vec!["gmail.com".to_string(), "googlemail.com".to_string()]
}

/// Root of the sync configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Domains known to fold addresses (dot-insensitive, `+suffix`-blind).
    #[serde(default = "default_folding_domains")]
    pub folding_domains: Vec<String>,

    /// Groups to synchronize, in run order.
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
}

impl SyncConfig {
    /// Look up a group spec by its remote address.
    pub fn find_group(&self, group: &str) -> Option<&GroupSpec> {
        self.groups.iter().find(|spec| spec.group.0 == group)
    }

    /// Check every custom rule reference against the registry.
    pub fn validate(&self, registry: &RuleRegistry) -> Result<(), ConfigError> {
        for spec in &self.groups {
            for rule in &spec.rules {
                if let MatchRule::Custom { rule, .. } = rule {
                    if !registry.contains(rule) {
                        return Err(ConfigError::UnknownRule {
                            group: spec.group.0.clone(),
                            rule: rule.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Load the sync configuration from a YAML file.
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with
/// path and line context) if malformed.
pub fn load(path: &Path) -> Result<SyncConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
