use crate::core::{DeferError, Result};
use serde::{Deserialize, Serialize};

/// Which half of a delta is written first during commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitOrder {
    /// Unlink removed members before linking new ones
    #[default]
    UnlinksFirst,
    LinksFirst,
}

/// Commit configuration
///
/// Similar to a connection config: built with chained setters, or read from
/// JSON where every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitConfig {
    /// Order of link and unlink writes
    pub order: CommitOrder,

    /// Reset the association to ghost after a successful commit
    pub reload_after_commit: bool,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            order: CommitOrder::UnlinksFirst,
            reload_after_commit: true,
        }
    }
}

impl CommitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the write order
    pub fn order(mut self, order: CommitOrder) -> Self {
        self.order = order;
        self
    }

    /// Set whether to reload after commit
    pub fn reload_after_commit(mut self, reload: bool) -> Self {
        self.reload_after_commit = reload;
        self
    }

    /// Parse from a JSON document
    ///
    /// # Examples
    ///
    /// ```
    /// use deferring::{CommitConfig, CommitOrder};
    ///
    /// let config = CommitConfig::from_json(r#"{"order": "links_first"}"#).unwrap();
    /// assert_eq!(config.order, CommitOrder::LinksFirst);
    /// assert!(config.reload_after_commit);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| DeferError::ConfigError(format!("invalid commit config: {}", e)))
    }
}
