//! Caller-selectable expansion depth for entity fetches.
//!
//! The depth decides how many relationship hops a fetched graph includes and
//! therefore which columns the backing join query must produce.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Depth selection errors. Both variants are caller-input errors, not
/// internal faults.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DepthError {
    #[error("unknown depth level: {0}")]
    InvalidDepth(String),

    #[error("depth level 'deep' is not supported for bulk fetches")]
    UnsupportedDepthForBulk,
}

/// How many relationship hops a fetched entity graph includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthLevel {
    /// Only the entity's own columns, no join.
    Shallow,
    /// The entity plus one level of related entities.
    Medium,
    /// The entity, its related entities, and each related entity's own
    /// relations back to the original kind.
    Deep,
}

impl DepthLevel {
    /// Parse a caller-supplied depth token, case-insensitively.
    pub fn parse(token: &str) -> Result<Self, DepthError> {
        match token.to_ascii_lowercase().as_str() {
            "shallow" => Ok(DepthLevel::Shallow),
            "medium" => Ok(DepthLevel::Medium),
            "deep" => Ok(DepthLevel::Deep),
            _ => Err(DepthError::InvalidDepth(token.to_string())),
        }
    }

    /// Parse an optional token; an omitted token means shallow.
    pub fn parse_or_default(token: Option<&str>) -> Result<Self, DepthError> {
        token.map_or(Ok(DepthLevel::Shallow), Self::parse)
    }

    /// Reject depths a bulk (find-all) fetch cannot serve.
    ///
    /// Deep expands the full bidirectional graph, which is unbounded over an
    /// entire table, so it is only available on single-entity lookups.
    pub fn for_bulk(self) -> Result<Self, DepthError> {
        if self == DepthLevel::Deep {
            return Err(DepthError::UnsupportedDepthForBulk);
        }
        Ok(self)
    }

    /// Whether rows at this depth carry related-entity columns.
    pub fn includes_related(self) -> bool {
        self >= DepthLevel::Medium
    }

    /// Whether rows at this depth carry secondary-entity columns.
    pub fn includes_secondary(self) -> bool {
        self == DepthLevel::Deep
    }
}

impl std::fmt::Display for DepthLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DepthLevel::Shallow => write!(f, "shallow"),
            DepthLevel::Medium => write!(f, "medium"),
            DepthLevel::Deep => write!(f, "deep"),
        }
    }
}

impl std::str::FromStr for DepthLevel {
    type Err = DepthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
