//! Run identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier attached to every log event and report of one analysis run.
///
/// Format: `run-` followed by 12 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a fresh run ID.
    pub fn new() -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        RunId(format!("run-{}", &uuid[..12]))
    }

    /// Parse and validate an existing run ID.
    pub fn parse(s: &str) -> Option<Self> {
        let suffix = s.strip_prefix("run-")?;
        if suffix.len() != 12 || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(RunId(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_parse() {
        let id = RunId::new();
        assert_eq!(id.as_str().len(), 16);
        assert_eq!(RunId::parse(id.as_str()), Some(id));
    }

    #[test]
    fn rejects_malformed() {
        assert!(RunId::parse("run-123").is_none());
        assert!(RunId::parse("pt-0123456789ab").is_none());
        assert!(RunId::parse("run-0123456789zz").is_none());
    }
}
