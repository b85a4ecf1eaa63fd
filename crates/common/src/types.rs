use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a learning path.
///
/// Minted by the coordinator before any remote call and used as the
/// functional key of the matching diagram record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LearningPathId(Uuid);

impl LearningPathId {
    /// Creates a new random learning path ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a learning path ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for LearningPathId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LearningPathId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LearningPathId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl From<Uuid> for LearningPathId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<LearningPathId> for Uuid {
    fn from(id: LearningPathId) -> Self {
        id.0
    }
}

/// Identity of an authenticated caller, as issued by the identity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bearer credential forwarded to downstream services for audit attribution.
///
/// The token is never printed by `Debug`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// A credential carrying no token. Downstream calls are still made so the
    /// remote side can reject them.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Returns the token to place in an `Authorization: Bearer` header, if any.
    pub fn bearer(&self) -> Option<&str> {
        if self.is_empty() {
            None
        } else {
            Some(self.0.trim())
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            f.write_str("Credential(<none>)")
        } else {
            f.write_str("Credential(<redacted>)")
        }
    }
}
