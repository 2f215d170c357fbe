//! Unique identifiers for PromptEvo entities.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a prompt Candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateId(Ulid);

impl CandidateId {
    /// Generate a new CandidateId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for CandidateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for CandidateId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Unique identifier for an evaluation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Ulid);

impl RecordId {
    /// Generate a new RecordId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier for a synthetic persona.
///
/// Personas are owned by the simulation side, so the id is an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonaId(pub String);

impl PersonaId {
    /// Create a new persona ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PersonaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PersonaId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
