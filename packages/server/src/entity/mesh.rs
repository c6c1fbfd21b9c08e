use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::{CollectionId, MeshId, UserId};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a mesh.
///
/// Every state is reachable from every state via an explicit update; the
/// only structural rule is that a mesh is born in `Processing`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MeshState {
    /// Uploaded files are being processed.
    Processing,
    /// The mesh is ready to serve.
    Ready,
    /// Processing determined the uploaded files are unusable.
    Invalid,
    /// Marked deleted; kept for bookkeeping, no transition out is taken in practice.
    Deleted,
}

impl MeshState {
    /// All possible state values.
    pub const ALL: &'static [MeshState] = &[
        Self::Processing,
        Self::Ready,
        Self::Invalid,
        Self::Deleted,
    ];

    /// Returns the string representation (lowercase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Invalid => "invalid",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for MeshState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for MeshState {
    fn default() -> Self {
        Self::Processing
    }
}

/// Error when parsing an invalid state string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStateError {
    invalid: String,
}

impl fmt::Display for ParseStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid state '{}'. Valid values: {}",
            self.invalid,
            MeshState::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStateError {}

impl FromStr for MeshState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "ready" => Ok(Self::Ready),
            "invalid" => Ok(Self::Invalid),
            "deleted" => Ok(Self::Deleted),
            _ => Err(ParseStateError {
                invalid: s.to_string(),
            }),
        }
    }
}

/// The user-facing 3-D asset record.
///
/// A mesh always references exactly one file collection; it is never
/// created without one. The owner is immutable after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub id: MeshId,
    pub owner: UserId,
    /// Monotonically increasing, compared on every catalog write.
    pub version: u32,
    /// Unique across the system, case-sensitive.
    pub name: String,
    pub short_desc: String,
    pub long_desc: String,
    pub state: MeshState,
    pub created: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub files: CollectionId,
}

impl Mesh {
    /// Build a fresh mesh around an already-persisted file collection.
    pub fn new(
        owner: UserId,
        name: String,
        short_desc: String,
        long_desc: String,
        files: CollectionId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: MeshId::generate(),
            owner,
            version: 1,
            name,
            short_desc,
            long_desc,
            state: MeshState::Processing,
            created: now,
            last_accessed: now,
            files,
        }
    }

    /// Whether `user` may interact with this mesh. Pure owner comparison.
    pub fn is_authorized(&self, user: UserId) -> bool {
        self.owner == user
    }
}
