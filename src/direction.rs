//! Per-user translation direction.
//!
//! The direction store is the only state that outlives a single event. It is
//! injected into the session dispatcher as a trait object so tests can hand
//! each case its own in-memory instance.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque chat participant identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which language is the source and which is the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// English source, Kurdish target
    EnToKu,
    /// Kurdish source, English target
    KuToEn,
}

impl Default for Direction {
    fn default() -> Self {
        Self::EnToKu
    }
}

impl Direction {
    pub fn as_token(&self) -> &'static str {
        match self {
            Self::EnToKu => "en_to_ku",
            Self::KuToEn => "ku_to_en",
        }
    }

    /// Accepted spellings for mode-change requests, used in usage text
    pub fn accepted_tokens() -> Vec<&'static str> {
        DIRECTION_TOKENS.iter().map(|(token, _)| *token).collect()
    }
}

/// Every spelling `FromStr` accepts, lowercase
const DIRECTION_TOKENS: &[(&str, Direction)] = &[
    ("en_to_ku", Direction::EnToKu),
    ("en-to-ku", Direction::EnToKu),
    ("en-ku", Direction::EnToKu),
    ("en>ku", Direction::EnToKu),
    ("en", Direction::EnToKu),
    ("english", Direction::EnToKu),
    ("ku_to_en", Direction::KuToEn),
    ("ku-to-en", Direction::KuToEn),
    ("ku-en", Direction::KuToEn),
    ("ku>en", Direction::KuToEn),
    ("ku", Direction::KuToEn),
    ("kurdish", Direction::KuToEn),
    ("badini", Direction::KuToEn),
];

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDirection(pub String);

impl fmt::Display for UnknownDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown direction '{}'", self.0)
    }
}

impl std::error::Error for UnknownDirection {}

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        DIRECTION_TOKENS
            .iter()
            .find(|(token, _)| *token == wanted)
            .map(|(_, direction)| *direction)
            .ok_or_else(|| UnknownDirection(s.to_string()))
    }
}

/// Key-value store mapping users to their current direction.
///
/// Writes for different users never interfere. Same-user races resolve as
/// last write wins.
pub trait DirectionStore: Send + Sync {
    /// Stored direction, or the store default when the user never set one
    fn get(&self, user: UserId) -> Direction;

    /// Overwrite the user's direction
    fn set(&self, user: UserId, direction: Direction);
}

/// Process-local store backed by a sharded concurrent map
pub struct InMemoryDirectionStore {
    directions: DashMap<UserId, Direction>,
    default: Direction,
}

impl InMemoryDirectionStore {
    pub fn new() -> Self {
        Self::with_default(Direction::default())
    }

    pub fn with_default(default: Direction) -> Self {
        Self {
            directions: DashMap::new(),
            default,
        }
    }

    /// Number of users with an explicit direction
    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }
}

impl Default for InMemoryDirectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectionStore for InMemoryDirectionStore {
    fn get(&self, user: UserId) -> Direction {
        self.directions
            .get(&user)
            .map(|entry| *entry.value())
            .unwrap_or(self.default)
    }

    fn set(&self, user: UserId, direction: Direction) {
        self.directions.insert(user, direction);
    }
}
