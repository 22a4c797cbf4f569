//! Identifiers and request/response types shared by every backend.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform application id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(pub u32);

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Id of a published workshop listing. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublishedFileId(u64);

/// Error returned by [`PublishedFileId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0} is not a valid ID")]
pub struct InvalidFileId(pub String);

impl PublishedFileId {
    /// Wraps a raw id; zero is not a valid id.
    pub fn new(raw: u64) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    /// Parses a decimal id. Only ASCII digits are accepted (no sign,
    /// whitespace or radix prefix) and the value must be non-zero.
    pub fn parse(s: &str) -> Result<Self, InvalidFileId> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidFileId(s.to_string()));
        }
        s.parse::<u64>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| InvalidFileId(s.to_string()))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PublishedFileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PublishedFileId {
    type Err = InvalidFileId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Who can see a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public = 0,
    FriendsOnly = 1,
    Private = 2,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::FriendsOnly => write!(f, "friends only"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

/// Listing kind, numbered as the platform numbers them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    #[default]
    Community = 0,
    Microtransaction = 1,
    Collection = 2,
    Art = 3,
    Video = 4,
    Screenshot = 5,
    Game = 6,
    Software = 7,
    Concept = 8,
    WebGuide = 9,
    IntegratedGuide = 10,
}

/// Per-user cloud storage quota, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudQuota {
    pub total: u64,
    pub available: u64,
}

impl CloudQuota {
    pub fn used(&self) -> u64 {
        self.total.saturating_sub(self.available)
    }
}

/// A new listing referencing two shared cloud files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub file_name: String,
    pub preview_name: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub file_type: FileType,
}

/// Replacement content for an existing listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub file_name: String,
    pub preview_name: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub change_note: Option<String>,
}

/// What the platform knows about a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedFileDetails {
    pub id: PublishedFileId,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub file_name: String,
    pub preview_name: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}
