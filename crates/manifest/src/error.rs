//! Manifest error types.

use std::fmt;

/// The four manifest members, in the order they must appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
    Type,
    Category,
}

impl Field {
    /// Members in document order.
    pub const ORDER: [Field; 4] = [Field::Title, Field::Description, Field::Type, Field::Category];

    /// JSON member name.
    pub fn name(self) -> &'static str {
        match self {
            Field::Title => "Title",
            Field::Description => "Description",
            Field::Type => "Type",
            Field::Category => "Category",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors produced while loading or validating a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected item JSON object")]
    NotAnObject,

    #[error("expected only 4 values, found {0}")]
    MemberCount(usize),

    #[error("expected Title, Description, Type, Category")]
    MemberOrder,

    #[error("{0} is not a string")]
    NotAString(Field),

    #[error("{field} is longer than {max} characters")]
    TooLong { field: Field, max: usize },

    #[error("Category is not an array")]
    CategoryNotArray,

    #[error("Category is an empty array")]
    NoCategories,

    #[error("Category has more than {0} elements")]
    TooManyCategories(usize),

    #[error("Category element is not a string")]
    CategoryNotString,

    #[error("Type: expected Map, found {0:?}")]
    UnknownType(String),

    #[error("Category: expected Singleplayer, Coop, Deathmatch, found {0:?}")]
    UnknownCategory(String),
}
