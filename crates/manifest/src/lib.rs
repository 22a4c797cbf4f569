//! Workshop item manifest: schema and strict validation.
//!
//! Every item folder carries a `<NAME>.json` describing the listing:
//!
//! ```json
//! {
//!     "Title": "Castle Siege",
//!     "Description": "A four player arena.",
//!     "Type": "Map",
//!     "Category": ["Coop", "Deathmatch"]
//! }
//! ```
//!
//! The schema is fixed. Member order matters, duplicate members count as
//! extra members, and the first violation found is reported.

mod document;
mod error;
mod manifest;

pub use error::{Field, ManifestError};
pub use manifest::{Category, ItemType, Manifest};

/// Maximum title length in bytes.
pub const MAX_TITLE_LEN: usize = 128;

/// Maximum description length in bytes.
pub const MAX_DESCRIPTION_LEN: usize = 8000;

/// Minimum number of categories an item must declare.
pub const MIN_CATEGORIES: usize = 1;

/// Maximum number of categories an item may declare.
pub const MAX_CATEGORIES: usize = 3;
