use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::document::Document;
use crate::error::{Field, ManifestError};
use crate::{MAX_CATEGORIES, MAX_DESCRIPTION_LEN, MAX_TITLE_LEN, MIN_CATEGORIES};

/// Kind of workshop item. Only maps are publishable for now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemType {
    Map,
}

impl ItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Map => "Map",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Map" => Some(ItemType::Map),
            _ => None,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Game mode category. Variant order is the canonical tag order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Category {
    Singleplayer,
    Coop,
    Deathmatch,
}

impl Category {
    /// All categories in canonical order.
    pub const ALL: [Category; 3] = [Category::Singleplayer, Category::Coop, Category::Deathmatch];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Singleplayer => "Singleplayer",
            Category::Coop => "Coop",
            Category::Deathmatch => "Deathmatch",
        }
    }

    /// Looks up a category by its exact (case-sensitive) name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated workshop item manifest.
///
/// Values are only produced by [`Manifest::from_json`], [`Manifest::load`]
/// or the `Deserialize` impl, all of which run the full validation.
/// Serializing writes the four members back in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "Type")]
    item_type: ItemType,
    #[serde(rename = "Category")]
    categories: Vec<Category>,
}

impl Manifest {
    /// Parses and validates a manifest from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        let document: Document = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    /// Reads and validates the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    /// Selected categories, deduplicated, in canonical order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Builds the listing tags: `tool_tag`, the item type, then each category.
    pub fn tags(&self, tool_tag: &str) -> Vec<String> {
        let mut tags = Vec::with_capacity(2 + self.categories.len());
        tags.push(tool_tag.to_string());
        tags.push(self.item_type.as_str().to_string());
        tags.extend(self.categories.iter().map(|c| c.as_str().to_string()));
        tags
    }

    fn from_document(document: Document) -> Result<Self, ManifestError> {
        let Document::Object(members) = document else {
            return Err(ManifestError::NotAnObject);
        };
        if members.len() != Field::ORDER.len() {
            return Err(ManifestError::MemberCount(members.len()));
        }
        let names_match = members
            .iter()
            .zip(Field::ORDER)
            .all(|((name, _), field)| name == field.name());
        if !names_match {
            return Err(ManifestError::MemberOrder);
        }

        let mut values = members.into_iter().map(|(_, value)| value);
        let (Some(title), Some(description), Some(item_type), Some(categories)) =
            (values.next(), values.next(), values.next(), values.next())
        else {
            return Err(ManifestError::MemberCount(0));
        };

        let title = bounded_string(title, Field::Title, MAX_TITLE_LEN)?;
        let description = bounded_string(description, Field::Description, MAX_DESCRIPTION_LEN)?;
        let Value::String(item_type) = item_type else {
            return Err(ManifestError::NotAString(Field::Type));
        };
        let names = category_names(categories)?;

        // Shape is checked for every member before any value is interpreted.
        let item_type =
            ItemType::from_name(&item_type).ok_or(ManifestError::UnknownType(item_type))?;

        let mut categories = Vec::with_capacity(names.len());
        for name in names {
            let category =
                Category::from_name(&name).ok_or(ManifestError::UnknownCategory(name))?;
            categories.push(category);
        }
        categories.sort_unstable();
        categories.dedup();

        Ok(Self {
            title,
            description,
            item_type,
            categories,
        })
    }
}

impl<'de> Deserialize<'de> for Manifest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let document = Document::deserialize(deserializer)?;
        Self::from_document(document).map_err(serde::de::Error::custom)
    }
}

fn bounded_string(value: Value, field: Field, max: usize) -> Result<String, ManifestError> {
    let Value::String(s) = value else {
        return Err(ManifestError::NotAString(field));
    };
    if s.len() > max {
        return Err(ManifestError::TooLong { field, max });
    }
    Ok(s)
}

fn category_names(value: Value) -> Result<Vec<String>, ManifestError> {
    let Value::Array(elements) = value else {
        return Err(ManifestError::CategoryNotArray);
    };
    if elements.len() < MIN_CATEGORIES {
        return Err(ManifestError::NoCategories);
    }
    if elements.len() > MAX_CATEGORIES {
        return Err(ManifestError::TooManyCategories(MAX_CATEGORIES));
    }
    elements
        .into_iter()
        .map(|element| match element {
            Value::String(s) => Ok(s),
            _ => Err(ManifestError::CategoryNotString),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "Title": "Castle Siege",
        "Description": "A four player arena.",
        "Type": "Map",
        "Category": ["Deathmatch", "Coop"]
    }"#;

    fn manifest_json(title: &str, description: &str, ty: &str, category: &str) -> String {
        format!(
            r#"{{"Title": {title}, "Description": {description}, "Type": {ty}, "Category": {category}}}"#
        )
    }

    fn err(json: &str) -> ManifestError {
        Manifest::from_json(json).unwrap_err()
    }

    #[test]
    fn parses_valid_manifest() {
        let m = Manifest::from_json(VALID).unwrap();
        assert_eq!(m.title(), "Castle Siege");
        assert_eq!(m.description(), "A four player arena.");
        assert_eq!(m.item_type(), ItemType::Map);
        assert_eq!(m.categories(), [Category::Coop, Category::Deathmatch]);
    }

    #[test]
    fn duplicate_categories_collapse() {
        let json = manifest_json(
            r#""T""#,
            r#""D""#,
            r#""Map""#,
            r#"["Coop", "Coop", "Singleplayer"]"#,
        );
        let m = Manifest::from_json(&json).unwrap();
        assert_eq!(m.categories(), [Category::Singleplayer, Category::Coop]);
    }

    #[test]
    fn tags_start_with_tool_and_type() {
        let m = Manifest::from_json(VALID).unwrap();
        assert_eq!(m.tags("1.2.3"), ["1.2.3", "Map", "Coop", "Deathmatch"]);
    }

    #[test]
    fn rejects_non_object() {
        assert!(matches!(err("[]"), ManifestError::NotAnObject));
        assert!(matches!(err("\"Map\""), ManifestError::NotAnObject));
    }

    #[test]
    fn rejects_syntax_errors() {
        assert!(matches!(err("{\"Title\": "), ManifestError::Json(_)));
    }

    #[test]
    fn rejects_missing_and_extra_members() {
        let missing = r#"{"Title": "T", "Description": "D", "Type": "Map"}"#;
        assert!(matches!(err(missing), ManifestError::MemberCount(3)));

        let extra = r#"{"Title": "T", "Description": "D", "Type": "Map", "Category": ["Coop"], "Author": "x"}"#;
        assert!(matches!(err(extra), ManifestError::MemberCount(5)));
    }

    #[test]
    fn duplicate_member_counts_as_extra() {
        let dup = r#"{"Title": "T", "Description": "D", "Type": "Map", "Category": ["Coop"], "Title": "U"}"#;
        assert!(matches!(err(dup), ManifestError::MemberCount(5)));
    }

    #[test]
    fn rejects_wrong_order() {
        let swapped = r#"{"Description": "D", "Title": "T", "Type": "Map", "Category": ["Coop"]}"#;
        assert!(matches!(err(swapped), ManifestError::MemberOrder));
    }

    #[test]
    fn member_names_are_case_sensitive() {
        let lower = r#"{"title": "T", "Description": "D", "Type": "Map", "Category": ["Coop"]}"#;
        assert!(matches!(err(lower), ManifestError::MemberOrder));
    }

    #[test]
    fn rejects_wrong_types() {
        let json = manifest_json("1", r#""D""#, r#""Map""#, r#"["Coop"]"#);
        assert!(matches!(err(&json), ManifestError::NotAString(Field::Title)));

        let json = manifest_json(r#""T""#, "null", r#""Map""#, r#"["Coop"]"#);
        assert!(matches!(err(&json), ManifestError::NotAString(Field::Description)));

        let json = manifest_json(r#""T""#, r#""D""#, "[]", r#"["Coop"]"#);
        assert!(matches!(err(&json), ManifestError::NotAString(Field::Type)));

        let json = manifest_json(r#""T""#, r#""D""#, r#""Map""#, r#""Coop""#);
        assert!(matches!(err(&json), ManifestError::CategoryNotArray));

        let json = manifest_json(r#""T""#, r#""D""#, r#""Map""#, r#"["Coop", 2]"#);
        assert!(matches!(err(&json), ManifestError::CategoryNotString));
    }

    #[test]
    fn title_length_limit_is_inclusive() {
        let ok = format!("\"{}\"", "a".repeat(MAX_TITLE_LEN));
        let json = manifest_json(&ok, r#""D""#, r#""Map""#, r#"["Coop"]"#);
        assert!(Manifest::from_json(&json).is_ok());

        let long = format!("\"{}\"", "a".repeat(MAX_TITLE_LEN + 1));
        let json = manifest_json(&long, r#""D""#, r#""Map""#, r#"["Coop"]"#);
        assert!(matches!(
            err(&json),
            ManifestError::TooLong {
                field: Field::Title,
                max: MAX_TITLE_LEN
            }
        ));
    }

    #[test]
    fn lengths_are_measured_in_bytes() {
        // 65 two-byte characters = 130 bytes.
        let title = format!("\"{}\"", "é".repeat(65));
        let json = manifest_json(&title, r#""D""#, r#""Map""#, r#"["Coop"]"#);
        assert!(matches!(err(&json), ManifestError::TooLong { .. }));
    }

    #[test]
    fn description_limit() {
        let long = format!("\"{}\"", "d".repeat(MAX_DESCRIPTION_LEN + 1));
        let json = manifest_json(r#""T""#, &long, r#""Map""#, r#"["Coop"]"#);
        assert!(matches!(
            err(&json),
            ManifestError::TooLong {
                field: Field::Description,
                ..
            }
        ));
    }

    #[test]
    fn category_count_limits() {
        let json = manifest_json(r#""T""#, r#""D""#, r#""Map""#, "[]");
        assert!(matches!(err(&json), ManifestError::NoCategories));

        let json = manifest_json(
            r#""T""#,
            r#""D""#,
            r#""Map""#,
            r#"["Coop", "Coop", "Coop", "Coop"]"#,
        );
        assert!(matches!(err(&json), ManifestError::TooManyCategories(3)));
    }

    #[test]
    fn rejects_unknown_values() {
        let json = manifest_json(r#""T""#, r#""D""#, r#""Mod""#, r#"["Coop"]"#);
        assert!(matches!(err(&json), ManifestError::UnknownType(t) if t == "Mod"));

        let json = manifest_json(r#""T""#, r#""D""#, r#""Map""#, r#"["coop"]"#);
        assert!(matches!(err(&json), ManifestError::UnknownCategory(c) if c == "coop"));
    }

    #[test]
    fn shape_errors_win_over_value_errors() {
        // Bad Type value, but Category is not even an array.
        let json = manifest_json(r#""T""#, r#""D""#, r#""Mod""#, "{}");
        assert!(matches!(err(&json), ManifestError::CategoryNotArray));
    }

    #[test]
    fn serializes_in_document_order() {
        let m = Manifest::from_json(VALID).unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(
            json,
            r#"{"Title":"Castle Siege","Description":"A four player arena.","Type":"Map","Category":["Coop","Deathmatch"]}"#
        );
        assert_eq!(Manifest::from_json(&json).unwrap(), m);
    }

    #[test]
    fn deserialize_impl_validates() {
        let ok: Result<Manifest, _> = serde_json::from_str(VALID);
        assert!(ok.is_ok());

        let bad: Result<Manifest, _> = serde_json::from_str(r#"{"Title": "T"}"#);
        let msg = bad.unwrap_err().to_string();
        assert!(msg.contains("expected only 4 values"), "{msg}");
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("item.json");
        std::fs::write(&path, VALID).unwrap();
        assert_eq!(Manifest::load(&path).unwrap().title(), "Castle Siege");

        let missing = Manifest::load(&dir.path().join("nope.json"));
        assert!(matches!(missing, Err(ManifestError::Io(_))));
    }
}
