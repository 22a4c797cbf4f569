//! Order-preserving view of a JSON document.
//!
//! `serde_json::Value` sorts object members and folds duplicates, which
//! would hide both order and count violations. The manifest is read through
//! this type instead, which keeps the top-level members exactly as written.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::Value;

/// Top-level shape of a manifest document.
#[derive(Debug)]
pub(crate) enum Document {
    /// An object, members in document order (duplicates kept).
    Object(Vec<(String, Value)>),
    /// Anything other than an object.
    Other,
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DocumentVisitor)
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = Document;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON document")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Document, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut members = Vec::with_capacity(map.size_hint().unwrap_or(4));
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            members.push((key, value));
        }
        Ok(Document::Object(members))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Document, A::Error>
    where
        A: SeqAccess<'de>,
    {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Document::Other)
    }

    fn visit_bool<E: de::Error>(self, _v: bool) -> Result<Document, E> {
        Ok(Document::Other)
    }

    fn visit_i64<E: de::Error>(self, _v: i64) -> Result<Document, E> {
        Ok(Document::Other)
    }

    fn visit_u64<E: de::Error>(self, _v: u64) -> Result<Document, E> {
        Ok(Document::Other)
    }

    fn visit_f64<E: de::Error>(self, _v: f64) -> Result<Document, E> {
        Ok(Document::Other)
    }

    fn visit_str<E: de::Error>(self, _v: &str) -> Result<Document, E> {
        Ok(Document::Other)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Document, E> {
        Ok(Document::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(doc: &Document) -> Vec<&str> {
        match doc {
            Document::Object(members) => members.iter().map(|(k, _)| k.as_str()).collect(),
            Document::Other => Vec::new(),
        }
    }

    #[test]
    fn keeps_member_order() {
        let doc: Document = serde_json::from_str(r#"{"b": 1, "a": 2, "c": 3}"#).unwrap();
        assert_eq!(keys(&doc), ["b", "a", "c"]);
    }

    #[test]
    fn keeps_duplicate_members() {
        let doc: Document = serde_json::from_str(r#"{"a": 1, "a": 2}"#).unwrap();
        assert_eq!(keys(&doc), ["a", "a"]);
    }

    #[test]
    fn non_objects_are_other() {
        for src in ["[1, {\"a\": 2}]", "\"x\"", "12", "-4", "1.5", "true", "null"] {
            let doc: Document = serde_json::from_str(src).unwrap();
            assert!(matches!(doc, Document::Other), "{src}");
        }
    }
}
