//! Frontmatter documents
//!
//! A frontmatter document is a metadata block between `---` lines followed by
//! free text:
//!
//! ```text
//! ---
//! date: 2025-06-01
//! energy: 7
//! wins:
//!   - shipped X
//! tags: []
//! ---
//! Body text.
//! ```
//!
//! Scalars are `key: value`; lists are a `key:` header followed by indented
//! `- item` lines, or inline `key: [a, b]` when written by hand. Scalars that
//! look like decimal numbers are read as numbers. Text that would otherwise be
//! misread is written as a JSON string literal.
//!
//! [`FrontmatterDocument::serialize`] output is canonical: parsing it and
//! serializing again yields the same bytes.

use crate::error::{KbError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write as _;

const DELIMITER: &str = "---";
const INLINE_PATH: &str = "<inline>";

static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?$").expect("number pattern is valid")
});

/// A metadata value
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    /// Free text
    Text(String),
    /// Number (any scalar that lexes as a decimal number)
    Number(f64),
    /// Ordered list of strings
    List(Vec<String>),
}

impl MetaValue {
    /// Text value, if this is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Numeric value, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// List items, if this is a list
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Vec<String>> for MetaValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Ordered metadata with unique keys
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metadata {
    entries: Vec<(String, MetaValue)>,
}

impl Metadata {
    /// Empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. Replacing keeps the key's position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Option<MetaValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Remove a key
    pub fn remove(&mut self, key: &str) -> Option<MetaValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Look up a value
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Text value for `key`; numbers are rendered as text
    pub fn get_text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            MetaValue::Text(text) => Some(text.clone()),
            MetaValue::Number(n) => Some(n.to_string()),
            MetaValue::List(_) => None,
        }
    }

    /// Numeric value for `key`
    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(MetaValue::as_number)
    }

    /// List value for `key`; a missing key or a scalar reads as an empty list
    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(MetaValue::List(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    /// Iterate entries in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Metadata plus free-text body
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrontmatterDocument {
    /// Ordered metadata block
    pub metadata: Metadata,
    /// Everything after the closing delimiter
    pub body: String,
}

impl FrontmatterDocument {
    /// Create a document
    pub fn new(metadata: Metadata, body: impl Into<String>) -> Self {
        Self {
            metadata,
            body: body.into(),
        }
    }

    /// Parse text that did not come from a stored document
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_at(INLINE_PATH, text)
    }

    /// Parse a document, naming `path` in any `Malformed` error.
    ///
    /// Text without a leading `---` line has no metadata; all of it is body.
    pub fn parse_at(path: &str, text: &str) -> Result<Self> {
        let Some(rest) = text.strip_prefix("---\n") else {
            return Ok(Self::new(Metadata::new(), text));
        };

        let (block, body) = if let Some(body) = rest.strip_prefix("---\n") {
            ("", body)
        } else if rest == DELIMITER {
            ("", "")
        } else if let Some(end) = rest.find("\n---\n") {
            (&rest[..end], &rest[end + 5..])
        } else if let Some(block) = rest.strip_suffix("\n---") {
            (block, "")
        } else {
            return Err(KbError::malformed(path, "unterminated frontmatter block"));
        };

        Ok(Self::new(parse_block(path, block)?, body))
    }

    /// Serialize to canonical form
    pub fn serialize(&self) -> Result<String> {
        let mut out = String::from("---\n");

        for (key, value) in self.metadata.iter() {
            validate_key(key)?;
            match value {
                MetaValue::Text(text) => {
                    let _ = writeln!(out, "{key}: {}", quote_scalar(text)?);
                }
                MetaValue::Number(n) => {
                    if !n.is_finite() {
                        return Err(KbError::malformed(
                            INLINE_PATH,
                            format!("metadata '{key}' is not a finite number"),
                        ));
                    }
                    let _ = writeln!(out, "{key}: {n}");
                }
                MetaValue::List(items) if items.is_empty() => {
                    let _ = writeln!(out, "{key}: []");
                }
                MetaValue::List(items) => {
                    let _ = writeln!(out, "{key}:");
                    for item in items {
                        let _ = writeln!(out, "  - {}", quote_item(item)?);
                    }
                }
            }
        }

        out.push_str("---\n");
        out.push_str(&self.body);
        Ok(out)
    }
}

fn parse_block(path: &str, block: &str) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    // Key whose block list is still collecting `- item` lines
    let mut open_list: Option<String> = None;

    for (number, raw) in block.split('\n').enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let at_line = |reason: &str| KbError::malformed(path, format!("line {}: {reason}", number + 2));

        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            let item = line.trim_start();
            let item = if item == "-" {
                ""
            } else if let Some(item) = item.strip_prefix("- ") {
                item
            } else {
                return Err(at_line("indented line is not a list item"));
            };
            let Some(key) = &open_list else {
                return Err(at_line("list item without a list key"));
            };
            let item = unquote(path, item)?;
            if let Some(MetaValue::List(items)) = metadata.entries.last_mut().map(|(_, v)| v) {
                items.push(item);
            } else {
                return Err(at_line(&format!("'{key}' is not a list")));
            }
            continue;
        }

        open_list = None;

        let Some((key, rest)) = line.split_once(':') else {
            return Err(at_line("expected 'key: value'"));
        };
        if key.is_empty() {
            return Err(at_line("empty key"));
        }
        if metadata.get(key).is_some() {
            return Err(at_line(&format!("duplicate key '{key}'")));
        }

        let value = if rest.is_empty() {
            open_list = Some(key.to_string());
            MetaValue::List(Vec::new())
        } else if let Some(value) = rest.strip_prefix(' ') {
            parse_scalar(path, value)?
        } else {
            return Err(at_line("expected a space after ':'"));
        };

        metadata.entries.push((key.to_string(), value));
    }

    Ok(metadata)
}

fn parse_scalar(path: &str, value: &str) -> Result<MetaValue> {
    if value.starts_with('"') {
        return unquote(path, value).map(MetaValue::Text);
    }

    if let Some(inner) = value.strip_prefix('[') {
        let Some(inner) = inner.trim_end().strip_suffix(']') else {
            return Err(KbError::malformed(path, format!("unterminated inline list '{value}'")));
        };
        if inner.trim().is_empty() {
            return Ok(MetaValue::List(Vec::new()));
        }
        return inner
            .split(',')
            .map(|item| unquote(path, item.trim()))
            .collect::<Result<Vec<_>>>()
            .map(MetaValue::List);
    }

    if NUMBER.is_match(value) {
        if let Ok(n) = value.parse::<f64>() {
            return Ok(MetaValue::Number(n));
        }
    }

    Ok(MetaValue::Text(value.to_string()))
}

fn unquote(path: &str, value: &str) -> Result<String> {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        serde_json::from_str::<String>(value)
            .map_err(|e| KbError::malformed(path, format!("bad quoted string {value}: {e}")))
    } else {
        Ok(value.to_string())
    }
}

fn validate_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key.contains(':')
        || key.contains('\n')
        || key.contains('\r')
        || key.starts_with(' ')
        || key.starts_with('\t')
        || key == DELIMITER;
    if bad {
        return Err(KbError::malformed(
            INLINE_PATH,
            format!("'{key}' cannot be used as a metadata key"),
        ));
    }
    Ok(())
}

fn json_quote(text: &str) -> Result<String> {
    Ok(serde_json::to_string(text)?)
}

fn quote_scalar(text: &str) -> Result<String> {
    let ambiguous = text.is_empty()
        || text != text.trim()
        || text.starts_with('[')
        || text.starts_with('"')
        || text.contains('\n')
        || text.contains('\r')
        || NUMBER.is_match(text);
    if ambiguous {
        json_quote(text)
    } else {
        Ok(text.to_string())
    }
}

fn quote_item(text: &str) -> Result<String> {
    let ambiguous = text.is_empty()
        || text != text.trim()
        || text.starts_with('"')
        || text.contains('\n')
        || text.contains('\r');
    if ambiguous {
        json_quote(text)
    } else {
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> FrontmatterDocument {
        let mut metadata = Metadata::new();
        metadata.insert("date", "2025-06-01");
        metadata.insert("energy", 7.0);
        metadata.insert("wins", vec!["shipped X".to_string(), "ran 5k".to_string()]);
        metadata.insert("tags", Vec::<String>::new());
        FrontmatterDocument::new(metadata, "Long day.\n\nGood one though.\n")
    }

    #[test]
    fn test_serialize_canonical_form() {
        let text = sample().serialize().unwrap();
        assert_eq!(
            text,
            "---\ndate: 2025-06-01\nenergy: 7\nwins:\n  - shipped X\n  - ran 5k\ntags: []\n---\nLong day.\n\nGood one though.\n"
        );
    }

    #[test]
    fn test_parse_round_trip() {
        let doc = sample();
        let parsed = FrontmatterDocument::parse(&doc.serialize().unwrap()).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_numeric_scalars_are_coerced() {
        let doc = FrontmatterDocument::parse("---\nenergy: 7\nratio: -0.5\nbig: 1e3\nname: 7 dwarves\n---\n").unwrap();
        assert_eq!(doc.metadata.get_number("energy"), Some(7.0));
        assert_eq!(doc.metadata.get_number("ratio"), Some(-0.5));
        assert_eq!(doc.metadata.get_number("big"), Some(1000.0));
        assert_eq!(doc.metadata.get_text("name").as_deref(), Some("7 dwarves"));
    }

    #[test]
    fn test_numeric_looking_text_is_quoted() {
        let mut metadata = Metadata::new();
        metadata.insert("zip", "007");
        let doc = FrontmatterDocument::new(metadata, "");
        let text = doc.serialize().unwrap();
        assert!(text.contains("zip: \"007\""));
        assert_eq!(FrontmatterDocument::parse(&text).unwrap(), doc);
    }

    #[test]
    fn test_inline_list() {
        let doc = FrontmatterDocument::parse("---\ntags: [work, family , \"a, b\"]\nempty: []\n---\nbody").unwrap();
        assert_eq!(
            doc.metadata.get_list("tags"),
            vec!["work".to_string(), "family".to_string(), "\"a".to_string(), "b\"".to_string()]
        );
        assert!(doc.metadata.get_list("empty").is_empty());
        assert_eq!(doc.body, "body");
    }

    #[test]
    fn test_block_list_with_header_and_no_items() {
        let doc = FrontmatterDocument::parse("---\nwins:\nmood: ok\n---\n").unwrap();
        assert_eq!(doc.metadata.get("wins"), Some(&MetaValue::List(vec![])));
        assert_eq!(doc.metadata.get_text("mood").as_deref(), Some("ok"));
    }

    #[test]
    fn test_no_frontmatter_is_all_body() {
        let doc = FrontmatterDocument::parse("just text\n---\nmore").unwrap();
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, "just text\n---\nmore");
    }

    #[test]
    fn test_empty_metadata_round_trip() {
        let doc = FrontmatterDocument::new(Metadata::new(), "body only");
        let text = doc.serialize().unwrap();
        assert_eq!(text, "---\n---\nbody only");
        assert_eq!(FrontmatterDocument::parse(&text).unwrap(), doc);
    }

    #[test]
    fn test_closing_delimiter_at_end_of_text() {
        let doc = FrontmatterDocument::parse("---\nmood: calm\n---").unwrap();
        assert_eq!(doc.metadata.get_text("mood").as_deref(), Some("calm"));
        assert_eq!(doc.body, "");
    }

    #[test]
    fn test_malformed_inputs() {
        for text in [
            "---\nmood: calm\n",
            "---\nmood calm\n---\n",
            "---\nmood:calm\n---\n",
            "---\n  - orphan\n---\n",
            "---\nmood: a\nmood: b\n---\n",
            "---\ntags: [a, b\n---\n",
        ] {
            assert!(
                matches!(FrontmatterDocument::parse(text), Err(KbError::Malformed { .. })),
                "expected Malformed for {text:?}"
            );
        }
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut metadata = Metadata::new();
        metadata.insert("a", "1x");
        metadata.insert("b", "2x");
        assert_eq!(metadata.insert("a", "3x"), Some(MetaValue::Text("1x".to_string())));
        let keys: Vec<_> = metadata.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(metadata.remove("a"), Some(MetaValue::Text("3x".to_string())));
        assert_eq!(metadata.len(), 1);
    }

    #[test]
    fn test_invalid_keys_and_numbers_rejected() {
        let mut metadata = Metadata::new();
        metadata.insert("bad:key", "x");
        assert!(FrontmatterDocument::new(metadata, "").serialize().is_err());

        let mut metadata = Metadata::new();
        metadata.insert("nan", f64::NAN);
        assert!(FrontmatterDocument::new(metadata, "").serialize().is_err());
    }

    fn meta_value() -> impl Strategy<Value = MetaValue> {
        prop_oneof![
            "\\PC{0,24}".prop_map(MetaValue::Text),
            (-1.0e9f64..1.0e9f64).prop_map(MetaValue::Number),
            any::<i32>().prop_map(|n| MetaValue::Number(n as f64)),
            prop::collection::vec("\\PC{0,16}", 0..4).prop_map(MetaValue::List),
        ]
    }

    fn document() -> impl Strategy<Value = FrontmatterDocument> {
        (
            prop::collection::btree_map("[a-z_][a-z0-9_]{0,10}", meta_value(), 0..6),
            "(\\PC|\n){0,80}",
        )
            .prop_map(|(entries, body)| {
                let mut metadata = Metadata::new();
                for (key, value) in entries {
                    metadata.insert(key, value);
                }
                FrontmatterDocument::new(metadata, body)
            })
    }

    proptest! {
        #[test]
        fn prop_parse_inverts_serialize(doc in document()) {
            let text = doc.serialize().unwrap();
            let parsed = FrontmatterDocument::parse(&text).unwrap();
            prop_assert_eq!(&parsed, &doc);
            prop_assert_eq!(parsed.serialize().unwrap(), text);
        }
    }
}
