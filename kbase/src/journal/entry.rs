//! Journal entries and their on-disk layout

use crate::codec::{decode_text, FrontmatterDocument, MetaValue, Metadata};
use crate::error::{KbError, Result};
use crate::store::DocumentPath;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Root directory of the journal tree
pub const JOURNAL_ROOT: &str = "journal";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Path of the entry for `date`:
/// `journal/<yyyy>/<mm>-<monthname>/<yyyy-mm-dd>.md`
pub fn entry_path(date: NaiveDate) -> DocumentPath {
    let month = date.format("%m-%B").to_string().to_lowercase();
    let path = format!(
        "{JOURNAL_ROOT}/{:04}/{month}/{}.md",
        date.year(),
        date.format(DATE_FORMAT)
    );
    // Every segment is built from date digits and month names.
    DocumentPath::new(path).unwrap_or_else(|_| unreachable!("journal paths are always valid"))
}

/// Parse a `yyyy-mm-dd` date
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).map_err(|e| KbError::InvalidPatch {
        field: "date".to_string(),
        reason: format!("'{text}' is not a yyyy-mm-dd date: {e}"),
    })
}

/// One day's journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    /// Energy level, usually 1-10
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    #[serde(default)]
    pub wins: Vec<String>,
    #[serde(default)]
    pub struggles: Vec<String>,
    #[serde(default)]
    pub kid_moments: Vec<String>,
    #[serde(default)]
    pub learnings: Vec<String>,
    #[serde(default)]
    pub gratitude: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free text after the metadata block
    #[serde(default)]
    pub body: String,
}

impl JournalEntry {
    /// Empty entry for `date`
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            mood: None,
            energy: None,
            wins: Vec::new(),
            struggles: Vec::new(),
            kid_moments: Vec::new(),
            learnings: Vec::new(),
            gratitude: Vec::new(),
            tags: Vec::new(),
            body: String::new(),
        }
    }

    /// Where this entry is stored
    pub fn path(&self) -> DocumentPath {
        entry_path(self.date)
    }

    /// Convert to a frontmatter document
    pub fn to_document(&self) -> FrontmatterDocument {
        let mut metadata = Metadata::new();
        metadata.insert("date", self.date.format(DATE_FORMAT).to_string());
        if let Some(mood) = &self.mood {
            metadata.insert("mood", mood.as_str());
        }
        if let Some(energy) = self.energy {
            metadata.insert("energy", energy);
        }
        for (key, list) in self.lists() {
            metadata.insert(key, list.clone());
        }
        FrontmatterDocument::new(metadata, self.body.clone())
    }

    /// Build an entry from a stored document. The `date` field must agree
    /// with the path the document was read from.
    pub fn from_document(path: &DocumentPath, doc: FrontmatterDocument) -> Result<Self> {
        let meta = &doc.metadata;
        let date_text = meta
            .get_text("date")
            .ok_or_else(|| KbError::malformed(path.as_str(), "missing 'date' field"))?;
        let date = parse_date(&date_text)
            .map_err(|_| KbError::malformed(path.as_str(), format!("bad date '{date_text}'")))?;
        if entry_path(date) != *path {
            return Err(KbError::malformed(
                path.as_str(),
                format!("date {date} does not match the entry path"),
            ));
        }

        let energy = match meta.get("energy") {
            None => None,
            Some(MetaValue::Number(n)) => Some(*n),
            Some(other) => {
                return Err(KbError::malformed(
                    path.as_str(),
                    format!("energy must be a number, got {other:?}"),
                ))
            }
        };

        Ok(Self {
            date,
            mood: meta.get_text("mood"),
            energy,
            wins: meta.get_list("wins"),
            struggles: meta.get_list("struggles"),
            kid_moments: meta.get_list("kid_moments"),
            learnings: meta.get_list("learnings"),
            gratitude: meta.get_list("gratitude"),
            tags: meta.get_list("tags"),
            body: doc.body,
        })
    }

    /// Decode stored bytes read from `path`
    pub fn decode(path: &DocumentPath, bytes: &[u8]) -> Result<Self> {
        let text = decode_text(path, bytes)?;
        let doc = FrontmatterDocument::parse_at(path.as_str(), &text)?;
        Self::from_document(path, doc)
    }

    /// Encode to stored bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.to_document().serialize()?.into_bytes())
    }

    fn lists(&self) -> [(&'static str, &Vec<String>); 6] {
        [
            ("wins", &self.wins),
            ("struggles", &self.struggles),
            ("kid_moments", &self.kid_moments),
            ("learnings", &self.learnings),
            ("gratitude", &self.gratitude),
            ("tags", &self.tags),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(text: &str) -> NaiveDate {
        parse_date(text).unwrap()
    }

    #[test]
    fn test_entry_path_layout() {
        assert_eq!(
            entry_path(date("2025-06-01")).as_str(),
            "journal/2025/06-june/2025-06-01.md"
        );
        assert_eq!(
            entry_path(date("2024-12-31")).as_str(),
            "journal/2024/12-december/2024-12-31.md"
        );
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("2025-13-01").is_err());
        assert!(parse_date("yesterday").is_err());
        assert_eq!(parse_date(" 2025-06-01 ").unwrap(), date("2025-06-01"));
    }

    #[test]
    fn test_entry_encoding() {
        let mut entry = JournalEntry::new(date("2025-06-01"));
        entry.mood = Some("good".to_string());
        entry.energy = Some(7.0);
        entry.wins = vec!["shipped X".to_string()];
        entry.body = "Long day.\n".to_string();

        let text = String::from_utf8(entry.encode().unwrap()).unwrap();
        assert_eq!(
            text,
            "---\n\
             date: 2025-06-01\n\
             mood: good\n\
             energy: 7\n\
             wins:\n  - shipped X\n\
             struggles: []\n\
             kid_moments: []\n\
             learnings: []\n\
             gratitude: []\n\
             tags: []\n\
             ---\n\
             Long day.\n"
        );

        let decoded = JournalEntry::decode(&entry.path(), text.as_bytes()).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_date_must_match_path() {
        let entry = JournalEntry::new(date("2025-06-01"));
        let bytes = entry.encode().unwrap();
        let wrong = entry_path(date("2025-06-02"));
        assert!(matches!(
            JournalEntry::decode(&wrong, &bytes),
            Err(KbError::Malformed { .. })
        ));
    }

    #[test]
    fn test_energy_must_be_numeric() {
        let path = entry_path(date("2025-06-01"));
        let text = "---\ndate: 2025-06-01\nenergy: high\n---\n";
        assert!(JournalEntry::decode(&path, text.as_bytes()).is_err());
    }
}
