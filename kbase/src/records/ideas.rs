//! Ideas, appended to `ideas/ideas.json`

use super::{FieldPatch, ListedRecord, Record, RecordKind, RecordPatch};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Collection document for ideas
pub const IDEAS_PATH: &str = "ideas/ideas.json";

/// An idea worth keeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Free-form state, e.g. "raw" or "validated"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Idea {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            description: None,
            tags: Vec::new(),
            status: None,
        }
    }
}

impl Record for Idea {
    const KIND: RecordKind = RecordKind::Idea;
    type Patch = IdeaPatch;
}

impl ListedRecord for Idea {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn id_seed(&self) -> &str {
        &self.title
    }
}

/// Sparse update for an [`Idea`]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdeaPatch {
    pub title: FieldPatch<String>,
    pub description: FieldPatch<String>,
    pub tags: FieldPatch<Vec<String>>,
    pub status: FieldPatch<String>,
}

impl RecordPatch<Idea> for IdeaPatch {
    fn apply(&self, idea: &mut Idea) -> Result<()> {
        self.title.apply_required("title", &mut idea.title)?;
        self.description.apply_optional(&mut idea.description);
        self.tags.apply_list(&mut idea.tags);
        self.status.apply_optional(&mut idea.status);
        Ok(())
    }
}
