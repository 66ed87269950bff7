//! Typed record schema
//!
//! Every record type the knowledge base stores is a struct with declared
//! required and optional fields, tagged by a [`RecordKind`]. The kind fixes
//! how its collection document is keyed:
//!
//! - **map-keyed** collections (skills, projects, companies) are JSON objects
//!   keyed by a natural identifier; adding an existing identifier fails.
//! - **list-keyed** collections (goals, ideas, applications, interviews) are
//!   JSON arrays; every add appends an entry with a generated `id`.
//!
//! Updates are expressed as per-type patch structs made of [`FieldPatch`]
//! values, so a patch names exactly the fields it touches.

use crate::error::{KbError, Result};
use crate::store::DocumentPath;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub mod business;
pub mod career;
pub mod goals;
pub mod ideas;
pub mod projects;
pub mod skills;

pub use business::{Company, CompanyPatch};
pub use career::{Application, ApplicationPatch, ApplicationStatus, Interview, InterviewPatch};
pub use goals::{Goal, GoalPatch, GoalStatus};
pub use ideas::{Idea, IdeaPatch};
pub use projects::{Project, ProjectPatch, ProjectStatus};
pub use skills::{Skill, SkillLevel, SkillPatch};

/// How a collection document identifies its records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keying {
    /// JSON object keyed by a natural identifier
    Map,
    /// JSON array of entries carrying a generated `id`
    List,
}

/// The closed set of record shapes the knowledge base knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// A skill, keyed by name
    Skill,
    /// A project, keyed by slug, in one of three status collections
    Project,
    /// A business, keyed by company name
    Company,
    /// A goal with a generated id
    Goal,
    /// An idea with a generated id
    Idea,
    /// A job application with a generated id
    Application,
    /// An interview with a generated id
    Interview,
}

impl RecordKind {
    /// Lowercase name used in messages and generated ids
    pub fn name(&self) -> &'static str {
        match self {
            Self::Skill => "skill",
            Self::Project => "project",
            Self::Company => "company",
            Self::Goal => "goal",
            Self::Idea => "idea",
            Self::Application => "application",
            Self::Interview => "interview",
        }
    }

    /// Keying style of this kind's collection
    pub fn keying(&self) -> Keying {
        match self {
            Self::Skill | Self::Project | Self::Company => Keying::Map,
            Self::Goal | Self::Idea | Self::Application | Self::Interview => Keying::List,
        }
    }

    /// Collection document for kinds stored in a single document. Projects
    /// live in one document per status, see [`ProjectStatus::collection_path`].
    pub fn collection_path(&self) -> Option<&'static str> {
        match self {
            Self::Skill => Some(skills::SKILLS_PATH),
            Self::Project => None,
            Self::Company => Some(business::COMPANIES_PATH),
            Self::Goal => Some(goals::GOALS_PATH),
            Self::Idea => Some(ideas::IDEAS_PATH),
            Self::Application => Some(career::APPLICATIONS_PATH),
            Self::Interview => Some(career::INTERVIEWS_PATH),
        }
    }

    /// Parsed [`RecordKind::collection_path`]
    pub fn document_path(&self) -> Result<DocumentPath> {
        let path = self.collection_path().ok_or_else(|| {
            KbError::Config(format!("{} records have no single collection document", self.name()))
        })?;
        DocumentPath::new(path)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A record stored in a typed collection
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Which shape this is
    const KIND: RecordKind;

    /// Sparse update for this record type
    type Patch: RecordPatch<Self> + Send + Sync;
}

/// A record in a map-keyed collection. The key lives outside the record.
pub trait KeyedRecord: Record {}

/// A record in a list-keyed collection, carrying its own generated id
pub trait ListedRecord: Record {
    /// Current id
    fn id(&self) -> &str;

    /// Replace the id
    fn set_id(&mut self, id: String);

    /// Human text the generated id is derived from
    fn id_seed(&self) -> &str;
}

/// A sparse update that can be applied to a record
pub trait RecordPatch<R> {
    /// Apply the fields this patch carries
    fn apply(&self, record: &mut R) -> Result<()>;
}

/// One field of a sparse patch.
///
/// In JSON, an absent field is [`FieldPatch::Keep`], `null` is
/// [`FieldPatch::Clear`], and any other value is [`FieldPatch::Set`]. Patch
/// structs mark their fields `#[serde(default)]` for the absent case.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldPatch<T> {
    /// Leave the field untouched
    Keep,
    /// Clear the field
    Clear,
    /// Replace the field
    Set(T),
}

impl<T> Default for FieldPatch<T> {
    fn default() -> Self {
        Self::Keep
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldPatch<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Self::Set(value),
            None => Self::Clear,
        })
    }
}

impl<T: Clone> FieldPatch<T> {
    /// True for [`FieldPatch::Keep`]
    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }

    /// Apply to an optional field
    pub fn apply_optional(&self, target: &mut Option<T>) {
        match self {
            Self::Keep => {}
            Self::Clear => *target = None,
            Self::Set(value) => *target = Some(value.clone()),
        }
    }

    /// Apply to a required field; clearing it is rejected
    pub fn apply_required(&self, field: &str, target: &mut T) -> Result<()> {
        match self {
            Self::Keep => Ok(()),
            Self::Clear => Err(KbError::invalid_patch(field, "field is required and cannot be cleared")),
            Self::Set(value) => {
                *target = value.clone();
                Ok(())
            }
        }
    }
}

impl<T: Clone> FieldPatch<Vec<T>> {
    /// Apply to a list field; clearing empties it
    pub fn apply_list(&self, target: &mut Vec<T>) {
        match self {
            Self::Keep => {}
            Self::Clear => target.clear(),
            Self::Set(values) => *target = values.clone(),
        }
    }
}

/// Lowercase, dash-separated identifier fragment
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Generate a list-collection id from a name prefix and a nanosecond
/// timestamp. Two adds within the same clock tick collide; the engine turns a
/// collision into `Duplicate` instead of overwriting.
pub fn generate_id(kind: RecordKind, seed: &str) -> String {
    const MAX_PREFIX: usize = 24;

    let slug = slugify(seed);
    let prefix: String = slug.chars().take(MAX_PREFIX).collect();
    let prefix = prefix.trim_end_matches('-');
    let prefix = if prefix.is_empty() { kind.name() } else { prefix };

    let now = chrono::Utc::now();
    let nanos = now
        .timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1000));
    format!("{prefix}-{nanos}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Sample {
        notes: FieldPatch<String>,
        level: FieldPatch<u8>,
        tags: FieldPatch<Vec<String>>,
    }

    #[test]
    fn test_field_patch_tri_state() {
        let patch: Sample = serde_json::from_str(r#"{"notes": null, "level": 3}"#).unwrap();
        assert_eq!(patch.notes, FieldPatch::Clear);
        assert_eq!(patch.level, FieldPatch::Set(3));
        assert!(patch.tags.is_keep());
    }

    #[test]
    fn test_apply_helpers() {
        let mut notes = Some("old".to_string());
        FieldPatch::Keep.apply_optional(&mut notes);
        assert_eq!(notes.as_deref(), Some("old"));
        FieldPatch::Clear.apply_optional(&mut notes);
        assert_eq!(notes, None);

        let mut level = 1u8;
        assert!(FieldPatch::<u8>::Clear.apply_required("level", &mut level).is_err());
        FieldPatch::Set(4).apply_required("level", &mut level).unwrap();
        assert_eq!(level, 4);

        let mut tags = vec!["a".to_string()];
        FieldPatch::<Vec<String>>::Clear.apply_list(&mut tags);
        assert!(tags.is_empty());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Run a Marathon!"), "run-a-marathon");
        assert_eq!(slugify("  --Acme,  Inc.  "), "acme-inc");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn test_generate_id_shape() {
        let id = generate_id(RecordKind::Goal, "Learn to juggle five balls at once please");
        let (prefix, nanos) = id.rsplit_once('-').unwrap();
        assert_eq!(prefix, "learn-to-juggle-five-bal");
        assert!(nanos.parse::<i64>().is_ok());

        let fallback = generate_id(RecordKind::Idea, "!!!");
        assert!(fallback.starts_with("idea-"));
    }

    #[test]
    fn test_kind_keying() {
        assert_eq!(RecordKind::Skill.keying(), Keying::Map);
        assert_eq!(RecordKind::Goal.keying(), Keying::List);
        assert!(RecordKind::Project.collection_path().is_none());
        assert_eq!(
            RecordKind::Interview.document_path().unwrap().as_str(),
            "career/interviews.json"
        );
    }
}
