//! Projects, keyed by slug, one collection document per status

use super::{FieldPatch, KeyedRecord, Record, RecordKind, RecordPatch};
use crate::error::{KbError, Result};
use crate::store::DocumentPath;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a project sits in its lifecycle. Each status has its own
/// collection document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    /// Being worked on
    Active,
    /// Not started yet
    Planned,
    /// Done
    Completed,
}

impl ProjectStatus {
    /// All statuses
    pub const ALL: [ProjectStatus; 3] = [Self::Active, Self::Planned, Self::Completed];

    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Planned => "planned",
            Self::Completed => "completed",
        }
    }

    /// Collection document for this status
    pub fn collection_path(&self) -> DocumentPath {
        // Statuses are fixed identifiers, so the path is always valid.
        DocumentPath::new(format!("projects/{}.json", self.as_str()))
            .unwrap_or_else(|_| unreachable!("static project path"))
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = KbError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| KbError::invalid_patch("status", format!("unknown project status '{s}'")))
    }
}

/// A project entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Display name
    pub name: String,
    /// Mirrors the collection the project is stored in
    pub status: ProjectStatus,
    /// What it is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Technologies used
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tech: Vec<String>,
    /// Homepage or repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Start date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<String>,
    /// Completion date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<String>,
    /// Notable outcomes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<String>,
}

impl Project {
    /// Project with only the required fields set
    pub fn new(name: impl Into<String>, status: ProjectStatus) -> Self {
        Self {
            name: name.into(),
            status,
            description: None,
            tech: Vec::new(),
            url: None,
            started: None,
            completed: None,
            highlights: Vec::new(),
        }
    }
}

impl Record for Project {
    const KIND: RecordKind = RecordKind::Project;
    type Patch = ProjectPatch;
}

impl KeyedRecord for Project {}

/// Sparse update for a [`Project`]. Status changes go through a move, not a
/// patch, so the status field is not patchable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectPatch {
    /// Display name
    pub name: FieldPatch<String>,
    /// Description
    pub description: FieldPatch<String>,
    /// Technologies
    pub tech: FieldPatch<Vec<String>>,
    /// URL
    pub url: FieldPatch<String>,
    /// Start date
    pub started: FieldPatch<String>,
    /// Completion date
    pub completed: FieldPatch<String>,
    /// Highlights
    pub highlights: FieldPatch<Vec<String>>,
}

impl RecordPatch<Project> for ProjectPatch {
    fn apply(&self, project: &mut Project) -> Result<()> {
        self.name.apply_required("name", &mut project.name)?;
        self.description.apply_optional(&mut project.description);
        self.tech.apply_list(&mut project.tech);
        self.url.apply_optional(&mut project.url);
        self.started.apply_optional(&mut project.started);
        self.completed.apply_optional(&mut project.completed);
        self.highlights.apply_list(&mut project.highlights);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_paths() {
        assert_eq!(ProjectStatus::Active.collection_path().as_str(), "projects/active.json");
        assert_eq!(ProjectStatus::Planned.collection_path().as_str(), "projects/planned.json");
        assert_eq!("Completed".parse::<ProjectStatus>().unwrap(), ProjectStatus::Completed);
        assert!("archived".parse::<ProjectStatus>().is_err());
    }

    #[test]
    fn test_patch_cannot_touch_status() {
        assert!(serde_json::from_str::<ProjectPatch>(r#"{"status": "active"}"#).is_err());
    }

    #[test]
    fn test_patch_lists() {
        let mut project = Project::new("Garden bot", ProjectStatus::Planned);
        project.tech = vec!["rust".to_string()];

        let patch: ProjectPatch =
            serde_json::from_str(r#"{"tech": ["rust", "esp32"], "highlights": null}"#).unwrap();
        patch.apply(&mut project).unwrap();
        assert_eq!(project.tech, vec!["rust", "esp32"]);
        assert!(project.highlights.is_empty());
    }
}
