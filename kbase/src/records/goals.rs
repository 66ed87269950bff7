//! Goals, appended to `goals/goals.json` with generated ids

use super::{FieldPatch, ListedRecord, Record, RecordKind, RecordPatch};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Collection document for goals
pub const GOALS_PATH: &str = "goals/goals.json";

/// Goal progress state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// Not started
    #[default]
    NotStarted,
    /// Underway
    InProgress,
    /// Reached
    Achieved,
    /// Dropped
    Abandoned,
}

/// A goal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Generated id, empty until added
    #[serde(default)]
    pub id: String,
    /// What the goal is
    pub title: String,
    /// Grouping such as "career" or "health"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Progress state
    #[serde(default)]
    pub status: GoalStatus,
    /// Target date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<String>,
    /// Percent complete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// Notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Goal {
    /// Goal with only a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            category: None,
            status: GoalStatus::default(),
            target_date: None,
            progress: None,
            notes: None,
        }
    }
}

impl Record for Goal {
    const KIND: RecordKind = RecordKind::Goal;
    type Patch = GoalPatch;
}

impl ListedRecord for Goal {
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

/// Sparse update for a [`Goal`]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GoalPatch {
    pub title: FieldPatch<String>,
    pub category: FieldPatch<String>,
    pub status: FieldPatch<GoalStatus>,
    pub target_date: FieldPatch<String>,
    pub progress: FieldPatch<f64>,
    pub notes: FieldPatch<String>,
}

impl RecordPatch<Goal> for GoalPatch {
    fn apply(&self, goal: &mut Goal) -> Result<()> {
        self.title.apply_required("title", &mut goal.title)?;
        self.category.apply_optional(&mut goal.category);
        self.status.apply_required("status", &mut goal.status)?;
        self.target_date.apply_optional(&mut goal.target_date);
        self.progress.apply_optional(&mut goal.progress);
        self.notes.apply_optional(&mut goal.notes);
        Ok(())
    }
}
