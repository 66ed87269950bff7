//! Skills, keyed by skill name in `profile/skills.json`

use super::{FieldPatch, KeyedRecord, Record, RecordKind, RecordPatch};
use crate::error::{KbError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Collection document for skills
pub const SKILLS_PATH: &str = "profile/skills.json";

/// Proficiency, ordered from least to most experienced
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    /// Just started
    Novice,
    /// Used it a few times
    Familiar,
    /// Comfortable on real work
    Adept,
    /// Go-to person
    Expert,
    /// Teaches others
    Master,
}

impl SkillLevel {
    /// All levels in ascending order
    pub const ALL: [SkillLevel; 5] = [
        Self::Novice,
        Self::Familiar,
        Self::Adept,
        Self::Expert,
        Self::Master,
    ];

    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Novice => "novice",
            Self::Familiar => "familiar",
            Self::Adept => "adept",
            Self::Expert => "expert",
            Self::Master => "master",
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillLevel {
    type Err = KbError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| KbError::invalid_patch("level", format!("unknown skill level '{s}'")))
    }
}

/// A skill entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    /// Grouping such as "backend" or "leadership"
    pub category: String,
    /// Current proficiency
    pub level: SkillLevel,
    /// Years of practice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years: Option<f64>,
    /// Free-form notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// When the skill was last used, free-form date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<String>,
}

impl Skill {
    /// Skill with only the required fields set
    pub fn new(category: impl Into<String>, level: SkillLevel) -> Self {
        Self {
            category: category.into(),
            level,
            years: None,
            notes: None,
            last_used: None,
        }
    }
}

impl Record for Skill {
    const KIND: RecordKind = RecordKind::Skill;
    type Patch = SkillPatch;
}

impl KeyedRecord for Skill {}

/// Sparse update for a [`Skill`]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SkillPatch {
    /// New category
    pub category: FieldPatch<String>,
    /// New level
    pub level: FieldPatch<SkillLevel>,
    /// Years of practice
    pub years: FieldPatch<f64>,
    /// Notes
    pub notes: FieldPatch<String>,
    /// Last used
    pub last_used: FieldPatch<String>,
}

impl RecordPatch<Skill> for SkillPatch {
    fn apply(&self, skill: &mut Skill) -> Result<()> {
        self.category.apply_required("category", &mut skill.category)?;
        self.level.apply_required("level", &mut skill.level)?;
        self.years.apply_optional(&mut skill.years);
        self.notes.apply_optional(&mut skill.notes);
        self.last_used.apply_optional(&mut skill.last_used);
        Ok(())
    }
}
