//! Job applications and interviews, both list-keyed under `career/`

use super::{FieldPatch, ListedRecord, Record, RecordKind, RecordPatch};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Collection document for applications
pub const APPLICATIONS_PATH: &str = "career/applications.json";
/// Collection document for interviews
pub const INTERVIEWS_PATH: &str = "career/interviews.json";

/// Where an application stands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    #[default]
    Applied,
    Screening,
    Interviewing,
    Offer,
    Rejected,
    Withdrawn,
}

/// A job application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    #[serde(default)]
    pub id: String,
    pub company: String,
    pub role: String,
    #[serde(default)]
    pub status: ApplicationStatus,
    /// Date applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Application {
    pub fn new(company: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            company: company.into(),
            role: role.into(),
            status: ApplicationStatus::default(),
            applied: None,
            url: None,
            salary: None,
            notes: None,
        }
    }
}

impl Record for Application {
    const KIND: RecordKind = RecordKind::Application;
    type Patch = ApplicationPatch;
}

impl ListedRecord for Application {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn id_seed(&self) -> &str {
        &self.company
    }
}

/// Sparse update for an [`Application`]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApplicationPatch {
    pub company: FieldPatch<String>,
    pub role: FieldPatch<String>,
    pub status: FieldPatch<ApplicationStatus>,
    pub applied: FieldPatch<String>,
    pub url: FieldPatch<String>,
    pub salary: FieldPatch<String>,
    pub notes: FieldPatch<String>,
}

impl RecordPatch<Application> for ApplicationPatch {
    fn apply(&self, app: &mut Application) -> Result<()> {
        self.company.apply_required("company", &mut app.company)?;
        self.role.apply_required("role", &mut app.role)?;
        self.status.apply_required("status", &mut app.status)?;
        self.applied.apply_optional(&mut app.applied);
        self.url.apply_optional(&mut app.url);
        self.salary.apply_optional(&mut app.salary);
        self.notes.apply_optional(&mut app.notes);
        Ok(())
    }
}

/// An interview, optionally linked to an application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    #[serde(default)]
    pub id: String,
    pub company: String,
    pub date: String,
    /// Id of the related [`Application`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    /// e.g. "phone screen", "onsite"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interviewers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Interview {
    pub fn new(company: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            company: company.into(),
            date: date.into(),
            application_id: None,
            stage: None,
            interviewers: Vec::new(),
            questions: Vec::new(),
            outcome: None,
            notes: None,
        }
    }
}

impl Record for Interview {
    const KIND: RecordKind = RecordKind::Interview;
    type Patch = InterviewPatch;
}

impl ListedRecord for Interview {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn id_seed(&self) -> &str {
        &self.company
    }
}

/// Sparse update for an [`Interview`]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterviewPatch {
    pub company: FieldPatch<String>,
    pub date: FieldPatch<String>,
    pub application_id: FieldPatch<String>,
    pub stage: FieldPatch<String>,
    pub interviewers: FieldPatch<Vec<String>>,
    pub questions: FieldPatch<Vec<String>>,
    pub outcome: FieldPatch<String>,
    pub notes: FieldPatch<String>,
}

impl RecordPatch<Interview> for InterviewPatch {
    fn apply(&self, interview: &mut Interview) -> Result<()> {
        self.company.apply_required("company", &mut interview.company)?;
        self.date.apply_required("date", &mut interview.date)?;
        self.application_id.apply_optional(&mut interview.application_id);
        self.stage.apply_optional(&mut interview.stage);
        self.interviewers.apply_list(&mut interview.interviewers);
        self.questions.apply_list(&mut interview.questions);
        self.outcome.apply_optional(&mut interview.outcome);
        self.notes.apply_optional(&mut interview.notes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KbError;

    #[test]
    fn test_application_status_roundtrip_names() {
        let app: Application = serde_json::from_str(
            r#"{"company": "Acme", "role": "Staff Engineer", "status": "interviewing"}"#,
        )
        .unwrap();
        assert_eq!(app.status, ApplicationStatus::Interviewing);
        assert_eq!(app.id, "");
        assert_eq!(app.id_seed(), "Acme");
    }

    #[test]
    fn test_interview_patch_rejects_clearing_date() {
        let mut interview = Interview::new("Acme", "2025-06-02");
        let patch: InterviewPatch = serde_json::from_str(r#"{"date": null}"#).unwrap();
        assert!(matches!(
            patch.apply(&mut interview),
            Err(KbError::InvalidPatch { .. })
        ));
    }

    #[test]
    fn test_interview_patch_appends_nothing_when_absent() {
        let mut interview = Interview::new("Acme", "2025-06-02");
        interview.questions = vec!["system design".to_string()];
        let patch: InterviewPatch = serde_json::from_str(r#"{"outcome": "passed"}"#).unwrap();
        patch.apply(&mut interview).unwrap();
        assert_eq!(interview.questions, vec!["system design"]);
        assert_eq!(interview.outcome.as_deref(), Some("passed"));
    }
}
