//! Job application and interview tools

use super::{Arguments, BaseToolImpl, KbTool, ToolContext, ToolRegistry};
use crate::error::Result;
use crate::records::{Application, ApplicationPatch, Interview, RecordKind};
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use serde_json::{json, Value};

/// Register career tools with the registry
pub fn register_career_tools(registry: &mut ToolRegistry) {
    registry.register(AddApplicationTool);
    registry.register(UpdateApplicationTool);
    registry.register(AddInterviewTool);
}

const APPLICATION_STATUSES: [&str; 6] = [
    "applied",
    "screening",
    "interviewing",
    "offer",
    "rejected",
    "withdrawn",
];

/// Record a job application
pub struct AddApplicationTool;

#[async_trait]
impl KbTool for AddApplicationTool {
    fn name(&self) -> &'static str {
        "add_application"
    }

    fn description(&self) -> &'static str {
        "Record a job application. Returns the stored application with its generated id."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "company": {"type": "string"},
                "role": {"type": "string"},
                "status": {"type": "string", "enum": APPLICATION_STATUSES},
                "applied": {"type": "string", "description": "Date applied, defaults to today"},
                "url": {"type": "string"},
                "salary": {"type": "string"},
                "notes": {"type": "string"}
            },
            "required": ["company", "role"]
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let mut application: Application = BaseToolImpl::parse_arguments(arguments)?;
        if application.applied.is_none() {
            application.applied = Some(context.today().to_string());
        }
        let path = RecordKind::Application.document_path()?;
        let application = context.engine.add_listed(&path, application).await?;
        BaseToolImpl::json_response(&application)
    }
}

/// Patch an application by id
pub struct UpdateApplicationTool;

#[async_trait]
impl KbTool for UpdateApplicationTool {
    fn name(&self) -> &'static str {
        "update_application"
    }

    fn description(&self) -> &'static str {
        "Update fields of a job application by id, typically its status."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "string"},
                "company": {"type": "string"},
                "role": {"type": "string"},
                "status": {"type": "string", "enum": APPLICATION_STATUSES},
                "applied": {"type": ["string", "null"]},
                "url": {"type": ["string", "null"]},
                "salary": {"type": ["string", "null"]},
                "notes": {"type": ["string", "null"]}
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let mut arguments = arguments;
        let id = BaseToolImpl::take_string(&mut arguments, "id")?;
        let patch: ApplicationPatch = BaseToolImpl::parse_arguments(arguments)?;
        let path = RecordKind::Application.document_path()?;

        let application = context
            .engine
            .patch_listed::<Application>(&path, &id, &patch)
            .await?;
        BaseToolImpl::json_response(&application)
    }
}

/// Record an interview
pub struct AddInterviewTool;

#[async_trait]
impl KbTool for AddInterviewTool {
    fn name(&self) -> &'static str {
        "add_interview"
    }

    fn description(&self) -> &'static str {
        "Record an interview, optionally linked to an application id."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "company": {"type": "string"},
                "date": {"type": "string"},
                "application_id": {"type": "string"},
                "stage": {"type": "string"},
                "interviewers": {"type": "array", "items": {"type": "string"}},
                "questions": {"type": "array", "items": {"type": "string"}},
                "outcome": {"type": "string"},
                "notes": {"type": "string"}
            },
            "required": ["company", "date"]
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let interview: Interview = BaseToolImpl::parse_arguments(arguments)?;

        if let Some(application_id) = interview.application_id.as_deref() {
            let path = RecordKind::Application.document_path()?;
            let applications = context.engine.load_list::<Application>(&path).await?;
            if !applications.iter().any(|a| a.id == application_id) {
                tracing::warn!(
                    "Interview at {} references unknown application '{}'",
                    interview.company,
                    application_id
                );
            }
        }

        let path = RecordKind::Interview.document_path()?;
        let interview = context.engine.add_listed(&path, interview).await?;
        BaseToolImpl::json_response(&interview)
    }
}
