//! Project tools
//!
//! Projects are keyed by slug and live in one collection per status, so most
//! tools first find which collection holds the slug.

use super::{Arguments, BaseToolImpl, KbTool, ToolContext, ToolRegistry};
use crate::engine::RecordMap;
use crate::error::{KbError, Result};
use crate::records::{slugify, Project, ProjectPatch, ProjectStatus, RecordKind};
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Register all project tools with the registry
pub fn register_project_tools(registry: &mut ToolRegistry) {
    registry.register(AddProjectTool);
    registry.register(UpdateProjectTool);
    registry.register(UpdateProjectStatusTool);
    registry.register(GetProjectsTool);
}

/// Status collection currently holding `slug`
async fn locate(context: &ToolContext, slug: &str) -> Result<ProjectStatus> {
    for status in ProjectStatus::ALL {
        let projects = context
            .engine
            .load_map::<Project>(&status.collection_path())
            .await?;
        if projects.contains_key(slug) {
            return Ok(status);
        }
    }
    Err(KbError::validation_gap(RecordKind::Project.name(), slug, "projects/"))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateStatusRequest {
    slug: String,
    from: Option<ProjectStatus>,
    to: ProjectStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct GetProjectsRequest {
    status: Option<ProjectStatus>,
}

/// Add a project
pub struct AddProjectTool;

#[async_trait]
impl KbTool for AddProjectTool {
    fn name(&self) -> &'static str {
        "add_project"
    }

    fn description(&self) -> &'static str {
        "Add a project to the collection for its status (default planned). The slug defaults to the slugified name."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "slug": {"type": "string"},
                "status": {"type": "string", "enum": ["active", "planned", "completed"]},
                "description": {"type": "string"},
                "tech": {"type": "array", "items": {"type": "string"}},
                "url": {"type": "string"},
                "started": {"type": "string"},
                "completed": {"type": "string"},
                "highlights": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let mut arguments = arguments;
        let slug = BaseToolImpl::take_optional_string(&mut arguments, "slug")?;
        arguments
            .entry("status")
            .or_insert_with(|| json!(ProjectStatus::Planned.as_str()));
        let project: Project = BaseToolImpl::parse_arguments(arguments)?;

        let slug = slugify(slug.as_deref().unwrap_or(&project.name));
        if slug.is_empty() {
            return Err(KbError::InvalidArguments(
                "project name or slug must contain letters or digits".to_string(),
            ));
        }
        match locate(context, &slug).await {
            Ok(existing) => {
                return Err(KbError::duplicate(
                    RecordKind::Project.name(),
                    format!("{slug} ({existing})"),
                ));
            }
            Err(KbError::ValidationGap { .. }) => {}
            Err(e) => return Err(e),
        }

        let status = project.status;
        context
            .engine
            .add_keyed(&status.collection_path(), &slug, project)
            .await?;
        Ok(BaseToolImpl::create_success_response(format!(
            "Added {status} project '{slug}'"
        )))
    }
}

/// Patch a project in place
pub struct UpdateProjectTool;

#[async_trait]
impl KbTool for UpdateProjectTool {
    fn name(&self) -> &'static str {
        "update_project"
    }

    fn description(&self) -> &'static str {
        "Update fields of a project. Use update_project_status to change its status."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "slug": {"type": "string"},
                "name": {"type": "string"},
                "description": {"type": ["string", "null"]},
                "tech": {"type": ["array", "null"], "items": {"type": "string"}},
                "url": {"type": ["string", "null"]},
                "started": {"type": ["string", "null"]},
                "completed": {"type": ["string", "null"]},
                "highlights": {"type": ["array", "null"], "items": {"type": "string"}}
            },
            "required": ["slug"]
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let mut arguments = arguments;
        let slug = BaseToolImpl::take_string(&mut arguments, "slug")?;
        let patch: ProjectPatch = BaseToolImpl::parse_arguments(arguments)?;

        let status = locate(context, &slug).await?;
        let project = context
            .engine
            .patch_keyed::<Project>(&status.collection_path(), &slug, &patch)
            .await?;
        BaseToolImpl::json_response(&project)
    }
}

/// Move a project between status collections
pub struct UpdateProjectStatusTool;

#[async_trait]
impl KbTool for UpdateProjectStatusTool {
    fn name(&self) -> &'static str {
        "update_project_status"
    }

    fn description(&self) -> &'static str {
        "Move a project to another status collection. Not atomic: if the second write fails the error carries the project so it can be restored."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "slug": {"type": "string"},
                "from": {"type": "string", "enum": ["active", "planned", "completed"]},
                "to": {"type": "string", "enum": ["active", "planned", "completed"]}
            },
            "required": ["slug", "to"]
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let request: UpdateStatusRequest = BaseToolImpl::parse_arguments(arguments)?;
        let from = match request.from {
            Some(from) => from,
            None => locate(context, &request.slug).await?,
        };
        let to = request.to;
        let today = context.today().to_string();

        let project: Project = context
            .engine
            .move_keyed(
                &from.collection_path(),
                &to.collection_path(),
                &request.slug,
                |project: &mut Project| {
                    project.status = to;
                    if to == ProjectStatus::Completed && project.completed.is_none() {
                        project.completed = Some(today.clone());
                    }
                },
            )
            .await?;

        tracing::info!("Project '{}' moved from {} to {}", request.slug, from, to);
        BaseToolImpl::json_response(&project)
    }
}

/// List projects
pub struct GetProjectsTool;

#[async_trait]
impl KbTool for GetProjectsTool {
    fn name(&self) -> &'static str {
        "get_projects"
    }

    fn description(&self) -> &'static str {
        "List projects grouped by status, optionally only one status."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "status": {"type": "string", "enum": ["active", "planned", "completed"]}
            }
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let request: GetProjectsRequest = BaseToolImpl::parse_arguments(arguments)?;
        let statuses = match request.status {
            Some(status) => vec![status],
            None => ProjectStatus::ALL.to_vec(),
        };

        let mut grouped: BTreeMap<&'static str, RecordMap<Project>> = BTreeMap::new();
        for status in statuses {
            let projects = context
                .engine
                .load_map::<Project>(&status.collection_path())
                .await?;
            grouped.insert(status.as_str(), projects);
        }
        BaseToolImpl::json_response(&grouped)
    }
}
