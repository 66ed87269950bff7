//! Goal and idea tools

use super::{Arguments, BaseToolImpl, KbTool, ToolContext, ToolRegistry};
use crate::error::Result;
use crate::records::{Goal, GoalPatch, GoalStatus, Idea, RecordKind};
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use serde::Deserialize;
use serde_json::{json, Value};

/// Register goal and idea tools with the registry
pub fn register_goal_tools(registry: &mut ToolRegistry) {
    registry.register(AddGoalTool);
    registry.register(UpdateGoalTool);
    registry.register(GetGoalsTool);
    registry.register(RemoveGoalTool);
    registry.register(AddIdeaTool);
}

const GOAL_STATUSES: [&str; 4] = ["not_started", "in_progress", "achieved", "abandoned"];

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct GetGoalsRequest {
    status: Option<GoalStatus>,
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RemoveGoalRequest {
    id: String,
}

/// Append a goal
pub struct AddGoalTool;

#[async_trait]
impl KbTool for AddGoalTool {
    fn name(&self) -> &'static str {
        "add_goal"
    }

    fn description(&self) -> &'static str {
        "Add a goal. Returns the stored goal with its generated id."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "category": {"type": "string"},
                "status": {"type": "string", "enum": GOAL_STATUSES},
                "target_date": {"type": "string"},
                "progress": {"type": "number"},
                "notes": {"type": "string"}
            },
            "required": ["title"]
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let goal: Goal = BaseToolImpl::parse_arguments(arguments)?;
        let path = RecordKind::Goal.document_path()?;
        let goal = context.engine.add_listed(&path, goal).await?;
        BaseToolImpl::json_response(&goal)
    }
}

/// Patch a goal by id
pub struct UpdateGoalTool;

#[async_trait]
impl KbTool for UpdateGoalTool {
    fn name(&self) -> &'static str {
        "update_goal"
    }

    fn description(&self) -> &'static str {
        "Update fields of a goal by id. Omitted fields are unchanged; null clears an optional field."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "string"},
                "title": {"type": "string"},
                "category": {"type": ["string", "null"]},
                "status": {"type": "string", "enum": GOAL_STATUSES},
                "target_date": {"type": ["string", "null"]},
                "progress": {"type": ["number", "null"]},
                "notes": {"type": ["string", "null"]}
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let mut arguments = arguments;
        let id = BaseToolImpl::take_string(&mut arguments, "id")?;
        let patch: GoalPatch = BaseToolImpl::parse_arguments(arguments)?;
        let path = RecordKind::Goal.document_path()?;

        let goal = context.engine.patch_listed::<Goal>(&path, &id, &patch).await?;
        BaseToolImpl::json_response(&goal)
    }
}

/// List goals
pub struct GetGoalsTool;

#[async_trait]
impl KbTool for GetGoalsTool {
    fn name(&self) -> &'static str {
        "get_goals"
    }

    fn description(&self) -> &'static str {
        "List goals, optionally filtered by status and category."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "status": {"type": "string", "enum": GOAL_STATUSES},
                "category": {"type": "string"}
            }
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let request: GetGoalsRequest = BaseToolImpl::parse_arguments(arguments)?;
        let path = RecordKind::Goal.document_path()?;
        let goals: Vec<Goal> = context
            .engine
            .load_list::<Goal>(&path)
            .await?
            .into_iter()
            .filter(|goal| request.status.map_or(true, |status| goal.status == status))
            .filter(|goal| match request.category.as_deref() {
                Some(category) => goal
                    .category
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(category)),
                None => true,
            })
            .collect();
        BaseToolImpl::json_response(&goals)
    }
}

/// Delete a goal by id
pub struct RemoveGoalTool;

#[async_trait]
impl KbTool for RemoveGoalTool {
    fn name(&self) -> &'static str {
        "remove_goal"
    }

    fn description(&self) -> &'static str {
        "Remove a goal by id and return it."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "string"}
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let request: RemoveGoalRequest = BaseToolImpl::parse_arguments(arguments)?;
        let path = RecordKind::Goal.document_path()?;
        let removed = context.engine.remove_listed::<Goal>(&path, &request.id).await?;
        BaseToolImpl::json_response(&removed)
    }
}

/// Append an idea
pub struct AddIdeaTool;

#[async_trait]
impl KbTool for AddIdeaTool {
    fn name(&self) -> &'static str {
        "add_idea"
    }

    fn description(&self) -> &'static str {
        "Capture an idea. Returns the stored idea with its generated id."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "description": {"type": "string"},
                "tags": {"type": "array", "items": {"type": "string"}},
                "status": {"type": "string"}
            },
            "required": ["title"]
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let idea: Idea = BaseToolImpl::parse_arguments(arguments)?;
        let path = RecordKind::Idea.document_path()?;
        let idea = context.engine.add_listed(&path, idea).await?;
        BaseToolImpl::json_response(&idea)
    }
}
