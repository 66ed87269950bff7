//! Skill tools

use super::{Arguments, BaseToolImpl, KbTool, ToolContext, ToolRegistry};
use crate::error::Result;
use crate::records::{RecordKind, Skill, SkillLevel, SkillPatch};
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Register all skill tools with the registry
pub fn register_skill_tools(registry: &mut ToolRegistry) {
    registry.register(AddSkillTool);
    registry.register(UpdateSkillTool);
    registry.register(GetSkillsTool);
}

/// A skill with its name, as returned by `get_skills`
#[derive(Debug, Serialize)]
struct NamedSkill<'a> {
    name: &'a str,
    #[serde(flatten)]
    skill: &'a Skill,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct GetSkillsRequest {
    category: Option<String>,
    min_level: Option<SkillLevel>,
}

/// Add a skill
pub struct AddSkillTool;

#[async_trait]
impl KbTool for AddSkillTool {
    fn name(&self) -> &'static str {
        "add_skill"
    }

    fn description(&self) -> &'static str {
        "Add a skill to the profile. Fails if a skill with the same name exists."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "category": {"type": "string"},
                "level": {"type": "string", "enum": ["novice", "familiar", "adept", "expert", "master"]},
                "years": {"type": "number"},
                "notes": {"type": "string"},
                "last_used": {"type": "string"}
            },
            "required": ["name", "category", "level"]
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let mut arguments = arguments;
        let name = BaseToolImpl::take_string(&mut arguments, "name")?;
        let skill: Skill = BaseToolImpl::parse_arguments(arguments)?;
        let path = RecordKind::Skill.document_path()?;

        context.engine.add_keyed(&path, name.trim(), skill).await?;
        Ok(BaseToolImpl::create_success_response(format!(
            "Added skill '{}'",
            name.trim()
        )))
    }
}

/// Patch a skill
pub struct UpdateSkillTool;

#[async_trait]
impl KbTool for UpdateSkillTool {
    fn name(&self) -> &'static str {
        "update_skill"
    }

    fn description(&self) -> &'static str {
        "Update fields of an existing skill. Omitted fields are unchanged; null clears an optional field."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "category": {"type": "string"},
                "level": {"type": "string", "enum": ["novice", "familiar", "adept", "expert", "master"]},
                "years": {"type": ["number", "null"]},
                "notes": {"type": ["string", "null"]},
                "last_used": {"type": ["string", "null"]}
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let mut arguments = arguments;
        let name = BaseToolImpl::take_string(&mut arguments, "name")?;
        let patch: SkillPatch = BaseToolImpl::parse_arguments(arguments)?;
        let path = RecordKind::Skill.document_path()?;

        let skill = context.engine.patch_keyed::<Skill>(&path, name.trim(), &patch).await?;
        BaseToolImpl::json_response(&NamedSkill {
            name: name.trim(),
            skill: &skill,
        })
    }
}

/// List skills, optionally filtered
pub struct GetSkillsTool;

#[async_trait]
impl KbTool for GetSkillsTool {
    fn name(&self) -> &'static str {
        "get_skills"
    }

    fn description(&self) -> &'static str {
        "List skills, optionally filtered by category and minimum level."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "category": {"type": "string"},
                "min_level": {"type": "string", "enum": ["novice", "familiar", "adept", "expert", "master"]}
            }
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let request: GetSkillsRequest = BaseToolImpl::parse_arguments(arguments)?;
        let path = RecordKind::Skill.document_path()?;
        let skills = context.engine.load_map::<Skill>(&path).await?;

        let matching: Vec<NamedSkill<'_>> = skills
            .iter()
            .filter(|(_, skill)| {
                request
                    .category
                    .as_deref()
                    .map_or(true, |c| skill.category.eq_ignore_ascii_case(c))
            })
            .filter(|(_, skill)| request.min_level.map_or(true, |min| skill.level >= min))
            .map(|(name, skill)| NamedSkill { name, skill })
            .collect();
        BaseToolImpl::json_response(&matching)
    }
}
