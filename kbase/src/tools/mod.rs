//! Named operations over the knowledge base
//!
//! Each operation is a [`KbTool`] registered in a [`ToolRegistry`]. Tools take
//! a JSON argument object and produce a [`CallToolResult`] carrying either
//! pretty-printed JSON or a short message. Failures never escape the
//! registry: [`ToolRegistry::call`] turns every error into an error-flagged
//! text result and logs it.

use crate::config::{JournalConfig, KbConfig};
use crate::engine::PartialUpdateEngine;
use crate::error::{KbError, Result};
use crate::journal::JournalIndex;
use crate::routing::TopicRouter;
use crate::store::{DocumentStore, RetryPolicy};
use async_trait::async_trait;
use chrono::NaiveDate;
use rmcp::model::{Annotated, CallToolResult, RawContent, RawTextContent, Tool};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

pub mod business;
pub mod career;
pub mod context;
pub mod goals;
pub mod journal;
pub mod projects;
pub mod skills;

/// JSON object passed to a tool
pub type Arguments = Map<String, Value>;

/// Everything a tool needs to do its work
#[derive(Clone)]
pub struct ToolContext {
    /// Collection document writer
    pub engine: PartialUpdateEngine,
    /// Journal access
    pub journal: JournalIndex,
    /// Context routing table
    pub router: TopicRouter,
    /// Journal defaults
    pub journal_settings: JournalConfig,
    today: Option<NaiveDate>,
}

impl ToolContext {
    /// Create a context over `store`
    pub fn new(store: Arc<dyn DocumentStore>, policy: RetryPolicy, journal_settings: JournalConfig) -> Self {
        Self {
            engine: PartialUpdateEngine::with_policy(store.clone(), policy),
            journal: JournalIndex::new(store),
            router: TopicRouter::new(),
            journal_settings,
            today: None,
        }
    }

    /// Create a context from loaded configuration
    pub fn from_config(config: &KbConfig) -> Result<Self> {
        Ok(Self::new(
            config.build_store()?,
            config.retry_policy(),
            config.journal.clone(),
        ))
    }

    /// Pin the date used as "today"
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Today's date, local time unless pinned
    pub fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// The store shared by the engine and the journal
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        self.engine.store()
    }
}

/// Trait defining the interface for all tools
#[async_trait]
pub trait KbTool: Send + Sync {
    /// Get the tool's name
    fn name(&self) -> &'static str;

    /// Get the tool's description
    fn description(&self) -> &'static str;

    /// Get the tool's JSON schema for arguments
    fn schema(&self) -> Value;

    /// Execute the tool with the given arguments and context
    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult>;
}

/// Registry for managing tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn KbTool>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in tool
    pub fn with_all_tools() -> Self {
        let mut registry = Self::new();
        skills::register_skill_tools(&mut registry);
        projects::register_project_tools(&mut registry);
        goals::register_goal_tools(&mut registry);
        career::register_career_tools(&mut registry);
        business::register_business_tools(&mut registry);
        journal::register_journal_tools(&mut registry);
        context::register_context_tools(&mut registry);
        registry
    }

    /// Register a tool in the registry
    pub fn register<T: KbTool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Box::new(tool));
    }

    /// Get a tool by name
    pub fn get_tool(&self, name: &str) -> Option<&dyn KbTool> {
        self.tools.get(name).map(|tool| tool.as_ref())
    }

    /// List all registered tool names, sorted
    pub fn list_tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Tool descriptors for listing
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools
            .values()
            .map(|tool| {
                let mut schema_map = match tool.schema() {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                // `call` rejects arguments the schema does not name
                schema_map
                    .entry("additionalProperties")
                    .or_insert(Value::Bool(false));

                Tool {
                    name: tool.name().into(),
                    description: Some(tool.description().into()),
                    input_schema: Arc::new(schema_map),
                    annotations: None,
                }
            })
            .collect()
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run a tool by name. Unknown tools and tool failures come back as
    /// error-flagged results.
    pub async fn call(&self, name: &str, arguments: Arguments, context: &ToolContext) -> CallToolResult {
        let Some(tool) = self.get_tool(name) else {
            tracing::error!("Unknown tool '{}'", name);
            return BaseToolImpl::create_error_response(format!("Unknown tool: {name}"), None);
        };

        if let Err(e) = BaseToolImpl::check_known_arguments(&arguments, &tool.schema()) {
            return BaseToolImpl::error_result(name, &e);
        }

        tracing::debug!("Calling tool {}", name);
        match tool.execute(arguments, context).await {
            Ok(result) => result,
            Err(e) => BaseToolImpl::error_result(name, &e),
        }
    }
}

/// Common helpers for tool implementations
pub struct BaseToolImpl;

impl BaseToolImpl {
    /// Parse tool arguments from a JSON map into a typed struct
    pub fn parse_arguments<T: DeserializeOwned>(arguments: Arguments) -> Result<T> {
        serde_json::from_value(Value::Object(arguments))
            .map_err(|e| KbError::InvalidArguments(e.to_string()))
    }

    /// Reject argument keys missing from the schema's `properties`, so a
    /// misspelled field fails instead of being dropped
    pub fn check_known_arguments(arguments: &Arguments, schema: &Value) -> Result<()> {
        let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
            return Ok(());
        };
        let unknown: Vec<&str> = arguments
            .keys()
            .filter(|key| !properties.contains_key(*key))
            .map(String::as_str)
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(KbError::InvalidArguments(format!(
                "unknown argument(s): {}",
                unknown.join(", ")
            )))
        }
    }

    /// Remove a required string argument, leaving the rest for a patch
    pub fn take_string(arguments: &mut Arguments, key: &str) -> Result<String> {
        match arguments.remove(key) {
            Some(Value::String(value)) if !value.trim().is_empty() => Ok(value),
            Some(Value::String(_)) => Err(KbError::InvalidArguments(format!("'{key}' cannot be empty"))),
            Some(other) => Err(KbError::InvalidArguments(format!(
                "'{key}' must be a string, got {other}"
            ))),
            None => Err(KbError::InvalidArguments(format!("missing required argument '{key}'"))),
        }
    }

    /// Remove an optional string argument
    pub fn take_optional_string(arguments: &mut Arguments, key: &str) -> Result<Option<String>> {
        match arguments.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value)),
            Some(other) => Err(KbError::InvalidArguments(format!(
                "'{key}' must be a string, got {other}"
            ))),
        }
    }

    /// Create a success response with the given text
    pub fn create_success_response<T: Into<String>>(content: T) -> CallToolResult {
        CallToolResult {
            content: vec![Annotated::new(
                RawContent::Text(RawTextContent {
                    text: content.into(),
                }),
                None,
            )],
            is_error: Some(false),
        }
    }

    /// Success response carrying pretty-printed JSON
    pub fn json_response<T: Serialize>(value: &T) -> Result<CallToolResult> {
        Ok(Self::create_success_response(serde_json::to_string_pretty(value)?))
    }

    /// Create an error response with the given error message
    pub fn create_error_response<T: Into<String>>(error: T, details: Option<String>) -> CallToolResult {
        let error_text = match details {
            Some(details) => format!("{}: {}", error.into(), details),
            None => error.into(),
        };

        CallToolResult {
            content: vec![Annotated::new(
                RawContent::Text(RawTextContent { text: error_text }),
                None,
            )],
            is_error: Some(true),
        }
    }

    /// Log a tool failure and flatten it into an error result
    pub fn error_result(tool: &str, error: &KbError) -> CallToolResult {
        tracing::error!("Tool '{}' failed: {}", tool, error);
        Self::create_error_response(format!("{tool} failed"), Some(error.to_string()))
    }
}

/// Text of the first content item, if it is text
pub fn result_text(result: &CallToolResult) -> Option<&str> {
    result.content.first().and_then(|content| match &content.raw {
        RawContent::Text(text) => Some(text.text.as_str()),
        _ => None,
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use serde_json::json;

    const EXPECTED_TOOLS: [&str; 23] = [
        "add_application",
        "add_company",
        "add_goal",
        "add_idea",
        "add_interview",
        "add_journal_entry",
        "add_project",
        "add_skill",
        "extract_stories",
        "get_context",
        "get_goals",
        "get_journal_entry",
        "get_projects",
        "get_skills",
        "list_recent_journal_entries",
        "remove_goal",
        "search_journal",
        "update_application",
        "update_company",
        "update_goal",
        "update_project",
        "update_project_status",
        "update_skill",
    ];

    #[test]
    fn test_registry_holds_every_tool() {
        let registry = ToolRegistry::with_all_tools();
        assert_eq!(registry.list_tool_names(), EXPECTED_TOOLS);
        assert_eq!(registry.len(), EXPECTED_TOOLS.len());
    }

    #[test]
    fn test_every_tool_has_object_schema_and_description() {
        let registry = ToolRegistry::with_all_tools();
        for tool in registry.list_tools() {
            assert_eq!(tool.input_schema.get("type"), Some(&json!("object")), "{}", tool.name);
            assert!(tool.description.as_deref().is_some_and(|d| !d.is_empty()));
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_result() {
        let (_temp, context) = local_context();
        let registry = ToolRegistry::with_all_tools();
        let result = call(&registry, &context, "drop_tables", json!({})).await;
        assert_eq!(result.is_error, Some(true));
        assert!(result_text(&result).unwrap().contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_failures_become_error_text() {
        let (_temp, context) = local_context();
        let registry = ToolRegistry::with_all_tools();
        let result = call(&registry, &context, "update_goal", json!({"id": "missing"})).await;
        assert_eq!(result.is_error, Some(true));
        assert!(result_text(&result).unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_add_tools_reject_misspelled_fields() {
        let (_temp, context) = local_context();
        let registry = ToolRegistry::with_all_tools();

        for (tool, args) in [
            ("add_project", json!({"name": "P1", "descripton": "typo"})),
            ("add_company", json!({"name": "Acme", "industy": "hardware"})),
            ("add_journal_entry", json!({"date": "2025-06-01", "win": ["x"]})),
            ("add_skill", json!({"name": "rust", "category": "lang", "level": "adept", "yrs": 3})),
        ] {
            let result = call(&registry, &context, tool, args).await;
            assert_eq!(result.is_error, Some(true), "{tool}");
            assert!(result_text(&result).unwrap().contains("unknown argument"), "{tool}");
        }

        let projects = context
            .store()
            .exists(&crate::records::ProjectStatus::Planned.collection_path())
            .await
            .unwrap();
        assert!(!projects);
        assert!(!context
            .journal
            .exists(crate::journal::parse_date("2025-06-01").unwrap())
            .await
            .unwrap());
    }

    #[test]
    fn test_listed_schemas_forbid_extra_properties() {
        let registry = ToolRegistry::with_all_tools();
        for tool in registry.list_tools() {
            assert_eq!(
                tool.input_schema.get("additionalProperties"),
                Some(&json!(false)),
                "{}",
                tool.name
            );
        }
    }

    #[test]
    fn test_take_string() {
        let mut args = json!({"name": "rust", "blank": " ", "n": 3})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(BaseToolImpl::take_string(&mut args, "name").unwrap(), "rust");
        assert!(!args.contains_key("name"));
        assert!(BaseToolImpl::take_string(&mut args, "blank").is_err());
        assert!(BaseToolImpl::take_string(&mut args, "n").is_err());
        assert!(BaseToolImpl::take_string(&mut args, "gone").is_err());
    }
}
