//! Context loading for free-text questions

use super::{Arguments, BaseToolImpl, KbTool, ToolContext, ToolRegistry};
use crate::error::Result;
use crate::journal::JournalEntry;
use crate::routing::{ContextDocument, Topic};
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Register context tools with the registry
pub fn register_context_tools(registry: &mut ToolRegistry) {
    registry.register(GetContextTool);
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetContextRequest {
    query: String,
}

#[derive(Debug, Serialize)]
struct LoadedContext {
    topics: Vec<Topic>,
    documents: Vec<ContextDocument>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    recent_journal: Vec<JournalEntry>,
}

/// Load the documents a question is about
pub struct GetContextTool;

#[async_trait]
impl KbTool for GetContextTool {
    fn name(&self) -> &'static str {
        "get_context"
    }

    fn description(&self) -> &'static str {
        "Route a free-text question to knowledge-base topics by keyword and return the matching documents. Journal questions also get recent entries."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let request: GetContextRequest = BaseToolImpl::parse_arguments(arguments)?;
        let topics = context.router.route(&request.query);
        let documents = context
            .router
            .load_context(context.store().as_ref(), &request.query)
            .await?;

        let recent_journal = if topics.contains(&Topic::Journal) {
            context
                .journal
                .list_recent(context.today(), context.journal_settings.recent_days)
                .await?
        } else {
            Vec::new()
        };

        tracing::info!(
            "Loaded {} documents for topics {:?}",
            documents.len(),
            topics
        );
        BaseToolImpl::json_response(&LoadedContext {
            topics,
            documents,
            recent_journal,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::tools::test_support::*;
    use crate::tools::ToolRegistry;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_context_for_skills_question() {
        let (_temp, context) = local_context();
        let registry = ToolRegistry::with_all_tools();

        call_ok(
            &registry,
            &context,
            "add_skill",
            json!({"category": "lang", "name": "rust", "level": "expert"}),
        )
        .await;

        let loaded: Value = serde_json::from_str(
            &call_ok(
                &registry,
                &context,
                "get_context",
                json!({"query": "What SKILLS should I list?"}),
            )
            .await,
        )
        .unwrap();
        assert_eq!(loaded["topics"], json!(["skills"]));
        assert_eq!(loaded["documents"][0]["path"], "profile/skills.json");
        assert!(loaded["documents"][0]["content"]
            .as_str()
            .unwrap()
            .contains("\"rust\""));
        assert!(loaded.get("recent_journal").is_none());
    }

    #[tokio::test]
    async fn test_journal_question_includes_recent_entries() {
        let (_temp, context) = local_context();
        let registry = ToolRegistry::with_all_tools();

        call_ok(
            &registry,
            &context,
            "add_journal_entry",
            json!({"mood": "tired", "struggles": ["no sleep"]}),
        )
        .await;

        let loaded: Value = serde_json::from_str(
            &call_ok(&registry, &context, "get_context", json!({"query": "how did I feel today"})).await,
        )
        .unwrap();
        assert_eq!(loaded["topics"], json!(["journal"]));
        assert_eq!(loaded["documents"], json!([]));
        assert_eq!(loaded["recent_journal"][0]["mood"], "tired");
    }
}
