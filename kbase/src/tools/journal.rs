//! Journal tools
//!
//! Dates are `yyyy-mm-dd`. Listings and searches default to windows ending
//! today and never span more than [`MAX_JOURNAL_DAYS`].

use super::{Arguments, BaseToolImpl, KbTool, ToolContext, ToolRegistry};
use crate::config::MAX_JOURNAL_DAYS;
use crate::error::{KbError, Result};
use crate::journal::{parse_date, JournalEntry, SearchQuery};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use rmcp::model::CallToolResult;
use serde::Deserialize;
use serde_json::{json, Value};

/// Register journal tools with the registry
pub fn register_journal_tools(registry: &mut ToolRegistry) {
    registry.register(AddJournalEntryTool);
    registry.register(GetJournalEntryTool);
    registry.register(ListRecentJournalEntriesTool);
    registry.register(SearchJournalTool);
    registry.register(ExtractStoriesTool);
}

/// Days covered by search and story extraction when no start is given
const DEFAULT_WINDOW_DAYS: u64 = 30;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetEntryRequest {
    date: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ListRecentRequest {
    days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SearchRequest {
    keyword: Option<String>,
    tags: Vec<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StoriesRequest {
    start_date: Option<String>,
    end_date: Option<String>,
}

/// Resolve an inclusive date window, defaulting to the last 30 days
fn resolve_window(
    context: &ToolContext,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(NaiveDate, NaiveDate)> {
    let end = match end {
        Some(text) => parse_date(text)?,
        None => context.today(),
    };
    let start = match start {
        Some(text) => parse_date(text)?,
        None => end
            .checked_sub_days(Days::new(DEFAULT_WINDOW_DAYS - 1))
            .unwrap_or(NaiveDate::MIN),
    };

    if start > end {
        return Err(KbError::InvalidArguments(format!(
            "start_date {start} is after end_date {end}"
        )));
    }
    let span = (end - start).num_days() + 1;
    if span > i64::from(MAX_JOURNAL_DAYS) {
        return Err(KbError::InvalidArguments(format!(
            "date window of {span} days exceeds the maximum of {MAX_JOURNAL_DAYS}"
        )));
    }
    Ok((start, end))
}

/// Write a new journal entry
pub struct AddJournalEntryTool;

#[async_trait]
impl KbTool for AddJournalEntryTool {
    fn name(&self) -> &'static str {
        "add_journal_entry"
    }

    fn description(&self) -> &'static str {
        "Create the journal entry for a date (default today). Each date has at most one entry."
    }

    fn schema(&self) -> Value {
        let list = json!({"type": "array", "items": {"type": "string"}});
        json!({
            "type": "object",
            "properties": {
                "date": {"type": "string", "description": "yyyy-mm-dd, defaults to today"},
                "mood": {"type": "string"},
                "energy": {"type": "number"},
                "wins": list,
                "struggles": list,
                "kid_moments": list,
                "learnings": list,
                "gratitude": list,
                "tags": list,
                "body": {"type": "string"}
            }
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let mut arguments = arguments;
        let date = match BaseToolImpl::take_optional_string(&mut arguments, "date")? {
            Some(text) => parse_date(&text)?,
            None => context.today(),
        };
        arguments.insert("date".to_string(), json!(date.to_string()));
        let entry: JournalEntry = BaseToolImpl::parse_arguments(arguments)?;

        context.journal.create(&entry).await?;
        Ok(BaseToolImpl::create_success_response(format!(
            "Created journal entry for {} at {}",
            entry.date,
            entry.path()
        )))
    }
}

/// Read one entry
pub struct GetJournalEntryTool;

#[async_trait]
impl KbTool for GetJournalEntryTool {
    fn name(&self) -> &'static str {
        "get_journal_entry"
    }

    fn description(&self) -> &'static str {
        "Get the journal entry for a date."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "date": {"type": "string"}
            },
            "required": ["date"]
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let request: GetEntryRequest = BaseToolImpl::parse_arguments(arguments)?;
        let entry = context.journal.get(parse_date(&request.date)?).await?;
        BaseToolImpl::json_response(&entry)
    }
}

/// List entries from the last few days
pub struct ListRecentJournalEntriesTool;

#[async_trait]
impl KbTool for ListRecentJournalEntriesTool {
    fn name(&self) -> &'static str {
        "list_recent_journal_entries"
    }

    fn description(&self) -> &'static str {
        "List journal entries from the last N days including today, newest first."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "days": {"type": "integer", "minimum": 1, "maximum": MAX_JOURNAL_DAYS}
            }
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let request: ListRecentRequest = BaseToolImpl::parse_arguments(arguments)?;
        let days = request
            .days
            .unwrap_or(context.journal_settings.recent_days);
        if days == 0 || days > MAX_JOURNAL_DAYS {
            return Err(KbError::InvalidArguments(format!(
                "days must be between 1 and {MAX_JOURNAL_DAYS}"
            )));
        }

        let entries = context.journal.list_recent(context.today(), days).await?;
        BaseToolImpl::json_response(&entries)
    }
}

/// Keyword and tag search
pub struct SearchJournalTool;

#[async_trait]
impl KbTool for SearchJournalTool {
    fn name(&self) -> &'static str {
        "search_journal"
    }

    fn description(&self) -> &'static str {
        "Search journal entries by keyword and tags over a date window (default the last 30 days). Results carry an excerpt and a relevance score."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "keyword": {"type": "string"},
                "tags": {"type": "array", "items": {"type": "string"}},
                "start_date": {"type": "string"},
                "end_date": {"type": "string"},
                "limit": {"type": "integer", "minimum": 0}
            }
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let request: SearchRequest = BaseToolImpl::parse_arguments(arguments)?;
        let (start, end) = resolve_window(
            context,
            request.start_date.as_deref(),
            request.end_date.as_deref(),
        )?;

        let query = SearchQuery {
            keyword: request.keyword,
            tags: request.tags,
            start,
            end,
            limit: request
                .limit
                .unwrap_or(context.journal_settings.search_limit),
        };
        let hits = context.journal.search(&query).await?;
        BaseToolImpl::json_response(&hits)
    }
}

/// Recurring themes worth turning into stories
pub struct ExtractStoriesTool;

#[async_trait]
impl KbTool for ExtractStoriesTool {
    fn name(&self) -> &'static str {
        "extract_stories"
    }

    fn description(&self) -> &'static str {
        "Find recurring themes (kid moments, struggles, wins) across journal entries in a date window (default the last 30 days)."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "start_date": {"type": "string"},
                "end_date": {"type": "string"}
            }
        })
    }

    async fn execute(&self, arguments: Arguments, context: &ToolContext) -> Result<CallToolResult> {
        let request: StoriesRequest = BaseToolImpl::parse_arguments(arguments)?;
        let (start, end) = resolve_window(
            context,
            request.start_date.as_deref(),
            request.end_date.as_deref(),
        )?;
        let stories = context.journal.extract_stories(start, end).await?;
        BaseToolImpl::json_response(&stories)
    }
}
