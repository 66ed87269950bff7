use crate::cli::OutputFormat;
use crate::error::{CliResult, IntoCliResult};
use kbase::ToolRegistry;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Serialize)]
struct ToolInfo {
    name: String,
    description: String,
    input_schema: Map<String, Value>,
}

/// Print every registered tool
pub fn run_list_command(format: OutputFormat) -> CliResult<()> {
    let registry = ToolRegistry::with_all_tools();
    let tools = registry.list_tools();

    match format {
        OutputFormat::Table => {
            let width = tools.iter().map(|t| t.name.len()).max().unwrap_or(0);
            for tool in &tools {
                println!(
                    "{:width$}  {}",
                    tool.name,
                    tool.description.as_deref().unwrap_or_default()
                );
            }
        }
        OutputFormat::Json => {
            let infos: Vec<ToolInfo> = tools
                .iter()
                .map(|tool| ToolInfo {
                    name: tool.name.to_string(),
                    description: tool.description.as_deref().unwrap_or_default().to_string(),
                    input_schema: tool.input_schema.as_ref().clone(),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&infos).cli_tool_error()?);
        }
    }
    Ok(())
}
