use crate::error::{CliError, CliResult, IntoCliResult};
use kbase::tools::{result_text, Arguments};
use kbase::{KbConfig, ToolContext, ToolRegistry};
use serde_json::Value;
use std::io::Read;
use std::path::Path;

/// Parse the argument text into a JSON object. `None` means `{}`, `-` reads stdin.
pub fn parse_arguments(text: Option<&str>) -> CliResult<Arguments> {
    let text = match text {
        None => return Ok(Arguments::new()),
        Some("-") => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .cli_usage_error()?;
            buffer
        }
        Some(text) => text.to_string(),
    };

    if text.trim().is_empty() {
        return Ok(Arguments::new());
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(arguments)) => Ok(arguments),
        Ok(other) => Err(CliError::usage(format!(
            "tool arguments must be a JSON object, got {other}"
        ))),
        Err(e) => Err(CliError::usage(format!("invalid arguments JSON: {e}"))),
    }
}

/// Run one tool and print its output
pub async fn run_call_command(
    tool: &str,
    arguments: Option<&str>,
    config_path: Option<&Path>,
) -> CliResult<()> {
    let registry = ToolRegistry::with_all_tools();
    if registry.get_tool(tool).is_none() {
        return Err(CliError::usage(format!(
            "unknown tool '{tool}', run `kbase list` to see the available tools"
        )));
    }
    let arguments = parse_arguments(arguments)?;

    let config = KbConfig::load(config_path).cli_usage_error()?;
    let context = ToolContext::from_config(&config).cli_usage_error()?;

    let result = registry.call(tool, arguments, &context).await;
    let text = result_text(&result).unwrap_or_default();
    if result.is_error == Some(true) {
        return Err(CliError::tool(text));
    }
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::EXIT_USAGE_ERROR;

    #[test]
    fn test_parse_arguments() {
        assert!(parse_arguments(None).unwrap().is_empty());
        assert!(parse_arguments(Some("  ")).unwrap().is_empty());
        let args = parse_arguments(Some(r#"{"name": "rust"}"#)).unwrap();
        assert_eq!(args["name"], "rust");
    }

    #[test]
    fn test_non_object_arguments_are_usage_errors() {
        let err = parse_arguments(Some("[1, 2]")).unwrap_err();
        assert_eq!(err.exit_code, EXIT_USAGE_ERROR);
        let err = parse_arguments(Some("{oops")).unwrap_err();
        assert_eq!(err.exit_code, EXIT_USAGE_ERROR);
    }
}
