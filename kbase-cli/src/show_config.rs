use crate::error::{CliResult, IntoCliResult};
use kbase::config::TOKEN_ENV;
use kbase::KbConfig;
use std::path::Path;

/// Print the effective configuration as YAML. The token is never printed.
pub fn run_config_command(config_path: Option<&Path>) -> CliResult<()> {
    let config = KbConfig::load(config_path).cli_usage_error()?;

    match config_path.map(Path::to_path_buf).or_else(KbConfig::find_config_file) {
        Some(file) => println!("# config file: {}", file.display()),
        None => println!("# config file: none"),
    }
    let token_state = if config.token.is_some() { "set" } else { "unset" };
    println!("# {TOKEN_ENV}: {token_state}");
    print!("{}", serde_yaml::to_string(&config).cli_usage_error()?);
    Ok(())
}
