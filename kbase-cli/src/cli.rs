use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "kbase")]
#[command(version)]
#[command(about = "Read and update a personal knowledge base")]
#[command(long_about = "
kbase stores profile data, projects, goals, career records, business notes
and a daily journal as JSON and markdown documents, either in a local
directory or in a remote versioned repository.

Example usage:
  kbase list                                   # Show available tools
  kbase call get_skills '{\"min_level\": \"adept\"}'
  kbase call add_journal_entry '{\"wins\": [\"shipped X\"]}'
  kbase config                                 # Show the effective configuration
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file to use instead of .kbase/config.yaml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the available tools
    #[command(long_about = "
Lists every tool with its description.

Output formats:
  table  - One tool per line (default)
  json   - Names, descriptions and argument schemas

Examples:
  kbase list
  kbase list --format json
")]
    List {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Call a tool with JSON arguments
    #[command(long_about = "
Calls one tool. Arguments are a JSON object; omit them to pass {}.
Use - to read the arguments from stdin.

Exit codes:
  0 - Tool succeeded
  1 - Tool ran and failed
  2 - Unknown tool, bad arguments JSON, or configuration error

Examples:
  kbase call get_projects
  kbase call update_project_status '{\"slug\": \"p1\", \"to\": \"active\"}'
  echo '{\"keyword\": \"garden\"}' | kbase call search_journal -
")]
    Call {
        /// Tool name
        tool: String,
        /// Arguments as a JSON object, or - for stdin
        arguments: Option<String>,
    },
    /// Show the effective configuration
    Config,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    #[allow(dead_code)]
    pub fn try_parse_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(args)
    }
}
