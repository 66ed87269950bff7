//! Exit code constants for CLI commands
//!
//! - 0: Success
//! - 1: A tool ran and reported an error
//! - 2: Usage or configuration error

/// Successful execution
pub const EXIT_SUCCESS: i32 = 0;

/// Tool reported an error
pub const EXIT_TOOL_ERROR: i32 = 1;

/// Bad invocation or configuration
pub const EXIT_USAGE_ERROR: i32 = 2;
