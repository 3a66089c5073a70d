mod commands;
mod completion;
mod context;
pub mod output;
mod registry;
mod shell;

pub use context::{CliError, CliMode};
pub use shell::{run_cli, SCRIPT_MODE_VAR};
