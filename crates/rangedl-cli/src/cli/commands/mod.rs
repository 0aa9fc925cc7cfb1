//! CLI command handlers, one file per command.

mod config;
mod get;
mod probe;

pub use config::run_config;
pub use get::{default_output_name, run_get, GetArgs};
pub use probe::run_probe;
