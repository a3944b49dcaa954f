pub mod commands;
pub mod output;

pub use commands::{
    CliArgs, Commands, DetectArgs, ExportArgs, HealthArgs, ImportArgs, NetworkArgs,
};
pub use output::{OutputFormat, OutputFormatter};
