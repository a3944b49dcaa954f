use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::network::{DEFAULT_NETWORK, EDGE_PORT};

/// Docker and LocalStack development assistant
#[derive(Parser, Debug)]
#[command(
    name = "localdock",
    about = "Docker and LocalStack development assistant",
    version,
    author,
    long_about = "localdock detects Docker and AWS usage in a project, generates a compose \
                  network that runs the app next to LocalStack, checks emulator health, and \
                  exports or imports LocalStack resource snapshots. Run 'localdock serve' to \
                  expose the same operations as tools over stdio JSON-RPC."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,

    #[arg(
        long,
        global = true,
        value_name = "URL",
        help = "LocalStack endpoint (overrides LOCALDOCK_ENDPOINT)"
    )]
    pub endpoint: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Serve the tools over stdio JSON-RPC",
        long_about = "Reads one JSON-RPC 2.0 request per line from stdin and writes responses \
                      to stdout. Logs go to stderr.\n\n\
                      Examples:\n  \
                      localdock serve\n  \
                      localdock --endpoint http://localstack:4566 serve"
    )]
    Serve,

    #[command(
        about = "Detect Docker and AWS service usage in a project",
        long_about = "Scans Dockerfiles, compose files and source code for AWS SDK clients \
                      and LocalStack configuration.\n\n\
                      Examples:\n  \
                      localdock detect\n  \
                      localdock detect /path/to/project --format json"
    )]
    Detect(DetectArgs),

    #[command(
        about = "Generate a docker-compose network with LocalStack",
        long_about = "Renders a compose file with a LocalStack service and an application \
                      service on a shared network.\n\n\
                      Examples:\n  \
                      localdock network --services s3,sqs\n  \
                      localdock network --no-app --persistence -o docker-compose.localstack.yml"
    )]
    Network(NetworkArgs),

    #[command(
        about = "Check LocalStack health",
        long_about = "Queries the LocalStack health endpoint and reports the status of each \
                      service. With --wait, polls until the listed services are ready.\n\n\
                      Examples:\n  \
                      localdock health\n  \
                      localdock health --wait --services s3,dynamodb"
    )]
    Health(HealthArgs),

    #[command(
        about = "Export LocalStack resources to a snapshot file",
        long_about = "Records bucket, table, queue, topic and function metadata in a YAML \
                      or JSON snapshot.\n\n\
                      Examples:\n  \
                      localdock export\n  \
                      localdock export --services s3,sqs -o snapshot.json --details"
    )]
    Export(ExportArgs),

    #[command(
        about = "Recreate resources from a snapshot file",
        long_about = "Recreates S3 buckets and SQS queues recorded in a snapshot. Tables, \
                      topics and functions are reported as skipped.\n\n\
                      Examples:\n  \
                      localdock import snapshot.yaml"
    )]
    Import(ImportArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct DetectArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to project (defaults to current directory)"
    )]
    pub project_path: Option<PathBuf>,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct NetworkArgs {
    #[arg(
        short = 's',
        long,
        value_delimiter = ',',
        help = "LocalStack services to enable (default: s3,dynamodb,sqs,sns,lambda)"
    )]
    pub services: Vec<String>,

    #[arg(long, default_value = DEFAULT_NETWORK, help = "Docker network name")]
    pub network_name: String,

    #[arg(long, default_value = "app", help = "Compose service name of the application")]
    pub app_service: String,

    #[arg(long, conflicts_with = "app_service", help = "Only generate the LocalStack service")]
    pub no_app: bool,

    #[arg(short = 'p', long, default_value_t = EDGE_PORT, help = "Host port for the edge endpoint")]
    pub port: u16,

    #[arg(long, help = "Keep LocalStack state in a named volume")]
    pub persistence: bool,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the compose file here instead of printing the full report"
    )]
    pub output: Option<PathBuf>,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct HealthArgs {
    #[arg(long, help = "Poll until the services are ready")]
    pub wait: bool,

    #[arg(
        short = 's',
        long,
        value_delimiter = ',',
        help = "Services that must be ready when waiting"
    )]
    pub services: Vec<String>,

    #[arg(long, default_value = "10", help = "Maximum number of polls when waiting")]
    pub attempts: u32,

    #[arg(long, value_name = "SECONDS", default_value = "2", help = "Seconds between polls")]
    pub interval: u64,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ExportArgs {
    #[arg(
        short = 's',
        long,
        value_delimiter = ',',
        help = "Service kinds to export, in order (default: all)"
    )]
    pub services: Vec<String>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Snapshot file; .json selects JSON (default: localstack-snapshot-<timestamp>.yaml)"
    )]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Record object metadata and table item counts")]
    pub details: bool,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ImportArgs {
    #[arg(value_name = "FILE", help = "Snapshot file to import")]
    pub file: PathBuf,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_detect_args() {
        let args = CliArgs::parse_from(["localdock", "detect"]);
        match args.command {
            Commands::Detect(detect_args) => {
                assert_eq!(detect_args.format, OutputFormatArg::Human);
                assert!(detect_args.project_path.is_none());
            }
            _ => panic!("Expected Detect command"),
        }
    }

    #[test]
    fn test_export_with_options() {
        let args = CliArgs::parse_from([
            "localdock",
            "export",
            "--services",
            "s3,sqs",
            "-o",
            "snap.json",
            "--details",
            "--format",
            "json",
        ]);

        match args.command {
            Commands::Export(export_args) => {
                assert_eq!(export_args.services, vec!["s3", "sqs"]);
                assert_eq!(export_args.output, Some(PathBuf::from("snap.json")));
                assert!(export_args.details);
                assert_eq!(export_args.format, OutputFormatArg::Json);
            }
            _ => panic!("Expected Export command"),
        }
    }

    #[test]
    fn test_import_requires_file() {
        assert!(CliArgs::try_parse_from(["localdock", "import"]).is_err());

        let args = CliArgs::parse_from(["localdock", "import", "snap.yaml"]);
        match args.command {
            Commands::Import(import_args) => {
                assert_eq!(import_args.file, PathBuf::from("snap.yaml"));
            }
            _ => panic!("Expected Import command"),
        }
    }

    #[test]
    fn test_network_defaults() {
        let args = CliArgs::parse_from(["localdock", "network"]);
        match args.command {
            Commands::Network(network_args) => {
                assert!(network_args.services.is_empty());
                assert_eq!(network_args.network_name, DEFAULT_NETWORK);
                assert_eq!(network_args.app_service, "app");
                assert_eq!(network_args.port, EDGE_PORT);
                assert!(!network_args.no_app);
            }
            _ => panic!("Expected Network command"),
        }
    }

    #[test]
    fn test_health_wait() {
        let args = CliArgs::parse_from(["localdock", "health", "--wait", "-s", "s3,sqs"]);
        match args.command {
            Commands::Health(health_args) => {
                assert!(health_args.wait);
                assert_eq!(health_args.services, vec!["s3", "sqs"]);
                assert_eq!(health_args.attempts, 10);
                assert_eq!(health_args.interval, 2);
            }
            _ => panic!("Expected Health command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from([
            "localdock",
            "serve",
            "-v",
            "--endpoint",
            "http://localstack:4566",
        ]);
        assert!(matches!(args.command, Commands::Serve));
        assert!(args.verbose);
        assert_eq!(args.endpoint.as_deref(), Some("http://localstack:4566"));

        assert!(CliArgs::try_parse_from(["localdock", "-v", "-q", "serve"]).is_err());
    }

    #[test]
    fn test_log_level_flag() {
        let args = CliArgs::parse_from(["localdock", "--log-level", "debug", "health"]);
        assert_eq!(args.log_level, Some("debug".to_string()));
    }
}
