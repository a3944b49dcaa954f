use localdock::cli::commands::{
    CliArgs, Commands, DetectArgs, ExportArgs, HealthArgs, ImportArgs, NetworkArgs,
};
use localdock::cli::output::{OutputFormat, OutputFormatter};
use localdock::detection::ProjectScanner;
use localdock::emulator::{EmulatorApi, HttpEmulatorClient};
use localdock::health::HealthChecker;
use localdock::network::{NetworkConfigGenerator, NetworkOptions};
use localdock::server::ToolServer;
use localdock::snapshot::{ExportRequest, HandlerRegistry, SnapshotService};
use localdock::tools::ToolRegistry;
use localdock::util::logging::{self, LoggingConfig};
use localdock::{LocaldockConfig, NAME, VERSION};

use clap::Parser;
use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("{} v{} starting", NAME, VERSION);
    debug!("Arguments: {:?}", args);

    let mut config = LocaldockConfig::default();
    if let Some(endpoint) = &args.endpoint {
        config = config.with_endpoint(endpoint.clone());
    }
    if let Err(e) = config.validate() {
        error!("{}", e);
        eprintln!("\nPlease check your environment variables and command-line arguments.");
        process::exit(1);
    }
    debug!("{}", config);

    let exit_code = match &args.command {
        Commands::Serve => handle_serve(config).await,
        Commands::Detect(detect_args) => handle_detect(detect_args).await,
        Commands::Network(network_args) => handle_network(network_args, &config, args.quiet),
        Commands::Health(health_args) => handle_health(health_args, &config).await,
        Commands::Export(export_args) => handle_export(export_args, &config).await,
        Commands::Import(import_args) => handle_import(import_args, &config).await,
    };

    process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        logging::parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        let level_str = env::var("LOCALDOCK_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        logging::parse_level(&level_str)
    };

    let use_json = env::var("LOCALDOCK_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    logging::init_logging(LoggingConfig {
        level,
        use_json,
        ..Default::default()
    });
}

fn http_client(config: &LocaldockConfig) -> Option<Arc<dyn EmulatorApi>> {
    match HttpEmulatorClient::new(config) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            error!("Failed to create emulator client: {}", e);
            None
        }
    }
}

fn print_formatted(output: anyhow::Result<String>) -> bool {
    match output {
        Ok(out) => {
            println!("{}", out);
            true
        }
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            false
        }
    }
}

async fn handle_serve(config: LocaldockConfig) -> i32 {
    let registry = match ToolRegistry::with_defaults(config) {
        Ok(registry) => registry,
        Err(e) => {
            error!("Failed to create tool registry: {:#}", e);
            return 1;
        }
    };
    info!(tools = %registry.tool_names().join(","), "Serving tools on stdio");

    match ToolServer::new(registry).serve_stdio().await {
        Ok(()) => 0,
        Err(e) => {
            error!("Tool server I/O failed: {}", e);
            1
        }
    }
}

async fn handle_detect(args: &DetectArgs) -> i32 {
    let project_path = args
        .project_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    info!("Scanning project: {}", project_path.display());

    let scan = tokio::task::spawn_blocking(move || {
        ProjectScanner::new(&project_path).map(|scanner| scanner.scan())
    })
    .await;

    let report = match scan {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => {
            eprintln!("{}", e.help_message());
            return 1;
        }
        Err(e) => {
            error!("Project scan task failed: {}", e);
            return 1;
        }
    };

    let formatter = OutputFormatter::new(args.format.into());
    if print_formatted(formatter.format_detection(&report)) {
        0
    } else {
        1
    }
}

fn handle_network(args: &NetworkArgs, config: &LocaldockConfig, quiet: bool) -> i32 {
    let options = NetworkOptions {
        services: args.services.clone(),
        network_name: args.network_name.clone(),
        app_service: if args.no_app {
            None
        } else {
            Some(args.app_service.clone())
        },
        port: args.port,
        persistence: args.persistence,
        region: config.region.clone(),
    };

    let network = match NetworkConfigGenerator::generate(&options) {
        Ok(network) => network,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };

    if let Some(output_file) = &args.output {
        return match std::fs::write(output_file, &network.compose_yaml) {
            Ok(()) => {
                info!("Compose file written to: {}", output_file.display());
                if !quiet {
                    println!("Compose file written to: {}", output_file.display());
                }
                0
            }
            Err(e) => {
                error!("Failed to write compose file: {}", e);
                1
            }
        };
    }

    let formatter = OutputFormatter::new(args.format.into());
    if print_formatted(formatter.format_network(&network)) {
        0
    } else {
        1
    }
}

async fn handle_health(args: &HealthArgs, config: &LocaldockConfig) -> i32 {
    info!("Checking LocalStack health at {}", config.endpoint);
    let Some(api) = http_client(config) else {
        return 1;
    };
    let checker = HealthChecker::new(api, config.connect_timeout());
    let formatter = OutputFormatter::new(args.format.into());

    if args.wait {
        let readiness = checker
            .wait_until_ready(&args.services, args.attempts, Duration::from_secs(args.interval))
            .await;
        let printed = print_formatted(formatter.format_readiness(&readiness));
        return if printed && readiness.ready { 0 } else { 1 };
    }

    let report = checker.check().await;
    let printed = print_formatted(formatter.format_health(&report, config));
    if printed && report.reachable {
        0
    } else {
        1
    }
}

fn snapshot_service(config: &LocaldockConfig) -> Option<SnapshotService> {
    let api = http_client(config)?;
    Some(
        SnapshotService::with_registry(api, HandlerRegistry::for_region(&config.region))
            .with_connect_timeout(config.connect_timeout()),
    )
}

async fn handle_export(args: &ExportArgs, config: &LocaldockConfig) -> i32 {
    let Some(service) = snapshot_service(config) else {
        return 1;
    };

    let mut request = if args.services.is_empty() {
        ExportRequest::all()
    } else {
        ExportRequest::new(args.services.iter().cloned())
    };
    if let Some(output) = &args.output {
        request = request.with_output(output.clone());
    }
    request = request.with_details(args.details);

    let summary = match service.export(request).await {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("{}", e.help_message());
            return 1;
        }
    };

    let format: OutputFormat = args.format.into();
    if print_formatted(OutputFormatter::new(format).format_export(&summary)) {
        0
    } else {
        1
    }
}

async fn handle_import(args: &ImportArgs, config: &LocaldockConfig) -> i32 {
    let Some(service) = snapshot_service(config) else {
        return 1;
    };

    let summary = match service.import(&args.file).await {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("{}", e.help_message());
            return 1;
        }
    };

    let format: OutputFormat = args.format.into();
    let printed = print_formatted(OutputFormatter::new(format).format_import(&summary));
    if printed && summary.errors.is_empty() {
        0
    } else {
        1
    }
}
