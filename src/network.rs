//! Docker networking configuration for running an app next to LocalStack
//!
//! Renders a docker-compose document with a `localstack` service and an
//! optional application service on a shared bridge network, plus the
//! environment variables the app needs from inside and outside the network.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use crate::config::DEFAULT_REGION;
use crate::emulator::HEALTH_PATH;
use crate::snapshot::ServiceKind;

pub const LOCALSTACK_IMAGE: &str = "localstack/localstack:3";
pub const LOCALSTACK_SERVICE: &str = "localstack";
/// Port LocalStack listens on inside its container
pub const EDGE_PORT: u16 = 4566;
pub const DEFAULT_NETWORK: &str = "localstack-net";
const DATA_VOLUME: &str = "localstack-data";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid service name '{0}': use lowercase letters, digits and dashes")]
    InvalidServiceName(String),

    #[error("Invalid network name '{0}'")]
    InvalidNetworkName(String),

    #[error("Host port must be between 1 and 65535")]
    InvalidPort,

    #[error("Failed to render compose file: {0}")]
    Render(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkOptions {
    /// LocalStack services to enable; all snapshot kinds when empty
    pub services: Vec<String>,
    pub network_name: String,
    /// Compose service name for the application; omitted when `None`
    pub app_service: Option<String>,
    /// Host port published for the edge endpoint
    pub port: u16,
    pub persistence: bool,
    pub region: String,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            services: Vec::new(),
            network_name: DEFAULT_NETWORK.to_string(),
            app_service: Some("app".to_string()),
            port: EDGE_PORT,
            persistence: false,
            region: DEFAULT_REGION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub network_name: String,
    pub services: Vec<String>,
    pub compose_yaml: String,
    /// Variables for processes on the host
    pub host_environment: BTreeMap<String, String>,
    /// Variables for containers on the shared network
    pub container_environment: BTreeMap<String, String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ComposeDocument {
    services: BTreeMap<String, ComposeService>,
    networks: BTreeMap<String, ComposeNetwork>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    volumes: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Default, Serialize)]
struct ComposeService {
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    build: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    container_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ports: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    environment: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    volumes: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    depends_on: BTreeMap<String, DependsOn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    healthcheck: Option<HealthCheck>,
    networks: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DependsOn {
    condition: String,
}

#[derive(Debug, Serialize)]
struct HealthCheck {
    test: Vec<String>,
    interval: String,
    timeout: String,
    retries: u32,
}

#[derive(Debug, Serialize)]
struct ComposeNetwork {
    driver: String,
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

pub struct NetworkConfigGenerator;

impl NetworkConfigGenerator {
    pub fn generate(options: &NetworkOptions) -> Result<NetworkConfig, NetworkError> {
        if options.port == 0 {
            return Err(NetworkError::InvalidPort);
        }
        if !is_valid_name(&options.network_name) {
            return Err(NetworkError::InvalidNetworkName(options.network_name.clone()));
        }

        let mut services: Vec<String> = Vec::new();
        for name in &options.services {
            let name = name.trim().to_lowercase();
            if !is_valid_name(&name) {
                return Err(NetworkError::InvalidServiceName(name));
            }
            if !services.contains(&name) {
                services.push(name);
            }
        }
        if services.is_empty() {
            services = ServiceKind::all_names().iter().map(|s| s.to_string()).collect();
        }
        let needs_docker_socket = services.iter().any(|s| s == "lambda");

        let container_environment = sdk_environment(
            &format!("http://{}:{}", LOCALSTACK_SERVICE, EDGE_PORT),
            &options.region,
        );
        let host_environment =
            sdk_environment(&format!("http://localhost:{}", options.port), &options.region);

        let mut localstack_env = BTreeMap::from([
            ("SERVICES".to_string(), services.join(",")),
            ("DEFAULT_REGION".to_string(), options.region.clone()),
        ]);
        let mut volumes = Vec::new();
        let mut named_volumes = BTreeMap::new();
        if options.persistence {
            localstack_env.insert("PERSISTENCE".to_string(), "1".to_string());
            volumes.push(format!("{}:/var/lib/localstack", DATA_VOLUME));
            named_volumes.insert(DATA_VOLUME.to_string(), BTreeMap::new());
        }
        if needs_docker_socket {
            volumes.push("/var/run/docker.sock:/var/run/docker.sock".to_string());
        }

        let localstack = ComposeService {
            image: Some(LOCALSTACK_IMAGE.to_string()),
            container_name: Some(LOCALSTACK_SERVICE.to_string()),
            ports: vec![format!("{}:{}", options.port, EDGE_PORT)],
            environment: localstack_env,
            volumes,
            healthcheck: Some(HealthCheck {
                test: vec![
                    "CMD".to_string(),
                    "curl".to_string(),
                    "-f".to_string(),
                    format!("http://localhost:{}{}", EDGE_PORT, HEALTH_PATH),
                ],
                interval: "10s".to_string(),
                timeout: "5s".to_string(),
                retries: 10,
            }),
            networks: vec![options.network_name.clone()],
            ..Default::default()
        };

        let mut compose_services = BTreeMap::from([(LOCALSTACK_SERVICE.to_string(), localstack)]);
        if let Some(app) = &options.app_service {
            compose_services.insert(
                app.clone(),
                ComposeService {
                    build: Some(".".to_string()),
                    environment: container_environment.clone(),
                    depends_on: BTreeMap::from([(
                        LOCALSTACK_SERVICE.to_string(),
                        DependsOn {
                            condition: "service_healthy".to_string(),
                        },
                    )]),
                    networks: vec![options.network_name.clone()],
                    ..Default::default()
                },
            );
        }

        let document = ComposeDocument {
            services: compose_services,
            networks: BTreeMap::from([(
                options.network_name.clone(),
                ComposeNetwork {
                    driver: "bridge".to_string(),
                },
            )]),
            volumes: named_volumes,
        };
        let compose_yaml =
            serde_yaml::to_string(&document).map_err(|e| NetworkError::Render(e.to_string()))?;

        let mut notes = vec![format!(
            "Containers on '{}' reach LocalStack at http://{}:{}; the host uses http://localhost:{}",
            options.network_name, LOCALSTACK_SERVICE, EDGE_PORT, options.port
        )];
        if needs_docker_socket {
            notes.push(
                "Lambda needs the Docker socket so LocalStack can start function containers"
                    .to_string(),
            );
        }
        if options.persistence {
            notes.push(format!(
                "PERSISTENCE=1 keeps state in the '{}' volume across restarts",
                DATA_VOLUME
            ));
        } else {
            notes.push(
                "State is lost when the container is removed; run export_state before docker compose down"
                    .to_string(),
            );
        }

        debug!(network = %options.network_name, services = %services.join(","), "Generated compose config");

        Ok(NetworkConfig {
            network_name: options.network_name.clone(),
            services,
            compose_yaml,
            host_environment,
            container_environment,
            notes,
        })
    }
}

fn sdk_environment(endpoint: &str, region: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("AWS_ENDPOINT_URL".to_string(), endpoint.to_string()),
        ("AWS_DEFAULT_REGION".to_string(), region.to_string()),
        ("AWS_ACCESS_KEY_ID".to_string(), "test".to_string()),
        ("AWS_SECRET_ACCESS_KEY".to_string(), "test".to_string()),
    ])
}
