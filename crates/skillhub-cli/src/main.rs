//! skillhub CLI
//!
//! Main entry point for the skill hub MCP server.
//! Supports multiple modes:
//! - server stdio / server http: serve the active hub over MCP
//! - list, default, load, files, read: inspect what an agent would receive
//! - status, paths: show the active hub and storage layout

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use rmcp::{transport::stdio, ServiceExt};
use skillhub_mcp::SkillsServer;
use skillhub_registry::paths::{paths_from_env, HubPaths, PathsConfig};
use skillhub_registry::Registry;
use skillhub_skillstore::SkillStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application identifier for the config directory
const APP_QUALIFIER: &str = "dev";
const APP_ORGANIZATION: &str = "skillhub";
const APP_NAME: &str = "skillhub";

/// Crates whose logs follow --log-level
const LOG_TARGETS: &[&str] = &[
    "skillhub_core",
    "skillhub_registry",
    "skillhub_skillstore",
    "skillhub_mcp",
];

#[derive(Parser)]
#[command(name = "skillhub")]
#[command(about = "skillhub - layered skill discovery and context assembly", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (defaults to system config directory)
    #[arg(short, long)]
    config: Option<String>,

    /// Storage root holding master-config.json and hubs/ (overrides config)
    #[arg(long, env = "SKILLHUB_STORAGE_DIR")]
    storage_dir: Option<String>,

    /// Legacy flat skills directory (overrides config)
    #[arg(long, env = "SKILLHUB_LEGACY_SKILLS_DIR")]
    legacy_skills_dir: Option<String>,

    /// Log level (overrides config)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server (transport from config when omitted)
    Server {
        #[command(subcommand)]
        mode: Option<ServerMode>,
    },

    /// List enabled skills with descriptions
    #[command(visible_alias = "ls")]
    List {
        /// JSON output
        #[arg(short, long)]
        json: bool,
    },

    /// Print the always-loaded bundle
    Default,

    /// Print the full context of one skill
    Load {
        /// Skill folder name
        name: String,
    },

    /// List a skill's files in assembly order
    Files {
        /// Skill folder name
        name: String,
    },

    /// Print one file from a skill
    Read {
        /// Skill folder name
        name: String,

        /// Path relative to the skill folder
        relative_path: String,
    },

    /// Show the active hub and what it enables
    Status {
        /// JSON output
        #[arg(short, long)]
        json: bool,
    },

    /// Show storage paths
    Paths,
}

#[derive(Subcommand, Clone)]
enum ServerMode {
    /// Run in stdio mode (default for MCP)
    Stdio,

    /// Run in HTTP mode
    Http {
        /// Bind address
        #[arg(short, long)]
        bind: Option<String>,
    },
}

/// Server configuration
#[derive(Debug, Clone, serde::Deserialize, Default)]
struct Config {
    #[serde(default)]
    server: ServerConfig,

    #[serde(default)]
    paths: PathsConfig,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct ServerConfig {
    #[serde(default = "default_bind")]
    bind: String,

    #[serde(default = "default_transport")]
    transport: String,

    #[serde(default = "default_log_level")]
    log_level: String,
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_transport() -> String {
    "stdio".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
            transport: default_transport(),
            log_level: default_log_level(),
        }
    }
}

/// Initialize logging. Output goes to stderr: stdout carries the stdio
/// transport and command output.
fn init_logging(level: &str) {
    let directives = LOG_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .chain(std::iter::once(format!("{}={}", env!("CARGO_CRATE_NAME"), level)))
        .collect::<Vec<_>>()
        .join(",");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| directives.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Config file used when --config is not given
fn default_config_path() -> PathBuf {
    let system = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
        .map(|dirs| dirs.config_dir().join("config.yaml"));

    match system {
        Some(path) if path.exists() => path,
        _ => PathBuf::from("config.yaml"),
    }
}

/// Load configuration from file
fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&contents)
        .with_context(|| format!("Invalid config file: {}", path.display()))?;
    Ok(config)
}

/// Resolve paths with precedence: CLI args > env vars > config > defaults
fn resolve_paths(cli: &Cli, config: &Config) -> Result<HubPaths> {
    let mut paths = HubPaths::new()?;

    paths = config.paths.apply_to(paths);
    paths = paths_from_env().apply_to(paths);

    let cli_overrides = PathsConfig {
        storage_dir: cli.storage_dir.as_ref().map(PathBuf::from),
        legacy_skills_dir: cli.legacy_skills_dir.as_ref().map(PathBuf::from),
        ..Default::default()
    };
    Ok(cli_overrides.apply_to(paths))
}

fn server_mode(requested: Option<ServerMode>, config: &ServerConfig) -> ServerMode {
    requested.unwrap_or_else(|| match config.transport.as_str() {
        "http" => ServerMode::Http { bind: None },
        _ => ServerMode::Stdio,
    })
}

/// Output of the per-skill inspection commands
fn skill_output(skill_store: &SkillStore, command: &Commands) -> Result<Option<String>> {
    let output = match command {
        Commands::Load { name } => {
            let document = skill_store
                .assemble_one(name)
                .with_context(|| format!("Error loading skill {}", name))?;
            format!("{}\n", document)
        }
        Commands::Files { name } => skill_store
            .list_files(name)
            .with_context(|| format!("Error listing files of {}", name))?
            .iter()
            .map(|file| format!("{}\n", file))
            .collect(),
        Commands::Read {
            name,
            relative_path,
        } => skill_store
            .read_one_file(name, relative_path)
            .with_context(|| format!("Error reading {} from {}", relative_path, name))?,
        _ => return Ok(None),
    };
    Ok(Some(output))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    let config = load_config(&config_path)?;

    let log_level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.server.log_level.clone());
    init_logging(&log_level);
    debug!("Using config file: {}", config_path.display());

    let paths = resolve_paths(&cli, &config)?;
    let registry = Arc::new(Registry::new(paths.clone()));
    let skill_store = Arc::new(SkillStore::new(registry.clone()));

    match cli.command {
        Commands::Server { mode } => {
            let server = SkillsServer::new(skill_store);

            match server_mode(mode, &config.server) {
                ServerMode::Stdio => {
                    info!("Starting skillhub in stdio mode");
                    eprintln!("skillhub v{} (stdio)", env!("CARGO_PKG_VERSION"));
                    eprintln!("Storage directory: {}", paths.storage_dir.display());
                    eprintln!("Active hub: {}", registry.active_hub());

                    let service = server.serve(stdio()).await?;
                    service.waiting().await?;
                }

                ServerMode::Http { bind } => {
                    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
                    info!("Starting skillhub in HTTP mode on {}", bind);
                    eprintln!("skillhub v{} (http)", env!("CARGO_PKG_VERSION"));
                    eprintln!("MCP Endpoint: http://{}/mcp", bind);
                    eprintln!("Storage directory: {}", paths.storage_dir.display());

                    use rmcp::transport::streamable_http_server::{
                        session::local::LocalSessionManager,
                        tower::{StreamableHttpServerConfig, StreamableHttpService},
                    };

                    let mcp_service = StreamableHttpService::new(
                        move || Ok(server.clone()),
                        LocalSessionManager::default().into(),
                        StreamableHttpServerConfig::default(),
                    );

                    let app = axum::Router::new()
                        .route(
                            "/",
                            axum::routing::get(|| async {
                                "skillhub MCP server. Endpoint: /mcp\n"
                            }),
                        )
                        .nest_service("/mcp", mcp_service);

                    let listener = tokio::net::TcpListener::bind(&bind).await?;
                    info!("HTTP server listening on {}", bind);

                    axum::serve(listener, app)
                        .with_graceful_shutdown(async {
                            if let Err(e) = tokio::signal::ctrl_c().await {
                                tracing::error!("Failed to listen for shutdown signal: {}", e);
                            }
                            info!("Shutting down...");
                        })
                        .await?;
                }
            }
        }

        Commands::List { json } => {
            let skills = skill_store.list_descriptors();

            if json {
                println!("{}", serde_json::to_string_pretty(&skills)?);
            } else if skills.is_empty() {
                println!("No skills enabled in hub {}", registry.active_hub());
            } else {
                for skill in skills {
                    println!(
                        "{} [{}, {}] - {}",
                        skill.name, skill.kind, skill.mode, skill.description
                    );
                }
            }
        }

        Commands::Default => {
            println!("{}", skill_store.assemble_always_loaded());
        }

        command @ (Commands::Load { .. } | Commands::Files { .. } | Commands::Read { .. }) => {
            if let Some(output) = skill_output(&skill_store, &command)? {
                print!("{}", output);
            }
        }

        Commands::Status { json } => {
            let status = registry.hub_status();

            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("Active hub:    {}", status.active_hub);
                println!("Hub root:      {}", status.active_root);
                println!("Config file:   {}", status.config_path);
                println!(
                    "Context cells: {} ({} enabled)",
                    status.context_cells, status.enabled_cells
                );
                println!("Skills:        {}", status.skills);
                println!("Workflows:     {}", status.workflows);
            }
        }

        Commands::Paths => {
            eprintln!("skillhub - Storage Paths\n");
            eprintln!("{}", paths.display());
            eprintln!("  Config file:       {}", config_path.display());
            eprintln!("\nEnvironment variables for overrides:");
            eprintln!("  SKILLHUB_STORAGE_DIR        - Override storage root");
            eprintln!("  SKILLHUB_HUBS_DIR           - Override hubs directory");
            eprintln!("  SKILLHUB_SELECTOR_PATH      - Override selector file");
            eprintln!("  SKILLHUB_LEGACY_SKILLS_DIR  - Override legacy skills directory");
        }
    }

    Ok(())
}
