//! Configuration module for the product relay.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Command-line arguments for the relay
#[derive(Parser, Debug)]
#[command(name = "product-relay")]
#[command(author = "product-relay authors")]
#[command(version = "0.1.0")]
#[command(about = "Relays product records to a collector over newline-delimited JSON", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the collector: accept product frames and keep them in memory
    Serve(ServeArgs),
    /// Submit one product record to a running collector
    Send(SendArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Host to bind to (e.g., 0.0.0.0)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Maximum number of connections handled at once
    #[arg(long)]
    pub max_connections: Option<usize>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SendArgs {
    /// Collector address (e.g., 127.0.0.1:5000)
    #[arg(long)]
    pub collector: Option<String>,

    #[arg(long)]
    pub model: String,

    #[arg(long)]
    pub brand: String,

    /// Length, as typed; validated before anything is sent
    #[arg(long)]
    pub length: String,

    #[arg(long)]
    pub width: String,

    #[arg(long)]
    pub height: String,

    /// Relative file path to describe in FolderData (repeatable)
    #[arg(long = "file")]
    pub files: Vec<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub catalog: Catalog,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Collector-side configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connections served concurrently before accept waits for a slot
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Largest accepted request payload, excluding the newline
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
    #[serde(default = "default_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub write_timeout_ms: u64,
    #[serde(default = "default_backlog")]
    pub backlog: i32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_connections: default_max_connections(),
            max_frame_size: default_max_frame_size(),
            read_timeout_ms: default_timeout_ms(),
            write_timeout_ms: default_timeout_ms(),
            backlog: default_backlog(),
        }
    }
}

impl ServerConfig {
    /// Resolve `host:port` to the first matching socket address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let listen = format!("{}:{}", self.host, self.port);
        listen
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or(ConfigError::InvalidListen(listen))
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

/// Producer-side configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_collector")]
    pub collector: String,
    /// Applies separately to connect, write and read
    #[serde(default = "default_client_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            collector: default_collector(),
            timeout_ms: default_client_timeout_ms(),
            max_frame_size: default_max_frame_size(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Valid Model and Brand values offered to producers.
///
/// The collector never enforces these; only the producer form checks them.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Catalog {
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default = "default_brands")]
    pub brands: Vec<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            models: default_models(),
            brands: default_brands(),
        }
    }
}

impl Catalog {
    pub fn has_model(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    pub fn has_brand(&self, brand: &str) -> bool {
        self.brands.iter().any(|b| b == brand)
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_connections() -> usize {
    1024
}

fn default_max_frame_size() -> usize {
    1024 * 1024 // 1 MiB
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_backlog() -> i32 {
    1024
}

fn default_collector() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_client_timeout_ms() -> u64 {
    10_000
}

fn default_models() -> Vec<String> {
    ["Rodigo", "Douglous", "Andre"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_brands() -> Vec<String> {
    ["LP", "VH"].into_iter().map(String::from).collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub catalog: Catalog,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<(Self, Command), ConfigError> {
        Self::resolve(CliArgs::parse())
    }

    /// Merge already-parsed CLI args with the TOML file they point at.
    pub fn resolve(cli: CliArgs) -> Result<(Self, Command), ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Ok((Self::merge(&cli, toml_config), cli.command))
    }

    fn merge(cli: &CliArgs, toml_config: TomlConfig) -> Self {
        let mut server = toml_config.server;
        let mut client = toml_config.client;

        match &cli.command {
            Command::Serve(args) => {
                if let Some(host) = &args.host {
                    server.host = host.clone();
                }
                if let Some(port) = args.port {
                    server.port = port;
                }
                if let Some(max) = args.max_connections {
                    server.max_connections = max;
                }
            }
            Command::Send(args) => {
                if let Some(collector) = &args.collector {
                    client.collector = collector.clone();
                }
            }
        }

        Config {
            server,
            client,
            catalog: toml_config.catalog,
            log_level: cli
                .log_level
                .clone()
                .unwrap_or(toml_config.logging.level),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    FileRead(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    TomlParse(PathBuf, #[source] toml::de::Error),
    #[error("Invalid listen address '{0}'")]
    InvalidListen(String),
}
