use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

use crate::domain::components::ComponentIdentifier;

/// Command-line arguments for the bento binary.
#[derive(Debug, Parser)]
#[command(name = "bento", version, about = "Bento component registry")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BENTO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the public registry and admin HTTP listeners.
    Serve(Box<ServeArgs>),
    /// Delete a component's blobs and reset its compiled stylesheet.
    Purge(PurgeArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct PurgeArgs {
    /// Component to purge: a numeric id or `<owner_id>/<slug>`.
    #[arg(value_name = "IDENTIFIER")]
    pub identifier: ComponentIdentifier,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub database: DatabaseOverride,

    #[command(flatten)]
    pub storage: StorageOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct StorageOverrides {
    /// Override the object storage backend (filesystem|http).
    #[arg(long = "storage-backend", value_name = "BACKEND")]
    pub storage_backend: Option<String>,

    /// Override the directory used by the filesystem backend.
    #[arg(long = "storage-directory", value_name = "PATH")]
    pub storage_directory: Option<PathBuf>,

    /// Override the base URL used by the http backend.
    #[arg(long = "storage-endpoint", value_name = "URL")]
    pub storage_endpoint: Option<String>,

    /// Override the object storage request timeout.
    #[arg(long = "storage-timeout-seconds", value_name = "SECONDS")]
    pub storage_timeout_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub database: DatabaseOverride,

    #[command(flatten)]
    pub storage: StorageOverrides,

    /// Override the public listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the administrative listener host.
    #[arg(long = "server-admin-host", value_name = "HOST")]
    pub server_admin_host: Option<String>,

    /// Override the public listener port.
    #[arg(long = "server-public-port", value_name = "PORT")]
    pub public_port: Option<u16>,

    /// Override the administrative listener port.
    #[arg(long = "server-admin-port", value_name = "PORT")]
    pub admin_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,
}
