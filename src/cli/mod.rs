//! CLI argument parsing types.
//!
//! This module provides the command-line interface structure for the
//! http-doubles binary.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::server::ServerConfig;

/// HTTP test-double server command-line interface.
#[derive(Parser, Debug)]
#[command(name = "http-doubles", about = "HTTP test-double server", version)]
pub struct Cli {
    /// Output results as JSON instead of a table.
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the doubles of a configuration file until interrupted.
    Serve {
        /// Configuration file (JSON, or YAML by extension). Without one the
        /// server starts with no doubles.
        config: Option<PathBuf>,

        /// Port to listen on, overriding the configuration.
        #[arg(long, env = "HTTP_DOUBLES_PORT")]
        port: Option<u16>,

        /// Fixtures folder, overriding the configuration.
        #[arg(long, env = "HTTP_DOUBLES_FIXTURES")]
        fixtures_folder: Option<PathBuf>,
    },

    /// Validate a configuration file and list its doubles.
    Check {
        /// Configuration file to validate.
        config: PathBuf,
    },

    /// Show what the doubles of a configuration answer for one request.
    Request {
        /// Configuration file holding the doubles.
        config: PathBuf,

        /// HTTP method of the request.
        method: String,

        /// Absolute URL of the request, as registered in the double.
        url: String,
    },
}

/// Load the configuration for a command and apply flag overrides.
///
/// Without a file the default configuration is used.
pub fn load_config(
    path: Option<&Path>,
    port: Option<u16>,
    fixtures_folder: Option<PathBuf>,
) -> Result<ServerConfig> {
    let mut config = match path {
        Some(path) => ServerConfig::from_path(path)?,
        None => ServerConfig::default(),
    };

    if let Some(port) = port {
        config.http_port = port;
    }
    if let Some(folder) = fixtures_folder {
        config.fixtures_folder = folder;
    }

    Ok(config)
}
