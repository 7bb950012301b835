//! Server configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::double::{is_a_double, Double};
use crate::error::{DoubleError, Result};

/// Port the server listens on when none is configured.
pub const DEFAULT_HTTP_PORT: u16 = 8001;

/// Folder fixtures are resolved against when none is configured.
pub const DEFAULT_FIXTURES_FOLDER: &str = "test/fixtures";

/// Configuration consumed by [`Server::serve`](crate::Server::serve).
///
/// ```json
/// { "httpPort": 8002, "fixturesFolder": "test/fixtures", "doubles": [ ... ] }
/// ```
///
/// `doubles` left out means "configure the transport only": the registry
/// keeps whatever it holds. An empty list clears it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    #[serde(default = "default_fixtures_folder")]
    pub fixtures_folder: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doubles: Option<Vec<Double>>,
}

fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}

fn default_fixtures_folder() -> PathBuf {
    PathBuf::from(DEFAULT_FIXTURES_FOLDER)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            fixtures_folder: default_fixtures_folder(),
            doubles: None,
        }
    }
}

impl ServerConfig {
    /// Create a configuration with default port and fixtures folder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the port to listen on. Port 0 lets the OS pick one.
    pub fn with_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    /// Set the folder fixtures are loaded from.
    pub fn with_fixtures_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.fixtures_folder = folder.into();
        self
    }

    /// Replace the configured doubles.
    pub fn with_doubles(mut self, doubles: Vec<Double>) -> Self {
        self.doubles = Some(doubles);
        self
    }

    /// Append one double to the configured doubles.
    pub fn with_double(mut self, double: Double) -> Self {
        self.doubles.get_or_insert_with(Vec::new).push(double);
        self
    }

    /// Build a configuration from an untyped JSON value.
    ///
    /// `null` yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DoubleError::MalformedDouble`] if `doubles` is present but
    /// is not an array of doubles (or any entry fails validation), and
    /// [`DoubleError::Config`] for any other shape problem.
    pub fn from_value(value: Value) -> Result<Self> {
        let mut value = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            other => {
                return Err(DoubleError::Config(format!(
                    "expected a configuration object, got {other}"
                )))
            }
        };

        let doubles = match value.remove("doubles") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) if items.is_empty() => Some(Vec::new()),
            Some(Value::Array(items)) if items.iter().all(is_a_double) => Some(
                items
                    .into_iter()
                    .map(Double::from_value)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Some(_) => {
                return Err(DoubleError::MalformedDouble(
                    "Config doubles must be an array of doubles.".to_string(),
                ))
            }
        };

        let mut config: ServerConfig = serde_json::from_value(Value::Object(value))
            .map_err(|e| DoubleError::Config(e.to_string()))?;
        config.doubles = doubles;
        Ok(config)
    }

    /// Parse a JSON configuration document.
    pub fn from_json_str(content: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(content)?)
    }

    /// Parse a YAML configuration document.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Self::from_value(serde_yaml::from_str(content)?)
    }

    /// Read a configuration file; `.yaml`/`.yml` files are parsed as YAML,
    /// anything else as JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DoubleError::Config(format!("cannot read {}: {e}", path.display())))?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        if is_yaml {
            Self::from_yaml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }
}
