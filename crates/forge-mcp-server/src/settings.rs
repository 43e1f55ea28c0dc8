//! Server-level settings
//!
//! The settings live in a single `forge.yaml` next to the tool definitions. Every field can
//! also be provided through a `FORGE_SERVER_` prefixed environment variable, which takes
//! precedence over the file.

use std::collections::BTreeMap;
use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use schemars::JsonSchema;
use serde::Deserialize;
use url::Url;

use crate::runtime::logging::Logging;

/// File name of the settings document inside the configuration directory
pub const SETTINGS_FILE_NAME: &str = "forge.yaml";

/// Prefix for environment variables overriding settings fields
const ENV_PREFIX: &str = "FORGE_SERVER_";

/// Separator to use when drilling down into nested options in the env figment
const ENV_NESTED_SEPARATOR: &str = "__";

/// Global endpoint and authentication settings
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ServerSettings {
    /// Name reported to MCP clients
    #[serde(default = "defaults::name")]
    pub name: String,

    /// Version reported to MCP clients
    #[serde(default = "defaults::version")]
    pub version: String,

    /// The upstream GraphQL endpoint
    pub url: Url,

    /// Shell command whose standard output is used as the bearer token
    #[serde(default)]
    pub token_command: Option<String>,

    /// Environment variables set for the token command, replacing inherited ones
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Start the token command from a copy of this process's environment
    #[serde(default)]
    pub env_passthrough: bool,

    /// Logging options
    #[serde(default)]
    pub logging: Logging,
}

impl ServerSettings {
    /// The configured token command, ignoring blank values
    pub fn token_command(&self) -> Option<&str> {
        self.token_command
            .as_deref()
            .map(str::trim)
            .filter(|command| !command.is_empty())
    }
}

mod defaults {
    pub(super) fn name() -> String {
        env!("CARGO_PKG_NAME").to_string()
    }

    pub(super) fn version() -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }
}

/// Build the figment for the settings document in `config_dir`.
///
/// The file must exist: unlike the environment, it is not optional.
#[allow(clippy::result_large_err)]
pub fn settings_figment(config_dir: impl AsRef<Path>) -> Result<Figment, figment::Error> {
    let path = config_dir.as_ref().join(SETTINGS_FILE_NAME);
    let content = std::fs::read_to_string(&path).map_err(|e| {
        figment::Error::from(format!(
            "failed to read settings file '{}': {}",
            path.display(),
            e
        ))
    })?;

    Ok(Figment::new()
        .join(Env::prefixed(ENV_PREFIX).split(ENV_NESTED_SEPARATOR))
        .join(Yaml::string(&content)))
}

/// Read the settings document from `config_dir`.
#[allow(clippy::result_large_err)]
pub fn read_settings(config_dir: impl AsRef<Path>) -> Result<ServerSettings, figment::Error> {
    settings_figment(config_dir)?.extract()
}
