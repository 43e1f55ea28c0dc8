//! Discovery of tool definition files
//!
//! Every `*.yaml` file in the configuration directory except the settings file is a tool.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::{ServerError, ToolDefinitionError};
use crate::settings::SETTINGS_FILE_NAME;
use crate::tool_definition::RawToolDefinition;

const TOOL_FILE_EXTENSION: &str = "yaml";

/// A parsed tool file, together with where it came from
#[derive(Debug, Clone)]
pub struct LoadedDefinition {
    pub path: PathBuf,
    pub definition: RawToolDefinition,
}

/// List the tool files in `config_dir`, sorted by path.
pub fn discover(config_dir: &Path) -> Result<Vec<PathBuf>, ServerError> {
    let entries = fs::read_dir(config_dir).map_err(|source| ServerError::ToolDiscovery {
        directory: config_dir.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| ServerError::ToolDiscovery {
                directory: config_dir.to_path_buf(),
                source,
            })?
            .path();
        if is_tool_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn is_tool_file(path: &Path) -> bool {
    path.is_file()
        && path.extension().and_then(|e| e.to_str()) == Some(TOOL_FILE_EXTENSION)
        && path.file_name().and_then(|n| n.to_str()) != Some(SETTINGS_FILE_NAME)
}

/// Read and parse a single tool file.
pub fn load_definition(path: &Path) -> Result<RawToolDefinition, ToolDefinitionError> {
    let content = fs::read_to_string(path).map_err(|source| ToolDefinitionError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ToolDefinitionError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load every tool file in `config_dir`.
///
/// Files that cannot be read or parsed are skipped with a warning. Only a failure to list the
/// directory itself is an error.
#[tracing::instrument]
pub fn load_definitions(config_dir: &Path) -> Result<Vec<LoadedDefinition>, ServerError> {
    let definitions: Vec<_> = discover(config_dir)?
        .into_iter()
        .filter_map(|path| match load_definition(&path) {
            Ok(definition) => Some(LoadedDefinition { path, definition }),
            Err(error) => {
                warn!("Skipping {}: {}", path.display(), error);
                None
            }
        })
        .collect();

    debug!("Loaded {} tool definition files", definitions.len());
    Ok(definitions)
}
