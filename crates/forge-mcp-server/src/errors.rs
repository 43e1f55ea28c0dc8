use std::fmt;
use std::path::PathBuf;

use tokio::task::JoinError;

/// An error in server initialization
#[derive(Debug)]
pub enum ServerError {
    Settings(Box<figment::Error>),
    ToolDiscovery {
        directory: PathBuf,
        source: std::io::Error,
    },
    InvalidAddress(String),
    Bind(std::io::Error),
    StartupError(JoinError),
    McpInitializeError(Box<rmcp::service::ServerInitializeError>),
    HttpClient(reqwest::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Settings(e) => write!(f, "Error loading core config: {}", e),
            ServerError::ToolDiscovery { directory, source } => write!(
                f,
                "Error discovering tools in {}: {}",
                directory.display(),
                source
            ),
            ServerError::InvalidAddress(addr) => {
                write!(f, "Invalid HTTP bind address: {}", addr)
            }
            ServerError::Bind(e) => write!(f, "Could not bind HTTP listener: {}", e),
            ServerError::StartupError(e) => write!(f, "Failed to start server: {}", e),
            ServerError::McpInitializeError(e) => {
                write!(f, "Failed to initialize MCP server: {}", e)
            }
            ServerError::HttpClient(e) => write!(f, "Could not build HTTP client: {}", e),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Settings(e) => Some(e.as_ref()),
            ServerError::ToolDiscovery { source, .. } => Some(source),
            ServerError::Bind(e) => Some(e),
            ServerError::StartupError(e) => Some(e),
            ServerError::McpInitializeError(e) => Some(e.as_ref()),
            ServerError::HttpClient(e) => Some(e),
            ServerError::InvalidAddress(_) => None,
        }
    }
}

impl From<figment::Error> for ServerError {
    fn from(e: figment::Error) -> Self {
        ServerError::Settings(Box::new(e))
    }
}

impl From<JoinError> for ServerError {
    fn from(e: JoinError) -> Self {
        ServerError::StartupError(e)
    }
}

impl From<Box<rmcp::service::ServerInitializeError>> for ServerError {
    fn from(e: Box<rmcp::service::ServerInitializeError>) -> Self {
        ServerError::McpInitializeError(e)
    }
}

/// A tool definition that cannot be registered
#[derive(Debug, thiserror::Error)]
pub enum ToolDefinitionError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("unsupported type {type_name:?} in {tool}")]
    UnsupportedInputType { tool: String, type_name: String },
}

/// Failure to acquire a credential for a single call
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token_command failed: could not run command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("token_command failed: {status}")]
    Failed { status: std::process::ExitStatus },

    #[error("token_command failed: {status} Stderr: {stderr}")]
    FailedWithStderr {
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("token_command failed: token is not a valid header value")]
    InvalidToken,
}

/// Failure to reach the upstream GraphQL endpoint
#[derive(Debug, thiserror::Error)]
pub enum GraphQLError {
    #[error("marshal GraphQL payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("create request: credential is not a valid header value")]
    InvalidCredential,

    #[error("execute request: {0}")]
    Request(#[source] reqwest::Error),

    #[error("read response: {0}")]
    ReadBody(#[source] reqwest::Error),
}

/// An MCP tool error
pub type McpError = rmcp::model::ErrorData;
