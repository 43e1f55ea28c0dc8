use std::net::SocketAddr;

use bon::bon;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::{StreamableHttpServerConfig, StreamableHttpService};
use rmcp::{ServiceExt as _, transport::stdio};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::context::capture_authorization;
use crate::errors::ServerError;
use crate::settings::ServerSettings;
use crate::tools::{ForgeTool, ToolHandler};

mod running;

pub use running::Running;

/// Path the streamable HTTP service is mounted on
pub const MCP_PATH: &str = "/mcp";

/// A GraphQL MCP server
pub struct Server {
    transport: Transport,
    running: Running,
}

/// How the server talks to MCP clients
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Transport {
    /// Use standard IO for server <> client communication
    #[default]
    Stdio,

    /// Host the MCP server on the supplied address, using streamable HTTP messages.
    StreamableHttp {
        /// The address to bind to
        address: SocketAddr,

        /// Enable stateful mode for session management
        stateful_mode: bool,
    },
}

#[bon]
impl Server {
    #[builder]
    pub fn new(
        transport: Transport,
        settings: ServerSettings,
        tools: Vec<ForgeTool>,
        handler: ToolHandler,
    ) -> Self {
        Self {
            transport,
            running: Running::new(settings.name, settings.version, tools, handler),
        }
    }

    /// Serve until the client disconnects (stdio) or a shutdown signal arrives (HTTP).
    pub async fn start(self) -> Result<(), ServerError> {
        let running = self.running;
        info!(tools = running.tool_count(), "Starting MCP server");

        match self.transport {
            Transport::StreamableHttp {
                address,
                stateful_mode,
            } => {
                info!(%address, stateful_mode, "Starting MCP server in Streamable HTTP mode");
                let router = router(running, stateful_mode);
                let tcp_listener = tokio::net::TcpListener::bind(address)
                    .await
                    .map_err(ServerError::Bind)?;
                axum::serve(tcp_listener, router)
                    .with_graceful_shutdown(shutdown_signal())
                    .await
                    .map_err(ServerError::Bind)?;
            }
            Transport::Stdio => {
                info!("Starting MCP server in stdio mode");
                let service = running
                    .serve(stdio())
                    .await
                    .inspect_err(|e| {
                        error!("serving error: {:?}", e);
                    })
                    .map_err(Box::new)?;
                service.waiting().await.map_err(ServerError::StartupError)?;
            }
        }

        info!("MCP server stopped");
        Ok(())
    }
}

/// The HTTP application: the MCP service at [`MCP_PATH`] behind the credential capture layer
pub fn router(running: Running, stateful_mode: bool) -> axum::Router {
    let service = StreamableHttpService::new(
        move || Ok(running.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig {
            stateful_mode,
            ..Default::default()
        },
    );

    axum::Router::new()
        .nest_service(MCP_PATH, service)
        .layer(axum::middleware::from_fn(capture_authorization))
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install CTRL+C signal handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
