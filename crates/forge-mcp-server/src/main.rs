use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use forge_mcp_server::errors::ServerError;
use forge_mcp_server::graphql::GraphQLClient;
use forge_mcp_server::runtime::logging::{Logging, LoggingLayerBuilder};
use forge_mcp_server::server::{Server, Transport};
use forge_mcp_server::settings::read_settings;
use forge_mcp_server::token::TokenProvider;
use forge_mcp_server::tool_directory::load_definitions;
use forge_mcp_server::tools::{ToolHandler, register_tools};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Clap styling
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Arguments to the MCP server
#[derive(Debug, clap::Parser)]
#[command(
    version,
    styles = STYLES,
    about = "Forge MCP Server - expose GraphQL queries declared in YAML as MCP tools",
)]
struct Args {
    /// Directory holding forge.yaml and the tool definitions
    #[arg(long, short = 'c', env = "FORGE_CONFIG")]
    config_dir: PathBuf,

    /// Log outbound requests, responses and token acquisition
    #[arg(long, env = "FORGE_DEBUG", value_parser = clap::builder::FalseyValueParser::new())]
    debug: bool,

    /// Serve streamable HTTP on this address (`HOST:PORT`, `PORT` or `:PORT`) instead of stdio
    #[arg(long, value_parser = parse_http_address)]
    http: Option<SocketAddr>,

    /// Disable session management for the HTTP transport
    #[arg(long, requires = "http")]
    stateless: bool,
}

impl Args {
    fn transport(&self) -> Transport {
        match self.http {
            Some(address) => Transport::StreamableHttp {
                address,
                stateful_mode: !self.stateless,
            },
            None => Transport::Stdio,
        }
    }
}

/// A bare port listens on localhost, `:PORT` on every interface
fn parse_http_address(value: &str) -> Result<SocketAddr, String> {
    let value = value.trim();
    if let Ok(port) = value.parse::<u16>() {
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port));
    }
    if let Some(port) = value.strip_prefix(':') {
        return port
            .parse::<u16>()
            .map(|port| SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))
            .map_err(|_| ServerError::InvalidAddress(value.to_string()).to_string());
    }
    value
        .parse()
        .map_err(|_| ServerError::InvalidAddress(value.to_string()).to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = read_settings(&args.config_dir).map_err(ServerError::from)?;

    let logging = settings.logging.clone().with_debug(args.debug);
    let (logging_layer, _logging_guard) = LoggingLayerBuilder::new().build(&logging)?;
    tracing_subscriber::registry()
        .with(logging_layer)
        .with(Logging::env_filter(&logging)?)
        .init();

    info!(
        "Forge MCP Server v{} // (c) Forge contributors // Licensed under MIT",
        env!("CARGO_PKG_VERSION")
    );

    let tools = register_tools(load_definitions(&args.config_dir)?);
    if tools.is_empty() {
        warn!("No tools registered from {}", args.config_dir.display());
    }

    let http = reqwest::Client::builder()
        .build()
        .map_err(ServerError::HttpClient)?;
    let handler = ToolHandler::new(
        TokenProvider::from_settings(&settings, args.debug),
        GraphQLClient::new(http, settings.url.clone(), args.debug),
    );

    Server::builder()
        .transport(args.transport())
        .settings(settings)
        .tools(tools)
        .handler(handler)
        .build()
        .start()
        .await?;

    Ok(())
}
