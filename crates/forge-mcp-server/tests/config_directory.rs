use std::fs;
use std::ops::Deref;

use forge_mcp_server::context::InvocationContext;
use forge_mcp_server::graphql::GraphQLClient;
use forge_mcp_server::server::Running;
use forge_mcp_server::settings::{SETTINGS_FILE_NAME, read_settings};
use forge_mcp_server::token::TokenProvider;
use forge_mcp_server::tool_directory::load_definitions;
use forge_mcp_server::tools::{ToolHandler, register_tools};
use mockito::Matcher;
use rmcp::model::{CallToolResult, RawContent};
use serde_json::json;
use tempfile::TempDir;

const SEARCH_REPOS: &str = r#"
name: searchRepos
description: Search repositories by keyword
query: |
  query($q: String!, $first: Int) {
    search(query: $q, type: REPOSITORY, first: $first) { repositoryCount }
  }
inputs:
  - name: q
    type: string
    description: Search terms
    required: true
  - name: first
    type: number
    description: Number of results
annotations:
  readOnlyHint: true
"#;

const BROKEN: &str = r#"
name: broken
query: "{ viewer { login } }"
inputs:
  - name: flag
    type: boolean
"#;

fn text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|c| match c.deref() {
            RawContent::Text(text) => Some(text.text.clone()),
            _ => None,
        })
        .collect()
}

fn running(dir: &TempDir, url: &str, token_command: Option<&str>) -> Running {
    let mut settings = format!("name: github\nversion: 2.0.0\nurl: {url}\n");
    if let Some(command) = token_command {
        settings.push_str(&format!("token_command: \"{command}\"\n"));
    }
    fs::write(dir.path().join(SETTINGS_FILE_NAME), settings).unwrap();
    fs::write(dir.path().join("search_repos.yaml"), SEARCH_REPOS).unwrap();
    fs::write(dir.path().join("broken.yaml"), BROKEN).unwrap();

    let settings = read_settings(dir.path()).unwrap();
    let tools = register_tools(load_definitions(dir.path()).unwrap());
    let handler = ToolHandler::new(
        TokenProvider::from_settings(&settings, false),
        GraphQLClient::new(reqwest::Client::new(), settings.url.clone(), false),
    );
    Running::new(settings.name, settings.version, tools, handler)
}

#[tokio::test]
async fn serves_tools_declared_in_the_config_directory() {
    let mut server = mockito::Server::new_async().await;
    let body = r#"{"data":{"search":{"repositoryCount":42}}}"#;
    let mock = server
        .mock("POST", "/graphql")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "variables": { "q": "rust", "first": 5 }
        })))
        .with_body(body)
        .expect(1)
        .create_async()
        .await;
    let dir = TempDir::new().unwrap();
    let running = running(&dir, &format!("{}/graphql", server.url()), None);

    assert_eq!(running.tool_count(), 1);

    let arguments = json!({ "q": "rust", "first": 5 });
    let result = running
        .call_tool_impl(
            "searchRepos",
            InvocationContext::new(arguments.as_object().cloned()),
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_ne!(result.is_error, Some(true));
    assert_eq!(text(&result), body);
}

#[tokio::test]
async fn tools_with_unsupported_inputs_are_not_callable() {
    let dir = TempDir::new().unwrap();
    let running = running(&dir, "http://127.0.0.1:1/graphql", None);

    let error = running
        .call_tool_impl("broken", InvocationContext::default())
        .await
        .unwrap_err();

    assert_eq!(error.message, "Tool broken not found");
}

#[cfg(unix)]
#[tokio::test]
async fn token_command_supplies_the_bearer_credential() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/graphql")
        .match_header("authorization", "Bearer from-command")
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;
    let dir = TempDir::new().unwrap();
    let running = running(
        &dir,
        &format!("{}/graphql", server.url()),
        Some("echo from-command"),
    );

    let arguments = json!({ "q": "rust" });
    let result = running
        .call_tool_impl(
            "searchRepos",
            InvocationContext::new(arguments.as_object().cloned()),
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_ne!(result.is_error, Some(true));
}
