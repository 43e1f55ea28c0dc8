//! Tool registration and dispatch
//!
//! Turns validated [`ToolDefinition`]s into MCP tools and runs a call through the token
//! provider and the GraphQL client.

use std::collections::HashSet;
use std::sync::Arc;

use rmcp::model::{CallToolResult, Content, JsonObject, Meta, Tool, ToolAnnotations};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::context::InvocationContext;
use crate::graphql::GraphQLClient;
use crate::token::TokenProvider;
use crate::tool_definition::{Annotations, InputSpec, ToolDefinition};
use crate::tool_directory::LoadedDefinition;

/// An MCP tool backed by a GraphQL query
#[derive(Debug, Clone)]
pub struct ForgeTool {
    pub tool: Tool,
    pub definition: Arc<ToolDefinition>,
}

impl ForgeTool {
    pub fn new(definition: ToolDefinition) -> Self {
        let mut tool = Tool::new(
            definition.name.clone(),
            definition.description.clone(),
            input_schema(&definition.inputs),
        );
        tool.annotations = definition.annotations.as_ref().map(tool_annotations);
        if let Some(output) = &definition.output {
            let mut meta = Meta::new();
            meta.insert("forge/output".to_string(), output.clone().into());
            tool.meta = Some(meta);
        }

        Self {
            tool,
            definition: Arc::new(definition),
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }
}

fn input_schema(inputs: &[InputSpec]) -> JsonObject {
    let properties: JsonObject = inputs
        .iter()
        .map(|input| {
            (
                input.name.clone(),
                json!({
                    "type": input.input_type.json_type(),
                    "description": input.description,
                }),
            )
        })
        .collect();
    let required: Vec<Value> = inputs
        .iter()
        .filter(|input| input.required)
        .map(|input| Value::String(input.name.clone()))
        .collect();

    let mut schema = JsonObject::new();
    schema.insert("type".to_string(), "object".into());
    schema.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".to_string(), Value::Array(required));
    }
    schema
}

fn tool_annotations(annotations: &Annotations) -> ToolAnnotations {
    let mut tool_annotations = ToolAnnotations::default();
    tool_annotations.title = annotations.title.clone();
    tool_annotations.read_only_hint = annotations.read_only_hint;
    tool_annotations.destructive_hint = annotations.destructive_hint;
    tool_annotations.idempotent_hint = annotations.idempotent_hint;
    tool_annotations.open_world_hint = annotations.open_world_hint;
    tool_annotations
}

/// Validate loaded definitions and build their tools.
///
/// A definition with an unsupported input type is skipped entirely. When two definitions share
/// a name the first one is kept.
pub fn register_tools(definitions: Vec<LoadedDefinition>) -> Vec<ForgeTool> {
    let mut names = HashSet::new();
    let mut tools = Vec::new();

    for LoadedDefinition { path, definition } in definitions {
        let definition = match definition.into_definition() {
            Ok(definition) => definition,
            Err(error) => {
                warn!("Skipping {}: {}", path.display(), error);
                continue;
            }
        };
        if !names.insert(definition.name.clone()) {
            warn!(
                "Skipping {}: a tool named {} is already registered",
                path.display(),
                definition.name
            );
            continue;
        }
        debug!(tool = %definition.name, path = %path.display(), "Registered tool");
        tools.push(ForgeTool::new(definition));
    }

    tools
}

/// Map the caller's arguments onto the declared inputs.
///
/// Returns the name of the first required input that is missing. Optional inputs the caller
/// left out are bound to `null`.
pub fn bind_variables(inputs: &[InputSpec], arguments: &JsonObject) -> Result<JsonObject, String> {
    inputs
        .iter()
        .map(|input| match arguments.get(&input.name) {
            Some(value) => Ok((input.name.clone(), value.clone())),
            None if input.required => Err(input.name.clone()),
            None => Ok((input.name.clone(), Value::Null)),
        })
        .collect()
}

/// Runs tool calls
#[derive(Debug, Clone)]
pub struct ToolHandler {
    tokens: TokenProvider,
    graphql: GraphQLClient,
}

impl ToolHandler {
    pub fn new(tokens: TokenProvider, graphql: GraphQLClient) -> Self {
        Self { tokens, graphql }
    }

    /// Run one call. Every failure is reported as an error result scoped to this call.
    #[tracing::instrument(skip_all, fields(tool = %definition.name))]
    pub async fn call(
        &self,
        definition: &ToolDefinition,
        context: InvocationContext,
    ) -> CallToolResult {
        let variables = match bind_variables(&definition.inputs, &context.arguments) {
            Ok(variables) => variables,
            Err(missing) => {
                return error_result(format!("missing required argument: {missing}"));
            }
        };

        let credential = match self.tokens.resolve(&context).await {
            Ok(credential) => credential,
            Err(error) => {
                warn!("Could not acquire token: {}", error);
                return error_result(error.to_string());
            }
        };

        match self
            .graphql
            .execute(&definition.query, &variables, credential.as_ref())
            .await
        {
            Ok(body) => {
                CallToolResult::success(vec![Content::text(String::from_utf8_lossy(&body))])
            }
            Err(error) => {
                warn!("GraphQL execution failed: {}", error);
                error_result(format!("GraphQL execution failed: {error}"))
            }
        }
    }
}

fn error_result(message: String) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message)])
}
