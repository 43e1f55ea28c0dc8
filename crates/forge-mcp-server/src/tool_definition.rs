//! Tool definition documents
//!
//! Each YAML file in the configuration directory (other than the settings file) declares one
//! tool. Files are first parsed into a [`RawToolDefinition`], which accepts any input type tag,
//! and then validated into a [`ToolDefinition`].

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::Deserialize;

use crate::errors::ToolDefinitionError;

/// A tool definition as written in its YAML file
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RawToolDefinition {
    /// Name of the tool exposed to MCP clients
    pub name: String,

    /// Description of the tool exposed to MCP clients
    #[serde(default)]
    pub description: String,

    /// The GraphQL document sent upstream
    pub query: String,

    /// Tool arguments, each mapped to the GraphQL variable of the same name
    #[serde(default)]
    pub inputs: Vec<RawInputSpec>,

    /// Optional MCP tool annotations
    #[serde(default)]
    pub annotations: Option<Annotations>,

    /// Output format hint. Informational only: results are always returned raw.
    #[serde(default)]
    pub output: Option<String>,
}

/// A tool argument as written in its YAML file
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RawInputSpec {
    /// Argument name, also used as the GraphQL variable name
    pub name: String,

    /// Argument type: `string` or `number`
    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub required: bool,
}

/// Hints describing the behaviour of a tool
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Annotations {
    pub title: Option<String>,
    pub read_only_hint: Option<bool>,
    pub destructive_hint: Option<bool>,
    pub idempotent_hint: Option<bool>,
    pub open_world_hint: Option<bool>,
}

/// The supported argument types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    String,
    Number,
}

impl InputType {
    /// The JSON schema type keyword for this input type
    pub fn json_type(&self) -> &'static str {
        match self {
            InputType::String => "string",
            InputType::Number => "number",
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.json_type())
    }
}

impl FromStr for InputType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(InputType::String),
            "number" => Ok(InputType::Number),
            other => Err(other.to_string()),
        }
    }
}

/// A validated tool argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    pub name: String,
    pub input_type: InputType,
    pub description: String,
    pub required: bool,
}

/// A validated tool definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub query: String,
    pub inputs: Vec<InputSpec>,
    pub annotations: Option<Annotations>,
    pub output: Option<String>,
}

impl RawToolDefinition {
    /// Validate the definition.
    ///
    /// A single unsupported input type rejects the whole tool.
    pub fn into_definition(self) -> Result<ToolDefinition, ToolDefinitionError> {
        let inputs = self
            .inputs
            .into_iter()
            .map(|input| {
                let input_type = input.type_name.parse::<InputType>().map_err(|type_name| {
                    ToolDefinitionError::UnsupportedInputType {
                        tool: self.name.clone(),
                        type_name,
                    }
                })?;
                Ok(InputSpec {
                    name: input.name,
                    input_type,
                    description: input.description,
                    required: input.required,
                })
            })
            .collect::<Result<Vec<_>, ToolDefinitionError>>()?;

        Ok(ToolDefinition {
            name: self.name,
            description: self.description,
            query: self.query,
            inputs,
            annotations: self.annotations,
            output: self.output,
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const GET_USER: &str = r#"
name: getUser
description: Fetch a user by login
query: |
  query GetUser($login: String!, $first: Int) {
    user(login: $login) { id repositories(first: $first) { totalCount } }
  }
inputs:
  - name: login
    type: string
    description: The user login
    required: true
  - name: first
    type: number
    description: Number of repositories
annotations:
  title: Get user
  readOnlyHint: true
  openWorldHint: false
output: json
"#;

    #[test]
    fn parses_a_complete_definition() {
        let raw: RawToolDefinition = serde_yaml::from_str(GET_USER).unwrap();
        let definition = raw.into_definition().unwrap();

        assert_eq!(definition.name, "getUser");
        assert_eq!(definition.description, "Fetch a user by login");
        assert!(definition.query.starts_with("query GetUser"));
        assert_eq!(
            definition.inputs,
            vec![
                InputSpec {
                    name: "login".to_string(),
                    input_type: InputType::String,
                    description: "The user login".to_string(),
                    required: true,
                },
                InputSpec {
                    name: "first".to_string(),
                    input_type: InputType::Number,
                    description: "Number of repositories".to_string(),
                    required: false,
                },
            ]
        );
        assert_eq!(
            definition.annotations,
            Some(Annotations {
                title: Some("Get user".to_string()),
                read_only_hint: Some(true),
                destructive_hint: None,
                idempotent_hint: None,
                open_world_hint: Some(false),
            })
        );
        assert_eq!(definition.output.as_deref(), Some("json"));
    }

    #[test]
    fn inputs_and_annotations_are_optional() {
        let raw: RawToolDefinition =
            serde_yaml::from_str("name: viewer\nquery: '{ viewer { login } }'").unwrap();
        let definition = raw.into_definition().unwrap();

        assert!(definition.inputs.is_empty());
        assert!(definition.annotations.is_none());
        assert!(definition.description.is_empty());
    }

    #[rstest]
    #[case("boolean")]
    #[case("String")]
    #[case("int")]
    #[case("")]
    fn rejects_unsupported_input_types(#[case] type_name: &str) {
        let yaml = format!(
            "name: broken\nquery: '{{ a }}'\ninputs:\n  - name: ok\n    type: string\n  - name: flag\n    type: '{type_name}'\n"
        );
        let raw: RawToolDefinition = serde_yaml::from_str(&yaml).unwrap();

        match raw.into_definition() {
            Err(ToolDefinitionError::UnsupportedInputType { tool, type_name: found }) => {
                assert_eq!(tool, "broken");
                assert_eq!(found, type_name);
            }
            other => panic!("expected an unsupported type error, got {other:?}"),
        }
    }

    #[test]
    fn missing_query_is_a_parse_error() {
        let result: Result<RawToolDefinition, _> = serde_yaml::from_str("name: noquery");
        assert!(result.is_err());
    }
}
