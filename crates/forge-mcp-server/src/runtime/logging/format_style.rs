use schemars::JsonSchema;
use serde::Deserialize;

/// Log output format style. Maps to a format from tracing-subscriber.
#[derive(Debug, Default, Deserialize, JsonSchema, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FormatStyle {
    /// Human-readable, single-line logs
    #[default]
    Full,
    /// Single-line logs optimized for short line lengths
    Compact,
    /// Newline-delimited JSON logs
    Json,
    /// Multi-line logs with source locations
    Pretty,
}
