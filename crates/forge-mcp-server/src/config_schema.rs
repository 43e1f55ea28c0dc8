//! Print the JSON schemas of the configuration files

use forge_mcp_server::settings::ServerSettings;
use forge_mcp_server::tool_definition::RawToolDefinition;
use schemars::generate::SchemaSettings;
use serde_json::json;

fn main() -> anyhow::Result<()> {
    let settings = SchemaSettings::draft07()
        .into_generator()
        .into_root_schema_for::<ServerSettings>();
    let tool = SchemaSettings::draft07()
        .into_generator()
        .into_root_schema_for::<RawToolDefinition>();

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "forge.yaml": settings,
            "tool": tool,
        }))?
    );
    Ok(())
}
