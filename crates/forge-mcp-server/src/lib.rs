#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod context;
pub mod credential;
pub mod errors;
pub mod graphql;
pub mod runtime;
pub mod server;
pub mod settings;
pub mod token;
pub mod tool_definition;
pub mod tool_directory;
pub mod tools;
