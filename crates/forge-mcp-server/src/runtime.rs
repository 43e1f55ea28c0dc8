//! Process-level setup shared by the binaries

pub mod logging;
