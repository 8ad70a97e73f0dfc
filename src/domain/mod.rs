//! Domain objects parsing and resource/tool integrations
//!
//! Provides the request-shaping logic of the TFL adapter exposed over the
//! MCP protocol.

pub mod resources;
pub mod tools;
pub mod utils;
