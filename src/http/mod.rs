//! HTTP transport layer for the Model Context Protocol
//!
//! Provides the external API routing, including the base `/mcp` listener and
//! metadata endpoints.

pub mod handlers;
