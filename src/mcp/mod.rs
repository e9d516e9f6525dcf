//! MCP (Model Context Protocol) server
//!
//! Exposes the FAQ search, intent classification and catalog formatting to
//! MCP clients over JSON-RPC 2.0 on stdio.


pub mod protocol;
pub mod server;
pub mod tools;

pub use server::{ConnectionState, McpServer, ToolHandler};
pub use tools::register_tools;

pub const SERVER_NAME: &str = "coach-faq";
pub const SERVER_INSTRUCTIONS: &str = "Coaching FAQ search and product catalog. \
Call build_context with the user's message to get relevant FAQs and product suggestions.";
