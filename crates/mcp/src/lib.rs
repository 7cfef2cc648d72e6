// MCP (Model Context Protocol) server for the cq decoder
// Exposes cq as JSON-RPC 2.0 tools over HTTP (via cqgate-server) or stdio

pub mod protocol;
pub mod schema;
pub mod server;
pub mod tools;
pub mod transport;

pub use server::McpServer;
