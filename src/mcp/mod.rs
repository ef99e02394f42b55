//! Model Context Protocol：以 stdio 傳輸 JSON-RPC 2.0

pub mod protocol;
pub mod server;

pub use server::McpServer;
