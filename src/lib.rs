pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod mcp;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::{build_youtube_tools, DefaultTools};
pub use config::{ServerConfig, TomlConfig};
pub use core::{tools::YoutubeTools, transcript_service::TranscriptService};
pub use mcp::McpServer;
pub use utils::error::{Result, ServerError};
