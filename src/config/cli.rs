use crate::config::toml_config::{ProxySection, TomlConfig, TranscriptSection, YoutubeSection};
use crate::config::{parse_languages, ServerConfig};
use crate::utils::error::Result;
use crate::utils::logger::LogFormat;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "youtube-mcp-server")]
#[command(about = "MCP server for YouTube transcripts and video details over stdio")]
pub struct CliConfig {
    #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "YOUTUBE_API_BASE")]
    pub api_base: Option<String>,

    #[arg(long, env = "YOUTUBE_WEB_BASE")]
    pub web_base: Option<String>,

    #[arg(long, env = "TRANSCRIPT_LANGUAGE", help = "Comma-separated transcript languages in order of preference")]
    pub transcript_language: Option<String>,

    #[arg(long, env = "WEBSHARE_PROXY_USERNAME")]
    pub proxy_username: Option<String>,

    #[arg(long, env = "WEBSHARE_PROXY_PASSWORD", hide_env_values = true)]
    pub proxy_password: Option<String>,

    #[arg(long, env = "WEBSHARE_RETRIES_WHEN_BLOCKED")]
    pub retries_when_blocked: Option<u32>,

    #[arg(long, env = "REQUEST_TIMEOUT_SECONDS")]
    pub request_timeout_seconds: Option<u64>,

    #[arg(long, short = 'c', help = "Optional TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum, env = "LOG_FORMAT", default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

impl CliConfig {
    /// CLI 與環境變數的值，以設定檔相同的結構表示
    pub fn overrides(&self) -> TomlConfig {
        TomlConfig {
            youtube: YoutubeSection {
                api_key: self.api_key.clone(),
                api_base: self.api_base.clone(),
                web_base: self.web_base.clone(),
                request_timeout_seconds: self.request_timeout_seconds,
            },
            transcript: TranscriptSection {
                languages: self.transcript_language.as_deref().map(parse_languages),
            },
            proxy: ProxySection {
                username: self.proxy_username.clone(),
                password: self.proxy_password.clone(),
                endpoints: None,
                retries_when_blocked: self.retries_when_blocked,
            },
        }
    }

    /// 設定檔 < 環境變數 / CLI
    pub fn resolve(&self) -> Result<ServerConfig> {
        let file = match &self.config {
            Some(path) => {
                tracing::debug!("Loading configuration file: {}", path.display());
                TomlConfig::from_file(path)?
            }
            None => TomlConfig::default(),
        };

        file.merge(self.overrides()).into_server_config()
    }
}
