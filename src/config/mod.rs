#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::TomlConfig;

use crate::adapters::proxy::WebshareProxy;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{Result, ServerError};
use crate::utils::validation::{
    validate_host_port, validate_non_empty_string, validate_range, validate_url, Validate,
};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_WEB_BASE: &str = "https://www.youtube.com";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// 最終生效的伺服器設定
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub api_key: String,
    pub api_base: String,
    pub web_base: String,
    pub transcript_languages: Vec<String>,
    pub request_timeout_seconds: u64,
    pub proxy: Option<WebshareProxy>,
}

impl ServerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            web_base: DEFAULT_WEB_BASE.to_string(),
            transcript_languages: vec!["en".to_string()],
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            proxy: None,
        }
    }
}

/// 解析逗號分隔的語言清單，去除空白與空項目
pub fn parse_languages(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(String::from)
        .collect()
}

impl ConfigProvider for ServerConfig {
    fn api_key(&self) -> &str {
        &self.api_key
    }

    fn api_base(&self) -> &str {
        &self.api_base
    }

    fn web_base(&self) -> &str {
        &self.web_base
    }

    fn transcript_languages(&self) -> &[String] {
        &self.transcript_languages
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("YOUTUBE_API_KEY", &self.api_key)?;
        validate_url("YOUTUBE_API_BASE", &self.api_base)?;
        validate_url("YOUTUBE_WEB_BASE", &self.web_base)?;
        validate_range("REQUEST_TIMEOUT_SECONDS", self.request_timeout_seconds, 1, 600)?;

        if self.transcript_languages.is_empty() {
            return Err(ServerError::ConfigValidationError {
                field: "TRANSCRIPT_LANGUAGE".to_string(),
                message: "At least one transcript language is required".to_string(),
            });
        }

        if let Some(proxy) = &self.proxy {
            for endpoint in proxy.endpoints() {
                validate_host_port("proxy.endpoints", endpoint)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_languages() {
        assert_eq!(parse_languages("en"), vec!["en"]);
        assert_eq!(parse_languages(" de , en,,fr "), vec!["de", "en", "fr"]);
        assert!(parse_languages(" , ").is_empty());
    }

    #[test]
    fn test_validate_server_config() {
        assert!(ServerConfig::new("key").validate().is_ok());

        let mut config = ServerConfig::new("key");
        config.transcript_languages.clear();
        assert!(config.validate().is_err());

        let mut config = ServerConfig::new("key");
        config.api_base = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = ServerConfig::new("key");
        config.request_timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::new("key");
        config.proxy = Some(WebshareProxy::new("u", "p", vec!["bad-endpoint".to_string()], 1));
        assert!(config.validate().is_err());
    }
}
