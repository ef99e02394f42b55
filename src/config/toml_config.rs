use crate::config::{parse_languages, ServerConfig, DEFAULT_API_BASE, DEFAULT_REQUEST_TIMEOUT_SECONDS, DEFAULT_WEB_BASE};
use crate::adapters::proxy::{WebshareProxy, DEFAULT_RETRIES_WHEN_BLOCKED};
use crate::utils::error::{Result, ServerError};
use crate::utils::validation::{validate_required_field, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 設定檔格式；所有欄位皆可省略，CLI 與環境變數會以同樣結構覆寫
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub youtube: YoutubeSection,
    #[serde(default)]
    pub transcript: TranscriptSection,
    #[serde(default)]
    pub proxy: ProxySection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YoutubeSection {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub web_base: Option<String>,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSection {
    pub languages: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProxySection {
    pub username: Option<String>,
    pub password: Option<String>,
    pub endpoints: Option<Vec<String>>,
    pub retries_when_blocked: Option<u32>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ServerError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ServerError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${YOUTUBE_API_KEY})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        use once_cell::sync::Lazy;
        use regex::Regex;

        static ENV_VAR: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// 以 `higher` 中有值的欄位覆寫自己
    pub fn merge(self, higher: TomlConfig) -> TomlConfig {
        TomlConfig {
            youtube: YoutubeSection {
                api_key: higher.youtube.api_key.or(self.youtube.api_key),
                api_base: higher.youtube.api_base.or(self.youtube.api_base),
                web_base: higher.youtube.web_base.or(self.youtube.web_base),
                request_timeout_seconds: higher
                    .youtube
                    .request_timeout_seconds
                    .or(self.youtube.request_timeout_seconds),
            },
            transcript: TranscriptSection {
                languages: higher.transcript.languages.or(self.transcript.languages),
            },
            proxy: ProxySection {
                username: higher.proxy.username.or(self.proxy.username),
                password: higher.proxy.password.or(self.proxy.password),
                endpoints: higher.proxy.endpoints.or(self.proxy.endpoints),
                retries_when_blocked: higher
                    .proxy
                    .retries_when_blocked
                    .or(self.proxy.retries_when_blocked),
            },
        }
    }

    /// 套用預設值並驗證，產生最終的伺服器設定
    pub fn into_server_config(self) -> Result<ServerConfig> {
        let api_key = resolved(self.youtube.api_key);
        let api_key = validate_required_field("YOUTUBE_API_KEY", &api_key)?.clone();

        let transcript_languages = self
            .transcript
            .languages
            .map(|languages| parse_languages(&languages.join(",")))
            .filter(|languages| !languages.is_empty())
            .unwrap_or_else(|| vec!["en".to_string()]);

        let proxy = match (resolved(self.proxy.username), resolved(self.proxy.password)) {
            (Some(username), Some(password)) => Some(WebshareProxy::new(
                username,
                password,
                self.proxy.endpoints.unwrap_or_default(),
                self.proxy
                    .retries_when_blocked
                    .unwrap_or(DEFAULT_RETRIES_WHEN_BLOCKED),
            )),
            (None, None) => None,
            _ => {
                tracing::warn!(
                    "⚠️ Only one of WEBSHARE_PROXY_USERNAME / WEBSHARE_PROXY_PASSWORD is set, proxy disabled"
                );
                None
            }
        };

        let config = ServerConfig {
            api_key,
            api_base: resolved(self.youtube.api_base).unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            web_base: resolved(self.youtube.web_base).unwrap_or_else(|| DEFAULT_WEB_BASE.to_string()),
            transcript_languages,
            request_timeout_seconds: self
                .youtube
                .request_timeout_seconds
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS),
            proxy,
        };

        config.validate()?;
        Ok(config)
    }
}

/// 空字串或仍含 ${VAR} 佔位符的值視為未設定
fn resolved(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.contains("${"))
}
