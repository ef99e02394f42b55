use crate::utils::error::{Result, ServerError};
use url::Url;

pub const DEFAULT_WEBSHARE_ENDPOINTS: &[&str] = &[
    "rotating-residential.webshare.io:8001",
    "rotating-residential.webshare.io:8002",
    "rotating-residential.webshare.io:8003",
    "rotating-residential.webshare.io:8004",
    "rotating-residential.webshare.io:8005",
];
pub const DEFAULT_RETRIES_WHEN_BLOCKED: u32 = 50;

/// Webshare 輪換住宅代理設定
#[derive(Debug, Clone, PartialEq)]
pub struct WebshareProxy {
    username: String,
    password: String,
    endpoints: Vec<String>,
    retries_when_blocked: u32,
}

impl WebshareProxy {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        endpoints: Vec<String>,
        retries_when_blocked: u32,
    ) -> Self {
        let endpoints = if endpoints.is_empty() {
            DEFAULT_WEBSHARE_ENDPOINTS
                .iter()
                .map(|endpoint| endpoint.to_string())
                .collect()
        } else {
            endpoints
        };

        Self {
            username: username.into(),
            password: password.into(),
            endpoints,
            retries_when_blocked,
        }
    }

    pub fn retries_when_blocked(&self) -> u32 {
        self.retries_when_blocked
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// 第 attempt 次嘗試使用的代理 URL，端點依序輪替
    pub fn url_for_attempt(&self, attempt: u32) -> Result<Url> {
        let endpoint = &self.endpoints[attempt as usize % self.endpoints.len()];

        let mut url = Url::parse(&format!("http://{}/", endpoint)).map_err(|e| {
            ServerError::InvalidConfigValueError {
                field: "proxy.endpoints".to_string(),
                value: endpoint.clone(),
                reason: format!("Invalid proxy endpoint: {}", e),
            }
        })?;

        let credentials_error = || ServerError::ConfigError {
            message: format!("Proxy endpoint {} cannot carry credentials", endpoint),
        };
        url.set_username(&format!("{}-rotate", self.username))
            .map_err(|_| credentials_error())?;
        url.set_password(Some(&self.password))
            .map_err(|_| credentials_error())?;

        Ok(url)
    }
}
