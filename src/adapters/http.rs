use crate::utils::error::Result;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, CONNECTION};
use reqwest::{Client, Proxy};
use std::time::Duration;
use url::Url;

pub const USER_AGENT: &str = concat!("youtube-mcp-server/", env!("CARGO_PKG_VERSION"));

/// 建立 HTTP client；走代理時關閉 keep-alive，讓輪換代理每次都換 IP
pub fn build_client(timeout: Duration, proxy_url: Option<&Url>) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US"));

    let mut builder = Client::builder().timeout(timeout).user_agent(USER_AGENT);

    if let Some(proxy_url) = proxy_url {
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
        builder = builder.proxy(Proxy::all(proxy_url.as_str())?);
    }

    Ok(builder.default_headers(headers).build()?)
}
