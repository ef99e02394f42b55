//! 透過 YouTube innertube player API 取得字幕
//!
//! 流程：
//! 1. 下載觀看頁面，必要時處理 consent 頁並取得 `INNERTUBE_API_KEY`
//! 2. 以 ANDROID client 呼叫 `/youtubei/v1/player` 取得字幕軌清單
//! 3. 依語言偏好挑選字幕軌（人工字幕優先於自動字幕）
//! 4. 下載 timedtext XML 並解析

use crate::adapters::http::build_client;
use crate::adapters::proxy::WebshareProxy;
use crate::adapters::timedtext::parse_timedtext;
use crate::domain::model::{TranscriptSegment, VideoId};
use crate::domain::ports::{ConfigProvider, TranscriptProvider};
use crate::utils::error::{Result, ServerError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::COOKIE;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;

const CONSENT_FORM_MARKER: &str = "action=\"https://consent.youtube.com/s\"";
const RECAPTCHA_MARKER: &str = "class=\"g-recaptcha\"";
const PO_TOKEN_MARKER: &str = "&exp=xpe";

const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

const REASON_BOT_DETECTED: &str = "Sign in to confirm you\u{2019}re not a bot";
const REASON_AGE_RESTRICTED: &str = "This video may be inappropriate for some users.";
const REASON_VIDEO_UNAVAILABLE: &str = "This video is unavailable";

static CONSENT_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"name="v" value="(.*?)""#).expect("consent pattern is valid"));

static INNERTUBE_API_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("api key pattern is valid")
});

/// 單一字幕軌
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub url: String,
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
}

/// 影片可用的字幕軌，分為人工與自動產生兩類
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptList {
    pub manually_created: Vec<CaptionTrack>,
    pub generated: Vec<CaptionTrack>,
}

impl TranscriptList {
    pub fn from_innertube(data: &Value, video_id: &VideoId) -> Result<Self> {
        let tracks = data
            .get("captions")
            .and_then(|c| c.get("playerCaptionsTracklistRenderer"))
            .and_then(|r| r.get("captionTracks"))
            .and_then(Value::as_array)
            .filter(|tracks| !tracks.is_empty())
            .ok_or_else(|| ServerError::TranscriptsDisabled {
                video_id: video_id.to_string(),
            })?;

        let mut list = TranscriptList::default();
        for track in tracks {
            let Some(base_url) = track.get("baseUrl").and_then(Value::as_str) else {
                tracing::debug!("Skipping caption track without baseUrl for {}", video_id);
                continue;
            };

            let caption = CaptionTrack {
                url: base_url.replace("&fmt=srv3", ""),
                language: track_name(track),
                language_code: track
                    .get("languageCode")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                is_generated: track.get("kind").and_then(Value::as_str) == Some("asr"),
            };

            if caption.is_generated {
                list.generated.push(caption);
            } else {
                list.manually_created.push(caption);
            }
        }

        Ok(list)
    }

    /// 依語言順序尋找字幕；同一語言人工字幕優先
    pub fn find(&self, languages: &[String]) -> Option<&CaptionTrack> {
        languages.iter().find_map(|code| {
            self.manually_created
                .iter()
                .chain(self.generated.iter())
                .find(|track| &track.language_code == code)
        })
    }
}

fn track_name(track: &Value) -> String {
    let name = track.get("name");
    name.and_then(|n| n.get("runs"))
        .and_then(|runs| runs.get(0))
        .and_then(|run| run.get("text"))
        .or_else(|| name.and_then(|n| n.get("simpleText")))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub struct YoutubeTranscriptFetcher {
    web_base: String,
    timeout: Duration,
    direct_client: Client,
    proxy: Option<WebshareProxy>,
}

impl YoutubeTranscriptFetcher {
    pub fn new<C: ConfigProvider>(config: &C, proxy: Option<WebshareProxy>) -> Result<Self> {
        let timeout = config.request_timeout();

        Ok(Self {
            web_base: config.web_base().trim_end_matches('/').to_string(),
            timeout,
            direct_client: build_client(timeout, None)?,
            proxy,
        })
    }

    fn max_attempts(&self) -> u32 {
        self.proxy
            .as_ref()
            .map(|p| p.retries_when_blocked().saturating_add(1))
            .unwrap_or(1)
    }

    /// 代理模式下每次嘗試都建立新連線，確保輪換 IP
    fn client_for_attempt(&self, attempt: u32) -> Result<Client> {
        match &self.proxy {
            Some(proxy) => build_client(self.timeout, Some(&proxy.url_for_attempt(attempt)?)),
            None => Ok(self.direct_client.clone()),
        }
    }

    async fn fetch_once(
        &self,
        client: &Client,
        video_id: &VideoId,
        languages: &[String],
    ) -> Result<Vec<TranscriptSegment>> {
        let html = self.fetch_video_html(client, video_id).await?;
        let api_key = extract_innertube_api_key(&html, video_id)?;
        let data = self.fetch_innertube_data(client, video_id, &api_key).await?;

        assert_playability(&data, video_id)?;

        let list = TranscriptList::from_innertube(&data, video_id)?;
        let track = list
            .find(languages)
            .ok_or_else(|| ServerError::NoTranscriptFound {
                video_id: video_id.to_string(),
                languages: languages.to_vec(),
            })?;

        tracing::debug!(
            "Selected {} transcript '{}' ({}) for {}",
            if track.is_generated { "generated" } else { "manual" },
            track.language,
            track.language_code,
            video_id
        );

        self.fetch_track(client, track, video_id).await
    }

    async fn fetch_video_html(&self, client: &Client, video_id: &VideoId) -> Result<String> {
        let html = self.fetch_html(client, video_id, None).await?;
        if !html.contains(CONSENT_FORM_MARKER) {
            return Ok(html);
        }

        tracing::debug!("Consent page returned for {}, retrying with consent cookie", video_id);
        let consent = CONSENT_VALUE
            .captures(&html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ServerError::FailedToCreateConsentCookie {
                video_id: video_id.to_string(),
            })?;

        let html = self.fetch_html(client, video_id, Some(&consent)).await?;
        if html.contains(CONSENT_FORM_MARKER) {
            return Err(ServerError::FailedToCreateConsentCookie {
                video_id: video_id.to_string(),
            });
        }

        Ok(html)
    }

    async fn fetch_html(
        &self,
        client: &Client,
        video_id: &VideoId,
        consent: Option<&str>,
    ) -> Result<String> {
        let mut request = client
            .get(format!("{}/watch", self.web_base))
            .query(&[("v", video_id.as_str())]);

        if let Some(value) = consent {
            request = request.header(COOKIE, format!("CONSENT=YES+{}", value));
        }

        let response = check_status(request.send().await?, video_id)?;
        Ok(response.text().await?)
    }

    async fn fetch_innertube_data(
        &self,
        client: &Client,
        video_id: &VideoId,
        api_key: &str,
    ) -> Result<Value> {
        let body = json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": video_id.as_str(),
        });

        let response = client
            .post(format!("{}/youtubei/v1/player", self.web_base))
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        Ok(check_status(response, video_id)?.json().await?)
    }

    async fn fetch_track(
        &self,
        client: &Client,
        track: &CaptionTrack,
        video_id: &VideoId,
    ) -> Result<Vec<TranscriptSegment>> {
        if track.url.contains(PO_TOKEN_MARKER) {
            return Err(ServerError::PoTokenRequired {
                video_id: video_id.to_string(),
            });
        }

        let response = check_status(client.get(&track.url).send().await?, video_id)?;
        let xml = response.text().await?;
        parse_timedtext(&xml, video_id)
    }
}

#[async_trait]
impl TranscriptProvider for YoutubeTranscriptFetcher {
    async fn fetch_transcript(
        &self,
        video_id: &VideoId,
        languages: &[String],
    ) -> Result<Vec<TranscriptSegment>> {
        retry_when_blocked(self.max_attempts(), |attempt| async move {
            let client = self.client_for_attempt(attempt)?;
            self.fetch_once(&client, video_id, languages).await
        })
        .await
    }
}

/// 被封鎖時重新嘗試，最多 `max_attempts` 次；其他錯誤直接回傳
async fn retry_when_blocked<T, F, Fut>(max_attempts: u32, mut attempt_fn: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        match attempt_fn(attempt).await {
            Err(e) if e.is_blocked() && attempt + 1 < max_attempts => {
                attempt += 1;
                tracing::warn!(
                    "🔁 {} (attempt {}/{}), retrying through a new proxy IP",
                    e,
                    attempt,
                    max_attempts
                );
            }
            result => return result,
        }
    }
}

fn check_status(response: Response, video_id: &VideoId) -> Result<Response> {
    if response.status() == StatusCode::TOO_MANY_REQUESTS {
        return Err(ServerError::IpBlocked {
            video_id: video_id.to_string(),
        });
    }
    Ok(response.error_for_status()?)
}

fn extract_innertube_api_key(html: &str, video_id: &VideoId) -> Result<String> {
    if let Some(key) = INNERTUBE_API_KEY
        .captures(html)
        .and_then(|caps| caps.get(1))
    {
        return Ok(key.as_str().to_string());
    }

    if html.contains(RECAPTCHA_MARKER) {
        return Err(ServerError::IpBlocked {
            video_id: video_id.to_string(),
        });
    }

    Err(ServerError::YoutubeDataUnparsable {
        video_id: video_id.to_string(),
        message: "INNERTUBE_API_KEY not found in watch page".to_string(),
    })
}

fn assert_playability(data: &Value, video_id: &VideoId) -> Result<()> {
    let Some(status_data) = data.get("playabilityStatus") else {
        return Ok(());
    };

    let status = status_data.get("status").and_then(Value::as_str);
    let reason = status_data
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or_default();

    match status {
        None | Some("OK") => Ok(()),
        Some("LOGIN_REQUIRED") if reason == REASON_BOT_DETECTED => Err(ServerError::RequestBlocked {
            video_id: video_id.to_string(),
        }),
        Some("LOGIN_REQUIRED") if reason == REASON_AGE_RESTRICTED => {
            Err(ServerError::AgeRestricted {
                video_id: video_id.to_string(),
            })
        }
        Some("ERROR") if reason == REASON_VIDEO_UNAVAILABLE => Err(ServerError::VideoUnavailable {
            video_id: video_id.to_string(),
        }),
        Some(other) => Err(ServerError::VideoUnplayable {
            video_id: video_id.to_string(),
            reason: if reason.is_empty() {
                other.to_string()
            } else {
                reason.to_string()
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn video_id() -> VideoId {
        VideoId::parse("dQw4w9WgXcQ").unwrap()
    }

    fn track(code: &str, kind: Option<&str>) -> Value {
        let mut track = json!({
            "baseUrl": format!("https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang={}&fmt=srv3", code),
            "name": {"runs": [{"text": code.to_uppercase()}]},
            "languageCode": code,
        });
        if let Some(kind) = kind {
            track["kind"] = json!(kind);
        }
        track
    }

    fn innertube(tracks: Vec<Value>) -> Value {
        json!({
            "playabilityStatus": {"status": "OK"},
            "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": tracks}}
        })
    }

    #[test]
    fn test_transcript_list_splits_manual_and_generated() {
        let data = innertube(vec![track("en", Some("asr")), track("de", None)]);
        let list = TranscriptList::from_innertube(&data, &video_id()).unwrap();

        assert_eq!(list.manually_created.len(), 1);
        assert_eq!(list.generated.len(), 1);
        assert_eq!(list.manually_created[0].language, "DE");
        assert!(!list.manually_created[0].url.contains("fmt=srv3"));
    }

    #[test]
    fn test_language_order_wins_over_track_kind() {
        let data = innertube(vec![track("en", None), track("de", Some("asr"))]);
        let list = TranscriptList::from_innertube(&data, &video_id()).unwrap();

        let languages = vec!["de".to_string(), "en".to_string()];
        let found = list.find(&languages).unwrap();
        assert_eq!(found.language_code, "de");
        assert!(found.is_generated);
    }

    #[test]
    fn test_manual_preferred_within_language() {
        let data = innertube(vec![track("en", Some("asr")), track("en", None)]);
        let list = TranscriptList::from_innertube(&data, &video_id()).unwrap();

        let found = list.find(&["en".to_string()]).unwrap();
        assert!(!found.is_generated);
        assert!(list.find(&["fr".to_string()]).is_none());
    }

    #[test]
    fn test_missing_captions_means_disabled() {
        let data = json!({"playabilityStatus": {"status": "OK"}});
        assert!(matches!(
            TranscriptList::from_innertube(&data, &video_id()),
            Err(ServerError::TranscriptsDisabled { .. })
        ));

        let empty = innertube(vec![]);
        assert!(matches!(
            TranscriptList::from_innertube(&empty, &video_id()),
            Err(ServerError::TranscriptsDisabled { .. })
        ));
    }

    #[test]
    fn test_playability_errors() {
        let status = |status: &str, reason: &str| {
            json!({"playabilityStatus": {"status": status, "reason": reason}})
        };

        assert!(assert_playability(&status("OK", ""), &video_id()).is_ok());
        assert!(matches!(
            assert_playability(&status("LOGIN_REQUIRED", REASON_BOT_DETECTED), &video_id()),
            Err(ServerError::RequestBlocked { .. })
        ));
        assert!(matches!(
            assert_playability(&status("LOGIN_REQUIRED", REASON_AGE_RESTRICTED), &video_id()),
            Err(ServerError::AgeRestricted { .. })
        ));
        assert!(matches!(
            assert_playability(&status("ERROR", REASON_VIDEO_UNAVAILABLE), &video_id()),
            Err(ServerError::VideoUnavailable { .. })
        ));
        match assert_playability(&status("UNPLAYABLE", "Private video"), &video_id()) {
            Err(ServerError::VideoUnplayable { reason, .. }) => assert_eq!(reason, "Private video"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_extract_api_key() {
        let html = r#"<script>ytcfg.set({"INNERTUBE_API_KEY": "AIzaSyA-test_key"})</script>"#;
        assert_eq!(
            extract_innertube_api_key(html, &video_id()).unwrap(),
            "AIzaSyA-test_key"
        );

        let captcha = r#"<div class="g-recaptcha"></div>"#;
        assert!(matches!(
            extract_innertube_api_key(captcha, &video_id()),
            Err(ServerError::IpBlocked { .. })
        ));

        assert!(matches!(
            extract_innertube_api_key("<html></html>", &video_id()),
            Err(ServerError::YoutubeDataUnparsable { .. })
        ));
    }

    struct StaticConfig;

    impl ConfigProvider for StaticConfig {
        fn api_key(&self) -> &str {
            "key"
        }

        fn api_base(&self) -> &str {
            "https://www.googleapis.com/youtube/v3"
        }

        fn web_base(&self) -> &str {
            "https://www.youtube.com/"
        }

        fn transcript_languages(&self) -> &[String] {
            &[]
        }

        fn request_timeout(&self) -> Duration {
            Duration::from_secs(5)
        }
    }

    #[test]
    fn test_attempts_depend_on_proxy() {
        let direct = YoutubeTranscriptFetcher::new(&StaticConfig, None).unwrap();
        assert_eq!(direct.max_attempts(), 1);
        assert_eq!(direct.web_base, "https://www.youtube.com");

        let proxy = WebshareProxy::new("user", "pass", vec![], 50);
        let proxied = YoutubeTranscriptFetcher::new(&StaticConfig, Some(proxy)).unwrap();
        assert_eq!(proxied.max_attempts(), 51);
        assert!(proxied.client_for_attempt(7).is_ok());
    }

    fn blocked() -> ServerError {
        ServerError::IpBlocked {
            video_id: "dQw4w9WgXcQ".to_string(),
        }
    }

    #[tokio::test]
    async fn test_blocked_attempts_are_retried_until_success() {
        let calls = AtomicU32::new(0);

        let result = retry_when_blocked(5, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(blocked())
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_stops_after_max_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = retry_when_blocked(4, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ServerError::RequestBlocked {
                    video_id: "dQw4w9WgXcQ".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(ServerError::RequestBlocked { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = retry_when_blocked(51, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ServerError::TranscriptsDisabled {
                    video_id: "dQw4w9WgXcQ".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(ServerError::TranscriptsDisabled { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_attempt_without_proxy() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = retry_when_blocked(1, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(blocked()) }
        })
        .await;

        assert!(result.unwrap_err().is_blocked());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
