use crate::utils::error::{Result, ServerError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 經驗證的 11 字元 YouTube 影片 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub const LENGTH: usize = 11;

    pub fn parse(raw: &str) -> Result<Self> {
        let valid = raw.len() == Self::LENGTH
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');

        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(ServerError::InvalidVideoUrl {
                message: format!("'{}' is not a valid YouTube video ID", raw),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 字幕片段，時間單位為秒
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// 輸出用的字幕片段，start 已格式化為 MM:SS 或 HH:MM:SS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedSegment {
    pub text: String,
    pub start: String,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDetails {
    pub title: String,
    pub description: String,
    pub channel_title: String,
    pub published_at: String,
    pub duration: String,
    pub view_count: String,
    pub like_count: String,
    pub comment_count: String,
}

impl Default for VideoDetails {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            channel_title: String::new(),
            published_at: String::new(),
            duration: String::new(),
            view_count: "0".to_string(),
            like_count: "0".to_string(),
            comment_count: "0".to_string(),
        }
    }
}

/// get_youtube_video_transcript 工具的結果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TranscriptOutcome {
    Transcript {
        video_id: VideoId,
        transcript: Vec<FormattedSegment>,
    },
    Details {
        video_id: VideoId,
        video_details: VideoDetails,
    },
    Error {
        error: String,
    },
}

impl TranscriptOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, TranscriptOutcome::Error { .. })
    }
}

/// MCP 工具描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

/// tools/call 的回應內容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutput {
    pub content: Vec<Content>,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn error_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: true,
        }
    }
}
