use crate::domain::model::VideoId;
use crate::utils::error::{Result, ServerError};
use once_cell::sync::Lazy;
use regex::Regex;

static VIDEO_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)([a-zA-Z0-9_-]{11})",
        r"youtube\.com/.*[?&]v=([a-zA-Z0-9_-]{11})",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("video id pattern is valid"))
    .collect()
});

/// 從各種 YouTube 網址格式中取出影片 ID
pub fn extract_video_id(url: &str) -> Result<VideoId> {
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| VideoId::parse(m.as_str()))
        .unwrap_or_else(|| {
            Err(ServerError::InvalidVideoUrl {
                message: "No valid YouTube video ID found in URL".to_string(),
            })
        })
}
