use crate::domain::model::{ToolDefinition, ToolOutput, TranscriptSegment, VideoDetails, VideoId};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// 依 languages 的順序挑選字幕並下載
    async fn fetch_transcript(
        &self,
        video_id: &VideoId,
        languages: &[String],
    ) -> Result<Vec<TranscriptSegment>>;
}

#[async_trait]
pub trait VideoDetailsProvider: Send + Sync {
    async fn video_details(&self, video_id: &VideoId) -> Result<VideoDetails>;
}

#[async_trait]
pub trait ToolProvider: Send + Sync {
    fn list_tools(&self) -> Vec<ToolDefinition>;
    async fn call_tool(&self, name: &str, arguments: &serde_json::Value) -> ToolOutput;
}

pub trait ConfigProvider: Send + Sync {
    fn api_key(&self) -> &str;
    fn api_base(&self) -> &str;
    fn web_base(&self) -> &str;
    fn transcript_languages(&self) -> &[String];
    fn request_timeout(&self) -> Duration;
}
