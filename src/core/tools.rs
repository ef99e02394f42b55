use crate::core::transcript_service::TranscriptService;
use crate::domain::model::{ToolDefinition, ToolOutput};
use crate::domain::ports::{ToolProvider, TranscriptProvider, VideoDetailsProvider};
use async_trait::async_trait;
use serde_json::json;

pub const TRANSCRIPT_TOOL_NAME: &str = "get_youtube_video_transcript";

const TRANSCRIPT_TOOL_DESCRIPTION: &str = "Retrieve the transcript or video details for a given YouTube video. The 'start' time in the transcript is formatted as MM:SS or HH:MM:SS.";

/// 對 MCP 暴露的 YouTube 工具集
pub struct YoutubeTools<T: TranscriptProvider, D: VideoDetailsProvider> {
    service: TranscriptService<T, D>,
}

impl<T: TranscriptProvider, D: VideoDetailsProvider> YoutubeTools<T, D> {
    pub fn new(service: TranscriptService<T, D>) -> Self {
        Self { service }
    }

    async fn call_transcript_tool(&self, arguments: &serde_json::Value) -> ToolOutput {
        let url = match arguments.get("url").and_then(|v| v.as_str()) {
            Some(url) if !url.is_empty() => url,
            _ => return ToolOutput::error_text("Error: URL parameter is required"),
        };

        let outcome = self.service.get_video_transcript(url).await;

        match serde_json::to_string_pretty(&outcome) {
            Ok(text) if outcome.is_error() => ToolOutput::error_text(text),
            Ok(text) => ToolOutput::text(text),
            Err(e) => {
                tracing::error!("❌ Error executing tool {}: {}", TRANSCRIPT_TOOL_NAME, e);
                ToolOutput::error_text(format!("Error: {}", e))
            }
        }
    }
}

#[async_trait]
impl<T: TranscriptProvider, D: VideoDetailsProvider> ToolProvider for YoutubeTools<T, D> {
    fn list_tools(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: TRANSCRIPT_TOOL_NAME.to_string(),
            description: TRANSCRIPT_TOOL_DESCRIPTION.to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["url"],
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "The URL of the YouTube video to retrieve the transcript/subtitles for. (e.g. https://www.youtube.com/watch?v=dQw4w9WgXcQ)"
                    }
                }
            }),
        }]
    }

    async fn call_tool(&self, name: &str, arguments: &serde_json::Value) -> ToolOutput {
        match name {
            TRANSCRIPT_TOOL_NAME => self.call_transcript_tool(arguments).await,
            _ => {
                tracing::warn!("Unknown tool requested: {}", name);
                ToolOutput::error_text(format!("Unknown tool: {}", name))
            }
        }
    }
}
