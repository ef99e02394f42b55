use crate::core::time_format::format_time;
use crate::core::video_id::extract_video_id;
use crate::domain::model::{FormattedSegment, TranscriptOutcome, TranscriptSegment};
use crate::domain::ports::{TranscriptProvider, VideoDetailsProvider};

/// 取得字幕，失敗時退回影片資訊
pub struct TranscriptService<T: TranscriptProvider, D: VideoDetailsProvider> {
    transcripts: T,
    details: D,
    languages: Vec<String>,
}

impl<T: TranscriptProvider, D: VideoDetailsProvider> TranscriptService<T, D> {
    pub fn new(transcripts: T, details: D, languages: Vec<String>) -> Self {
        Self {
            transcripts,
            details,
            languages,
        }
    }

    pub async fn get_video_transcript(&self, url: &str) -> TranscriptOutcome {
        let video_id = match extract_video_id(url) {
            Ok(id) => id,
            Err(e) => {
                tracing::error!("❌ Invalid YouTube URL: {}", e);
                return TranscriptOutcome::Error {
                    error: format!("Invalid YouTube URL: {}", e),
                };
            }
        };

        tracing::info!("Executing tool: get_video_transcript with video_id: {}", video_id);

        match self
            .transcripts
            .fetch_transcript(&video_id, &self.languages)
            .await
        {
            Ok(segments) => {
                tracing::debug!("Fetched {} transcript segments for {}", segments.len(), video_id);
                TranscriptOutcome::Transcript {
                    video_id,
                    transcript: format_segments(segments),
                }
            }
            Err(transcript_error) => {
                tracing::warn!(
                    "⚠️ Error fetching transcript: {}. Falling back to video details.",
                    transcript_error
                );

                match self.details.video_details(&video_id).await {
                    Ok(video_details) => TranscriptOutcome::Details {
                        video_id,
                        video_details,
                    },
                    Err(e) => {
                        tracing::error!("❌ Error processing video URL {}: {}", url, e);
                        TranscriptOutcome::Error {
                            error: format!("Failed to process request: {}", e),
                        }
                    }
                }
            }
        }
    }
}

fn format_segments(segments: Vec<TranscriptSegment>) -> Vec<FormattedSegment> {
    segments
        .into_iter()
        .map(|segment| FormattedSegment {
            start: format_time(segment.start),
            text: segment.text,
            duration: segment.duration,
        })
        .collect()
}
