pub mod time_format;
pub mod tools;
pub mod transcript_service;
pub mod video_id;

pub use crate::domain::model::{TranscriptOutcome, TranscriptSegment, VideoDetails, VideoId};
pub use crate::domain::ports::{ConfigProvider, ToolProvider, TranscriptProvider, VideoDetailsProvider};
pub use crate::utils::error::Result;
