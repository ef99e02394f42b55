use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("{message}")]
    InvalidVideoUrl { message: String },

    #[error("YouTube API request failed with status {status}")]
    YoutubeApiStatus { status: u16 },

    #[error("Video not found or unavailable")]
    VideoNotFound { video_id: String },

    #[error("Subtitles are disabled for video {video_id}")]
    TranscriptsDisabled { video_id: String },

    #[error("No transcript found for video {video_id} in languages [{}]", .languages.join(", "))]
    NoTranscriptFound {
        video_id: String,
        languages: Vec<String>,
    },

    #[error("The video {video_id} is no longer available")]
    VideoUnavailable { video_id: String },

    #[error("The video {video_id} is unplayable: {reason}")]
    VideoUnplayable { video_id: String, reason: String },

    #[error("The video {video_id} is age restricted")]
    AgeRestricted { video_id: String },

    #[error("YouTube is blocking requests for video {video_id} (bot check)")]
    RequestBlocked { video_id: String },

    #[error("YouTube is blocking requests from this IP for video {video_id}")]
    IpBlocked { video_id: String },

    #[error("The transcript for video {video_id} requires a PO token")]
    PoTokenRequired { video_id: String },

    #[error("Unable to parse YouTube data for video {video_id}: {message}")]
    YoutubeDataUnparsable { video_id: String, message: String },

    #[error("Failed to create consent cookie for video {video_id}")]
    FailedToCreateConsentCookie { video_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Validation,
    Upstream,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ServerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ServerError::ApiError(_) | ServerError::RequestBlocked { .. } | ServerError::IpBlocked { .. } => {
                ErrorCategory::Network
            }
            ServerError::ConfigError { .. }
            | ServerError::ConfigValidationError { .. }
            | ServerError::InvalidConfigValueError { .. }
            | ServerError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ServerError::InvalidVideoUrl { .. } => ErrorCategory::Validation,
            ServerError::YoutubeApiStatus { .. }
            | ServerError::VideoNotFound { .. }
            | ServerError::TranscriptsDisabled { .. }
            | ServerError::NoTranscriptFound { .. }
            | ServerError::VideoUnavailable { .. }
            | ServerError::VideoUnplayable { .. }
            | ServerError::AgeRestricted { .. }
            | ServerError::PoTokenRequired { .. }
            | ServerError::YoutubeDataUnparsable { .. }
            | ServerError::FailedToCreateConsentCookie { .. } => ErrorCategory::Upstream,
            ServerError::IoError(_) | ServerError::SerializationError(_) => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation => ErrorSeverity::Low,
            ErrorCategory::Network | ErrorCategory::Upstream => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Internal => ErrorSeverity::Critical,
        }
    }

    /// 被 YouTube 封鎖時，換一個代理 IP 重試才有意義
    pub fn is_blocked(&self) -> bool {
        matches!(
            self,
            ServerError::RequestBlocked { .. } | ServerError::IpBlocked { .. }
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ServerError::MissingConfigError { .. } => {
                "Set the missing value in the environment or in the .env file"
            }
            ServerError::ConfigError { .. }
            | ServerError::ConfigValidationError { .. }
            | ServerError::InvalidConfigValueError { .. } => {
                "Check the command line flags and the --config file"
            }
            ServerError::InvalidVideoUrl { .. } => {
                "Use a URL such as https://www.youtube.com/watch?v=dQw4w9WgXcQ"
            }
            ServerError::RequestBlocked { .. } | ServerError::IpBlocked { .. } => {
                "Configure WEBSHARE_PROXY_USERNAME and WEBSHARE_PROXY_PASSWORD to use a rotating proxy"
            }
            ServerError::YoutubeApiStatus { .. } => {
                "Verify YOUTUBE_API_KEY and the remaining YouTube Data API quota"
            }
            ServerError::ApiError(_) => "Check network connectivity and retry",
            _ => "Retry later or try a different video",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Network => format!("Network problem: {}", self),
            ErrorCategory::Internal => format!("Internal error: {}", self),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
