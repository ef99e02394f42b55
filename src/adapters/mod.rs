// Adapters layer: concrete implementations for external systems (YouTube HTTP endpoints, proxy).

pub mod http;
pub mod proxy;
pub mod timedtext;
pub mod transcript;
pub mod youtube_api;

pub use proxy::WebshareProxy;
pub use transcript::YoutubeTranscriptFetcher;
pub use youtube_api::YoutubeDataClient;
