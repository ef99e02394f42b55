// Application wiring: build the concrete tool set from the resolved configuration.

use crate::adapters::{YoutubeDataClient, YoutubeTranscriptFetcher};
use crate::config::ServerConfig;
use crate::core::tools::YoutubeTools;
use crate::core::transcript_service::TranscriptService;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;

pub type DefaultTools = YoutubeTools<YoutubeTranscriptFetcher, YoutubeDataClient>;

pub fn build_youtube_tools(config: &ServerConfig) -> Result<DefaultTools> {
    match &config.proxy {
        Some(proxy) => tracing::info!(
            "Initializing transcript fetcher with Webshare proxy ({} endpoint(s), {} retries when blocked)",
            proxy.endpoints().len(),
            proxy.retries_when_blocked()
        ),
        None => tracing::info!("Initializing transcript fetcher without proxy"),
    }

    let transcripts = YoutubeTranscriptFetcher::new(config, config.proxy.clone())?;
    let details = YoutubeDataClient::new(config)?;
    let service = TranscriptService::new(
        transcripts,
        details,
        config.transcript_languages().to_vec(),
    );

    Ok(YoutubeTools::new(service))
}
