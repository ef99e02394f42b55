use anyhow::Context;
use clap::Parser;
use youtube_mcp_server::core::tools::TRANSCRIPT_TOOL_NAME;
use youtube_mcp_server::domain::model::Content;
use youtube_mcp_server::domain::ports::ToolProvider;
use youtube_mcp_server::utils::logger;
use youtube_mcp_server::{build_youtube_tools, CliConfig};

/// 單次執行 get_youtube_video_transcript，用於檢查金鑰、代理與字幕語言設定
#[derive(Debug, Parser)]
#[command(name = "fetch_transcript")]
#[command(about = "Run the transcript tool once and print its JSON output")]
struct FetchArgs {
    #[arg(long, help = "YouTube video URL")]
    url: String,

    #[command(flatten)]
    server: CliConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args = FetchArgs::parse();
    logger::init_cli_logger(args.server.verbose, args.server.log_format);

    let config = args
        .server
        .resolve()
        .context("failed to resolve configuration")?;
    let tools = build_youtube_tools(&config).context("failed to build YouTube clients")?;

    tracing::info!("🔍 Fetching transcript for {}", args.url);
    let output = tools
        .call_tool(TRANSCRIPT_TOOL_NAME, &serde_json::json!({ "url": args.url }))
        .await;

    for content in &output.content {
        match content {
            Content::Text { text } => println!("{}", text),
        }
    }

    if output.is_error {
        anyhow::bail!("tool reported an error");
    }

    Ok(())
}
