use clap::Parser;
use youtube_mcp_server::utils::error::ErrorSeverity;
use youtube_mcp_server::utils::logger;
use youtube_mcp_server::{build_youtube_tools, CliConfig, McpServer, ServerError};

fn exit_code(e: &ServerError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn report_and_exit(stage: &str, e: ServerError) -> ! {
    tracing::error!(
        "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
        stage,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    std::process::exit(exit_code(&e).max(1));
}

#[tokio::main]
async fn main() {
    // .env 需在解析 CLI 前載入，clap 的 env 後援才讀得到
    dotenv::dotenv().ok();

    let cli = CliConfig::parse();
    logger::init_cli_logger(cli.verbose, cli.log_format);

    tracing::info!("Starting youtube-mcp-server");
    if cli.verbose {
        tracing::debug!("Config file: {:?}, log format: {:?}", cli.config, cli.log_format);
    }

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => report_and_exit("Configuration", e),
    };

    let tools = match build_youtube_tools(&config) {
        Ok(tools) => tools,
        Err(e) => report_and_exit("Initialization", e),
    };

    let server = McpServer::new(tools);
    if let Err(e) = server.run(tokio::io::stdin(), tokio::io::stdout()).await {
        let code = exit_code(&e);
        tracing::error!("❌ Server stopped: {}", e);
        if code > 0 {
            std::process::exit(code);
        }
    }
}
