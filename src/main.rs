//! gatewaybot entry point
//!
//! Loads configuration from the environment, sets up logging, and runs the
//! Discord gateway. A missing `DISCORD_TOKEN` aborts here, before any
//! connection is attempted.

use gatewaybot::Config;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("gatewaybot v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Discord bot for Cloudflare AI Gateway, AutoRAG and Workers AI.");
        println!();
        println!("Environment variables:");
        println!("  DISCORD_TOKEN    Discord bot token (required)");
        println!("  ACCOUNT_ID       Cloudflare account ID");
        println!("  AI_GATEWAY       AI Gateway name");
        println!("  API_KEY          AI Gateway bearer token");
        println!("  AUTORAG_NAME     AutoRAG index name");
        println!("  AUTORAG_API_KEY  AutoRAG bearer token");
        println!("  CHAT_MODEL       Chat model id (default: @cf/meta/llama-3.1-8b-instruct)");
        println!("  IMAGE_MODEL      Image model id (default: @cf/stabilityai/stable-diffusion-xl-base-1.0)");
        println!("  SYSTEM_PROMPT    System prompt for !ask conversations");
        return Ok(());
    }

    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("gatewaybot v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    gatewaybot::discord::run_bot(config).await
}
