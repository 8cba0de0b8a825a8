//! Configuration management

use anyhow::Result;

/// Default chat model served through the AI Gateway
const DEFAULT_CHAT_MODEL: &str = "@cf/meta/llama-3.1-8b-instruct";

/// Default text-to-image model
const DEFAULT_IMAGE_MODEL: &str = "@cf/stabilityai/stable-diffusion-xl-base-1.0";

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant. Provide clear and informative responses.";

/// Bot configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token (required)
    pub discord_token: String,

    /// Cloudflare account ID (optional - `!ask`/`!d2`/`!draw` degrade without it)
    pub account_id: Option<String>,

    /// AI Gateway name (optional)
    pub ai_gateway: Option<String>,

    /// Bearer token for the AI Gateway (optional)
    pub api_key: Option<String>,

    /// AutoRAG index name (optional - `!d2` degrades without it)
    pub autorag_name: Option<String>,

    /// Bearer token for AutoRAG (optional)
    pub autorag_api_key: Option<String>,

    /// Chat model identifier
    pub chat_model: String,

    /// Image model identifier
    pub image_model: String,

    /// System prompt seeding each new conversation
    pub system_prompt: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Only `DISCORD_TOKEN` is required; a missing upstream value degrades
    /// the corresponding command at call time instead of failing startup.
    pub fn from_env() -> Result<Self> {
        let discord_token = std::env::var("DISCORD_TOKEN").map_err(|_| {
            anyhow::anyhow!(
                "DISCORD_TOKEN not set - add your Discord bot token to the environment or .env file"
            )
        })?;

        let account_id = std::env::var("ACCOUNT_ID").ok();
        let ai_gateway = std::env::var("AI_GATEWAY").ok();
        let api_key = std::env::var("API_KEY").ok();
        let autorag_name = std::env::var("AUTORAG_NAME").ok();
        let autorag_api_key = std::env::var("AUTORAG_API_KEY").ok();

        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string());
        let image_model =
            std::env::var("IMAGE_MODEL").unwrap_or_else(|_| DEFAULT_IMAGE_MODEL.to_string());
        let system_prompt =
            std::env::var("SYSTEM_PROMPT").unwrap_or_else(|_| DEFAULT_SYSTEM_PROMPT.to_string());

        Ok(Self {
            discord_token,
            account_id,
            ai_gateway,
            api_key,
            autorag_name,
            autorag_api_key,
            chat_model,
            image_model,
            system_prompt,
        })
    }
}
