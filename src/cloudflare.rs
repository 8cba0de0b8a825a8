//! Cloudflare API clients
//!
//! Thin request/response wrappers around three endpoints:
//! - AI Gateway chat completion (Workers AI chat model)
//! - AutoRAG `ai-search`
//! - Workers AI text-to-image (raw PNG response)
//!
//! Failures never cross the client boundary: the text clients render an
//! error or fallback string as if it were a normal reply, the image client
//! yields `None`.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::conversation::ConversationTurn;

const GATEWAY_BASE: &str = "https://gateway.ai.cloudflare.com/v1";
const CLIENT_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Reply when the chat endpoint answers without the expected text field
pub const AI_FALLBACK: &str = "Sorry, I couldn't get a proper response from the AI service.";

/// Reply when the AutoRAG endpoint answers without success or the text field
pub const AUTORAG_FALLBACK: &str =
    "Sorry, I couldn't get a proper response from the Auto RAG service.";

/// Reply when the AutoRAG call itself fails
pub const AUTORAG_ERROR: &str = "Error calling Auto RAG service.";

/// Why a client call produced no usable response
#[derive(Debug, thiserror::Error)]
enum ClientFailure {
    #[error("{0} not set")]
    NotConfigured(&'static str),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned {0}")]
    Status(reqwest::StatusCode),

    #[error("unexpected response body")]
    UnexpectedBody,
}

/// Chat completion client for the AI Gateway
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ConversationTurn],
}

#[derive(Deserialize)]
struct ChatEnvelope {
    result: Option<ChatResult>,
}

#[derive(Deserialize)]
struct ChatResult {
    response: Option<String>,
}

impl ChatClient {
    pub fn new(client: Client, config: &Config) -> Self {
        let endpoint = match (&config.account_id, &config.ai_gateway) {
            (Some(account), Some(gateway)) => Some(format!(
                "{GATEWAY_BASE}/{account}/{gateway}/workers-ai/{}",
                config.chat_model
            )),
            _ => None,
        };
        Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
        }
    }

    /// Explicit endpoint, used by tests and self-hosted gateways.
    pub fn with_endpoint(
        client: Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: Some(endpoint.into()),
            api_key: Some(api_key.into()),
        }
    }

    /// Sends the conversation and renders the outcome as the reply text.
    /// This client includes failure detail in its error reply.
    pub async fn call(&self, messages: &[ConversationTurn]) -> String {
        match self.request(messages).await {
            Ok(text) => text,
            Err(ClientFailure::UnexpectedBody) => AI_FALLBACK.to_string(),
            Err(e) => {
                warn!("chat completion failed: {e}");
                format!("Error calling AI service: {e}")
            }
        }
    }

    async fn request(&self, messages: &[ConversationTurn]) -> Result<String, ClientFailure> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or(ClientFailure::NotConfigured("ACCOUNT_ID / AI_GATEWAY"))?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ClientFailure::NotConfigured("API_KEY"))?;

        debug!(turns = messages.len(), "calling chat completion endpoint");

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&ChatRequest { messages })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientFailure::Status(response.status()));
        }

        let envelope: ChatEnvelope = response
            .json()
            .await
            .map_err(|_| ClientFailure::UnexpectedBody)?;

        envelope
            .result
            .and_then(|r| r.response)
            .ok_or(ClientFailure::UnexpectedBody)
    }
}

/// Retrieval-augmented search client for an AutoRAG index
#[derive(Clone)]
pub struct SearchClient {
    client: Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    success: bool,
    result: Option<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    response: Option<String>,
}

impl SearchClient {
    pub fn new(client: Client, config: &Config) -> Self {
        let endpoint = match (&config.account_id, &config.autorag_name) {
            (Some(account), Some(name)) => Some(format!(
                "{CLIENT_API_BASE}/accounts/{account}/autorag/rags/{name}/ai-search"
            )),
            _ => None,
        };
        Self {
            client,
            endpoint,
            api_key: config.autorag_api_key.clone(),
        }
    }

    /// Explicit endpoint, used by tests.
    pub fn with_endpoint(
        client: Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: Some(endpoint.into()),
            api_key: Some(api_key.into()),
        }
    }

    /// Runs the query and renders the outcome as the reply text.
    /// Unlike the chat client, error replies carry no failure detail.
    pub async fn call(&self, query: &str) -> String {
        match self.request(query).await {
            Ok(text) => text,
            Err(ClientFailure::UnexpectedBody) => AUTORAG_FALLBACK.to_string(),
            Err(e) => {
                warn!("auto rag search failed: {e}");
                AUTORAG_ERROR.to_string()
            }
        }
    }

    async fn request(&self, query: &str) -> Result<String, ClientFailure> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or(ClientFailure::NotConfigured("ACCOUNT_ID / AUTORAG_NAME"))?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ClientFailure::NotConfigured("AUTORAG_API_KEY"))?;

        debug!(query_len = query.len(), "calling ai-search endpoint");

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&SearchRequest { query })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientFailure::Status(response.status()));
        }

        let envelope: SearchEnvelope = response
            .json()
            .await
            .map_err(|_| ClientFailure::UnexpectedBody)?;

        if !envelope.success {
            return Err(ClientFailure::UnexpectedBody);
        }

        envelope
            .result
            .and_then(|r| r.response)
            .ok_or(ClientFailure::UnexpectedBody)
    }
}

/// Text-to-image client for the AI Gateway
#[derive(Clone)]
pub struct ImageClient {
    client: Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
}

impl ImageClient {
    pub fn new(client: Client, config: &Config) -> Self {
        let endpoint = match (&config.account_id, &config.ai_gateway) {
            (Some(account), Some(gateway)) => Some(format!(
                "{GATEWAY_BASE}/{account}/{gateway}/workers-ai/{}",
                config.image_model
            )),
            _ => None,
        };
        Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
        }
    }

    /// Explicit endpoint, used by tests.
    pub fn with_endpoint(
        client: Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: Some(endpoint.into()),
            api_key: Some(api_key.into()),
        }
    }

    /// Generates an image and returns the raw PNG bytes. `None` is the sole
    /// failure signal; no error text is propagated.
    pub async fn call(&self, prompt: &str) -> Option<Vec<u8>> {
        match self.request(prompt).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("image generation failed: {e}");
                None
            }
        }
    }

    async fn request(&self, prompt: &str) -> Result<Vec<u8>, ClientFailure> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or(ClientFailure::NotConfigured("ACCOUNT_ID / AI_GATEWAY"))?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ClientFailure::NotConfigured("API_KEY"))?;

        debug!(prompt_len = prompt.len(), "calling image endpoint");

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&ImageRequest { prompt })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientFailure::Status(response.status()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unconfigured() -> Config {
        Config {
            discord_token: "test-token".to_string(),
            account_id: None,
            ai_gateway: None,
            api_key: None,
            autorag_name: None,
            autorag_api_key: None,
            chat_model: "@cf/meta/llama-3.1-8b-instruct".to_string(),
            image_model: "@cf/stabilityai/stable-diffusion-xl-base-1.0".to_string(),
            system_prompt: "You are helpful.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_chat_degrades_with_detail() {
        let client = ChatClient::new(Client::new(), &unconfigured());
        let reply = client.call(&[ConversationTurn::user("hi")]).await;
        assert!(reply.starts_with("Error calling AI service:"));
        assert!(reply.contains("not set"));
    }

    #[tokio::test]
    async fn test_unconfigured_search_degrades_without_detail() {
        let client = SearchClient::new(Client::new(), &unconfigured());
        let reply = client.call("what is dota 2?").await;
        assert_eq!(reply, AUTORAG_ERROR);
    }

    #[tokio::test]
    async fn test_unconfigured_image_yields_none() {
        let client = ImageClient::new(Client::new(), &unconfigured());
        assert!(client.call("a cat").await.is_none());
    }

    #[test]
    fn test_endpoints_built_from_config() {
        let config = Config {
            account_id: Some("acc123".to_string()),
            ai_gateway: Some("my-gateway".to_string()),
            api_key: Some("key".to_string()),
            autorag_name: Some("dota-rag".to_string()),
            autorag_api_key: Some("rag-key".to_string()),
            ..unconfigured()
        };

        let chat = ChatClient::new(Client::new(), &config);
        assert_eq!(
            chat.endpoint.as_deref(),
            Some(
                "https://gateway.ai.cloudflare.com/v1/acc123/my-gateway/workers-ai/@cf/meta/llama-3.1-8b-instruct"
            )
        );

        let search = SearchClient::new(Client::new(), &config);
        assert_eq!(
            search.endpoint.as_deref(),
            Some(
                "https://api.cloudflare.com/client/v4/accounts/acc123/autorag/rags/dota-rag/ai-search"
            )
        );

        let image = ImageClient::new(Client::new(), &config);
        assert_eq!(
            image.endpoint.as_deref(),
            Some(
                "https://gateway.ai.cloudflare.com/v1/acc123/my-gateway/workers-ai/@cf/stabilityai/stable-diffusion-xl-base-1.0"
            )
        );
    }
}
