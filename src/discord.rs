//! Discord gateway glue
//!
//! serenity event handler that feeds message events into the dispatcher and
//! relays replies back to the channel. Replies are chunked to Discord's
//! 2000-character message limit; generated images go out as attachments.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serenity::all::{
    ChannelId, Context, CreateAttachment, CreateMessage, EventHandler, GatewayIntents, Message,
    Ready, UserId,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::cloudflare::{ChatClient, ImageClient, SearchClient};
use crate::commands::{Command, Dispatcher, Reply, GENERATED_IMAGE_FILENAME};
use crate::config::Config;
use crate::conversation::ConversationStore;

/// Discord hard limit on message length
const MAX_MESSAGE_LEN: usize = 2000;

struct Handler {
    dispatcher: Dispatcher,
    /// Captured at `ready`; used to drop our own messages
    bot_user_id: RwLock<Option<UserId>>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        *self.bot_user_id.write().await = Some(ready.user.id);
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "connected to Discord, listening for !ask / !d2 / !draw"
        );
    }

    async fn message(&self, ctx: Context, msg: Message) {
        // Never respond to our own messages
        let bot_user_id = self.bot_user_id.read().await;
        if bot_user_id.is_some_and(|id| msg.author.id == id) {
            return;
        }
        drop(bot_user_id);

        let Some(command) = Command::parse(&msg.content) else {
            return;
        };

        // Working indicator while the upstream call is in flight; usage
        // hints answer immediately and skip it
        if !command.arg.is_empty() {
            if let Err(e) = msg.channel_id.broadcast_typing(&ctx.http).await {
                warn!(channel_id = %msg.channel_id, "failed to send typing indicator: {e}");
            }
        }

        let reply = self.dispatcher.run(msg.channel_id.get(), &command).await;

        if let Err(e) = send_reply(&ctx, msg.channel_id, reply).await {
            error!(channel_id = %msg.channel_id, "failed to send reply: {e}");
        }
    }
}

async fn send_reply(ctx: &Context, channel_id: ChannelId, reply: Reply) -> Result<()> {
    match reply {
        Reply::Text(text) => {
            for chunk in split_message(&text, MAX_MESSAGE_LEN) {
                channel_id
                    .say(&ctx.http, chunk)
                    .await
                    .context("failed to send Discord message")?;
            }
        }
        Reply::Png { caption, bytes } => {
            let attachment = CreateAttachment::bytes(bytes, GENERATED_IMAGE_FILENAME);
            let builder = CreateMessage::new().content(caption).add_file(attachment);
            channel_id
                .send_message(&ctx.http, builder)
                .await
                .context("failed to send image attachment")?;
        }
    }
    Ok(())
}

/// Splits a reply at UTF-8 safe boundaries under the message length limit.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        let split_at = remaining
            .char_indices()
            .take_while(|(i, _)| *i < max_len)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(remaining.len());
        let (chunk, rest) = remaining.split_at(split_at);
        chunks.push(chunk.to_string());
        remaining = rest;
    }
    chunks
}

/// Connects to the Discord gateway and blocks until the client stops.
pub async fn run_bot(config: Config) -> Result<()> {
    let http = reqwest::Client::new();
    let dispatcher = Dispatcher::new(
        Arc::new(ConversationStore::new()),
        ChatClient::new(http.clone(), &config),
        SearchClient::new(http.clone(), &config),
        ImageClient::new(http, &config),
        &config.system_prompt,
    );

    if config.account_id.is_none() || config.ai_gateway.is_none() || config.api_key.is_none() {
        warn!("AI Gateway not fully configured (ACCOUNT_ID / AI_GATEWAY / API_KEY) - !ask and !draw will report errors");
    }
    if config.account_id.is_none()
        || config.autorag_name.is_none()
        || config.autorag_api_key.is_none()
    {
        warn!("AutoRAG not fully configured (ACCOUNT_ID / AUTORAG_NAME / AUTORAG_API_KEY) - !d2 will report errors");
    }

    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = serenity::Client::builder(&config.discord_token, intents)
        .event_handler(Handler {
            dispatcher,
            bot_user_id: RwLock::new(None),
        })
        .await
        .context("failed to build Discord client")?;

    client.start().await.context("Discord gateway error")?;
    Ok(())
}
