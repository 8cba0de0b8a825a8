//! Command parsing and dispatch
//!
//! Each inbound message is matched against the known prefixes in priority
//! order and routed to the matching upstream client. Only `!ask` touches the
//! conversation store.

use std::sync::Arc;

use tracing::debug;

use crate::cloudflare::{ChatClient, ImageClient, SearchClient};
use crate::conversation::{ConversationStore, ConversationTurn, MAX_TURNS_PER_CHANNEL};

/// Reply when image generation fails
pub const IMAGE_FAILURE_REPLY: &str =
    "Sorry, I couldn't generate an image. Please try again later.";

/// Fixed filename for generated image attachments
pub const GENERATED_IMAGE_FILENAME: &str = "generated_image.png";

/// Command kind, matched in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Ask,
    Search,
    Draw,
}

impl CommandKind {
    const PREFIXES: [(CommandKind, &'static str); 3] = [
        (CommandKind::Ask, "!ask "),
        (CommandKind::Search, "!d2 "),
        (CommandKind::Draw, "!draw "),
    ];

    /// Reply for a command invoked without an argument
    pub fn usage_hint(&self) -> &'static str {
        match self {
            CommandKind::Ask => {
                "Please provide a question after `!ask`. Example: `!ask what is cloudflare?`"
            }
            CommandKind::Search => {
                "Please provide a query after `!d2`. Example: `!d2 what is Dota 2?`"
            }
            CommandKind::Draw => {
                "Please provide a prompt after `!draw`. Example: `!draw a neon city skyline`"
            }
        }
    }
}

/// A parsed command with its argument (may be empty)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    pub arg: String,
}

impl Command {
    /// Matches a message body against the known prefixes. Anything that is
    /// not a command returns `None` and is silently ignored by callers.
    pub fn parse(text: &str) -> Option<Command> {
        for (kind, prefix) in CommandKind::PREFIXES {
            if let Some(rest) = text.strip_prefix(prefix) {
                return Some(Command {
                    kind,
                    arg: rest.trim().to_string(),
                });
            }
        }
        None
    }
}

/// Outgoing reply produced by the dispatcher
#[derive(Debug)]
pub enum Reply {
    Text(String),
    /// Caption plus PNG bytes, attached as [`GENERATED_IMAGE_FILENAME`]
    Png { caption: String, bytes: Vec<u8> },
}

/// Routes parsed commands to the upstream clients and maintains per-channel
/// history for chat commands.
pub struct Dispatcher {
    store: Arc<ConversationStore>,
    chat: ChatClient,
    search: SearchClient,
    image: ImageClient,
    system_prompt: String,
}

impl Dispatcher {
    pub fn new(
        store: Arc<ConversationStore>,
        chat: ChatClient,
        search: SearchClient,
        image: ImageClient,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            store,
            chat,
            search,
            image,
            system_prompt: system_prompt.into(),
        }
    }

    /// Executes a command and renders the reply. A command with an empty
    /// argument gets the usage hint and never reaches a client.
    pub async fn run(&self, channel_id: u64, command: &Command) -> Reply {
        if command.arg.is_empty() {
            return Reply::Text(command.kind.usage_hint().to_string());
        }

        debug!(channel_id, kind = ?command.kind, "dispatching command");

        match command.kind {
            CommandKind::Ask => self.run_ask(channel_id, &command.arg).await,
            CommandKind::Search => Reply::Text(self.search.call(&command.arg).await),
            CommandKind::Draw => self.run_draw(&command.arg).await,
        }
    }

    async fn run_ask(&self, channel_id: u64, prompt: &str) -> Reply {
        self.store.get_or_create(channel_id, &self.system_prompt);
        self.store.append(channel_id, ConversationTurn::user(prompt));
        let history = self.store.get_or_create(channel_id, &self.system_prompt);

        let answer = self.chat.call(&history).await;

        // Error strings count as the assistant turn, same as the original reply
        self.store
            .append(channel_id, ConversationTurn::assistant(&answer));
        self.store.trim(channel_id, MAX_TURNS_PER_CHANNEL);

        Reply::Text(answer)
    }

    async fn run_draw(&self, prompt: &str) -> Reply {
        match self.image.call(prompt).await {
            Some(bytes) => Reply::Png {
                caption: format!("Generated image for: **{prompt}**"),
                bytes,
            },
            None => Reply::Text(IMAGE_FAILURE_REPLY.to_string()),
        }
    }
}
