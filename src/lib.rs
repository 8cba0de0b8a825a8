//! gatewaybot
//!
//! Discord bot bridging chat commands to Cloudflare AI services.
//!
//! # Commands
//!
//! - `!ask <text>`: chat completion through an AI Gateway, with per-channel
//!   bounded conversation history
//! - `!d2 <text>`: retrieval-augmented search against an AutoRAG index
//! - `!draw <text>`: Workers AI image generation, replied as a PNG attachment
//!
//! # Architecture
//!
//! ```text
//! Discord ──► gateway events ──► Dispatcher ──► ChatClient   ──► AI Gateway
//!                                    │      ──► SearchClient ──► AutoRAG
//!                                    │      ──► ImageClient  ──► Workers AI
//!                                    └── ConversationStore (in-memory, per channel)
//! ```

pub mod cloudflare;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod discord;

pub use cloudflare::{ChatClient, ImageClient, SearchClient};
pub use commands::{Command, CommandKind, Dispatcher, Reply};
pub use config::Config;
pub use conversation::{ConversationStore, ConversationTurn, Role};
