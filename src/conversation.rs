//! Conversation Store
//!
//! Keeps the recent turns of each Discord channel in memory so follow-up
//! `!ask` commands carry context. State lives for the process lifetime only;
//! the map is never pruned across channels.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;

/// Maximum turns kept per channel: the system turn plus a rolling window of
/// user/assistant turns (roughly two full exchanges).
pub const MAX_TURNS_PER_CHANNEL: usize = 6;

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged turn in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// In-memory conversation store keyed by channel id.
///
/// Every operation takes the map lock exactly once, so each append/trim is
/// applied atomically as a unit even when commands for the same channel
/// interleave at the network await points.
#[derive(Default)]
pub struct ConversationStore {
    channels: Mutex<HashMap<u64, Vec<ConversationTurn>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the channel history, seeding a new one with a
    /// single system turn on first use. Repeated calls never reset an
    /// existing history.
    pub fn get_or_create(&self, channel_id: u64, system_prompt: &str) -> Vec<ConversationTurn> {
        let mut channels = self.channels.lock();
        channels
            .entry(channel_id)
            .or_insert_with(|| vec![ConversationTurn::system(system_prompt)])
            .clone()
    }

    /// Appends a turn to an existing channel history. Does nothing for a
    /// channel that was never seeded with `get_or_create`.
    pub fn append(&self, channel_id: u64, turn: ConversationTurn) {
        let mut channels = self.channels.lock();
        if let Some(history) = channels.get_mut(&channel_id) {
            history.push(turn);
        }
    }

    /// Bounds a channel history to `max_len` turns by discarding interior
    /// turns: the leading system turn and the most recent `max_len - 1`
    /// turns survive. A history at or under the bound is left untouched,
    /// which also makes re-trimming a no-op.
    pub fn trim(&self, channel_id: u64, max_len: usize) {
        let mut channels = self.channels.lock();
        if let Some(history) = channels.get_mut(&channel_id) {
            if history.len() > max_len {
                let tail_start = history.len() - max_len.saturating_sub(1);
                history.drain(1..tail_start);
            }
        }
    }

    /// Snapshot of a channel history, if one exists.
    pub fn history(&self, channel_id: u64) -> Option<Vec<ConversationTurn>> {
        self.channels.lock().get(&channel_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_seeds_system_turn() {
        let store = ConversationStore::new();
        let history = store.get_or_create(1, "You are helpful.");

        assert_eq!(history.len(), 1);
        assert_eq!(history[0], ConversationTurn::system("You are helpful."));
    }

    #[test]
    fn test_get_or_create_idempotent() {
        let store = ConversationStore::new();
        store.get_or_create(1, "You are helpful.");
        store.append(1, ConversationTurn::user("hello"));

        // Second call returns the existing history, prompt argument ignored
        let history = store.get_or_create(1, "Different prompt");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "You are helpful.");
        assert_eq!(history[1].content, "hello");
    }

    #[test]
    fn test_append_without_seed_is_noop() {
        let store = ConversationStore::new();
        store.append(1, ConversationTurn::user("orphan"));
        assert!(store.history(1).is_none());
    }

    #[test]
    fn test_trim_keeps_system_turn_and_tail() {
        let store = ConversationStore::new();
        store.get_or_create(1, "sys");
        for i in 0..8 {
            store.append(1, ConversationTurn::user(format!("msg {i}")));
        }

        let before = store.history(1).unwrap();
        store.trim(1, 6);
        let after = store.history(1).unwrap();

        assert_eq!(after.len(), 6);
        assert_eq!(after[0], before[0]);
        assert_eq!(after[1..], before[before.len() - 5..]);
    }

    #[test]
    fn test_trim_under_bound_is_noop() {
        let store = ConversationStore::new();
        store.get_or_create(1, "sys");
        store.append(1, ConversationTurn::user("a"));
        store.append(1, ConversationTurn::assistant("b"));

        store.trim(1, 6);
        assert_eq!(store.history(1).unwrap().len(), 3);
    }

    #[test]
    fn test_trim_idempotent() {
        let store = ConversationStore::new();
        store.get_or_create(1, "sys");
        for i in 0..10 {
            store.append(1, ConversationTurn::user(format!("msg {i}")));
        }

        store.trim(1, 6);
        let once = store.history(1).unwrap();
        store.trim(1, 6);
        let twice = store.history(1).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_multi_channel_isolation() {
        let store = ConversationStore::new();
        store.get_or_create(111, "sys");
        store.get_or_create(222, "sys");
        store.append(111, ConversationTurn::user("channel 1 message"));
        store.append(222, ConversationTurn::user("channel 2 message"));

        let history1 = store.history(111).unwrap();
        let history2 = store.history(222).unwrap();

        assert_eq!(history1.len(), 2);
        assert_eq!(history2.len(), 2);
        assert!(history1[1].content.contains("channel 1"));
        assert!(history2[1].content.contains("channel 2"));
    }

    #[test]
    fn test_seven_exchanges_stabilize_at_bound() {
        let store = ConversationStore::new();
        for i in 0..7 {
            store.get_or_create(1, "original prompt");
            store.append(1, ConversationTurn::user(format!("question {i}")));
            store.append(1, ConversationTurn::assistant(format!("answer {i}")));
            store.trim(1, MAX_TURNS_PER_CHANNEL);
        }

        let history = store.history(1).unwrap();
        assert_eq!(history.len(), MAX_TURNS_PER_CHANNEL);
        assert_eq!(history[0], ConversationTurn::system("original prompt"));
        assert_eq!(
            history.last().unwrap(),
            &ConversationTurn::assistant("answer 6")
        );
    }
}
