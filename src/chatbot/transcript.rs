//! Transcript of exchanged messages, its statistics and its file store.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::chatbot::message::{Message, Sender};
use crate::chatbot::store::{JsonFile, PersistenceError};

/// Ordered, append-only log of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

/// Full listing with counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSummary {
    pub messages: Vec<Message>,
    pub total_count: usize,
    pub user_count: usize,
    pub bot_count: usize,
    pub category_counts: BTreeMap<String, usize>,
}

/// Bot reply categories and the overall message count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub category_counts: BTreeMap<String, usize>,
    pub total_messages: usize,
}

impl Transcript {
    pub fn new() -> Self {
        Self { messages: Vec::new() }
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a user message and the bot's answer together.
    pub fn append_turn(&mut self, user: Message, bot: Message) {
        self.messages.reserve(2);
        self.messages.push(user);
        self.messages.push(bot);
    }

    /// Append a single message.
    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    /// Drop everything after the first `len` messages.
    pub fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
    }

    pub fn count_by(&self, sender: Sender) -> usize {
        self.messages.iter().filter(|m| m.sender == sender).count()
    }

    /// Bot messages per category. User messages are not counted.
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for msg in self.messages.iter().filter(|m| m.is_bot() && !m.category.is_empty()) {
            *counts.entry(msg.category.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn summary(&self) -> TranscriptSummary {
        TranscriptSummary {
            messages: self.messages.clone(),
            total_count: self.messages.len(),
            user_count: self.count_by(Sender::User),
            bot_count: self.count_by(Sender::Bot),
            category_counts: self.category_counts(),
        }
    }

    pub fn stats(&self) -> Stats {
        Stats {
            category_counts: self.category_counts(),
            total_messages: self.messages.len(),
        }
    }
}

/// Where the transcript lives between restarts.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    file: Option<JsonFile>,
}

impl TranscriptStore {
    /// Store backed by a JSON file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { file: Some(JsonFile::new(path)) }
    }

    /// Store that keeps nothing.
    pub fn in_memory() -> Self {
        Self { file: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(JsonFile::path)
    }

    pub fn load(&self) -> Result<Transcript, PersistenceError> {
        match &self.file {
            Some(file) => {
                let messages = file.load()?;
                let transcript = Transcript::from_messages(messages);
                info!("Loaded transcript from {:?} ({} messages)", file.path(), transcript.len());
                Ok(transcript)
            }
            None => Ok(Transcript::new()),
        }
    }

    /// Load, falling back to an empty transcript. The fault is handed back
    /// so the caller can report it.
    pub fn load_or_empty(&self) -> (Transcript, Option<PersistenceError>) {
        match self.load() {
            Ok(transcript) => (transcript, None),
            Err(e) => {
                warn!("Failed to load transcript, starting empty: {e}");
                (Transcript::new(), Some(e))
            }
        }
    }

    pub fn save(&self, transcript: &Transcript) -> Result<(), PersistenceError> {
        match &self.file {
            Some(file) => file.save(transcript.messages()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn turn(t: &mut Transcript, user: &str, bot: &str, category: &str) {
        t.append_turn(Message::user(user, "t"), Message::bot(bot, "t", category));
    }

    #[test]
    fn test_append_turn_keeps_order() {
        let mut t = Transcript::new();
        turn(&mut t, "hello", "Hi!", "hellos");
        assert_eq!(t.len(), 2);
        assert_eq!(t.messages()[0].sender, Sender::User);
        assert_eq!(t.messages()[1].sender, Sender::Bot);
    }

    #[test]
    fn test_category_counts_only_bot_messages() {
        let mut t = Transcript::new();
        turn(&mut t, "hello", "Hi!", "hellos");
        turn(&mut t, "hey", "Hello!", "hellos");
        turn(&mut t, "bye", "See you!", "goodbyes");

        let counts = t.category_counts();
        assert_eq!(counts.get("hellos"), Some(&2));
        assert_eq!(counts.get("goodbyes"), Some(&1));
        assert!(!counts.contains_key("user-input"));
    }

    #[test]
    fn test_summary_counts() {
        let mut t = Transcript::new();
        turn(&mut t, "hello", "Hi!", "hellos");
        t.push(Message::bot("Write a message to chat.", "t", "error"));

        let summary = t.summary();
        assert_eq!(summary.total_count, 3);
        assert_eq!(summary.user_count, 1);
        assert_eq!(summary.bot_count, 2);
        assert_eq!(summary.category_counts.get("error"), Some(&1));
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = Transcript::new().summary();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["totalCount"], 0);
        assert_eq!(json["userCount"], 0);
        assert_eq!(json["botCount"], 0);
        assert!(json["categoryCounts"].as_object().unwrap().is_empty());

        let stats = serde_json::to_value(Transcript::new().stats()).unwrap();
        assert_eq!(stats["totalMessages"], 0);
    }

    #[test]
    fn test_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = TranscriptStore::with_path(dir.path().join("messages.json"));
        let mut t = Transcript::new();
        turn(&mut t, "hello", "Hi!", "hellos");
        store.save(&t).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, t);
    }

    #[test]
    fn test_store_corrupt_file_loads_empty_with_fault() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("messages.json");
        std::fs::write(&path, "[{\"sender\": ").unwrap();

        let (t, fault) = TranscriptStore::with_path(&path).load_or_empty();
        assert!(t.is_empty());
        assert!(fault.unwrap().is_corrupt());
    }

    #[test]
    fn test_in_memory_store() {
        let store = TranscriptStore::in_memory();
        let mut t = Transcript::new();
        turn(&mut t, "hello", "Hi!", "hellos");
        store.save(&t).unwrap();
        assert!(store.load().unwrap().is_empty());
        assert!(store.path().is_none());
    }
}
