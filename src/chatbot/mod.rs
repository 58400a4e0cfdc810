//! Chatbot module - keyword matching, transcript and the chat service.

pub mod engine;
pub mod keywords;
pub mod learned;
pub mod message;
pub mod sanitize;
pub mod service;
pub mod store;
pub mod transcript;

pub use engine::{EngineLimits, Reply, ReplyEngine, ValidationError};
pub use keywords::{KeywordEntry, KeywordTable};
pub use message::{Message, Sender};
pub use service::{ChatService, ServiceConfig, ServiceError};
pub use store::PersistenceError;
pub use transcript::{Stats, Transcript, TranscriptStore, TranscriptSummary};
