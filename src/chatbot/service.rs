//! Chat service - owns the keyword table, transcript and learned responses.
//!
//! All state sits behind one async mutex. Each operation holds it for its
//! whole read/mutate/save sequence, so concurrent turns never interleave and
//! a failed save is rolled back before the lock is released.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::chatbot::engine::{EngineLimits, ERROR_CATEGORY, ReplyEngine};
use crate::chatbot::keywords::{AppendOutcome, KeywordError, KeywordTable};
use crate::chatbot::learned::{LearnedLog, LearnedResponse};
use crate::chatbot::message::{DEFAULT_TIME_FORMAT, Message, timestamp};
use crate::chatbot::sanitize::sanitize;
use crate::chatbot::store::PersistenceError;
use crate::chatbot::transcript::{Stats, Transcript, TranscriptStore, TranscriptSummary};

/// Errors surfaced to callers of the service.
#[derive(Debug)]
pub enum ServiceError {
    /// The caller sent something unusable.
    InvalidInput(String),
    /// Reading or writing persisted state failed.
    Persistence(PersistenceError),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            Self::Persistence(e) => write!(f, "persistence error: {}", e),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidInput(_) => None,
            Self::Persistence(e) => Some(e),
        }
    }
}

impl From<PersistenceError> for ServiceError {
    fn from(e: PersistenceError) -> Self {
        Self::Persistence(e)
    }
}

impl From<KeywordError> for ServiceError {
    fn from(_: KeywordError) -> Self {
        Self::InvalidInput("Empty fields.".to_string())
    }
}

/// Service settings.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub limits: EngineLimits,
    pub time_format: String,
    /// Transcript file; `None` keeps the transcript in memory only.
    pub transcript_path: Option<PathBuf>,
    /// Learned responses file; `None` keeps them in memory only.
    pub learned_path: Option<PathBuf>,
    /// Log rejected messages as a Bot message in the "error" category.
    pub record_rejections: bool,
    /// Fixed RNG seed, for reproducible answer selection.
    pub seed: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            limits: EngineLimits::default(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            transcript_path: None,
            learned_path: None,
            record_rejections: false,
            seed: None,
        }
    }
}

/// Result of one chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitOutcome {
    /// The user's trimmed, unsanitized text.
    pub user: String,
    pub reply: String,
    pub category: String,
    /// Validation message when the text was rejected.
    pub error: Option<String>,
}

/// Result of a personalization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddOutcome {
    pub success: bool,
    pub keyword: String,
    pub answer: String,
}

/// Result of clearing the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cleared {
    pub success: bool,
    pub message: String,
}

struct ChatState {
    table: KeywordTable,
    transcript: Transcript,
    learned: LearnedLog,
    rng: StdRng,
}

/// The chat service shared by all request handlers.
pub struct ChatService {
    engine: ReplyEngine,
    time_format: String,
    record_rejections: bool,
    store: TranscriptStore,
    state: Mutex<ChatState>,
}

impl ChatService {
    /// Open the service, loading persisted state.
    ///
    /// Unreadable or corrupt files are replaced by empty state; their faults
    /// are returned for the caller to report.
    pub fn open(config: ServiceConfig) -> (Self, Vec<PersistenceError>) {
        let mut faults = Vec::new();

        let store = match config.transcript_path {
            Some(ref path) => TranscriptStore::with_path(path),
            None => TranscriptStore::in_memory(),
        };
        let (transcript, fault) = store.load_or_empty();
        faults.extend(fault);

        let learned = match config.learned_path {
            Some(ref path) => {
                let (log, fault) = LearnedLog::load_or_new(path);
                faults.extend(fault);
                log
            }
            None => LearnedLog::in_memory(),
        };

        let mut table = KeywordTable::default_table();
        learned.replay_into(&mut table);

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let service = Self {
            engine: ReplyEngine::new(config.limits),
            time_format: config.time_format,
            record_rejections: config.record_rejections,
            store,
            state: Mutex::new(ChatState { table, transcript, learned, rng }),
        };
        (service, faults)
    }

    /// Service with default settings and nothing persisted.
    pub fn in_memory() -> Self {
        Self::open(ServiceConfig::default()).0
    }

    /// Answer a message and record the turn.
    ///
    /// `raw` must be a JSON string. Rejected messages (empty, too short, too
    /// long) return an outcome with `error` set and leave the transcript
    /// alone unless rejections are recorded.
    pub async fn submit_message(&self, raw: Option<&Value>) -> Result<SubmitOutcome, ServiceError> {
        let Some(Value::String(raw)) = raw else {
            return Err(ServiceError::InvalidInput(
                "Invalid request. Message field is required.".to_string(),
            ));
        };

        let original = raw.trim().to_string();
        let sanitized = sanitize(&original.to_lowercase());

        let mut state = self.state.lock().await;
        let ChatState { table, rng, .. } = &mut *state;
        let reply = self.engine.reply(&sanitized, &original, table, rng);
        let time = timestamp(&self.time_format);

        let outcome = SubmitOutcome {
            user: original.clone(),
            reply: reply.bot_reply.clone(),
            category: reply.category.clone(),
            error: reply.validation_error.map(|e| e.to_string()),
        };

        let rollback_len = state.transcript.len();
        match reply.validation_error {
            Some(err) => {
                info!("🚫 Rejected message: {err}");
                if !self.record_rejections {
                    return Ok(outcome);
                }
                state.transcript.push(Message::bot(reply.bot_reply, time, ERROR_CATEGORY));
            }
            None => {
                info!("💬 \"{}\" → {}", preview(&original), reply.category);
                state.transcript.append_turn(
                    Message::user(original, time.clone()),
                    Message::bot(reply.bot_reply, time, reply.category),
                );
            }
        }

        if let Err(e) = self.store.save(&state.transcript) {
            warn!("Failed to save transcript: {e}");
            state.transcript.truncate(rollback_len);
            return Err(e.into());
        }
        Ok(outcome)
    }

    /// Teach the bot a new answer for `keyword`.
    pub async fn add_personalized_response(
        &self,
        keyword: Option<&str>,
        answer: Option<&str>,
    ) -> Result<AddOutcome, ServiceError> {
        let (Some(keyword), Some(answer)) = (keyword, answer) else {
            return Err(ServiceError::InvalidInput("Keyword or answer missing.".to_string()));
        };

        let mut state = self.state.lock().await;
        let mut table = state.table.clone();
        let outcome = table.append_answer(keyword, answer)?;
        state
            .learned
            .record(LearnedResponse::now(outcome.keyword(), outcome.answer()))?;
        state.table = table;

        match &outcome {
            AppendOutcome::ExtendedEntry { keyword, .. } => {
                info!("Added new answer to existing keyword: {keyword}");
            }
            AppendOutcome::NewEntry { keyword, .. } => {
                info!("Created new keyword: {keyword}");
            }
        }

        Ok(AddOutcome {
            success: true,
            keyword: outcome.keyword().to_string(),
            answer: outcome.answer().to_string(),
        })
    }

    pub async fn list_transcript(&self) -> TranscriptSummary {
        self.state.lock().await.transcript.summary()
    }

    pub async fn get_stats(&self) -> Stats {
        self.state.lock().await.transcript.stats()
    }

    /// Empty the transcript unconditionally.
    pub async fn clear_transcript(&self) -> Result<Cleared, ServiceError> {
        let mut state = self.state.lock().await;
        let previous = std::mem::take(&mut state.transcript);

        if let Err(e) = self.store.save(&state.transcript) {
            warn!("Failed to clear transcript: {e}");
            state.transcript = previous;
            return Err(e.into());
        }

        info!("🧹 Chat cleared ({} messages removed)", previous.len());
        Ok(Cleared { success: true, message: "Chat cleared".to_string() })
    }

    pub async fn learned_responses(&self) -> Vec<LearnedResponse> {
        self.state.lock().await.learned.entries().to_vec()
    }

    /// Number of keyword entries currently in the table.
    pub async fn keyword_entries(&self) -> usize {
        self.state.lock().await.table.len()
    }
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}
