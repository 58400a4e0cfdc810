//! Personalized keyword/answer pairs added at runtime.
//!
//! The learned file is the only record of runtime additions. At startup its
//! entries are replayed on top of the default keyword table.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::chatbot::keywords::KeywordTable;
use crate::chatbot::store::{JsonFile, PersistenceError};

/// One addition made through personalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnedResponse {
    pub keyword: String,
    pub answer: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
}

impl LearnedResponse {
    pub fn now(keyword: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            answer: answer.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// All learned responses, optionally backed by a file.
#[derive(Debug, Clone)]
pub struct LearnedLog {
    entries: Vec<LearnedResponse>,
    file: Option<JsonFile>,
}

impl LearnedLog {
    pub fn in_memory() -> Self {
        Self { entries: Vec::new(), file: None }
    }

    /// Load from `path`. A corrupt file is reported and treated as empty.
    pub fn load_or_new(path: impl Into<PathBuf>) -> (Self, Option<PersistenceError>) {
        let file = JsonFile::new(path);
        match file.load() {
            Ok(entries) => (Self { entries, file: Some(file) }, None),
            Err(e) => {
                warn!("Failed to load learned responses: {e}");
                (Self { entries: Vec::new(), file: Some(file) }, Some(e))
            }
        }
    }

    pub fn entries(&self) -> &[LearnedResponse] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply every learned pair to `table`, in the order they were learned.
    /// Returns how many were applied.
    pub fn replay_into(&self, table: &mut KeywordTable) -> usize {
        let mut applied = 0;
        for learned in &self.entries {
            match table.append_answer(&learned.keyword, &learned.answer) {
                Ok(_) => applied += 1,
                Err(e) => warn!("Skipping learned response {:?}: {e}", learned.keyword),
            }
        }
        if applied > 0 {
            info!("📥 Replayed {} learned response(s)", applied);
        }
        applied
    }

    /// Record a new pair and persist. On a write failure the pair is
    /// dropped again so memory matches disk.
    pub fn record(&mut self, learned: LearnedResponse) -> Result<(), PersistenceError> {
        self.entries.push(learned);
        if let Some(ref file) = self.file
            && let Err(e) = file.save(&self.entries)
        {
            self.entries.pop();
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("learned.json");

        let (mut log, fault) = LearnedLog::load_or_new(&path);
        assert!(fault.is_none());
        log.record(LearnedResponse::now("zzzkeyword", "zzzanswer")).unwrap();

        let (reloaded, _) = LearnedLog::load_or_new(&path);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.entries()[0].keyword, "zzzkeyword");
    }

    #[test]
    fn test_replay_into_table() {
        let mut log = LearnedLog::in_memory();
        log.record(LearnedResponse::now("zzzkeyword", "zzzanswer")).unwrap();
        log.record(LearnedResponse::now("hello", "Howdy!")).unwrap();

        let mut table = KeywordTable::default_table();
        assert_eq!(log.replay_into(&mut table), 2);
        assert!(table.find_by_keyword("zzzkeyword").is_some());
        let hellos = table.find_by_keyword("hello").unwrap();
        assert!(hellos.answers.contains(&"Howdy!".to_string()));
    }

    #[test]
    fn test_replay_skips_blank_pairs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("learned.json");
        std::fs::write(
            &path,
            r#"[{"keyword":" ","answer":"x","timestamp":"2024-01-01T00:00:00Z"}]"#,
        )
        .unwrap();

        let (log, _) = LearnedLog::load_or_new(&path);
        let mut table = KeywordTable::default_table();
        assert_eq!(log.replay_into(&mut table), 0);
        assert_eq!(table.len(), 7);
    }

    #[test]
    fn test_corrupt_file_reports_fault() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("learned.json");
        std::fs::write(&path, "nope").unwrap();

        let (log, fault) = LearnedLog::load_or_new(&path);
        assert!(log.is_empty());
        assert!(fault.unwrap().is_corrupt());
    }

    #[test]
    fn test_failed_save_rolls_back() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let (mut log, _) = LearnedLog::load_or_new(blocker.join("learned.json"));
        let err = log.record(LearnedResponse::now("k", "a"));
        assert!(err.is_err());
        assert!(log.is_empty());
    }
}
