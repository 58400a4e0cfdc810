//! Keyword table: categories, trigger keywords and canned answers.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One keyword/answer grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEntry {
    /// Topic label. Entries added at runtime have none.
    pub category: Option<String>,
    /// Lowercase trigger substrings.
    pub keywords: Vec<String>,
    /// Candidate replies, never empty.
    pub answers: Vec<String>,
}

impl KeywordEntry {
    fn new(category: &str, keywords: &[&str], answers: &[&str]) -> Self {
        Self {
            category: Some(category.to_string()),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            answers: answers.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// True if any keyword is a substring of `text`.
    pub fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

/// Errors from adding a personalized answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordError {
    EmptyKeyword,
    EmptyAnswer,
}

impl fmt::Display for KeywordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyKeyword => write!(f, "keyword must not be empty"),
            Self::EmptyAnswer => write!(f, "answer must not be empty"),
        }
    }
}

impl std::error::Error for KeywordError {}

/// What `append_answer` did with the new pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The keyword already existed; the answer joined its entry.
    ExtendedEntry { keyword: String, answer: String },
    /// A new uncategorized entry was created.
    NewEntry { keyword: String, answer: String },
}

impl AppendOutcome {
    pub fn keyword(&self) -> &str {
        match self {
            Self::ExtendedEntry { keyword, .. } | Self::NewEntry { keyword, .. } => keyword,
        }
    }

    pub fn answer(&self) -> &str {
        match self {
            Self::ExtendedEntry { answer, .. } | Self::NewEntry { answer, .. } => answer,
        }
    }
}

/// Ordered collection of keyword entries. Order decides ties.
#[derive(Debug, Clone, Default)]
pub struct KeywordTable {
    entries: Vec<KeywordEntry>,
}

impl KeywordTable {
    /// Empty table.
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// The built-in table the service starts from.
    pub fn default_table() -> Self {
        let entries = vec![
            KeywordEntry::new(
                "hellos",
                &["hello", "hi", "hey"],
                &[
                    "Hello there!",
                    "Hi there!",
                    "Hi!",
                    "Hello!",
                    "Hey! How's it going?",
                    "Greetings, human!",
                ],
            ),
            KeywordEntry::new(
                "status",
                &["how are you doing", "how are we doing", "how are you"],
                &[
                    "I'm fine, thank you! How are you?",
                    "I'm doing well! How are you?",
                    "I'm felling kinda under the weather really, even though I'm a robot.",
                ],
            ),
            KeywordEntry::new(
                "goodbyes",
                &["bye", "see you", "goodbye"],
                &["Goodbye!", "See you!", "Thanks for the chat!"],
            ),
            KeywordEntry::new(
                "favours",
                &["help", "favour", "assist", "support"],
                &[
                    "I can help you!",
                    "Ask me anything!",
                    "I'm here to assist you. What do you need?",
                    "Of course, I'll do my best to support you.",
                ],
            ),
            KeywordEntry::new(
                "sad feelings",
                &["feeling sad", "depressed", "unhappy", "feeling down"],
                &["Man up soldier! Ah, just kidding...", "Me too..."],
            ),
            KeywordEntry::new(
                "happy feelings",
                &["feeling happy", "happy"],
                &["Oh happy days!", "Me too!"],
            ),
            KeywordEntry::new(
                "smalltalk",
                &["what's your name", "who are you", "what are you"],
                &[
                    "I'm your friendly chatbot!",
                    "You can call me ChatBot 309",
                    "I'm a simple bot, here to keep you company.",
                ],
            ),
        ];
        Self { entries }
    }

    /// Table with the given entries, in order.
    pub fn from_entries(entries: Vec<KeywordEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[KeywordEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry whose keyword list contains `keyword` exactly.
    pub fn find_by_keyword(&self, keyword: &str) -> Option<&KeywordEntry> {
        self.entries
            .iter()
            .find(|e| e.keywords.iter().any(|k| k == keyword))
    }

    /// First entry, in table order, with a keyword contained in `text`.
    pub fn find_matching_entry(&self, text: &str) -> Option<&KeywordEntry> {
        self.entries.iter().find(|e| e.matches(text))
    }

    /// Add an answer for `keyword`, extending the owning entry if there is one.
    ///
    /// Both inputs are trimmed and the keyword is lowercased, so a keyword
    /// never ends up in two entries.
    pub fn append_answer(&mut self, keyword: &str, answer: &str) -> Result<AppendOutcome, KeywordError> {
        let keyword = keyword.trim().to_lowercase();
        let answer = answer.trim().to_string();
        if keyword.is_empty() {
            return Err(KeywordError::EmptyKeyword);
        }
        if answer.is_empty() {
            return Err(KeywordError::EmptyAnswer);
        }

        let existing = self
            .entries
            .iter_mut()
            .find(|e| e.keywords.iter().any(|k| *k == keyword));

        match existing {
            Some(entry) => {
                entry.answers.push(answer.clone());
                Ok(AppendOutcome::ExtendedEntry { keyword, answer })
            }
            None => {
                self.entries.push(KeywordEntry {
                    category: None,
                    keywords: vec![keyword.clone()],
                    answers: vec![answer.clone()],
                });
                Ok(AppendOutcome::NewEntry { keyword, answer })
            }
        }
    }
}

/// Uniformly random answer from `entry`, `None` if it has no answers.
pub fn pick_random_answer<'a, R: Rng + ?Sized>(entry: &'a KeywordEntry, rng: &mut R) -> Option<&'a str> {
    entry.answers.choose(rng).map(String::as_str)
}
