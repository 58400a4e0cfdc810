//! Transcript message types.

use chrono::Local;
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use tracing::warn;

/// Category stored on every user message.
pub const USER_INPUT_CATEGORY: &str = "user-input";

/// Default layout for message timestamps (day.month.year hour.minute.second).
pub const DEFAULT_TIME_FORMAT: &str = "%d.%m.%Y %H.%M.%S";

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sender {
    User,
    Bot,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "User"),
            Sender::Bot => write!(f, "Bot"),
        }
    }
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    pub time: String,
    pub category: String,
}

impl Message {
    /// A user message, stored with its original text.
    pub fn user(text: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            time: time.into(),
            category: USER_INPUT_CATEGORY.to_string(),
        }
    }

    /// A bot reply labelled with its category.
    pub fn bot(text: impl Into<String>, time: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
            time: time.into(),
            category: category.into(),
        }
    }

    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }
}

/// True when chrono can render every specifier in `format`.
pub fn is_valid_time_format(format: &str) -> bool {
    StrftimeItems::new(format).all(|item| !matches!(item, Item::Error))
}

/// Current local time rendered with `format`, or with the default layout
/// when `format` can't be rendered.
pub fn timestamp(format: &str) -> String {
    let now = Local::now();
    let mut out = String::new();
    if write!(out, "{}", now.format(format)).is_err() {
        warn!("Unusable time format {:?}, using default", format);
        return now.format(DEFAULT_TIME_FORMAT).to_string();
    }
    out
}
