//! Reply engine - picks a canned reply for a sanitized user message.
//!
//! A message is validated, split into segments on `.`, `,`, `!` and `?`,
//! and each segment is answered on its own. The replies are joined with a
//! single space. The category of the last matching segment labels the whole
//! reply.

use rand::Rng;
use std::fmt;
use tracing::{debug, error};

use crate::chatbot::keywords::{KeywordTable, pick_random_answer};

/// Category of a reply that matched nothing.
pub const DEFAULT_CATEGORY: &str = "uncategorized";

/// Category of a reply produced after an internal fault.
pub const ERROR_CATEGORY: &str = "error";

const SEGMENT_DELIMITERS: [char; 4] = ['.', ',', '!', '?'];

const APOLOGY_REPLY: &str = "Sorry, something went wrong. Please try again.";
const FEELINGS_SUFFIX: &str = " Would you like me to tell you about how I feel?";
/// Unreachable today: the default table says "favours" and personalized
/// entries carry no category.
const FAVOUR_SUFFIX: &str = " Feel free to do me a favour if you want!";

/// Length bounds for an incoming message, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineLimits {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self { min_length: 2, max_length: 100 }
    }
}

/// Why a message was rejected before matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    Required,
    TooShort { min: usize },
    TooLong { max: usize },
}

impl ValidationError {
    /// The bot's side of the conversation when a message is rejected.
    pub fn prompt(&self) -> String {
        match self {
            Self::Required => "Write a message to chat.".to_string(),
            Self::TooShort { min } => {
                format!("Your message must contain at least {min} characters. Please try again.")
            }
            Self::TooLong { max } => {
                format!("Your message must not contain more than {max} characters. Please try again.")
            }
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "You must write a message."),
            Self::TooShort { min } => {
                write!(f, "The message must be at least {min} characters long.")
            }
            Self::TooLong { max } => write!(f, "Message too long (maximum {max} characters)!"),
        }
    }
}

/// Result of answering one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub bot_reply: String,
    pub category: String,
    pub validation_error: Option<ValidationError>,
}

impl Reply {
    fn rejected(err: ValidationError) -> Self {
        Self {
            bot_reply: err.prompt(),
            category: DEFAULT_CATEGORY.to_string(),
            validation_error: Some(err),
        }
    }

    fn apology() -> Self {
        Self {
            bot_reply: APOLOGY_REPLY.to_string(),
            category: ERROR_CATEGORY.to_string(),
            validation_error: None,
        }
    }
}

/// Faults while matching. Never leave the engine.
#[derive(Debug)]
enum MatchFault {
    EmptyAnswers { keywords: Vec<String> },
}

impl fmt::Display for MatchFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyAnswers { keywords } => {
                write!(f, "entry for {:?} has no answers", keywords)
            }
        }
    }
}

/// Answer for a single segment. `category: None` keeps the carried one.
struct SegmentAnswer {
    reply: String,
    category: Option<String>,
}

impl SegmentAnswer {
    fn fixed(reply: &str, category: &str) -> Self {
        Self { reply: reply.to_string(), category: Some(category.to_string()) }
    }
}

/// Replies collected so far plus the category carried between segments.
struct Accumulator {
    replies: Vec<String>,
    category: String,
}

impl Accumulator {
    fn new() -> Self {
        Self { replies: Vec::new(), category: DEFAULT_CATEGORY.to_string() }
    }

    fn push(mut self, answer: SegmentAnswer) -> Self {
        self.replies.push(answer.reply);
        if let Some(category) = answer.category {
            self.category = category;
        }
        self
    }
}

/// Keyword-driven reply engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplyEngine {
    limits: EngineLimits,
}

impl ReplyEngine {
    pub fn new(limits: EngineLimits) -> Self {
        Self { limits }
    }

    /// Check length bounds. Runs before anything touches the table.
    pub fn validate(&self, text: &str) -> Result<(), ValidationError> {
        let len = text.chars().count();
        if len == 0 {
            Err(ValidationError::Required)
        } else if len < self.limits.min_length {
            Err(ValidationError::TooShort { min: self.limits.min_length })
        } else if len > self.limits.max_length {
            Err(ValidationError::TooLong { max: self.limits.max_length })
        } else {
            Ok(())
        }
    }

    /// Answer a sanitized, lowercased message. Always produces a reply.
    ///
    /// `original` is the user's text before sanitizing and is only used for
    /// diagnostics.
    pub fn reply<R: Rng + ?Sized>(
        &self,
        text: &str,
        original: &str,
        table: &KeywordTable,
        rng: &mut R,
    ) -> Reply {
        if let Err(err) = self.validate(text) {
            debug!("Rejected {:?}: {}", original, err);
            return Reply::rejected(err);
        }

        match answer_segments(text, table, rng) {
            Ok(acc) => {
                let mut bot_reply = acc.replies.join(" ");
                bot_reply.push_str(category_suffix(&acc.category));
                Reply { bot_reply, category: acc.category, validation_error: None }
            }
            Err(fault) => {
                error!("Chatbot error for {:?}: {}", original, fault);
                Reply::apology()
            }
        }
    }
}

/// Split on the delimiter characters, trimming and dropping empty pieces.
pub fn segments(text: &str) -> impl Iterator<Item = &str> {
    text.split(SEGMENT_DELIMITERS)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn answer_segments<R: Rng + ?Sized>(
    text: &str,
    table: &KeywordTable,
    rng: &mut R,
) -> Result<Accumulator, MatchFault> {
    let acc = segments(text).try_fold(Accumulator::new(), |acc, segment| {
        answer_segment(segment, table, rng).map(|answer| acc.push(answer))
    })?;

    // Only delimiters, e.g. "?!"
    if acc.replies.is_empty() {
        return Ok(acc.push(SegmentAnswer { reply: not_understood(text), category: None }));
    }
    Ok(acc)
}

fn answer_segment<R: Rng + ?Sized>(
    segment: &str,
    table: &KeywordTable,
    rng: &mut R,
) -> Result<SegmentAnswer, MatchFault> {
    let lower = segment.to_lowercase();
    let has = |word: &str| lower.contains(word);

    if has("thank") && has("nothing") {
        return Ok(SegmentAnswer::fixed("That's not very nice...", "feelings"));
    }
    if has("thank") && has("help") {
        return Ok(SegmentAnswer::fixed("You're welcome! I'm here to help.", "help"));
    }
    if has("thank") {
        return Ok(SegmentAnswer::fixed("You're welcome!", "thanks"));
    }
    if has("sorry") {
        return Ok(SegmentAnswer::fixed("It's alright, no problem!", "feelings"));
    }

    match table.find_matching_entry(&lower) {
        Some(entry) => {
            let reply = pick_random_answer(entry, rng)
                .ok_or_else(|| MatchFault::EmptyAnswers { keywords: entry.keywords.clone() })?;
            Ok(SegmentAnswer { reply: reply.to_string(), category: entry.category.clone() })
        }
        None => Ok(SegmentAnswer { reply: not_understood(segment), category: None }),
    }
}

fn not_understood(segment: &str) -> String {
    format!("I don't understand your message: \"{segment}\". Please try and write something else.")
}

fn category_suffix(category: &str) -> &'static str {
    match category {
        "feelings" => FEELINGS_SUFFIX,
        "favour" => FAVOUR_SUFFIX,
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatbot::keywords::KeywordEntry;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn reply(text: &str) -> Reply {
        let table = KeywordTable::default_table();
        let mut rng = StdRng::seed_from_u64(42);
        ReplyEngine::default().reply(text, text, &table, &mut rng)
    }

    fn answers_of(category: &str) -> Vec<String> {
        KeywordTable::default_table()
            .entries()
            .iter()
            .find(|e| e.category.as_deref() == Some(category))
            .map(|e| e.answers.clone())
            .unwrap()
    }

    /// RNG that panics if consulted.
    struct UntouchableRng;

    impl rand::RngCore for UntouchableRng {
        fn next_u32(&mut self) -> u32 {
            panic!("rng consulted")
        }
        fn next_u64(&mut self) -> u64 {
            panic!("rng consulted")
        }
        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            panic!("rng consulted")
        }
        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            panic!("rng consulted")
        }
    }

    #[test]
    fn test_validation_short_circuits() {
        let table = KeywordTable::default_table();
        let engine = ReplyEngine::default();
        for text in ["", "h"] {
            let r = engine.reply(text, text, &table, &mut UntouchableRng);
            assert!(r.validation_error.is_some(), "{text:?}");
            assert_eq!(r.category, DEFAULT_CATEGORY);
            assert!(!r.bot_reply.is_empty());
        }
    }

    #[test]
    fn test_validation_kinds() {
        assert_eq!(reply("").validation_error, Some(ValidationError::Required));
        assert_eq!(reply("x").validation_error, Some(ValidationError::TooShort { min: 2 }));
        let long = "hello ".repeat(20);
        let r = reply(&long);
        assert_eq!(r.validation_error, Some(ValidationError::TooLong { max: 100 }));
        assert_eq!(r.bot_reply, "Your message must not contain more than 100 characters. Please try again.");
    }

    #[test]
    fn test_length_counts_characters() {
        // 50 two-byte characters fit in 100
        let text = "é".repeat(50);
        assert!(ReplyEngine::default().validate(&text).is_ok());
        assert!(ReplyEngine::default().validate(&"é".repeat(101)).is_err());
    }

    #[test]
    fn test_custom_limits() {
        let engine = ReplyEngine::new(EngineLimits { min_length: 5, max_length: 10 });
        assert_eq!(engine.validate("hey"), Err(ValidationError::TooShort { min: 5 }));
        assert_eq!(engine.validate("hello world"), Err(ValidationError::TooLong { max: 10 }));
        assert!(engine.validate("hello").is_ok());
    }

    #[test]
    fn test_thank_nothing() {
        let r = reply("thanks for nothing");
        assert_eq!(r.category, "feelings");
        assert_eq!(
            r.bot_reply,
            "That's not very nice... Would you like me to tell you about how I feel?"
        );
    }

    #[test]
    fn test_thank_help_beats_thanks() {
        let r = reply("thank you for your help");
        assert_eq!(r.category, "help");
        assert_eq!(r.bot_reply, "You're welcome! I'm here to help.");
    }

    #[test]
    fn test_thanks() {
        let r = reply("thanks a lot");
        assert_eq!(r.category, "thanks");
        assert_eq!(r.bot_reply, "You're welcome!");
    }

    #[test]
    fn test_sorry() {
        let r = reply("so sorry");
        assert_eq!(r.category, "feelings");
        assert!(r.bot_reply.starts_with("It's alright, no problem!"));
        assert!(r.bot_reply.ends_with(FEELINGS_SUFFIX));
    }

    #[test]
    fn test_table_match() {
        let r = reply("hello");
        assert_eq!(r.category, "hellos");
        assert!(answers_of("hellos").contains(&r.bot_reply));
        assert_eq!(r.validation_error, None);
    }

    #[test]
    fn test_fallback_embeds_segment() {
        let r = reply("qwerty");
        assert_eq!(r.category, DEFAULT_CATEGORY);
        assert_eq!(
            r.bot_reply,
            "I don't understand your message: \"qwerty\". Please try and write something else."
        );
    }

    #[test]
    fn test_segments_joined_with_space() {
        let r = reply("hello. thanks");
        let first = r.bot_reply.strip_suffix(" You're welcome!").unwrap();
        assert!(answers_of("hellos").contains(&first.to_string()));
        assert_eq!(r.category, "thanks");
    }

    #[test]
    fn test_segmentation_drops_empty_pieces() {
        let found: Vec<&str> = segments(" a,, b !?c. ").collect();
        assert_eq!(found, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_last_match_wins_and_unknown_keeps_category() {
        let r = reply("sorry, qwerty");
        assert_eq!(r.category, "feelings");
        assert!(r.bot_reply.contains("\"qwerty\""));
        assert!(r.bot_reply.ends_with(FEELINGS_SUFFIX));

        let r = reply("sorry, bye");
        assert_eq!(r.category, "goodbyes");
        assert!(!r.bot_reply.ends_with(FEELINGS_SUFFIX));
    }

    #[test]
    fn test_uncategorized_entry_keeps_carried_category() {
        let mut table = KeywordTable::default_table();
        table.append_answer("zzzkeyword", "zzzanswer").unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let r = ReplyEngine::default().reply("bye! zzzkeyword", "bye! zzzkeyword", &table, &mut rng);
        assert_eq!(r.category, "goodbyes");
        assert!(r.bot_reply.ends_with("zzzanswer"));
    }

    #[test]
    fn test_only_delimiters_still_replies() {
        let r = reply("?!");
        assert!(!r.bot_reply.is_empty());
        assert_eq!(r.category, DEFAULT_CATEGORY);
        assert_eq!(r.validation_error, None);
    }

    #[test]
    fn test_favour_suffix() {
        assert_eq!(category_suffix("favour"), FAVOUR_SUFFIX);
        assert_eq!(category_suffix("favours"), "");
        assert_eq!(category_suffix("feelings"), FEELINGS_SUFFIX);
    }

    #[test]
    fn test_empty_answers_degrades_to_apology() {
        let mut table = KeywordTable::new();
        table.append_answer("broken", "temp").unwrap();
        let mut entries: Vec<KeywordEntry> = table.entries().to_vec();
        entries[0].answers.clear();
        let table = KeywordTable::from_entries(entries);

        let mut rng = StdRng::seed_from_u64(3);
        let r = ReplyEngine::default().reply("broken", "broken", &table, &mut rng);
        assert_eq!(r.bot_reply, APOLOGY_REPLY);
        assert_eq!(r.category, ERROR_CATEGORY);
        assert_eq!(r.validation_error, None);
    }

    #[test]
    fn test_non_empty_reply_for_valid_lengths() {
        for text in ["ok", "hi there", "what's your name", "i am happy", "zz zz", "help me please"] {
            let r = reply(text);
            assert!(r.validation_error.is_none(), "{text}");
            assert!(!r.bot_reply.is_empty(), "{text}");
        }
    }

    #[test]
    fn test_random_answers_vary() {
        let table = KeywordTable::default_table();
        let engine = ReplyEngine::default();
        let mut rng = rand::thread_rng();
        let expected = answers_of("hellos");
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let r = engine.reply("hello", "hello", &table, &mut rng);
            assert!(expected.contains(&r.bot_reply));
            seen.insert(r.bot_reply);
        }
        assert!(seen.len() > 1);
    }
}
