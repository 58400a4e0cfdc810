//! Print the statistics of a transcript file without starting the server.
//!
//! Usage: cargo run --bin transcript_stats <messages.json> [--list]

use std::path::Path;

use replybot::chatbot::TranscriptStore;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args.len() > 3 || (args.len() == 3 && args[2] != "--list") {
        eprintln!("Usage: {} <messages.json> [--list]", args[0]);
        eprintln!();
        eprintln!("Summarize a replybot transcript file.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  messages.json  Path to the transcript (data/messages.json by default)");
        eprintln!("  --list         Also print every message");
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);
    let list = args.get(2).is_some();

    let transcript = match TranscriptStore::with_path(path).load() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("ERROR: {e}");
            std::process::exit(1);
        }
    };

    let summary = transcript.summary();
    println!("Transcript: {:?}", path);
    println!("Total messages: {}", summary.total_count);
    println!("User messages:  {}", summary.user_count);
    println!("Bot messages:   {}", summary.bot_count);

    if !summary.category_counts.is_empty() {
        println!();
        println!("Bot replies by category:");
        let width = summary.category_counts.keys().map(|k| k.len()).max().unwrap_or(0);
        for (category, count) in &summary.category_counts {
            println!("  {category:<width$}  {count}");
        }
    }

    if list {
        println!();
        for msg in &summary.messages {
            println!("[{}] {} ({}): {}", msg.time, msg.sender, msg.category, msg.text);
        }
    }
}
