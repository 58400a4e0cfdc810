//! Rule-based chat responder: keyword matching, transcript and HTTP surface.

pub mod chatbot;
pub mod config;
pub mod server;
