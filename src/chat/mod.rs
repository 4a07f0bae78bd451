//! Terminal chat front end for the groqchat library.
//!
//! This module provides a line-oriented REPL built on top of
//! [`crate::ChatSession`]. It supports:
//!
//! - ANSI-styled output for the two speakers and for errors
//! - Slash commands for session control
//! - Configurable model, system prompt, and sampling parameters
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: Slash command parsing
//! - [`render`]: Output rendering

mod commands;
mod config;
mod render;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use render::{PlainTextRenderer, Renderer};
