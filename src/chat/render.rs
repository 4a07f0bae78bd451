//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction that allows
//! for different output styles. The default implementation uses ANSI
//! escape codes to tell the two speakers apart.

use std::io::{self, Stdout, Write};

use crate::conversation::ConversationState;
use crate::types::{Message, Role};

/// ANSI escape code for bold text (used for speaker labels).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for dim text (used for info lines).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the user label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the assistant label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
pub trait Renderer: Send {
    /// Show one message of the conversation.
    fn show_message(&mut self, message: &Message);

    /// Show the whole conversation, oldest first.
    fn show_history(&mut self, conversation: &ConversationState) {
        if conversation.is_empty() {
            self.print_info("(no messages yet)");
            return;
        }
        for message in conversation {
            self.show_message(message);
        }
    }

    /// Print an error message in place of an assistant reply.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Plain text renderer with optional ANSI styling.
///
/// Messages and info go to stdout; errors go to stderr.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    /// Whether ANSI styling is enabled.
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    fn format_message(&self, message: &Message) -> String {
        let (label, color) = match message.role() {
            Role::User => ("you", ANSI_CYAN),
            Role::Assistant => ("assistant", ANSI_GREEN),
        };
        if self.use_color {
            format!(
                "{ANSI_BOLD}{color}{label}>{ANSI_RESET} {}\n",
                message.content()
            )
        } else {
            format!("{label}> {}\n", message.content())
        }
    }

    fn format_error(&self, error: &str) -> String {
        if self.use_color {
            format!("{ANSI_RED}{error}{ANSI_RESET}")
        } else {
            error.to_string()
        }
    }

    fn format_info(&self, info: &str) -> String {
        if self.use_color {
            format!("{ANSI_DIM}{info}{ANSI_RESET}")
        } else {
            info.to_string()
        }
    }

    /// Flushes stdout so output shows up before the next prompt.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn show_message(&mut self, message: &Message) {
        let text = self.format_message(message);
        print!("{text}");
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        eprintln!("{}", self.format_error(error));
    }

    fn print_info(&mut self, info: &str) {
        println!("{}", self.format_info(info));
        self.flush();
    }
}
