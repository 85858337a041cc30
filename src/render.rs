//! Output surfaces for the chat session.
//!
//! The session drives three surfaces: the transcript, a single-line error
//! banner, and the diagnostic log.  [`Renderer`] abstracts over where they go.
//! [`PlainTextRenderer`] writes to the terminal and [`RecordingRenderer`]
//! keeps everything in memory.

use std::io::{self, Stdout, Write};

use crate::types::{ChatMessage, LogEntry, LogLevel, MessageRole};

/// ANSI escape code for dim text (used for the diagnostic log).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the assistant label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for warnings).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for red text (used for the error banner).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering session output.
pub trait Renderer: Send {
    /// Append a message to the transcript.
    fn print_message(&mut self, message: &ChatMessage);

    /// Replace the error banner.
    fn print_error(&mut self, error: &str);

    /// Clear the error banner.
    fn clear_error(&mut self) {}

    /// Append a line to the diagnostic log.
    fn print_log(&mut self, entry: &LogEntry);

    /// Print an informational message that is not part of the conversation.
    fn print_info(&mut self, info: &str);
}

/// Terminal renderer.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    show_log: bool,
}

impl PlainTextRenderer {
    /// Creates a renderer with colors and the diagnostic log enabled.
    pub fn new() -> Self {
        Self::with_options(true, true)
    }

    /// Creates a renderer with explicit color and log settings.
    pub fn with_options(use_color: bool, show_log: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            show_log,
        }
    }

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
    fn print_message(&mut self, message: &ChatMessage) {
        match message.role {
            // The user's own line is already on screen from the prompt.
            MessageRole::User | MessageRole::System => {}
            MessageRole::Assistant => {
                if self.use_color {
                    println!("{ANSI_CYAN}Advisor:{ANSI_RESET} {}", message.content);
                } else {
                    println!("Advisor: {}", message.content);
                }
            }
        }
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_log(&mut self, entry: &LogEntry) {
        if !self.show_log {
            return;
        }
        if self.use_color {
            let color = match entry.level {
                LogLevel::Info => ANSI_DIM,
                LogLevel::Warn => ANSI_YELLOW,
                LogLevel::Error => ANSI_RED,
            };
            eprintln!("{color}{entry}{ANSI_RESET}");
        } else {
            eprintln!("{entry}");
        }
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
        self.flush();
    }
}

/// Renderer that records every surface in memory.
///
/// Useful for embedding the session behind another UI and for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    /// Messages in the order they were appended.
    pub transcript: Vec<ChatMessage>,
    /// The current error banner, if set.
    pub error: Option<String>,
    /// Every diagnostic line.
    pub log: Vec<LogEntry>,
    /// Informational messages.
    pub info: Vec<String>,
}

impl RecordingRenderer {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostic lines whose message contains `needle`.
    pub fn log_lines_containing(&self, needle: &str) -> usize {
        self.log
            .iter()
            .filter(|entry| entry.message.contains(needle))
            .count()
    }
}

impl Renderer for RecordingRenderer {
    fn print_message(&mut self, message: &ChatMessage) {
        self.transcript.push(message.clone());
    }

    fn print_error(&mut self, error: &str) {
        self.error = Some(error.to_string());
    }

    fn clear_error(&mut self) {
        self.error = None;
    }

    fn print_log(&mut self, entry: &LogEntry) {
        self.log.push(entry.clone());
    }

    fn print_info(&mut self, info: &str) {
        self.info.push(info.to_string());
    }
}
