//! Chat application module for conversations with the financial advisor.
//!
//! This module provides the session that ties the key server and the
//! completion API together, plus the pieces the `finchat` REPL needs:
//!
//! - Lazy, retried API key loading
//! - An append-only conversation log mirrored to the transcript
//! - Slash commands for session control
//! - Configuration from defaults, a YAML file, and the command line
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`conversation`]: The append-only conversation log
//! - [`session`]: Core chat session management and API interaction
//! - [`commands`]: Slash command parsing and handling

mod commands;
mod config;
mod conversation;
mod session;

pub use crate::render::{PlainTextRenderer, RecordingRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{
    ChatArgs, ChatConfig, ConfigFile, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT,
    DEFAULT_TEMPERATURE,
};
pub use conversation::ConversationLog;
pub use session::{ChatSession, SessionStats};
