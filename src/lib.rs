//! A financial-advisor chat client for the DeepSeek chat completions API.
//!
//! The API key is fetched on demand from a local key server, with bounded
//! retries.  Questions and replies are kept in an append-only conversation
//! log and reported through a [`Renderer`].
//!
//! ```no_run
//! use finchat::chat::{ChatConfig, ChatSession};
//! use finchat::RecordingRenderer;
//!
//! # async fn run() -> finchat::Result<()> {
//! let mut session = ChatSession::new(ChatConfig::default())?;
//! let mut renderer = RecordingRenderer::new();
//! session.get_response("Как накопить на пенсию?", &mut renderer).await?;
//! # Ok(())
//! # }
//! ```

// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod key_loader;
pub mod key_server;
pub mod observability;
pub mod render;
pub mod retry;
pub mod types;
pub mod utils;

// Re-exports
pub use client::{CompletionBackend, DeepSeek};
pub use error::{Error, Result};
pub use key_server::{KeyServer, KeySource};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, RecordingRenderer, Renderer};
pub use retry::{Backoff, RetryPolicy};
pub use types::*;
