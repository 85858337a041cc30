// Public modules
pub mod chat_message;
pub mod completion;
pub mod credential;
pub mod log_entry;

// Re-exports
pub use chat_message::{ChatMessage, MessageRole};
pub use completion::{ChatCompletion, ChatCompletionParams, Choice, ChoiceMessage, CompletionUsage};
pub use credential::Credential;
pub use log_entry::{LogEntry, LogLevel};
