//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending a question
//! to the API.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Print the conversation so far.
    History,

    /// Display session statistics.
    Stats,

    /// Drop the current API key and fetch a new one.
    ReloadKey,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command,
/// or `None` if it should be treated as a question.
///
/// # Examples
///
/// ```
/// # use finchat::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/history").is_some());
/// assert!(parse_command("Как накопить на пенсию?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "history" => ChatCommand::History,
        "stats" | "status" => ChatCommand::Stats,
        "reload-key" | "reload_key" => ChatCommand::ReloadKey,
        "" => ChatCommand::Invalid("Empty command. Type /help for commands.".to_string()),
        other => ChatCommand::Invalid(format!("Unknown command: /{other}")),
    };

    if argument.is_some() && !matches!(result, ChatCommand::Invalid(_)) {
        return Some(ChatCommand::Invalid(format!(
            "/{command} does not take an argument"
        )));
    }

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /history               Show the conversation so far
  /stats                 Show session statistics
  /reload-key            Fetch the API key again
  /help                  Show this help message
  /quit                  Exit the chat
Anything else is sent to the advisor as a question."#
}
