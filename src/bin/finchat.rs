//! Interactive chat with a financial advisor.
//!
//! This binary provides a REPL for asking the DeepSeek chat completions API
//! financial questions.  The API key is fetched from a local key server at
//! startup and again on demand.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings
//! finchat
//!
//! # Point at a different key server and retry harder
//! finchat --key-url http://localhost:4000/get-api-key --key-attempts 5
//!
//! # Load settings from a YAML file, hide the diagnostic log
//! finchat --config finchat.yaml --quiet-log
//! ```
//!
//! # Commands
//!
//! - `/help` - Show available commands
//! - `/history` - Show the conversation so far
//! - `/stats` - Show session statistics
//! - `/reload-key` - Fetch the API key again
//! - `/quit` - Exit the application

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use finchat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use finchat::MessageRole;

/// Main entry point for the finchat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("finchat [OPTIONS]");
    let config = ChatConfig::from_args(args)?;
    let mut renderer = PlainTextRenderer::with_options(config.use_color, config.show_log);

    let mut session = ChatSession::new(config)?;
    let mut rl = DefaultEditor::new()?;

    println!("Financial advisor chat (model: {})", session.config().model);
    println!("Type /help for commands, /quit to exit\n");

    // Load the key up front; questions retry on their own if this fails.
    let policy = session.config().key_retry;
    session.load_credential(&policy, &mut renderer).await;

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());

                if let Some(cmd) = parse_command(&line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::History => print_history(&session),
                        ChatCommand::Stats => print_stats(&session),
                        ChatCommand::ReloadKey => {
                            if session.reload_credential(&mut renderer).await {
                                renderer.print_info("API key reloaded.");
                            }
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Errors are already on the banner and in the log.
                let _ = session.get_response(&line, &mut renderer).await;
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn print_history(session: &ChatSession) {
    let messages = session.conversation().messages();
    if messages.is_empty() {
        println!("    (no messages yet)");
        return;
    }
    for message in messages {
        let label = match message.role {
            MessageRole::User => "You",
            MessageRole::Assistant => "Advisor",
            MessageRole::System => "System",
        };
        println!("    {label}: {}", message.content);
    }
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Model: {}", stats.model);
    println!(
        "      Messages: {} ({} questions, {} replies)",
        stats.message_count, stats.user_messages, stats.assistant_messages
    );
    println!(
        "      API key: {}",
        if stats.has_credential {
            "loaded"
        } else {
            "not loaded"
        }
    );
    println!(
        "      Requests: {} ({} failed)",
        stats.total_requests, stats.failed_requests
    );
    println!(
        "      Total tokens: {} in / {} out",
        stats.total_prompt_tokens, stats.total_completion_tokens
    );
}
