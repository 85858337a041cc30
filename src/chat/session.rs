//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the credential and
//! the conversation log and runs the question/answer cycle against the key
//! server and the completion API.

use crate::chat::config::ChatConfig;
use crate::chat::conversation::ConversationLog;
use crate::client::{CompletionBackend, DeepSeek};
use crate::error::{Error, MSG_KEY_EXHAUSTED, Result};
use crate::key_loader::load_with_retry;
use crate::key_server::{KeyServer, KeySource};
use crate::observability::QUESTIONS_REJECTED;
use crate::render::Renderer;
use crate::retry::RetryPolicy;
use crate::types::{ChatCompletionParams, ChatMessage, Credential, LogEntry, MessageRole};

/// Number of reply characters echoed to the diagnostic log.
const REPLY_PREVIEW_CHARS: usize = 100;

/// A chat session: one credential, one conversation.
///
/// Questions are processed one at a time; [`ChatSession::get_response`] takes
/// `&mut self`, so a reply can never land after a newer question was asked.
pub struct ChatSession<K: KeySource = KeyServer, B: CompletionBackend = DeepSeek> {
    config: ChatConfig,
    key_source: K,
    backend: B,
    credential: Option<Credential>,
    log: ConversationLog,
    request_count: u64,
    failed_requests: u64,
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    /// The model used for the session.
    pub model: String,
    /// The number of messages in the conversation.
    pub message_count: usize,
    /// Questions asked.
    pub user_messages: usize,
    /// Replies received.
    pub assistant_messages: usize,
    /// Whether a credential is currently held.
    pub has_credential: bool,
    /// Completion requests sent.
    pub total_requests: u64,
    /// Completion requests that failed.
    pub failed_requests: u64,
    /// Prompt tokens reported by the API.
    pub total_prompt_tokens: u64,
    /// Completion tokens reported by the API.
    pub total_completion_tokens: u64,
}

impl ChatSession {
    /// Creates a session talking HTTP to the endpoints named in `config`.
    pub fn new(config: ChatConfig) -> Result<Self> {
        let key_source = KeyServer::with_options(Some(&config.key_url), Some(config.timeout))?;
        let backend = DeepSeek::with_options(Some(&config.api_url), Some(config.timeout))?;
        Ok(Self::with_backends(config, key_source, backend))
    }
}

impl<K: KeySource, B: CompletionBackend> ChatSession<K, B> {
    /// Creates a session with custom key and completion backends.
    pub fn with_backends(config: ChatConfig, key_source: K, backend: B) -> Self {
        Self {
            config,
            key_source,
            backend,
            credential: None,
            log: ConversationLog::new(),
            request_count: 0,
            failed_requests: 0,
            prompt_tokens: 0,
            completion_tokens: 0,
        }
    }

    /// Fetches a credential with the given retry policy.
    ///
    /// Returns `true` and stores the credential on success.  On exhaustion the
    /// stored credential is left as it was, the error banner is set, and
    /// `false` is returned.
    pub async fn load_credential(
        &mut self,
        policy: &RetryPolicy,
        renderer: &mut dyn Renderer,
    ) -> bool {
        self.try_load_credential(policy, renderer).await.is_ok()
    }

    /// Drops the current credential and fetches a fresh one with the configured policy.
    pub async fn reload_credential(&mut self, renderer: &mut dyn Renderer) -> bool {
        self.credential = None;
        let policy = self.config.key_retry;
        self.load_credential(&policy, renderer).await
    }

    /// Asks `question` and appends the exchange to the conversation.
    ///
    /// Every outcome is reported through the renderer: the transcript, the
    /// error banner, and the diagnostic log.  The returned error carries the
    /// typed cause.  A question that passed validation stays in the
    /// conversation even when no reply arrives.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyQuestion`] for an empty question; nothing is sent or appended.
    /// - [`Error::CredentialUnavailable`] when no credential could be loaded.
    /// - Request errors from the completion backend, or
    ///   [`Error::MalformedResponse`] when the reply has no text.
    pub async fn get_response(
        &mut self,
        question: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<()> {
        renderer.clear_error();
        let question = question.trim();
        renderer.print_log(&LogEntry::info(format!("User asked: \"{question}\"")));

        if question.is_empty() {
            QUESTIONS_REJECTED.click();
            let err = Error::empty_question();
            renderer.print_error(err.user_message());
            renderer.print_log(&LogEntry::warn("Rejected empty question."));
            return Err(err);
        }

        self.append(ChatMessage::user(question), renderer);

        let credential = match self.credential.clone() {
            Some(credential) => credential,
            None => {
                let policy = self.config.key_retry;
                match self.try_load_credential(&policy, renderer).await {
                    Ok(credential) => credential,
                    Err(err) => {
                        renderer.print_error(err.user_message());
                        renderer.print_log(&LogEntry::error(
                            "API key unavailable; question not sent.",
                        ));
                        return Err(err);
                    }
                }
            }
        };

        let params = ChatCompletionParams::new(
            &self.config.model,
            &self.config.system_prompt,
            question,
            self.config.temperature,
            self.config.max_tokens,
        );
        renderer.print_log(&LogEntry::info(format!(
            "Sending request to {}...",
            self.config.model
        )));
        self.request_count = self.request_count.saturating_add(1);

        let outcome = self
            .backend
            .complete(&credential, &params)
            .await
            .and_then(|completion| {
                let reply = completion.reply_text()?.to_string();
                Ok((reply, completion.usage))
            });

        let (reply, usage) = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                self.failed_requests = self.failed_requests.saturating_add(1);
                renderer.print_error(err.user_message());
                let mut line = match err.status_code() {
                    Some(status) => format!("Error during API request (HTTP {status}): {err}"),
                    None => format!("Error during API request: {err}"),
                };
                if let Some(request_id) = err.request_id() {
                    line.push_str(&format!(" [request id {request_id}]"));
                }
                renderer.print_log(&LogEntry::error(line));
                return Err(err);
            }
        };

        renderer.print_log(&LogEntry::info("Received response."));
        renderer.print_log(&LogEntry::info(format!(
            "Response preview: {}",
            preview(&reply, REPLY_PREVIEW_CHARS)
        )));
        if let Some(usage) = usage {
            self.prompt_tokens = self.prompt_tokens.saturating_add(usage.prompt_tokens);
            self.completion_tokens = self
                .completion_tokens
                .saturating_add(usage.completion_tokens);
        }
        self.append(ChatMessage::assistant(reply), renderer);
        Ok(())
    }

    /// The conversation so far.
    pub fn conversation(&self) -> &ConversationLog {
        &self.log
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.log.len()
    }

    /// Whether a credential is held.
    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// The active configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// The key source.
    pub fn key_source(&self) -> &K {
        &self.key_source
    }

    /// The completion backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.config.model.clone(),
            message_count: self.log.len(),
            user_messages: self.log.count(MessageRole::User),
            assistant_messages: self.log.count(MessageRole::Assistant),
            has_credential: self.has_credential(),
            total_requests: self.request_count,
            failed_requests: self.failed_requests,
            total_prompt_tokens: self.prompt_tokens,
            total_completion_tokens: self.completion_tokens,
        }
    }

    async fn try_load_credential(
        &mut self,
        policy: &RetryPolicy,
        renderer: &mut dyn Renderer,
    ) -> Result<Credential> {
        match load_with_retry(&self.key_source, policy, renderer).await {
            Ok(credential) => {
                self.credential = Some(credential.clone());
                Ok(credential)
            }
            Err(err) => {
                renderer.print_error(MSG_KEY_EXHAUSTED);
                Err(err)
            }
        }
    }

    // Log and transcript are written together so they never disagree.
    fn append(&mut self, message: ChatMessage, renderer: &mut dyn Renderer) {
        if let Some(stored) = self.log.push(message) {
            renderer.print_message(stored);
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
