use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{ChatMessage, MessageRole};

/// Request body for `POST /chat/completions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionParams {
    /// The model that will complete the prompt.
    pub model: String,

    /// System instruction followed by the user's question.
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature.
    pub temperature: f32,

    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl ChatCompletionParams {
    /// Build a single-question request: one system message, one user message.
    pub fn new(
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        question: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::system(system_prompt), ChatMessage::user(question)],
            temperature,
            max_tokens,
        }
    }
}

/// Token accounting reported by the API.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionUsage {
    /// Tokens in the prompt.
    #[serde(default)]
    pub prompt_tokens: u64,

    /// Tokens in the generated reply.
    #[serde(default)]
    pub completion_tokens: u64,
}

/// The message inside a completion choice.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChoiceMessage {
    /// Role reported by the API; normally `assistant`.
    #[serde(default)]
    pub role: Option<MessageRole>,

    /// Generated text.
    #[serde(default)]
    pub content: Option<String>,
}

/// One candidate reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    /// Position of the choice in the response.
    #[serde(default)]
    pub index: u32,

    /// The generated message.
    #[serde(default)]
    pub message: ChoiceMessage,

    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Response body for `POST /chat/completions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletion {
    /// Completion identifier.
    #[serde(default)]
    pub id: Option<String>,

    /// Model that produced the completion.
    #[serde(default)]
    pub model: Option<String>,

    /// Candidate replies; only the first is used.
    #[serde(default)]
    pub choices: Vec<Choice>,

    /// Token usage, when reported.
    #[serde(default)]
    pub usage: Option<CompletionUsage>,
}

impl ChatCompletion {
    /// The text of the first choice.
    ///
    /// Fails with [`Error::MalformedResponse`] when there are no choices or the
    /// first choice carries no content.
    pub fn reply_text(&self) -> Result<&str> {
        let choice = self
            .choices
            .first()
            .ok_or_else(|| Error::malformed_response("response contains no choices"))?;
        choice
            .message
            .content
            .as_deref()
            .ok_or_else(|| Error::malformed_response("first choice has no message content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_wire_shape() {
        let params = ChatCompletionParams::new(
            "deepseek-chat",
            "Вы финансовый ИИ-консультант.",
            "Как накопить на пенсию?",
            0.7,
            512,
        );
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["model"], "deepseek-chat");
        assert_eq!(value["max_tokens"], 512);
        let temperature = value["temperature"].as_f64().unwrap();
        assert!((temperature - 0.7).abs() < 1e-6);
        assert_eq!(
            value["messages"],
            json!([
                {"role": "system", "content": "Вы финансовый ИИ-консультант."},
                {"role": "user", "content": "Как накопить на пенсию?"}
            ])
        );
    }

    #[test]
    fn reply_text_from_first_choice() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "id": "cmpl-1",
            "model": "deepseek-chat",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "Откладывайте 15% дохода."}, "finish_reason": "stop"},
                {"index": 1, "message": {"role": "assistant", "content": "ignored"}}
            ],
            "usage": {"prompt_tokens": 20, "completion_tokens": 7, "total_tokens": 27}
        }))
        .unwrap();
        assert_eq!(completion.reply_text().unwrap(), "Откладывайте 15% дохода.");
        assert_eq!(
            completion.usage,
            Some(CompletionUsage {
                prompt_tokens: 20,
                completion_tokens: 7
            })
        );
    }

    #[test]
    fn reply_text_missing_pieces() {
        let empty: ChatCompletion = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(empty.reply_text().unwrap_err().is_malformed_response());

        let no_content: ChatCompletion =
            serde_json::from_value(json!({"choices": [{"message": {"role": "assistant"}}]}))
                .unwrap();
        assert!(no_content.reply_text().unwrap_err().is_malformed_response());
    }
}
