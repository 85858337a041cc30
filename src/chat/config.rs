//! Configuration types for the chat application.
//!
//! Settings come from three layers, later ones winning: built-in defaults, an
//! optional YAML file, and command-line arguments parsed via `arrrg`.

use std::path::Path;
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::client::{DEFAULT_API_URL, DEFAULT_TIMEOUT};
use crate::error::{Error, Result};
use crate::key_server::DEFAULT_KEY_URL;
use crate::retry::{Backoff, RetryPolicy};

/// Default model.
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// Default system instruction: a financial advisor answering in Russian.
pub const DEFAULT_SYSTEM_PROMPT: &str = "Вы финансовый ИИ-консультант. Предоставляйте точные и полезные финансовые советы на русском языке.";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default maximum tokens per response.
pub const DEFAULT_MAX_TOKENS: u32 = 512;

/// Command-line arguments for the finchat tool.
#[derive(CommandLine, Debug, Default, Eq, PartialEq)]
pub struct ChatArgs {
    /// YAML configuration file.
    #[arrrg(optional, "YAML configuration file", "PATH")]
    pub config: Option<String>,

    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: deepseek-chat)", "MODEL")]
    pub model: Option<String>,

    /// System prompt sent ahead of every question.
    #[arrrg(optional, "System prompt for every question", "PROMPT")]
    pub system: Option<String>,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response (default: 512)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature, parsed when the config is resolved.
    #[arrrg(optional, "Sampling temperature (default: 0.7)", "TEMP")]
    pub temperature: Option<String>,

    /// Key server endpoint.
    #[arrrg(optional, "Key server URL (default: http://localhost:3001/get-api-key)", "URL")]
    pub key_url: Option<String>,

    /// Chat completions endpoint.
    #[arrrg(optional, "Chat completions URL", "URL")]
    pub api_url: Option<String>,

    /// Attempts at fetching the API key.
    #[arrrg(optional, "Attempts at fetching the API key (default: 3)", "N")]
    pub key_attempts: Option<u32>,

    /// Fixed delay between key attempts.
    #[arrrg(optional, "Delay between key attempts in ms (default: 1000)", "MS")]
    pub key_backoff_ms: Option<u64>,

    /// HTTP timeout.
    #[arrrg(optional, "HTTP timeout in seconds (default: 60)", "SECS")]
    pub timeout_secs: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Hide the diagnostic log.
    #[arrrg(flag, "Hide the diagnostic log")]
    pub quiet_log: bool,
}

/// The YAML configuration file.  Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Model name.
    pub model: Option<String>,
    /// System prompt.
    pub system_prompt: Option<String>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Maximum tokens per response.
    pub max_tokens: Option<u32>,
    /// Key server endpoint.
    pub key_url: Option<String>,
    /// Chat completions endpoint.
    pub api_url: Option<String>,
    /// Attempts at fetching the API key.
    pub key_attempts: Option<u32>,
    /// Backoff between key attempts.
    pub key_backoff: Option<Backoff>,
    /// HTTP timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Whether to use ANSI colors.
    pub color: Option<bool>,
    /// Whether to print the diagnostic log.
    pub show_log: Option<bool>,
}

impl ConfigFile {
    /// Parses a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Reads and parses a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            Error::config_caused_by(format!("failed to read config {}", path.display()), err)
        })?;
        Self::from_yaml(&content)
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// the config file and command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: String,

    /// System instruction sent with every question.
    pub system_prompt: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Maximum tokens per response.
    pub max_tokens: u32,

    /// Key server endpoint.
    pub key_url: String,

    /// Chat completions endpoint.
    pub api_url: String,

    /// Retry policy used when a question needs a credential.
    pub key_retry: RetryPolicy,

    /// HTTP timeout for both endpoints.
    pub timeout: Duration,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether to print the diagnostic log.
    pub show_log: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    pub fn new() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            key_url: DEFAULT_KEY_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            key_retry: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            use_color: true,
            show_log: true,
        }
    }

    /// Resolves defaults, the optional config file, then the arguments.
    pub fn from_args(args: ChatArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => ConfigFile::from_path(path)?,
            None => ConfigFile::default(),
        };
        Self::new().apply_file(file)?.apply_args(args)
    }

    /// Overlays the values present in a config file.
    pub fn apply_file(mut self, file: ConfigFile) -> Result<Self> {
        if let Some(model) = file.model {
            self.model = model;
        }
        if let Some(prompt) = file.system_prompt {
            self.system_prompt = prompt;
        }
        if let Some(temperature) = file.temperature {
            self.temperature = temperature;
        }
        if let Some(max_tokens) = file.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(url) = file.key_url {
            self.key_url = url;
        }
        if let Some(url) = file.api_url {
            self.api_url = url;
        }
        if file.key_attempts.is_some() || file.key_backoff.is_some() {
            self.key_retry = RetryPolicy::new(
                file.key_attempts.unwrap_or(self.key_retry.max_attempts()),
                file.key_backoff.unwrap_or(self.key_retry.backoff()),
            )?;
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(color) = file.color {
            self.use_color = color;
        }
        if let Some(show_log) = file.show_log {
            self.show_log = show_log;
        }
        Ok(self)
    }

    /// Overlays command-line arguments.
    pub fn apply_args(mut self, args: ChatArgs) -> Result<Self> {
        if let Some(model) = args.model {
            self.model = model;
        }
        if let Some(prompt) = args.system {
            self.system_prompt = prompt;
        }
        if let Some(max_tokens) = args.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(temperature) = args.temperature {
            self.temperature = parse_temperature(&temperature)?;
        }
        if let Some(url) = args.key_url {
            self.key_url = url;
        }
        if let Some(url) = args.api_url {
            self.api_url = url;
        }
        if args.key_attempts.is_some() || args.key_backoff_ms.is_some() {
            let backoff = args
                .key_backoff_ms
                .map(|ms| Backoff::fixed(Duration::from_millis(ms)))
                .unwrap_or(self.key_retry.backoff());
            self.key_retry = RetryPolicy::new(
                args.key_attempts.unwrap_or(self.key_retry.max_attempts()),
                backoff,
            )?;
        }
        if let Some(secs) = args.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if args.no_color {
            self.use_color = false;
        }
        if args.quiet_log {
            self.show_log = false;
        }
        Ok(self)
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the key server endpoint.
    pub fn with_key_url(mut self, url: impl Into<String>) -> Self {
        self.key_url = url.into();
        self
    }

    /// Sets the completion endpoint.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Sets the key retry policy.
    pub fn with_key_retry(mut self, policy: RetryPolicy) -> Self {
        self.key_retry = policy;
        self
    }

    /// Sets the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_temperature(value: &str) -> Result<f32> {
    match value.trim().parse::<f32>() {
        Ok(temperature) if temperature.is_finite() && temperature >= 0.0 => Ok(temperature),
        _ => Err(Error::config(
            format!("not a valid temperature: {value:?}"),
            Some("temperature".to_string()),
        )),
    }
}
