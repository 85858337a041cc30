//! Error types for finchat.
//!
//! The variants follow what the chat session can tell apart: a question that
//! never left the prompt, a key that never arrived, and the ways a completion
//! request can fail.  The session reports errors to the user through
//! [`Error::user_message`] and keeps the full cause for the diagnostic log.

use std::error;
use std::fmt;
use std::sync::Arc;

/// Banner shown when the question is empty after trimming.
pub const MSG_EMPTY_QUESTION: &str = "Пожалуйста, введите финансовый вопрос.";

/// Banner shown when a question cannot be sent because no credential is held.
pub const MSG_CREDENTIAL_UNAVAILABLE: &str = "API-ключ не загружен. Проверьте сервер.";

/// Banner shown when the key loader gives up.
pub const MSG_KEY_EXHAUSTED: &str =
    "Не удалось загрузить API-ключ. Проверьте сервер (порт 3001) и повторите позже.";

/// Banner shown when the completion API rejects the credential.
pub const MSG_AUTHENTICATION: &str = "API-ключ отклонён сервисом. Проверьте ваш API-ключ.";

/// Banner shown when the completion API cannot be reached.
pub const MSG_NETWORK: &str = "Сервис недоступен. Проверьте подключение и попробуйте снова.";

/// Banner shown when the completion API answers with something unusable.
pub const MSG_MALFORMED: &str = "Сервис вернул некорректный ответ. Попробуйте снова.";

/// Fallback banner for every other request failure.
pub const MSG_GENERIC: &str =
    "Произошла ошибка при получении ответа. Проверьте ваш API-ключ и попробуйте снова.";

type Cause = Arc<dyn error::Error + Send + Sync>;

/// The main error type for finchat.
#[derive(Clone, Debug)]
pub enum Error {
    /// The question was empty after trimming.
    EmptyQuestion,

    /// The local key server answered with a non-success status.
    KeyServer {
        /// HTTP status code.
        status_code: u16,
        /// Human-readable error message.
        message: String,
    },

    /// No credential could be obtained from the key server.
    CredentialUnavailable {
        /// How many attempts were made before giving up.
        attempts: u32,
    },

    /// The completion API rejected the credential (HTTP 401).
    Authentication {
        message: String,
        request_id: Option<String>,
    },

    /// The completion API answered with any other non-success status.
    Status {
        status_code: u16,
        /// The `error.type` field of the body, when there was one.
        error_type: Option<String>,
        message: String,
        request_id: Option<String>,
        /// The `retry-after` header, in seconds.
        retry_after: Option<u64>,
    },

    /// The request never got an answer.
    Network {
        message: String,
        /// Whether the configured timeout elapsed.
        timed_out: bool,
        source: Option<Cause>,
    },

    /// A response arrived but did not have the shape we need.
    MalformedResponse {
        message: String,
        source: Option<Cause>,
    },

    /// The HTTP client could not be built or could not build the request.
    HttpClient {
        message: String,
        source: Option<Cause>,
    },

    /// Settings from the command line or the config file are unusable.
    Config {
        message: String,
        /// The setting at fault.
        param: Option<String>,
        source: Option<Cause>,
    },
}

impl Error {
    /// Creates an empty-question error.
    pub fn empty_question() -> Self {
        Error::EmptyQuestion
    }

    /// Creates a new key server error.
    pub fn key_server(status_code: u16, message: impl Into<String>) -> Self {
        Error::KeyServer {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a new credential-unavailable error.
    pub fn credential_unavailable(attempts: u32) -> Self {
        Error::CredentialUnavailable { attempts }
    }

    /// Creates a new authentication error.
    pub fn authentication(message: impl Into<String>, request_id: Option<String>) -> Self {
        Error::Authentication {
            message: message.into(),
            request_id,
        }
    }

    /// Creates an error for a non-success status from the completion API.
    pub fn status(
        status_code: u16,
        error_type: Option<String>,
        message: impl Into<String>,
        request_id: Option<String>,
        retry_after: Option<u64>,
    ) -> Self {
        Error::Status {
            status_code,
            error_type,
            message: message.into(),
            request_id,
            retry_after,
        }
    }

    /// Creates a new network error.
    pub fn network(
        message: impl Into<String>,
        timed_out: bool,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Network {
            message: message.into(),
            timed_out,
            source: source.map(Arc::from),
        }
    }

    /// Creates a new malformed response error.
    pub fn malformed_response(message: impl Into<String>) -> Self {
        Error::MalformedResponse {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new HTTP client error.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new configuration error.
    pub fn config(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Config {
            message: message.into(),
            param,
            source: None,
        }
    }

    pub(crate) fn config_caused_by(
        message: impl Into<String>,
        source: impl error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Config {
            message: message.into(),
            param: None,
            source: Some(Arc::new(source)),
        }
    }

    pub(crate) fn malformed_caused_by(
        message: impl Into<String>,
        source: impl error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::MalformedResponse {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Maps a `reqwest` send failure onto network or HTTP client errors.
    pub(crate) fn from_send(err: reqwest::Error, timeout: std::time::Duration) -> Self {
        if err.is_timeout() {
            Error::network(
                format!("no answer within {:?}: {err}", timeout),
                true,
                Some(Box::new(err)),
            )
        } else if err.is_connect() {
            Error::network(err.to_string(), false, Some(Box::new(err)))
        } else {
            Error::http_client(format!("Request failed: {err}"), Some(Box::new(err)))
        }
    }

    /// Returns true for an empty question.
    pub fn is_empty_question(&self) -> bool {
        matches!(self, Error::EmptyQuestion)
    }

    /// Returns true if no credential could be loaded.
    pub fn is_credential_unavailable(&self) -> bool {
        matches!(self, Error::CredentialUnavailable { .. })
    }

    /// Returns true if the completion API rejected the credential.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication { .. })
    }

    /// Returns true if the request never got an answer.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network { .. })
    }

    /// Returns true if the request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Network { timed_out: true, .. })
    }

    /// Returns true for a 5xx status from the completion API.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Status { status_code, .. } if *status_code >= 500)
    }

    /// Returns true if a response was missing an expected field or failed to parse.
    pub fn is_malformed_response(&self) -> bool {
        matches!(self, Error::MalformedResponse { .. })
    }

    /// Returns true for unusable settings.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config { .. })
    }

    /// Returns the request ID the completion API attached to its answer, if any.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Error::Authentication { request_id, .. } | Error::Status { request_id, .. } => {
                request_id.as_deref()
            }
            _ => None,
        }
    }

    /// Returns the HTTP status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::KeyServer { status_code, .. } | Error::Status { status_code, .. } => {
                Some(*status_code)
            }
            Error::Authentication { .. } => Some(401),
            _ => None,
        }
    }

    /// The text to put in the user-facing error banner for this error.
    ///
    /// Anything without a message of its own falls back to [`MSG_GENERIC`].
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::EmptyQuestion => MSG_EMPTY_QUESTION,
            Error::CredentialUnavailable { .. } => MSG_CREDENTIAL_UNAVAILABLE,
            Error::Authentication { .. } => MSG_AUTHENTICATION,
            Error::Network { .. } => MSG_NETWORK,
            Error::MalformedResponse { .. } => MSG_MALFORMED,
            _ => MSG_GENERIC,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyQuestion => write!(f, "Question is empty"),
            Error::KeyServer {
                status_code,
                message,
            } => write!(f, "Key server error: HTTP status {status_code}: {message}"),
            Error::CredentialUnavailable { attempts } => {
                write!(f, "Credential unavailable after {attempts} attempt(s)")
            }
            Error::Authentication { message, .. } => write!(f, "Authentication error: {message}"),
            Error::Status {
                error_type,
                message,
                retry_after,
                ..
            } => {
                match error_type {
                    Some(error_type) => write!(f, "{error_type}: {message}")?,
                    None => write!(f, "API error: {message}")?,
                }
                if let Some(retry_after) = retry_after {
                    write!(f, " (retry after {retry_after} seconds)")?;
                }
                Ok(())
            }
            Error::Network {
                message, timed_out, ..
            } => {
                if *timed_out {
                    write!(f, "Timeout error: {message}")
                } else {
                    write!(f, "Connection error: {message}")
                }
            }
            Error::MalformedResponse { message, .. } => write!(f, "Malformed response: {message}"),
            Error::HttpClient { message, .. } => write!(f, "HTTP client error: {message}"),
            Error::Config { message, param, .. } => match param {
                Some(param) => write!(f, "Configuration error: {message} (parameter: {param})"),
                None => write!(f, "Configuration error: {message}"),
            },
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Network { source, .. }
            | Error::MalformedResponse { source, .. }
            | Error::HttpClient { source, .. }
            | Error::Config { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            _ => None,
        }
    }
}

// Every JSON document finchat parses is a server response.
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::malformed_caused_by(format!("JSON error: {err}"), err)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::config_caused_by(format!("YAML error: {err}"), err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::config_caused_by(format!("URL parse error: {err}"), err)
    }
}

/// A specialized Result type for finchat operations.
pub type Result<T> = std::result::Result<T, Error>;
