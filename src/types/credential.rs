use std::fmt;

/// A bearer token for the completion API.
///
/// The token is held in memory only.  `Debug` and `Display` never print it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token.
    ///
    /// Returns `None` for tokens that are empty after trimming or that hold
    /// control characters, since neither can travel in an `Authorization` header.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() || token.chars().any(char::is_control) {
            None
        } else {
            Some(Self(token))
        }
    }

    /// The raw token, for building the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<redacted>)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<redacted>")
    }
}
