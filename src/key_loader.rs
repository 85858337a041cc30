//! Bounded, logged retries around a [`KeySource`].

use crate::error::{Error, Result};
use crate::key_server::KeySource;
use crate::observability::{KEY_ATTEMPTS, KEY_EXHAUSTED, KEY_FAILURES, KEY_RETRY_BACKOFF};
use crate::render::Renderer;
use crate::retry::RetryPolicy;
use crate::types::{Credential, LogEntry};

/// Fetch a credential, retrying per `policy`.
///
/// Every attempt is reported to the renderer's diagnostic log.  On exhaustion
/// an exhaustion line is logged and [`Error::CredentialUnavailable`] returned;
/// the error banner is left to the caller.
pub async fn load_with_retry(
    source: &dyn KeySource,
    policy: &RetryPolicy,
    renderer: &mut dyn Renderer,
) -> Result<Credential> {
    let max_attempts = policy.max_attempts();
    renderer.print_log(&LogEntry::info(format!(
        "Loading API key from {}...",
        source.describe()
    )));

    for attempt in 1..=max_attempts {
        KEY_ATTEMPTS.click();
        match source.fetch().await {
            Ok(credential) => {
                renderer.print_log(&LogEntry::info("API key loaded."));
                return Ok(credential);
            }
            Err(err) => {
                KEY_FAILURES.click();
                renderer.print_log(&LogEntry::warn(format!(
                    "Failed to load API key (attempt {attempt}/{max_attempts}): {err}"
                )));
                if let Some(delay) = policy.delay_after(attempt) {
                    renderer.print_log(&LogEntry::info(format!(
                        "Retrying in {} ms...",
                        delay.as_millis()
                    )));
                    KEY_RETRY_BACKOFF.add(delay.as_secs_f64());
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    KEY_EXHAUSTED.click();
    renderer.print_log(&LogEntry::error(format!(
        "Could not load API key after {max_attempts} attempt(s)."
    )));
    Err(Error::credential_unavailable(max_attempts))
}
