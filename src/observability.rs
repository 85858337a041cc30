use biometrics::{Collector, Counter, Moments};

pub(crate) static KEY_ATTEMPTS: Counter = Counter::new("finchat.key.attempts");
pub(crate) static KEY_FAILURES: Counter = Counter::new("finchat.key.failures");
pub(crate) static KEY_EXHAUSTED: Counter = Counter::new("finchat.key.exhausted");
pub(crate) static KEY_RETRY_BACKOFF: Moments = Moments::new("finchat.key.retry_backoff_seconds");

pub(crate) static COMPLETION_REQUESTS: Counter = Counter::new("finchat.completion.requests");
pub(crate) static COMPLETION_ERRORS: Counter = Counter::new("finchat.completion.errors");
pub(crate) static COMPLETION_DURATION: Moments =
    Moments::new("finchat.completion.duration_seconds");

pub(crate) static QUESTIONS_REJECTED: Counter = Counter::new("finchat.session.questions_rejected");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: &Collector) {
    collector.register_counter(&KEY_ATTEMPTS);
    collector.register_counter(&KEY_FAILURES);
    collector.register_counter(&KEY_EXHAUSTED);
    collector.register_moments(&KEY_RETRY_BACKOFF);

    collector.register_counter(&COMPLETION_REQUESTS);
    collector.register_counter(&COMPLETION_ERRORS);
    collector.register_moments(&COMPLETION_DURATION);

    collector.register_counter(&QUESTIONS_REJECTED);
}
