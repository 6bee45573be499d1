//! Word-list login probe used to demonstrate why login endpoints need
//! throttling. Each run gets its own [`StopHandle`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use super::ClientError;

/// One credential check against the server.
#[async_trait]
pub trait LoginAttempt: Send + Sync {
    /// `Ok(false)` means the server rejected the credentials.
    async fn try_login(&self, username: &str, password: &str) -> Result<bool, ClientError>;
}

/// Cancellation flag shared between a running probe and whoever may stop it.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The password that was accepted, and its zero-based position in the list.
    Found { password: String, attempt: usize },
    Exhausted { attempts: usize },
    Stopped { attempts: usize },
}

/// Tries each word in order until one is accepted, the list runs out or
/// `stop` is triggered. The handle is checked before every attempt.
///
/// Transport failures are logged and counted as rejected attempts.
#[instrument(skip(attempt, words, stop))]
pub async fn run_login_probe<A, I, S>(
    attempt: &A,
    username: &str,
    words: I,
    stop: &StopHandle,
) -> ProbeOutcome
where
    A: LoginAttempt + ?Sized,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut attempts = 0;
    for word in words {
        if stop.is_stopped() {
            info!(attempts, "probe stopped");
            return ProbeOutcome::Stopped { attempts };
        }

        let password = word.as_ref();
        let accepted = match attempt.try_login(username, password).await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(attempt = attempts, error = %e, "login attempt failed");
                false
            }
        };
        if accepted {
            info!(attempt = attempts, "password found");
            return ProbeOutcome::Found {
                password: password.to_string(),
                attempt: attempts,
            };
        }
        attempts += 1;
    }

    info!(attempts, "word list exhausted");
    ProbeOutcome::Exhausted { attempts }
}
