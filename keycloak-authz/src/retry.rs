//! Caller-side retry with exponential backoff
//!
//! Operations in this crate make exactly one attempt. Callers that want
//! retries wrap a call in [`retry_with_backoff`], which only repeats
//! transient failures (see [`AuthzError::is_retryable`]).
//!
//! # Example
//!
//! ```no_run
//! use keycloak_authz::retry::{retry_with_backoff, RetryConfig};
//! use keycloak_authz::{ClientCredentials, Keycloak, RequestContext};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Keycloak::new()?;
//! let ctx = RequestContext::new();
//! let credentials = ClientCredentials::new("platform", "secret");
//! let endpoint = "https://sso.example.io/auth/realms/fabric8/protocol/openid-connect/token";
//!
//! let tokens = client.tokens();
//! let pat = retry_with_backoff(
//!     || tokens.service_token(&ctx, endpoint, &credentials),
//!     &RetryConfig::default(),
//!     &None,
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::error::AuthzError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Backoff settings
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first (default: 3)
    pub max_attempts: u32,

    /// Base delay for exponential backoff (default: 200ms)
    pub base_delay: Duration,

    /// Maximum delay between attempts (default: 5s)
    pub max_delay: Duration,

    /// Jitter factor (0.0-1.0) applied to each delay (default: 0.2)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            jitter: 0.2,
        }
    }
}

impl RetryConfig {
    /// A config allowing `max_attempts` attempts
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Single attempt, no retries
    pub fn disabled() -> Self {
        Self::new(1)
    }

    /// Delay before retry number `attempt` (1-based)
    ///
    /// base_delay × 2^(attempt-1) × (1 ± jitter), capped at max_delay.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        use rand::Rng;

        let exp = attempt.saturating_sub(1).min(16) as i32;
        let base = self.base_delay.as_secs_f64() * 2_f64.powi(exp);

        let jitter_range = base * self.jitter.clamp(0.0, 1.0);
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };

        Duration::from_secs_f64((base + jitter).max(0.0)).min(self.max_delay)
    }
}

/// Information about a retry attempt
#[derive(Debug, Clone)]
pub struct RetryInfo {
    /// Which attempt failed (1-based)
    pub attempt: u32,
    /// Maximum attempts configured
    pub max_attempts: u32,
    /// How long we'll wait before retrying
    pub delay: Duration,
    /// The error that triggered the retry
    pub error: String,
}

/// Callback type for retry events
pub type RetryCallback = Arc<dyn Fn(RetryInfo) + Send + Sync>;

/// Run `op` until it succeeds, fails permanently, or attempts run out
///
/// The last error is returned unchanged, so its kind is preserved.
pub async fn retry_with_backoff<F, Fut, T>(
    mut op: F,
    config: &RetryConfig,
    on_retry: &Option<RetryCallback>,
) -> Result<T, AuthzError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AuthzError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                if attempt >= max_attempts || !err.is_retryable() {
                    return Err(err);
                }
                let delay = config.delay_for_attempt(attempt);

                log::debug!(
                    "attempt {}/{} failed, retrying in {:?}: {}",
                    attempt,
                    max_attempts,
                    delay,
                    err
                );
                if let Some(callback) = on_retry {
                    callback(RetryInfo {
                        attempt,
                        max_attempts,
                        delay,
                        error: err.to_string(),
                    });
                }

                tokio::time::sleep(delay).await;
            }
        }
    }
}
