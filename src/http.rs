//! Shared HTTP client and retry helper for engine requests.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::config::MultinerConfig;
use crate::error::MultinerError;

/// User-Agent sent when the config does not set one.
const DEFAULT_USER_AGENT: &str = concat!("multiner/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] for engine and document requests.
///
/// The client-level timeout is the longer of the two engine timeouts; the
/// orchestrator enforces the per-engine limit on top of it.
///
/// # Errors
///
/// Returns [`MultinerError::Http`] if the client cannot be constructed.
pub fn build_client(config: &MultinerConfig) -> Result<reqwest::Client, MultinerError> {
    let ua = config
        .user_agent
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned());
    let timeout = config.timeout_ms.max(config.anchor_timeout_ms);

    reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout))
        .user_agent(ua)
        .build()
        .map_err(|e| MultinerError::Http(format!("failed to build HTTP client: {e}")))
}

/// Random pause drawn from `config.retry_delay_ms`.
pub fn retry_delay(config: &MultinerConfig) -> Duration {
    let (min, max) = config.retry_delay_ms;
    if min >= max {
        return Duration::from_millis(min);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min..=max))
}

/// Run `op` up to `1 + config.max_retries` times, sleeping a jittered
/// delay between attempts. Returns the last error if every attempt fails.
pub async fn with_retries<T, F, Fut>(
    what: &str,
    config: &MultinerConfig,
    mut op: F,
) -> Result<T, MultinerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MultinerError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < config.max_retries => {
                attempt += 1;
                tracing::debug!(what, attempt, error = %err, "retrying");
                tokio::time::sleep(retry_delay(config)).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick_config(max_retries: u32) -> MultinerConfig {
        MultinerConfig {
            max_retries,
            retry_delay_ms: (0, 0),
            ..Default::default()
        }
    }

    #[test]
    fn build_client_with_default_config() {
        assert!(build_client(&MultinerConfig::default()).is_ok());
    }

    #[test]
    fn build_client_with_custom_ua() {
        let config = MultinerConfig {
            user_agent: Some("KB-MultiNER/2.0".into()),
            ..Default::default()
        };
        assert!(build_client(&config).is_ok());
    }

    #[test]
    fn default_user_agent_names_crate() {
        assert!(DEFAULT_USER_AGENT.starts_with("multiner/"));
    }

    #[test]
    fn retry_delay_stays_in_range() {
        let config = MultinerConfig {
            retry_delay_ms: (10, 20),
            ..Default::default()
        };
        for _ in 0..50 {
            let d = retry_delay(&config);
            assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(20));
        }
    }

    #[tokio::test]
    async fn with_retries_succeeds_after_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retries("test", &quick_config(3), move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(MultinerError::Http("flaky".into()))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.expect("third attempt succeeds"), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn with_retries_gives_up() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retries("test", &quick_config(2), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(MultinerError::Http("down".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
