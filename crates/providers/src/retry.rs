//! Exponential backoff retry for hosted-model calls.
//!
//! [`RetryingProvider`] wraps any [`Provider`] and retries failures whose
//! HTTP status is in the configured set. After failed attempt `n` it waits
//! `initial_delay × exp_base^(n−1)`, optionally capped by `max_delay`.

use async_trait::async_trait;
use fitcoach_config::RetryConfig;
use fitcoach_core::error::ProviderError;
use fitcoach_core::provider::{Provider, ProviderRequest, ProviderResponse};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Static retry settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total calls allowed, including the first.
    pub attempts: u32,
    pub exp_base: f64,
    pub initial_delay: Duration,
    pub max_delay: Option<Duration>,
    pub http_status_codes: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            attempts: config.attempts.max(1),
            exp_base: config.exp_base,
            initial_delay: secs(config.initial_delay_secs),
            max_delay: config.max_delay_secs.map(secs),
            http_status_codes: config.http_status_codes.clone(),
        }
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

impl RetryPolicy {
    /// Whether `err` is worth another attempt.
    pub fn is_retryable(&self, err: &ProviderError) -> bool {
        err.status_code()
            .is_some_and(|code| self.http_status_codes.contains(&code))
    }

    /// Delay after failed attempt `attempt` (1-based).
    pub fn compute_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.exp_base.powi(exponent);
        let delay = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }
}

/// A provider wrapper that retries transient failures with exponential backoff.
pub struct RetryingProvider {
    inner: Arc<dyn Provider>,
    policy: RetryPolicy,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn Provider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl Provider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let mut attempt = 1;
        loop {
            match self.inner.complete(request.clone()).await {
                Ok(response) => {
                    if attempt > 1 {
                        debug!(
                            provider = %self.inner.name(),
                            attempt,
                            "Request succeeded after retry"
                        );
                    }
                    return Ok(response);
                }
                Err(err) => {
                    if !self.policy.is_retryable(&err) || attempt >= self.policy.attempts {
                        return Err(err);
                    }

                    let delay = self.policy.compute_delay(attempt);
                    warn!(
                        provider = %self.inner.name(),
                        attempt,
                        max_attempts = self.policy.attempts,
                        ?delay,
                        error = %err,
                        "Retrying after transient error"
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        self.inner.list_models().await
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitcoach_core::message::Message;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Replays a script of outcomes: `Some(status)` fails, `None` succeeds.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Option<u16>>>,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(script: &[Option<u16>]) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.iter().copied().collect()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front().flatten();
            match next {
                Some(429) => Err(ProviderError::RateLimited { retry_after_secs: 0 }),
                Some(status_code) => Err(ProviderError::ApiError {
                    status_code,
                    message: format!("HTTP {status_code}"),
                }),
                None => Ok(ProviderResponse {
                    message: Message::assistant("ok"),
                    usage: None,
                    model: request.model,
                    metadata: serde_json::Map::new(),
                }),
            }
        }
    }

    fn request() -> ProviderRequest {
        ProviderRequest::new("gemini-2.5-flash", vec![Message::user("plan my week")])
    }

    #[test]
    fn default_policy_matches_config_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 5);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert!(policy.max_delay.is_none());
        assert_eq!(policy.http_status_codes, vec![429, 500, 503, 504]);
    }

    #[test]
    fn delays_grow_by_exp_base() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.compute_delay(1), Duration::from_secs(1));
        assert_eq!(policy.compute_delay(2), Duration::from_secs(7));
        assert_eq!(policy.compute_delay(3), Duration::from_secs(49));
        assert_eq!(policy.compute_delay(4), Duration::from_secs(343));
    }

    #[test]
    fn delay_respects_cap() {
        let policy = RetryPolicy {
            max_delay: Some(Duration::from_secs(30)),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.compute_delay(2), Duration::from_secs(7));
        assert_eq!(policy.compute_delay(3), Duration::from_secs(30));
    }

    #[test]
    fn retryable_statuses() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable(&ProviderError::RateLimited { retry_after_secs: 5 }));
        for code in [500, 503, 504] {
            assert!(policy.is_retryable(&ProviderError::ApiError {
                status_code: code,
                message: String::new(),
            }));
        }
        assert!(!policy.is_retryable(&ProviderError::ApiError {
            status_code: 502,
            message: String::new(),
        }));
        assert!(!policy.is_retryable(&ProviderError::ModelNotFound("x".into())));
        assert!(!policy.is_retryable(&ProviderError::Network("reset".into())));
        assert!(!policy.is_retryable(&ProviderError::AuthenticationFailed("bad".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let inner = ScriptedProvider::new(&[Some(429), Some(503), None]);
        let provider = RetryingProvider::new(inner.clone(), RetryPolicy::default());

        let start = tokio::time::Instant::now();
        let response = provider.complete(request()).await.unwrap();

        assert_eq!(response.message.content, "ok");
        assert_eq!(inner.calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let inner = ScriptedProvider::new(&[Some(500); 5]);
        let provider = RetryingProvider::new(inner.clone(), RetryPolicy::default());

        let start = tokio::time::Instant::now();
        let err = provider.complete(request()).await.unwrap_err();

        assert_eq!(inner.calls(), 5);
        assert_eq!(err.status_code(), Some(500));
        // 1 + 7 + 49 + 343, no sleep after the final attempt
        assert_eq!(start.elapsed(), Duration::from_secs(400));
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_fails_immediately() {
        let inner = ScriptedProvider::new(&[Some(404), None]);
        let provider = RetryingProvider::new(inner.clone(), RetryPolicy::default());

        let start = tokio::time::Instant::now();
        let err = provider.complete(request()).await.unwrap_err();

        assert_eq!(inner.calls(), 1);
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn single_attempt_policy_never_retries() {
        let inner = ScriptedProvider::new(&[Some(503), None]);
        let policy = RetryPolicy {
            attempts: 1,
            ..RetryPolicy::default()
        };
        let provider = RetryingProvider::new(inner.clone(), policy);

        assert!(provider.complete(request()).await.is_err());
        assert_eq!(inner.calls(), 1);
    }

    #[test]
    fn policy_from_config() {
        let config = RetryConfig {
            attempts: 3,
            exp_base: 2.0,
            initial_delay_secs: 0.5,
            max_delay_secs: Some(10.0),
            http_status_codes: vec![503],
        };
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.compute_delay(1), Duration::from_millis(500));
        assert_eq!(policy.compute_delay(2), Duration::from_secs(1));
        assert_eq!(policy.max_delay, Some(Duration::from_secs(10)));
    }
}
