// Retry orchestration - walks the persona registry until one succeeds
//
// Sequential by design: hosting platforms rate-limit by source identity,
// so probing personas in parallel multiplies the chance of a hard block.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::diagnostics::{classify, Classified};
use crate::dispatcher;
use crate::errors::DownloadError;
use crate::fragments;
use crate::models::{
    AttemptOutcome, AttemptRecord, DownloadOutcome, ProbeOutcome, ProbeResult,
};
use crate::personas::{Persona, PersonaRegistry};
use crate::platform::{classify_url, UrlCategory};
use crate::resolver::{
    BrowserCookies, CookieProvider, CookieSource, MediaResolver, ProgressObserver,
    RawFailure, ResolverConfig,
};

/// Backoff schedule between retries of the same persona: exponential,
/// capped, no jitter (the loop is sequential and single-identity).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given attempt (1-based):
    /// `base * 2^(attempt-1)`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let multiplier = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// The restriction-bypass orchestration engine. Owns the read-only persona
/// registry and the resolver handle; everything else is call-scoped, so one
/// orchestrator can serve concurrent probes of different URLs.
pub struct Orchestrator<R> {
    resolver: R,
    registry: PersonaRegistry,
    cookie_provider: Arc<dyn CookieProvider>,
    cookie_browser: String,
    retry: RetryPolicy,
    probe_timeout: Duration,
    proxy: Option<String>,
    cancel: CancellationToken,
}

impl<R: MediaResolver> Orchestrator<R> {
    pub fn new(resolver: R, registry: PersonaRegistry) -> Self {
        Self {
            resolver,
            registry,
            cookie_provider: Arc::new(BrowserCookies),
            cookie_browser: "chrome".to_string(),
            retry: RetryPolicy::default(),
            probe_timeout: Duration::from_secs(30),
            proxy: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cookie_provider(mut self, provider: Arc<dyn CookieProvider>) -> Self {
        self.cookie_provider = provider;
        self
    }

    pub fn with_cookie_browser(mut self, browser: &str) -> Self {
        self.cookie_browser = browser.to_string();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn registry(&self) -> &PersonaRegistry {
        &self.registry
    }

    /// Metadata-only accessibility check. Same persona walk as a
    /// pre-download probe.
    pub async fn test_accessibility(&self, url: &str) -> Result<ProbeResult, DownloadError> {
        self.probe(url).await
    }

    /// Probe a URL through the eligible personas in priority order.
    ///
    /// Success short-circuits everything. Retryable (network-class)
    /// failures retry the same persona after a capped backoff; any other
    /// failure abandons the persona immediately. Exhaustion returns the
    /// last persona's classified failure, the most specific diagnostic
    /// available. Errors only on cancellation.
    pub async fn probe(&self, url: &str) -> Result<ProbeResult, DownloadError> {
        let category = classify_url(url);
        self.probe_in(url, category).await
    }

    async fn probe_in(
        &self,
        url: &str,
        category: UrlCategory,
    ) -> Result<ProbeResult, DownloadError> {
        let personas = self.registry.eligible(category);
        debug!(%url, %category, eligible = personas.len(), "starting probe");

        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut last_failure: Option<(Classified, RawFailure)> = None;

        for persona in personas {
            let config = match self.config_for(persona) {
                Some(config) => config,
                // Structurally unable (no cookie store): skip without
                // spending a resolver call.
                None => continue,
            };

            let max_attempts = persona.max_attempts();
            for attempt in 1..=max_attempts {
                if self.cancel.is_cancelled() {
                    return Err(DownloadError::Cancelled);
                }

                let started = Instant::now();
                let result = self.resolver.probe_metadata(url, &config).await;
                let elapsed_ms = started.elapsed().as_millis() as u64;

                match result {
                    Ok(media_info) => {
                        info!(persona = %persona.id, attempt, "probe succeeded");
                        attempts.push(AttemptRecord {
                            persona_id: persona.id.clone(),
                            attempt_number: attempt,
                            outcome: AttemptOutcome::Success,
                            elapsed_ms,
                        });
                        return Ok(ProbeResult {
                            outcome: ProbeOutcome::Success {
                                info: media_info,
                                persona_id: persona.id.clone(),
                            },
                            attempts,
                        });
                    }
                    Err(raw) => {
                        let classified = classify(&raw);
                        let retryable = classified.kind.is_retryable();
                        warn!(
                            persona = %persona.id,
                            attempt,
                            kind = %classified.kind,
                            retryable,
                            error = %raw.message,
                            "probe attempt failed"
                        );
                        attempts.push(AttemptRecord {
                            persona_id: persona.id.clone(),
                            attempt_number: attempt,
                            outcome: if retryable {
                                AttemptOutcome::RetryableFailure
                            } else {
                                AttemptOutcome::FatalFailure
                            },
                            elapsed_ms,
                        });
                        last_failure = Some((classified, raw));

                        if !retryable {
                            // This persona cannot succeed; escalate now.
                            break;
                        }
                        if attempt < max_attempts {
                            self.wait_backoff(attempt).await?;
                        }
                    }
                }
            }
        }

        let (classified, raw) = last_failure.unwrap_or_else(|| {
            (
                Classified {
                    kind: crate::errors::ErrorKind::Unknown,
                    suggestion: "No persona is applicable to this URL \
                         category; check the persona registry.",
                },
                RawFailure::new("config", "no eligible personas"),
            )
        });

        Ok(ProbeResult {
            outcome: ProbeOutcome::Failure {
                kind: classified.kind,
                raw_message: raw.message,
                suggestion: classified.suggestion.to_string(),
            },
            attempts,
        })
    }

    /// Probe, then hand the winning persona to the download dispatcher.
    pub async fn resolve_and_download(
        &self,
        url: &str,
        dest_dir: &Path,
        progress: &dyn ProgressObserver,
    ) -> Result<DownloadOutcome, DownloadError> {
        let probe = self.probe(url).await?;

        let (info, persona_id) = match probe.outcome {
            ProbeOutcome::Failure {
                kind, suggestion, ..
            } => {
                return Ok(DownloadOutcome::Failure { kind, suggestion });
            }
            ProbeOutcome::Success { info, persona_id } => (info, persona_id),
        };

        // The winning persona came out of this registry moments ago.
        let persona = match self.registry.get(&persona_id) {
            Some(persona) => persona,
            None => {
                return Err(DownloadError::Config(format!(
                    "winning persona '{persona_id}' missing from registry"
                )))
            }
        };

        let delivery = fragments::classify(&info.formats);
        info!(
            persona = %persona_id,
            title = %info.title,
            segmented = delivery.is_segmented(),
            "dispatching download"
        );

        let cookies = self.cookies_for(persona);
        dispatcher::dispatch(
            &self.resolver,
            persona,
            cookies,
            delivery,
            self.proxy.clone(),
            url,
            dest_dir,
            progress,
        )
        .await
    }

    /// Build the probe configuration for one persona. `None` when the
    /// persona needs cookies and no store exists.
    fn config_for(&self, persona: &Persona) -> Option<ResolverConfig> {
        let cookies = if persona.uses_cookies {
            match self.cookie_provider.cookies(&self.cookie_browser) {
                Ok(source) => Some(source),
                Err(err) => {
                    warn!(persona = %persona.id, %err, "skipping cookie persona");
                    return None;
                }
            }
        } else {
            None
        };

        Some(
            ResolverConfig::for_persona(persona)
                .with_cookies(cookies)
                .with_timeout(self.probe_timeout)
                .with_proxy(self.proxy.clone()),
        )
    }

    fn cookies_for(&self, persona: &Persona) -> Option<CookieSource> {
        if !persona.uses_cookies {
            return None;
        }
        self.cookie_provider.cookies(&self.cookie_browser).ok()
    }

    /// Cancellable backoff wait between retries of the same persona.
    async fn wait_backoff(&self, attempt: u32) -> Result<(), DownloadError> {
        let delay = self.retry.delay_for_attempt(attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off");
        tokio::select! {
            _ = self.cancel.cancelled() => Err(DownloadError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_monotonic_until_the_cap() {
        let policy = RetryPolicy::default();
        let mut previous = Duration::ZERO;
        for attempt in 1..=8 {
            let delay = policy.delay_for_attempt(attempt);
            assert!(delay >= previous, "attempt {attempt} regressed");
            previous = delay;
        }
    }

    #[test]
    fn backoff_respects_the_cap() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        };
        // 500ms * 2^30 would overflow far past the cap
        assert_eq!(policy.delay_for_attempt(31), Duration::from_secs(8));
        assert_eq!(policy.delay_for_attempt(200), Duration::from_secs(8));
    }

    #[test]
    fn first_retry_uses_the_base_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(1000));
    }
}
