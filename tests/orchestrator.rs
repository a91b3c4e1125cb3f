// Orchestration scenarios against a scripted mock resolver

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use uvd::{
    ClientKind, CookieLookupError, CookieProvider, CookieSource, DownloadError,
    ErrorKind, Format, MediaInfo, MediaResolver, Orchestrator, Persona,
    PersonaRegistry, ProbeOutcome, ProgressObserver, RawFailure, ResolverConfig,
};

type Script =
    Box<dyn Fn(&str, &ResolverConfig) -> Result<MediaInfo, RawFailure> + Send + Sync>;

/// Mock resolver driven by a closure. Records the persona id of every
/// probe call so tests can assert exact call counts and order.
struct ScriptedResolver {
    calls: Arc<Mutex<Vec<String>>>,
    script: Script,
}

impl ScriptedResolver {
    fn new(
        script: impl Fn(&str, &ResolverConfig) -> Result<MediaInfo, RawFailure>
            + Send
            + Sync
            + 'static,
    ) -> (Self, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                calls: calls.clone(),
                script: Box::new(script),
            },
            calls,
        )
    }
}

#[async_trait]
impl MediaResolver for ScriptedResolver {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn probe_metadata(
        &self,
        _url: &str,
        config: &ResolverConfig,
    ) -> Result<MediaInfo, RawFailure> {
        self.calls.lock().unwrap().push(config.persona_id.clone());
        (self.script)(&config.persona_id, config)
    }

    async fn perform_download(
        &self,
        _url: &str,
        _config: &ResolverConfig,
        dest_dir: &Path,
        _progress: &dyn ProgressObserver,
    ) -> Result<PathBuf, RawFailure> {
        Ok(dest_dir.join("Sample.mp4"))
    }
}

fn sample_info() -> MediaInfo {
    MediaInfo {
        id: "abc12345678".to_string(),
        title: "Sample".to_string(),
        uploader: "Someone".to_string(),
        duration_seconds: 93,
        view_count: 1234,
        webpage_url: "https://example.com/watch".to_string(),
        formats: vec![Format {
            format_id: "22".to_string(),
            container: "mp4".to_string(),
            height: Some(720),
            filesize: Some(1_000_000),
            is_fragmented: false,
            fragment_count: None,
        }],
    }
}

/// Two web personas (2 attempts each) and one minimal fallback (4).
fn test_registry() -> PersonaRegistry {
    PersonaRegistry::new(vec![
        Persona::new("alpha", ClientKind::Web, 1),
        Persona::new("bravo", ClientKind::Web, 2),
        Persona::new("fallback", ClientKind::Minimal, 3),
    ])
    .unwrap()
}

fn network_failure() -> RawFailure {
    RawFailure::new("extract", "Connection timed out after 30s")
}

const URL: &str = "https://www.youtube.com/watch?v=abc12345678";

#[tokio::test(start_paused = true)]
async fn retryable_failures_escalate_and_third_persona_wins() {
    let (resolver, calls) = ScriptedResolver::new(|persona, _| {
        if persona == "fallback" {
            Ok(sample_info())
        } else {
            Err(network_failure())
        }
    });
    let orchestrator = Orchestrator::new(resolver, test_registry());

    let probe = orchestrator.probe(URL).await.unwrap();

    // 2 retryable attempts per web persona, then first-attempt success
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["alpha", "alpha", "bravo", "bravo", "fallback"]
    );
    assert_eq!(probe.attempts.len(), 5);
    match probe.outcome {
        ProbeOutcome::Success { persona_id, info } => {
            assert_eq!(persona_id, "fallback");
            assert_eq!(info.title, "Sample");
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn non_retryable_failures_burn_one_attempt_per_persona() {
    let (resolver, calls) =
        ScriptedResolver::new(|_, _| Err(RawFailure::new("extract", "This video is private")));
    let orchestrator = Orchestrator::new(resolver, test_registry());

    let probe = orchestrator.probe(URL).await.unwrap();

    assert_eq!(calls.lock().unwrap().len(), 3);
    match probe.outcome {
        ProbeOutcome::Failure { kind, suggestion, .. } => {
            assert_eq!(kind, ErrorKind::Private);
            assert!(!suggestion.is_empty());
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn exhaustion_reports_the_last_persona_failure() {
    let (resolver, calls) = ScriptedResolver::new(|persona, _| {
        Err(match persona {
            "alpha" => RawFailure::new("extract", "This video is private"),
            "bravo" => RawFailure::new("extract", "Video unavailable"),
            _ => RawFailure::new("extract", "not available in your country"),
        })
    });
    let orchestrator = Orchestrator::new(resolver, test_registry());

    let probe = orchestrator.probe(URL).await.unwrap();

    assert_eq!(calls.lock().unwrap().len(), 3);
    match probe.outcome {
        ProbeOutcome::Failure { kind, .. } => assert_eq!(kind, ErrorKind::GeoRestricted),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn total_calls_are_bounded_when_everything_times_out() {
    let (resolver, calls) = ScriptedResolver::new(|_, _| Err(network_failure()));
    let orchestrator = Orchestrator::new(resolver, test_registry());

    let probe = orchestrator.probe(URL).await.unwrap();

    // Worst case: sum of per-persona budgets, 2 + 2 + 4
    assert_eq!(calls.lock().unwrap().len(), 8);
    match probe.outcome {
        ProbeOutcome::Failure { kind, .. } => assert_eq!(kind, ErrorKind::Network),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn persona_ordering_is_deterministic() {
    for _ in 0..3 {
        let (resolver, calls) = ScriptedResolver::new(|persona, _| {
            if persona == "alpha" {
                Err(RawFailure::new("extract", "Video unavailable"))
            } else {
                Ok(sample_info())
            }
        });
        let orchestrator = Orchestrator::new(resolver, test_registry());

        let probe = orchestrator.probe(URL).await.unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["alpha", "bravo"]);
        match probe.outcome {
            ProbeOutcome::Success { persona_id, .. } => assert_eq!(persona_id, "bravo"),
            other => panic!("expected success, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn accessibility_check_is_idempotent() {
    let (resolver, _) = ScriptedResolver::new(|_, _| Ok(sample_info()));
    let orchestrator = Orchestrator::new(resolver, test_registry());

    let first = orchestrator.test_accessibility(URL).await.unwrap();
    let second = orchestrator.test_accessibility(URL).await.unwrap();

    assert_eq!(first.outcome, second.outcome);
    assert!(first.is_success());
}

#[tokio::test]
async fn empty_registry_fails_before_any_probe() {
    assert!(matches!(
        PersonaRegistry::new(vec![]),
        Err(DownloadError::Config(_))
    ));
}

struct NoCookies;

impl CookieProvider for NoCookies {
    fn cookies(&self, browser: &str) -> Result<CookieSource, CookieLookupError> {
        Err(CookieLookupError(browser.to_string()))
    }
}

#[tokio::test]
async fn cookie_persona_without_store_is_skipped_for_free() {
    let registry = PersonaRegistry::new(vec![
        Persona::new("needs-cookies", ClientKind::Web, 1).with_cookies(true),
        Persona::new("plain", ClientKind::Web, 2),
    ])
    .unwrap();

    let (resolver, calls) = ScriptedResolver::new(|_, _| Ok(sample_info()));
    let orchestrator =
        Orchestrator::new(resolver, registry).with_cookie_provider(Arc::new(NoCookies));

    let probe = orchestrator.probe(URL).await.unwrap();

    // The cookie persona never reaches the resolver
    assert_eq!(*calls.lock().unwrap(), vec!["plain"]);
    assert!(probe.is_success());
}

#[tokio::test]
async fn cancellation_aborts_the_persona_loop() {
    let (resolver, _) = ScriptedResolver::new(|_, _| Err(network_failure()));
    let cancel = CancellationToken::new();
    cancel.cancel();
    let orchestrator =
        Orchestrator::new(resolver, test_registry()).with_cancellation(cancel);

    let result = orchestrator.probe(URL).await;

    assert!(matches!(result, Err(DownloadError::Cancelled)));
}

#[tokio::test]
async fn download_success_reports_the_final_path() {
    let (resolver, _) = ScriptedResolver::new(|_, _| Ok(sample_info()));
    let orchestrator = Orchestrator::new(resolver, test_registry());

    let outcome = orchestrator
        .resolve_and_download(URL, Path::new("/tmp/videos"), &uvd::NullProgress)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        uvd::DownloadOutcome::Success {
            file_path: PathBuf::from("/tmp/videos/Sample.mp4")
        }
    );
}

#[tokio::test]
async fn probe_failure_surfaces_as_download_failure() {
    let (resolver, _) = ScriptedResolver::new(|_, _| {
        Err(RawFailure::new("extract", "This video is private"))
    });
    let orchestrator = Orchestrator::new(resolver, test_registry());

    let outcome = orchestrator
        .resolve_and_download(URL, Path::new("/tmp/videos"), &uvd::NullProgress)
        .await
        .unwrap();

    match outcome {
        uvd::DownloadOutcome::Failure { kind, .. } => assert_eq!(kind, ErrorKind::Private),
        other => panic!("expected failure, got {other:?}"),
    }
}
