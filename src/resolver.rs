// Contracts for the external media resolver and its collaborators

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::fragments::FragmentPolicy;
use crate::models::{MediaInfo, ProgressEvent};
use crate::personas::Persona;

/// Raw failure reported by the resolver, before classification.
#[derive(Debug, Clone)]
pub struct RawFailure {
    /// Resolver-side category ("extract", "download", "spawn", ...)
    pub category: String,
    pub message: String,
}

impl RawFailure {
    pub fn new(category: &str, message: impl Into<String>) -> Self {
        Self {
            category: category.to_string(),
            message: message.into(),
        }
    }
}

/// Where authenticated cookies come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieSource {
    /// Let the resolver extract from an installed browser profile.
    Browser(String),
    /// Netscape-format cookies file.
    File(PathBuf),
}

#[derive(Debug, Error)]
#[error("no cookie store found for browser '{0}'")]
pub struct CookieLookupError(pub String);

/// Decides whether a cookie store exists for a browser identifier. The
/// orchestrator only decides *whether* to ask; extraction itself is the
/// resolver's business.
pub trait CookieProvider: Send + Sync {
    fn cookies(&self, browser: &str) -> Result<CookieSource, CookieLookupError>;
}

/// Default provider: hand the browser name straight to the resolver.
pub struct BrowserCookies;

impl CookieProvider for BrowserCookies {
    fn cookies(&self, browser: &str) -> Result<CookieSource, CookieLookupError> {
        Ok(CookieSource::Browser(browser.to_string()))
    }
}

/// Cookies from a fixed file; fails when the file is missing.
pub struct FileCookies {
    pub path: PathBuf,
}

impl CookieProvider for FileCookies {
    fn cookies(&self, _browser: &str) -> Result<CookieSource, CookieLookupError> {
        if self.path.exists() {
            Ok(CookieSource::File(self.path.clone()))
        } else {
            Err(CookieLookupError(self.path.display().to_string()))
        }
    }
}

/// Per-call resolver configuration, built from one persona plus policy.
/// Nothing here is process-global; every orchestrator call assembles its
/// own config so concurrent orchestration of different URLs stays safe.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Id of the persona this config was built from (for logging).
    pub persona_id: String,
    /// Ordered header name → value pairs.
    pub headers: Vec<(String, String)>,
    pub cookies: Option<CookieSource>,
    /// Platform player-client hint (web, android, ios, tv).
    pub player_client: Option<&'static str>,
    pub timeout: Duration,
    /// Whole-file retry count encoded into the resolver invocation.
    pub retries: u32,
    /// Present only for segmented streams.
    pub fragment_policy: Option<FragmentPolicy>,
    pub proxy: Option<String>,
    /// Format selection expression understood by the resolver.
    pub format_selector: String,
}

impl ResolverConfig {
    pub fn for_persona(persona: &Persona) -> Self {
        Self {
            persona_id: persona.id.clone(),
            headers: persona.headers.clone(),
            cookies: None,
            player_client: persona.client_kind.player_client(),
            timeout: Duration::from_secs(30),
            retries: 2,
            fragment_policy: None,
            proxy: None,
            format_selector: "best[height<=720]".to_string(),
        }
    }

    pub fn with_cookies(mut self, cookies: Option<CookieSource>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_fragment_policy(mut self, policy: Option<FragmentPolicy>) -> Self {
        self.fragment_policy = policy;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_format_selector(mut self, selector: &str) -> Self {
        self.format_selector = selector.to_string();
        self
    }
}

/// Observer for download progress. Implementations must be cheap; events
/// arrive from the resolver's output stream as they are parsed.
pub trait ProgressObserver: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

/// Observer that discards everything.
pub struct NullProgress;

impl ProgressObserver for NullProgress {
    fn on_event(&self, _event: &ProgressEvent) {}
}

/// The external media-resolution tool, behind a narrow contract. The core
/// never fetches or decodes media itself.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Name for logging.
    fn name(&self) -> &'static str;

    /// Whether the underlying tool is installed and runnable.
    fn is_available(&self) -> bool;

    /// Metadata-only probe; no bytes of media are transferred.
    async fn probe_metadata(
        &self,
        url: &str,
        config: &ResolverConfig,
    ) -> Result<MediaInfo, RawFailure>;

    /// Perform the transfer. Returns the final file path. Retries beyond
    /// what `config` encodes belong to the orchestrator, not the resolver.
    async fn perform_download(
        &self,
        url: &str,
        config: &ResolverConfig,
        dest_dir: &Path,
        progress: &dyn ProgressObserver,
    ) -> Result<PathBuf, RawFailure>;
}
