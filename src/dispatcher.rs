// Download dispatch - builds the final resolver configuration and
// delegates the transfer
//
// No retry loop here: retries beyond what the resolver config encodes
// would duplicate the orchestrator's job and risk re-probing through
// personas that already failed.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::diagnostics::classify;
use crate::errors::DownloadError;
use crate::fragments::{Delivery, TRANSFER_TIMEOUT_SECS, WHOLE_FILE_RETRIES};
use crate::models::DownloadOutcome;
use crate::personas::Persona;
use crate::resolver::{
    CookieSource, MediaResolver, ProgressObserver, ResolverConfig,
};

/// Perform the transfer with the winning persona's identity and the
/// delivery-appropriate policy. Resolver failures come back classified
/// into the same ErrorKind vocabulary the probe path uses.
#[allow(clippy::too_many_arguments)]
pub async fn dispatch<R: MediaResolver>(
    resolver: &R,
    persona: &Persona,
    cookies: Option<CookieSource>,
    delivery: Delivery,
    proxy: Option<String>,
    url: &str,
    dest_dir: &Path,
    progress: &dyn ProgressObserver,
) -> Result<DownloadOutcome, DownloadError> {
    let config = ResolverConfig::for_persona(persona)
        .with_cookies(cookies)
        .with_timeout(Duration::from_secs(TRANSFER_TIMEOUT_SECS))
        .with_retries(WHOLE_FILE_RETRIES)
        .with_fragment_policy(delivery.fragment_policy())
        .with_proxy(proxy);

    match resolver.perform_download(url, &config, dest_dir, progress).await {
        Ok(file_path) => {
            info!(path = %file_path.display(), "download complete");
            Ok(DownloadOutcome::Success { file_path })
        }
        Err(raw) => {
            let classified = classify(&raw);
            warn!(kind = %classified.kind, error = %raw.message, "download failed");
            Ok(DownloadOutcome::Failure {
                kind: classified.kind,
                suggestion: classified.suggestion.to_string(),
            })
        }
    }
}
