// Error taxonomy surfaced to callers

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Closed set of failure categories surfaced past the orchestration layer.
///
/// Raw resolver error strings never leak to callers on their own; every
/// failure is mapped to exactly one of these kinds plus a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Authentication required (OAuth failure, login wall)
    AuthRequired,

    /// Video can only be played when embedded in its host page
    EmbedOnly,

    /// Private video requiring owner-granted access
    Private,

    /// Deleted, removed, or otherwise gone
    Unavailable,

    /// Age gate requiring a logged-in account
    AgeRestricted,

    /// Not available in the caller's region
    GeoRestricted,

    /// Timeout / connection-class failure (possibly soft throttling)
    Network,

    /// Anything that matched no known pattern
    Unknown,
}

impl ErrorKind {
    /// Whether retrying the same persona can plausibly change the outcome.
    /// Only transport-level failures qualify; everything else is a property
    /// of the resource or the persona's identity.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Whether authenticated cookies might unlock the resource.
    pub fn cookies_might_help(&self) -> bool {
        matches!(
            self,
            Self::AuthRequired | Self::AgeRestricted | Self::Private
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::AuthRequired => "Authentication required",
            Self::EmbedOnly => "Embed-only video",
            Self::Private => "Private video",
            Self::Unavailable => "Video unavailable",
            Self::AgeRestricted => "Age-restricted content",
            Self::GeoRestricted => "Geographic restriction",
            Self::Network => "Network failure or timeout",
            Self::Unknown => "Unknown error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Crate-level error type. The orchestration API returns `ProbeResult` /
/// `DownloadOutcome` values for classified failures; this enum covers the
/// paths that are errors of the program itself rather than of the resource.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Persona registry violated a construction invariant; the process
    /// must not start.
    #[error("invalid persona registry: {0}")]
    Config(String),

    /// yt-dlp (or whichever resolver) is not installed / not runnable.
    #[error("resolver not available: {0}")]
    ToolNotFound(String),

    /// Caller-requested cancellation observed mid-loop.
    #[error("operation cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_is_retryable() {
        assert!(ErrorKind::Network.is_retryable());
        for kind in [
            ErrorKind::AuthRequired,
            ErrorKind::EmbedOnly,
            ErrorKind::Private,
            ErrorKind::Unavailable,
            ErrorKind::AgeRestricted,
            ErrorKind::GeoRestricted,
            ErrorKind::Unknown,
        ] {
            assert!(!kind.is_retryable(), "{kind} must not be retryable");
        }
    }

    #[test]
    fn cookie_hint_covers_auth_class_kinds() {
        assert!(ErrorKind::AuthRequired.cookies_might_help());
        assert!(ErrorKind::AgeRestricted.cookies_might_help());
        assert!(!ErrorKind::GeoRestricted.cookies_might_help());
    }
}
