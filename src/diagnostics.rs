// Failure classification - maps raw resolver errors to the ErrorKind
// taxonomy plus a remediation suggestion
//
// Ordered pattern rules, evaluated top to bottom, first match wins.
// Specific patterns (e.g. "oauth token") must precede generic ones; the
// table order is part of the design, not an accident.

use crate::errors::ErrorKind;
use crate::resolver::RawFailure;

/// A classified failure: one kind, one human-readable suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub kind: ErrorKind,
    pub suggestion: &'static str,
}

struct Rule {
    patterns: &'static [&'static str],
    kind: ErrorKind,
    suggestion: &'static str,
}

/// Evaluated top to bottom against the lowercased category + message.
static RULES: &[Rule] = &[
    Rule {
        patterns: &["oauth token", "oauth", "login required", "authentication failed"],
        kind: ErrorKind::AuthRequired,
        suggestion: "Authentication failed. Try cookies from a logged-in \
             browser, or use the webpage URL that embeds this video instead \
             of the direct player URL.",
    },
    Rule {
        patterns: &["embed-only", "only be played when embedded", "non-embeddable"],
        kind: ErrorKind::EmbedOnly,
        suggestion: "This video can only be played when embedded. Find the \
             webpage that displays it and use that URL instead.",
    },
    Rule {
        patterns: &[
            "age-restricted",
            "sign in to confirm your age",
            "age_verification",
        ],
        kind: ErrorKind::AgeRestricted,
        suggestion: "Age-restricted content. Use cookies from a logged-in \
             account that is 18+.",
    },
    Rule {
        patterns: &[
            "private video",
            "video is private",
            "sign in if you've been granted access",
        ],
        kind: ErrorKind::Private,
        suggestion: "This video is private. Only accounts granted access by \
             the owner can download it; use their cookies.",
    },
    Rule {
        patterns: &[
            "available in your country",
            "blocked in your country",
            "geographic restriction",
            "geo-restricted",
        ],
        kind: ErrorKind::GeoRestricted,
        suggestion: "Not available in your region. Use a VPN or proxy in an \
             allowed country.",
    },
    Rule {
        patterns: &[
            "timeout",
            "timed out",
            "connection refused",
            "connection reset",
            "network unreachable",
            "temporary failure",
            "429",
            "too many requests",
        ],
        kind: ErrorKind::Network,
        suggestion: "Network failure or throttling. Check your connection, \
             wait a few minutes, or switch networks.",
    },
    Rule {
        patterns: &[
            "video unavailable",
            "is unavailable",
            "has been removed",
            "no longer available",
            "404",
            "not found",
        ],
        kind: ErrorKind::Unavailable,
        suggestion: "Video unavailable. It may have been deleted, made \
             private, or removed for a policy violation.",
    },
];

const UNKNOWN_SUGGESTION: &str = "Unknown error. Check the URL, try again \
     later, or try an alternate URL for the same video.";

/// Map a raw resolver failure to exactly one ErrorKind plus suggestion.
/// Side-effect-free; no match falls back to `Unknown`.
pub fn classify(raw: &RawFailure) -> Classified {
    let haystack = format!("{} {}", raw.category, raw.message).to_lowercase();

    for rule in RULES {
        if rule.patterns.iter().any(|p| haystack.contains(p)) {
            return Classified {
                kind: rule.kind,
                suggestion: rule.suggestion,
            };
        }
    }

    Classified {
        kind: ErrorKind::Unknown,
        suggestion: UNKNOWN_SUGGESTION,
    }
}
