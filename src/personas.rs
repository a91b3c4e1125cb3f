// Persona registry - ordered client identities used to probe a resource
//
// Personas are data, not control flow: the escalation policy lives in this
// ordered registry, and the orchestrator just walks it. The registry is
// built once at process start and never mutated.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::errors::DownloadError;
use crate::platform::UrlCategory;

const DESKTOP_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36";
const ANDROID_UA: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Mobile Safari/537.36";
const IOS_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) \
     AppleWebKit/605.1.15 (Version/17.5 Mobile/15E148 Safari/604.1)";

/// Device/client identity class a persona presents as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClientKind {
    Web,
    MobileAndroid,
    MobileIos,
    TvEmbedded,
    Minimal,
}

impl ClientKind {
    /// Per-persona retry budget. Cookie-bearing interactive clients get
    /// fewer attempts (each request is intrusive), the minimal stateless
    /// fallback gets the most.
    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::Web => 2,
            Self::MobileAndroid | Self::MobileIos | Self::TvEmbedded => 3,
            Self::Minimal => 4,
        }
    }

    /// Which URL categories this client kind can plausibly serve. Mobile
    /// and TV player identities only mean anything to platform APIs.
    pub fn eligible_for(&self, category: UrlCategory) -> bool {
        match self {
            Self::Web | Self::Minimal => true,
            Self::MobileAndroid | Self::MobileIos => matches!(
                category,
                UrlCategory::PlatformHosted | UrlCategory::StreamManifest
            ),
            Self::TvEmbedded => category == UrlCategory::PlatformHosted,
        }
    }

    /// Player-client hint passed to the resolver, where one applies.
    pub fn player_client(&self) -> Option<&'static str> {
        match self {
            Self::Web => Some("web"),
            Self::MobileAndroid => Some("android"),
            Self::MobileIos => Some("ios"),
            Self::TvEmbedded => Some("tv"),
            Self::Minimal => None,
        }
    }
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Web => write!(f, "web"),
            Self::MobileAndroid => write!(f, "mobile-android"),
            Self::MobileIos => write!(f, "mobile-ios"),
            Self::TvEmbedded => write!(f, "tv-embedded"),
            Self::Minimal => write!(f, "minimal"),
        }
    }
}

/// Immutable client identity/configuration bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    /// Stable identifier, unique within the registry.
    pub id: String,
    pub client_kind: ClientKind,
    /// Ordered header name → value pairs. Names compare case-insensitively.
    pub headers: Vec<(String, String)>,
    /// Attach authenticated cookies from the cookie provider.
    pub uses_cookies: bool,
    /// Lower = tried first. Strictly increasing across the registry.
    pub priority: u32,
}

impl Persona {
    pub fn new(id: &str, client_kind: ClientKind, priority: u32) -> Self {
        Self {
            id: id.to_string(),
            client_kind,
            headers: Vec::new(),
            uses_cookies: false,
            priority,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_cookies(mut self, enabled: bool) -> Self {
        self.uses_cookies = enabled;
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn max_attempts(&self) -> u32 {
        self.client_kind.max_attempts()
    }
}

/// Ordered, validated, read-only sequence of personas.
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: Vec<Persona>,
}

impl PersonaRegistry {
    /// Validate and build a registry. Fails fast on an empty set,
    /// duplicate ids, or priorities that are not strictly increasing.
    pub fn new(personas: Vec<Persona>) -> Result<Self, DownloadError> {
        if personas.is_empty() {
            return Err(DownloadError::Config(
                "persona registry must not be empty".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        for persona in &personas {
            if !ids.insert(persona.id.as_str()) {
                return Err(DownloadError::Config(format!(
                    "duplicate persona id '{}'",
                    persona.id
                )));
            }
        }

        for pair in personas.windows(2) {
            if pair[1].priority <= pair[0].priority {
                return Err(DownloadError::Config(format!(
                    "persona priorities must be strictly increasing: \
                     '{}' ({}) is not above '{}' ({})",
                    pair[1].id, pair[1].priority, pair[0].id, pair[0].priority
                )));
            }
        }

        Ok(Self { personas })
    }

    /// Personas applicable to a URL category, ascending by priority.
    pub fn eligible(&self, category: UrlCategory) -> Vec<&Persona> {
        self.personas
            .iter()
            .filter(|p| p.client_kind.eligible_for(category))
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Persona> {
        self.personas.iter()
    }
}

/// The shipped persona set. Ordered by increasing cost/intrusiveness is
/// inverted here on purpose: the cookie-bearing web client has the highest
/// success probability and goes first, the minimal stateless client is the
/// last resort.
pub fn default_registry() -> Result<PersonaRegistry, DownloadError> {
    PersonaRegistry::new(vec![
        Persona::new("web-cookies", ClientKind::Web, 10)
            .with_header("User-Agent", DESKTOP_UA)
            .with_header("Accept", "*/*")
            .with_header("Accept-Language", "en-US,en;q=0.7")
            .with_cookies(true),
        Persona::new("android", ClientKind::MobileAndroid, 20)
            .with_header("User-Agent", ANDROID_UA)
            .with_header("Accept", "*/*"),
        Persona::new("ios", ClientKind::MobileIos, 30)
            .with_header("User-Agent", IOS_UA)
            .with_header("Accept", "*/*"),
        Persona::new("tv-embedded", ClientKind::TvEmbedded, 40)
            .with_header("User-Agent", DESKTOP_UA),
        Persona::new("minimal", ClientKind::Minimal, 50),
    ])
}
