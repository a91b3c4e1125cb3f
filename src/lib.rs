// uvd - universal video downloader library
//
// The engineering core is the restriction-bypass orchestration engine:
// classify the URL, walk an ordered registry of client personas, retry
// each with bounded backoff, classify failures, and escalate until one
// persona succeeds or all are exhausted. Network fetch/decode is owned by
// an external resolver (yt-dlp) behind the MediaResolver contract.

pub mod diagnostics;
pub mod dispatcher;
pub mod errors;
pub mod fragments;
pub mod models;
pub mod orchestrator;
pub mod personas;
pub mod platform;
pub mod resolver;
pub mod utils;
pub mod ytdlp;

pub use diagnostics::{classify, Classified};
pub use errors::{DownloadError, ErrorKind};
pub use fragments::{Delivery, FragmentPolicy};
pub use models::{
    AttemptOutcome, AttemptRecord, DownloadOutcome, Format, MediaInfo, ProbeOutcome,
    ProbeResult, ProgressEvent,
};
pub use orchestrator::{Orchestrator, RetryPolicy};
pub use personas::{default_registry, ClientKind, Persona, PersonaRegistry};
pub use platform::{alternate_urls, classify_url, UrlCategory};
pub use resolver::{
    BrowserCookies, CookieLookupError, CookieProvider, CookieSource, FileCookies,
    MediaResolver, NullProgress, ProgressObserver, RawFailure, ResolverConfig,
};
pub use ytdlp::YtDlp;
