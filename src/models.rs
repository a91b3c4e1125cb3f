// Common data models for probing and downloading

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::ErrorKind;

/// Metadata resolved for a resource, without downloading anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub id: String,
    pub title: String,
    pub uploader: String,
    pub duration_seconds: u64,
    pub view_count: u64,
    pub webpage_url: String,
    /// Never empty on a successful probe.
    pub formats: Vec<Format>,
}

/// One resolved delivery format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Format {
    pub format_id: String,
    /// Container / extension (mp4, webm, m4a, ...)
    pub container: String,
    pub height: Option<u32>,
    pub filesize: Option<u64>,
    /// Delivered as discrete fragments (HLS/DASH style) rather than one file.
    pub is_fragmented: bool,
    pub fragment_count: Option<u32>,
}

/// Outcome of a single (persona, retry) pair. Diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    RetryableFailure,
    FatalFailure,
}

/// Ephemeral per-attempt record produced during orchestration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub persona_id: String,
    /// 1-based within the persona.
    pub attempt_number: u32,
    pub outcome: AttemptOutcome,
    pub elapsed_ms: u64,
}

/// Final outcome of a probe: exactly one of success or classified failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ProbeOutcome {
    Success {
        info: MediaInfo,
        /// Id of the persona that resolved the resource.
        persona_id: String,
    },
    Failure {
        kind: ErrorKind,
        raw_message: String,
        suggestion: String,
    },
}

/// Probe result plus the attempt trail that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub outcome: ProbeOutcome,
    pub attempts: Vec<AttemptRecord>,
}

impl ProbeResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Success { .. })
    }

    /// Total resolver calls made during this probe.
    pub fn resolver_calls(&self) -> usize {
        self.attempts.len()
    }
}

/// Final outcome of a resolve-and-download operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum DownloadOutcome {
    Success { file_path: PathBuf },
    Failure { kind: ErrorKind, suggestion: String },
}

/// Progress surfaced to the caller during a download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum ProgressEvent {
    /// Whole-file progress.
    Downloading { percent: f32 },
    /// Fragment-by-fragment progress for segmented streams.
    Fragment { index: u32, count: u32 },
    Finished { filename: String },
}
