// yt-dlp resolver - the production MediaResolver, shelling out to the
// yt-dlp binary
//
// Probe runs `--dump-json` under a hard subprocess timeout. Download
// streams `--newline` progress output and parses it into ProgressEvents.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

use crate::models::{Format, MediaInfo, ProgressEvent};
use crate::resolver::{
    CookieSource, MediaResolver, ProgressObserver, RawFailure, ResolverConfig,
};
use crate::utils::run_output_with_timeout;

lazy_static! {
    static ref PERCENT_LINE: Regex =
        Regex::new(r"\[download\]\s+(\d+(?:\.\d+)?)%").unwrap();
    static ref FRAGMENT_LINE: Regex = Regex::new(r"\(frag (\d+)/(\d+)\)").unwrap();
    static ref DESTINATION_LINE: Regex =
        Regex::new(r"\[download\] Destination: (.+)").unwrap();
    static ref MERGED_LINE: Regex =
        Regex::new(r#"\[Merger\] Merging formats into "(.+)""#).unwrap();
    static ref ALREADY_LINE: Regex =
        Regex::new(r"\[download\] (.+) has already been downloaded").unwrap();
}

/// Resolver backed by the yt-dlp binary.
pub struct YtDlp {
    binary: String,
}

impl YtDlp {
    pub fn new() -> Self {
        Self {
            binary: Self::find_binary(),
        }
    }

    pub fn with_binary(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }

    /// Find the yt-dlp binary across common install locations.
    fn find_binary() -> String {
        let common_paths = [
            "/opt/homebrew/bin/yt-dlp",
            "/usr/local/bin/yt-dlp",
            "/usr/bin/yt-dlp",
        ];

        for path in common_paths {
            if Path::new(path).exists() {
                return path.to_string();
            }
        }

        if let Ok(output) = StdCommand::new("which").arg("yt-dlp").output() {
            if output.status.success() {
                if let Ok(path) = String::from_utf8(output.stdout) {
                    let trimmed = path.trim();
                    if !trimmed.is_empty() {
                        return trimmed.to_string();
                    }
                }
            }
        }

        "yt-dlp".to_string()
    }

    /// Arguments shared by probe and download: identity, cookies, network.
    fn identity_args(url: &str, config: &ResolverConfig) -> Vec<String> {
        let mut args = Vec::new();

        for (name, value) in &config.headers {
            args.push("--add-header".to_string());
            args.push(format!("{name}:{value}"));
        }

        // Player client hints only mean anything to platform extractors
        let is_platform = url.to_lowercase().contains("youtube.com")
            || url.to_lowercase().contains("youtu.be");
        if is_platform {
            if let Some(client) = config.player_client {
                args.push("--extractor-args".to_string());
                args.push(format!("youtube:player_client={client}"));
            }
        }

        match &config.cookies {
            Some(CookieSource::File(path)) => {
                args.push("--cookies".to_string());
                args.push(path.display().to_string());
            }
            Some(CookieSource::Browser(browser)) => {
                args.push("--cookies-from-browser".to_string());
                args.push(browser.clone());
            }
            None => {}
        }

        if let Some(proxy) = &config.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        args.push("--socket-timeout".to_string());
        args.push(config.timeout.as_secs().to_string());

        args
    }

    fn probe_args(url: &str, config: &ResolverConfig) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--retries".to_string(),
            config.retries.to_string(),
        ];
        args.extend(Self::identity_args(url, config));
        args.push(url.to_string());
        args
    }

    fn download_args(url: &str, config: &ResolverConfig, dest_dir: &Path) -> Vec<String> {
        let template = dest_dir.join("%(title).200s.%(ext)s");
        let mut args = vec![
            "--no-playlist".to_string(),
            "--newline".to_string(),
            "--format".to_string(),
            config.format_selector.clone(),
            "--output".to_string(),
            template.display().to_string(),
            "--retries".to_string(),
            config.retries.to_string(),
        ];

        if let Some(policy) = &config.fragment_policy {
            args.push("--concurrent-fragments".to_string());
            args.push(policy.concurrent_downloads.to_string());
            args.push("--fragment-retries".to_string());
            args.push(policy.fragment_retries.to_string());
            if !policy.skip_unavailable {
                args.push("--abort-on-unavailable-fragments".to_string());
            }
        }

        args.extend(Self::identity_args(url, config));
        args.push(url.to_string());
        args
    }

    fn parse_info(stdout: &[u8]) -> Result<MediaInfo, RawFailure> {
        let json_str = String::from_utf8_lossy(stdout);
        let json: serde_json::Value = serde_json::from_str(&json_str)
            .map_err(|e| RawFailure::new("parse", format!("invalid JSON: {e}")))?;

        let formats = Self::parse_formats(&json)?;
        if formats.is_empty() {
            return Err(RawFailure::new("parse", "no downloadable formats resolved"));
        }

        Ok(MediaInfo {
            id: json["id"].as_str().unwrap_or("unknown").to_string(),
            title: json["title"].as_str().unwrap_or("Unknown").to_string(),
            uploader: json["uploader"].as_str().unwrap_or("Unknown").to_string(),
            duration_seconds: json["duration"].as_f64().unwrap_or(0.0) as u64,
            view_count: json["view_count"].as_u64().unwrap_or(0),
            webpage_url: json["webpage_url"].as_str().unwrap_or("").to_string(),
            formats,
        })
    }

    fn parse_formats(json: &serde_json::Value) -> Result<Vec<Format>, RawFailure> {
        let formats_array = json["formats"]
            .as_array()
            .ok_or_else(|| RawFailure::new("parse", "no formats array in JSON"))?;

        let mut formats = Vec::new();
        for f in formats_array {
            let fragments = f["fragments"].as_array();
            let protocol = f["protocol"].as_str().unwrap_or("");
            let is_fragmented = fragments.is_some()
                || protocol.contains("m3u8")
                || protocol.contains("dash");

            formats.push(Format {
                format_id: f["format_id"].as_str().unwrap_or("").to_string(),
                container: f["ext"].as_str().unwrap_or("").to_string(),
                height: f["height"].as_u64().map(|h| h as u32),
                filesize: f["filesize"].as_u64(),
                is_fragmented,
                fragment_count: fragments.map(|frags| frags.len() as u32),
            });
        }

        Ok(formats)
    }

    /// Turn one `--newline` output line into a progress event, if it is one.
    fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
        if let Some(caps) = FRAGMENT_LINE.captures(line) {
            let index = caps[1].parse().ok()?;
            let count = caps[2].parse().ok()?;
            return Some(ProgressEvent::Fragment { index, count });
        }
        if let Some(caps) = PERCENT_LINE.captures(line) {
            let percent = caps[1].parse().ok()?;
            return Some(ProgressEvent::Downloading { percent });
        }
        None
    }

    /// Track the file yt-dlp is writing, preferring the merged output.
    fn parse_destination(line: &str, current: &mut Option<PathBuf>) {
        if let Some(caps) = MERGED_LINE.captures(line) {
            *current = Some(PathBuf::from(&caps[1]));
        } else if let Some(caps) = ALREADY_LINE.captures(line) {
            *current = Some(PathBuf::from(&caps[1]));
        } else if let Some(caps) = DESTINATION_LINE.captures(line) {
            *current = Some(PathBuf::from(&caps[1]));
        }
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaResolver for YtDlp {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn is_available(&self) -> bool {
        match StdCommand::new(&self.binary).arg("--version").output() {
            Ok(out) => out.status.success(),
            Err(_) => false,
        }
    }

    async fn probe_metadata(
        &self,
        url: &str,
        config: &ResolverConfig,
    ) -> Result<MediaInfo, RawFailure> {
        let args = Self::probe_args(url, config);
        debug!(persona = %config.persona_id, "probing via {} {}", self.binary, args.join(" "));

        // Hard timeout above the socket timeout so a wedged child cannot
        // stall the persona loop.
        let budget = config.timeout.as_secs() + 15;
        let output = run_output_with_timeout(&self.binary, &args, budget)
            .await
            .map_err(|e| RawFailure::new("spawn", e))?;

        if output.status.success() {
            Self::parse_info(&output.stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(RawFailure::new("extract", stderr.trim().to_string()))
        }
    }

    async fn perform_download(
        &self,
        url: &str,
        config: &ResolverConfig,
        dest_dir: &Path,
        progress: &dyn ProgressObserver,
    ) -> Result<PathBuf, RawFailure> {
        let args = Self::download_args(url, config, dest_dir);
        debug!(persona = %config.persona_id, "downloading via {} {}", self.binary, args.join(" "));

        let mut child = TokioCommand::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                RawFailure::new("spawn", format!("failed to start {}: {e}", self.binary))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RawFailure::new("spawn", "failed to capture stdout"))?;
        let mut stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| RawFailure::new("spawn", "failed to capture stderr"))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr_pipe.read_to_end(&mut buf).await;
            buf
        });

        let mut destination: Option<PathBuf> = None;
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            Self::parse_destination(&line, &mut destination);
            if let Some(event) = Self::parse_progress_line(&line) {
                progress.on_event(&event);
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| RawFailure::new("spawn", format!("failed to wait: {e}")))?;
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            let message = String::from_utf8_lossy(&stderr).trim().to_string();
            warn!(persona = %config.persona_id, "yt-dlp exited with {status}");
            return Err(RawFailure::new("download", message));
        }

        match destination {
            Some(path) => {
                progress.on_event(&ProgressEvent::Finished {
                    filename: path.display().to_string(),
                });
                Ok(path)
            }
            None => Err(RawFailure::new(
                "download",
                "yt-dlp reported success but no destination file",
            )),
        }
    }
}
