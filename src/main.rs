// Thin CLI over the orchestration engine

use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use uvd::{
    alternate_urls, classify_url, default_registry, BrowserCookies, CookieProvider,
    DownloadError, DownloadOutcome, FileCookies, MediaResolver, Orchestrator,
    ProbeOutcome, ProgressEvent, ProgressObserver, YtDlp,
};

#[derive(Parser, Debug)]
#[command(name = "uvd", about = "Universal video downloader", version)]
struct Args {
    /// Video URL (YouTube, Vimeo, HLS/DASH manifest, or direct file)
    url: String,

    /// Output directory (defaults to the system download directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only test accessibility and print metadata, no download
    #[arg(long)]
    check: bool,

    /// Netscape-format cookies file
    #[arg(long, conflicts_with = "browser")]
    cookies_file: Option<PathBuf>,

    /// Browser to extract cookies from
    #[arg(long, default_value = "chrome")]
    browser: String,

    /// Proxy URL (e.g. socks5://127.0.0.1:1080)
    #[arg(long)]
    proxy: Option<String>,
}

struct ConsoleProgress;

impl ProgressObserver for ConsoleProgress {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Downloading { percent } => {
                print!("\rDownloading: {percent:.1}%");
                let _ = std::io::stdout().flush();
            }
            ProgressEvent::Fragment { index, count } => {
                let percent = (*index as f32 / *count as f32) * 100.0;
                print!("\rDownloading chunk {index}/{count} ({percent:.1}%)");
                let _ = std::io::stdout().flush();
            }
            ProgressEvent::Finished { filename } => {
                println!("\nDownload finished: {filename}");
            }
        }
    }
}

fn format_duration(seconds: u64) -> String {
    format!("{}:{:02} ({seconds}s)", seconds / 60, seconds % 60)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let resolver = YtDlp::new();
    if !resolver.is_available() {
        eprintln!("yt-dlp binary not found. Install it: brew install yt-dlp / pip3 install yt-dlp");
        return ExitCode::FAILURE;
    }

    let registry = match default_registry() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let cookie_provider: Arc<dyn CookieProvider> = match &args.cookies_file {
        Some(path) => Arc::new(FileCookies { path: path.clone() }),
        None => Arc::new(BrowserCookies),
    };

    let cancel = CancellationToken::new();
    let ctrlc_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\ninterrupted, stopping...");
            ctrlc_token.cancel();
        }
    });

    let orchestrator = Orchestrator::new(resolver, registry)
        .with_cookie_provider(cookie_provider)
        .with_cookie_browser(&args.browser)
        .with_proxy(args.proxy.clone())
        .with_cancellation(cancel);

    let category = classify_url(&args.url);
    println!("URL category: {category}");

    let probe = match orchestrator.test_accessibility(&args.url).await {
        Ok(probe) => probe,
        Err(DownloadError::Cancelled) => return ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    debug!(calls = probe.resolver_calls(), "probe finished");

    match &probe.outcome {
        ProbeOutcome::Failure {
            kind, suggestion, ..
        } => {
            eprintln!("Cannot access video: {kind}");
            eprintln!("Suggestion: {suggestion}");
            let alternates = alternate_urls(&args.url);
            if !alternates.is_empty() {
                eprintln!("Alternate URLs worth trying:");
                for alt in alternates {
                    eprintln!("  {alt}");
                }
            }
            return ExitCode::FAILURE;
        }
        ProbeOutcome::Success { info, persona_id } => {
            println!("Title:    {}", info.title);
            println!("Duration: {}", format_duration(info.duration_seconds));
            println!("Views:    {}", info.view_count);
            println!("Channel:  {}", info.uploader);
            println!("Resolved via persona '{persona_id}'");
        }
    }

    if args.check {
        println!("Video URL is accessible.");
        return ExitCode::SUCCESS;
    }

    let dest_dir = args
        .output
        .or_else(dirs::download_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    if let Err(e) = std::fs::create_dir_all(&dest_dir) {
        eprintln!("cannot create output directory {}: {e}", dest_dir.display());
        return ExitCode::FAILURE;
    }

    match orchestrator
        .resolve_and_download(&args.url, &dest_dir, &ConsoleProgress)
        .await
    {
        Ok(DownloadOutcome::Success { file_path }) => {
            println!("File saved to: {}", file_path.display());
            ExitCode::SUCCESS
        }
        Ok(DownloadOutcome::Failure { kind, suggestion }) => {
            eprintln!("Download failed: {kind}");
            eprintln!("Suggestion: {suggestion}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
