// ytgrab - thin CLI over the yt-dlp engine: single videos, playlists, URL lists

mod downloader;

use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use time::macros::format_description;
use time::OffsetDateTime;

use downloader::{DownloadConfig, DownloadSession, RunStats, YtDlpEngine};

#[derive(Parser, Debug)]
#[command(
    name = "ytgrab",
    version,
    about = "Download online videos in highest quality MP4 via yt-dlp",
    after_help = "Examples:\n  \
        ytgrab \"https://youtube.com/watch?v=VIDEO_ID\"\n  \
        ytgrab \"https://youtube.com/playlist?list=PLAYLIST_ID\"\n  \
        ytgrab --file urls.txt\n  \
        ytgrab --output ~/Videos \"https://youtube.com/watch?v=VIDEO_ID\""
)]
struct Args {
    /// Video or playlist URL
    url: Option<String>,

    /// Text file containing URLs (one per line, # for comments)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Output directory for downloaded videos
    #[arg(short, long, default_value = "./downloads")]
    output: PathBuf,

    /// Proxy URL forwarded to yt-dlp (e.g. socks5://127.0.0.1:1080)
    #[arg(long)]
    proxy: Option<String>,
}

#[derive(Debug, PartialEq)]
enum RunMode {
    Single(String),
    Playlist(String),
    Batch(PathBuf),
}

/// Pick the run mode; a file argument wins over a URL, no input means no mode.
fn classify(url: Option<String>, file: Option<PathBuf>) -> Option<RunMode> {
    if let Some(file) = file {
        return Some(RunMode::Batch(file));
    }
    let url = url?;
    Some(if is_playlist_url(&url) {
        RunMode::Playlist(url)
    } else {
        RunMode::Single(url)
    })
}

/// A URL is treated as a playlist iff it contains the substring "playlist"
/// (case-insensitive). Known limitation: collection URLs without the word
/// (e.g. a channel's uploads page) are treated as single items, and a single
/// video carrying "playlist" in a query parameter is treated as a playlist.
fn is_playlist_url(url: &str) -> bool {
    url.to_lowercase().contains("playlist")
}

fn print_banner() {
    println!("ytgrab session started");
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    if let Ok(stamp) = now.format(&format) {
        println!("{}", stamp);
    }
    println!("{}", "=".repeat(50));
}

async fn run(mode: RunMode, output: PathBuf, proxy: Option<String>) -> Result<RunStats, String> {
    let config = DownloadConfig {
        output_dir: output.clone(),
        proxy,
        ..Default::default()
    };
    let engine = YtDlpEngine::new(config);
    let session = DownloadSession::new(engine, output)
        .map_err(|e| format!("Failed to create output directory: {}", e))?;

    Ok(match mode {
        RunMode::Batch(file) => session.download_from_file(&file).await,
        RunMode::Playlist(url) => session.download_playlist(&url).await,
        RunMode::Single(url) => RunStats::single(session.download_video(&url).await.is_ok()),
    })
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let Some(mode) = classify(args.url, args.file) else {
        let _ = Args::command().print_help();
        std::process::exit(1);
    };

    print_banner();

    let code = tokio::select! {
        result = run(mode, args.output, args.proxy) => match result {
            Ok(stats) => {
                println!("\n{}", "=".repeat(50));
                println!("Download session completed!");
                println!("{}", stats.summary());
                0
            }
            Err(e) => {
                eprintln!("\nUnexpected error: {}", e);
                1
            }
        },
        _ = tokio::signal::ctrl_c() => {
            println!("\nDownload interrupted by user");
            1
        }
    };

    std::process::exit(code);
}
