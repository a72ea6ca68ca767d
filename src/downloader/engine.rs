// yt-dlp engine - the external extraction/download capability behind a trait
//
// Probes run the binary to completion under a timeout and parse its JSON
// output; fetch streams stdout line by line so download progress can be
// re-printed as it happens.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::io::Write;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command as TokioCommand;

use super::errors::DownloadError;
use super::models::{DownloadConfig, PlaylistEntry, PlaylistInfo, VideoInfo};
use super::utils::{run_output_with_timeout, spawn_error};

/// External engine operations consumed by the download session
#[async_trait]
pub trait VideoEngine: Send + Sync {
    /// Name of the engine (for diagnostics)
    fn name(&self) -> &'static str;

    /// Resolve single-item metadata; no media transfer
    async fn probe_video(&self, url: &str) -> Result<VideoInfo, DownloadError>;

    /// Resolve playlist title and member entries; no media transfer
    async fn probe_playlist(&self, url: &str) -> Result<PlaylistInfo, DownloadError>;

    /// Perform the transfer, writing the muxed file to the configured directory
    async fn fetch(&self, url: &str) -> Result<(), DownloadError>;
}

/// yt-dlp subprocess engine
pub struct YtDlpEngine {
    ytdlp_path: String,
    config: DownloadConfig,
}

impl YtDlpEngine {
    pub fn new(config: DownloadConfig) -> Self {
        Self {
            ytdlp_path: find_ytdlp(),
            config,
        }
    }

    /// Wall-clock limit for probe subprocesses; generous next to the socket timeout
    fn probe_timeout(&self) -> u64 {
        u64::from(self.config.socket_timeout) * 2
    }

    fn common_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.config.socket_timeout.to_string(),
            "--retries".to_string(),
            self.config.retries.to_string(),
        ];
        if let Some(proxy) = &self.config.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }
        args
    }

    fn probe_video_args(&self, url: &str) -> Vec<String> {
        let mut args = vec!["--dump-json".to_string(), "--no-playlist".to_string()];
        args.extend(self.common_args());
        args.push(url.to_string());
        args
    }

    fn probe_playlist_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--flat-playlist".to_string(),
        ];
        if self.config.ignore_entry_errors {
            args.push("--ignore-errors".to_string());
        }
        args.extend(self.common_args());
        args.push(url.to_string());
        args
    }

    fn fetch_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            self.config.format.clone(),
            "--no-playlist".to_string(),
            "--newline".to_string(),
            "--merge-output-format".to_string(),
            self.config.merge_format.clone(),
            "-P".to_string(),
            self.config.output_dir.to_string_lossy().to_string(),
            // Default yt-dlp template is "%(title)s [%(id)s].%(ext)s" — override to remove [id]
            "-o".to_string(),
            self.config.output_template.clone(),
        ];
        if !self.config.write_subtitles {
            args.push("--no-write-subs".to_string());
            args.push("--no-write-auto-subs".to_string());
        }
        if !self.config.write_info_json {
            args.push("--no-write-info-json".to_string());
        }
        if self.config.ignore_entry_errors {
            args.push("--ignore-errors".to_string());
        }
        args.extend(self.common_args());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl VideoEngine for YtDlpEngine {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn probe_video(&self, url: &str) -> Result<VideoInfo, DownloadError> {
        let args = self.probe_video_args(url);
        let output =
            run_output_with_timeout(&self.ytdlp_path, &args, self.probe_timeout()).await?;

        if !output.status.success() {
            return Err(DownloadError::from(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        parse_video_info(&output.stdout)
    }

    async fn probe_playlist(&self, url: &str) -> Result<PlaylistInfo, DownloadError> {
        let args = self.probe_playlist_args(url);
        let output =
            run_output_with_timeout(&self.ytdlp_path, &args, self.probe_timeout()).await?;

        if !output.status.success() {
            return Err(DownloadError::from(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        parse_playlist_info(&output.stdout)
    }

    async fn fetch(&self, url: &str) -> Result<(), DownloadError> {
        let args = self.fetch_args(url);
        let mut child = TokioCommand::new(&self.ytdlp_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&self.ytdlp_path, &e))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            DownloadError::ExecutionError("Failed to capture yt-dlp stdout".to_string())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            DownloadError::ExecutionError("Failed to capture yt-dlp stderr".to_string())
        })?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = BufReader::new(stderr).read_to_string(&mut buf).await;
            buf
        });

        // Re-print progress as yt-dlp reports it (--newline gives one event per line)
        let mut lines = BufReader::new(stdout).lines();
        let mut printed_progress = false;
        while let Some(line) = lines.next_line().await.map_err(|e| {
            DownloadError::ExecutionError(format!("Failed to read yt-dlp output: {}", e))
        })? {
            if let Some(status) = parse_progress(&line) {
                print!("\r{}", status);
                let _ = std::io::stdout().flush();
                printed_progress = true;
            }
        }
        if printed_progress {
            println!();
        }

        let status = child.wait().await.map_err(|e| {
            DownloadError::ExecutionError(format!("Failed to wait for yt-dlp: {}", e))
        })?;
        let stderr_output = stderr_task.await.unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(DownloadError::from(stderr_output))
        }
    }
}

/// Find the yt-dlp binary in common install locations, then PATH
fn find_ytdlp() -> String {
    let common_paths = [
        "/opt/homebrew/bin/yt-dlp",
        "/usr/local/bin/yt-dlp",
        "/usr/bin/yt-dlp",
    ];

    for path in common_paths {
        if std::path::Path::new(path).exists() {
            return path.to_string();
        }
    }

    if let Ok(output) = std::process::Command::new("which").arg("yt-dlp").output() {
        if output.status.success() {
            if let Ok(path) = String::from_utf8(output.stdout) {
                let trimmed = path.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
        }
    }

    // Hope it's in PATH
    "yt-dlp".to_string()
}

fn parse_video_info(stdout: &[u8]) -> Result<VideoInfo, DownloadError> {
    let json_str = String::from_utf8_lossy(stdout);
    let json: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| DownloadError::ParseError(format!("Invalid JSON: {}", e)))?;

    Ok(VideoInfo {
        id: json["id"].as_str().unwrap_or("unknown").to_string(),
        title: json["title"].as_str().unwrap_or("Unknown").to_string(),
        uploader: json["uploader"].as_str().unwrap_or("Unknown").to_string(),
        duration: json["duration"]
            .as_f64()
            .map(|d| d as u64)
            .filter(|d| *d > 0),
    })
}

fn parse_playlist_info(stdout: &[u8]) -> Result<PlaylistInfo, DownloadError> {
    let json_str = String::from_utf8_lossy(stdout);
    let json: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| DownloadError::ParseError(format!("Invalid JSON: {}", e)))?;

    let entries = json["entries"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .map(|entry| {
                    if entry.is_null() {
                        return None;
                    }
                    Some(PlaylistEntry {
                        id: entry["id"].as_str().unwrap_or("").to_string(),
                        url: entry["url"]
                            .as_str()
                            .or_else(|| entry["webpage_url"].as_str())
                            .map(str::to_string),
                        title: entry["title"].as_str().map(str::to_string),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(PlaylistInfo {
        title: json["title"].as_str().unwrap_or("Unknown Playlist").to_string(),
        entries,
    })
}

lazy_static! {
    // Example: [download]  12.5% of ~ 310.04MiB at  374.36KiB/s ETA 11:59
    static ref PROGRESS_RE: Regex = Regex::new(
        r"\[download\]\s+(\d+\.?\d*)%\s+of\s+~?\s*(\d+\.?\d*\s*\w+)\s+at\s+(\d+\.?\d*\s*\w+/s)(?:\s+ETA\s+(\S+))?"
    ).unwrap();
    static ref DEST_RE: Regex = Regex::new(r"\[download\]\s+Destination:\s+(.+)").unwrap();
    static ref MERGE_RE: Regex = Regex::new(r"\[Merger?\]\s+Merging").unwrap();
    static ref ALREADY_RE: Regex = Regex::new(r"has already been downloaded").unwrap();
}

/// Turn a yt-dlp output line into a console status line, if it is one we report
fn parse_progress(line: &str) -> Option<String> {
    if let Some(caps) = PROGRESS_RE.captures(line) {
        let percent = caps.get(1)?.as_str();
        let size = caps.get(2).map_or("?", |m| m.as_str());
        let speed = caps.get(3).map_or("?", |m| m.as_str());
        let eta = caps.get(4).map_or("", |m| m.as_str());

        return Some(if eta.is_empty() {
            format!("  {}% of {} at {}", percent, size, speed)
        } else {
            format!("  {}% of {} at {} ETA {}", percent, size, speed, eta)
        });
    }

    if let Some(caps) = DEST_RE.captures(line) {
        let filename = caps.get(1).map_or("file", |m| m.as_str());
        let short_name = filename.rsplit('/').next().unwrap_or(filename);
        return Some(format!("  Destination: {}", short_name));
    }

    if MERGE_RE.is_match(line) {
        return Some("  Merging video and audio...".to_string());
    }

    if ALREADY_RE.is_match(line) {
        return Some("  File already downloaded".to_string());
    }

    None
}
