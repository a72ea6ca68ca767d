// Common data models for the download session

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Immutable per-run configuration handed to the engine.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Destination directory (created before any download starts)
    pub output_dir: PathBuf,

    /// yt-dlp format selector: best MP4 video+audio, falling back to best available
    pub format: String,

    /// Container to merge separate video/audio streams into
    pub merge_format: String,

    /// Output filename template
    pub output_template: String,

    /// Write subtitle sidecar files
    pub write_subtitles: bool,

    /// Write per-item .info.json sidecar files
    pub write_info_json: bool,

    /// Skip rather than abort when a single playlist entry fails inside yt-dlp
    pub ignore_entry_errors: bool,

    /// Proxy URL forwarded to yt-dlp (e.g. "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// Socket timeout in seconds
    pub socket_timeout: u32,

    /// Retry count for yt-dlp network operations
    pub retries: u32,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./downloads"),
            format: "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string(),
            merge_format: "mp4".to_string(),
            output_template: "%(title)s.%(ext)s".to_string(),
            write_subtitles: false,
            write_info_json: false,
            ignore_entry_errors: true,
            proxy: None,
            socket_timeout: 30,
            retries: 5,
        }
    }
}

/// Video metadata from a probe (reporting only, never persisted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub uploader: String,
    /// Duration in seconds; absent or zero means unknown
    pub duration: Option<u64>,
}

impl VideoInfo {
    pub fn duration_display(&self) -> String {
        format_duration(self.duration)
    }
}

/// Format a duration in seconds as "minutes:seconds"
pub fn format_duration(duration: Option<u64>) -> String {
    match duration {
        Some(secs) => format!("{}:{:02}", secs / 60, secs % 60),
        None => "Unknown".to_string(),
    }
}

/// One member of a playlist, as reported by a flat-playlist probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub id: String,
    pub url: Option<String>,
    pub title: Option<String>,
}

impl PlaylistEntry {
    /// Direct item URL: the explicit URL when present, else one built from the id.
    pub fn item_url(&self) -> Option<String> {
        match &self.url {
            Some(u) if !u.is_empty() => Some(u.clone()),
            _ if !self.id.is_empty() => Some(format!("https://youtube.com/watch?v={}", self.id)),
            _ => None,
        }
    }
}

/// Playlist metadata with its ordered member entries.
///
/// Entries can be `None`: the service reports removed or hidden members as
/// null slots, which still count towards the playlist total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistInfo {
    pub title: String,
    pub entries: Vec<Option<PlaylistEntry>>,
}

/// Success/total counters for one run mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub successful: usize,
    pub total: usize,
}

impl RunStats {
    /// Stats for a single-item run
    pub fn single(success: bool) -> Self {
        Self {
            successful: usize::from(success),
            total: 1,
        }
    }

    /// Final summary line, guarding the zero-total case
    pub fn summary(&self) -> String {
        if self.total == 0 {
            "No videos processed".to_string()
        } else {
            let rate = self.successful as f64 / self.total as f64 * 100.0;
            format!("Success rate: {}/{} ({:.1}%)", self.successful, self.total, rate)
        }
    }
}
