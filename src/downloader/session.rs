// Download session - drives the engine over single items, playlists and URL lists
//
// Per-item failures are values aggregated into RunStats; they never abort
// sibling items. Only the process-level interrupt in main stops a run early.

use std::io;
use std::path::{Path, PathBuf};

use super::engine::VideoEngine;
use super::errors::DownloadError;
use super::models::{RunStats, VideoInfo};

pub struct DownloadSession<E> {
    engine: E,
    output_dir: PathBuf,
}

impl<E: VideoEngine> DownloadSession<E> {
    /// Creates the output directory if absent; a pre-existing directory is reused.
    pub fn new(engine: E, output_dir: PathBuf) -> io::Result<Self> {
        std::fs::create_dir_all(&output_dir)?;
        eprintln!("[Session] Engine: {}", engine.name());
        Ok(Self { engine, output_dir })
    }

    /// Download a single item, reporting title and duration along the way.
    ///
    /// Errors are printed here so callers only have to count them.
    pub async fn download_video(&self, url: &str) -> Result<VideoInfo, DownloadError> {
        match self.try_download(url).await {
            Ok(info) => {
                println!("Download completed: {}", info.title);
                Ok(info)
            }
            Err(e) => {
                println!("Error downloading {}: {}", url, e);
                Err(e)
            }
        }
    }

    async fn try_download(&self, url: &str) -> Result<VideoInfo, DownloadError> {
        println!("Downloading: {}", url);

        let info = self.engine.probe_video(url).await?;
        println!("Title: {}", info.title);
        println!("Duration: {}", info.duration_display());
        println!("Saving to: {}", self.output_dir.display());

        self.engine.fetch(url).await?;
        Ok(info)
    }

    /// Download every member of a playlist, in probe order.
    ///
    /// A failed top-level probe reports the whole playlist as zero successes.
    pub async fn download_playlist(&self, url: &str) -> RunStats {
        println!("Processing playlist: {}", url);

        let playlist = match self.engine.probe_playlist(url).await {
            Ok(playlist) => playlist,
            Err(e) => {
                println!("Error processing playlist {}: {}", url, e);
                return RunStats::default();
            }
        };

        println!("Playlist: {}", playlist.title);
        println!("Found {} videos", playlist.entries.len());

        let total = playlist.entries.len();
        if total == 0 {
            return RunStats::default();
        }

        let mut successful = 0;
        for (i, entry) in playlist.entries.iter().enumerate() {
            // Null slots are removed/hidden members; they count but cannot be fetched
            let Some(entry) = entry else { continue };
            let Some(video_url) = entry.item_url() else {
                continue;
            };

            println!("\n[{}/{}] Processing video...", i + 1, total);
            if self.download_video(&video_url).await.is_ok() {
                successful += 1;
            }
        }

        println!("\nPlaylist download completed!");
        println!("Successfully downloaded: {}/{} videos", successful, total);

        RunStats { successful, total }
    }

    /// Download every URL listed in a text file, in file order.
    ///
    /// A missing or unreadable file is reported and yields zero attempts.
    pub async fn download_from_file(&self, path: &Path) -> RunStats {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                println!("File not found: {}", path.display());
                return RunStats::default();
            }
            Err(e) => {
                println!("Error reading file {}: {}", path.display(), e);
                return RunStats::default();
            }
        };

        let urls = parse_url_list(&text);
        println!("Found {} URLs in {}", urls.len(), path.display());

        let mut successful = 0;
        for (i, url) in urls.iter().enumerate() {
            println!("\n[{}/{}] Processing URL: {}", i + 1, urls.len(), url);
            if self.download_video(url).await.is_ok() {
                successful += 1;
            }
        }

        println!("\nBatch download completed!");
        println!("Successfully downloaded: {}/{} videos", successful, urls.len());

        RunStats {
            successful,
            total: urls.len(),
        }
    }
}

/// Keep lines that are non-empty after trimming and are not `#` comments.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::{PlaylistEntry, PlaylistInfo};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Deterministic engine: succeeds everywhere except a configured URL set.
    struct StubEngine {
        failing: HashSet<String>,
        playlist: Option<PlaylistInfo>,
        fetched: Mutex<Vec<String>>,
    }

    impl StubEngine {
        fn new() -> Self {
            Self {
                failing: HashSet::new(),
                playlist: None,
                fetched: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(mut self, urls: &[&str]) -> Self {
            self.failing = urls.iter().map(|u| u.to_string()).collect();
            self
        }

        fn with_playlist(mut self, playlist: PlaylistInfo) -> Self {
            self.playlist = Some(playlist);
            self
        }

        fn fetched(&self) -> Vec<String> {
            self.fetched.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VideoEngine for &StubEngine {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn probe_video(&self, url: &str) -> Result<VideoInfo, DownloadError> {
            if self.failing.contains(url) {
                return Err(DownloadError::Unknown("stub probe failure".to_string()));
            }
            Ok(VideoInfo {
                id: "stub".to_string(),
                title: format!("title of {}", url),
                uploader: "stub".to_string(),
                duration: Some(60),
            })
        }

        async fn probe_playlist(&self, url: &str) -> Result<PlaylistInfo, DownloadError> {
            self.playlist
                .clone()
                .ok_or_else(|| DownloadError::InvalidUrl(url.to_string()))
        }

        async fn fetch(&self, url: &str) -> Result<(), DownloadError> {
            if self.failing.contains(url) {
                return Err(DownloadError::Unknown("stub fetch failure".to_string()));
            }
            self.fetched.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    fn scratch_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ytgrab_test_{}_{}", tag, std::process::id()))
    }

    fn session<'a>(engine: &'a StubEngine, tag: &str) -> DownloadSession<&'a StubEngine> {
        DownloadSession::new(engine, scratch_dir(tag)).unwrap()
    }

    fn entry(id: &str, url: Option<&str>) -> Option<PlaylistEntry> {
        Some(PlaylistEntry {
            id: id.to_string(),
            url: url.map(str::to_string),
            title: None,
        })
    }

    #[test]
    fn test_parse_url_list_skips_comments_and_blanks() {
        let text = "# header comment\n\
                    https://youtube.com/watch?v=a\n\
                    \n\
                    \t  \n\
                    # another comment\n\
                    \t https://youtube.com/watch?v=b  \n\
                    https://youtube.com/watch?v=c";
        let urls = parse_url_list(text);
        assert_eq!(
            urls,
            vec![
                "https://youtube.com/watch?v=a",
                "https://youtube.com/watch?v=b",
                "https://youtube.com/watch?v=c",
            ]
        );
    }

    #[tokio::test]
    async fn test_batch_attempts_each_retained_line() {
        let engine = StubEngine::new().failing_on(&["https://youtube.com/watch?v=bad"]);
        let session = session(&engine, "batch");

        let file = scratch_dir("batch").join("urls.txt");
        std::fs::write(
            &file,
            "# list\nhttps://youtube.com/watch?v=a\n\nhttps://youtube.com/watch?v=bad\nhttps://youtube.com/watch?v=b\n",
        )
        .unwrap();

        let stats = session.download_from_file(&file).await;
        assert_eq!(
            stats,
            RunStats {
                successful: 2,
                total: 3
            }
        );
        assert_eq!(
            engine.fetched(),
            vec!["https://youtube.com/watch?v=a", "https://youtube.com/watch?v=b"]
        );
    }

    #[tokio::test]
    async fn test_missing_batch_file_yields_zero() {
        let engine = StubEngine::new();
        let session = session(&engine, "missing_file");

        let stats = session
            .download_from_file(Path::new("/no/such/ytgrab-urls.txt"))
            .await;
        assert_eq!(stats, RunStats::default());
        assert!(engine.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_empty_playlist_yields_zero_without_downloads() {
        let engine = StubEngine::new().with_playlist(PlaylistInfo {
            title: "Empty".to_string(),
            entries: Vec::new(),
        });
        let session = session(&engine, "empty_playlist");

        let stats = session
            .download_playlist("https://youtube.com/playlist?list=PL1")
            .await;
        assert_eq!(stats, RunStats::default());
        assert!(engine.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_playlist_counts_and_url_fallback() {
        let engine = StubEngine::new()
            .failing_on(&["https://youtube.com/watch?v=bad"])
            .with_playlist(PlaylistInfo {
                title: "Mixed".to_string(),
                entries: vec![
                    entry("a1", Some("https://youtube.com/watch?v=a1")),
                    entry("b2", None),
                    None,
                    entry("bad", Some("https://youtube.com/watch?v=bad")),
                ],
            });
        let session = session(&engine, "playlist");

        let stats = session
            .download_playlist("https://youtube.com/playlist?list=PL1")
            .await;
        // Null slot counts towards the total but is never attempted
        assert_eq!(
            stats,
            RunStats {
                successful: 2,
                total: 4
            }
        );
        assert_eq!(
            engine.fetched(),
            vec![
                "https://youtube.com/watch?v=a1",
                "https://youtube.com/watch?v=b2"
            ]
        );
    }

    #[tokio::test]
    async fn test_playlist_probe_failure_is_contained() {
        let engine = StubEngine::new();
        let session = session(&engine, "probe_failure");

        let stats = session
            .download_playlist("https://youtube.com/playlist?list=PLbroken")
            .await;
        assert_eq!(stats, RunStats::default());
        assert!(engine.fetched().is_empty());
    }

    #[test]
    fn test_output_dir_created_and_reused() {
        let engine = StubEngine::new();
        let dir = scratch_dir("output_dir");

        let first = DownloadSession::new(&engine, dir.clone());
        assert!(first.is_ok());
        assert!(dir.is_dir());

        // Pre-existing directory is not an error
        let second = DownloadSession::new(&engine, dir);
        assert!(second.is_ok());
    }
}
