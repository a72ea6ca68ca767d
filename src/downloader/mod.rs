// Downloader module - orchestration layer over the external yt-dlp engine

pub mod engine;
pub mod errors;
pub mod models;
pub mod session;
pub mod utils;

pub use engine::{VideoEngine, YtDlpEngine};
pub use errors::DownloadError;
pub use models::{DownloadConfig, RunStats};
pub use session::DownloadSession;
