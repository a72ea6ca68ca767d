// Error types for the yt-dlp engine layer

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadError {
    /// Network timeout while talking to the hosting service
    NetworkTimeout,

    /// The service rejected the request (429, bot detection, etc.)
    Blocked,

    /// yt-dlp not found in the system
    ToolNotFound(String),

    /// Invalid or unsupported URL
    InvalidUrl(String),

    /// Failed to parse yt-dlp JSON output
    ParseError(String),

    /// Subprocess execution failed
    ExecutionError(String),

    /// Unknown error with details
    Unknown(String),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkTimeout => write!(f, "Network timeout: the remote service is not responding"),
            Self::Blocked => write!(
                f,
                "The service is temporarily throttling or blocking requests from your IP address \
                 (wait and retry later, or pass --proxy)"
            ),
            Self::ToolNotFound(tool) => write!(f, "Tool not found: {}", tool),
            Self::InvalidUrl(url) => write!(f, "Invalid URL: {}", url),
            Self::ParseError(msg) => write!(f, "Parse error: {}", msg),
            Self::ExecutionError(msg) => write!(f, "Execution error: {}", msg),
            Self::Unknown(msg) => write!(f, "Unknown error: {}", msg),
        }
    }
}

impl std::error::Error for DownloadError {}

// Classify raw yt-dlp stderr into an error variant
impl From<String> for DownloadError {
    fn from(s: String) -> Self {
        // Soft IP block: the extractor times out only against the service itself
        if (s.contains("timeout") || s.contains("timed out") || s.contains("Timed out"))
            && s.contains("youtube.com")
        {
            return Self::Blocked;
        }

        // Generic network timeout
        if s.contains("timeout") || s.contains("timed out") || s.contains("Timed out") {
            return Self::NetworkTimeout;
        }

        // Explicit blocks
        if s.contains("429") || s.contains("bot") || s.contains("blocked") {
            return Self::Blocked;
        }

        // Tool not found
        if s.contains("No such file") || s.contains("command not found") || s.contains("not found") {
            return Self::ToolNotFound(s);
        }

        // Parse errors
        if s.contains("parse") || s.contains("JSON") {
            return Self::ParseError(s);
        }

        // Invalid URLs
        if s.contains("Invalid URL") || s.contains("Unsupported URL") {
            return Self::InvalidUrl(s);
        }

        Self::Unknown(s)
    }
}
