use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Reads an environment variable and parses it, falling back to `default` when the
/// variable is unset, empty or unparsable.
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Reads an optional, non-empty environment variable.
fn env_non_empty(name: &str) -> Option<String> {
    env::var(name).ok().and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: retouch.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "retouch.log".to_string()));

/// Log level for both terminal and file output
/// Read from LOG_LEVEL environment variable (error, warn, info, debug, trace)
/// Default: info
pub static LOG_LEVEL: Lazy<String> = Lazy::new(|| env_parse("LOG_LEVEL", "info".to_string()));

/// Temporary files directory for per-item input/output images
/// Read from TEMP_FILES_DIR environment variable
/// Default: <system temp>/retouch
pub static TEMP_FILES_DIR: Lazy<PathBuf> = Lazy::new(|| {
    env_non_empty("TEMP_FILES_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("retouch"))
});

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Custom Bot API server URL (local telegram-bot-api)
/// Read from BOT_API_URL environment variable
pub static BOT_API_URL: Lazy<Option<String>> = Lazy::new(|| env_non_empty("BOT_API_URL"));

/// Webhook URL for Telegram updates
/// Read from WEBHOOK_URL environment variable
pub static WEBHOOK_URL: Lazy<Option<String>> = Lazy::new(|| env_non_empty("WEBHOOK_URL"));

/// Port the webhook listener binds to
/// Read from WEBHOOK_PORT (or PORT, as set by most PaaS hosts)
/// Default: 10000
pub static WEBHOOK_PORT: Lazy<u16> =
    Lazy::new(|| env_parse("WEBHOOK_PORT", env_parse("PORT", 10000)));

/// Queue and worker pool configuration
pub mod queue {
    use super::{env_parse, Duration, Lazy};

    /// Maximum number of tasks allowed in the queue to prevent unbounded memory growth.
    /// Read from QUEUE_CAPACITY environment variable
    /// Default: 1000
    pub static CAPACITY: Lazy<usize> = Lazy::new(|| env_parse("QUEUE_CAPACITY", 1000));

    /// Number of concurrent workers
    /// Read from WORKER_COUNT environment variable
    /// Default: 2
    pub static WORKER_COUNT: Lazy<usize> = Lazy::new(|| env_parse("WORKER_COUNT", 2));

    /// Per-item processing timeout (in seconds)
    /// Read from PROCESSING_TIMEOUT_SECS environment variable
    /// Default: 120
    pub static PROCESSING_TIMEOUT_SECS: Lazy<u64> = Lazy::new(|| env_parse("PROCESSING_TIMEOUT_SECS", 120));

    /// Processing timeout duration
    pub fn processing_timeout() -> Duration {
        Duration::from_secs(*PROCESSING_TIMEOUT_SECS)
    }
}

/// Processing backend configuration
pub mod processing {
    use super::{env_parse, Lazy};

    /// Which processor family serves the modes: "local", "remote" or "passthrough"
    /// Read from PROCESSOR_BACKEND environment variable
    /// Default: local
    pub static BACKEND: Lazy<String> =
        Lazy::new(|| env_parse("PROCESSOR_BACKEND", "local".to_string()).to_lowercase());

    /// Base URL of the remote processing API; the mode name is appended as a path segment
    /// Read from API_ENDPOINT environment variable
    /// Default: http://localhost:8000/process
    pub static API_ENDPOINT: Lazy<String> =
        Lazy::new(|| env_parse("API_ENDPOINT", "http://localhost:8000/process".to_string()));

    /// Upscale factor for the "upscale" mode
    /// Read from UPSCALE_FACTOR environment variable
    /// Default: 4
    pub static UPSCALE_FACTOR: Lazy<u32> = Lazy::new(|| env_parse("UPSCALE_FACTOR", 4u32).clamp(1, 8));

    /// Mode used for chats that never picked one
    /// Read from DEFAULT_MODE environment variable
    /// Default: upscale
    pub static DEFAULT_MODE: Lazy<String> = Lazy::new(|| env_parse("DEFAULT_MODE", "upscale".to_string()));

    /// Largest side (in pixels) a processed image may have
    pub const MAX_OUTPUT_SIDE: u32 = 8192;
}

/// HTTP API configuration
pub mod api {
    use super::{env_parse, Duration, Lazy};

    /// Port for the HTTP API server
    /// Read from API_PORT environment variable
    /// Default: 8000
    pub static PORT: Lazy<u16> = Lazy::new(|| env_parse("API_PORT", 8000));

    /// Maximum accepted upload size (20 MB, the Bot API download limit)
    pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

    /// Request timeout for outgoing HTTP requests (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 300;

    /// Request timeout duration
    pub fn request_timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}
