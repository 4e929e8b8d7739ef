//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

/// Placeholder values shipped in example config files.  A credential equal
/// to one of these is treated as "not configured".
const PLACEHOLDERS: [&str; 3] = [
    "your_app_id_here",
    "your_api_key_here",
    "your_api_secret_here",
];

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Long-lived vendor credentials plus the endpoint they sign for.
///
/// Supplied externally (settings file or environment); never derived at
/// runtime.  `scheme` is `wss` in production; `ws` is only useful against a
/// local test server.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Credentials {
    pub app_id: String,
    pub api_key: String,
    pub api_secret: String,
    pub host: String,
    pub path: String,
    pub scheme: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            host: "ise-api.xfyun.cn".into(),
            path: "/v2/open-ise".into(),
            scheme: "wss".into(),
        }
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("host", &self.host)
            .field("path", &self.path)
            .field("scheme", &self.scheme)
            .finish()
    }
}

impl Credentials {
    /// `true` when every secret is present and none is a placeholder.
    pub fn is_configured(&self) -> bool {
        [&self.app_id, &self.api_key, &self.api_secret]
            .iter()
            .all(|v| !v.trim().is_empty() && !PLACEHOLDERS.contains(&v.as_str()))
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Engine selectors sent in the configuration frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine/language selector (`cn_vip` = Mandarin).
    pub ent: String,
    /// Evaluation category; `read_sentence` is the only one exercised.
    pub category: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ent: "cn_vip".into(),
            category: "read_sentence".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Framing and pre-flight settings for 16 kHz / 16-bit / mono PCM input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Bytes per audio frame.  2560 bytes = 80 ms at 16 kHz/16-bit mono.
    pub chunk_bytes: usize,
    /// Delay inserted between non-final frame sends, in milliseconds.
    pub pacing_ms: u64,
    /// Minimum clip length accepted by the quality check.
    pub min_recording_secs: f32,
    /// Maximum clip length accepted by the quality check.
    pub max_recording_secs: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            chunk_bytes: 2560,
            pacing_ms: 30,
            min_recording_secs: 0.5,
            max_recording_secs: 30.0,
        }
    }
}

impl AudioConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// How the orchestrator treats errors that a retry cannot fix.
///
/// | Variant  | Auth / Rejected / InvalidInput |
/// |----------|--------------------------------|
/// | Faithful | retried like any other error   |
/// | Hardened | surfaced after the first try   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryPolicy {
    Faithful,
    Hardened,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::Faithful
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Protocol timing and retry bounds for one evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Upper bound on the WebSocket handshake.
    pub connect_timeout_secs: u64,
    /// Interval between keep-alive pings while a connection is open.
    pub heartbeat_secs: u64,
    /// Wait after the configuration frame before the first audio frame.
    /// The server sends no explicit acknowledgement.
    pub settle_ms: u64,
    /// Upper bound on the wait for a final envelope after the last frame.
    pub result_timeout_secs: u64,
    /// Total attempts per evaluation, including the first.
    pub max_attempts: u32,
    /// Linear backoff unit: attempt `n` waits `n × backoff_ms` before `n+1`.
    pub backoff_ms: u64,
    pub retry_policy: RetryPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            heartbeat_secs: 30,
            settle_ms: 200,
            result_timeout_secs: 90,
            max_attempts: 3,
            backoff_ms: 1000,
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl SessionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn result_timeout(&self) -> Duration {
        Duration::from_secs(self.result_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use twister_eval::config::AppConfig;
///
/// // Load (returns Default when the file is missing), then apply
/// // XFYUN_* environment overrides.
/// let config = AppConfig::load().unwrap();
/// assert!(config.session.max_attempts >= 1);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub engine: EngineConfig,
    pub audio: AudioConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml` and
    /// apply `XFYUN_APPID` / `XFYUN_API_KEY` / `XFYUN_API_SECRET` overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&AppPaths::new().settings_file)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from an explicit path without environment overrides.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to the platform-appropriate `settings.toml`.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Overwrite credentials from `lookup` (normally the process environment).
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let creds = &mut self.credentials;
        for (key, slot) in [
            ("XFYUN_APPID", &mut creds.app_id),
            ("XFYUN_API_KEY", &mut creds.api_key),
            ("XFYUN_API_SECRET", &mut creds.api_secret),
        ] {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                log::debug!("config: {key} taken from environment");
                *slot = value;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let mut original = AppConfig::default();
        original.credentials.app_id = "app123".into();
        original.session.retry_policy = RetryPolicy::Hardened;
        original.audio.chunk_bytes = 1280;
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.credentials, original.credentials);
        assert_eq!(loaded.engine.ent, original.engine.ent);
        assert_eq!(loaded.engine.category, original.engine.category);
        assert_eq!(loaded.audio.chunk_bytes, 1280);
        assert_eq!(loaded.audio.pacing_ms, original.audio.pacing_ms);
        assert_eq!(loaded.session.retry_policy, RetryPolicy::Hardened);
        assert_eq!(loaded.session.max_attempts, original.session.max_attempts);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.credentials, Credentials::default());
        assert_eq!(config.audio.chunk_bytes, 2560);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "credentials = 42").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn default_values() {
        let c = AppConfig::default();
        assert_eq!(c.credentials.host, "ise-api.xfyun.cn");
        assert_eq!(c.credentials.path, "/v2/open-ise");
        assert_eq!(c.credentials.scheme, "wss");
        assert_eq!(c.engine.ent, "cn_vip");
        assert_eq!(c.engine.category, "read_sentence");
        assert_eq!(c.audio.pacing(), Duration::from_millis(30));
        assert_eq!(c.session.connect_timeout(), Duration::from_secs(15));
        assert_eq!(c.session.heartbeat_interval(), Duration::from_secs(30));
        assert_eq!(c.session.settle_delay(), Duration::from_millis(200));
        assert_eq!(c.session.result_timeout(), Duration::from_secs(90));
        assert_eq!(c.session.max_attempts, 3);
        assert_eq!(c.session.backoff_ms, 1000);
        assert_eq!(c.session.retry_policy, RetryPolicy::Faithful);
    }

    #[test]
    fn overrides_replace_credentials() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| match key {
            "XFYUN_APPID" => Some("env-app".into()),
            "XFYUN_API_KEY" => Some("env-key".into()),
            "XFYUN_API_SECRET" => Some("   ".into()),
            _ => None,
        });
        assert_eq!(config.credentials.app_id, "env-app");
        assert_eq!(config.credentials.api_key, "env-key");
        // blank override is ignored
        assert_eq!(config.credentials.api_secret, "");
    }

    #[test]
    fn placeholders_are_not_configured() {
        let mut creds = Credentials {
            app_id: "your_app_id_here".into(),
            api_key: "k".into(),
            api_secret: "s".into(),
            ..Credentials::default()
        };
        assert!(!creds.is_configured());

        creds.app_id = "real".into();
        assert!(creds.is_configured());

        creds.api_secret = String::new();
        assert!(!creds.is_configured());
    }

    #[test]
    fn debug_output_redacts_secret() {
        let creds = Credentials {
            api_secret: "topsecret".into(),
            ..Credentials::default()
        };
        let printed = format!("{creds:?}");
        assert!(!printed.contains("topsecret"));
        assert!(printed.contains("<redacted>"));
    }
}
