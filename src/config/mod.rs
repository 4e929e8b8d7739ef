//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for credentials,
//! engine selectors, audio framing and session timing, `AppPaths` for the
//! platform config directory, and TOML persistence via `AppConfig::load` /
//! `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, AudioConfig, Credentials, EngineConfig, RetryPolicy, SessionConfig,
};
