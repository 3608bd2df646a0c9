//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SpkError};

/// Full panel configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub controller: ControllerConfig,
    pub panel: PanelConfig,
    pub paths: PathsConfig,
}

/// Where the controller lives and which endpoints feed the status display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ControllerConfig {
    /// Base URL, e.g. `http://192.168.7.65`. Paths are appended verbatim.
    pub host: String,
    /// Pull endpoint for the status record.
    pub status_path: String,
    /// Server-sent events endpoint.
    pub events_path: String,
    /// Upper bound for a single request.
    pub request_timeout_secs: u64,
    /// `curl` executable used by the transport.
    pub curl_binary: String,
}

/// Event-loop cadence and notice behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PanelConfig {
    /// Input poll / redraw interval.
    pub tick_ms: u64,
    /// Pull `/status` once at startup instead of waiting for the first push.
    pub pull_on_start: bool,
    /// Maximum number of queued blocking notices.
    pub notice_limit: usize,
}

/// Filesystem paths used by the panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub activity_log: PathBuf,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            host: "http://sprinklers.local".to_string(),
            status_path: "/status".to_string(),
            events_path: "/sse".to_string(),
            request_timeout_secs: 10,
            curl_binary: "curl".to_string(),
        }
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            tick_ms: 250,
            pull_on_start: true,
            notice_limit: 4,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[SPK-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            config_file: home_dir.join(".config").join("spkl").join("config.toml"),
            activity_log: home_dir
                .join(".local")
                .join("share")
                .join("spkl")
                .join("activity.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| SpkError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(SpkError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for the activity log.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Replace the controller host (e.g. from `--host`) and re-validate.
    pub fn override_host(&mut self, host: &str) -> Result<()> {
        self.controller.host = host.to_string();
        self.normalize();
        self.validate()
    }

    /// Full URL for a controller path.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{path}", self.controller.host)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("SPK_CONTROLLER_HOST") {
            self.controller.host = raw;
        }
        if let Some(raw) = lookup("SPK_CONTROLLER_STATUS_PATH") {
            self.controller.status_path = raw;
        }
        if let Some(raw) = lookup("SPK_CONTROLLER_EVENTS_PATH") {
            self.controller.events_path = raw;
        }
        if let Some(raw) = lookup("SPK_CONTROLLER_REQUEST_TIMEOUT_SECS") {
            self.controller.request_timeout_secs =
                parse_env_u64("SPK_CONTROLLER_REQUEST_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("SPK_PANEL_TICK_MS") {
            self.panel.tick_ms = parse_env_u64("SPK_PANEL_TICK_MS", &raw)?;
        }
        if let Some(raw) = lookup("SPK_PANEL_PULL_ON_START") {
            self.panel.pull_on_start = parse_env_bool("SPK_PANEL_PULL_ON_START", &raw)?;
        }
        if let Some(raw) = lookup("SPK_ACTIVITY_LOG") {
            self.paths.activity_log = PathBuf::from(raw);
        }
        Ok(())
    }

    fn normalize(&mut self) {
        let host = self.controller.host.trim();
        self.controller.host = host.strip_suffix('/').unwrap_or(host).to_string();
    }

    fn validate(&self) -> Result<()> {
        let host = &self.controller.host;
        if !(host.starts_with("http://") || host.starts_with("https://")) {
            return Err(SpkError::InvalidConfig {
                details: format!("controller.host must start with http:// or https://, got {host:?}"),
            });
        }

        for (name, value) in [
            ("status_path", &self.controller.status_path),
            ("events_path", &self.controller.events_path),
        ] {
            if !value.starts_with('/') {
                return Err(SpkError::InvalidConfig {
                    details: format!("controller.{name} must start with '/', got {value:?}"),
                });
            }
        }

        if self.controller.request_timeout_secs == 0 {
            return Err(SpkError::InvalidConfig {
                details: "controller.request_timeout_secs must be > 0".to_string(),
            });
        }
        if self.controller.curl_binary.trim().is_empty() {
            return Err(SpkError::InvalidConfig {
                details: "controller.curl_binary must not be empty".to_string(),
            });
        }
        if self.panel.tick_ms == 0 {
            return Err(SpkError::InvalidConfig {
                details: "panel.tick_ms must be > 0".to_string(),
            });
        }
        if self.panel.notice_limit == 0 {
            return Err(SpkError::InvalidConfig {
                details: "panel.notice_limit must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.parse::<u64>().map_err(|error| SpkError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.parse::<bool>().map_err(|error| SpkError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
