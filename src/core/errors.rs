//! SPK-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SpkError>;

/// Top-level error type for the sprinkler panel.
#[derive(Debug, Error)]
pub enum SpkError {
    #[error("[SPK-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[SPK-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[SPK-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[SPK-2001] unknown view: {view}")]
    UnknownView { view: String },

    #[error("[SPK-2101] transport failure (status {}): {text}", display_code(.code))]
    Transport { code: Option<u16>, text: String },

    #[error("[SPK-2102] action rejected by controller: {msg}")]
    ActionRejected { msg: String },

    #[error("[SPK-2103] event stream terminated: {details}")]
    StreamTerminated { details: String },

    #[error("[SPK-2104] malformed status payload: {details}")]
    MalformedStatus { details: String },

    #[error("[SPK-2201] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[SPK-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SPK-3002] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[SPK-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl SpkError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "SPK-1001",
            Self::MissingConfig { .. } => "SPK-1002",
            Self::ConfigParse { .. } => "SPK-1003",
            Self::UnknownView { .. } => "SPK-2001",
            Self::Transport { .. } => "SPK-2101",
            Self::ActionRejected { .. } => "SPK-2102",
            Self::StreamTerminated { .. } => "SPK-2103",
            Self::MalformedStatus { .. } => "SPK-2104",
            Self::Serialization { .. } => "SPK-2201",
            Self::Io { .. } => "SPK-3001",
            Self::ChannelClosed { .. } => "SPK-3002",
            Self::Runtime { .. } => "SPK-3900",
        }
    }

    /// Whether the error ends the session's live updates.
    ///
    /// Only a terminated event stream qualifies; the panel keeps running but
    /// stops receiving pushes.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::StreamTerminated { .. })
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

#[allow(clippy::ref_option)]
fn display_code(code: &Option<u16>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

impl From<serde_json::Error> for SpkError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SpkError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<SpkError> {
        vec![
            SpkError::InvalidConfig {
                details: String::new(),
            },
            SpkError::MissingConfig {
                path: PathBuf::new(),
            },
            SpkError::ConfigParse {
                context: "",
                details: String::new(),
            },
            SpkError::UnknownView {
                view: String::new(),
            },
            SpkError::Transport {
                code: None,
                text: String::new(),
            },
            SpkError::ActionRejected { msg: String::new() },
            SpkError::StreamTerminated {
                details: String::new(),
            },
            SpkError::MalformedStatus {
                details: String::new(),
            },
            SpkError::Serialization {
                context: "",
                details: String::new(),
            },
            SpkError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            SpkError::ChannelClosed { component: "" },
            SpkError::Runtime {
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = all_variants();
        let codes: Vec<&str> = errors.iter().map(SpkError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn display_carries_code_prefix() {
        for err in all_variants() {
            let msg = err.to_string();
            assert!(
                msg.starts_with(&format!("[{}]", err.code())),
                "display should start with its code: {msg}"
            );
        }
    }

    #[test]
    fn transport_display_includes_status_and_text() {
        let err = SpkError::Transport {
            code: Some(404),
            text: "Not Found".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("404"), "{msg}");
        assert!(msg.contains("Not Found"), "{msg}");

        let err = SpkError::Transport {
            code: None,
            text: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("status none"));
    }

    #[test]
    fn only_stream_termination_is_fatal() {
        for err in all_variants() {
            assert_eq!(
                err.is_fatal(),
                matches!(err, SpkError::StreamTerminated { .. }),
                "{}",
                err.code()
            );
        }
    }

    #[test]
    fn io_convenience_constructor() {
        let err = SpkError::io(
            "/tmp/panel.jsonl",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "SPK-3001");
        assert!(err.to_string().contains("/tmp/panel.jsonl"));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: SpkError = json_err.into();
        assert_eq!(err.code(), "SPK-2201");
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: SpkError = toml_err.into();
        assert_eq!(err.code(), "SPK-1003");
    }
}
