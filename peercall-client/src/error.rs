use peercall_core::{SessionId, SignalingError};
use std::path::PathBuf;
use thiserror::Error;

/// Failures of a single negotiator operation. None of them tear down the
/// relay channel; the caller reports them and the user re-initiates.
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error(transparent)]
    Signaling(#[from] SignalingError),

    #[error("`{message}` requires an active call session")]
    NoActiveSession { message: &'static str },

    #[error("received an answer for session {0}, which answered a remote offer")]
    UnexpectedAnswer(SessionId),

    #[error("answer already applied to session {0}")]
    AnswerAlreadyApplied(SessionId),

    #[error("role is sender but no media has been captured")]
    NoCapturedMedia,

    #[error("no video track settings are known for session {0}")]
    NoVideoSettings(SessionId),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("transport failed to {op}: {cause:#}")]
    Transport {
        op: &'static str,
        cause: anyhow::Error,
    },
}

impl NegotiationError {
    pub(crate) fn transport(op: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |cause| NegotiationError::Transport { op, cause }
    }
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("access to capture devices was denied")]
    PermissionDenied,

    #[error("capture device `{0}` not found")]
    DeviceNotFound(String),

    #[error("no capture devices available")]
    NoDevices,

    #[error("failed to read media from {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unsupported media in {path}: {reason}")]
    Unsupported { path: PathBuf, reason: String },
}

impl MediaError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => MediaError::PermissionDenied,
            std::io::ErrorKind::NotFound => {
                MediaError::DeviceNotFound(path.display().to_string())
            }
            _ => MediaError::Io { path, source },
        }
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to connect to relay {url}: {source}")]
    Connect {
        url: String,
        source: tokio_tungstenite::tungstenite::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
