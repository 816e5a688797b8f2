//! Error types for rendering, request decoding and configuration.
//!
//! Every render failure maps to exactly one [`RenderError`] variant so the
//! boundary layer can pick response semantics without inspecting messages.

use std::path::PathBuf;

use crate::asset::AssetKey;
use crate::deadline::Checkpoint;

/// Result alias used throughout the render pipeline.
pub type RenderResult<T> = Result<T, RenderError>;

// ============================================================================
// RenderError
// ============================================================================

/// Terminal failure of a single render call.
///
/// None of these are retried inside the crate.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The requested frame identifier is not in the registry.
    #[error("frame {frame} does not exist ({available} frames registered)")]
    UnknownFrame { frame: u32, available: usize },

    /// An expected image is absent from the asset store.
    #[error("asset `{key}` does not exist")]
    MissingAsset { key: AssetKey },

    /// Stored bytes could not be decoded as an image.
    #[error("asset `{key}` is not a valid image: {source}")]
    DecodeFailure {
        key: AssetKey,
        #[source]
        source: image::ImageError,
    },

    /// The cancellation signal tripped at a checkpoint.
    #[error("render cancelled at checkpoint `{stage}`")]
    Cancelled { stage: Checkpoint },

    /// An album or fan was requested with no cards. Single-card renders
    /// never return this.
    #[error("a card layout needs at least one card")]
    EmptyLayout,
}

impl RenderError {
    /// HTTP-style status code the boundary layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnknownFrame { .. } | Self::EmptyLayout => 400,
            Self::MissingAsset { .. } => 404,
            Self::DecodeFailure { .. } => 500,
            Self::Cancelled { .. } => 503,
        }
    }

    /// Returns true if the failure stems from the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownFrame { .. } | Self::MissingAsset { .. } | Self::EmptyLayout
        )
    }

    /// Message safe to hand back to a caller.
    ///
    /// Decode failures are data-integrity problems on the server, so their
    /// detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::DecodeFailure { .. } => {
                "failed to decode a stored image - check server logs".to_string()
            }
            Self::Cancelled { .. } => "request took too long to process".to_string(),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// RequestError
// ============================================================================

/// Failure to decode a request from its transport form.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("request hash is not valid base64: {0}")]
    InvalidHash(#[from] base64::DecodeError),

    #[error("request payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

// ============================================================================
// ConfigError
// ============================================================================

/// Failure to load configuration or build the frame registry.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame registry must contain at least one frame")]
    NoFrames,

    #[error("frame ids must be dense and ordered: expected id {expected}, found {found}")]
    FrameOutOfOrder { expected: u32, found: u32 },

    #[error("frame `{name}` has an empty canvas ({width}x{height})")]
    EmptyFrame {
        name: String,
        width: u32,
        height: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        let unknown = RenderError::UnknownFrame {
            frame: 99,
            available: 3,
        };
        let missing = RenderError::MissingAsset {
            key: AssetKey::character(7, false),
        };
        let cancelled = RenderError::Cancelled {
            stage: Checkpoint::BeforeMask,
        };

        assert_eq!(unknown.status_code(), 400);
        assert_eq!(missing.status_code(), 404);
        assert_eq!(cancelled.status_code(), 503);
        assert!(unknown.is_client_error());
        assert!(missing.is_client_error());
        assert!(!cancelled.is_client_error());
    }

    #[test]
    fn decode_failure_hides_detail() {
        let source = image::load_from_memory(b"definitely not a png").unwrap_err();
        let err = RenderError::DecodeFailure {
            key: AssetKey::mask("beta", true),
            source,
        };

        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("private/frame/beta/glow-mask.png"));
        assert!(!err.public_message().contains("beta"));
    }

    #[test]
    fn unknown_frame_message_names_frame() {
        let err = RenderError::UnknownFrame {
            frame: 99,
            available: 3,
        };
        assert!(err.public_message().contains("99"));
    }

    #[test]
    fn empty_layout_is_a_client_error() {
        let err = RenderError::EmptyLayout;
        assert_eq!(err.status_code(), 400);
        assert!(err.is_client_error());
        assert_eq!(err.public_message(), err.to_string());
    }
}
