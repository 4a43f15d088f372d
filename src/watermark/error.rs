//! Watermark error types.
//!
//! Only conditions that abort a request live here. Missing fonts and layout
//! overflow are absorbed by the pipeline and surface as warnings instead.

use std::fmt;
use std::path::PathBuf;

use crate::codec::CodecError;

/// Errors that abort a watermark request.
#[derive(Debug)]
pub enum WatermarkError {
    /// The source image path does not exist
    InputNotFound(PathBuf),

    /// Failed to read or write a file
    IoError(String),

    /// Failed to decode or encode a raster
    CodecError(CodecError),

    /// A decorative asset is absent and the asset policy is `fail`
    AssetMissing(PathBuf),

    /// Failed to rasterize the overlay
    RenderError(String),
}

impl fmt::Display for WatermarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputNotFound(path) => {
                write!(f, "Input image does not exist: {}", path.display())
            }
            Self::IoError(msg) => write!(f, "I/O error: {}", msg),
            Self::CodecError(err) => write!(f, "Image codec error: {}", err),
            Self::AssetMissing(path) => {
                write!(f, "Decorative asset is missing: {}", path.display())
            }
            Self::RenderError(msg) => write!(f, "Failed to render overlay: {}", msg),
        }
    }
}

impl std::error::Error for WatermarkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CodecError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CodecError> for WatermarkError {
    fn from(err: CodecError) -> Self {
        Self::CodecError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WatermarkError::InputNotFound(PathBuf::from("/tmp/missing.jpg"));
        assert_eq!(
            err.to_string(),
            "Input image does not exist: /tmp/missing.jpg"
        );

        let err = WatermarkError::AssetMissing(PathBuf::from("assets/separator.png"));
        assert_eq!(
            err.to_string(),
            "Decorative asset is missing: assets/separator.png"
        );

        let err = WatermarkError::RenderError("empty overlay".to_string());
        assert_eq!(err.to_string(), "Failed to render overlay: empty overlay");
    }

    #[test]
    fn test_codec_error_converts_and_chains() {
        let err: WatermarkError = CodecError::decode_failed("bad header").into();
        assert!(err.to_string().contains("bad header"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_debug() {
        let err = WatermarkError::IoError("permission denied".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("IoError"));
        assert!(debug_str.contains("permission denied"));
    }
}
