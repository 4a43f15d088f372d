//! Codec error types

use std::fmt;

/// Errors raised while decoding, scaling, or encoding rasters
#[derive(Debug, Clone)]
pub enum CodecError {
    /// Output extension does not map to a supported encoder
    UnsupportedFormat { format: String },
    /// Failed to decode image data
    DecodeFailed { message: String },
    /// Encoding to output format failed
    EncodeFailed { format: String, message: String },
    /// Scaling a decorative asset failed
    ResizeFailed { message: String },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::UnsupportedFormat { format } => {
                write!(f, "Unsupported output format: {}", format)
            }
            CodecError::DecodeFailed { message } => {
                write!(f, "Failed to decode image: {}", message)
            }
            CodecError::EncodeFailed { format, message } => {
                write!(f, "Failed to encode to {}: {}", format, message)
            }
            CodecError::ResizeFailed { message } => {
                write!(f, "Resize failed: {}", message)
            }
        }
    }
}

impl std::error::Error for CodecError {}

impl CodecError {
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        CodecError::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        CodecError::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        CodecError::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn resize_failed(message: impl Into<String>) -> Self {
        CodecError::ResizeFailed {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_display() {
        let err = CodecError::unsupported_format("tga");
        assert_eq!(err.to_string(), "Unsupported output format: tga");
    }

    #[test]
    fn test_decode_failed_display() {
        let err = CodecError::decode_failed("invalid header");
        assert_eq!(err.to_string(), "Failed to decode image: invalid header");
    }

    #[test]
    fn test_encode_failed_display() {
        let err = CodecError::encode_failed("webp", "encoder error");
        assert_eq!(err.to_string(), "Failed to encode to webp: encoder error");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CodecError>();
    }
}
