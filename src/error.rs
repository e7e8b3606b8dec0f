use thiserror::Error;

/// Reasons a server message is skipped. None of them are fatal to the viewer.
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(#[from] rmp_serde::decode::Error),
    #[error("Frame size mismatch: expected {expected} bytes, got {actual}")]
    FrameSizeMismatch { expected: usize, actual: usize },
    #[error("Unsupported pixel format code {0}")]
    UnsupportedPixelFormat(u8),
}
