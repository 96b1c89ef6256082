/// Errors produced while decoding, storing or reading images.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("invalid image data: {0}")]
    InvalidDataUri(String),
    #[error("unsupported image type '{0}', expected png, jpeg, gif or webp")]
    UnsupportedFormat(String),
    #[error("image exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },
    #[error("invalid image name: {0}")]
    InvalidName(String),
    #[error("image not found: {0}")]
    NotFound(String),
    #[error("media IO error: {0}")]
    Io(#[from] std::io::Error),
}
