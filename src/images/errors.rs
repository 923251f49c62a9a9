use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("image payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image payload is empty")]
    Empty,
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to process image: {0}")]
    Image(#[from] image::ImageError),
    #[error("normalization task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
