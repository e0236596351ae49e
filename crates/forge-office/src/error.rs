//! Error taxonomy for Ole/OOXML encryption handling

#[derive(Debug, thiserror::Error)]
pub enum OfficeError {
    #[error("document is not encrypted")]
    NotEncrypted,
    #[error("unsupported encryption: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
