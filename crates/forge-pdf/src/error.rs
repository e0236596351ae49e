//! Error taxonomy for PDF encryption-dictionary parsing and verification

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("no /Encrypt reference found")]
    NotEncrypted,
    #[error("malformed PDF: {0}")]
    Malformed(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
