//! Error taxonomy for LUKS volume header parsing

#[derive(Debug, thiserror::Error)]
pub enum LuksError {
    #[error("not a LUKS volume")]
    NotLuks,
    #[error("unsupported LUKS version {0}")]
    UnsupportedVersion(u16),
    #[error("malformed LUKS header: {0}")]
    Malformed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
