//! Error taxonomy for BitLocker volume metadata parsing

#[derive(Debug, thiserror::Error)]
pub enum BitlockerError {
    #[error("not a BitLocker volume")]
    NotBitlocker,
    #[error("malformed FVE metadata: {0}")]
    Malformed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
