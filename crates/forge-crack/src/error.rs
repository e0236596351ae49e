#[derive(Debug, thiserror::Error)]
pub enum CrackError {
    #[error("no per-candidate verifier exists for this format")]
    UnsupportedFormat,
    #[error("wordlist path {0:?} is not plain text")]
    NotPlainText(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
