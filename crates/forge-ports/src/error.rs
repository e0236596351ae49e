//! Error taxonomy shared across the core
//!
//! Every format crate defines its own `thiserror`-derived error type.
//! `ForgeError` wraps them and exposes the five error kinds the
//! orchestrator's propagation policy dispatches on, so it never needs to
//! match on a concrete format error to decide skip/retry/abort.
use std::fmt;

/// The five propagation-policy kinds a format error can fall into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Signature missing, truncated structure, inconsistent length fields.
    /// The object is skipped; other objects in the same source continue.
    Malformed,
    /// Zip64, split archives, non-Standard PDF filter, unknown PDF
    /// revision, strong ZIP encryption. Metadata extraction may still
    /// succeed with the verifier disabled.
    Unsupported,
    /// A library-level cipher/hash failure during verification. The
    /// worker halts; the orchestrator continues with remaining workers.
    Crypto,
    /// Reading the container or a bundled wordlist failed.
    Io,
    /// Not an error: the job was cancelled.
    Cancelled,
}

/// A format-tagged error, classified by [`ErrorKind`] for the orchestrator's
/// propagation policy.
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error("zip: {0}")]
    Zip(String, ErrorKind),
    #[error("pdf: {0}")]
    Pdf(String, ErrorKind),
    #[error("office: {0}")]
    Office(String, ErrorKind),
    #[error("bitlocker: {0}")]
    Bitlocker(String, ErrorKind),
    #[error("luks: {0}")]
    Luks(String, ErrorKind),
    #[error("crack: {0}")]
    Crack(String, ErrorKind),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ForgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Zip(_, k)
            | Self::Pdf(_, k)
            | Self::Office(_, k)
            | Self::Bitlocker(_, k)
            | Self::Luks(_, k)
            | Self::Crack(_, k) => *k,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Malformed => "malformed",
            Self::Unsupported => "unsupported",
            Self::Crypto => "crypto",
            Self::Io => "io",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_recovered_from_wrapped_error() {
        let e = ForgeError::Zip("truncated central directory".into(), ErrorKind::Malformed);
        assert_eq!(e.kind(), ErrorKind::Malformed);
    }
}
