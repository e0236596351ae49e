//! A cracking job: the descriptor under attack plus the shared,
//! concurrency-safe state every worker reads and writes.
use crate::descriptor::FormatDescriptor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64};

/// One source of candidate passwords, as configured by the analyst
#[derive(Debug, Clone)]
pub enum CandidateSource {
    /// A bundled common-password list of the given size tier (10, 100, 1000, ...)
    CommonList(u32),
    /// A path to a plain-text wordlist, one candidate per line
    WordlistFile(String),
    /// Printable strings harvested from files in the given scope
    StringsFromScope(Scope),
    /// Files tagged with the well-known "FORGE Cracker Source" tag
    TaggedFiles,
    /// Exhaustive enumeration over a charset and length range
    RandomEnumeration {
        charset: Vec<char>,
        min_len: u32,
        max_len: u32,
    },
}

/// The scope `StringsFromScope` resolves files against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Folder,
    DataSource,
    Hostname,
    All,
}

/// The write-once, first-writer-wins result slot shared by every worker
#[derive(Debug, Default)]
pub struct FoundPassword(Mutex<Option<String>>);

impl FoundPassword {
    pub fn new() -> Self {
        Self(Mutex::new(None))
    }

    /// Installs `password` iff no password has been installed yet. Returns
    /// `true` iff this call won the race.
    pub fn try_set(&self, password: String) -> bool {
        let mut slot = self.0.lock().expect("found-password mutex poisoned");
        if slot.is_some() {
            return false;
        }
        *slot = Some(password);
        true
    }

    pub fn get(&self) -> Option<String> {
        self.0.lock().expect("found-password mutex poisoned").clone()
    }
}

/// A single password-cracking run against one [`FormatDescriptor`]
pub struct CrackJob {
    pub descriptor: FormatDescriptor,
    pub worker_count: usize,
    pub candidate_sources: Vec<CandidateSource>,
    /// Passwords already tried in a prior run against this descriptor;
    /// subtracted from the candidate set before partitioning.
    pub tried_passwords: Vec<String>,
    pub cancelled: AtomicBool,
    pub found_password: FoundPassword,
    /// Count of candidates examined so far, sampled by the progress reporter.
    pub progress: AtomicU64,
}

impl CrackJob {
    pub fn new(
        descriptor: FormatDescriptor,
        worker_count: usize,
        candidate_sources: Vec<CandidateSource>,
        tried_passwords: Vec<String>,
    ) -> Self {
        assert!(worker_count >= 1, "worker_count must be at least 1");
        Self {
            descriptor,
            worker_count,
            candidate_sources,
            tried_passwords,
            cancelled: AtomicBool::new(false),
            found_password: FoundPassword::new(),
            progress: AtomicU64::new(0),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(std::sync::atomic::Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, std::sync::atomic::Ordering::Release);
    }
}

/// Outcome reported to the analyst once a [`CrackJob`] completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Found(String),
    Exhausted,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn found_password_is_write_once() {
        let found = FoundPassword::new();
        assert!(found.try_set("first".into()));
        assert!(!found.try_set("second".into()));
        assert_eq!(found.get(), Some("first".into()));
    }
}
