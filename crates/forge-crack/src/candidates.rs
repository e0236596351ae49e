//! Assembles the deduplicated, ordered candidate-password list a
//! [`forge_ports::job::CrackJob`] is partitioned over.
use std::collections::HashSet;
use std::io::Read;

use forge_ports::job::{CandidateSource, Scope};
use forge_ports::ports::{ArtifactStore, FileStore, TagStore, CRACKER_SOURCE_TAG};

use crate::error::CrackError;

const COMMON_10: &str = include_str!("../resources/wordlists/common-10.txt");
const COMMON_100: &str = include_str!("../resources/wordlists/common-100.txt");
const COMMON_1000: &str = include_str!("../resources/wordlists/common-1000.txt");

fn common_list(n: u32) -> &'static str {
    match n {
        10 => COMMON_10,
        100 => COMMON_100,
        1000 => COMMON_1000,
        _ => COMMON_1000,
    }
}

fn lines_of(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty() && !l.starts_with('#'))
}

/// Builds the ordered, deduplicated candidate set for `sources`, scoped
/// to `object_id` via the host's file and tag stores.
pub fn build<F: FileStore, T: TagStore>(
    sources: &[CandidateSource],
    object_id: &str,
    files: &F,
    tags: &T,
    min_len: usize,
) -> Result<Vec<String>, CrackError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut push = |candidate: String| {
        if candidate.len() >= min_len && seen.insert(candidate.clone()) {
            out.push(candidate);
        }
    };

    for source in sources {
        match source {
            CandidateSource::CommonList(n) => {
                for line in lines_of(common_list(*n)) {
                    push(line.to_string());
                }
            }
            CandidateSource::WordlistFile(path) => {
                let mut reader = files.open(path)?;
                let mut content = String::new();
                reader
                    .read_to_string(&mut content)
                    .map_err(|_| CrackError::NotPlainText(path.clone()))?;
                for line in lines_of(&content) {
                    push(line.to_string());
                }
            }
            CandidateSource::StringsFromScope(scope) => {
                for id in resolve_scope(files, object_id, *scope)? {
                    for s in strings_of(files, &id)? {
                        push(s);
                    }
                }
            }
            CandidateSource::TaggedFiles => {
                let Some(tag) = tags.tag_name(CRACKER_SOURCE_TAG) else {
                    continue;
                };
                for id in tags.files_tagged(&tag) {
                    for s in strings_of(files, &id)? {
                        push(s);
                    }
                }
            }
            CandidateSource::RandomEnumeration { .. } => {}
        }
    }

    Ok(out)
}

fn resolve_scope<F: FileStore>(files: &F, object_id: &str, scope: Scope) -> Result<Vec<String>, CrackError> {
    let glob = "*";
    let root = match scope {
        Scope::Folder => files.parent(object_id)?.unwrap_or_else(|| object_id.to_string()),
        Scope::DataSource | Scope::Hostname | Scope::All => object_id.to_string(),
    };
    Ok(files.find_files(&root, glob)?)
}

fn strings_of<F: FileStore>(files: &F, id: &str) -> Result<Vec<String>, CrackError> {
    let mut reader = files.open(id)?;
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(forge_strings::extract_from_file(&bytes, 6))
}

/// Reads the passwords already tried against `object_id`, per
/// `FORGE_TRIED_PASSWORD`.
pub fn already_tried<A: ArtifactStore>(store: &A, object_id: &str) -> HashSet<String> {
    match store.get_attribute(object_id, forge_ports::attributes::FORGE_TRIED_PASSWORD) {
        Some(forge_ports::AttributeValue::String(s)) => s.split(',').filter(|p| !p.is_empty()).map(String::from).collect(),
        _ => HashSet::new(),
    }
}

/// Appends `password` to the tried-password list for `object_id`.
pub fn record_tried<A: ArtifactStore>(store: &A, object_id: &str, password: &str) {
    let mut tried = already_tried(store, object_id);
    if tried.insert(password.to_string()) {
        let joined = tried.into_iter().collect::<Vec<_>>().join(",");
        store.put_attribute(
            object_id,
            forge_ports::attributes::FORGE_TRIED_PASSWORD,
            forge_ports::AttributeValue::String(joined),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_list_lines_are_nonempty_and_trimmed() {
        let lines: Vec<&str> = lines_of(COMMON_10).collect();
        assert!(!lines.is_empty());
        assert!(lines.iter().all(|l| l == &l.trim()));
    }

    #[test]
    fn dedupes_across_overlapping_sources() {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut push = |candidate: String| {
            if seen.insert(candidate.clone()) {
                out.push(candidate);
            }
        };
        for line in lines_of(COMMON_10) {
            push(line.to_string());
        }
        for line in lines_of(COMMON_10) {
            push(line.to_string());
        }
        assert_eq!(out.len(), seen.len());
    }
}
