//! Host-platform ports
//!
//! The orchestrator is constructed with implementations of these traits
//! rather than reaching for a global file manager, tag manager or
//! notification bus. This keeps every collaborator mockable in tests and
//! makes the CLI front-end's standalone (non-host-platform) implementations
//! a drop-in replacement.
use crate::attributes::AttributeValue;
use std::io::Read;

/// File access and discovery, scoped to the host platform's object graph
pub trait FileStore {
    type Reader: Read;

    fn open(&self, id: &str) -> std::io::Result<Self::Reader>;
    fn find_files(&self, scope: &str, glob: &str) -> std::io::Result<Vec<String>>;
    fn parent(&self, id: &str) -> std::io::Result<Option<String>>;
    fn mime_of(&self, id: &str) -> std::io::Result<String>;
    fn extension_of(&self, id: &str) -> std::io::Result<String>;
}

/// Per-object attribute storage
pub trait ArtifactStore {
    fn get_attribute(&self, object_id: &str, name: &str) -> Option<AttributeValue>;
    fn put_attribute(&self, object_id: &str, name: &str, value: AttributeValue);
    fn delete_and_replace(&self, object_id: &str, data: &[u8]);
}

/// Tag lookups, used to resolve the "FORGE Cracker Source" tagged-files
/// candidate source
pub trait TagStore {
    fn tag_name(&self, well_known: &str) -> Option<String>;
    fn files_tagged(&self, tag: &str) -> Vec<String>;
}

/// Analyst-facing notifications
pub trait Notifier {
    fn info(&self, title: &str, detail: &str);
    fn warn(&self, title: &str, detail: &str);
    fn error(&self, title: &str, detail: &str);
}

/// Progress reporting for a running [`crate::job::CrackJob`]
pub trait Progress {
    fn start(&self, label: &str);
    fn determinate(&self, total: u64);
    fn indeterminate(&self, label: &str);
    fn advance(&self, n: u64, label: &str);
    fn finish(&self);
}

/// The well-known tag name used to mark files as cracker candidate sources
pub const CRACKER_SOURCE_TAG: &str = "FORGE Cracker Source";
