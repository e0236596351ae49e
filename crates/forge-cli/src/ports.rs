//! Standalone (non-host-platform) implementations of the `forge-ports`
//! traits, suitable for running the core against the local filesystem
//! rather than inside a larger host platform.
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use forge_ports::attributes::AttributeValue;
use forge_ports::ports::{ArtifactStore, FileStore, Notifier, Progress, TagStore};

/// Treats object ids as filesystem paths.
pub struct StandaloneFiles;

impl FileStore for StandaloneFiles {
    type Reader = BufReader<File>;

    fn open(&self, id: &str) -> std::io::Result<Self::Reader> {
        Ok(BufReader::new(File::open(id)?))
    }

    fn find_files(&self, scope: &str, glob: &str) -> std::io::Result<Vec<String>> {
        let dir = Path::new(scope);
        let mut out = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if glob == "*" || name == glob {
                out.push(entry.path().to_string_lossy().into_owned());
            }
        }
        Ok(out)
    }

    fn parent(&self, id: &str) -> std::io::Result<Option<String>> {
        Ok(Path::new(id).parent().map(|p| p.to_string_lossy().into_owned()))
    }

    fn mime_of(&self, id: &str) -> std::io::Result<String> {
        Ok(match Path::new(id).extension().and_then(|e| e.to_str()) {
            Some("zip") | Some("docx") | Some("xlsx") | Some("pptx") => "application/zip".into(),
            Some("pdf") => "application/pdf".into(),
            _ => "application/octet-stream".into(),
        })
    }

    fn extension_of(&self, id: &str) -> std::io::Result<String> {
        Ok(Path::new(id).extension().and_then(|e| e.to_str()).unwrap_or("").to_string())
    }
}

/// Standalone mode has no tagging system of its own; the well-known
/// cracker-source tag always resolves to no files.
pub struct StandaloneTags;

impl TagStore for StandaloneTags {
    fn tag_name(&self, _well_known: &str) -> Option<String> {
        None
    }

    fn files_tagged(&self, _tag: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Persists attributes to a JSON sidecar file next to the object being
/// analyzed, so a re-run can pick up `FORGE_TRIED_PASSWORD` from a
/// previous session.
pub struct SidecarArtifacts {
    path: PathBuf,
    attrs: Mutex<HashMap<String, AttributeValue>>,
}

impl SidecarArtifacts {
    pub fn load(object_id: &str) -> Self {
        let path = sidecar_path(object_id);
        let attrs = std::fs::read(&path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();
        Self { path, attrs: Mutex::new(attrs) }
    }

    fn save(&self) {
        if let Ok(attrs) = self.attrs.lock() {
            if let Ok(bytes) = serde_json::to_vec_pretty(&*attrs) {
                let _ = std::fs::write(&self.path, bytes);
            }
        }
    }
}

fn sidecar_path(object_id: &str) -> PathBuf {
    let mut path = PathBuf::from(object_id);
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.set_file_name(format!("{name}.forge-attrs.json"));
    path
}

impl ArtifactStore for SidecarArtifacts {
    fn get_attribute(&self, _object_id: &str, name: &str) -> Option<AttributeValue> {
        self.attrs.lock().ok()?.get(name).cloned()
    }

    fn put_attribute(&self, _object_id: &str, name: &str, value: AttributeValue) {
        if let Ok(mut attrs) = self.attrs.lock() {
            attrs.insert(name.to_string(), value);
        }
        self.save();
    }

    fn delete_and_replace(&self, _object_id: &str, _data: &[u8]) {}
}

/// Logs analyst-facing notifications via `tracing`.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn info(&self, title: &str, detail: &str) {
        tracing::info!("{title}: {detail}");
    }

    fn warn(&self, title: &str, detail: &str) {
        tracing::warn!("{title}: {detail}");
    }

    fn error(&self, title: &str, detail: &str) {
        tracing::error!("{title}: {detail}");
    }
}

/// Logs progress via `tracing` rather than a terminal progress bar: the
/// standalone front-end has no UI surface to draw one on.
pub struct TracingProgress;

impl Progress for TracingProgress {
    fn start(&self, label: &str) {
        tracing::info!("{label}: starting");
    }

    fn determinate(&self, total: u64) {
        tracing::info!("{total} candidates queued");
    }

    fn indeterminate(&self, label: &str) {
        tracing::info!("{label}: running");
    }

    fn advance(&self, n: u64, _label: &str) {
        tracing::debug!("{n} candidates tried");
    }

    fn finish(&self) {
        tracing::info!("done");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_path_sits_next_to_the_target_file() {
        assert_eq!(sidecar_path("/tmp/archive.zip"), PathBuf::from("/tmp/archive.zip.forge-attrs.json"));
    }

    #[test]
    fn sidecar_round_trips_an_attribute() {
        let dir = std::env::temp_dir().join(format!("forge-cli-test-{}", std::process::id()));
        let target = dir.join("case.zip");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&target, b"").unwrap();

        let object_id = target.to_string_lossy().into_owned();
        {
            let store = SidecarArtifacts::load(&object_id);
            store.put_attribute(&object_id, "FORGE_TRIED_PASSWORD", AttributeValue::String("a,b".into()));
        }
        let store = SidecarArtifacts::load(&object_id);
        match store.get_attribute(&object_id, "FORGE_TRIED_PASSWORD") {
            Some(AttributeValue::String(s)) => assert_eq!(s, "a,b"),
            other => panic!("unexpected attribute: {other:?}"),
        }
        let _ = std::fs::remove_dir_all(&dir);
    }
}
