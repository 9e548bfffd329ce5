//! Bundle archive writer and file-save sinks.
//!
//! Layout: `manifest.json` at the root, then `<group>/<artifact>.<ext>` for
//! every artifact, sorted by path.

use crate::error::Result;
use crate::types::{ArtifactContent, BundleManifest};
use serde::Serialize;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

#[derive(Debug, Serialize)]
struct IndexEntry {
    path: String,
    status: &'static str,
    bytes: u64,
}

#[derive(Debug, Serialize)]
struct Index {
    collected_at: String,
    artifacts: Vec<IndexEntry>,
}

/// Serializes a collected manifest into a ZIP archive.
pub struct BundleWriter<'a> {
    manifest: &'a BundleManifest,
}

impl<'a> BundleWriter<'a> {
    pub fn new(manifest: &'a BundleManifest) -> Self {
        Self { manifest }
    }

    /// Pretty JSON for JSON content and failure markers, raw text for logs.
    fn render(content: &ArtifactContent) -> Result<Vec<u8>> {
        Ok(match content {
            ArtifactContent::Json(value) => serde_json::to_string_pretty(value)?.into_bytes(),
            ArtifactContent::Failed(marker) => serde_json::to_string_pretty(marker)?.into_bytes(),
            ArtifactContent::Text(text) => text.clone().into_bytes(),
        })
    }

    pub fn files(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let mut files = Vec::new();
        let mut index = Vec::new();

        for (path, artifact) in self.manifest.entries() {
            let data = Self::render(&artifact.content)?;
            index.push(IndexEntry {
                path: path.clone(),
                status: if artifact.content.is_failure() {
                    "failed"
                } else {
                    "ok"
                },
                bytes: data.len() as u64,
            });
            debug!(path = %path, bytes = data.len(), "Added file to bundle");
            files.push((path, data));
        }

        files.sort_by(|a, b| a.0.cmp(&b.0));
        index.sort_by(|a, b| a.path.cmp(&b.path));

        let index = Index {
            collected_at: self.manifest.started_at.to_rfc3339(),
            artifacts: index,
        };
        files.insert(
            0,
            ("manifest.json".to_string(), serde_json::to_vec_pretty(&index)?),
        );
        Ok(files)
    }

    pub fn write_to_vec(&self) -> Result<Vec<u8>> {
        let files = self.files()?;

        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut buffer);

            let options: FileOptions<'_, ()> = FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .unix_permissions(0o644);

            for (file_path, data) in &files {
                zip.start_file(file_path.as_str(), options)?;
                zip.write_all(data)?;
            }

            zip.finish()?;
        }

        let bytes = buffer.into_inner();
        info!(
            files = files.len(),
            compressed_bytes = bytes.len(),
            "Bundle archive assembled"
        );
        Ok(bytes)
    }
}

/// Where finished downloads end up.
pub trait FileSink {
    fn save(&self, data: &[u8], file_name: &str) -> Result<PathBuf>;
}

/// Saves files into a directory, creating it if needed. A file only appears
/// under its final name once fully written.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FileSink for DirectorySink {
    fn save(&self, data: &[u8], file_name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(path)
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingSink {
        pub saved: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl FileSink for RecordingSink {
        fn save(&self, data: &[u8], file_name: &str) -> Result<PathBuf> {
            self.saved
                .lock()
                .unwrap()
                .push((file_name.to_string(), data.to_vec()));
            Ok(PathBuf::from(file_name))
        }
    }

    /// Fails every save, as a full disk would.
    pub struct FailingSink;

    impl FileSink for FailingSink {
        fn save(&self, _data: &[u8], _file_name: &str) -> Result<PathBuf> {
            Err(std::io::Error::other("no space left on device").into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Artifact, FailureMarker};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::io::Read;
    use tempfile::TempDir;

    fn manifest() -> BundleManifest {
        let mut m = BundleManifest::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        m.push(
            "k8s",
            Artifact {
                name: "nodes".to_string(),
                content: ArtifactContent::Json(json!({"items": [{"name": "n1"}]})),
            },
        );
        m.push(
            "k8s",
            Artifact {
                name: "events".to_string(),
                content: ArtifactContent::Failed(FailureMarker::new("forbidden")),
            },
        );
        m.push(
            "logs",
            Artifact {
                name: "wandb-app-0".to_string(),
                content: ArtifactContent::Text("line one\nline two\n".to_string()),
            },
        );
        m.ensure_group("config");
        m
    }

    #[test]
    fn test_files_layout() {
        let m = manifest();
        let files = BundleWriter::new(&m).files().unwrap();
        let paths: Vec<&str> = files.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "manifest.json",
                "k8s/events.json",
                "k8s/nodes.json",
                "logs/wandb-app-0.log"
            ]
        );
    }

    #[test]
    fn test_json_is_pretty_and_text_verbatim() {
        let m = manifest();
        let files = BundleWriter::new(&m).files().unwrap();
        let nodes = &files.iter().find(|(p, _)| p == "k8s/nodes.json").unwrap().1;
        let nodes = String::from_utf8(nodes.clone()).unwrap();
        assert_eq!(
            nodes,
            serde_json::to_string_pretty(&json!({"items": [{"name": "n1"}]})).unwrap()
        );
        let log = &files.iter().find(|(p, _)| p == "logs/wandb-app-0.log").unwrap().1;
        assert_eq!(log.as_slice(), b"line one\nline two\n");
    }

    #[test]
    fn test_index_marks_failures() {
        let m = manifest();
        let files = BundleWriter::new(&m).files().unwrap();
        let index: serde_json::Value = serde_json::from_slice(&files[0].1).unwrap();
        assert_eq!(index["artifacts"].as_array().unwrap().len(), 3);
        assert_eq!(index["artifacts"][0]["path"], "k8s/events.json");
        assert_eq!(index["artifacts"][0]["status"], "failed");
        assert_eq!(index["artifacts"][1]["status"], "ok");
    }

    #[test]
    fn test_zip_round_trip_through_directory_sink() {
        let m = manifest();
        let bytes = BundleWriter::new(&m).write_to_vec().unwrap();

        let dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(dir.path().join("out"));
        let path = sink.save(&bytes, "bundle.zip").unwrap();
        assert!(path.exists());

        let file = std::fs::File::open(path).unwrap();
        let mut zip = zip::ZipArchive::new(file).unwrap();
        assert_eq!(zip.len(), 4);
        let mut marker = String::new();
        zip.by_name("k8s/events.json")
            .unwrap()
            .read_to_string(&mut marker)
            .unwrap();
        let marker: FailureMarker = serde_json::from_str(&marker).unwrap();
        assert_eq!(marker.error, "forbidden");
    }

    #[test]
    fn test_directory_sink_leaves_only_final_file() {
        let dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(dir.path());
        sink.save(b"first", "wandb-app-0.logs").unwrap();
        let path = sink.save(b"second", "wandb-app-0.logs").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("wandb-app-0.logs")]);
    }

    #[test]
    fn test_directory_sink_failure_saves_nothing() {
        let dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(dir.path());
        std::fs::create_dir(dir.path().join("bundle.zip")).unwrap();

        assert!(sink.save(b"data", "bundle.zip").is_err());
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("bundle.zip")]);
        assert!(dir.path().join("bundle.zip").is_dir());
    }
}
