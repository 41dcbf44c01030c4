//! Snapshot source, annotation store and item control backed by JSON files.
//!
//! The snapshot file holds `{items, containers, remote_sessions}`; the
//! annotation file is a flat map of `note_<url>` keys. Writes go to a
//! sibling temp file that is then renamed over the original.

use crate::error::{ControlError, SourceError};
use crate::source::{AnnotationStore, ItemControl, SnapshotSource};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tabdeck_core::note::{NoteRecord, note_key, url_from_key};
use tabdeck_core::{Annotations, Container, ContainerId, Item, ItemId, RemoteSession};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotDocument {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub remote_sessions: Vec<RemoteSession>,
}

pub struct FileSnapshotSource {
    snapshot_path: PathBuf,
    annotations_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSnapshotSource {
    pub fn new(snapshot_path: impl Into<PathBuf>, annotations_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            annotations_path: annotations_path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn annotations_path(&self) -> &Path {
        &self.annotations_path
    }

    async fn read_snapshot_field<T: DeserializeOwned + Default>(
        &self,
        field: &'static str,
    ) -> Result<T, SourceError> {
        let content = match tokio::fs::read_to_string(&self.snapshot_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SourceError::Unavailable(
                    field,
                    format!("{} does not exist", self.snapshot_path.display()),
                ));
            }
            Err(e) => return Err(e.into()),
        };
        let mut doc: Map<String, Value> = serde_json::from_str(&content)?;
        match doc.remove(field) {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(T::default()),
        }
    }

    async fn read_annotation_map(&self) -> Result<Map<String, Value>, SourceError> {
        match tokio::fs::read_to_string(&self.annotations_path).await {
            Ok(content) if content.trim().is_empty() => Ok(Map::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_annotation_map(&self, map: &Map<String, Value>) -> Result<(), SourceError> {
        let content = serde_json::to_string_pretty(map)?;
        write_atomic(&self.annotations_path, content.as_bytes()).await?;
        Ok(())
    }

    async fn read_document(&self, operation: &'static str) -> Result<SnapshotDocument, ControlError> {
        let content = tokio::fs::read_to_string(&self.snapshot_path)
            .await
            .map_err(|e| ControlError::rejected(operation, e))?;
        serde_json::from_str(&content).map_err(|e| ControlError::rejected(operation, e))
    }

    /// Read, mutate and write back the snapshot document under the write lock.
    async fn edit_document<F>(&self, operation: &'static str, edit: F) -> Result<(), ControlError>
    where
        F: FnOnce(&mut SnapshotDocument) -> Result<(), ControlError> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read_document(operation).await?;
        edit(&mut doc)?;
        let content =
            serde_json::to_string_pretty(&doc).map_err(|e| ControlError::rejected(operation, e))?;
        write_atomic(&self.snapshot_path, content.as_bytes())
            .await
            .map_err(|e| ControlError::rejected(operation, e))
    }
}

async fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{name}.tmp"));
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await
}

fn find_item(doc: &SnapshotDocument, id: ItemId) -> Result<usize, ControlError> {
    doc.items
        .iter()
        .position(|item| item.id == Some(id))
        .ok_or(ControlError::NoSuchItem(id))
}

#[async_trait]
impl SnapshotSource for FileSnapshotSource {
    async fn list_items(&self) -> Result<Vec<Item>, SourceError> {
        self.read_snapshot_field("items").await
    }

    async fn list_containers(&self) -> Result<Vec<Container>, SourceError> {
        self.read_snapshot_field("containers").await
    }

    async fn list_remote_sessions(&self) -> Result<Vec<RemoteSession>, SourceError> {
        self.read_snapshot_field("remote_sessions").await
    }

    async fn list_annotations(&self) -> Result<Annotations, SourceError> {
        let map = self.read_annotation_map().await?;
        let mut annotations = Annotations::new();
        for (key, value) in map {
            let Some(url) = url_from_key(&key) else {
                continue;
            };
            match serde_json::from_value::<NoteRecord>(value) {
                Ok(record) => {
                    annotations.insert(url.to_string(), record.content().to_string());
                }
                Err(e) => debug!("Skipping unreadable note for {url}: {e}"),
            }
        }
        Ok(annotations)
    }
}

#[async_trait]
impl AnnotationStore for FileSnapshotSource {
    async fn get(&self, url: &str) -> Result<Option<NoteRecord>, SourceError> {
        let mut map = self.read_annotation_map().await?;
        match map.remove(&note_key(url)) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, url: &str, record: NoteRecord) -> Result<(), SourceError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_annotation_map().await?;
        map.insert(note_key(url), serde_json::to_value(&record)?);
        self.write_annotation_map(&map).await
    }

    async fn delete(&self, url: &str) -> Result<(), SourceError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_annotation_map().await?;
        if map.remove(&note_key(url)).is_some() {
            self.write_annotation_map(&map).await?;
        }
        Ok(())
    }
}

/// There is no live browser behind a file, so activation is only checked
/// and logged. Structural changes are written back to the snapshot file.
#[async_trait]
impl ItemControl for FileSnapshotSource {
    async fn activate(&self, item: ItemId) -> Result<(), ControlError> {
        let doc = self.read_document("activate").await?;
        find_item(&doc, item)?;
        info!("Activate tab {item}");
        Ok(())
    }

    async fn focus_container(&self, container: ContainerId) -> Result<(), ControlError> {
        let doc = self.read_document("focus").await?;
        if !doc.containers.iter().any(|c| c.id == container) {
            return Err(ControlError::NoSuchContainer(container));
        }
        info!("Focus window {container}");
        Ok(())
    }

    async fn close(&self, item: ItemId) -> Result<(), ControlError> {
        self.edit_document("close", |doc| {
            let index = find_item(doc, item)?;
            doc.items.remove(index);
            Ok(())
        })
        .await?;
        info!("Closed tab {item}");
        Ok(())
    }

    async fn move_item(&self, item: ItemId, target: ContainerId) -> Result<(), ControlError> {
        self.edit_document("move", |doc| {
            if !doc.containers.iter().any(|c| c.id == target) {
                return Err(ControlError::NoSuchContainer(target));
            }
            let index = find_item(doc, item)?;
            let mut moved = doc.items.remove(index);
            moved.container_id = Some(target);
            // Moved tabs land at the end of the target window.
            doc.items.push(moved);
            Ok(())
        })
        .await?;
        info!("Moved tab {item} to window {target}");
        Ok(())
    }

    async fn create_from_url(&self, url: &str) -> Result<(), ControlError> {
        let url = url.to_string();
        let opened = url.clone();
        self.edit_document("open", move |doc| {
            let id = doc.items.iter().filter_map(|item| item.id).max().unwrap_or(0) + 1;
            let container_id = doc.containers.first().map(|c| c.id);
            if container_id.is_none() {
                warn!("No window to open {url} in; the tab will be listed under Other");
            }
            doc.items.push(Item {
                id: Some(id),
                container_id,
                url,
                loading: true,
                ..Item::default()
            });
            Ok(())
        })
        .await?;
        info!("Opened {opened}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fetch_snapshot;
    use tabdeck_core::testing;
    use tempfile::TempDir;

    fn write_doc(dir: &TempDir, doc: &SnapshotDocument) -> PathBuf {
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, serde_json::to_string(doc).unwrap()).unwrap();
        path
    }

    fn sample(dir: &TempDir) -> FileSnapshotSource {
        let doc = SnapshotDocument {
            items: vec![
                testing::tab(1, 10, "A", "https://a.test/"),
                testing::tab(2, 10, "B", "https://b.test/"),
            ],
            containers: vec![testing::window(10), testing::window(11)],
            remote_sessions: vec![testing::remote_tab("Phone", "https://r.test/")],
        };
        let snapshot = write_doc(dir, &doc);
        FileSnapshotSource::new(snapshot, dir.path().join("annotations.json"))
    }

    #[tokio::test]
    async fn test_reads_snapshot_document() {
        let dir = TempDir::new().unwrap();
        let source = sample(&dir);
        let snapshot = fetch_snapshot(&source).await;
        assert_eq!(snapshot.items().len(), 2);
        assert_eq!(snapshot.containers().len(), 2);
        assert_eq!(snapshot.remote_sessions().len(), 1);
        assert!(snapshot.annotations().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_list_degrades_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(
            &path,
            r#"{"items": [{"id": 1, "container_id": 10, "url": "https://a.test/"}], "containers": "oops"}"#,
        )
        .unwrap();
        let source = FileSnapshotSource::new(&path, dir.path().join("annotations.json"));

        assert!(source.list_containers().await.is_err());
        assert!(source.list_remote_sessions().await.unwrap().is_empty());
        let snapshot = fetch_snapshot(&source).await;
        assert_eq!(snapshot.items().len(), 1);
        assert!(snapshot.containers().is_empty());
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let source = FileSnapshotSource::new(dir.path().join("none.json"), dir.path().join("a.json"));
        assert!(matches!(
            source.list_items().await,
            Err(SourceError::Unavailable("items", _))
        ));
        assert!(source.list_annotations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_annotation_store_keeps_foreign_keys() {
        let dir = TempDir::new().unwrap();
        let source = sample(&dir);
        std::fs::write(
            source.annotations_path(),
            r#"{"note_https://old.test/": "legacy text", "shortcut": {"code": "KeyY"}}"#,
        )
        .unwrap();

        let record = NoteRecord::new("fresh", Some("A".into()), None).unwrap();
        source.set("https://a.test/", record).await.unwrap();

        let annotations = source.list_annotations().await.unwrap();
        assert_eq!(annotations.get("https://old.test/").map(String::as_str), Some("legacy text"));
        assert_eq!(annotations.get("https://a.test/").map(String::as_str), Some("fresh"));

        source.delete("https://old.test/").await.unwrap();
        assert!(source.get("https://old.test/").await.unwrap().is_none());

        let raw: Map<String, Value> =
            serde_json::from_str(&std::fs::read_to_string(source.annotations_path()).unwrap())
                .unwrap();
        assert!(raw.contains_key("shortcut"));
        assert!(raw.contains_key("note_https://a.test/"));
    }

    #[tokio::test]
    async fn test_control_rewrites_snapshot() {
        let dir = TempDir::new().unwrap();
        let source = sample(&dir);

        source.move_item(1, 11).await.unwrap();
        source.close(2).await.unwrap();
        source.create_from_url("https://new.test/").await.unwrap();

        let items = source.list_items().await.unwrap();
        let placed: Vec<_> = items.iter().map(|i| (i.id, i.container_id)).collect();
        assert_eq!(placed, vec![(Some(1), Some(11)), (Some(3), Some(10))]);
        assert_eq!(items[1].url, "https://new.test/");
    }

    #[tokio::test]
    async fn test_control_errors() {
        let dir = TempDir::new().unwrap();
        let source = sample(&dir);
        assert_eq!(source.close(99).await, Err(ControlError::NoSuchItem(99)));
        assert_eq!(source.move_item(1, 42).await, Err(ControlError::NoSuchContainer(42)));
        assert_eq!(source.focus_container(42).await, Err(ControlError::NoSuchContainer(42)));
        assert!(source.activate(1).await.is_ok());
        assert!(!dir.path().join(".snapshot.json.tmp").exists());
    }
}
