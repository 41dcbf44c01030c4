//! Interfaces to the outside world: where snapshots come from, who carries
//! out item mutations, and where annotations are stored.

use crate::error::{ControlError, SourceError};
use async_trait::async_trait;
use tabdeck_core::note::NoteRecord;
use tabdeck_core::{Annotations, Container, ContainerId, Item, ItemId, RemoteSession, Snapshot};
use tracing::{debug, warn};

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn list_items(&self) -> Result<Vec<Item>, SourceError>;
    async fn list_containers(&self) -> Result<Vec<Container>, SourceError>;
    async fn list_remote_sessions(&self) -> Result<Vec<RemoteSession>, SourceError>;
    async fn list_annotations(&self) -> Result<Annotations, SourceError>;
}

/// Mutations on items. Every call may fail on its own.
#[async_trait]
pub trait ItemControl: Send + Sync {
    async fn activate(&self, item: ItemId) -> Result<(), ControlError>;
    async fn focus_container(&self, container: ContainerId) -> Result<(), ControlError>;
    async fn close(&self, item: ItemId) -> Result<(), ControlError>;
    async fn move_item(&self, item: ItemId, target: ContainerId) -> Result<(), ControlError>;
    async fn create_from_url(&self, url: &str) -> Result<(), ControlError>;
}

/// Annotation persistence, keyed by page URL.
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    async fn get(&self, url: &str) -> Result<Option<NoteRecord>, SourceError>;
    async fn set(&self, url: &str, record: NoteRecord) -> Result<(), SourceError>;
    async fn delete(&self, url: &str) -> Result<(), SourceError>;
}

/// Something changed in the item collection. Payloads are never trusted;
/// every event just leads to a fresh fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    Created,
    Removed,
    Updated,
    Moved,
    Attached,
    Detached,
}

/// Fetch all sub-sources jointly. A failing sub-source contributes nothing
/// instead of failing the whole fetch.
pub async fn fetch_snapshot(source: &dyn SnapshotSource) -> Snapshot {
    let (items, containers, remote_sessions, annotations) = tokio::join!(
        source.list_items(),
        source.list_containers(),
        source.list_remote_sessions(),
        source.list_annotations(),
    );

    let snapshot = Snapshot::new(
        or_empty("items", items),
        or_empty("containers", containers),
        or_empty("remote sessions", remote_sessions),
        or_empty("annotations", annotations),
    );
    debug!(
        "Snapshot fetched: {} items, {} containers, {} remote sessions",
        snapshot.items().len(),
        snapshot.containers().len(),
        snapshot.remote_sessions().len()
    );
    snapshot
}

fn or_empty<T: Default>(name: &str, result: Result<T, SourceError>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("Snapshot source '{name}' unavailable, continuing without it: {e}");
            T::default()
        }
    }
}
