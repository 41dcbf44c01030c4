//! Per-item commands issued from a card: open, close and annotate.

use crate::error::ActionError;
use crate::scheduler::SchedulerHandle;
use crate::source::{AnnotationStore, ItemControl};
use crate::view::{Notice, ViewSink};
use std::sync::Arc;
use tabdeck_core::note::NoteRecord;
use tabdeck_core::{CardItem, ItemKey, RenderedState};
use tokio::sync::watch;
use tracing::{debug, warn};

pub struct ItemActions {
    control: Arc<dyn ItemControl>,
    store: Arc<dyn AnnotationStore>,
    rendered: watch::Receiver<Arc<RenderedState>>,
    scheduler: Option<SchedulerHandle>,
    view: Arc<dyn ViewSink>,
}

impl ItemActions {
    pub fn new(
        control: Arc<dyn ItemControl>,
        store: Arc<dyn AnnotationStore>,
        rendered: watch::Receiver<Arc<RenderedState>>,
        view: Arc<dyn ViewSink>,
    ) -> Self {
        Self {
            control,
            store,
            rendered,
            scheduler: None,
            view,
        }
    }

    pub fn with_scheduler(mut self, scheduler: SchedulerHandle) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Bring a local tab to the front, or open a remote entry as a new tab.
    pub async fn activate(&self, key: &ItemKey) -> Result<(), ActionError> {
        let (item, container) = self.lookup(key)?;
        let result = match key.local_id() {
            Some(id) => self.activate_local(id, container).await,
            None => self.control.create_from_url(&item.url).await.map_err(Into::into),
        };
        self.report("open tab", result)
    }

    async fn activate_local(&self, id: u64, container: Option<u64>) -> Result<(), ActionError> {
        self.control.activate(id).await?;
        if let Some(container) = container {
            self.control.focus_container(container).await?;
        }
        Ok(())
    }

    pub async fn close(&self, key: &ItemKey) -> Result<(), ActionError> {
        self.lookup(key)?;
        let id = key
            .local_id()
            .ok_or_else(|| ActionError::NotLocal(key.clone()))?;
        let result: Result<(), ActionError> = self.control.close(id).await.map_err(Into::into);
        // The tab may already be gone, in which case no event will follow.
        self.request_pass();
        self.report("close tab", result)
    }

    pub async fn annotate(
        &self,
        url: &str,
        text: &str,
        title: Option<&str>,
        favicon: Option<&str>,
    ) -> Result<(), ActionError> {
        let record = NoteRecord::new(text, title.map(str::to_string), favicon.map(str::to_string));
        let result: Result<(), ActionError> = match record {
            Ok(record) => self.store.set(url, record).await.map_err(Into::into),
            Err(e) => Err(e.into()),
        };
        if result.is_ok() {
            debug!("Saved note for {url}");
            self.request_pass();
        }
        self.report("save note", result)
    }

    pub async fn clear_annotation(&self, url: &str) -> Result<(), ActionError> {
        let result: Result<(), ActionError> = self.store.delete(url).await.map_err(Into::into);
        if result.is_ok() {
            debug!("Removed note for {url}");
            self.request_pass();
        }
        self.report("remove note", result)
    }

    /// The displayed item and the window it is in, if any.
    fn lookup(&self, key: &ItemKey) -> Result<(CardItem, Option<u64>), ActionError> {
        let rendered = self.rendered.borrow();
        let item = rendered
            .item(key)
            .cloned()
            .ok_or_else(|| ActionError::UnknownItem(key.clone()))?;
        let container = rendered
            .group_of(key)
            .and_then(|group| rendered.card(group))
            .and_then(|card| card.container_id);
        Ok((item, container))
    }

    fn request_pass(&self) {
        if let Some(scheduler) = &self.scheduler {
            scheduler.notify();
        }
    }

    fn report(&self, what: &str, result: Result<(), ActionError>) -> Result<(), ActionError> {
        if let Err(e) = &result {
            warn!("Failed to {what}: {e}");
            self.view.notice(Notice::error(format!("Failed to {what}: {e}")));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ControlError, SourceError};
    use crate::view::RecordingView;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use tabdeck_core::grouping::{StrategyKind, group};
    use tabdeck_core::{Annotations, ContainerId, ItemId, Snapshot, build_cards, testing};

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        fail_close: bool,
        notes: Mutex<BTreeMap<String, NoteRecord>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn push(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl ItemControl for Recorder {
        async fn activate(&self, item: ItemId) -> Result<(), ControlError> {
            self.push(format!("activate {item}"));
            Ok(())
        }

        async fn focus_container(&self, container: ContainerId) -> Result<(), ControlError> {
            self.push(format!("focus {container}"));
            Ok(())
        }

        async fn close(&self, item: ItemId) -> Result<(), ControlError> {
            if self.fail_close {
                return Err(ControlError::NoSuchItem(item));
            }
            self.push(format!("close {item}"));
            Ok(())
        }

        async fn move_item(&self, _item: ItemId, _target: ContainerId) -> Result<(), ControlError> {
            Ok(())
        }

        async fn create_from_url(&self, url: &str) -> Result<(), ControlError> {
            self.push(format!("create {url}"));
            Ok(())
        }
    }

    #[async_trait]
    impl AnnotationStore for Recorder {
        async fn get(&self, url: &str) -> Result<Option<NoteRecord>, SourceError> {
            Ok(self.notes.lock().unwrap().get(url).cloned())
        }

        async fn set(&self, url: &str, record: NoteRecord) -> Result<(), SourceError> {
            self.notes.lock().unwrap().insert(url.to_string(), record);
            Ok(())
        }

        async fn delete(&self, url: &str) -> Result<(), SourceError> {
            self.notes.lock().unwrap().remove(url);
            Ok(())
        }
    }

    fn actions(fail_close: bool) -> (ItemActions, Arc<Recorder>, Arc<RecordingView>) {
        let snapshot = Snapshot::new(
            vec![testing::tab(1, 10, "A", "https://a.test/")],
            vec![testing::window(10)],
            vec![testing::remote_tab("Phone", "https://r.test/")],
            Annotations::new(),
        );
        let cards = build_cards(&group(&snapshot, StrategyKind::Window), &snapshot);
        let rendered = watch::channel(Arc::new(RenderedState::from_cards(cards))).1;

        let recorder = Arc::new(Recorder {
            fail_close,
            ..Recorder::default()
        });
        let view = Arc::new(RecordingView::new());
        let actions = ItemActions::new(recorder.clone(), recorder.clone(), rendered, view.clone());
        (actions, recorder, view)
    }

    #[tokio::test]
    async fn test_activate_local_focuses_window() {
        let (actions, recorder, _view) = actions(false);
        actions.activate(&ItemKey::local(1)).await.unwrap();
        assert_eq!(recorder.calls(), vec!["activate 1", "focus 10"]);
    }

    #[tokio::test]
    async fn test_activate_remote_opens_url() {
        let (actions, recorder, _view) = actions(false);
        let key = ItemKey::remote("Phone", 0, 0, "https://r.test/");
        actions.activate(&key).await.unwrap();
        assert_eq!(recorder.calls(), vec!["create https://r.test/"]);
    }

    #[tokio::test]
    async fn test_unknown_and_remote_items_cannot_be_closed() {
        let (actions, recorder, _view) = actions(false);
        assert!(matches!(
            actions.close(&ItemKey::local(42)).await,
            Err(ActionError::UnknownItem(_))
        ));
        let remote = ItemKey::remote("Phone", 0, 0, "https://r.test/");
        assert!(matches!(actions.close(&remote).await, Err(ActionError::NotLocal(_))));
        assert!(recorder.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_close_becomes_notice() {
        let (actions, _recorder, view) = actions(true);
        let result = actions.close(&ItemKey::local(1)).await;
        assert!(matches!(result, Err(ActionError::Control(ControlError::NoSuchItem(1)))));
        assert_eq!(view.notices()[0].message, "Failed to close tab: no such item: 1");
    }

    #[tokio::test]
    async fn test_annotate_and_clear() {
        let (actions, recorder, view) = actions(false);
        actions
            .annotate("https://a.test/", "check later", Some("A"), None)
            .await
            .unwrap();
        let stored = recorder.get("https://a.test/").await.unwrap().unwrap();
        assert_eq!(stored.content(), "check later");

        assert!(matches!(
            actions.annotate("https://a.test/", "   ", None, None).await,
            Err(ActionError::Note(_))
        ));
        assert_eq!(view.notices().len(), 1);

        actions.clear_annotation("https://a.test/").await.unwrap();
        assert!(recorder.get("https://a.test/").await.unwrap().is_none());
    }
}
