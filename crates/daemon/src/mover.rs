//! Cross-group moves: a drop of an item onto another window card.
//!
//! Nothing is moved locally. The request goes to item control and the
//! displayed state only changes once a later pass observes the move.

use crate::error::MoveError;
use crate::scheduler::SchedulerHandle;
use crate::source::ItemControl;
use crate::view::{Notice, ViewSink};
use std::sync::Arc;
use tabdeck_core::{GroupKey, ItemKey, RenderedState};
use tokio::sync::watch;
use tracing::{info, warn};

pub struct MoveController {
    control: Arc<dyn ItemControl>,
    rendered: watch::Receiver<Arc<RenderedState>>,
    scheduler: Option<SchedulerHandle>,
    view: Arc<dyn ViewSink>,
}

impl MoveController {
    pub fn new(
        control: Arc<dyn ItemControl>,
        rendered: watch::Receiver<Arc<RenderedState>>,
        view: Arc<dyn ViewSink>,
    ) -> Self {
        Self {
            control,
            rendered,
            scheduler: None,
            view,
        }
    }

    pub fn with_scheduler(mut self, scheduler: SchedulerHandle) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub async fn request_move(
        &self,
        item: &ItemKey,
        source: &GroupKey,
        target: &GroupKey,
    ) -> Result<(), MoveError> {
        let (item_id, container) = self.validate(item, source, target)?;

        info!("Moving {item} from {source} to {target}");
        if let Err(e) = self.control.move_item(item_id, container).await {
            warn!("Move of {item} to {target} failed: {e}");
            self.view
                .notice(Notice::error(format!("Failed to move tab: {e}")));
            return Err(MoveError::Failed(e));
        }

        // The change event normally arrives on its own; asking again is
        // coalesced by the scheduler.
        if let Some(scheduler) = &self.scheduler {
            scheduler.notify();
        }
        Ok(())
    }

    fn validate(
        &self,
        item: &ItemKey,
        source: &GroupKey,
        target: &GroupKey,
    ) -> Result<(u64, u64), MoveError> {
        if source == target {
            return Err(MoveError::SameGroup(target.clone()));
        }

        let rendered = self.rendered.borrow();
        let target_card = rendered
            .card(target)
            .ok_or_else(|| MoveError::UnknownGroup(target.clone()))?;
        let container = match (target_card.movable, target_card.container_id) {
            (true, Some(id)) => id,
            _ => return Err(MoveError::NotMovable(target.clone())),
        };

        let in_source = rendered
            .card(source)
            .is_some_and(|card| card.contains(item));
        if !in_source {
            return Err(MoveError::NotInGroup {
                item: item.clone(),
                group: source.clone(),
            });
        }

        let item_id = item
            .local_id()
            .ok_or_else(|| MoveError::NotLocal(item.clone()))?;
        Ok((item_id, container))
    }
}
