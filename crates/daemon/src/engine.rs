//! One reconciliation pass: fetch -> group -> resolve -> diff -> apply -> replace.

use crate::scheduler::{PassRunner, SchedulerHandle};
use crate::source::{SnapshotSource, fetch_snapshot};
use crate::view::ViewSink;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tabdeck_core::{
    DashboardStats, RenderedState, StrategyKind, ViewOp, build_cards, group, reconcile,
};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub strategy: StrategyKind,
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    pub reordered: bool,
    pub groups: usize,
    pub items: usize,
    pub elapsed: Duration,
}

impl PassReport {
    pub fn changed(&self) -> bool {
        self.created + self.updated + self.removed > 0 || self.reordered
    }
}

/// Owns the rendered state. Each completed pass replaces it and publishes
/// the new generation read-only for the move controller and item actions.
pub struct Engine {
    source: Arc<dyn SnapshotSource>,
    view: Arc<dyn ViewSink>,
    strategy: watch::Receiver<StrategyKind>,
    rendered: Arc<RenderedState>,
    published: watch::Sender<Arc<RenderedState>>,
}

impl Engine {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        view: Arc<dyn ViewSink>,
        strategy: watch::Receiver<StrategyKind>,
    ) -> Self {
        let rendered = Arc::new(RenderedState::default());
        let (published, _) = watch::channel(Arc::clone(&rendered));
        Self {
            source,
            view,
            strategy,
            rendered,
            published,
        }
    }

    /// Read-only view of the latest completed generation.
    pub fn subscribe(&self) -> watch::Receiver<Arc<RenderedState>> {
        self.published.subscribe()
    }

    pub fn rendered(&self) -> &RenderedState {
        &self.rendered
    }

    pub async fn pass(&mut self) -> PassReport {
        let started = Instant::now();
        let strategy = *self.strategy.borrow_and_update();

        let snapshot = fetch_snapshot(self.source.as_ref()).await;
        let groups = group(&snapshot, strategy);
        let cards = build_cards(&groups, &snapshot);
        let result = reconcile(&self.rendered, cards);
        for key in &result.duplicates {
            warn!("Dropped card with duplicate key {key}");
        }

        let (created, updated, removed) = result.counts();
        let reordered = result
            .ops
            .iter()
            .any(|op| matches!(op, ViewOp::ReorderGroups { .. }));

        self.view.apply(&result.ops);
        self.view.stats(&DashboardStats::from_snapshot(&snapshot));

        self.rendered = Arc::new(result.state);
        self.published.send_replace(Arc::clone(&self.rendered));

        let report = PassReport {
            strategy,
            created,
            updated,
            removed,
            reordered,
            groups: self.rendered.len(),
            items: self.rendered.item_count(),
            elapsed: started.elapsed(),
        };
        debug!(
            "Pass ({strategy}): +{created} ~{updated} -{removed}{} -> {} groups, {} items in {:?}",
            if reordered { " reordered" } else { "" },
            report.groups,
            report.items,
            report.elapsed
        );
        report
    }
}

#[async_trait]
impl PassRunner for Engine {
    async fn run_pass(&mut self) {
        self.pass().await;
    }
}

/// Switches the active grouping strategy and asks for a pass.
#[derive(Clone)]
pub struct StrategySelector {
    tx: Arc<watch::Sender<StrategyKind>>,
    scheduler: Option<SchedulerHandle>,
}

impl StrategySelector {
    pub fn new(initial: StrategyKind) -> (Self, watch::Receiver<StrategyKind>) {
        let (tx, rx) = watch::channel(initial);
        (
            Self {
                tx: Arc::new(tx),
                scheduler: None,
            },
            rx,
        )
    }

    pub fn attach(&mut self, scheduler: SchedulerHandle) {
        self.scheduler = Some(scheduler);
    }

    pub fn current(&self) -> StrategyKind {
        *self.tx.borrow()
    }

    /// Returns `false` when `kind` is already active.
    pub fn select(&self, kind: StrategyKind) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == kind {
                false
            } else {
                *current = kind;
                true
            }
        });
        if changed {
            info!("Grouping strategy switched to {kind}");
            if let Some(scheduler) = &self.scheduler {
                scheduler.notify();
            }
        }
        changed
    }
}
