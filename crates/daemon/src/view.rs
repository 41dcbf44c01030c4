//! Consumers of the reconciler's operation stream.

use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tabdeck_core::reconcile::apply;
use tabdeck_core::{Card, DashboardStats, ViewOp};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// A rendering target. Operations arrive once per pass, removals first.
pub trait ViewSink: Send + Sync {
    fn apply(&self, ops: &[ViewOp]);
    fn stats(&self, stats: &DashboardStats);
    fn notice(&self, notice: Notice);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct Recorded {
    cards: Vec<Card>,
    batches: Vec<Vec<ViewOp>>,
    stats: Option<DashboardStats>,
    notices: Vec<Notice>,
}

/// Keeps everything it receives. The card list is maintained by applying
/// the operations, exactly as a retained view would.
#[derive(Debug, Default)]
pub struct RecordingView {
    inner: Mutex<Recorded>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cards(&self) -> Vec<Card> {
        lock(&self.inner).cards.clone()
    }

    /// One entry per pass that produced operations.
    pub fn batches(&self) -> Vec<Vec<ViewOp>> {
        lock(&self.inner).batches.clone()
    }

    pub fn last_stats(&self) -> Option<DashboardStats> {
        lock(&self.inner).stats
    }

    pub fn notices(&self) -> Vec<Notice> {
        lock(&self.inner).notices.clone()
    }
}

impl ViewSink for RecordingView {
    fn apply(&self, ops: &[ViewOp]) {
        let mut inner = lock(&self.inner);
        apply(&mut inner.cards, ops);
        if !ops.is_empty() {
            inner.batches.push(ops.to_vec());
        }
    }

    fn stats(&self, stats: &DashboardStats) {
        lock(&self.inner).stats = Some(*stats);
    }

    fn notice(&self, notice: Notice) {
        lock(&self.inner).notices.push(notice);
    }
}

struct TextState {
    cards: Vec<Card>,
    stats: DashboardStats,
    notices: Vec<(Notice, Instant)>,
    out: Box<dyn Write + Send>,
}

/// Terminal listing of the current cards, redrawn after every pass.
pub struct TextView {
    state: Mutex<TextState>,
    notice_ttl: Duration,
}

impl TextView {
    pub fn new(out: Box<dyn Write + Send>, notice_ttl: Duration) -> Self {
        Self {
            state: Mutex::new(TextState {
                cards: Vec::new(),
                stats: DashboardStats::default(),
                notices: Vec::new(),
                out,
            }),
            notice_ttl,
        }
    }

    pub fn stdout(notice_ttl: Duration) -> Self {
        Self::new(Box::new(std::io::stdout()), notice_ttl)
    }

    fn redraw(&self, state: &mut TextState) {
        let now = Instant::now();
        state.notices.retain(|(_, expires)| *expires > now);
        let notices: Vec<&Notice> = state.notices.iter().map(|(notice, _)| notice).collect();
        let text = render_text(&state.cards, &state.stats, &notices);
        if let Err(e) = state.out.write_all(text.as_bytes()).and_then(|_| state.out.flush()) {
            warn!("Failed to write dashboard: {e}");
        }
    }
}

impl ViewSink for TextView {
    fn apply(&self, ops: &[ViewOp]) {
        let mut state = lock(&self.state);
        apply(&mut state.cards, ops);
    }

    // Stats arrive last in a pass, so this is where the listing is redrawn.
    fn stats(&self, stats: &DashboardStats) {
        let mut state = lock(&self.state);
        state.stats = *stats;
        self.redraw(&mut state);
    }

    fn notice(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!("{}", notice.message),
            NoticeLevel::Error => warn!("{}", notice.message),
        }
        let mut state = lock(&self.state);
        state.notices.push((notice, Instant::now() + self.notice_ttl));
        self.redraw(&mut state);
    }
}

/// Plain-text dashboard: header, one block per card, then active notices.
pub fn render_text(cards: &[Card], stats: &DashboardStats, notices: &[&Notice]) -> String {
    let mut out = String::new();
    out.push_str(&stats.summary());
    out.push('\n');

    if cards.is_empty() {
        out.push_str("\n  (nothing to show)\n");
    }

    for card in cards {
        let count = card.items.len();
        let noun = if count == 1 { "tab" } else { "tabs" };
        out.push_str(&format!("\n[{}] {}  {count} {noun}\n", card.key, card.title));
        for item in &card.items {
            let mut badges = String::new();
            if item.status.badges.pinned {
                badges.push_str(" pinned");
            }
            if item.status.badges.has_opener {
                badges.push_str(" child");
            }
            if item.status.badges.annotated {
                badges.push_str(" note");
            }
            out.push_str(&format!(
                "  {:<10} {} ({}){badges}\n",
                item.status.label(),
                item.title,
                item.key
            ));
            if let Some(note) = &item.note {
                out.push_str(&format!("             > {note}\n"));
            }
        }
    }

    for notice in notices {
        let tag = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Error => "error",
        };
        out.push_str(&format!("\n{tag}: {}\n", notice.message));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tabdeck_core::grouping::{StrategyKind, group};
    use tabdeck_core::{RenderedState, build_cards, reconcile, testing};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            lock(&self.0).extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn sample_cards() -> (Vec<Card>, DashboardStats) {
        let mut pinned = testing::tab(1, 10, "Inbox", "https://mail.test/");
        pinned.pinned = true;
        let mut noted = testing::tab(2, 10, "Docs", "https://docs.test/");
        noted.annotation = Some("finish review".to_string());
        noted.discarded = true;
        let snapshot = testing::snapshot(vec![pinned, noted], &[10]);
        let cards = build_cards(&group(&snapshot, StrategyKind::Window), &snapshot);
        (cards, DashboardStats::from_snapshot(&snapshot))
    }

    #[test]
    fn test_render_text_lists_cards_and_badges() {
        let (cards, stats) = sample_cards();
        let failure = Notice::error("Failed to move tab");
        let text = render_text(&cards, &stats, &[&failure]);

        assert!(text.starts_with("2 total tabs • 1 suspended • across 1 window\n"));
        assert!(text.contains("[window-10] Window 1  2 tabs"));
        assert!(text.contains("Active     Inbox (1) pinned"));
        assert!(text.contains("Suspended  Docs (2) note"));
        assert!(text.contains("> finish review"));
        assert!(text.contains("error: Failed to move tab"));
    }

    #[test]
    fn test_render_text_empty() {
        let text = render_text(&[], &DashboardStats::default(), &[]);
        assert!(text.contains("(nothing to show)"));
    }

    #[test]
    fn test_recording_view_tracks_applied_cards() {
        let (cards, stats) = sample_cards();
        let view = RecordingView::new();
        let result = reconcile(&RenderedState::default(), cards.clone());
        view.apply(&result.ops);
        view.apply(&[]);
        view.stats(&stats);

        assert_eq!(view.cards(), cards);
        assert_eq!(view.batches().len(), 1);
        assert_eq!(view.last_stats(), Some(stats));
    }

    #[test]
    fn test_text_view_redraws_on_stats() {
        let buf = SharedBuf::default();
        let view = TextView::new(Box::new(buf.clone()), Duration::from_secs(2));
        let (cards, stats) = sample_cards();
        let result = reconcile(&RenderedState::default(), cards);

        view.apply(&result.ops);
        assert!(lock(&buf.0).is_empty());
        view.stats(&stats);

        let written = String::from_utf8(lock(&buf.0).clone()).unwrap();
        assert!(written.contains("[window-10] Window 1  2 tabs"));
    }
}
