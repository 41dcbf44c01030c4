pub mod actions;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod file_source;
pub mod mover;
pub mod scheduler;
pub mod source;
pub mod view;
pub mod watcher;

pub use actions::ItemActions;
pub use engine::{Engine, PassReport, StrategySelector};
pub use error::{ActionError, ControlError, MoveError, SourceError};
pub use mover::MoveController;
pub use scheduler::{PassRunner, SchedulerHandle, SchedulerState, SchedulerTiming};
pub use source::{AnnotationStore, ChangeEvent, ItemControl, SnapshotSource, fetch_snapshot};
pub use view::{Notice, NoticeLevel, RecordingView, TextView, ViewSink};
