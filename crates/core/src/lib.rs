pub mod card;
pub mod grouping;
pub mod identity;
pub mod model;
pub mod note;
pub mod reconcile;
pub mod shortcut;
pub mod stats;
pub mod status;

pub use card::{Card, CardItem, build_cards};
pub use grouping::{Group, GroupKind, StrategyKind, group};
pub use identity::{GroupKey, ItemKey, key_of};
pub use model::*;
pub use reconcile::{Reconciliation, RenderedState, ViewOp, reconcile};
pub use stats::DashboardStats;
pub use status::{Badges, OpenerIndex, Status, StatusVariant, classify};

#[cfg(any(test, feature = "testing"))]
pub mod testing;
