use crate::identity::{ItemKey, key_of};
use crate::model::{Item, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Display state of an item. Exactly one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusVariant {
    Active,
    Loading,
    Suspended,
    Remote,
}

impl StatusVariant {
    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Loading => "Loading",
            Self::Suspended => "Suspended",
            Self::Remote => "Remote",
        }
    }
}

/// Structural badges, independent of the variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Badges {
    pub pinned: bool,
    pub annotated: bool,
    pub has_opener: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Status {
    pub variant: StatusVariant,
    pub badges: Badges,
}

impl Status {
    pub fn label(&self) -> &'static str {
        self.variant.label()
    }
}

/// Keys of the local items present in one snapshot, used to resolve openers.
#[derive(Debug, Clone, Default)]
pub struct OpenerIndex {
    keys: HashSet<ItemKey>,
}

impl OpenerIndex {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            keys: snapshot.items().iter().map(key_of).collect(),
        }
    }

    pub fn contains(&self, key: &ItemKey) -> bool {
        self.keys.contains(key)
    }
}

/// First match wins: remote origin, discarded, loading, otherwise active.
pub fn variant_of(item: &Item) -> StatusVariant {
    if item.is_remote() {
        StatusVariant::Remote
    } else if item.discarded {
        StatusVariant::Suspended
    } else if item.loading {
        StatusVariant::Loading
    } else {
        StatusVariant::Active
    }
}

/// Classify an item against the snapshot it came from. An opener that is not
/// in the snapshot simply yields no badge.
pub fn classify(item: &Item, openers: &OpenerIndex) -> Status {
    let has_opener = item
        .opener_id
        .map(ItemKey::local)
        .is_some_and(|key| openers.contains(&key));

    Status {
        variant: variant_of(item),
        badges: Badges {
            pinned: item.pinned,
            annotated: item.note().is_some(),
            has_opener,
        },
    }
}
