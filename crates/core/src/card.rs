use crate::grouping::{Group, GroupKind};
use crate::identity::{GroupKey, ItemKey, key_of};
use crate::model::{ContainerId, Item, Snapshot};
use crate::status::{OpenerIndex, Status, classify};
use serde::{Deserialize, Serialize};

/// An item as it is shown on a card: identity, display fields and status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardItem {
    pub key: ItemKey,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl CardItem {
    pub fn from_item(item: &Item, openers: &OpenerIndex) -> Self {
        Self {
            key: key_of(item),
            title: item.display_title().to_string(),
            url: item.url.clone(),
            favicon: item.favicon.clone(),
            status: classify(item, openers),
            note: item.note().map(str::to_string),
        }
    }
}

/// A group resolved for display. This is the unit the reconciler compares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub key: GroupKey,
    pub title: String,
    pub kind: GroupKind,
    pub movable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<ContainerId>,
    pub items: Vec<CardItem>,
}

impl Card {
    pub fn from_group(group: &Group, openers: &OpenerIndex) -> Self {
        Self {
            key: group.key.clone(),
            title: group.title.clone(),
            kind: group.kind,
            movable: group.movable,
            container_id: group.container_id,
            items: group
                .items
                .iter()
                .map(|item| CardItem::from_item(item, openers))
                .collect(),
        }
    }

    pub fn item_keys(&self) -> impl Iterator<Item = &ItemKey> {
        self.items.iter().map(|item| &item.key)
    }

    pub fn contains(&self, key: &ItemKey) -> bool {
        self.items.iter().any(|item| &item.key == key)
    }
}

/// Resolve identities and statuses for every group of one snapshot.
pub fn build_cards(groups: &[Group], snapshot: &Snapshot) -> Vec<Card> {
    let openers = OpenerIndex::from_snapshot(snapshot);
    groups
        .iter()
        .map(|group| Card::from_group(group, &openers))
        .collect()
}
