//! Keyed diff between what is displayed and what should be displayed.
//!
//! Groups are matched by [`GroupKey`]. A matched group whose card differs in
//! any way (title, item sequence, item status) is replaced wholesale; there
//! is no item-level diff inside a card. Every `RemoveGroup` precedes every
//! `CreateGroup`/`UpdateGroup`, and a trailing `ReorderGroups` is emitted
//! only when the surviving groups changed their relative order.

use crate::card::{Card, CardItem};
use crate::identity::{GroupKey, ItemKey};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One step a view must take to converge on the new state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ViewOp {
    RemoveGroup { key: GroupKey },
    /// `index` is the card's position in the new ordering.
    CreateGroup { index: usize, card: Card },
    UpdateGroup { index: usize, card: Card },
    /// Full key order of the new state.
    ReorderGroups { order: Vec<GroupKey> },
}

impl ViewOp {
    pub fn group_key(&self) -> Option<&GroupKey> {
        match self {
            Self::RemoveGroup { key } => Some(key),
            Self::CreateGroup { card, .. } | Self::UpdateGroup { card, .. } => Some(&card.key),
            Self::ReorderGroups { .. } => None,
        }
    }

    pub fn is_removal(&self) -> bool {
        matches!(self, Self::RemoveGroup { .. })
    }
}

/// What is currently displayed. Only ever replaced as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedState {
    order: Vec<GroupKey>,
    cards: HashMap<GroupKey, Card>,
    item_groups: HashMap<ItemKey, GroupKey>,
}

impl RenderedState {
    /// Build from cards in display order. A card whose key was already seen
    /// is skipped.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        let mut order = Vec::with_capacity(cards.len());
        let mut by_key = HashMap::with_capacity(cards.len());
        let mut item_groups = HashMap::new();

        for card in cards {
            if by_key.contains_key(&card.key) {
                continue;
            }
            for item in &card.items {
                item_groups.insert(item.key.clone(), card.key.clone());
            }
            order.push(card.key.clone());
            by_key.insert(card.key.clone(), card);
        }

        Self {
            order,
            cards: by_key,
            item_groups,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn order(&self) -> &[GroupKey] {
        &self.order
    }

    pub fn card(&self, key: &GroupKey) -> Option<&Card> {
        self.cards.get(key)
    }

    /// Cards in display order.
    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.order.iter().filter_map(|key| self.cards.get(key))
    }

    /// The group an item was last rendered in.
    pub fn group_of(&self, item: &ItemKey) -> Option<&GroupKey> {
        self.item_groups.get(item)
    }

    /// Last rendered value of an item.
    pub fn item(&self, key: &ItemKey) -> Option<&CardItem> {
        let group = self.item_groups.get(key)?;
        self.cards
            .get(group)?
            .items
            .iter()
            .find(|item| &item.key == key)
    }

    pub fn item_count(&self) -> usize {
        self.item_groups.len()
    }
}

/// Result of one diff: the operations and the state that replaces the old one.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub ops: Vec<ViewOp>,
    pub state: RenderedState,
    /// Later cards that repeated an earlier card's key and were left out.
    pub duplicates: Vec<GroupKey>,
}

impl Reconciliation {
    pub fn is_noop(&self) -> bool {
        self.ops.is_empty()
    }

    /// `(created, updated, removed)` operation counts.
    pub fn counts(&self) -> (usize, usize, usize) {
        self.ops.iter().fold((0, 0, 0), |(c, u, r), op| match op {
            ViewOp::CreateGroup { .. } => (c + 1, u, r),
            ViewOp::UpdateGroup { .. } => (c, u + 1, r),
            ViewOp::RemoveGroup { .. } => (c, u, r + 1),
            ViewOp::ReorderGroups { .. } => (c, u, r),
        })
    }
}

/// Diff `next` against `previous`.
///
/// Keys in `next` must be unique; a card repeating an earlier key is dropped
/// and reported in [`Reconciliation::duplicates`].
pub fn reconcile(previous: &RenderedState, next: Vec<Card>) -> Reconciliation {
    let (next, duplicates) = dedup_keys(next);
    let next_keys: HashSet<&GroupKey> = next.iter().map(|card| &card.key).collect();

    let mut ops: Vec<ViewOp> = previous
        .order
        .iter()
        .filter(|key| !next_keys.contains(key))
        .map(|key| ViewOp::RemoveGroup { key: key.clone() })
        .collect();

    for (index, card) in next.iter().enumerate() {
        match previous.cards.get(&card.key) {
            None => ops.push(ViewOp::CreateGroup {
                index,
                card: card.clone(),
            }),
            Some(rendered) if rendered != card => ops.push(ViewOp::UpdateGroup {
                index,
                card: card.clone(),
            }),
            Some(_) => {}
        }
    }

    let survivors_before = previous
        .order
        .iter()
        .filter(|key| next_keys.contains(key));
    let survivors_after = next
        .iter()
        .map(|card| &card.key)
        .filter(|key| previous.cards.contains_key(*key));
    if !survivors_before.eq(survivors_after) {
        ops.push(ViewOp::ReorderGroups {
            order: next.iter().map(|card| card.key.clone()).collect(),
        });
    }

    Reconciliation {
        ops,
        state: RenderedState::from_cards(next),
        duplicates,
    }
}

fn dedup_keys(cards: Vec<Card>) -> (Vec<Card>, Vec<GroupKey>) {
    let mut seen = HashSet::with_capacity(cards.len());
    let mut duplicates = Vec::new();
    let mut unique = Vec::with_capacity(cards.len());
    for card in cards {
        if seen.insert(card.key.clone()) {
            unique.push(card);
        } else {
            duplicates.push(card.key);
        }
    }
    (unique, duplicates)
}

/// Apply operations to an ordered card list, the way a retained view would.
pub fn apply(cards: &mut Vec<Card>, ops: &[ViewOp]) {
    for op in ops {
        match op {
            ViewOp::RemoveGroup { key } => cards.retain(|card| &card.key != key),
            ViewOp::CreateGroup { index, card } => {
                let at = (*index).min(cards.len());
                cards.insert(at, card.clone());
            }
            ViewOp::UpdateGroup { index, card } => {
                match cards.iter_mut().find(|existing| existing.key == card.key) {
                    Some(existing) => *existing = card.clone(),
                    None => {
                        let at = (*index).min(cards.len());
                        cards.insert(at, card.clone());
                    }
                }
            }
            ViewOp::ReorderGroups { order } => {
                let rank: HashMap<&GroupKey, usize> =
                    order.iter().enumerate().map(|(i, key)| (key, i)).collect();
                cards.sort_by_key(|card| rank.get(&card.key).copied().unwrap_or(usize::MAX));
            }
        }
    }
}
