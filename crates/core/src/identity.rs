//! Stable keys for items and groups.
//!
//! Keys must come out identical for the same logical entity across
//! consecutive snapshots, otherwise the reconciler sees a remove + create
//! where an update was meant.

use crate::model::{ContainerId, Item, ItemId, Origin};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an item within and across snapshots.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(String);

impl ItemKey {
    /// Key of a local item: its native id.
    pub fn local(id: ItemId) -> Self {
        Self(id.to_string())
    }

    /// Key of a remote entry. Remote entries have no id, so the key is built
    /// from the device, the session position, the entry position and its URL.
    pub fn remote(device: &str, session: usize, ordinal: usize, url: &str) -> Self {
        Self(format!(
            "remote:{}:{session}:{ordinal}:{url}",
            device_component(device)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The native id, if this is a local key.
    pub fn local_id(&self) -> Option<ItemId> {
        self.0.parse().ok()
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Takes a rendered key back verbatim, e.g. one typed at a prompt.
impl From<&str> for ItemKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identity of a group (one rendered card).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
    pub fn window(id: ContainerId) -> Self {
        Self(format!("window-{id}"))
    }

    /// Sentinel window group for local items that name no container.
    pub fn window_other() -> Self {
        Self("window-other".to_string())
    }

    pub fn domain(label: &str) -> Self {
        Self(format!("domain-{label}"))
    }

    pub fn device(device: &str, session: usize) -> Self {
        Self(format!("device-{}-{session}", device_component(device)))
    }

    pub fn note(item: &ItemKey) -> Self {
        Self(format!("note-{item}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Derive the key of an item. Pure and deterministic.
pub fn key_of(item: &Item) -> ItemKey {
    match &item.origin {
        Origin::Remote {
            device,
            session,
            ordinal,
        } => ItemKey::remote(device, *session, *ordinal, &item.url),
        // Snapshot assembly drops local items without an id; the URL fallback
        // only matters for hand-built items.
        Origin::Local => match item.id {
            Some(id) => ItemKey::local(id),
            None => ItemKey(format!("local:{}", item.url)),
        },
    }
}

/// Lowercase ASCII alphanumerics, every other run collapsed to a single `-`.
pub fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() {
        out.push_str("device");
    }
    out
}

/// Device part of remote and device-group keys.
///
/// A name that is already its own slug is used as is. Any other name gets a
/// `~` and a hash of the raw name appended, so names that slug alike
/// (`iPad`/`IPAD`, or two Cyrillic names) still get distinct keys. A slug
/// never contains `~`, so the two forms cannot meet.
pub fn device_component(device: &str) -> String {
    let slugged = slug(device);
    if slugged == device {
        slugged
    } else {
        format!("{slugged}~{:08x}", fnv1a(device.as_bytes()))
    }
}

/// 32-bit FNV-1a. Keys are compared across passes, so the hash has to be
/// stable between runs, which `DefaultHasher` does not promise.
fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in bytes {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}
