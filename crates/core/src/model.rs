use crate::identity::device_component;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Native identifier of a local item (a browser tab id).
pub type ItemId = u64;

/// Native identifier of a local container (a browser window id).
pub type ContainerId = u64;

/// Where an item lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Origin {
    #[default]
    Local,
    /// An entry synced from another device. Remote entries carry no stable id,
    /// so their position inside the session is part of their identity.
    Remote {
        device: String,
        session: usize,
        ordinal: usize,
    },
}

/// One manageable unit: a local tab or a remote session entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<ContainerId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub discarded: bool,
    #[serde(default)]
    pub loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opener_id: Option<ItemId>,
    #[serde(default)]
    pub origin: Origin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

impl Item {
    pub fn is_remote(&self) -> bool {
        matches!(self.origin, Origin::Remote { .. })
    }

    /// The annotation text, if present and not blank.
    pub fn note(&self) -> Option<&str> {
        self.annotation
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    /// Title for display; remote entries often have none, so fall back to the URL.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    #[default]
    Local,
    Remote,
}

/// A browser window. Remote pseudo-containers are described by [`RemoteSession`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    #[serde(default)]
    pub kind: ContainerKind,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub popup: bool,
}

/// A tab entry inside a remote session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTab {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

/// A session synced from another device: either a whole window or a lone tab.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSession {
    pub device_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<Vec<RemoteTab>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab: Option<RemoteTab>,
}

impl RemoteSession {
    pub fn is_window(&self) -> bool {
        self.window.is_some()
    }

    pub fn tabs(&self) -> &[RemoteTab] {
        match (&self.window, &self.tab) {
            (Some(tabs), _) => tabs,
            (None, Some(tab)) => std::slice::from_ref(tab),
            (None, None) => &[],
        }
    }
}

/// Page URL -> annotation text.
pub type Annotations = BTreeMap<String, String>;

/// One immutable fetch of all source data, valid for a single pass.
///
/// Annotations are joined onto items by URL at construction time. Remote
/// sessions stay as fetched and are flattened on demand.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    items: Vec<Item>,
    containers: Vec<Container>,
    remote_sessions: Vec<RemoteSession>,
    annotations: Annotations,
}

impl Snapshot {
    pub fn new(
        items: Vec<Item>,
        containers: Vec<Container>,
        remote_sessions: Vec<RemoteSession>,
        annotations: Annotations,
    ) -> Self {
        let mut seen = HashSet::new();
        let items = items
            .into_iter()
            .filter(|item| match item.id {
                Some(id) => seen.insert(id),
                None => item.is_remote(),
            })
            .map(|mut item| {
                if item.note().is_none() {
                    item.annotation = annotations.get(&item.url).cloned();
                }
                item
            })
            .collect();

        Self {
            items,
            containers,
            remote_sessions,
            annotations,
        }
    }

    /// Local items, in source order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn remote_sessions(&self) -> &[RemoteSession] {
        &self.remote_sessions
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Flatten remote sessions into items, numbering sessions per device.
    ///
    /// Empty sessions still consume their index so the keys of later sessions
    /// from the same device do not shift.
    pub fn remote_items(&self) -> Vec<Item> {
        self.remote_sessions_indexed()
            .flat_map(|(session_index, session)| {
                session
                    .tabs()
                    .iter()
                    .enumerate()
                    .map(move |(ordinal, tab)| self.remote_item(session, session_index, ordinal, tab))
            })
            .collect()
    }

    /// Local items followed by flattened remote items.
    pub fn all_items(&self) -> Vec<Item> {
        let mut all = self.items.clone();
        all.extend(self.remote_items());
        all
    }

    /// Remote sessions paired with their per-device session index.
    ///
    /// Devices are told apart by the same component their keys use.
    pub fn remote_sessions_indexed(&self) -> impl Iterator<Item = (usize, &RemoteSession)> {
        let mut seen: BTreeMap<String, usize> = BTreeMap::new();
        self.remote_sessions.iter().map(move |session| {
            let counter = seen
                .entry(device_component(&session.device_name))
                .or_insert(0);
            let index = *counter;
            *counter += 1;
            (index, session)
        })
    }

    pub(crate) fn remote_item(
        &self,
        session: &RemoteSession,
        session_index: usize,
        ordinal: usize,
        tab: &RemoteTab,
    ) -> Item {
        Item {
            id: None,
            container_id: None,
            title: tab.title.clone(),
            url: tab.url.clone(),
            favicon: tab.favicon.clone(),
            origin: Origin::Remote {
                device: session.device_name.clone(),
                session: session_index,
                ordinal,
            },
            annotation: self.annotations.get(&tab.url).cloned(),
            ..Item::default()
        }
    }
}
