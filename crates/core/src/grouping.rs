//! Grouping strategies: snapshot -> ordered groups.
//!
//! Window and domain grouping partition every eligible item into exactly
//! one group; note grouping only considers annotated items. No strategy
//! ever emits an empty group.

use crate::identity::{GroupKey, key_of};
use crate::model::{ContainerId, ContainerKind, Item, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Label of the sentinel group for items that cannot be placed anywhere else.
pub const OTHER_LABEL: &str = "Other";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Window,
    Domain,
    Notes,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [Self::Window, Self::Domain, Self::Notes];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Window => "window",
            Self::Domain => "domain",
            Self::Notes => "notes",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "window" | "windows" => Ok(Self::Window),
            "domain" | "domains" => Ok(Self::Domain),
            "notes" | "note" => Ok(Self::Notes),
            other => Err(format!(
                "unknown strategy '{other}', expected one of: window, domain, notes"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Window,
    Domain,
    NoteCollection,
    RemoteSession,
}

/// One card's worth of items under the active strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub key: GroupKey,
    pub title: String,
    pub kind: GroupKind,
    /// Only local window groups accept moved items.
    pub movable: bool,
    pub container_id: Option<ContainerId>,
    pub items: Vec<Item>,
}

/// Group a snapshot under the given strategy.
pub fn group(snapshot: &Snapshot, strategy: StrategyKind) -> Vec<Group> {
    match strategy {
        StrategyKind::Window => group_by_window(snapshot),
        StrategyKind::Domain => group_by_domain(snapshot),
        StrategyKind::Notes => group_by_note(snapshot),
    }
}

fn group_by_window(snapshot: &Snapshot) -> Vec<Group> {
    let known: HashSet<ContainerId> = snapshot.containers().iter().map(|c| c.id).collect();
    let mut by_container: HashMap<ContainerId, Vec<Item>> = HashMap::new();
    let mut unknown_order = Vec::new();
    let mut orphans = Vec::new();

    for item in snapshot.items() {
        match item.container_id {
            Some(id) => {
                if !known.contains(&id) && !by_container.contains_key(&id) {
                    unknown_order.push(id);
                }
                by_container.entry(id).or_default().push(item.clone());
            }
            None => orphans.push(item.clone()),
        }
    }

    let mut groups = Vec::new();
    for (index, container) in snapshot.containers().iter().enumerate() {
        let Some(items) = by_container.remove(&container.id) else {
            continue;
        };
        let mut title = format!("Window {}", index + 1);
        if container.private {
            title.push_str(" (Private)");
        }
        if container.popup {
            title.push_str(" (Popup)");
        }
        groups.push(Group {
            key: GroupKey::window(container.id),
            title,
            kind: GroupKind::Window,
            movable: container.kind == ContainerKind::Local,
            container_id: Some(container.id),
            items,
        });
    }

    // Items that point at a window missing from the listing still need a card.
    let numbered_from = snapshot.containers().len();
    for (offset, id) in unknown_order.into_iter().enumerate() {
        if let Some(items) = by_container.remove(&id) {
            groups.push(Group {
                key: GroupKey::window(id),
                title: format!("Window {}", numbered_from + offset + 1),
                kind: GroupKind::Window,
                movable: true,
                container_id: Some(id),
                items,
            });
        }
    }

    if !orphans.is_empty() {
        groups.push(Group {
            key: GroupKey::window_other(),
            title: OTHER_LABEL.to_string(),
            kind: GroupKind::Window,
            movable: false,
            container_id: None,
            items: orphans,
        });
    }

    for (session_index, session) in snapshot.remote_sessions_indexed() {
        let tabs = session.tabs();
        if tabs.is_empty() {
            continue;
        }
        let suffix = if session.is_window() {
            "(Window)"
        } else {
            "(Single Tab)"
        };
        groups.push(Group {
            key: GroupKey::device(&session.device_name, session_index),
            title: format!("{} {suffix}", session.device_name),
            kind: GroupKind::RemoteSession,
            movable: false,
            container_id: None,
            items: tabs
                .iter()
                .enumerate()
                .map(|(ordinal, tab)| snapshot.remote_item(session, session_index, ordinal, tab))
                .collect(),
        });
    }

    groups
}

fn group_by_domain(snapshot: &Snapshot) -> Vec<Group> {
    let mut by_label: BTreeMap<String, Vec<Item>> = BTreeMap::new();
    for item in snapshot.all_items() {
        by_label.entry(domain_label(&item.url)).or_default().push(item);
    }

    by_label
        .into_iter()
        .map(|(label, items)| Group {
            key: GroupKey::domain(&label),
            title: label,
            kind: GroupKind::Domain,
            movable: false,
            container_id: None,
            items,
        })
        .collect()
}

fn group_by_note(snapshot: &Snapshot) -> Vec<Group> {
    snapshot
        .all_items()
        .into_iter()
        .filter(|item| item.note().is_some())
        .map(|item| Group {
            key: GroupKey::note(&key_of(&item)),
            title: item.display_title().to_string(),
            kind: GroupKind::NoteCollection,
            movable: false,
            container_id: None,
            items: vec![item],
        })
        .collect()
}

/// Normalized domain label of a URL.
///
/// `www.` is stripped, Google Docs paths are split by product, and URLs
/// without a usable host fall back to their scheme.
pub fn domain_label(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => match url.host_str().filter(|host| !host.is_empty()) {
            Some(host) => {
                let host = host.strip_prefix("www.").unwrap_or(host);
                if host == "docs.google.com" {
                    google_docs_label(url.path()).to_string()
                } else {
                    host.to_string()
                }
            }
            None => scheme_label(url.scheme()),
        },
        Err(_) => match raw.split_once(':') {
            Some((scheme, _)) if is_scheme(scheme) => scheme_label(&scheme.to_ascii_lowercase()),
            _ => OTHER_LABEL.to_string(),
        },
    }
}

fn google_docs_label(path: &str) -> &'static str {
    let product = path.trim_start_matches('/').split('/').next().unwrap_or("");
    match product {
        "document" => "Google Docs",
        "spreadsheets" => "Google Sheets",
        "presentation" => "Google Slides",
        "forms" => "Google Forms",
        _ => "Google Drive",
    }
}

/// Web schemes (`https`, `http`, `ftp`, ...) collapse to `Other`; browser
/// internal schemes such as `chrome` or `about` keep their own bucket.
fn scheme_label(scheme: &str) -> String {
    if scheme.ends_with('s') || scheme.ends_with('p') {
        OTHER_LABEL.to_string()
    } else {
        scheme.to_string()
    }
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
