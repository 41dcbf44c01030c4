use crate::model::{
    Annotations, Container, ContainerId, Item, ItemId, RemoteSession, RemoteTab, Snapshot,
};

/// Local tab with the given id, window, title and URL.
pub fn tab(id: ItemId, window: ContainerId, title: &str, url: &str) -> Item {
    Item {
        id: Some(id),
        container_id: Some(window),
        title: title.to_string(),
        url: url.to_string(),
        ..Item::default()
    }
}

/// Plain local window.
pub fn window(id: ContainerId) -> Container {
    Container {
        id,
        ..Container::default()
    }
}

/// Remote window session holding one tab per URL.
pub fn remote_window(device: &str, urls: &[&str]) -> RemoteSession {
    RemoteSession {
        device_name: device.to_string(),
        window: Some(urls.iter().copied().map(remote).collect()),
        tab: None,
    }
}

/// Remote single-tab session.
pub fn remote_tab(device: &str, url: &str) -> RemoteSession {
    RemoteSession {
        device_name: device.to_string(),
        window: None,
        tab: Some(remote(url)),
    }
}

/// Snapshot of local tabs and windows only.
pub fn snapshot(items: Vec<Item>, windows: &[ContainerId]) -> Snapshot {
    Snapshot::new(
        items,
        windows.iter().copied().map(window).collect(),
        Vec::new(),
        Annotations::new(),
    )
}

fn remote(url: &str) -> RemoteTab {
    RemoteTab {
        title: String::new(),
        url: url.to_string(),
        favicon: None,
    }
}
