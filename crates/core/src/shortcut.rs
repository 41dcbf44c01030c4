use serde::{Deserialize, Serialize};

/// Shortcut that toggles the annotation editor on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortcut {
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
    pub code: String,
    #[serde(default)]
    pub key: String,
}

impl Default for Shortcut {
    fn default() -> Self {
        Self {
            ctrl: true,
            shift: true,
            alt: false,
            meta: false,
            code: "KeyX".to_string(),
            key: "X".to_string(),
        }
    }
}

impl Shortcut {
    /// Human readable form, e.g. `Ctrl + Shift + X`.
    pub fn display(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl".to_string());
        }
        if self.meta {
            parts.push("Cmd".to_string());
        }
        if self.alt {
            parts.push("Alt".to_string());
        }
        if self.shift {
            parts.push("Shift".to_string());
        }
        let key_name = match self.code.strip_prefix("Key") {
            Some(letter) => letter.to_string(),
            None => self.key.to_uppercase(),
        };
        parts.push(key_name);
        parts.join(" + ")
    }
}
