use serde::{Deserialize, Serialize};

/// Chrome metrics in logical pixels. Any key may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChromeOffsets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolbar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taskbar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_nav: Option<f64>,
}

impl ChromeOffsets {
    pub fn new(toolbar: f64, taskbar: f64, side_nav: f64) -> Self {
        Self {
            toolbar: Some(toolbar),
            taskbar: Some(taskbar),
            side_nav: Some(side_nav),
        }
    }

    pub fn get(&self, key: OffsetKey) -> Option<f64> {
        match key {
            OffsetKey::Toolbar => self.toolbar,
            OffsetKey::Taskbar => self.taskbar,
            OffsetKey::SideNav => self.side_nav,
        }
    }

    /// Per-key merge; keys set in `overrides` win.
    pub fn merged(self, overrides: ChromeOffsets) -> Self {
        Self {
            toolbar: overrides.toolbar.or(self.toolbar),
            taskbar: overrides.taskbar.or(self.taskbar),
            side_nav: overrides.side_nav.or(self.side_nav),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OffsetKey {
    Toolbar,
    Taskbar,
    SideNav,
}

/// Group membership as written by users: a single name or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupList {
    One(String),
    Many(Vec<String>),
}

impl GroupList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(name) => vec![name],
            Self::Many(names) => names,
        }
    }
}

/// A device entry as handed over by the build integration, before
/// normalization into a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDevice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub label: String,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<GroupList>,
    /// Singular alias accepted for `groups`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offsets: Option<ChromeOffsets>,
}
