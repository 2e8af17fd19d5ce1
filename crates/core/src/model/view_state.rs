use std::collections::{BTreeSet, HashMap};

use responsive_review_protocol::{ChromeVisibility, Feature, Orientation};

use super::device::DeviceDescriptor;

/// The master's view toggles. Owned by the layout engine; never replicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub overlay_open: bool,
    pub show_toolbar: bool,
    pub show_taskbar: bool,
    pub show_side_left: bool,
    pub show_side_right: bool,
    pub auto_scale: bool,
    pub active_groups: BTreeSet<String>,
}

impl ViewState {
    /// Overlay closed, toolbar only, auto-scale on, every known group active.
    pub fn for_devices(devices: &[DeviceDescriptor]) -> Self {
        Self {
            overlay_open: false,
            show_toolbar: true,
            show_taskbar: false,
            show_side_left: false,
            show_side_right: false,
            auto_scale: true,
            active_groups: known_groups(devices),
        }
    }

    pub fn feature(&self, feature: Feature) -> bool {
        match feature {
            Feature::Toolbar => self.show_toolbar,
            Feature::Taskbar => self.show_taskbar,
            Feature::SideLeft => self.show_side_left,
            Feature::SideRight => self.show_side_right,
            Feature::AutoScale => self.auto_scale,
        }
    }

    /// Flip a feature and return its new value.
    pub fn toggle_feature(&mut self, feature: Feature) -> bool {
        let slot = match feature {
            Feature::Toolbar => &mut self.show_toolbar,
            Feature::Taskbar => &mut self.show_taskbar,
            Feature::SideLeft => &mut self.show_side_left,
            Feature::SideRight => &mut self.show_side_right,
            Feature::AutoScale => &mut self.auto_scale,
        };
        *slot = !*slot;
        *slot
    }

    /// Flip a group filter and return whether it is now active.
    pub fn toggle_group(&mut self, group: &str) -> bool {
        if self.active_groups.remove(group) {
            false
        } else {
            self.active_groups.insert(group.to_owned());
            true
        }
    }

    pub fn chrome_visibility(&self) -> ChromeVisibility {
        ChromeVisibility {
            toolbar: self.show_toolbar,
            taskbar: self.show_taskbar,
            side_left: self.show_side_left,
            side_right: self.show_side_right,
        }
    }
}

/// Every group named by any device, sorted.
pub fn known_groups(devices: &[DeviceDescriptor]) -> BTreeSet<String> {
    devices
        .iter()
        .flat_map(|d| d.groups.iter().cloned())
        .collect()
}

/// Per-device rotation. Unknown ids read as portrait.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrientationState(HashMap<String, Orientation>);

impl OrientationState {
    pub fn get(&self, id: &str) -> Orientation {
        self.0.get(id).copied().unwrap_or_default()
    }

    /// Rotate a device and return its new orientation.
    pub fn rotate(&mut self, id: &str) -> Orientation {
        let next = self.get(id).toggled();
        self.0.insert(id.to_owned(), next);
        next
    }
}
