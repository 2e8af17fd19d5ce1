use responsive_review_protocol::{ControlAction, ControlBar, ControlButton, Feature};

use crate::model::DeviceDescriptor;
use crate::model::view_state::{ViewState, known_groups};

pub const OPEN_BUTTON_LABEL: &str = "📱 View Layouts";
pub const CLOSE_BUTTON_LABEL: &str = "✕ Close Review";

/// Label of the floating toggle for the given overlay state.
pub fn toggle_label(overlay_open: bool) -> &'static str {
    if overlay_open {
        CLOSE_BUTTON_LABEL
    } else {
        OPEN_BUTTON_LABEL
    }
}

/// Filter bar: one button per known group in name order, then the five
/// feature toggles.
pub fn control_bar(devices: &[DeviceDescriptor], view: &ViewState) -> ControlBar {
    let groups = known_groups(devices)
        .into_iter()
        .map(|group| ControlButton {
            active: view.active_groups.contains(&group),
            label: group.clone(),
            action: ControlAction::ToggleGroup(group),
        })
        .collect();

    let features = Feature::ALL
        .into_iter()
        .map(|feature| ControlButton {
            label: feature.label().to_owned(),
            active: view.feature(feature),
            action: ControlAction::ToggleFeature(feature),
        })
        .collect();

    ControlBar { groups, features }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, groups: &[&str]) -> DeviceDescriptor {
        DeviceDescriptor::new(
            Some(id.into()),
            id,
            390.0,
            844.0,
            groups.iter().map(|g| (*g).to_owned()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn groups_are_sorted_and_flagged() {
        let devices = [
            device("pixel", &["Mobile", "Android"]),
            device("ipad", &["Tablet", "Apple"]),
        ];
        let mut view = ViewState::for_devices(&devices);
        view.toggle_group("Apple");

        let bar = control_bar(&devices, &view);
        let labels: Vec<_> = bar.groups.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["Android", "Apple", "Mobile", "Tablet"]);
        assert!(!bar.groups[1].active);
        assert!(bar.groups[0].active);
        assert_eq!(
            bar.groups[1].action,
            ControlAction::ToggleGroup("Apple".into())
        );
    }

    #[test]
    fn features_follow_view_defaults() {
        let view = ViewState::for_devices(&[]);
        let bar = control_bar(&[], &view);
        let flags: Vec<_> = bar.features.iter().map(|b| (b.label.as_str(), b.active)).collect();
        assert_eq!(
            flags,
            [
                ("🌐 Toolbar", true),
                ("⌨️ Taskbar", false),
                ("⬅️ Side L", false),
                ("➡️ Side R", false),
                ("🔍 Auto Scale", true),
            ]
        );
    }

    #[test]
    fn toggle_button_label() {
        assert_eq!(toggle_label(false), "📱 View Layouts");
        assert_eq!(toggle_label(true), "✕ Close Review");
    }
}
