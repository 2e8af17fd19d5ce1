use std::collections::{BTreeSet, HashSet};

use responsive_review_protocol::{ChromeOffsets, GroupList, RawDevice};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::MASTER_CARD_ID;

/// Group assigned to devices that name none.
pub const FALLBACK_GROUP: &str = "Other";

#[derive(Debug, Error, PartialEq)]
pub enum DeviceError {
    #[error("device {label:?}: {dimension} must be a positive number, got {value}")]
    InvalidDimension {
        label: String,
        dimension: &'static str,
        value: f64,
    },
    #[error("device label must not be empty")]
    EmptyLabel,
}

/// A normalized, immutable device description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: String,
    pub label: String,
    /// Portrait width in logical pixels.
    pub width: f64,
    /// Portrait height in logical pixels.
    pub height: f64,
    /// Never empty.
    pub groups: Vec<String>,
    /// Per-device chrome overrides; unset keys fall back to the group table.
    #[serde(default)]
    pub offsets: ChromeOffsets,
}

impl DeviceDescriptor {
    pub fn new(
        id: Option<String>,
        label: impl Into<String>,
        width: f64,
        height: f64,
        groups: Vec<String>,
    ) -> Result<Self, DeviceError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(DeviceError::EmptyLabel);
        }
        check_dimension(&label, "width", width)?;
        check_dimension(&label, "height", height)?;

        let id = id
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| derive_id(&label, width, height));

        Ok(Self {
            id,
            label,
            width,
            height,
            groups: clean_groups(groups),
            offsets: ChromeOffsets::default(),
        })
    }

    pub fn with_offsets(mut self, offsets: ChromeOffsets) -> Self {
        self.offsets = offsets;
        self
    }

    /// Normalize one raw entry. `groups` wins over the singular `group` alias.
    pub fn from_raw(raw: RawDevice) -> Result<Self, DeviceError> {
        let groups = raw
            .groups
            .or(raw.group)
            .map(GroupList::into_vec)
            .unwrap_or_default();
        let device = Self::new(raw.id, raw.label, raw.width, raw.height, groups)?;
        Ok(device.with_offsets(raw.offsets.unwrap_or_default()))
    }

    pub fn in_any_group(&self, active: &BTreeSet<String>) -> bool {
        self.groups.iter().any(|g| active.contains(g))
    }
}

fn check_dimension(label: &str, dimension: &'static str, value: f64) -> Result<(), DeviceError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DeviceError::InvalidDimension {
            label: label.to_owned(),
            dimension,
            value,
        })
    }
}

/// Trim, drop blanks, dedupe in order; fall back to [`FALLBACK_GROUP`].
fn clean_groups(groups: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let cleaned: Vec<String> = groups
        .into_iter()
        .map(|g| g.trim().to_owned())
        .filter(|g| !g.is_empty() && seen.insert(g.clone()))
        .collect();
    if cleaned.is_empty() {
        vec![FALLBACK_GROUP.to_owned()]
    } else {
        cleaned
    }
}

/// Stable id from label and size, e.g. `custom-view-500x500`.
pub fn derive_id(label: &str, width: f64, height: f64) -> String {
    let mut slug = String::with_capacity(label.len());
    for ch in label.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    format!("{slug}-{width}x{height}")
}

/// Normalize a whole input list.
///
/// Invalid entries are returned separately so the caller can log them;
/// duplicate ids get `-2`, `-3`, … suffixes in input order. The controller
/// card's id is reserved and never handed to a device.
pub fn normalize_devices(raw: Vec<RawDevice>) -> (Vec<DeviceDescriptor>, Vec<DeviceError>) {
    let mut devices = Vec::with_capacity(raw.len());
    let mut errors = Vec::new();
    let mut taken: HashSet<String> = HashSet::from([MASTER_CARD_ID.to_owned()]);

    for entry in raw {
        match DeviceDescriptor::from_raw(entry) {
            Ok(mut device) => {
                if taken.contains(&device.id) {
                    let base = device.id.clone();
                    let mut n = 2;
                    while taken.contains(&format!("{base}-{n}")) {
                        n += 1;
                    }
                    device.id = format!("{base}-{n}");
                }
                taken.insert(device.id.clone());
                devices.push(device);
            }
            Err(e) => errors.push(e),
        }
    }

    (devices, errors)
}

/// Devices used when the integration passes none.
pub fn default_devices() -> Vec<DeviceDescriptor> {
    [
        ("Mobile (SE)", 375.0, 667.0, "Mobile"),
        ("Tablet", 768.0, 1024.0, "Tablet"),
        ("Laptop", 1280.0, 800.0, "Laptop"),
        ("Desktop", 1920.0, 1080.0, "Desktop"),
    ]
    .into_iter()
    .filter_map(|(label, width, height, group)| {
        DeviceDescriptor::new(None, label, width, height, vec![group.to_owned()]).ok()
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(label: &str, width: f64, height: f64) -> RawDevice {
        RawDevice {
            id: None,
            label: label.into(),
            width,
            height,
            groups: None,
            group: None,
            offsets: None,
        }
    }

    #[test]
    fn derives_id_from_label_and_size() {
        assert_eq!(derive_id("Custom View", 500.0, 500.0), "custom-view-500x500");
        assert_eq!(derive_id("iPad Pro 12.9\"", 1024.0, 1366.0), "ipad-pro-12-9-1024x1366");
    }

    #[test]
    fn missing_groups_fall_back_to_other() {
        let device = DeviceDescriptor::from_raw(raw("Custom View", 500.0, 500.0))
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(device.groups, vec![FALLBACK_GROUP.to_owned()]);
    }

    #[test]
    fn singular_group_alias_is_accepted() {
        let mut entry = raw("Ultra Wide", 3440.0, 1440.0);
        entry.group = Some(GroupList::One("Desktop".into()));
        let device = DeviceDescriptor::from_raw(entry).unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(device.groups, vec!["Desktop".to_owned()]);
    }

    #[test]
    fn blank_and_duplicate_groups_are_cleaned() {
        let device = DeviceDescriptor::new(
            Some("x".into()),
            "X",
            10.0,
            10.0,
            vec![" Mobile ".into(), "".into(), "Mobile".into(), "Apple".into()],
        )
        .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(device.groups, vec!["Mobile".to_owned(), "Apple".to_owned()]);
    }

    #[test]
    fn rejects_non_positive_dimensions() {
        let err = DeviceDescriptor::from_raw(raw("Broken", 0.0, 100.0));
        assert!(matches!(
            err,
            Err(DeviceError::InvalidDimension {
                dimension: "width",
                ..
            })
        ));
    }

    #[test]
    fn duplicate_ids_get_suffixes() {
        let (devices, errors) = normalize_devices(vec![
            raw("Phone", 375.0, 667.0),
            raw("Phone", 375.0, 667.0),
            raw("Bad", -1.0, 1.0),
            raw("Phone", 375.0, 667.0),
        ]);
        assert_eq!(errors.len(), 1);
        let ids: Vec<&str> = devices.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["phone-375x667", "phone-375x667-2", "phone-375x667-3"]);
    }

    #[test]
    fn controller_id_is_reserved() {
        let mut entry = raw("Controller", 800.0, 600.0);
        entry.id = Some(MASTER_CARD_ID.into());
        let (devices, errors) = normalize_devices(vec![entry, raw("Phone", 375.0, 667.0)]);
        assert!(errors.is_empty());
        let ids: Vec<&str> = devices.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["master-controller-2", "phone-375x667"]);
    }

    #[test]
    fn built_in_list_is_complete() {
        let devices = default_devices();
        let ids: Vec<_> = devices.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(
            ids,
            [
                "mobile-se-375x667",
                "tablet-768x1024",
                "laptop-1280x800",
                "desktop-1920x1080"
            ]
        );
        assert_eq!(devices[0].groups, ["Mobile"]);
    }
}
