use std::collections::BTreeMap;

use responsive_review_protocol::{ChromeMetrics, ChromeOffsets, OffsetKey};

use crate::model::{DeviceDescriptor, FALLBACK_GROUP};

/// Group name → chrome offsets. Built once, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupOffsetTable(BTreeMap<String, ChromeOffsets>);

impl GroupOffsetTable {
    /// A table with exactly the given entries and no built-in defaults.
    pub fn from_entries(entries: BTreeMap<String, ChromeOffsets>) -> Self {
        Self(entries)
    }

    /// Built-in defaults merged per key with caller overrides.
    ///
    /// Caller keys win; groups only the caller knows are added as-is.
    pub fn with_defaults(overrides: BTreeMap<String, ChromeOffsets>) -> Self {
        let mut table = Self::defaults().0;
        for (group, offsets) in overrides {
            let merged = match table.get(&group) {
                Some(base) => base.merged(offsets),
                None => offsets,
            };
            table.insert(group, merged);
        }
        Self(table)
    }

    pub fn defaults() -> Self {
        let entries = [
            ("Mobile", ChromeOffsets::new(60.0, 0.0, 0.0)),
            ("Tablet", ChromeOffsets::new(70.0, 0.0, 0.0)),
            ("Laptop", ChromeOffsets::new(85.0, 48.0, 80.0)),
            ("Desktop", ChromeOffsets::new(85.0, 48.0, 80.0)),
            (FALLBACK_GROUP, ChromeOffsets::new(85.0, 48.0, 80.0)),
        ];
        Self(
            entries
                .into_iter()
                .map(|(name, offsets)| (name.to_owned(), offsets))
                .collect(),
        )
    }

    pub fn get(&self, group: &str) -> Option<&ChromeOffsets> {
        self.0.get(group)
    }

    /// Chrome metric for a device.
    ///
    /// Lookup order: the device's own override, then the first of its
    /// groups that has a table entry (the fallback group when none does),
    /// then zero. The fallback entry is used when the chosen group itself
    /// has no entry.
    pub fn resolve(&self, device: &DeviceDescriptor, key: OffsetKey) -> f64 {
        if let Some(value) = device.offsets.get(key) {
            return value;
        }

        let group = device
            .groups
            .iter()
            .map(String::as_str)
            .find(|g| self.0.contains_key(*g))
            .unwrap_or(FALLBACK_GROUP);

        self.get(group)
            .or_else(|| self.get(FALLBACK_GROUP))
            .and_then(|set| set.get(key))
            .unwrap_or(0.0)
    }

    /// All three metrics at once, as the renderer wants them.
    pub fn metrics(&self, device: &DeviceDescriptor) -> ChromeMetrics {
        ChromeMetrics {
            toolbar_height: self.resolve(device, OffsetKey::Toolbar),
            taskbar_height: self.resolve(device, OffsetKey::Taskbar),
            side_nav_width: self.resolve(device, OffsetKey::SideNav),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(groups: &[&str], offsets: ChromeOffsets) -> DeviceDescriptor {
        DeviceDescriptor::new(
            Some("dev".into()),
            "Dev",
            375.0,
            667.0,
            groups.iter().map(|g| (*g).to_owned()).collect(),
        )
        .unwrap_or_else(|e| unreachable!("{e}"))
        .with_offsets(offsets)
    }

    fn table(entries: &[(&str, ChromeOffsets)]) -> GroupOffsetTable {
        GroupOffsetTable::from_entries(
            entries
                .iter()
                .map(|(name, offsets)| ((*name).to_owned(), *offsets))
                .collect(),
        )
    }

    #[test]
    fn device_override_wins() {
        let t = table(&[("Mobile", ChromeOffsets::new(60.0, 0.0, 0.0))]);
        let d = device(
            &["Mobile"],
            ChromeOffsets {
                toolbar: Some(12.0),
                ..ChromeOffsets::default()
            },
        );
        assert_eq!(t.resolve(&d, OffsetKey::Toolbar), 12.0);
        // Unset override keys still come from the group.
        assert_eq!(t.resolve(&d, OffsetKey::Taskbar), 0.0);
    }

    #[test]
    fn first_matching_group_is_used() {
        let t = table(&[
            ("Apple", ChromeOffsets::new(44.0, 0.0, 0.0)),
            ("Mobile", ChromeOffsets::new(60.0, 0.0, 0.0)),
        ]);
        let d = device(&["Unknown", "Mobile", "Apple"], ChromeOffsets::default());
        assert_eq!(t.resolve(&d, OffsetKey::Toolbar), 60.0);
    }

    #[test]
    fn fallback_group_when_nothing_matches() {
        let t = table(&[(FALLBACK_GROUP, ChromeOffsets::new(85.0, 48.0, 80.0))]);
        let d = device(&["Watch"], ChromeOffsets::default());
        assert_eq!(t.resolve(&d, OffsetKey::SideNav), 80.0);
    }

    #[test]
    fn zero_when_no_tier_defines_the_key() {
        let t = table(&[(
            "Mobile",
            ChromeOffsets {
                toolbar: Some(60.0),
                ..ChromeOffsets::default()
            },
        )]);
        let d = device(&["Mobile"], ChromeOffsets::default());
        assert_eq!(t.resolve(&d, OffsetKey::Taskbar), 0.0);
        let empty = GroupOffsetTable::default();
        assert_eq!(empty.resolve(&d, OffsetKey::Toolbar), 0.0);
    }

    #[test]
    fn iphone_se_toolbar_comes_from_mobile() {
        let t = table(&[("Mobile", ChromeOffsets::new(60.0, 0.0, 0.0))]);
        let d = device(&["Mobile", "Apple"], ChromeOffsets::default());
        assert_eq!(t.resolve(&d, OffsetKey::Toolbar), 60.0);
    }

    #[test]
    fn overrides_merge_into_defaults() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "Desktop".to_owned(),
            ChromeOffsets {
                taskbar: Some(40.0),
                ..ChromeOffsets::default()
            },
        );
        overrides.insert("Watch".to_owned(), ChromeOffsets::new(20.0, 0.0, 0.0));
        let t = GroupOffsetTable::with_defaults(overrides);
        assert_eq!(t.get("Desktop"), Some(&ChromeOffsets::new(85.0, 40.0, 80.0)));
        assert_eq!(t.get("Watch"), Some(&ChromeOffsets::new(20.0, 0.0, 0.0)));
        assert_eq!(t.get("Mobile"), Some(&ChromeOffsets::new(60.0, 0.0, 0.0)));
    }

    #[test]
    fn metrics_bundle_all_keys() {
        let t = GroupOffsetTable::defaults();
        let d = device(&["Laptop"], ChromeOffsets::default());
        let m = t.metrics(&d);
        assert_eq!(
            (m.toolbar_height, m.taskbar_height, m.side_nav_width),
            (85.0, 48.0, 80.0)
        );
    }
}
