//! The arguments `init_responsive_ui` receives from the build integration.

use std::collections::BTreeMap;

use anyhow::Context as _;
use responsive_review_core::{
    DeviceDescriptor, GroupOffsetTable, ReviewConfig, default_devices, normalize_devices,
};
use responsive_review_protocol::{ChromeOffsets, RawDevice};
use tracing::warn;

const TARGET: &str = "responsive_review::init";

#[derive(Debug)]
pub struct Input {
    pub devices: Vec<DeviceDescriptor>,
    pub offsets: GroupOffsetTable,
    pub config: ReviewConfig,
}

impl Input {
    pub fn parse(devices: &str, offsets: &str, config: Option<&str>) -> anyhow::Result<Self> {
        let config = ReviewConfig::from_json(config.unwrap_or_default()).context("invalid config")?;
        Ok(Self {
            devices: parse_devices(devices)?,
            offsets: parse_offsets(offsets)?,
            config,
        })
    }
}

/// Blank input selects the built-in list. Entries that fail validation are
/// logged and skipped.
pub fn parse_devices(text: &str) -> anyhow::Result<Vec<DeviceDescriptor>> {
    if text.trim().is_empty() {
        return Ok(default_devices());
    }
    let raw: Vec<RawDevice> = serde_json::from_str(text).context("invalid devices JSON")?;
    let (devices, errors) = normalize_devices(raw);
    for e in errors {
        warn!(target: TARGET, "skipping device: {e}");
    }
    Ok(devices)
}

pub fn parse_offsets(text: &str) -> anyhow::Result<GroupOffsetTable> {
    if text.trim().is_empty() {
        return Ok(GroupOffsetTable::defaults());
    }
    let overrides: BTreeMap<String, ChromeOffsets> =
        serde_json::from_str(text).context("invalid offsets JSON")?;
    Ok(GroupOffsetTable::with_defaults(overrides))
}
