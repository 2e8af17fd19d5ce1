use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },
}

/// Tunables shared by every context on a page family.
///
/// Every field has a default; the build integration may pass a partial
/// JSON object to override individual values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewConfig {
    /// Name of the origin-scoped broadcast channel.
    pub channel_name: String,
    /// Query parameter that marks a context as a slave.
    pub marker_param: String,
    pub scroll_debounce_ms: u32,
    /// Remote scroll deltas at or below this are ignored.
    pub scroll_threshold_px: f64,
    pub resize_debounce_ms: u32,
    /// Horizontal space kept for the controller pane when fitting the grid.
    pub master_pane_reserve_px: f64,
    pub master_scale: f64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            channel_name: "responsive-review-sync".to_owned(),
            marker_param: "is-responsive-view".to_owned(),
            scroll_debounce_ms: 50,
            scroll_threshold_px: 2.0,
            resize_debounce_ms: 200,
            master_pane_reserve_px: 600.0,
            master_scale: 0.25,
        }
    }
}

impl ReviewConfig {
    /// Parse and validate. An empty or blank input yields the defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_name.trim().is_empty() {
            return Err(ConfigError::Empty("channelName"));
        }
        if self.marker_param.trim().is_empty() {
            return Err(ConfigError::Empty("markerParam"));
        }
        if self.master_scale <= 0.0 || !self.master_scale.is_finite() {
            return Err(ConfigError::NotPositive {
                name: "masterScale",
                value: self.master_scale,
            });
        }
        if self.scroll_threshold_px < 0.0 || !self.scroll_threshold_px.is_finite() {
            return Err(ConfigError::NotPositive {
                name: "scrollThresholdPx",
                value: self.scroll_threshold_px,
            });
        }
        Ok(())
    }
}
