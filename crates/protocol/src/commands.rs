use serde::{Deserialize, Serialize};

/// A single, stateless instruction for the shell renderer.
///
/// The layout engine emits a `Vec<ShellCommand>` for each pass. Renderers
/// apply the list in order; each command carries all the data it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShellCommand {
    /// Show or hide the overlay and relabel the floating toggle.
    SetOverlay { open: bool, button_label: String },

    /// Replace the filter bar contents.
    SetControls(ControlBar),

    /// Build a new card and append it to its slot.
    CreateCard { slot: CardSlot, card: CardSpec },

    /// Resize and relabel an existing card. The embedded frame is left
    /// alone so the slave keeps its state.
    UpdateCard { slot: CardSlot, card: CardSpec },

    /// Drop a grid card and its embedded frame.
    RemoveCard { id: String },

    /// Show or hide chrome elements on every shell.
    SetChromeVisibility(ChromeVisibility),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardSlot {
    /// The fixed controller pane on the left.
    Master,
    /// The device grid.
    Grid,
}

/// Geometry and content of one shell card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSpec {
    pub id: String,
    pub label: String,
    /// Oriented width in logical pixels.
    pub width: f64,
    /// Oriented height in logical pixels.
    pub height: f64,
    pub scale: f64,
    pub chrome: ChromeMetrics,
    /// Embedded frame URL, marker included.
    pub frame_src: String,
    /// Text shown in the simulated address bar.
    pub url_bar_text: String,
    pub rotatable: bool,
    pub highlighted: bool,
}

impl CardSpec {
    /// `"375x667"` style caption, using the oriented size.
    pub fn dimensions_caption(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn scaled_width(&self) -> f64 {
        self.width * self.scale
    }

    pub fn scaled_height(&self) -> f64 {
        self.height * self.scale
    }
}

/// Resolved chrome sizes for one shell, in logical pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChromeMetrics {
    pub toolbar_height: f64,
    pub taskbar_height: f64,
    pub side_nav_width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChromeVisibility {
    pub toolbar: bool,
    pub taskbar: bool,
    pub side_left: bool,
    pub side_right: bool,
}

/// Feature toggles shown next to the group filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    Toolbar,
    Taskbar,
    SideLeft,
    SideRight,
    AutoScale,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::Toolbar,
        Feature::Taskbar,
        Feature::SideLeft,
        Feature::SideRight,
        Feature::AutoScale,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Toolbar => "🌐 Toolbar",
            Self::Taskbar => "⌨️ Taskbar",
            Self::SideLeft => "⬅️ Side L",
            Self::SideRight => "➡️ Side R",
            Self::AutoScale => "🔍 Auto Scale",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlAction {
    ToggleGroup(String),
    ToggleFeature(Feature),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlButton {
    pub label: String,
    pub active: bool,
    pub action: ControlAction,
}

/// Filter bar model: group filters followed by feature toggles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlBar {
    pub groups: Vec<ControlButton>,
    pub features: Vec<ControlButton>,
}
