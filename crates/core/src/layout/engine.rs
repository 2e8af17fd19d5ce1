use responsive_review_protocol::{
    CardSlot, CardSpec, ChromeMetrics, ControlAction, ControlBar, Feature, ShellCommand,
};
use thiserror::Error;
use tracing::{debug, warn};

use super::controls::{control_bar, toggle_label};
use crate::config::ReviewConfig;
use crate::location;
use crate::model::{DeviceDescriptor, OrientationState, ViewState};
use crate::offsets::GroupOffsetTable;

const TARGET: &str = "responsive_review::layout";

pub const MASTER_CARD_ID: &str = "master-controller";
const MASTER_LABEL: &str = "Master Controller";
const MASTER_WIDTH: f64 = 1920.0;
const MASTER_HEIGHT: f64 = 1080.0;
const MASTER_CHROME: ChromeMetrics = ChromeMetrics {
    toolbar_height: 85.0,
    taskbar_height: 48.0,
    side_nav_width: 80.0,
};

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("no device with id `{0}`")]
    UnknownDevice(String),
}

/// The host window as seen by one layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    /// `window.innerWidth`.
    pub width: f64,
    /// The master's current location; shells load it with the marker added.
    pub app_url: String,
}

/// Width left for the grid once the controller pane is reserved. Never
/// negative.
pub fn available_width(viewport_width: f64, reserve: f64) -> f64 {
    (viewport_width - reserve).max(0.0)
}

/// Fit `width` into `available` when auto-scale is on; never upscale.
pub fn compute_scale(available: f64, width: f64, auto_scale: bool) -> f64 {
    if !auto_scale || width <= available {
        1.0
    } else {
        available / width
    }
}

/// Owns the overlay's view state and turns every user action into the
/// list of [`ShellCommand`]s that brings the DOM up to date.
///
/// The engine remembers which cards it has created so that later passes
/// update cards in place instead of reloading their frames.
pub struct LayoutEngine {
    devices: Vec<DeviceDescriptor>,
    offsets: GroupOffsetTable,
    view: ViewState,
    orientation: OrientationState,
    marker: String,
    master_scale: f64,
    pane_reserve: f64,
    master_rendered: bool,
    /// Grid card ids in DOM order.
    rendered: Vec<String>,
}

impl LayoutEngine {
    pub fn new(devices: Vec<DeviceDescriptor>, offsets: GroupOffsetTable, config: &ReviewConfig) -> Self {
        let view = ViewState::for_devices(&devices);
        Self {
            devices,
            offsets,
            view,
            orientation: OrientationState::default(),
            marker: config.marker_param.clone(),
            master_scale: config.master_scale,
            pane_reserve: config.master_pane_reserve_px,
            master_rendered: false,
            rendered: Vec::new(),
        }
    }

    pub fn devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn orientation(&self) -> &OrientationState {
        &self.orientation
    }

    /// Ids of the grid cards currently on screen, in order.
    pub fn rendered(&self) -> &[String] {
        &self.rendered
    }

    pub fn controls(&self) -> ControlBar {
        control_bar(&self.devices, &self.view)
    }

    /// Open or close the overlay. Opening also rebuilds the filter bar
    /// and lays out every shell.
    pub fn toggle_overlay(&mut self, viewport: &Viewport) -> Vec<ShellCommand> {
        self.view.overlay_open = !self.view.overlay_open;
        let open = self.view.overlay_open;
        let mut commands = vec![ShellCommand::SetOverlay {
            open,
            button_label: toggle_label(open).to_owned(),
        }];
        if open {
            commands.push(ShellCommand::SetControls(self.controls()));
            commands.extend(self.render(viewport));
        }
        commands
    }

    /// Chrome toggles only change visibility; auto-scale needs a full pass.
    pub fn toggle_feature(&mut self, feature: Feature, viewport: &Viewport) -> Vec<ShellCommand> {
        let enabled = self.view.toggle_feature(feature);
        debug!(target: TARGET, ?feature, enabled, "feature toggled");
        let mut commands = vec![ShellCommand::SetControls(self.controls())];
        if feature == Feature::AutoScale {
            commands.extend(self.render(viewport));
        } else {
            commands.push(ShellCommand::SetChromeVisibility(self.view.chrome_visibility()));
        }
        commands
    }

    pub fn toggle_group(&mut self, group: &str, viewport: &Viewport) -> Vec<ShellCommand> {
        let active = self.view.toggle_group(group);
        debug!(target: TARGET, group, active, "group toggled");
        let mut commands = vec![ShellCommand::SetControls(self.controls())];
        commands.extend(self.render(viewport));
        commands
    }

    /// Swap a device between portrait and landscape and lay out again.
    pub fn rotate(&mut self, id: &str, viewport: &Viewport) -> Result<Vec<ShellCommand>, LayoutError> {
        if !self.devices.iter().any(|d| d.id == id) {
            return Err(LayoutError::UnknownDevice(id.to_owned()));
        }
        let orientation = self.orientation.rotate(id);
        debug!(target: TARGET, id, ?orientation, "rotated");
        Ok(self.render(viewport))
    }

    /// Dispatch a filter-bar click.
    pub fn apply(&mut self, action: &ControlAction, viewport: &Viewport) -> Vec<ShellCommand> {
        match action {
            ControlAction::ToggleGroup(group) => self.toggle_group(group, viewport),
            ControlAction::ToggleFeature(feature) => self.toggle_feature(*feature, viewport),
        }
    }

    /// Debounced window resize. Only relayouts while auto-fit matters.
    pub fn on_resize(&mut self, viewport: &Viewport) -> Vec<ShellCommand> {
        if self.view.overlay_open && self.view.auto_scale {
            self.render(viewport)
        } else {
            Vec::new()
        }
    }

    /// Full layout pass.
    ///
    /// Emits, in order: the controller card, removals for cards whose
    /// device is no longer active, a create or update per active device,
    /// and finally the chrome visibility.
    pub fn render(&mut self, viewport: &Viewport) -> Vec<ShellCommand> {
        let frame_src = match location::with_marker(&viewport.app_url, &self.marker) {
            Ok(src) => src,
            Err(e) => {
                warn!(target: TARGET, "{e}; loading shells without the marker");
                viewport.app_url.clone()
            }
        };
        let url_bar_text = location::host_with_port(&viewport.app_url).unwrap_or_default();

        let mut commands = Vec::with_capacity(self.devices.len() + 3);

        let master = CardSpec {
            id: MASTER_CARD_ID.to_owned(),
            label: MASTER_LABEL.to_owned(),
            width: MASTER_WIDTH,
            height: MASTER_HEIGHT,
            scale: self.master_scale,
            chrome: MASTER_CHROME,
            frame_src: frame_src.clone(),
            url_bar_text: url_bar_text.clone(),
            rotatable: false,
            highlighted: true,
        };
        commands.push(if self.master_rendered {
            ShellCommand::UpdateCard {
                slot: CardSlot::Master,
                card: master,
            }
        } else {
            ShellCommand::CreateCard {
                slot: CardSlot::Master,
                card: master,
            }
        });
        self.master_rendered = true;

        let available = available_width(viewport.width, self.pane_reserve);
        let active: Vec<CardSpec> = self
            .devices
            .iter()
            .filter(|d| d.in_any_group(&self.view.active_groups))
            .map(|device| {
                let (width, height) = self.orientation.get(&device.id).apply(device.width, device.height);
                CardSpec {
                    id: device.id.clone(),
                    label: device.label.clone(),
                    width,
                    height,
                    scale: compute_scale(available, width, self.view.auto_scale),
                    chrome: self.offsets.metrics(device),
                    frame_src: frame_src.clone(),
                    url_bar_text: url_bar_text.clone(),
                    rotatable: true,
                    highlighted: false,
                }
            })
            .collect();

        self.rendered.retain(|id| {
            let keep = active.iter().any(|card| &card.id == id);
            if !keep {
                commands.push(ShellCommand::RemoveCard { id: id.clone() });
            }
            keep
        });

        for card in active {
            if self.rendered.contains(&card.id) {
                commands.push(ShellCommand::UpdateCard {
                    slot: CardSlot::Grid,
                    card,
                });
            } else {
                self.rendered.push(card.id.clone());
                commands.push(ShellCommand::CreateCard {
                    slot: CardSlot::Grid,
                    card,
                });
            }
        }

        commands.push(ShellCommand::SetChromeVisibility(self.view.chrome_visibility()));
        commands
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use responsive_review_protocol::ChromeVisibility;

    use super::*;

    fn device(id: &str, width: f64, height: f64, groups: &[&str]) -> DeviceDescriptor {
        DeviceDescriptor::new(
            Some(id.into()),
            id.to_uppercase(),
            width,
            height,
            groups.iter().map(|g| (*g).to_owned()).collect(),
        )
        .unwrap()
    }

    fn engine() -> LayoutEngine {
        LayoutEngine::new(
            vec![
                device("phone", 375.0, 667.0, &["Mobile"]),
                device("tablet", 820.0, 1180.0, &["Tablet"]),
                device("desk", 1920.0, 1080.0, &["Desktop"]),
            ],
            GroupOffsetTable::defaults(),
            &ReviewConfig::default(),
        )
    }

    fn viewport(width: f64) -> Viewport {
        Viewport {
            width,
            app_url: "http://localhost:5173/products?sort=price".into(),
        }
    }

    fn grid_cards(commands: &[ShellCommand]) -> Vec<(&'static str, &CardSpec)> {
        commands
            .iter()
            .filter_map(|c| match c {
                ShellCommand::CreateCard {
                    slot: CardSlot::Grid,
                    card,
                } => Some(("create", card)),
                ShellCommand::UpdateCard {
                    slot: CardSlot::Grid,
                    card,
                } => Some(("update", card)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn scale_fits_only_when_needed() {
        assert_eq!(compute_scale(800.0, 1920.0, true), 800.0 / 1920.0);
        assert!((compute_scale(800.0, 1920.0, true) - 0.416_666).abs() < 1e-5);
        assert_eq!(compute_scale(800.0, 1920.0, false), 1.0);
        assert_eq!(compute_scale(800.0, 375.0, true), 1.0);
        assert_eq!(compute_scale(0.0, 375.0, true), 0.0);
    }

    #[test]
    fn narrow_windows_scale_to_the_exact_remaining_width() {
        let available = available_width(700.0, 600.0);
        assert_eq!(available, 100.0);
        assert_eq!(compute_scale(available, 3840.0, true), 100.0 / 3840.0);
    }

    #[test]
    fn available_width_is_floored() {
        assert_eq!(available_width(1400.0, 600.0), 800.0);
        assert_eq!(available_width(500.0, 600.0), 0.0);
    }

    #[test]
    fn first_pass_creates_everything() {
        let mut engine = engine();
        let commands = engine.render(&viewport(1400.0));

        match &commands[0] {
            ShellCommand::CreateCard {
                slot: CardSlot::Master,
                card,
            } => {
                assert_eq!(card.id, MASTER_CARD_ID);
                assert_eq!(card.scale, 0.25);
                assert_eq!(card.chrome, MASTER_CHROME);
                assert!(card.highlighted);
                assert!(!card.rotatable);
            }
            other => panic!("unexpected {other:?}"),
        }

        let cards = grid_cards(&commands);
        assert_eq!(cards.len(), 3);
        assert!(cards.iter().all(|(kind, _)| *kind == "create"));
        let desk = cards[2].1;
        assert_eq!(desk.scale, 800.0 / 1920.0);
        assert_eq!(desk.chrome.toolbar_height, 85.0);
        assert_eq!(
            desk.frame_src,
            "http://localhost:5173/products?sort=price&is-responsive-view=true"
        );
        assert_eq!(desk.url_bar_text, "localhost:5173");
        assert_eq!(cards[0].1.chrome.toolbar_height, 60.0);

        assert_eq!(
            commands.last(),
            Some(&ShellCommand::SetChromeVisibility(ChromeVisibility {
                toolbar: true,
                taskbar: false,
                side_left: false,
                side_right: false,
            }))
        );
    }

    #[test]
    fn second_pass_updates_in_place() {
        let mut engine = engine();
        engine.render(&viewport(1400.0));
        let commands = engine.render(&viewport(1400.0));
        assert!(matches!(
            commands[0],
            ShellCommand::UpdateCard {
                slot: CardSlot::Master,
                ..
            }
        ));
        assert!(grid_cards(&commands).iter().all(|(kind, _)| *kind == "update"));
    }

    #[test]
    fn deactivated_group_removes_its_cards() {
        let mut engine = engine();
        engine.render(&viewport(1400.0));
        let commands = engine.toggle_group("Tablet", &viewport(1400.0));

        assert!(matches!(commands[0], ShellCommand::SetControls(_)));
        assert!(commands.contains(&ShellCommand::RemoveCard { id: "tablet".into() }));
        assert_eq!(engine.rendered(), ["phone", "desk"]);

        let commands = engine.toggle_group("Tablet", &viewport(1400.0));
        let created: Vec<_> = grid_cards(&commands)
            .into_iter()
            .filter(|(kind, _)| *kind == "create")
            .map(|(_, card)| card.id.as_str())
            .collect();
        assert_eq!(created, ["tablet"]);
        assert_eq!(engine.rendered(), ["phone", "desk", "tablet"]);
    }

    #[test]
    fn rotation_swaps_dimensions() {
        let mut engine = engine();
        engine.render(&viewport(1400.0));
        let commands = engine.rotate("phone", &viewport(1400.0)).unwrap();
        let phone = grid_cards(&commands)
            .into_iter()
            .find(|(_, card)| card.id == "phone")
            .map(|(_, card)| card.clone())
            .unwrap();
        assert_eq!((phone.width, phone.height), (667.0, 375.0));
        assert_eq!(phone.dimensions_caption(), "667x375");

        assert!(matches!(
            engine.rotate("nope", &viewport(1400.0)),
            Err(LayoutError::UnknownDevice(_))
        ));
    }

    #[test]
    fn chrome_toggle_only_touches_visibility() {
        let mut engine = engine();
        let commands = engine.toggle_feature(Feature::Taskbar, &viewport(1400.0));
        assert_eq!(commands.len(), 2);
        assert!(matches!(commands[0], ShellCommand::SetControls(_)));
        assert!(matches!(
            commands[1],
            ShellCommand::SetChromeVisibility(ChromeVisibility { taskbar: true, .. })
        ));
    }

    #[test]
    fn auto_scale_toggle_relayouts() {
        let mut engine = engine();
        let commands = engine.toggle_feature(Feature::AutoScale, &viewport(1400.0));
        let desk = grid_cards(&commands)
            .into_iter()
            .find(|(_, card)| card.id == "desk")
            .map(|(_, card)| card.scale);
        assert_eq!(desk, Some(1.0));
    }

    #[test]
    fn overlay_toggle_and_resize() {
        let mut engine = engine();
        assert!(engine.on_resize(&viewport(1000.0)).is_empty());

        let opened = engine.toggle_overlay(&viewport(1400.0));
        assert_eq!(
            opened[0],
            ShellCommand::SetOverlay {
                open: true,
                button_label: "✕ Close Review".into()
            }
        );
        assert!(matches!(opened[1], ShellCommand::SetControls(_)));
        assert!(!engine.on_resize(&viewport(1000.0)).is_empty());

        engine.toggle_feature(Feature::AutoScale, &viewport(1000.0));
        assert!(engine.on_resize(&viewport(900.0)).is_empty());

        let closed = engine.toggle_overlay(&viewport(1400.0));
        assert_eq!(closed.len(), 1);
    }

    #[test]
    fn unparsable_app_url_still_renders() {
        let mut engine = engine();
        let commands = engine.render(&Viewport {
            width: 1400.0,
            app_url: "not a url".into(),
        });
        let cards = grid_cards(&commands);
        assert_eq!(cards[0].1.frame_src, "not a url");
        assert_eq!(cards[0].1.url_bar_text, "");
    }
}
