//! The master's review overlay: which shells exist, how big they are and
//! what the filter bar shows.

pub mod controls;
pub mod engine;

pub use controls::{control_bar, toggle_label};
pub use engine::{LayoutEngine, LayoutError, MASTER_CARD_ID, Viewport, available_width, compute_scale};
