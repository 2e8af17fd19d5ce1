pub mod config;
pub mod layout;
pub mod location;
pub mod model;
pub mod offsets;
pub mod role;
pub mod sync;

pub use config::{ConfigError, ReviewConfig};
pub use layout::{LayoutEngine, LayoutError, Viewport};
pub use location::UrlError;
pub use model::{DeviceDescriptor, DeviceError, default_devices, normalize_devices};
pub use offsets::GroupOffsetTable;
pub use role::{Role, detect_role};
