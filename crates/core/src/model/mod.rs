pub mod device;
pub mod view_state;

pub use device::{DeviceDescriptor, DeviceError, FALLBACK_GROUP, default_devices, normalize_devices};
pub use view_state::{OrientationState, ViewState};
