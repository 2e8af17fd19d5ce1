pub mod body;
pub mod commands;
pub mod device;
pub mod fetch;
pub mod messages;
pub mod types;

pub use body::Body;
pub use commands::{
    CardSlot, CardSpec, ChromeMetrics, ChromeVisibility, ControlAction, ControlBar, ControlButton,
    Feature, ShellCommand,
};
pub use device::{ChromeOffsets, GroupList, OffsetKey, RawDevice};
pub use fetch::{FetchOptions, FetchRequest, FetchResponse, Headers, ResponseType};
pub use messages::SyncMessage;
pub use types::{Orientation, ScrollPosition};
