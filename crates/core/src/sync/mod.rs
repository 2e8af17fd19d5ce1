//! Cross-context synchronization: the shared channel and everything that
//! rides on it.

pub mod bus;
pub mod channel;
pub mod fetch;
pub mod nav;
pub mod scroll;
pub mod session;

pub use bus::LocalBus;
pub use channel::{ChannelError, Subscription, SyncChannel, SyncFlag, Transport};
pub use fetch::{
    FetchExecutor, FetchProxy, FetchRelay, ProxiedResponse, ProxyError, RequestParts, Spawner,
    normalize_request,
};
pub use nav::{HistoryMode, NavState, NavigationError, NavigationReplicator, Navigator};
pub use scroll::{ScrollReplicator, Scroller, exceeds_threshold};
pub use session::{MasterSession, SlaveSession};
