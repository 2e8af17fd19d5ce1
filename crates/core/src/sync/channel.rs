use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use responsive_review_protocol::SyncMessage;
use thiserror::Error;
use tracing::{debug, warn};

const TARGET: &str = "responsive_review::channel";

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("broadcast transport unavailable: {0}")]
    Unavailable(String),
    #[error("failed to post message: {0}")]
    Post(String),
    #[error("failed to encode {kind}: {source}")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("undecodable message: {0}")]
    Decode(#[source] serde_json::Error),
}

/// The raw origin-scoped pub/sub medium.
///
/// Implementations only send. Whoever owns the receiving side hands every
/// text posted by another context to [`SyncChannel::deliver`]; a context
/// never receives its own posts.
pub trait Transport {
    fn post(&self, text: &str) -> Result<(), ChannelError>;
}

pub fn encode(message: &SyncMessage) -> Result<String, ChannelError> {
    serde_json::to_string(message).map_err(|source| ChannelError::Encode {
        kind: message.kind(),
        source,
    })
}

pub fn decode(text: &str) -> Result<SyncMessage, ChannelError> {
    serde_json::from_str(text).map_err(ChannelError::Decode)
}

type Handler = Rc<dyn Fn(&SyncMessage)>;

/// Typed publish/subscribe on top of a [`Transport`].
///
/// One instance per browsing context; replicators and the fetch proxy
/// share it through `Rc`.
pub struct SyncChannel {
    name: String,
    transport: Box<dyn Transport>,
    handlers: RefCell<Vec<(u64, Handler)>>,
    next_id: Cell<u64>,
}

impl SyncChannel {
    pub fn new(name: impl Into<String>, transport: impl Transport + 'static) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            transport: Box::new(transport),
            handlers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fire-and-forget. No delivery or ordering guarantee across contexts.
    pub fn publish(&self, message: &SyncMessage) -> Result<(), ChannelError> {
        let text = encode(message)?;
        debug!(target: TARGET, kind = message.kind(), "publish");
        self.transport.post(&text)
    }

    /// Register a handler for every message from other contexts.
    ///
    /// The handler stays registered until the returned [`Subscription`]
    /// is dropped or unsubscribed.
    pub fn subscribe(self: &Rc<Self>, handler: impl Fn(&SyncMessage) + 'static) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.handlers.borrow_mut().push((id, Rc::new(handler)));
        Subscription {
            channel: Rc::downgrade(self),
            id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    /// Decode a received text and dispatch it. Malformed input is logged
    /// and dropped.
    pub fn deliver(&self, text: &str) {
        match decode(text) {
            Ok(message) => self.dispatch(&message),
            Err(e) => warn!(target: TARGET, channel = %self.name, "dropping message: {e}"),
        }
    }

    /// Hand a decoded message to every current subscriber.
    ///
    /// Handlers may publish, subscribe or unsubscribe while running; the
    /// set of handlers called is fixed when dispatch starts.
    pub fn dispatch(&self, message: &SyncMessage) {
        let snapshot: Vec<Handler> = self
            .handlers
            .borrow()
            .iter()
            .map(|(_, handler)| Rc::clone(handler))
            .collect();
        for handler in snapshot {
            handler(message);
        }
    }

    fn remove(&self, id: u64) {
        self.handlers.borrow_mut().retain(|(hid, _)| *hid != id);
    }
}

/// Handle for a registered handler; unsubscribes on drop.
pub struct Subscription {
    channel: Weak<SyncChannel>,
    id: u64,
}

impl Subscription {
    /// Idempotent.
    pub fn unsubscribe(&self) {
        if let Some(channel) = self.channel.upgrade() {
            channel.remove(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Per-context re-entrancy flag.
///
/// Set while a remotely-originated change is being applied locally, so
/// the listeners that normally report local changes stay quiet.
#[derive(Debug, Default)]
pub struct SyncFlag(Cell<bool>);

impl SyncFlag {
    pub fn is_syncing(&self) -> bool {
        self.0.get()
    }

    /// Raise the flag until the guard drops.
    pub fn enter(&self) -> SyncGuard<'_> {
        let previous = self.0.replace(true);
        SyncGuard {
            flag: self,
            previous,
        }
    }
}

pub struct SyncGuard<'a> {
    flag: &'a SyncFlag,
    previous: bool,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.flag.0.set(self.previous);
    }
}
