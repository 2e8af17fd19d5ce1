use std::cell::Cell;
use std::rc::Rc;

use responsive_review_protocol::{ScrollPosition, SyncMessage};
use tracing::{debug, warn};

use super::channel::SyncChannel;
use crate::role::Role;

const TARGET: &str = "responsive_review::scroll";

pub trait Scroller {
    fn position(&self) -> ScrollPosition;
    fn scroll_to(&self, position: ScrollPosition);
}

/// True when either axis differs by more than `threshold`.
pub fn exceeds_threshold(current: ScrollPosition, target: ScrollPosition, threshold: f64) -> bool {
    (current.x - target.x).abs() > threshold || (current.y - target.y).abs() > threshold
}

/// Throttled scroll mirroring.
///
/// The host forwards every local scroll event to [`note_local_scroll`];
/// when it returns `true` the host arms a timer and calls [`flush`] on
/// expiry. Further events inside the window are absorbed.
///
/// [`note_local_scroll`]: ScrollReplicator::note_local_scroll
/// [`flush`]: ScrollReplicator::flush
pub struct ScrollReplicator<S> {
    role: Role,
    scroller: S,
    channel: Rc<SyncChannel>,
    threshold: f64,
    armed: Cell<bool>,
}

impl<S: Scroller> ScrollReplicator<S> {
    pub fn new(role: Role, scroller: S, channel: Rc<SyncChannel>, threshold: f64) -> Self {
        Self {
            role,
            scroller,
            channel,
            threshold,
            armed: Cell::new(false),
        }
    }

    pub fn scroller(&self) -> &S {
        &self.scroller
    }

    pub fn is_armed(&self) -> bool {
        self.armed.get()
    }

    /// Returns whether this event opened a new coalescing window.
    pub fn note_local_scroll(&self) -> bool {
        !self.armed.replace(true)
    }

    /// Close the window and publish the position as it is now.
    pub fn flush(&self) -> bool {
        self.armed.set(false);
        let ScrollPosition { x, y } = self.scroller.position();
        let message = match self.role {
            Role::Master => SyncMessage::ScrollUpdate { x, y },
            Role::Slave => SyncMessage::SlaveScroll { x, y },
        };
        match self.channel.publish(&message) {
            Ok(()) => true,
            Err(e) => {
                warn!(target: TARGET, "failed to publish scroll: {e}");
                false
            }
        }
    }

    /// Apply a peer's position. Returns whether the context scrolled.
    pub fn on_remote(&self, message: &SyncMessage) -> bool {
        let target = match (self.role, message) {
            (Role::Master, SyncMessage::SlaveScroll { x, y })
            | (Role::Slave, SyncMessage::ScrollUpdate { x, y }) => ScrollPosition::new(*x, *y),
            _ => return false,
        };
        if !exceeds_threshold(self.scroller.position(), target, self.threshold) {
            return false;
        }
        debug!(target: TARGET, x = target.x, y = target.y, "applying remote scroll");
        self.scroller.scroll_to(target);
        true
    }
}
