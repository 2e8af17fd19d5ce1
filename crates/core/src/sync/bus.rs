use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use super::channel::{ChannelError, SyncChannel, Transport};

struct Endpoint {
    id: usize,
    inbox: VecDeque<String>,
    channel: Weak<SyncChannel>,
}

#[derive(Default)]
struct BusState {
    endpoints: Vec<Endpoint>,
}

/// In-memory broadcast medium connecting isolated contexts.
///
/// Each [`LocalBus::connect`] call yields a channel for one context. A post
/// is queued in every *other* endpoint's inbox and delivered by
/// [`LocalBus::pump`], so contexts never call into each other directly.
#[derive(Clone, Default)]
pub struct LocalBus {
    state: Rc<RefCell<BusState>>,
}

struct BusTransport {
    id: usize,
    state: Weak<RefCell<BusState>>,
}

impl Transport for BusTransport {
    fn post(&self, text: &str) -> Result<(), ChannelError> {
        let state = self
            .state
            .upgrade()
            .ok_or_else(|| ChannelError::Unavailable("bus dropped".into()))?;
        for endpoint in state.borrow_mut().endpoints.iter_mut() {
            if endpoint.id != self.id {
                endpoint.inbox.push_back(text.to_owned());
            }
        }
        Ok(())
    }
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new context and return its channel.
    pub fn connect(&self, name: &str) -> Rc<SyncChannel> {
        let id = self.state.borrow().endpoints.len();
        let channel = SyncChannel::new(
            name,
            BusTransport {
                id,
                state: Rc::downgrade(&self.state),
            },
        );
        self.state.borrow_mut().endpoints.push(Endpoint {
            id,
            inbox: VecDeque::new(),
            channel: Rc::downgrade(&channel),
        });
        channel
    }

    /// Messages waiting across all inboxes.
    pub fn queued(&self) -> usize {
        self.state
            .borrow()
            .endpoints
            .iter()
            .map(|e| e.inbox.len())
            .sum()
    }

    /// Deliver queued messages, including ones posted during delivery,
    /// until every inbox is empty. Returns how many were delivered.
    ///
    /// Messages for contexts whose channel is gone are discarded.
    pub fn pump(&self) -> usize {
        let mut delivered = 0;
        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                state.endpoints.iter_mut().find_map(|endpoint| {
                    endpoint
                        .inbox
                        .pop_front()
                        .map(|text| (endpoint.channel.clone(), text))
                })
            };
            let Some((channel, text)) = next else {
                return delivered;
            };
            if let Some(channel) = channel.upgrade() {
                channel.deliver(&text);
                delivered += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use responsive_review_protocol::SyncMessage;

    use super::*;

    #[test]
    fn broadcasts_to_everyone_but_the_sender() {
        let bus = LocalBus::new();
        let a = bus.connect("sync");
        let b = bus.connect("sync");
        let c = bus.connect("sync");

        let counts: Vec<Rc<Cell<u32>>> = (0..3).map(|_| Rc::new(Cell::new(0))).collect();
        let _subs: Vec<_> = [&a, &b, &c]
            .iter()
            .zip(&counts)
            .map(|(channel, count)| {
                let count = Rc::clone(count);
                channel.subscribe(move |_| count.set(count.get() + 1))
            })
            .collect();

        assert!(a.publish(&SyncMessage::ScrollUpdate { x: 0.0, y: 5.0 }).is_ok());
        assert_eq!(bus.queued(), 2);
        assert_eq!(bus.pump(), 2);
        let seen: Vec<u32> = counts.iter().map(|c| c.get()).collect();
        assert_eq!(seen, [0, 1, 1]);
    }

    #[test]
    fn replies_posted_during_delivery_are_pumped() {
        let bus = LocalBus::new();
        let master = bus.connect("sync");
        let slave = bus.connect("sync");

        let _echo = {
            let handle = Rc::clone(&master);
            master.subscribe(move |msg| {
                if let SyncMessage::SlaveScroll { x, y } = msg {
                    let _ = handle.publish(&SyncMessage::ScrollUpdate { x: *x, y: *y });
                }
            })
        };
        let got = Rc::new(Cell::new(false));
        let _sub = {
            let got = Rc::clone(&got);
            slave.subscribe(move |msg| {
                if matches!(msg, SyncMessage::ScrollUpdate { .. }) {
                    got.set(true);
                }
            })
        };

        assert!(slave.publish(&SyncMessage::SlaveScroll { x: 1.0, y: 2.0 }).is_ok());
        assert_eq!(bus.pump(), 2);
        assert!(got.get());
    }

    #[test]
    fn dropped_contexts_are_skipped() {
        let bus = LocalBus::new();
        let a = bus.connect("sync");
        let b = bus.connect("sync");
        drop(b);
        assert!(a.publish(&SyncMessage::SlaveScroll { x: 0.0, y: 0.0 }).is_ok());
        assert_eq!(bus.pump(), 0);
        assert_eq!(bus.queued(), 0);
    }
}
