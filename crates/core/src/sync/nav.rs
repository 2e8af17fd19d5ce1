use std::cell::RefCell;
use std::rc::Rc;

use responsive_review_protocol::SyncMessage;
use thiserror::Error;
use tracing::{debug, warn};

use super::channel::{SyncChannel, SyncFlag};
use crate::location;
use crate::role::Role;

const TARGET: &str = "responsive_review::nav";

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("history update failed: {0}")]
    History(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    /// New history entry (master).
    Push,
    /// Overwrite the current entry (slave).
    Replace,
}

/// Soft-navigation capability of one browsing context.
pub trait Navigator {
    fn current_url(&self) -> String;

    /// Change the visible URL without a reload, then emit a history-change
    /// notification so client-side routers react. The notification may
    /// call straight back into [`NavigationReplicator::on_local_navigation`].
    fn navigate(&self, url: &str, mode: HistoryMode) -> Result<(), NavigationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Idle,
    ApplyingRemote,
}

/// Mirrors soft navigation between the master and its slaves.
///
/// The master publishes `navigation-update` with its clean URL and applies
/// `slave-navigated`; the slave does the reverse, keeping the marker on
/// every URL it applies.
pub struct NavigationReplicator<N> {
    role: Role,
    navigator: N,
    channel: Rc<SyncChannel>,
    marker: String,
    syncing: SyncFlag,
    last_reported: RefCell<Option<String>>,
}

impl<N: Navigator> NavigationReplicator<N> {
    pub fn new(role: Role, navigator: N, channel: Rc<SyncChannel>, marker: impl Into<String>) -> Self {
        Self {
            role,
            navigator,
            channel,
            marker: marker.into(),
            syncing: SyncFlag::default(),
            last_reported: RefCell::new(None),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn state(&self) -> NavState {
        if self.syncing.is_syncing() {
            NavState::ApplyingRemote
        } else {
            NavState::Idle
        }
    }

    /// URL as this side reports it: clean for the master, as-is for a slave.
    fn reported_url(&self, href: &str) -> String {
        match self.role {
            Role::Master => {
                location::strip_marker(href, &self.marker).unwrap_or_else(|_| href.to_owned())
            }
            Role::Slave => href.to_owned(),
        }
    }

    /// Report a local navigation. Returns whether a message went out.
    ///
    /// Silent while a remote navigation is being applied, and when the URL
    /// is the same location that was last reported or applied.
    pub fn on_local_navigation(&self) -> bool {
        if self.syncing.is_syncing() {
            debug!(target: TARGET, "suppressed echo while applying remote navigation");
            return false;
        }

        let url = self.reported_url(&self.navigator.current_url());
        if let Some(last) = self.last_reported.borrow().as_deref()
            && location::same_location(last, &url, &self.marker)
        {
            return false;
        }

        let message = match self.role {
            Role::Master => SyncMessage::NavigationUpdate { url: url.clone() },
            Role::Slave => SyncMessage::SlaveNavigated { url: url.clone() },
        };
        if let Err(e) = self.channel.publish(&message) {
            warn!(target: TARGET, "failed to publish navigation: {e}");
            return false;
        }
        *self.last_reported.borrow_mut() = Some(url);
        true
    }

    /// Apply a peer's navigation if it targets a different location.
    /// Returns whether the local URL was changed.
    pub fn on_remote(&self, message: &SyncMessage) -> bool {
        let (target, mode) = match (self.role, message) {
            (Role::Master, SyncMessage::SlaveNavigated { url }) => {
                match location::strip_marker(url, &self.marker) {
                    Ok(clean) => (clean, HistoryMode::Push),
                    Err(e) => {
                        warn!(target: TARGET, "failed to parse slave URL: {e}");
                        return false;
                    }
                }
            }
            (Role::Slave, SyncMessage::NavigationUpdate { url }) => {
                match location::with_marker(url, &self.marker) {
                    Ok(marked) => (marked, HistoryMode::Replace),
                    Err(e) => {
                        warn!(target: TARGET, "failed to parse master URL: {e}");
                        return false;
                    }
                }
            }
            _ => return false,
        };

        let current = self.navigator.current_url();
        if location::same_location(&target, &current, &self.marker) {
            debug!(target: TARGET, url = %target, "already there");
            return false;
        }

        let applied = {
            let _guard = self.syncing.enter();
            self.navigator.navigate(&target, mode)
        };
        match applied {
            Ok(()) => {
                let now = self.reported_url(&self.navigator.current_url());
                *self.last_reported.borrow_mut() = Some(now);
                debug!(target: TARGET, url = %target, ?mode, "applied remote navigation");
                true
            }
            Err(e) => {
                warn!(target: TARGET, url = %target, "{e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Weak;

    use super::*;
    use crate::sync::channel::{ChannelError, Transport};

    struct Outbox(Rc<RefCell<Vec<SyncMessage>>>);

    impl Transport for Outbox {
        fn post(&self, text: &str) -> Result<(), ChannelError> {
            let msg = crate::sync::channel::decode(text)?;
            self.0.borrow_mut().push(msg);
            Ok(())
        }
    }

    /// History stand-in that fires the local-navigation hook synchronously,
    /// like a dispatched `popstate`.
    struct FakeHistory {
        url: RefCell<String>,
        entries: Cell<usize>,
        replica: RefCell<Weak<NavigationReplicator<FakeHistory>>>,
    }

    impl Navigator for FakeHistory {
        fn current_url(&self) -> String {
            self.url.borrow().clone()
        }

        fn navigate(&self, url: &str, mode: HistoryMode) -> Result<(), NavigationError> {
            if url.contains("fail") {
                return Err(NavigationError::History("denied".into()));
            }
            *self.url.borrow_mut() = url.to_owned();
            if mode == HistoryMode::Push {
                self.entries.set(self.entries.get() + 1);
            }
            let replica = self.replica.borrow().upgrade();
            if let Some(replica) = replica {
                replica.on_local_navigation();
            }
            Ok(())
        }
    }

    type Sent = Rc<RefCell<Vec<SyncMessage>>>;

    fn replicator(role: Role, url: &str) -> (Rc<NavigationReplicator<FakeHistory>>, Sent) {
        let sent: Sent = Rc::new(RefCell::new(Vec::new()));
        let channel = SyncChannel::new("test", Outbox(Rc::clone(&sent)));
        let history = FakeHistory {
            url: RefCell::new(url.to_owned()),
            entries: Cell::new(1),
            replica: RefCell::new(Weak::new()),
        };
        let rep = Rc::new(NavigationReplicator::new(
            role,
            history,
            channel,
            "is-responsive-view",
        ));
        *rep.navigator().replica.borrow_mut() = Rc::downgrade(&rep);
        (rep, sent)
    }

    #[test]
    fn master_publishes_clean_url() {
        let (rep, sent) = replicator(Role::Master, "https://host/products?sort=price");
        assert!(rep.on_local_navigation());
        assert_eq!(
            sent.borrow().as_slice(),
            [SyncMessage::NavigationUpdate {
                url: "https://host/products?sort=price".into()
            }]
        );
    }

    #[test]
    fn slave_publishes_full_url() {
        let (rep, sent) = replicator(Role::Slave, "https://host/?is-responsive-view=true");
        assert!(rep.on_local_navigation());
        assert_eq!(
            sent.borrow().as_slice(),
            [SyncMessage::SlaveNavigated {
                url: "https://host/?is-responsive-view=true".into()
            }]
        );
    }

    #[test]
    fn slave_applies_update_with_marker_and_without_echo() {
        let (rep, sent) = replicator(Role::Slave, "https://host/?is-responsive-view=true");
        let update = SyncMessage::NavigationUpdate {
            url: "https://host/products?sort=price".into(),
        };
        assert!(rep.on_remote(&update));
        assert_eq!(
            rep.navigator().current_url(),
            "https://host/products?sort=price&is-responsive-view=true"
        );
        assert_eq!(rep.navigator().entries.get(), 1, "slave replaces its entry");
        assert!(sent.borrow().is_empty());
        assert_eq!(rep.state(), NavState::Idle);

        // Replaying the same update is a no-op.
        assert!(!rep.on_remote(&update));
        assert!(sent.borrow().is_empty());
    }

    #[test]
    fn master_strips_marker_and_pushes() {
        let (rep, sent) = replicator(Role::Master, "https://host/");
        let msg = SyncMessage::SlaveNavigated {
            url: "https://host/cart?is-responsive-view=true".into(),
        };
        assert!(rep.on_remote(&msg));
        assert_eq!(rep.navigator().current_url(), "https://host/cart");
        assert_eq!(rep.navigator().entries.get(), 2);
        assert!(sent.borrow().is_empty());
    }

    #[test]
    fn equivalent_urls_are_not_applied() {
        let (rep, _) = replicator(
            Role::Master,
            "https://host/products?page=2&sort=price",
        );
        let msg = SyncMessage::SlaveNavigated {
            url: "https://host/products?sort=price&is-responsive-view=true&page=2".into(),
        };
        assert!(!rep.on_remote(&msg));
        assert_eq!(rep.navigator().entries.get(), 1);
    }

    #[test]
    fn malformed_remote_url_is_skipped() {
        let (rep, _) = replicator(Role::Slave, "https://host/?is-responsive-view=true");
        let msg = SyncMessage::NavigationUpdate { url: "::bad".into() };
        assert!(!rep.on_remote(&msg));
        assert_eq!(
            rep.navigator().current_url(),
            "https://host/?is-responsive-view=true"
        );
    }

    #[test]
    fn wrong_direction_messages_are_ignored() {
        let (master, _) = replicator(Role::Master, "https://host/");
        assert!(!master.on_remote(&SyncMessage::NavigationUpdate {
            url: "https://host/x".into()
        }));
        let (slave, _) = replicator(Role::Slave, "https://host/?is-responsive-view=true");
        assert!(!slave.on_remote(&SyncMessage::SlaveNavigated {
            url: "https://host/x".into()
        }));
    }

    #[test]
    fn failed_history_update_releases_the_flag() {
        let (rep, sent) = replicator(Role::Master, "https://host/");
        let msg = SyncMessage::SlaveNavigated {
            url: "https://host/fail".into(),
        };
        assert!(!rep.on_remote(&msg));
        assert_eq!(rep.state(), NavState::Idle);
        assert!(rep.on_local_navigation());
        assert_eq!(sent.borrow().len(), 1);
    }

    #[test]
    fn repeated_local_reports_are_collapsed() {
        let (rep, sent) = replicator(Role::Master, "https://host/a");
        assert!(rep.on_local_navigation());
        assert!(!rep.on_local_navigation());
        *rep.navigator().url.borrow_mut() = "https://host/b".into();
        assert!(rep.on_local_navigation());
        assert_eq!(sent.borrow().len(), 2);
    }
}
