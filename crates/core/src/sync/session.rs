use std::rc::Rc;

use responsive_review_protocol::SyncMessage;
use tracing::debug;

use super::channel::{Subscription, SyncChannel};
use super::fetch::{FetchExecutor, FetchProxy, FetchRelay, Spawner};
use super::nav::{NavigationReplicator, Navigator};
use super::scroll::{ScrollReplicator, Scroller};
use crate::config::ReviewConfig;
use crate::role::Role;

const TARGET: &str = "responsive_review::session";

/// Everything the master context runs on its channel.
pub struct MasterSession<N, S, E> {
    channel: Rc<SyncChannel>,
    navigation: Rc<NavigationReplicator<N>>,
    scroll: Rc<ScrollReplicator<S>>,
    _subscription: Subscription,
    _relay: Rc<FetchRelay<E>>,
}

impl<N, S, E> MasterSession<N, S, E>
where
    N: Navigator + 'static,
    S: Scroller + 'static,
    E: FetchExecutor + 'static,
{
    pub fn install(
        channel: Rc<SyncChannel>,
        config: &ReviewConfig,
        navigator: N,
        scroller: S,
        executor: E,
        spawner: Spawner,
    ) -> Self {
        let navigation = Rc::new(NavigationReplicator::new(
            Role::Master,
            navigator,
            Rc::clone(&channel),
            config.marker_param.clone(),
        ));
        let scroll = Rc::new(ScrollReplicator::new(
            Role::Master,
            scroller,
            Rc::clone(&channel),
            config.scroll_threshold_px,
        ));
        let relay = Rc::new(FetchRelay::new(Rc::clone(&channel), executor, spawner));

        let subscription = {
            let navigation = Rc::clone(&navigation);
            let scroll = Rc::clone(&scroll);
            let relay = Rc::clone(&relay);
            channel.subscribe(move |message| match message {
                SyncMessage::SlaveNavigated { .. } => {
                    navigation.on_remote(message);
                }
                SyncMessage::SlaveScroll { .. } => {
                    scroll.on_remote(message);
                }
                SyncMessage::FetchRequest(_) => {
                    relay.handle(message);
                }
                SyncMessage::NavigationUpdate { .. }
                | SyncMessage::ScrollUpdate { .. }
                | SyncMessage::FetchResponse(_)
                | SyncMessage::FetchError { .. } => {}
            })
        };
        debug!(target: TARGET, channel = channel.name(), "master sync installed");

        Self {
            channel,
            navigation,
            scroll,
            _subscription: subscription,
            _relay: relay,
        }
    }

    pub fn channel(&self) -> &Rc<SyncChannel> {
        &self.channel
    }

    pub fn navigation(&self) -> &Rc<NavigationReplicator<N>> {
        &self.navigation
    }

    pub fn scroll(&self) -> &Rc<ScrollReplicator<S>> {
        &self.scroll
    }
}

/// Everything a slave context runs on its channel.
pub struct SlaveSession<N, S> {
    channel: Rc<SyncChannel>,
    navigation: Rc<NavigationReplicator<N>>,
    scroll: Rc<ScrollReplicator<S>>,
    proxy: Rc<FetchProxy>,
    _subscription: Subscription,
}

impl<N, S> SlaveSession<N, S>
where
    N: Navigator + 'static,
    S: Scroller + 'static,
{
    pub fn install(channel: Rc<SyncChannel>, config: &ReviewConfig, navigator: N, scroller: S) -> Self {
        let navigation = Rc::new(NavigationReplicator::new(
            Role::Slave,
            navigator,
            Rc::clone(&channel),
            config.marker_param.clone(),
        ));
        let scroll = Rc::new(ScrollReplicator::new(
            Role::Slave,
            scroller,
            Rc::clone(&channel),
            config.scroll_threshold_px,
        ));
        let proxy = Rc::new(FetchProxy::new(Rc::clone(&channel)));

        let subscription = {
            let navigation = Rc::clone(&navigation);
            let scroll = Rc::clone(&scroll);
            let proxy = Rc::downgrade(&proxy);
            channel.subscribe(move |message| match message {
                SyncMessage::NavigationUpdate { .. } => {
                    navigation.on_remote(message);
                }
                SyncMessage::ScrollUpdate { .. } => {
                    scroll.on_remote(message);
                }
                SyncMessage::FetchResponse(_) | SyncMessage::FetchError { .. } => {
                    if let Some(proxy) = proxy.upgrade() {
                        proxy.handle(message);
                    }
                }
                SyncMessage::SlaveNavigated { .. }
                | SyncMessage::SlaveScroll { .. }
                | SyncMessage::FetchRequest(_) => {}
            })
        };
        debug!(target: TARGET, channel = channel.name(), "slave sync installed");

        Self {
            channel,
            navigation,
            scroll,
            proxy,
            _subscription: subscription,
        }
    }

    pub fn channel(&self) -> &Rc<SyncChannel> {
        &self.channel
    }

    pub fn navigation(&self) -> &Rc<NavigationReplicator<N>> {
        &self.navigation
    }

    pub fn scroll(&self) -> &Rc<ScrollReplicator<S>> {
        &self.scroll
    }

    pub fn proxy(&self) -> &Rc<FetchProxy> {
        &self.proxy
    }
}
