use std::rc::Rc;

use gloo_events::EventListener;
use responsive_review_core::sync::{HistoryMode, NavigationError, NavigationReplicator, Navigator};
use wasm_bindgen::JsValue;
use web_sys::{Event, PopStateEvent, Window};

use crate::js::{describe, js_err};

/// Dispatched after programmatic navigation that emits no `popstate`
/// (e.g. a router's `pushState`). Hosts fire it through the exported
/// `notify_navigation`, or dispatch it on `window` themselves.
pub const NAVIGATE_EVENT: &str = "responsive-review:navigate";

fn history_err(value: JsValue) -> NavigationError {
    NavigationError::History(describe(&value))
}

/// Soft navigation through `history` plus a synthesized `popstate`.
pub struct BrowserHistory {
    window: Window,
}

impl BrowserHistory {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl Navigator for BrowserHistory {
    fn current_url(&self) -> String {
        self.window.location().href().unwrap_or_default()
    }

    fn navigate(&self, url: &str, mode: HistoryMode) -> Result<(), NavigationError> {
        let history = self.window.history().map_err(history_err)?;
        match mode {
            HistoryMode::Push => history.push_state_with_url(&JsValue::NULL, "", Some(url)),
            HistoryMode::Replace => history.replace_state_with_url(&JsValue::NULL, "", Some(url)),
        }
        .map_err(history_err)?;

        let event = PopStateEvent::new("popstate").map_err(history_err)?;
        self.window.dispatch_event(&event).map_err(history_err)?;
        Ok(())
    }
}

/// Announce a navigation the browser did not report.
pub fn notify(window: &Window) -> anyhow::Result<()> {
    let event = Event::new(NAVIGATE_EVENT).map_err(js_err)?;
    window.dispatch_event(&event).map_err(js_err)?;
    Ok(())
}

/// Report every local navigation the page can observe.
pub fn watch(
    window: &Window,
    replicator: &Rc<NavigationReplicator<BrowserHistory>>,
) -> Vec<EventListener> {
    ["popstate", "hashchange", NAVIGATE_EVENT]
        .into_iter()
        .map(|kind| {
            let replicator = Rc::clone(replicator);
            EventListener::new(window, kind, move |_| {
                replicator.on_local_navigation();
            })
        })
        .collect()
}
