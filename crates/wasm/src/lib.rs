mod app;
mod dom;
mod fetch;
mod history;
mod input;
mod js;
mod logging;
mod scroll;
mod transport;

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use anyhow::Context as _;
use gloo_events::EventListener;
use responsive_review_core::role::detect_role as role_of;
use responsive_review_core::sync::{MasterSession, SlaveSession, Spawner};
use responsive_review_core::{LayoutEngine, ReviewConfig, Role};
use tracing::{error, info, warn};
use wasm_bindgen::prelude::*;
use web_sys::Window;

use crate::app::MasterUi;
use crate::fetch::BrowserNetwork;
use crate::history::BrowserHistory;
use crate::input::Input;
use crate::scroll::WindowScroller;
use crate::transport::BrowserChannel;

const TARGET: &str = "responsive_review::init";

/// Everything that must outlive `init_responsive_ui`.
#[derive(Default)]
struct Runtime {
    _master: Option<MasterSession<BrowserHistory, WindowScroller, BrowserNetwork>>,
    _slave: Option<SlaveSession<BrowserHistory, WindowScroller>>,
    _channel: Option<BrowserChannel>,
    _ui: Option<Rc<MasterUi>>,
    _listeners: Vec<EventListener>,
}

thread_local! {
    static RUNTIME: RefCell<Option<Runtime>> = const { RefCell::new(None) };
}

/// `"master"` or `"slave"` for a page URL, using the default marker.
#[wasm_bindgen]
pub fn detect_role(href: &str) -> String {
    role_of(href, &ReviewConfig::default().marker_param)
        .as_str()
        .to_owned()
}

/// Install the review tool on this page.
///
/// Blank `devices_json` / `offsets_json` select the built-in devices and
/// chrome table. Malformed JSON is returned as an error before anything is
/// installed; failures of the browser environment are only logged.
///
/// Back/forward and hash changes are picked up automatically. A router that
/// navigates with `history.pushState` must call [`notify_navigation`]
/// afterwards (or dispatch `responsive-review:navigate` on `window`) so the
/// other contexts follow.
#[wasm_bindgen]
pub fn init_responsive_ui(
    devices_json: &str,
    offsets_json: &str,
    config_json: Option<String>,
) -> Result<(), JsError> {
    logging::init();
    let input = Input::parse(devices_json, offsets_json, config_json.as_deref())
        .map_err(|e| JsError::new(&format!("{e:#}")))?;

    let Some(window) = web_sys::window() else {
        warn!(target: TARGET, "no window; responsive review disabled");
        return Ok(());
    };
    let Some(document) = window.document() else {
        warn!(target: TARGET, "no document; responsive review disabled");
        return Ok(());
    };

    if document.ready_state() == "loading" {
        EventListener::once(&document, "DOMContentLoaded", move |_| start(&window, input)).forget();
    } else {
        start(&window, input);
    }
    Ok(())
}

/// Report a programmatic navigation, such as a router's `pushState`, that
/// the browser does not announce with an event.
#[wasm_bindgen]
pub fn notify_navigation() -> Result<(), JsError> {
    let Some(window) = web_sys::window() else {
        return Ok(());
    };
    history::notify(&window).map_err(|e| JsError::new(&format!("{e:#}")))
}

fn start(window: &Window, input: Input) {
    if RUNTIME.with(|cell| cell.borrow().is_some()) {
        warn!(target: TARGET, "already initialised");
        return;
    }

    let href = window.location().href().unwrap_or_default();
    let role = role_of(&href, &input.config.marker_param);
    let runtime = match role {
        Role::Master => start_master(window, input),
        Role::Slave => start_slave(window, &input.config),
    };

    match runtime {
        Ok(runtime) => {
            info!(target: TARGET, "running as {}", role.as_str());
            RUNTIME.with(|cell| *cell.borrow_mut() = Some(runtime));
        }
        Err(e) => error!(target: TARGET, "initialisation failed: {e:#}"),
    }
}

fn start_master(window: &Window, input: Input) -> anyhow::Result<Runtime> {
    let Input {
        devices,
        offsets,
        config,
    } = input;
    let mut master = None;
    let mut channel = None;
    let mut listeners = Vec::new();

    // The overlay works without sync, so a missing channel only disables it.
    match transport::open(&config.channel_name) {
        Ok(browser) => {
            let spawner: Spawner = Rc::new(|task: Pin<Box<dyn Future<Output = ()>>>| {
                wasm_bindgen_futures::spawn_local(task);
            });
            let session = MasterSession::install(
                Rc::clone(&browser.channel),
                &config,
                BrowserHistory::new(window.clone()),
                WindowScroller::new(window.clone()),
                BrowserNetwork::new(window.clone()),
                spawner,
            );
            listeners = history::watch(window, session.navigation());
            listeners.push(scroll::watch(window, session.scroll(), config.scroll_debounce_ms));
            master = Some(session);
            channel = Some(browser);
        }
        Err(e) => warn!(target: TARGET, "sync disabled: {e:#}"),
    }

    let engine = LayoutEngine::new(devices, offsets, &config);
    let ui = MasterUi::mount(window.clone(), engine, config.resize_debounce_ms)
        .context("mounting the review overlay")?;

    Ok(Runtime {
        _master: master,
        _channel: channel,
        _ui: Some(ui),
        _listeners: listeners,
        ..Runtime::default()
    })
}

fn start_slave(window: &Window, config: &ReviewConfig) -> anyhow::Result<Runtime> {
    let browser = transport::open(&config.channel_name)?;
    let session = SlaveSession::install(
        Rc::clone(&browser.channel),
        config,
        BrowserHistory::new(window.clone()),
        WindowScroller::new(window.clone()),
    );

    let mut listeners = history::watch(window, session.navigation());
    listeners.push(scroll::watch(window, session.scroll(), config.scroll_debounce_ms));
    fetch::install_proxy(window, Rc::clone(session.proxy()))?;

    Ok(Runtime {
        _slave: Some(session),
        _channel: Some(browser),
        _listeners: listeners,
        ..Runtime::default()
    })
}
