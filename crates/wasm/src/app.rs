use std::cell::{OnceCell, RefCell};
use std::rc::Rc;

use anyhow::Context as _;
use gloo_events::EventListener;
use gloo_timers::callback::Timeout;
use responsive_review_core::layout::toggle_label;
use responsive_review_core::{LayoutEngine, Viewport};
use responsive_review_protocol::ShellCommand;
use tracing::{error, warn};
use web_sys::Window;

use crate::dom::{ShellRenderer, UiEvent, UiHandler};

const TARGET: &str = "responsive_review::ui";

/// The master's review overlay: layout state plus the DOM it drives.
pub struct MasterUi {
    window: Window,
    engine: RefCell<LayoutEngine>,
    renderer: OnceCell<ShellRenderer>,
    resize_debounce_ms: u32,
    resize_timer: RefCell<Option<Timeout>>,
    listeners: RefCell<Vec<EventListener>>,
}

impl MasterUi {
    pub fn mount(window: Window, engine: LayoutEngine, resize_debounce_ms: u32) -> anyhow::Result<Rc<Self>> {
        let document = window.document().context("window has no document")?;
        let ui = Rc::new(Self {
            window: window.clone(),
            engine: RefCell::new(engine),
            renderer: OnceCell::new(),
            resize_debounce_ms,
            resize_timer: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
        });

        let handler: UiHandler = {
            let ui = Rc::downgrade(&ui);
            Rc::new(move |event| {
                if let Some(ui) = ui.upgrade() {
                    ui.handle(&event);
                }
            })
        };
        let renderer = ShellRenderer::mount(document, toggle_label(false), handler)?;
        if ui.renderer.set(renderer).is_err() {
            warn!(target: TARGET, "renderer mounted twice");
        }

        let resize = {
            let ui = Rc::downgrade(&ui);
            EventListener::new(&window, "resize", move |_| {
                if let Some(ui) = ui.upgrade() {
                    ui.schedule_resize();
                }
            })
        };
        ui.listeners.borrow_mut().push(resize);
        Ok(ui)
    }

    fn viewport(&self) -> Viewport {
        Viewport {
            width: self
                .window
                .inner_width()
                .ok()
                .and_then(|w| w.as_f64())
                .unwrap_or(0.0),
            app_url: self.window.location().href().unwrap_or_default(),
        }
    }

    fn handle(&self, event: &UiEvent) {
        let viewport = self.viewport();
        let commands = {
            let mut engine = self.engine.borrow_mut();
            match event {
                UiEvent::ToggleOverlay => engine.toggle_overlay(&viewport),
                UiEvent::Control(action) => engine.apply(action, &viewport),
                UiEvent::Rotate(id) => match engine.rotate(id, &viewport) {
                    Ok(commands) => commands,
                    Err(e) => {
                        warn!(target: TARGET, "{e}");
                        return;
                    }
                },
            }
        };
        self.paint(&commands);
    }

    /// Restart the debounce window; only the last resize in a burst renders.
    fn schedule_resize(self: &Rc<Self>) {
        let ui = Rc::downgrade(self);
        let timer = Timeout::new(self.resize_debounce_ms, move || {
            if let Some(ui) = ui.upgrade() {
                let viewport = ui.viewport();
                let commands = ui.engine.borrow_mut().on_resize(&viewport);
                ui.paint(&commands);
            }
        });
        // Replacing the previous timeout cancels it.
        *self.resize_timer.borrow_mut() = Some(timer);
    }

    fn paint(&self, commands: &[ShellCommand]) {
        if commands.is_empty() {
            return;
        }
        let Some(renderer) = self.renderer.get() else {
            return;
        };
        if let Err(e) = renderer.apply(commands) {
            error!(target: TARGET, "render failed: {e:#}");
        }
    }
}
