use std::rc::Rc;

use gloo_events::EventListener;
use gloo_timers::callback::Timeout;
use responsive_review_core::sync::{ScrollReplicator, Scroller};
use responsive_review_protocol::ScrollPosition;
use web_sys::Window;

pub struct WindowScroller {
    window: Window,
}

impl WindowScroller {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl Scroller for WindowScroller {
    fn position(&self) -> ScrollPosition {
        ScrollPosition::new(
            self.window.scroll_x().unwrap_or(0.0),
            self.window.scroll_y().unwrap_or(0.0),
        )
    }

    fn scroll_to(&self, position: ScrollPosition) {
        self.window.scroll_to_with_x_and_y(position.x, position.y);
    }
}

/// Throttle window scroll events into one publish per `window_ms`.
pub fn watch(
    window: &Window,
    replicator: &Rc<ScrollReplicator<WindowScroller>>,
    window_ms: u32,
) -> EventListener {
    let replicator = Rc::clone(replicator);
    EventListener::new(window, "scroll", move |_| {
        if replicator.note_local_scroll() {
            let replicator = Rc::clone(&replicator);
            // Fire-once; never cancelled.
            let _ = Timeout::new(window_ms, move || {
                replicator.flush();
            })
            .forget();
        }
    })
}
