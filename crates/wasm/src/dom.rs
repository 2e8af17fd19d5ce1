//! Applies [`ShellCommand`]s to the page.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::anyhow;
use gloo_events::EventListener;
use responsive_review_protocol::{
    CardSlot, CardSpec, ChromeVisibility, ControlAction, ControlBar, ControlButton, ShellCommand,
};
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement};

use crate::js::js_err;

const STYLE_SHEET: &str = r#"
.rr-overlay { position: fixed; inset: 0; background: #0a0a0a; z-index: 9999998; display: none; overflow-y: auto; padding: 120px 40px 40px; box-sizing: border-box; font-family: system-ui, -apple-system, sans-serif; scroll-behavior: smooth; }
.rr-filter-bar { position: fixed; top: 0; left: 0; width: 100%; padding: 15px; background: #141414; border-bottom: 1px solid #333; display: flex; gap: 20px; justify-content: center; align-items: center; z-index: 9999999; flex-wrap: wrap; box-shadow: 0 4px 20px rgba(0,0,0,0.4); }
.rr-stage { display: flex; align-items: flex-start; gap: 40px; }
.rr-master-pane { position: sticky; top: 0; z-index: 100; flex-shrink: 0; }
.rr-grid { display: flex; flex-wrap: wrap; gap: 60px; justify-content: center; align-items: flex-start; flex: 1; }
.rr-zoom-container { position: relative; transition: all 0.3s cubic-bezier(0.4, 0, 0.2, 1); }
.rr-shell { display: flex; flex-direction: column; background: #000; border: 1px solid #444; border-radius: 12px; overflow: hidden; transform-origin: top left; box-shadow: 0 20px 50px rgba(0,0,0,0.5); transition: width 0.3s, height 0.3s; }
.rr-toolbar { background: #2b2b2b; border-bottom: 1px solid #3d3d3d; display: flex; align-items: center; padding: 0 15px; gap: 15px; flex-shrink: 0; overflow: hidden; }
.rr-traffic { display: flex; gap: 6px; }
.rr-dot { width: 10px; height: 10px; border-radius: 50%; }
.rr-url-bar { flex: 1; background: #1e1e1e; height: 26px; border-radius: 6px; border: 1px solid #444; font-size: 11px; display: flex; align-items: center; padding-left: 12px; color: #888; font-family: monospace; }
.rr-body-wrapper { display: flex; flex: 1; overflow: hidden; background: #fff; position: relative; }
.rr-sidenav { background: #1c1c1c; flex-shrink: 0; display: flex; flex-direction: column; align-items: center; padding: 15px 0; justify-content: space-between; overflow: hidden; }
.rr-sidenav-left { border-right: 1px solid #333; }
.rr-sidenav-right { border-left: 1px solid #333; }
.rr-side-icons { display: flex; flex-direction: column; gap: 15px; align-items: center; }
.rr-side-icon { width: 30px; height: 30px; border-radius: 8px; background: #333; }
.rr-iframe { border: none; flex: 1; width: 100%; height: 100%; }
.rr-taskbar { background: rgba(30, 30, 30, 0.9); backdrop-filter: blur(10px); border-top: 1px solid rgba(255,255,255,0.1); flex-shrink: 0; display: flex; align-items: center; justify-content: center; overflow: hidden; }
.rr-win-icon { width: 22px; height: 22px; background: #0078d4; border-radius: 3px; display: grid; grid-template-columns: 1fr 1fr; gap: 2px; padding: 4px; box-sizing: border-box; }
.rr-win-square { background: white; opacity: 0.9; }
.rr-toggle-btn { position: fixed; bottom: 20px; right: 20px; z-index: 10000000; padding: 12px 20px; background: #646cff; color: white; border: none; border-radius: 12px; cursor: pointer; font-weight: bold; font-size: 14px; box-shadow: 0 4px 15px rgba(0,0,0,0.3); transition: 0.2s; }
.rr-toggle-btn:hover { transform: translateY(-2px); background: #7c83ff; }
.hidden { display: none !important; }
"#;

const TRAFFIC_LIGHTS: &str = r#"<div class="rr-traffic"><div class="rr-dot" style="background:#ff5f56"></div><div class="rr-dot" style="background:#ffbd2e"></div><div class="rr-dot" style="background:#27c93f"></div></div>"#;
const SIDE_ICONS: &str = r#"<div class="rr-side-icons"><div class="rr-side-icon" style="background:linear-gradient(#4facfe,#00f2fe)"></div><div class="rr-side-icon" style="background:linear-gradient(#f093fb,#f5576c)"></div></div><div style="color:#444; font-size:18px; margin-bottom: 10px;">⚙️</div>"#;
const WIN_ICON: &str = r#"<div class="rr-win-icon"><div class="rr-win-square"></div><div class="rr-win-square"></div><div class="rr-win-square"></div><div class="rr-win-square"></div></div>"#;

const ACCENT: &str = "#646cff";
const DANGER: &str = "#f44336";

/// What the user clicked.
#[derive(Debug, Clone)]
pub enum UiEvent {
    ToggleOverlay,
    Control(ControlAction),
    Rotate(String),
}

pub type UiHandler = Rc<dyn Fn(UiEvent)>;

/// Hand an event to the app once the current DOM callback has returned,
/// so handlers never run inside a render.
fn emit(handler: &UiHandler, event: UiEvent) {
    let handler = Rc::clone(handler);
    wasm_bindgen_futures::spawn_local(async move { handler(event) });
}

struct CardNodes {
    root: HtmlElement,
    header: HtmlElement,
    caption: HtmlElement,
    zoom: HtmlElement,
    shell: HtmlElement,
    toolbar: HtmlElement,
    taskbar: HtmlElement,
    side_left: HtmlElement,
    side_right: HtmlElement,
    _rotate: Option<EventListener>,
}

impl CardNodes {
    fn resize(&self, card: &CardSpec) -> anyhow::Result<()> {
        set_px(&self.header, "width", card.scaled_width())?;
        self.caption.set_inner_html("");
        fill_caption(&self.caption, card)?;
        set_px(&self.zoom, "width", card.scaled_width())?;
        set_px(&self.zoom, "height", card.scaled_height())?;
        set_px(&self.shell, "width", card.width)?;
        set_px(&self.shell, "height", card.height)?;
        set_style(&self.shell, "transform", &format!("scale({})", card.scale))?;
        set_px(&self.toolbar, "height", card.chrome.toolbar_height)?;
        set_px(&self.taskbar, "height", card.chrome.taskbar_height)?;
        set_px(&self.side_left, "width", card.chrome.side_nav_width)?;
        set_px(&self.side_right, "width", card.chrome.side_nav_width)?;
        Ok(())
    }

    fn show_chrome(&self, visibility: ChromeVisibility) -> anyhow::Result<()> {
        for (node, visible) in [
            (&self.toolbar, visibility.toolbar),
            (&self.taskbar, visibility.taskbar),
            (&self.side_left, visibility.side_left),
            (&self.side_right, visibility.side_right),
        ] {
            node.class_list()
                .toggle_with_force("hidden", !visible)
                .map_err(js_err)?;
        }
        Ok(())
    }
}

fn set_style(node: &HtmlElement, name: &str, value: &str) -> anyhow::Result<()> {
    node.style().set_property(name, value).map_err(js_err)
}

fn set_px(node: &HtmlElement, name: &str, value: f64) -> anyhow::Result<()> {
    set_style(node, name, &format!("{value}px"))
}

fn fill_caption(caption: &HtmlElement, card: &CardSpec) -> anyhow::Result<()> {
    let document = caption
        .owner_document()
        .ok_or_else(|| anyhow!("caption is detached"))?;
    let name = document.create_element("strong").map_err(js_err)?;
    name.set_text_content(Some(&card.label));
    let size = document.create_element("span").map_err(js_err)?;
    size.set_attribute("style", "opacity:0.5; margin-left:5px;")
        .map_err(js_err)?;
    size.set_text_content(Some(&card.dimensions_caption()));
    caption.append_child(&name).map_err(js_err)?;
    caption
        .append_child(&document.create_text_node(" "))
        .map_err(js_err)?;
    caption.append_child(&size).map_err(js_err)?;
    Ok(())
}

/// The overlay, its filter bar and every shell card.
pub struct ShellRenderer {
    document: Document,
    body: HtmlElement,
    toggle: HtmlElement,
    overlay: HtmlElement,
    filter_bar: HtmlElement,
    master_pane: HtmlElement,
    grid: HtmlElement,
    handler: UiHandler,
    cards: RefCell<HashMap<String, CardNodes>>,
    control_listeners: RefCell<Vec<EventListener>>,
    _toggle_listener: EventListener,
}

impl ShellRenderer {
    /// Inject the stylesheet and the closed overlay into `document`.
    pub fn mount(document: Document, toggle_label: &str, handler: UiHandler) -> anyhow::Result<Self> {
        let body = document.body().ok_or_else(|| anyhow!("document has no body"))?;
        let head = document.head().ok_or_else(|| anyhow!("document has no head"))?;

        let style = document.create_element("style").map_err(js_err)?;
        style.set_text_content(Some(STYLE_SHEET));
        head.append_child(&style).map_err(js_err)?;

        let make = |tag: &str, class: &str| -> anyhow::Result<HtmlElement> {
            let node: HtmlElement = document
                .create_element(tag)
                .map_err(js_err)?
                .dyn_into()
                .map_err(|_| anyhow!("<{tag}> is not an HTML element"))?;
            node.set_class_name(class);
            Ok(node)
        };

        let toggle = make("button", "rr-toggle-btn")?;
        toggle.set_inner_text(toggle_label);
        let overlay = make("div", "rr-overlay")?;
        let filter_bar = make("div", "rr-filter-bar")?;
        let stage = make("div", "rr-stage")?;
        let master_pane = make("div", "rr-master-pane")?;
        let grid = make("div", "rr-grid")?;

        stage.append_child(&master_pane).map_err(js_err)?;
        stage.append_child(&grid).map_err(js_err)?;
        overlay.append_child(&filter_bar).map_err(js_err)?;
        overlay.append_child(&stage).map_err(js_err)?;
        body.append_child(&toggle).map_err(js_err)?;
        body.append_child(&overlay).map_err(js_err)?;

        let toggle_listener = {
            let handler = Rc::clone(&handler);
            EventListener::new(&toggle, "click", move |_| emit(&handler, UiEvent::ToggleOverlay))
        };

        Ok(Self {
            document,
            body,
            toggle,
            overlay,
            filter_bar,
            master_pane,
            grid,
            handler,
            cards: RefCell::new(HashMap::new()),
            control_listeners: RefCell::new(Vec::new()),
            _toggle_listener: toggle_listener,
        })
    }

    fn element(&self, tag: &str, class: &str) -> anyhow::Result<HtmlElement> {
        let node: HtmlElement = self
            .document
            .create_element(tag)
            .map_err(js_err)?
            .dyn_into()
            .map_err(|_| anyhow!("<{tag}> is not an HTML element"))?;
        if !class.is_empty() {
            node.set_class_name(class);
        }
        Ok(node)
    }

    pub fn apply(&self, commands: &[ShellCommand]) -> anyhow::Result<()> {
        for command in commands {
            match command {
                ShellCommand::SetOverlay { open, button_label } => {
                    self.set_overlay(*open, button_label)?;
                }
                ShellCommand::SetControls(bar) => self.set_controls(bar)?,
                ShellCommand::CreateCard { slot, card } => self.create_card(*slot, card)?,
                ShellCommand::UpdateCard { slot, card } => {
                    let updated = match self.cards.borrow().get(&card.id) {
                        Some(nodes) => {
                            nodes.resize(card)?;
                            true
                        }
                        None => false,
                    };
                    if !updated {
                        self.create_card(*slot, card)?;
                    }
                }
                ShellCommand::RemoveCard { id } => {
                    if let Some(nodes) = self.cards.borrow_mut().remove(id) {
                        nodes.root.remove();
                    }
                }
                ShellCommand::SetChromeVisibility(visibility) => {
                    for nodes in self.cards.borrow().values() {
                        nodes.show_chrome(*visibility)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn set_overlay(&self, open: bool, button_label: &str) -> anyhow::Result<()> {
        set_style(&self.overlay, "display", if open { "block" } else { "none" })?;
        self.toggle.set_inner_text(button_label);
        set_style(&self.toggle, "background", if open { DANGER } else { ACCENT })?;
        if open {
            set_style(&self.body, "overflow", "hidden")
        } else {
            self.body
                .style()
                .remove_property("overflow")
                .map(drop)
                .map_err(js_err)
        }
    }

    fn set_controls(&self, bar: &ControlBar) -> anyhow::Result<()> {
        let mut listeners = Vec::with_capacity(bar.groups.len() + bar.features.len());
        self.filter_bar.set_inner_html("");

        let groups = self.element("div", "")?;
        set_style(&groups, "display", "flex")?;
        for button in &bar.groups {
            let css = format!(
                "padding:6px 12px; margin:2px; border-radius:6px; border:none; cursor:pointer; font-size:11px; background:{}; color:{}; transition: 0.2s;",
                if button.active { "#444" } else { "#222" },
                if button.active { "#fff" } else { "#666" },
            );
            listeners.push(self.control_button(&groups, button, &css)?);
        }

        let features = self.element("div", "")?;
        features
            .set_attribute(
                "style",
                "border-left: 1px solid #333; padding-left: 20px; margin-left: 10px; display:flex; gap:8px;",
            )
            .map_err(js_err)?;
        for button in &bar.features {
            let css = format!(
                "padding:6px 12px; border-radius:6px; font-size:11px; cursor:pointer; transition:0.2s; border:1px solid {}; background:{}; color:{};",
                if button.active { ACCENT } else { "#333" },
                if button.active { "#333" } else { "#1a1a1a" },
                if button.active { "#fff" } else { "#888" },
            );
            listeners.push(self.control_button(&features, button, &css)?);
        }

        self.filter_bar.append_child(&groups).map_err(js_err)?;
        self.filter_bar.append_child(&features).map_err(js_err)?;
        *self.control_listeners.borrow_mut() = listeners;
        Ok(())
    }

    fn control_button(
        &self,
        parent: &HtmlElement,
        button: &ControlButton,
        css: &str,
    ) -> anyhow::Result<EventListener> {
        let node = self.element("button", "")?;
        node.set_inner_text(&button.label);
        node.set_attribute("style", css).map_err(js_err)?;
        parent.append_child(&node).map_err(js_err)?;

        let handler = Rc::clone(&self.handler);
        let action = button.action.clone();
        Ok(EventListener::new(&node, "click", move |_| {
            emit(&handler, UiEvent::Control(action.clone()));
        }))
    }

    fn create_card(&self, slot: CardSlot, card: &CardSpec) -> anyhow::Result<()> {
        let root = self.element("div", "rr-card")?;
        root.set_attribute("data-dev-id", &card.id).map_err(js_err)?;

        let header = self.element("div", "rr-header")?;
        header
            .set_attribute(
                "style",
                "display:flex; justify-content:space-between; align-items:center; margin-bottom:10px; color:#eee; font-size:11px;",
            )
            .map_err(js_err)?;
        let caption = self.element("div", "rr-label")?;
        header.append_child(&caption).map_err(js_err)?;

        let rotate = if card.rotatable {
            let button = self.element("button", "")?;
            button.set_inner_text("🔄");
            button.set_title("Rotate Device");
            button
                .set_attribute(
                    "style",
                    "background:none; border:none; cursor:pointer; font-size:12px; filter:grayscale(1); opacity:0.6;",
                )
                .map_err(js_err)?;
            header.append_child(&button).map_err(js_err)?;
            let handler = Rc::clone(&self.handler);
            let id = card.id.clone();
            Some(EventListener::new(&button, "click", move |_| {
                emit(&handler, UiEvent::Rotate(id.clone()));
            }))
        } else {
            None
        };

        let zoom = self.element("div", "rr-zoom-container")?;
        let shell = self.element("div", "rr-shell")?;
        shell.set_attribute("data-id", &card.id).map_err(js_err)?;
        if card.highlighted {
            set_style(&shell, "border", &format!("2px solid {ACCENT}"))?;
        }

        let toolbar = self.element("div", "rr-toolbar")?;
        toolbar.set_inner_html(TRAFFIC_LIGHTS);
        let url_bar = self.element("div", "rr-url-bar")?;
        url_bar.set_inner_text(&card.url_bar_text);
        toolbar.append_child(&url_bar).map_err(js_err)?;

        let body = self.element("div", "rr-body-wrapper")?;
        let side_left = self.element("div", "rr-sidenav rr-sidenav-left")?;
        side_left.set_inner_html(SIDE_ICONS);
        let side_right = self.element("div", "rr-sidenav rr-sidenav-right")?;
        side_right.set_inner_html(SIDE_ICONS);
        let frame = self.element("iframe", "rr-iframe")?;
        frame.set_attribute("src", &card.frame_src).map_err(js_err)?;
        body.append_child(&side_left).map_err(js_err)?;
        body.append_child(&frame).map_err(js_err)?;
        body.append_child(&side_right).map_err(js_err)?;

        let taskbar = self.element("div", "rr-taskbar")?;
        taskbar.set_inner_html(WIN_ICON);

        shell.append_child(&toolbar).map_err(js_err)?;
        shell.append_child(&body).map_err(js_err)?;
        shell.append_child(&taskbar).map_err(js_err)?;
        zoom.append_child(&shell).map_err(js_err)?;
        root.append_child(&header).map_err(js_err)?;
        root.append_child(&zoom).map_err(js_err)?;

        let nodes = CardNodes {
            root,
            header,
            caption,
            zoom,
            shell,
            toolbar,
            taskbar,
            side_left,
            side_right,
            _rotate: rotate,
        };
        nodes.resize(card)?;

        match slot {
            CardSlot::Master => {
                self.master_pane.set_inner_html("");
                let title = self.element("div", "")?;
                title.set_inner_text("CONTROLLER");
                title
                    .set_attribute(
                        "style",
                        "color:#888; font-size:10px; font-weight:bold; letter-spacing:1px; margin-bottom:10px; padding-left:2px;",
                    )
                    .map_err(js_err)?;
                self.master_pane.append_child(&title).map_err(js_err)?;
                self.master_pane.append_child(&nodes.root).map_err(js_err)?;
            }
            CardSlot::Grid => {
                self.grid.append_child(&nodes.root).map_err(js_err)?;
            }
        }

        if let Some(old) = self.cards.borrow_mut().insert(card.id.clone(), nodes) {
            old.root.remove();
        }
        Ok(())
    }
}
