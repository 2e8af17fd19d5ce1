use std::rc::Rc;

use anyhow::Context as _;
use gloo_events::EventListener;
use js_sys::JSON;
use responsive_review_core::sync::{ChannelError, SyncChannel, Transport};
use tracing::debug;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{BroadcastChannel, MessageEvent};

use crate::js::{describe, js_err};

const TARGET: &str = "responsive_review::channel";

/// Posts each encoded message as one structured-clone JSON object on a
/// `BroadcastChannel`, so plain JS peers can read `event.data.type`.
struct BroadcastTransport(BroadcastChannel);

impl Transport for BroadcastTransport {
    fn post(&self, text: &str) -> Result<(), ChannelError> {
        let object = JSON::parse(text).map_err(|e| ChannelError::Post(describe(&e)))?;
        self.0
            .post_message(&object)
            .map_err(|e| ChannelError::Post(describe(&e)))
    }
}

/// Wire text for one received `data` value. Objects are re-serialized;
/// strings from older peers are taken as-is.
fn received_text(data: &JsValue) -> Option<String> {
    if let Some(text) = data.as_string() {
        return Some(text);
    }
    if !data.is_object() {
        return None;
    }
    JSON::stringify(data).ok().map(String::from)
}

/// An open channel plus the listener feeding it. Dropping it closes the
/// channel.
pub struct BrowserChannel {
    pub channel: Rc<SyncChannel>,
    raw: BroadcastChannel,
    _listener: EventListener,
}

impl Drop for BrowserChannel {
    fn drop(&mut self) {
        self.raw.close();
    }
}

pub fn open(name: &str) -> anyhow::Result<BrowserChannel> {
    let raw = BroadcastChannel::new(name)
        .map_err(js_err)
        .context("BroadcastChannel API not supported")?;
    let channel = SyncChannel::new(name, BroadcastTransport(raw.clone()));

    let inbox = Rc::downgrade(&channel);
    let listener = EventListener::new(&raw, "message", move |event| {
        let Some(event) = event.dyn_ref::<MessageEvent>() else {
            return;
        };
        let Some(text) = received_text(&event.data()) else {
            debug!(target: TARGET, "ignoring message that is not a JSON object");
            return;
        };
        if let Some(channel) = inbox.upgrade() {
            channel.deliver(&text);
        }
    });

    Ok(BrowserChannel {
        channel,
        raw,
        _listener: listener,
    })
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use js_sys::{Function, Promise};
    use responsive_review_protocol::SyncMessage;
    use wasm_bindgen_futures::JsFuture;
    use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

    use super::*;
    use crate::js;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    async fn messages_travel_as_objects() {
        let name = "responsive-review-transport-test";
        let peer = BroadcastChannel::new(name).unwrap();
        let seen_by_peer = Promise::new(&mut |resolve, _| peer.set_onmessage(Some(&resolve)));

        let browser = open(name).unwrap();
        let mut resolve_kind: Option<Function> = None;
        let seen_by_us = Promise::new(&mut |resolve, _| resolve_kind = Some(resolve));
        let _subscription = {
            let resolve = resolve_kind.take().unwrap();
            browser.channel.subscribe(move |message| {
                let _ = resolve.call1(&JsValue::NULL, &JsValue::from_str(message.kind()));
            })
        };

        browser
            .channel
            .publish(&SyncMessage::ScrollUpdate { x: 0.0, y: 120.0 })
            .unwrap();
        let event: MessageEvent = JsFuture::from(seen_by_peer).await.unwrap().unchecked_into();
        let data = event.data();
        assert!(data.is_object());
        assert_eq!(js::get_string(&data, "type").as_deref(), Some("scroll-update"));
        assert_eq!(js::get(&data, "y").as_f64(), Some(120.0));

        let reply = JSON::parse(r#"{"type":"slave-navigated","url":"http://localhost/a"}"#).unwrap();
        peer.post_message(&reply).unwrap();
        let kind = JsFuture::from(seen_by_us).await.unwrap();
        assert_eq!(kind.as_string().as_deref(), Some("slave-navigated"));
        peer.close();
    }
}
