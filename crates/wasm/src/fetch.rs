//! `fetch` on both sides of the proxy.
//!
//! A slave swaps `window.fetch` for a function that ships the request to
//! the master. The master runs it with its real `fetch` and sends back the
//! fully read response.

use std::rc::Rc;

use anyhow::anyhow;
use js_sys::{Array, Object, Promise, TypeError, Uint8Array};
use responsive_review_core::location;
use responsive_review_core::sync::{
    FetchExecutor, FetchProxy, ProxiedResponse, RequestParts, normalize_request,
};
use responsive_review_protocol::{Body, FetchOptions, Headers, ResponseType};
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise};
use web_sys::{Request, RequestInit, Response, ResponseInit, Window};

use crate::js::{self, describe, js_err};

const TARGET: &str = "responsive_review::fetch";

fn type_error(message: &str) -> JsValue {
    TypeError::new(message).into()
}

/// Replace `window.fetch` with the proxied version. The page keeps calling
/// `fetch(input, init)` as usual and gets a regular `Response` back.
pub fn install_proxy(window: &Window, proxy: Rc<FetchProxy>) -> anyhow::Result<()> {
    let global = window.clone();
    let proxied = Closure::<dyn FnMut(JsValue, JsValue) -> Promise>::new(
        move |input: JsValue, init: JsValue| {
            let proxy = Rc::clone(&proxy);
            let global = global.clone();
            future_to_promise(async move {
                let (url, options) = read_call(&global, &input, &init)
                    .await
                    .map_err(|e| type_error(&format!("{e:#}")))?;
                let response = proxy
                    .fetch(url, options)
                    .await
                    .map_err(|e| type_error(&e.to_string()))?;
                build_response(response)
                    .map(JsValue::from)
                    .map_err(|e| type_error(&format!("{e:#}")))
            })
        },
    );
    js::set(window, "fetch", proxied.as_ref())?;
    proxied.forget();
    Ok(())
}

async fn read_call(
    window: &Window,
    input: &JsValue,
    init: &JsValue,
) -> anyhow::Result<(String, FetchOptions)> {
    let (url, request) = match input.dyn_ref::<Request>() {
        Some(request) => (request.url(), Some(request_parts(request).await?)),
        None => {
            let raw = input
                .as_string()
                .unwrap_or_else(|| String::from(input.unchecked_ref::<Object>().to_string()));
            let base = window.location().href().map_err(js_err)?;
            (location::resolve(&base, &raw).unwrap_or(raw), None)
        }
    };
    let init = init_parts(window, init).await?;
    Ok((url, normalize_request(request, init)))
}

fn scalar_parts(source: &JsValue) -> RequestParts {
    RequestParts {
        method: js::get_string(source, "method"),
        mode: js::get_string(source, "mode"),
        credentials: js::get_string(source, "credentials"),
        cache: js::get_string(source, "cache"),
        redirect: js::get_string(source, "redirect"),
        referrer: js::get_string(source, "referrer"),
        referrer_policy: js::get_string(source, "referrerPolicy"),
        integrity: js::get_string(source, "integrity"),
        keepalive: js::get(source, "keepalive").as_bool(),
        ..RequestParts::default()
    }
}

async fn request_parts(request: &Request) -> anyhow::Result<RequestParts> {
    let mut parts = scalar_parts(request);
    parts.headers = Some(flatten_headers(&request.headers()));
    if !matches!(request.method().as_str(), "GET" | "HEAD") {
        // Read a copy so the page can still consume the original.
        match request.clone() {
            Ok(copy) => {
                let body = read_bytes(copy.array_buffer().map_err(js_err)?).await?;
                parts.body = (!body.is_empty()).then_some(body);
            }
            Err(e) => {
                warn!(target: TARGET, error = %describe(&e), "request body already used; sending without it");
            }
        }
    }
    Ok(parts)
}

async fn init_parts(window: &Window, init: &JsValue) -> anyhow::Result<RequestParts> {
    if !init.is_object() {
        return Ok(RequestParts::default());
    }
    let mut parts = scalar_parts(init);

    let headers = js::get(init, "headers");
    if !headers.is_undefined() && !headers.is_null() {
        // Plain objects, pair lists and `Headers` all go through the
        // `Headers` constructor.
        let headers: web_sys::Headers = js::construct(window, "Headers", &Array::of1(&headers))?
            .dyn_into()
            .map_err(|_| anyhow!("Headers constructor returned something else"))?;
        parts.headers = Some(flatten_headers(&headers));
    }

    let body = js::get(init, "body");
    if !body.is_undefined() && !body.is_null() {
        // Let `Response` do the body extraction for every BodyInit type.
        let reader: Response = js::construct(window, "Response", &Array::of1(&body))?
            .dyn_into()
            .map_err(|_| anyhow!("Response constructor returned something else"))?;
        parts.body_type = reader.headers().get("content-type").map_err(js_err)?;
        parts.body = Some(read_bytes(reader.array_buffer().map_err(js_err)?).await?);
    }

    parts.has_signal = js::get(init, "signal").is_truthy();
    Ok(parts)
}

async fn read_bytes(buffer: Promise) -> anyhow::Result<Body> {
    let buffer = JsFuture::from(buffer).await.map_err(js_err)?;
    Ok(Body::from(Uint8Array::new(&buffer).to_vec()))
}

fn flatten_headers(headers: &web_sys::Headers) -> Headers {
    let mut flat = Headers::new();
    if let Ok(Some(entries)) = js_sys::try_iter(headers) {
        for entry in entries.flatten() {
            let pair = Array::from(&entry);
            if let (Some(name), Some(value)) = (pair.get(0).as_string(), pair.get(1).as_string()) {
                flat.insert(name, value);
            }
        }
    }
    flat
}

/// Statuses for which `new Response(body)` must not carry a body.
fn is_null_body_status(status: u16) -> bool {
    matches!(status, 101 | 204 | 205 | 304)
}

fn build_response(proxied: ProxiedResponse) -> anyhow::Result<Response> {
    let response = if (200..=599).contains(&proxied.status) {
        let headers = web_sys::Headers::new().map_err(js_err)?;
        for (name, value) in &proxied.headers {
            headers.append(name, value).map_err(js_err)?;
        }
        let init = ResponseInit::new();
        init.set_status(proxied.status);
        init.set_status_text(&proxied.status_text);
        init.set_headers(&headers);

        let body = (!proxied.body.is_empty() && !is_null_body_status(proxied.status))
            .then(|| Uint8Array::from(proxied.body.as_bytes()));
        Response::new_with_opt_buffer_source_and_init(
            body.as_ref().map(|bytes| bytes.unchecked_ref::<Object>()),
            &init,
        )
        .map_err(js_err)?
    } else {
        // Opaque answers (status 0) cannot be constructed directly.
        Response::error()
    };

    // Fields the constructor cannot set.
    for (key, value) in [
        ("url", JsValue::from_str(&proxied.url)),
        ("redirected", JsValue::from_bool(proxied.redirected)),
        ("type", JsValue::from_str(proxied.response_type.as_str())),
    ] {
        let descriptor = Object::new();
        js::set(&descriptor, "value", &value)?;
        Object::define_property(&response, &JsValue::from_str(key), &descriptor);
    }
    Ok(response)
}

/// The master's real network.
pub struct BrowserNetwork {
    window: Window,
}

impl BrowserNetwork {
    pub fn new(window: Window) -> Self {
        Self { window }
    }

    async fn perform(&self, url: &str, options: &FetchOptions) -> anyhow::Result<ProxiedResponse> {
        let init = request_init(options)?;
        let promise = self
            .window
            .fetch_with_str_and_init(url, init.unchecked_ref::<RequestInit>());
        let response: Response = JsFuture::from(promise)
            .await
            .map_err(js_err)?
            .dyn_into()
            .map_err(|_| anyhow!("fetch resolved to something other than a Response"))?;

        let headers = flatten_headers(&response.headers());
        let body = read_bytes(response.array_buffer().map_err(js_err)?).await?;
        debug!(target: TARGET, %url, status = response.status(), bytes = body.len(), "relayed");
        Ok(ProxiedResponse {
            status: response.status(),
            status_text: response.status_text(),
            headers,
            body,
            url: response.url(),
            redirected: response.redirected(),
            response_type: response_type(response.type_()),
        })
    }
}

impl FetchExecutor for BrowserNetwork {
    async fn execute(&self, url: &str, options: &FetchOptions) -> Result<ProxiedResponse, String> {
        self.perform(url, options).await.map_err(|e| format!("{e:#}"))
    }
}

fn response_type(kind: web_sys::ResponseType) -> ResponseType {
    match kind {
        web_sys::ResponseType::Cors => ResponseType::Cors,
        web_sys::ResponseType::Default => ResponseType::Default,
        web_sys::ResponseType::Error => ResponseType::Error,
        web_sys::ResponseType::Opaque => ResponseType::Opaque,
        web_sys::ResponseType::Opaqueredirect => ResponseType::OpaqueRedirect,
        _ => ResponseType::Basic,
    }
}

/// Plain init dictionary for the real `fetch`.
fn request_init(options: &FetchOptions) -> anyhow::Result<Object> {
    let init = Object::new();
    js::set(&init, "method", &JsValue::from_str(&options.method))?;

    let headers = Object::new();
    for (name, value) in &options.headers {
        js::set(&headers, name, &JsValue::from_str(value))?;
    }
    js::set(&init, "headers", &headers)?;

    if let Some(body) = &options.body {
        js::set(&init, "body", &Uint8Array::from(body.as_bytes()))?;
    }
    for (key, value) in [
        ("mode", &options.mode),
        ("credentials", &options.credentials),
        ("cache", &options.cache),
        ("redirect", &options.redirect),
        ("referrer", &options.referrer),
        ("referrerPolicy", &options.referrer_policy),
        ("integrity", &options.integrity),
    ] {
        if let Some(value) = value {
            js::set(&init, key, &JsValue::from_str(value))?;
        }
    }
    if let Some(keepalive) = options.keepalive {
        js::set(&init, "keepalive", &JsValue::from_bool(keepalive))?;
    }
    Ok(init)
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

    use super::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn window() -> Window {
        web_sys::window().unwrap()
    }

    fn post_init(body: &JsValue) -> Object {
        let init = Object::new();
        js::set(&init, "method", &JsValue::from_str("POST")).unwrap();
        js::set(&init, "body", body).unwrap();
        init
    }

    #[wasm_bindgen_test]
    async fn form_bodies_keep_their_implied_content_type() {
        let window = window();
        let params =
            js::construct(&window, "URLSearchParams", &Array::of1(&JsValue::from_str("a=1"))).unwrap();

        let (url, options) = read_call(&window, &JsValue::from_str("/api/items"), &post_init(&params))
            .await
            .unwrap();

        assert!(url.ends_with("/api/items"));
        assert_eq!(options.body, Some(Body::from("a=1")));
        assert_eq!(
            options.headers.get("content-type").map(String::as_str),
            Some("application/x-www-form-urlencoded;charset=UTF-8")
        );
    }

    #[wasm_bindgen_test]
    async fn consumed_request_is_sent_without_its_body() {
        let window = window();
        let init = post_init(&JsValue::from_str("payload"));
        let request =
            Request::new_with_str_and_init("https://api.test/items", init.unchecked_ref::<RequestInit>())
                .unwrap();
        let _ = request.text().unwrap();
        assert!(request.body_used());

        let (url, options) = read_call(&window, &request, &JsValue::UNDEFINED).await.unwrap();

        assert_eq!(url, "https://api.test/items");
        assert_eq!(options.method, "POST");
        assert_eq!(options.body, None);
    }
}
