//! Small helpers over `Reflect` for the untyped corners of the DOM API.

use anyhow::anyhow;
use js_sys::{Array, Function, Reflect};
use wasm_bindgen::{JsCast, JsValue};

/// Human-readable text for a thrown JS value.
pub fn describe(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

pub fn js_err(value: JsValue) -> anyhow::Error {
    anyhow!(describe(&value))
}

/// Property lookup that never throws; missing reads as `undefined`.
pub fn get(target: &JsValue, key: &str) -> JsValue {
    Reflect::get(target, &JsValue::from_str(key)).unwrap_or(JsValue::UNDEFINED)
}

/// A non-empty string property.
pub fn get_string(target: &JsValue, key: &str) -> Option<String> {
    get(target, key).as_string().filter(|s| !s.is_empty())
}

pub fn set(target: &JsValue, key: &str, value: &JsValue) -> anyhow::Result<()> {
    Reflect::set(target, &JsValue::from_str(key), value).map_err(js_err)?;
    Ok(())
}

/// `new globalThis[class](...args)`.
pub fn construct(global: &JsValue, class: &str, args: &Array) -> anyhow::Result<JsValue> {
    let ctor: Function = get(global, class)
        .dyn_into()
        .map_err(|_| anyhow!("{class} is not available"))?;
    Reflect::construct(&ctor, args).map_err(js_err)
}
