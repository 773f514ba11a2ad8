//! Reflection helpers for talking to SDK globals that have no bindings.

use js_sys::{Array, Function, Object, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

pub fn call_method(target: &JsValue, name: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let function = Reflect::get(target, &JsValue::from_str(name))?;
    let function = function.dyn_into::<Function>()?;
    function.apply(target, &Array::from_iter(args.iter().cloned()))
}

/// `new target[name](...args)`
pub fn construct(target: &JsValue, name: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let constructor = Reflect::get(target, &JsValue::from_str(name))?;
    let constructor = constructor.dyn_into::<Function>()?;
    Reflect::construct(&constructor, &Array::from_iter(args.iter().cloned()))
}

/// Walks `root.a.b.c`; fails on the first missing segment.
pub fn get_path(root: &JsValue, path: &[&str]) -> Result<JsValue, JsValue> {
    let mut current = root.clone();
    for segment in path {
        current = Reflect::get(&current, &JsValue::from_str(segment))?;
        if current.is_undefined() || current.is_null() {
            return Err(JsValue::from_str(&format!("missing {segment}")));
        }
    }
    Ok(current)
}

/// Plain object from key/value pairs.
pub fn object(entries: &[(&str, JsValue)]) -> Object {
    let object = Object::new();
    for (key, value) in entries {
        Reflect::set(&object, &JsValue::from_str(key), value).ok();
    }
    object
}

pub fn number(target: &JsValue, name: &str) -> Option<f64> {
    Reflect::get(target, &JsValue::from_str(name)).ok()?.as_f64()
}
