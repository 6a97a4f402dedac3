//! Output normalizer: strips the known wrapper layers the backend adds around a triple.
//!
//! The list of recognized shapes is closed. Anything else passes through untouched
//! and is left for the schema guard to accept or reject.

use serde_json::{Map, Value};
use tracing::debug;

use crate::contracts::DocKind;

/// How a raw payload is laid out relative to the canonical `{text, terms_used, warnings}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperShape {
    /// `{ text: { KIND: payload }, terms_used, warnings }`
    WrappedUnderText,
    /// `{ KIND: payload, terms_used?, warnings? }` with no `text`
    DirectKind,
    /// Canonical, or a shape not in the list above
    PassThrough,
}

/// Classify `raw`, checking the wrapper shapes in fixed order
pub fn classify(kind: DocKind, raw: &Value) -> WrapperShape {
    let Some(obj) = raw.as_object() else {
        return WrapperShape::PassThrough;
    };
    let tag = kind.as_str();

    if let Some(Value::Object(text)) = obj.get("text")
        && text.get(tag).is_some_and(|v| !v.is_null())
    {
        return WrapperShape::WrappedUnderText;
    }

    let text_absent = obj.get("text").is_none_or(Value::is_null);
    if text_absent && obj.get(tag).is_some_and(|v| !v.is_null()) {
        return WrapperShape::DirectKind;
    }

    WrapperShape::PassThrough
}

/// Remove one recognized wrapper layer from `raw`.
///
/// The unwrap is applied only when its result is itself canonical, so a payload
/// wrapped twice comes back unchanged. That keeps `normalize` idempotent.
pub fn normalize(kind: DocKind, raw: Value) -> Value {
    let shape = classify(kind, &raw);
    let unwrapped = match shape {
        WrapperShape::PassThrough => return raw,
        WrapperShape::WrappedUnderText => unwrap_text(kind, &raw),
        WrapperShape::DirectKind => unwrap_direct(kind, &raw),
    };

    match unwrapped {
        Some(v) if classify(kind, &v) == WrapperShape::PassThrough => {
            debug!("Unwrapped {:?} layer for {}", shape, kind);
            v
        }
        _ => {
            debug!("Nested {} wrapper left in place", kind);
            raw
        }
    }
}

fn unwrap_text(kind: DocKind, raw: &Value) -> Option<Value> {
    let mut obj = raw.as_object()?.clone();
    let inner = obj.get("text")?.get(kind.as_str())?.clone();
    obj.insert("text".to_string(), inner);
    default_lists(&mut obj);
    Some(Value::Object(obj))
}

fn unwrap_direct(kind: DocKind, raw: &Value) -> Option<Value> {
    let obj = raw.as_object()?;
    let mut out = Map::new();
    out.insert("text".to_string(), obj.get(kind.as_str())?.clone());
    for key in ["terms_used", "warnings"] {
        if let Some(v) = obj.get(key) {
            out.insert(key.to_string(), v.clone());
        }
    }
    default_lists(&mut out);
    Some(Value::Object(out))
}

fn default_lists(obj: &mut Map<String, Value>) {
    for key in ["terms_used", "warnings"] {
        match obj.get(key) {
            None | Some(Value::Null) => {
                obj.insert(key.to_string(), Value::Array(Vec::new()));
            }
            Some(_) => {}
        }
    }
}
