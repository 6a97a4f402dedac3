//! Lenient deserializers for model-authored document fields.
//!
//! The backend is free-form about optional fields: a list may arrive as a single
//! string, a string may arrive as a number. These helpers accept the harmless
//! variants. Objects, or nested values inside a list, are errors here and are
//! rejected earlier by `validators::check`, which applies the same rules.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserializes an optional string field.
///
/// # Accepted Formats
///
/// * **Null / missing** → `None`
/// * **String**: `"kg"` → `Some("kg")`; blank strings → `None`
/// * **Number / bool**: `42` → `Some("42")`
/// * **Array of scalars**: `["a", "b"]` → `Some("a, b")`
///
/// # Errors
///
/// Returns an error for objects, or arrays containing objects.
pub fn de_lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let opt = Option::<Value>::deserialize(deserializer)?;
    let Some(v) = opt else { return Ok(None) };
    match v {
        Value::Null => Ok(None),
        Value::String(s) => {
            if s.trim().is_empty() {
                Ok(None)
            } else {
                Ok(Some(s))
            }
        }
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(arr) => {
            let mut parts = Vec::with_capacity(arr.len());
            for el in arr {
                parts.push(scalar_to_string(el).map_err(D::Error::custom)?);
            }
            let joined = parts.join(", ");
            Ok(if joined.is_empty() { None } else { Some(joined) })
        }
        Value::Object(_) => Err(D::Error::custom("expected string, found object")),
    }
}

/// Deserializes a list-of-strings field with support for string, array, or null values.
///
/// # Accepted Formats
///
/// * **Null / missing**: → `vec![]`
/// * **String**: `"CIT:doc#p1"` → `vec!["CIT:doc#p1"]`
/// * **Array**: `["a", 2]` → `vec!["a", "2"]` (scalars converted to strings)
///
/// # Errors
///
/// Returns an error for objects and for arrays containing objects or arrays.
pub fn de_lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let opt = Option::<Value>::deserialize(deserializer)?;
    let Some(v) = opt else { return Ok(Vec::new()) };
    match v {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => {
            if s.trim().is_empty() {
                Ok(Vec::new())
            } else {
                Ok(vec![s])
            }
        }
        Value::Number(n) => Ok(vec![n.to_string()]),
        Value::Bool(b) => Ok(vec![b.to_string()]),
        Value::Array(arr) => {
            let mut out = Vec::with_capacity(arr.len());
            for el in arr {
                out.push(scalar_to_string(el).map_err(D::Error::custom)?);
            }
            Ok(out)
        }
        Value::Object(_) => Err(D::Error::custom("expected list of strings, found object")),
    }
}

/// Same as [`de_lenient_list`] but collapses into an ordered set.
pub fn de_lenient_set<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    de_lenient_list(deserializer).map(|v| v.into_iter().collect())
}

/// Deserializes Option<u32> accepting integers, floats (rounded), and numeric strings.
/// Examples: 3, 3.0, "3", "2.6" -> 3. Negative values clamp to 0.
pub fn de_option_u32_forgiving<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let opt = Option::<Value>::deserialize(deserializer)?;
    let Some(v) = opt else { return Ok(None) };
    let f = match v {
        Value::Null => return Ok(None),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| D::Error::custom("invalid numeric for u32"))?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<f64>()
                .map_err(|_| D::Error::custom(format!("invalid u32 value: '{}'", s)))?
        }
        other => return Err(D::Error::custom(format!("invalid type for u32: {}", other))),
    };
    if !f.is_finite() {
        return Err(D::Error::custom("non-finite numeric for u32"));
    }
    Ok(Some(f.round().clamp(0.0, u32::MAX as f64) as u32))
}

fn scalar_to_string(v: Value) -> Result<String, String> {
    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(format!("expected scalar list element, found {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Lenient {
        #[serde(default, deserialize_with = "de_lenient_string")]
        s: Option<String>,
        #[serde(default, deserialize_with = "de_lenient_list")]
        l: Vec<String>,
        #[serde(default, deserialize_with = "de_option_u32_forgiving")]
        n: Option<u32>,
    }

    #[test]
    fn single_string_becomes_list() {
        let p: Lenient = serde_json::from_str(r#"{"l": "CIT:a#1"}"#).unwrap();
        assert_eq!(p.l, vec!["CIT:a#1".to_string()]);
        assert!(p.s.is_none());
        assert!(p.n.is_none());
    }

    #[test]
    fn mixed_scalars_are_stringified() {
        let p: Lenient = serde_json::from_str(r#"{"s": 12, "l": ["a", 2, true], "n": "2.6"}"#).unwrap();
        assert_eq!(p.s.as_deref(), Some("12"));
        assert_eq!(p.l, vec!["a", "2", "true"]);
        assert_eq!(p.n, Some(3));
    }

    #[test]
    fn objects_are_rejected() {
        assert!(serde_json::from_str::<Lenient>(r#"{"s": {"a": 1}}"#).is_err());
        assert!(serde_json::from_str::<Lenient>(r#"{"l": [{"a": 1}]}"#).is_err());
    }
}
