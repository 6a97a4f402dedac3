//! Schema guard: structural checks on a normalized candidate triple

use serde_json::Value;

use crate::contracts::DocKind;
use crate::schemas::{doc_schema, required_fields};

/// Why a candidate was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    NotAnObject,
    MissingText,
    TextNotObject,
    MissingField(String),
    BlankField(String),
    FieldNotString(String),
    NotStringList(&'static str),
    WrongType { field: String, expected: String },
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaViolation::NotAnObject => write!(f, "payload is not an object"),
            SchemaViolation::MissingText => write!(f, "missing 'text'"),
            SchemaViolation::TextNotObject => write!(f, "'text' is not an object"),
            SchemaViolation::MissingField(k) => write!(f, "missing required field '{}'", k),
            SchemaViolation::BlankField(k) => write!(f, "required field '{}' is empty", k),
            SchemaViolation::FieldNotString(k) => write!(f, "required field '{}' is not a string", k),
            SchemaViolation::NotStringList(k) => write!(f, "'{}' is not a list of strings", k),
            SchemaViolation::WrongType { field, expected } => {
                write!(f, "field '{}' does not match declared type '{}'", field, expected)
            }
        }
    }
}

/// Check `candidate` against the contract for `kind`, reporting the first violation
pub fn check(kind: DocKind, candidate: &Value) -> Result<(), SchemaViolation> {
    let obj = candidate.as_object().ok_or(SchemaViolation::NotAnObject)?;

    let text = match obj.get("text") {
        None | Some(Value::Null) => return Err(SchemaViolation::MissingText),
        Some(t) => t.as_object().ok_or(SchemaViolation::TextNotObject)?,
    };

    for field in required_fields(kind) {
        match text.get(&field) {
            None | Some(Value::Null) => return Err(SchemaViolation::MissingField(field)),
            Some(Value::String(s)) if s.trim().is_empty() => {
                return Err(SchemaViolation::BlankField(field));
            }
            Some(Value::String(_)) => {}
            Some(_) => return Err(SchemaViolation::FieldNotString(field)),
        }
    }

    let required = required_fields(kind);
    let schema = doc_schema(kind);
    if let Some(props) = schema.get("properties").and_then(Value::as_object) {
        for (field, prop) in props {
            if required.contains(field) {
                continue;
            }
            let declared = prop.get("type").and_then(Value::as_str).unwrap_or("string");
            if let Some(v) = text.get(field)
                && !conforms(declared, v)
            {
                return Err(SchemaViolation::WrongType {
                    field: field.clone(),
                    expected: declared.to_string(),
                });
            }
        }
    }

    for key in ["terms_used", "warnings"] {
        if let Some(v) = obj.get(key)
            && !is_string_list(v)
        {
            return Err(SchemaViolation::NotStringList(key));
        }
    }

    Ok(())
}

/// Whether `candidate` satisfies the contract for `kind`. Never panics.
pub fn validate(kind: DocKind, candidate: &Value) -> bool {
    check(kind, candidate).is_ok()
}

/// Whether an optional property value is one the typed payload accepts.
///
/// String and array properties take null, a scalar, or an array of scalars.
/// Integer properties take null, a number, or a numeric string.
fn conforms(declared: &str, v: &Value) -> bool {
    match declared {
        "integer" => match v {
            Value::Null | Value::Number(_) => true,
            Value::String(s) => {
                let s = s.trim();
                s.is_empty() || s.parse::<f64>().is_ok_and(f64::is_finite)
            }
            _ => false,
        },
        _ => match v {
            Value::Object(_) => false,
            Value::Array(items) => items.iter().all(is_scalar),
            _ => true,
        },
    }
}

fn is_scalar(v: &Value) -> bool {
    !matches!(v, Value::Array(_) | Value::Object(_))
}

fn is_string_list(v: &Value) -> bool {
    v.as_array()
        .is_some_and(|arr| arr.iter().all(Value::is_string))
}
