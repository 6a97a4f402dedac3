//! Output contracts for each document kind, as JSON schema objects.
//!
//! The same schema is shown to the backend in the user prompt and read back by
//! the schema guard, so the prompt and the validator cannot drift apart.

use serde_json::{Map, Value, json};
use std::sync::Arc;

use crate::contracts::DocKind;

fn as_schema(schema: Value) -> Arc<Map<String, Value>> {
    Arc::new(schema.as_object().cloned().unwrap_or_else(Map::new))
}

pub fn ds_schema() -> Arc<Map<String, Value>> {
    as_schema(json!({
        "type": "object",
        "properties": {
            "data_field": {"type": "string"},
            "units": {"type": "string"},
            "type": {"type": "string"},
            "source_refs": {"type": "array", "items": {"type": "string"}},
            "notes": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["data_field"]
    }))
}

pub fn sp_schema() -> Arc<Map<String, Value>> {
    as_schema(json!({
        "type": "object",
        "properties": {
            "step": {"type": "string"},
            "purpose": {"type": "string"},
            "inputs": {"type": "array", "items": {"type": "string"}},
            "outputs": {"type": "array", "items": {"type": "string"}},
            "preconditions": {"type": "array", "items": {"type": "string"}},
            "postconditions": {"type": "array", "items": {"type": "string"}},
            "refs": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["step"]
    }))
}

pub fn x_schema() -> Arc<Map<String, Value>> {
    as_schema(json!({
        "type": "object",
        "properties": {
            "heading": {"type": "string"},
            "narrative": {"type": "string"},
            "precedents": {"type": "array", "items": {"type": "string"}},
            "successors": {"type": "array", "items": {"type": "string"}},
            "delta_notes": {"type": "array", "items": {"type": "string"}},
            "trace_back": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["heading", "narrative"]
    }))
}

pub fn z_schema() -> Arc<Map<String, Value>> {
    as_schema(json!({
        "type": "object",
        "properties": {
            "item": {"type": "string"},
            "rationale": {"type": "string"},
            "acceptance_criteria": {"type": "string"},
            "evidence": {"type": "array", "items": {"type": "string"}},
            "severity": {"type": "string", "enum": ["low", "medium", "high", "critical"]}
        },
        "required": ["item"]
    }))
}

pub fn m_schema() -> Arc<Map<String, Value>> {
    as_schema(json!({
        "type": "object",
        "properties": {
            "statement": {"type": "string"},
            "justification": {"type": "array", "items": {"type": "string"}},
            "trace_back": {"type": "array", "items": {"type": "string"}},
            "residual_risk": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["statement"]
    }))
}

pub fn w_schema() -> Arc<Map<String, Value>> {
    as_schema(json!({
        "type": "object",
        "properties": {
            "changed_keys": {"type": "array", "items": {"type": "string"}},
            "reason": {"type": "string"},
            "evidence": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["reason"]
    }))
}

pub fn u_schema() -> Arc<Map<String, Value>> {
    as_schema(json!({
        "type": "object",
        "properties": {
            "summary": {"type": "string"},
            "round": {"type": "integer", "minimum": 1},
            "convergence": {"type": "string", "enum": ["Closed", "Partial", "Open"]},
            "open_issues": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["summary"]
    }))
}

pub fn n_schema() -> Arc<Map<String, Value>> {
    as_schema(json!({
        "type": "object",
        "properties": {
            "lesson": {"type": "string"},
            "context": {"type": "string"},
            "applies_to": {"type": "array", "items": {"type": "string"}},
            "refs": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["lesson"]
    }))
}

/// Schema for the `text` payload of `kind`
pub fn doc_schema(kind: DocKind) -> Arc<Map<String, Value>> {
    match kind {
        DocKind::Ds => ds_schema(),
        DocKind::Sp => sp_schema(),
        DocKind::X => x_schema(),
        DocKind::Z => z_schema(),
        DocKind::M => m_schema(),
        DocKind::W => w_schema(),
        DocKind::U => u_schema(),
        DocKind::N => n_schema(),
    }
}

/// Schema for the full `{text, terms_used, warnings}` envelope of `kind`
pub fn triple_schema(kind: DocKind) -> Value {
    json!({
        "type": "object",
        "properties": {
            "text": Value::Object((*doc_schema(kind)).clone()),
            "terms_used": {"type": "array", "items": {"type": "string"}},
            "warnings": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["text"]
    })
}

/// Field names the kind's schema marks required
pub fn required_fields(kind: DocKind) -> Vec<String> {
    doc_schema(kind)
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_required_field_is_a_declared_string_property() {
        for kind in DocKind::ALL {
            let schema = doc_schema(kind);
            let required = required_fields(kind);
            assert!(!required.is_empty(), "{kind} has no required field");
            for field in required {
                assert_eq!(
                    schema["properties"][&field]["type"], "string",
                    "{kind}.{field} should be a string property"
                );
            }
        }
    }

    #[test]
    fn x_requires_heading_and_narrative() {
        assert_eq!(required_fields(DocKind::X), vec!["heading", "narrative"]);
    }
}
