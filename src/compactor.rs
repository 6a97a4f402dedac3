//! Upstream compactor: condenses finalized documents into one-line context for later prompts

use crate::contracts::{
    DataSheet, DocKind, DocText, Finals, Guidance, Procedure, SolutionStatement,
};
use crate::utils::cap_text;

/// Upper bound on a compacted document, in bytes
pub const COMPACT_MAX_LEN: usize = 600;

const SEP: &str = " | ";

fn push(parts: &mut Vec<String>, label: &str, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        parts.push(format!("{label}: {value}"));
    }
}

fn push_list(parts: &mut Vec<String>, label: &str, values: &[String]) {
    let joined = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    push(parts, label, &joined);
}

fn finish(parts: Vec<String>) -> String {
    let mut out = parts.join(SEP);
    cap_text(&mut out, COMPACT_MAX_LEN);
    out
}

pub fn compact_ds(ds: &DataSheet) -> String {
    let mut parts = Vec::new();
    push(&mut parts, "field", &ds.data_field);
    push(&mut parts, "units", ds.units.as_deref().unwrap_or_default());
    push(&mut parts, "type", ds.data_type.as_deref().unwrap_or_default());
    push_list(&mut parts, "refs", &ds.source_refs);
    finish(parts)
}

pub fn compact_sp(sp: &Procedure) -> String {
    let mut parts = Vec::new();
    push(&mut parts, "step", &sp.step);
    push(&mut parts, "purpose", sp.purpose.as_deref().unwrap_or_default());
    push_list(&mut parts, "in", &sp.inputs);
    push_list(&mut parts, "out", &sp.outputs);
    push_list(&mut parts, "refs", &sp.refs);
    finish(parts)
}

pub fn compact_x(x: &Guidance) -> String {
    let mut narrative = x.narrative.trim().to_string();
    cap_text(&mut narrative, COMPACT_MAX_LEN / 2);
    let mut parts = Vec::new();
    push(&mut parts, "heading", &x.heading);
    push(&mut parts, "narrative", &narrative);
    push_list(&mut parts, "trace", &x.trace_back);
    finish(parts)
}

pub fn compact_m(m: &SolutionStatement) -> String {
    let mut parts = Vec::new();
    push(&mut parts, "statement", &m.statement);
    push_list(&mut parts, "risks", &m.residual_risk);
    push_list(&mut parts, "trace", &m.trace_back);
    finish(parts)
}

/// Compact one document, if its kind is one that feeds later prompts
pub fn compact_text(text: &DocText) -> Option<String> {
    match text {
        DocText::Ds(ds) => Some(compact_ds(ds)),
        DocText::Sp(sp) => Some(compact_sp(sp)),
        DocText::X(x) => Some(compact_x(x)),
        DocText::M(m) => Some(compact_m(m)),
        _ => None,
    }
}

/// Compacted finals for the kinds that causally precede `kind`, in causal order
pub fn compact_upstream(kind: DocKind, finals: &Finals) -> Vec<(DocKind, String)> {
    kind.upstream()
        .iter()
        .filter_map(|k| {
            let triple = finals.get(*k)?;
            compact_text(&triple.text).map(|c| (*k, c))
        })
        .collect()
}
