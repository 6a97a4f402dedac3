//! Typed contracts for the generated documents and the state carried across rounds

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::deserializers::{
    de_lenient_list, de_lenient_set, de_lenient_string, de_option_u32_forgiving,
};
use crate::error::{ChiralityError, Result};

/// Iteration cycle number, starting at 1
pub type Round = u32;

/// Tag selecting which structured document a generation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocKind {
    #[serde(rename = "DS")]
    Ds,
    #[serde(rename = "SP")]
    Sp,
    X,
    Z,
    M,
    W,
    U,
    N,
}

impl DocKind {
    pub const ALL: [DocKind; 8] = [
        DocKind::Ds,
        DocKind::Sp,
        DocKind::X,
        DocKind::Z,
        DocKind::M,
        DocKind::W,
        DocKind::U,
        DocKind::N,
    ];

    /// Kinds produced on every round, in causal order
    pub const PRIMARY: [DocKind; 4] = [DocKind::Ds, DocKind::Sp, DocKind::X, DocKind::M];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocKind::Ds => "DS",
            DocKind::Sp => "SP",
            DocKind::X => "X",
            DocKind::Z => "Z",
            DocKind::M => "M",
            DocKind::W => "W",
            DocKind::U => "U",
            DocKind::N => "N",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DocKind::Ds => "Data Sheet",
            DocKind::Sp => "Standard Procedure",
            DocKind::X => "Guidance Document",
            DocKind::Z => "Checklist",
            DocKind::M => "Solution Statement",
            DocKind::W => "Iteration Delta",
            DocKind::U => "Cycle Synthesis",
            DocKind::N => "Learning Trace",
        }
    }

    /// Kinds whose finals feed this kind's prompt, in causal order.
    ///
    /// DS → SP → X → {Z, M} → {W, U, N}
    pub fn upstream(&self) -> &'static [DocKind] {
        match self {
            DocKind::Ds => &[],
            DocKind::Sp => &[DocKind::Ds],
            DocKind::X => &[DocKind::Ds, DocKind::Sp],
            DocKind::Z | DocKind::M => &[DocKind::Ds, DocKind::Sp, DocKind::X],
            DocKind::W | DocKind::U | DocKind::N => {
                &[DocKind::Ds, DocKind::Sp, DocKind::X, DocKind::M]
            }
        }
    }
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocKind {
    type Err = ChiralityError;

    fn from_str(s: &str) -> Result<Self> {
        DocKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ChiralityError::Config {
                message: format!(
                    "unknown document kind '{}'; expected one of DS, SP, X, Z, M, W, U, N",
                    s
                ),
            })
    }
}

/// Immutable problem input, supplied once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub title: String,
    pub statement: String,
    #[serde(default, alias = "initialVector")]
    pub initial_vector: Vec<String>,
}

/// A ranked evidence snippet returned by retrieval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub citation_id: String,
    pub snippet: String,
}

/// DS payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSheet {
    pub data_field: String,
    #[serde(default, deserialize_with = "de_lenient_string", skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "de_lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub data_type: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub source_refs: Vec<String>,
    #[serde(default, deserialize_with = "de_lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// SP payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    pub step: String,
    #[serde(default, deserialize_with = "de_lenient_string", skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
    #[serde(default, deserialize_with = "de_lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
    #[serde(default, deserialize_with = "de_lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub preconditions: Vec<String>,
    #[serde(default, deserialize_with = "de_lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub postconditions: Vec<String>,
    #[serde(default, deserialize_with = "de_lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<String>,
}

/// X payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Guidance {
    pub heading: String,
    pub narrative: String,
    #[serde(default, deserialize_with = "de_lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub precedents: Vec<String>,
    #[serde(default, deserialize_with = "de_lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub successors: Vec<String>,
    #[serde(default, deserialize_with = "de_lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub delta_notes: Vec<String>,
    #[serde(default, deserialize_with = "de_lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub trace_back: Vec<String>,
}

/// Z payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    pub item: String,
    #[serde(default, deserialize_with = "de_lenient_string", skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_string", skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
    #[serde(default, deserialize_with = "de_lenient_string", skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

/// M payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolutionStatement {
    pub statement: String,
    #[serde(default, deserialize_with = "de_lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub justification: Vec<String>,
    #[serde(default, deserialize_with = "de_lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub trace_back: Vec<String>,
    #[serde(default, deserialize_with = "de_lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub residual_risk: Vec<String>,
}

/// W payload, also the result of [`crate::synthesis::diff_w`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    #[serde(default, deserialize_with = "de_lenient_set")]
    pub changed_keys: BTreeSet<String>,
    pub reason: String,
    #[serde(default, deserialize_with = "de_lenient_list")]
    pub evidence: Vec<String>,
}

/// U payload as authored by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleSynthesis {
    pub summary: String,
    #[serde(default, deserialize_with = "de_option_u32_forgiving", skip_serializing_if = "Option::is_none")]
    pub round: Option<Round>,
    #[serde(default, deserialize_with = "de_lenient_string", skip_serializing_if = "Option::is_none")]
    pub convergence: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub open_issues: Vec<String>,
}

/// N payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningTrace {
    pub lesson: String,
    #[serde(default, deserialize_with = "de_lenient_string", skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub applies_to: Vec<String>,
    #[serde(default, deserialize_with = "de_lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<String>,
}

/// Qualitative verdict on whether a round resolved all residual risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Convergence {
    Closed,
    Partial,
    Open,
}

impl fmt::Display for Convergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Convergence::Closed => f.write_str("Closed"),
            Convergence::Partial => f.write_str("Partial"),
            Convergence::Open => f.write_str("Open"),
        }
    }
}

/// Round-level convergence verdict computed by [`crate::synthesis::synthesize_u`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceResult {
    pub round: Round,
    pub convergence: Convergence,
    pub open_issues: Vec<String>,
    pub summary: String,
}

impl From<ConvergenceResult> for CycleSynthesis {
    fn from(u: ConvergenceResult) -> Self {
        CycleSynthesis {
            summary: u.summary,
            round: Some(u.round),
            convergence: Some(u.convergence.to_string()),
            open_issues: u.open_issues,
        }
    }
}

/// Kind-specific payload of a triple. Serializes as the bare payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DocText {
    Ds(DataSheet),
    Sp(Procedure),
    X(Guidance),
    Z(Checklist),
    M(SolutionStatement),
    W(DiffResult),
    U(CycleSynthesis),
    N(LearningTrace),
}

impl DocText {
    pub fn kind(&self) -> DocKind {
        match self {
            DocText::Ds(_) => DocKind::Ds,
            DocText::Sp(_) => DocKind::Sp,
            DocText::X(_) => DocKind::X,
            DocText::Z(_) => DocKind::Z,
            DocText::M(_) => DocKind::M,
            DocText::W(_) => DocKind::W,
            DocText::U(_) => DocKind::U,
            DocText::N(_) => DocKind::N,
        }
    }

    /// Decode a JSON payload as the schema for `kind`
    pub fn from_value(kind: DocKind, value: Value) -> Result<Self> {
        let decoded = match kind {
            DocKind::Ds => serde_json::from_value(value).map(DocText::Ds),
            DocKind::Sp => serde_json::from_value(value).map(DocText::Sp),
            DocKind::X => serde_json::from_value(value).map(DocText::X),
            DocKind::Z => serde_json::from_value(value).map(DocText::Z),
            DocKind::M => serde_json::from_value(value).map(DocText::M),
            DocKind::W => serde_json::from_value(value).map(DocText::W),
            DocKind::U => serde_json::from_value(value).map(DocText::U),
            DocKind::N => serde_json::from_value(value).map(DocText::N),
        };
        decoded.map_err(|e| ChiralityError::SchemaViolation {
            kind,
            message: e.to_string(),
        })
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Result envelope for any generated document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triple<T = DocText> {
    pub text: T,
    #[serde(default)]
    pub terms_used: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl<T> Triple<T> {
    pub fn new(text: T) -> Self {
        Self {
            text,
            terms_used: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Triple<U> {
        Triple {
            text: f(self.text),
            terms_used: self.terms_used,
            warnings: self.warnings,
        }
    }
}

impl Triple<DocText> {
    pub fn kind(&self) -> DocKind {
        self.text.kind()
    }
}

/// Most recently accepted triple per kind. Owned by the round-driving caller
/// and borrowed read-only by each `produce` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Finals {
    #[serde(rename = "DS", default, skip_serializing_if = "Option::is_none")]
    pub ds: Option<Triple<DataSheet>>,
    #[serde(rename = "SP", default, skip_serializing_if = "Option::is_none")]
    pub sp: Option<Triple<Procedure>>,
    #[serde(rename = "X", default, skip_serializing_if = "Option::is_none")]
    pub x: Option<Triple<Guidance>>,
    #[serde(rename = "Z", default, skip_serializing_if = "Option::is_none")]
    pub z: Option<Triple<Checklist>>,
    #[serde(rename = "M", default, skip_serializing_if = "Option::is_none")]
    pub m: Option<Triple<SolutionStatement>>,
    #[serde(rename = "W", default, skip_serializing_if = "Option::is_none")]
    pub w: Option<Triple<DiffResult>>,
    #[serde(rename = "U", default, skip_serializing_if = "Option::is_none")]
    pub u: Option<Triple<CycleSynthesis>>,
    #[serde(rename = "N", default, skip_serializing_if = "Option::is_none")]
    pub n: Option<Triple<LearningTrace>>,
}

impl Finals {
    /// Store `triple` under its kind, returning the triple it replaced
    pub fn accept(&mut self, triple: Triple<DocText>) -> Option<Triple<DocText>> {
        let Triple {
            text,
            terms_used,
            warnings,
        } = triple;
        match text {
            DocText::Ds(t) => replace(&mut self.ds, t, terms_used, warnings, DocText::Ds),
            DocText::Sp(t) => replace(&mut self.sp, t, terms_used, warnings, DocText::Sp),
            DocText::X(t) => replace(&mut self.x, t, terms_used, warnings, DocText::X),
            DocText::Z(t) => replace(&mut self.z, t, terms_used, warnings, DocText::Z),
            DocText::M(t) => replace(&mut self.m, t, terms_used, warnings, DocText::M),
            DocText::W(t) => replace(&mut self.w, t, terms_used, warnings, DocText::W),
            DocText::U(t) => replace(&mut self.u, t, terms_used, warnings, DocText::U),
            DocText::N(t) => replace(&mut self.n, t, terms_used, warnings, DocText::N),
        }
    }

    pub fn get(&self, kind: DocKind) -> Option<Triple<DocText>> {
        match kind {
            DocKind::Ds => self.ds.clone().map(|t| t.map(DocText::Ds)),
            DocKind::Sp => self.sp.clone().map(|t| t.map(DocText::Sp)),
            DocKind::X => self.x.clone().map(|t| t.map(DocText::X)),
            DocKind::Z => self.z.clone().map(|t| t.map(DocText::Z)),
            DocKind::M => self.m.clone().map(|t| t.map(DocText::M)),
            DocKind::W => self.w.clone().map(|t| t.map(DocText::W)),
            DocKind::U => self.u.clone().map(|t| t.map(DocText::U)),
            DocKind::N => self.n.clone().map(|t| t.map(DocText::N)),
        }
    }

    pub fn contains(&self, kind: DocKind) -> bool {
        match kind {
            DocKind::Ds => self.ds.is_some(),
            DocKind::Sp => self.sp.is_some(),
            DocKind::X => self.x.is_some(),
            DocKind::Z => self.z.is_some(),
            DocKind::M => self.m.is_some(),
            DocKind::W => self.w.is_some(),
            DocKind::U => self.u.is_some(),
            DocKind::N => self.n.is_some(),
        }
    }

    /// The `text` payload of a kind's final as JSON
    pub fn text_value(&self, kind: DocKind) -> Option<Value> {
        self.get(kind).map(|t| t.text.to_value())
    }

    /// Kinds that have a final, in [`DocKind::ALL`] order
    pub fn produced(&self) -> Vec<DocKind> {
        DocKind::ALL
            .into_iter()
            .filter(|k| self.contains(*k))
            .collect()
    }
}

fn replace<T>(
    slot: &mut Option<Triple<T>>,
    text: T,
    terms_used: Vec<String>,
    warnings: Vec<String>,
    wrap: fn(T) -> DocText,
) -> Option<Triple<DocText>> {
    slot.replace(Triple {
        text,
        terms_used,
        warnings,
    })
    .map(|prev| prev.map(wrap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("ds".parse::<DocKind>().unwrap(), DocKind::Ds);
        assert_eq!(" SP ".parse::<DocKind>().unwrap(), DocKind::Sp);
        assert!("Q".parse::<DocKind>().is_err());
    }

    #[test]
    fn kind_serializes_as_short_tag() {
        assert_eq!(serde_json::to_value(DocKind::Ds).unwrap(), json!("DS"));
        assert_eq!(serde_json::to_value(DocKind::M).unwrap(), json!("M"));
    }

    #[test]
    fn data_sheet_round_trips_type_field() {
        let text = DocText::from_value(
            DocKind::Ds,
            json!({"data_field": "Flow rate", "type": "float", "source_refs": "CIT:a#1"}),
        )
        .unwrap();
        assert_eq!(
            text.to_value(),
            json!({"data_field": "Flow rate", "type": "float", "source_refs": ["CIT:a#1"]})
        );
    }

    #[test]
    fn accept_returns_previous_final() {
        let mut finals = Finals::default();
        let first = Triple::new(DocText::M(SolutionStatement {
            statement: "first".into(),
            ..Default::default()
        }));
        assert!(finals.accept(first.clone()).is_none());
        let second = Triple::new(DocText::M(SolutionStatement {
            statement: "second".into(),
            ..Default::default()
        }));
        assert_eq!(finals.accept(second), Some(first));
        assert_eq!(finals.produced(), vec![DocKind::M]);
        assert_eq!(
            finals.text_value(DocKind::M),
            Some(json!({"statement": "second"}))
        );
    }

    #[test]
    fn problem_accepts_camel_case_vector() {
        let p: Problem = serde_json::from_value(json!({
            "title": "t", "statement": "s", "initialVector": ["a"]
        }))
        .unwrap();
        assert_eq!(p.initial_vector, vec!["a".to_string()]);
    }
}
