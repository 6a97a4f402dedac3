//! Deterministic synthesizers: field-level diff between two versions of a
//! document, and the round-level convergence verdict.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::contracts::{Convergence, ConvergenceResult, DiffResult, Finals, Round};

pub const AUTO_DIFF_REASON: &str = "Auto-diff";

/// Round at which a document set with residual risk is reported as Partial
pub const PARTIAL_CONVERGENCE_ROUND: Round = 3;

/// Top-level keys whose values differ between `prev` and `next`.
///
/// Non-object payloads count as empty objects. Symmetric in its arguments.
pub fn diff_w(prev: &Value, next: &Value) -> DiffResult {
    let empty = Map::new();
    let a = prev.as_object().unwrap_or(&empty);
    let b = next.as_object().unwrap_or(&empty);

    let changed_keys: BTreeSet<String> = a
        .keys()
        .chain(b.keys())
        .filter(|k| a.get(*k) != b.get(*k))
        .cloned()
        .collect();

    DiffResult {
        changed_keys,
        reason: AUTO_DIFF_REASON.to_string(),
        evidence: Vec::new(),
    }
}

/// [`diff_w`] over typed payloads
pub fn diff_docs<T: Serialize>(prev: &T, next: &T) -> DiffResult {
    let prev = serde_json::to_value(prev).unwrap_or(Value::Null);
    let next = serde_json::to_value(next).unwrap_or(Value::Null);
    diff_w(&prev, &next)
}

/// Convergence verdict for `round` from the residual risk on the current M final
pub fn synthesize_u(round: Round, finals: &Finals) -> ConvergenceResult {
    let open_issues: Vec<String> = finals
        .m
        .as_ref()
        .map(|m| m.text.residual_risk.clone())
        .unwrap_or_default();

    let convergence = if open_issues.is_empty() {
        Convergence::Closed
    } else if round == PARTIAL_CONVERGENCE_ROUND {
        Convergence::Partial
    } else {
        Convergence::Open
    };

    ConvergenceResult {
        round,
        convergence,
        open_issues,
        summary: format!("Round {}: {}.", round, convergence),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{DocText, SolutionStatement, Triple};
    use serde_json::json;

    fn finals_with_risks(risks: &[&str]) -> Finals {
        let mut finals = Finals::default();
        finals.accept(Triple::new(DocText::M(SolutionStatement {
            statement: "s".into(),
            residual_risk: risks.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        })));
        finals
    }

    #[test]
    fn diff_reports_changed_added_and_removed_keys() {
        let d = diff_w(
            &json!({"a": 1, "b": [1, 2], "c": "same"}),
            &json!({"a": 2, "b": [2, 1], "c": "same", "d": null}),
        );
        let keys: Vec<&str> = d.changed_keys.iter().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b", "d"]);
        assert_eq!(d.reason, AUTO_DIFF_REASON);
        assert!(d.evidence.is_empty());
    }

    #[test]
    fn non_object_is_treated_as_empty() {
        let d = diff_w(&json!("text"), &json!({"k": 1}));
        assert_eq!(d.changed_keys.len(), 1);
        assert!(diff_w(&json!(null), &json!([1])).changed_keys.is_empty());
    }

    #[test]
    fn typed_diff_matches_value_diff() {
        let a = SolutionStatement {
            statement: "one".into(),
            ..Default::default()
        };
        let b = SolutionStatement {
            statement: "two".into(),
            trace_back: vec!["CIT:x#1".into()],
            ..Default::default()
        };
        let d = diff_docs(&a, &b);
        assert!(d.changed_keys.contains("statement"));
        assert!(d.changed_keys.contains("trace_back"));
    }

    #[test]
    fn convergence_follows_round_and_risk() {
        assert_eq!(
            synthesize_u(1, &finals_with_risks(&[])).convergence,
            Convergence::Closed
        );
        assert_eq!(
            synthesize_u(1, &finals_with_risks(&["r"])).convergence,
            Convergence::Open
        );
        assert_eq!(
            synthesize_u(3, &finals_with_risks(&["r"])).convergence,
            Convergence::Partial
        );
        assert_eq!(
            synthesize_u(4, &finals_with_risks(&["r"])).convergence,
            Convergence::Open
        );
    }

    #[test]
    fn missing_m_counts_as_closed() {
        let u = synthesize_u(2, &Finals::default());
        assert_eq!(u.convergence, Convergence::Closed);
        assert_eq!(u.summary, "Round 2: Closed.");
    }
}
