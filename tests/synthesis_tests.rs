//! Diff and convergence synthesizers

use chirality_core::contracts::{Convergence, DocText, SolutionStatement, Triple};
use chirality_core::synthesis::{PARTIAL_CONVERGENCE_ROUND, diff_w, synthesize_u};
use chirality_core::Finals;
use proptest::prelude::*;
use serde_json::{Map, Value, json};

fn finals_with_m(risks: Vec<String>) -> Finals {
    let mut finals = Finals::default();
    finals.accept(Triple::new(DocText::M(SolutionStatement {
        statement: "Install a relief valve".into(),
        residual_risk: risks,
        ..Default::default()
    })));
    finals
}

#[test]
fn test_diff_of_revised_procedure() {
    let prev = json!({"step": "Measure", "inputs": ["gauge"], "refs": ["CIT:a#1"]});
    let next = json!({"step": "Measure", "inputs": ["gauge", "log"], "purpose": "baseline"});
    let d = diff_w(&prev, &next);
    let keys: Vec<&str> = d.changed_keys.iter().map(String::as_str).collect();
    assert_eq!(keys, vec!["inputs", "purpose", "refs"]);
    assert_eq!(d.reason, "Auto-diff");
}

#[test]
fn test_nested_objects_compare_structurally() {
    let a = json!({"meta": {"x": 1, "y": 2}});
    let b = json!({"meta": {"y": 2, "x": 1}});
    assert!(diff_w(&a, &b).changed_keys.is_empty());
}

#[test]
fn test_partial_only_at_threshold_round() {
    let finals = finals_with_m(vec!["pressure spikes".into()]);
    for round in 1..=6 {
        let u = synthesize_u(round, &finals);
        let expected = if round == PARTIAL_CONVERGENCE_ROUND {
            Convergence::Partial
        } else {
            Convergence::Open
        };
        assert_eq!(u.convergence, expected, "round {round}");
        assert_eq!(u.open_issues, vec!["pressure spikes".to_string()]);
        assert!(u.summary.contains(&round.to_string()));
    }
}

#[test]
fn test_two_residual_risks_are_open_then_partial() {
    let risks = vec!["seal wear".to_string(), "pressure spikes".to_string()];
    let finals = finals_with_m(risks.clone());

    let u2 = synthesize_u(2, &finals);
    assert_eq!(u2.convergence, Convergence::Open);
    assert_eq!(u2.open_issues, risks);
    assert_eq!(u2.summary, "Round 2: Open.");

    let u3 = synthesize_u(3, &finals);
    assert_eq!(u3.convergence, Convergence::Partial);
    assert_eq!(u3.open_issues, risks);
    assert_eq!(u3.summary, "Round 3: Partial.");
}

#[test]
fn test_closed_has_no_open_issues() {
    let u = synthesize_u(3, &finals_with_m(Vec::new()));
    assert_eq!(u.convergence, Convergence::Closed);
    assert!(u.open_issues.is_empty());
    assert_eq!(u.summary, "Round 3: Closed.");
}

fn arb_object() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(
        "[a-e]",
        prop_oneof![
            Just(Value::Null),
            any::<i8>().prop_map(|n| json!(n)),
            "[xy]{0,2}".prop_map(Value::String),
            prop::collection::vec(any::<bool>(), 0..3).prop_map(|v| json!(v)),
        ],
        0..5,
    )
    .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>()))
}

proptest! {
    #[test]
    fn proptest_diff_is_symmetric(a in arb_object(), b in arb_object()) {
        prop_assert_eq!(diff_w(&a, &b).changed_keys, diff_w(&b, &a).changed_keys);
    }

    #[test]
    fn proptest_diff_with_self_is_empty(a in arb_object()) {
        prop_assert!(diff_w(&a, &a).changed_keys.is_empty());
    }

    #[test]
    fn proptest_changed_keys_come_from_inputs(a in arb_object(), b in arb_object()) {
        let d = diff_w(&a, &b);
        for k in &d.changed_keys {
            prop_assert!(a.get(k).is_some() || b.get(k).is_some());
            prop_assert_ne!(a.get(k), b.get(k));
        }
    }
}
