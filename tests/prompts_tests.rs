//! Prompt composition

use chirality_core::contracts::{DataSheet, DocText, Evidence, Guidance, Procedure, Triple};
use chirality_core::prompts::{
    GENERATION_CONSTRAINTS, MAX_EVIDENCE, build_system, compose, constraints_checksum,
};
use chirality_core::{DocKind, Finals, Problem};

fn problem() -> Problem {
    Problem {
        title: "Cooling loop".into(),
        statement: "Pump cavitation in the secondary loop".into(),
        initial_vector: vec!["inspect impeller".into(), "check NPSH".into()],
    }
}

fn evidence(n: usize) -> Vec<Evidence> {
    (0..n)
        .map(|i| Evidence {
            citation_id: format!("CIT:doc#{i}"),
            snippet: format!("snippet {i}"),
        })
        .collect()
}

fn finals_through_x() -> Finals {
    let mut finals = Finals::default();
    finals.accept(Triple::new(DocText::Ds(DataSheet {
        data_field: "Suction pressure".into(),
        ..Default::default()
    })));
    finals.accept(Triple::new(DocText::Sp(Procedure {
        step: "Measure suction".into(),
        ..Default::default()
    })));
    finals.accept(Triple::new(DocText::X(Guidance {
        heading: "Cavitation".into(),
        narrative: "Raise suction head.".into(),
        ..Default::default()
    })));
    finals
}

#[test]
fn test_user_prompt_sections() {
    let p = compose(DocKind::M, &problem(), &finals_through_x(), &evidence(2));
    let user = &p.user;
    assert!(user.starts_with("TARGET: M (Solution Statement)"));
    assert!(user.contains("Pump cavitation in the secondary loop"));
    assert!(user.contains("- check NPSH"));
    assert!(user.contains("[DS] field: Suction pressure"));
    assert!(user.contains("[SP] step: Measure suction"));
    assert!(user.contains("[X] heading: Cavitation"));
    assert!(user.contains("[CIT:doc#1] snippet 1"));
    for c in GENERATION_CONSTRAINTS {
        assert!(user.contains(c));
    }
    assert!(user.contains(&constraints_checksum()[..8]));
    assert!(user.contains("\"statement\""));
}

#[test]
fn test_upstream_excludes_later_kinds() {
    let p = compose(DocKind::Sp, &problem(), &finals_through_x(), &[]);
    assert!(p.user.contains("[DS]"));
    assert!(!p.user.contains("[X]"));
    assert!(!p.user.contains("[SP]"));
    assert!(p.user.contains("(none retrieved)"));
}

#[test]
fn test_evidence_is_bounded() {
    let p = compose(DocKind::Ds, &problem(), &Finals::default(), &evidence(20));
    let lines = p.user.lines().filter(|l| l.starts_with("[CIT:")).count();
    assert_eq!(lines, MAX_EVIDENCE);
}

#[test]
fn test_system_prompt_lists_finalized_kinds() {
    assert!(build_system("T", &Finals::default()).contains("none yet"));
    let system = build_system("Cooling loop", &finals_through_x());
    assert!(system.contains("\"Cooling loop\""));
    assert!(system.contains("DS (Data Sheet), SP (Standard Procedure), X (Guidance Document)"));
    assert!(system.contains("\"terms_used\""));
}

#[test]
fn test_composition_is_deterministic() {
    let a = compose(DocKind::X, &problem(), &finals_through_x(), &evidence(3));
    let b = compose(DocKind::X, &problem(), &finals_through_x(), &evidence(3));
    assert_eq!(a, b);
    assert_eq!(constraints_checksum().len(), 40);
}
