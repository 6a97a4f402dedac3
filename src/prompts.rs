//! Prompt composition for document generation.
//!
//! Everything here is a pure function of its inputs. The constraint list is
//! fixed and versioned together with the output contracts; its SHA-1 is stamped
//! into every user prompt so a payload can be traced to the constraint set
//! that produced it.

use crate::compactor::compact_upstream;
use crate::contracts::{DocKind, Evidence, Finals, Problem};
use crate::schemas::triple_schema;

/// Evidence lines embedded in a single prompt
pub const MAX_EVIDENCE: usize = 12;

pub const CONSTRAINTS_VERSION: &str = "1";

pub const GENERATION_CONSTRAINTS: &[&str] = &[
    "Prefer cited evidence when available.",
    "Populate source_refs/refs/trace_back with citation IDs (CIT:src#p).",
    "No filler; keep payload fields crisp and specific.",
];

/// Git-style SHA-1 of the constraint text
pub fn constraints_checksum() -> String {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(CONSTRAINTS_VERSION);
    for c in GENERATION_CONSTRAINTS {
        hasher.update(b"\n");
        hasher.update(c);
    }
    format!("{:x}", hasher.finalize())
}

/// Everything the user prompt embeds besides the target kind
#[derive(Debug, Clone)]
pub struct UserPromptInput<'a> {
    pub problem_statement: &'a str,
    pub initial_vector: &'a [String],
    pub upstream: Vec<(DocKind, String)>,
    pub retrieved: &'a [Evidence],
    pub constraints: &'a [&'a str],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    pub system: String,
    pub user: String,
}

pub fn build_system(title: &str, finals: &Finals) -> String {
    let decided = finals.produced();
    let decided = if decided.is_empty() {
        "none yet".to_string()
    } else {
        decided
            .iter()
            .map(|k| format!("{} ({})", k, k.title()))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "You are a careful analyst producing structured, evidence-grounded documents \
         for the problem \"{title}\".\n\
         Documents already finalized: {decided}. Stay consistent with them unless the \
         evidence requires a change.\n\
         Respond with a single JSON object of the form \
         {{\"text\": {{...}}, \"terms_used\": [string], \"warnings\": [string]}}. \
         Put the document fields directly inside \"text\". No prose outside the JSON."
    )
}

pub fn build_user(kind: DocKind, input: &UserPromptInput<'_>) -> String {
    let mut out = String::new();

    out.push_str(&format!("TARGET: {} ({})\n\n", kind, kind.title()));

    out.push_str("PROBLEM STATEMENT:\n");
    out.push_str(input.problem_statement.trim());
    out.push_str("\n\n");

    if !input.initial_vector.is_empty() {
        out.push_str("INITIAL VECTOR:\n");
        for v in input.initial_vector {
            out.push_str(&format!("- {}\n", v.trim()));
        }
        out.push('\n');
    }

    if !input.upstream.is_empty() {
        out.push_str("UPSTREAM (compacted finals):\n");
        for (k, compact) in &input.upstream {
            out.push_str(&format!("[{}] {}\n", k, compact));
        }
        out.push('\n');
    }

    out.push_str("EVIDENCE:\n");
    if input.retrieved.is_empty() {
        out.push_str("(none retrieved)\n");
    } else {
        for e in input.retrieved.iter().take(MAX_EVIDENCE) {
            out.push_str(&format!("[{}] {}\n", e.citation_id, e.snippet.trim()));
        }
    }
    out.push('\n');

    out.push_str(&format!(
        "CONSTRAINTS (v{} #{}):\n",
        CONSTRAINTS_VERSION,
        &constraints_checksum()[..8]
    ));
    for c in input.constraints {
        out.push_str(&format!("- {}\n", c));
    }
    out.push('\n');

    out.push_str("OUTPUT CONTRACT (JSON schema):\n");
    out.push_str(&triple_schema(kind).to_string());
    out.push('\n');

    out
}

/// Build both prompts for one generation
pub fn compose(
    kind: DocKind,
    problem: &Problem,
    finals: &Finals,
    retrieved: &[Evidence],
) -> ComposedPrompt {
    let input = UserPromptInput {
        problem_statement: &problem.statement,
        initial_vector: &problem.initial_vector,
        upstream: compact_upstream(kind, finals),
        retrieved,
        constraints: GENERATION_CONSTRAINTS,
    };
    ComposedPrompt {
        system: build_system(&problem.title, finals),
        user: build_user(kind, &input),
    }
}
