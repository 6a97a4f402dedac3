//! Single-document production with a fail-soft boundary.
//!
//! `produce` is total: whatever happens in retrieval, generation or
//! validation, the caller gets a well-formed [`Triple`] of the requested kind.
//! Failures surface as a fallback payload plus a warning line.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::contracts::{
    Checklist, CycleSynthesis, DataSheet, DiffResult, DocKind, DocText, Finals, Guidance,
    LearningTrace, Problem, Procedure, SolutionStatement, Triple,
};
use crate::engine::GenerationEngine;
use crate::error::{ChiralityError, Result};
use crate::prompts::{MAX_EVIDENCE, compose};
use crate::rag::{Retriever, SNIPPET_MAX_CHARS, retrieve_summary};
use crate::{normalizer, validators};

pub const FALLBACK_TEXT: &str = "Error generating document";

/// Default number of snippets requested from retrieval
pub const DEFAULT_TOP_K: usize = MAX_EVIDENCE;

#[derive(Clone)]
pub struct Orchestrator {
    retriever: Arc<dyn Retriever>,
    engine: GenerationEngine,
    top_k: usize,
    snippet_max_chars: usize,
}

impl Orchestrator {
    pub fn new(retriever: Arc<dyn Retriever>, engine: GenerationEngine, top_k: usize) -> Self {
        Self {
            retriever,
            engine,
            top_k: top_k.max(1),
            snippet_max_chars: SNIPPET_MAX_CHARS,
        }
    }

    pub fn with_snippet_max_chars(mut self, max_chars: usize) -> Self {
        self.snippet_max_chars = max_chars.max(1);
        self
    }

    /// Produce one document. Never fails; errors and panics become a fallback triple.
    pub async fn produce(&self, kind: DocKind, problem: &Problem, finals: &Finals) -> Triple {
        let outcome = AssertUnwindSafe(self.try_produce(kind, problem, finals))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(triple)) => triple,
            Ok(Err(e)) => {
                warn!(kind = %kind, "produce failed, returning fallback: {}", e);
                fallback_triple(kind, &e.to_string())
            }
            Err(panic) => {
                let cause = panic_message(panic.as_ref());
                warn!(kind = %kind, "produce panicked, returning fallback: {}", cause);
                fallback_triple(kind, &cause)
            }
        }
    }

    /// The fallible pipeline behind [`Orchestrator::produce`]
    pub async fn try_produce(
        &self,
        kind: DocKind,
        problem: &Problem,
        finals: &Finals,
    ) -> Result<Triple> {
        let evidence = retrieve_summary(
            self.retriever.as_ref(),
            &problem.statement,
            self.top_k,
            self.snippet_max_chars,
        )
        .await;

        let prompt = compose(kind, problem, finals, &evidence);
        debug!(
            kind = %kind,
            evidence = evidence.len(),
            user_len = prompt.user.len(),
            "prompt composed"
        );

        let raw = self.engine.generate(&prompt.system, &prompt.user).await?;
        let candidate = normalizer::normalize(kind, raw);

        if let Err(violation) = validators::check(kind, &candidate) {
            warn!(kind = %kind, payload = %candidate, "schema guard rejected payload");
            return Err(ChiralityError::SchemaViolation {
                kind,
                message: violation.to_string(),
            });
        }

        decode_triple(kind, candidate)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("engine", &self.engine)
            .field("top_k", &self.top_k)
            .field("snippet_max_chars", &self.snippet_max_chars)
            .finish_non_exhaustive()
    }
}

fn decode_triple(kind: DocKind, candidate: Value) -> Result<Triple> {
    let envelope: Triple<Value> =
        serde_json::from_value(candidate).map_err(|e| ChiralityError::SchemaViolation {
            kind,
            message: e.to_string(),
        })?;
    Ok(Triple {
        text: DocText::from_value(kind, envelope.text)?,
        terms_used: envelope.terms_used,
        warnings: envelope.warnings,
    })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic: unknown cause".to_string()
    }
}

/// Placeholder triple for `kind`, carrying `cause` as its only warning
pub fn fallback_triple(kind: DocKind, cause: &str) -> Triple {
    let e = FALLBACK_TEXT.to_string();
    let text = match kind {
        DocKind::Ds => DocText::Ds(DataSheet {
            data_field: e,
            ..Default::default()
        }),
        DocKind::Sp => DocText::Sp(Procedure {
            step: e,
            ..Default::default()
        }),
        DocKind::X => DocText::X(Guidance {
            heading: "Error".to_string(),
            narrative: e,
            ..Default::default()
        }),
        DocKind::Z => DocText::Z(Checklist {
            item: e,
            ..Default::default()
        }),
        DocKind::M => DocText::M(SolutionStatement {
            statement: e,
            ..Default::default()
        }),
        DocKind::W => DocText::W(DiffResult {
            reason: e,
            ..Default::default()
        }),
        DocKind::U => DocText::U(CycleSynthesis {
            summary: e,
            ..Default::default()
        }),
        DocKind::N => DocText::N(LearningTrace {
            lesson: e,
            ..Default::default()
        }),
    };
    Triple {
        text,
        terms_used: Vec::new(),
        warnings: vec![format!("Generation failed: {}", cause)],
    }
}
