//! Round driver: repeatedly produces the primary documents and tracks convergence

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::contracts::{
    Convergence, ConvergenceResult, DiffResult, DocKind, DocText, Finals, Problem, Round, Triple,
};
use crate::orchestrate::{Orchestrator, fallback_triple};
use crate::synthesis::{diff_w, synthesize_u};

#[derive(Debug, Clone)]
pub struct RoundOptions {
    pub max_rounds: Round,
    /// Caller-level bound on a single `produce` call
    pub produce_timeout: Duration,
    pub stop_on_closed: bool,
}

impl Default for RoundOptions {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            produce_timeout: Duration::from_secs(180),
            stop_on_closed: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundRecord {
    pub round: Round,
    pub triples: Vec<Triple>,
    /// Field-level changes against the previous round's final, per kind
    pub diffs: Vec<(DocKind, DiffResult)>,
    pub convergence: ConvergenceResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub problem: Problem,
    pub rounds: Vec<RoundRecord>,
    pub finals: Finals,
}

impl RoundReport {
    pub fn last_convergence(&self) -> Option<Convergence> {
        self.rounds.last().map(|r| r.convergence.convergence)
    }
}

/// Produce one kind with a caller-level timeout; elapsed time yields a fallback
pub async fn produce_bounded(
    orchestrator: &Orchestrator,
    kind: DocKind,
    problem: &Problem,
    finals: &Finals,
    timeout: Duration,
) -> Triple {
    match tokio::time::timeout(timeout, orchestrator.produce(kind, problem, finals)).await {
        Ok(triple) => triple,
        Err(_) => {
            warn!(kind = %kind, timeout_ms = timeout.as_millis() as u64, "produce timed out");
            fallback_triple(
                kind,
                &format!("timed out after {}ms", timeout.as_millis()),
            )
        }
    }
}

pub async fn run_rounds(
    orchestrator: &Orchestrator,
    problem: &Problem,
    mut finals: Finals,
    options: &RoundOptions,
) -> RoundReport {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let mut rounds = Vec::new();

    for round in 1..=options.max_rounds {
        let mut triples = Vec::with_capacity(DocKind::PRIMARY.len());
        let mut diffs = Vec::new();

        for kind in DocKind::PRIMARY {
            let triple =
                produce_bounded(orchestrator, kind, problem, &finals, options.produce_timeout)
                    .await;
            if let Some(prev) = finals.text_value(kind) {
                diffs.push((kind, diff_w(&prev, &triple.text.to_value())));
            }
            finals.accept(triple.clone());
            triples.push(triple);
        }

        let convergence = synthesize_u(round, &finals);
        finals.accept(Triple::new(DocText::U(convergence.clone().into())));
        info!(
            %run_id,
            round,
            convergence = %convergence.convergence,
            open_issues = convergence.open_issues.len(),
            "round complete"
        );

        let closed = convergence.convergence == Convergence::Closed;
        rounds.push(RoundRecord {
            round,
            triples,
            diffs,
            convergence,
        });
        if closed && options.stop_on_closed {
            break;
        }
    }

    RoundReport {
        run_id,
        started_at,
        problem: problem.clone(),
        rounds,
        finals,
    }
}
