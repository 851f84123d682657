//! The solve driver (C5): encodes a trial rectangle and runs the SAT solver
//! on a blocking thread, with a per-attempt timeout and external
//! cancellation (spec.md §4.5, §4.7).
//!
//! Uses a `spawn_blocking` + `Interrupter` split to keep the SAT solve off
//! the async runtime while still being interruptible, matched on a result
//! type distinguishing satisfiable/unsatisfiable/timed-out/cancelled.

use std::time::Duration;

use anyhow::anyhow;
use rustsat::instances::{BasicVarManager, SatInstance};
use rustsat::solvers::{Interrupt, Solve, SolverResult};
use rustsat::types::Assignment;
use rustsat_glucose::simp::Glucose as GlucoseSimp;
use tokio_util::sync::CancellationToken;

use crate::bounds::TrialSize;
use crate::config::SolverConfig;
use crate::encoder::{self, EncodedModel};
use crate::error::SolverError;
use crate::graph::ValidatedGraph;

/// The result of running a single trial rectangle to completion.
pub enum AttemptOutcome {
    Sat { model: EncodedModel, assignment: Assignment },
    Unsat,
}

/// Builds the CNF for `size` and solves it, honoring
/// `config.timeout_ms_per_attempt` and `cancel`.
pub async fn run_attempt(
    graph: &ValidatedGraph,
    size: TrialSize,
    iteration: u32,
    config: &SolverConfig,
    cancel: &CancellationToken,
) -> Result<AttemptOutcome, SolverError> {
    let mut instance: SatInstance<BasicVarManager> = SatInstance::new();
    let model = encoder::encode(graph, size, config, &mut instance);
    let (cnf, _var_manager) = instance.into_cnf();

    let mut solver = GlucoseSimp::default();
    solver
        .add_cnf(cnf)
        .map_err(|err| SolverError::internal(format!("failed to add CNF to solver: {err:#}")))?;
    let interrupter = solver.interrupter();

    let handle = tokio::task::spawn_blocking(move || -> anyhow::Result<(SolverResult, GlucoseSimp)> {
        Ok((solver.solve()?, solver))
    });
    let abort_handle = handle.abort_handle();

    let timeout_dur = Duration::from_millis(config.timeout_ms_per_attempt);

    log::debug!(
        target: "driver",
        "attempt {iteration} ({}x{}): solving with a {}ms timeout",
        size.width,
        size.height,
        timeout_dur.as_millis(),
    );

    tokio::select! {
        () = cancel.cancelled() => {
            log::debug!(target: "driver", "attempt {iteration} cancelled, interrupting solver");
            interrupter.interrupt();
            abort_handle.abort();
            Err(SolverError::Cancelled)
        }
        outcome = tokio::time::timeout(timeout_dur, handle) => {
            finish_attempt(outcome, iteration, size, &interrupter, model)
        }
    }
}

fn finish_attempt(
    outcome: Result<Result<anyhow::Result<(SolverResult, GlucoseSimp)>, tokio::task::JoinError>, tokio::time::error::Elapsed>,
    iteration: u32,
    size: TrialSize,
    interrupter: &<GlucoseSimp as Interrupt>::Interrupter,
    model: EncodedModel,
) -> Result<AttemptOutcome, SolverError> {
    let Ok(join_result) = outcome else {
        log::warn!(target: "driver", "attempt {iteration} ({}x{}) timed out", size.width, size.height);
        interrupter.interrupt();
        return Err(SolverError::SolverTimeout { iteration, width: size.width, height: size.height });
    };

    let (solver_result, mut solver) =
        join_result.map_err(|join_err| SolverError::from(anyhow!(join_err)))?.map_err(SolverError::from)?;

    match solver_result {
        SolverResult::Sat => {
            log::debug!(target: "driver", "attempt {iteration} ({}x{}) sat", size.width, size.height);
            let assignment = solver
                .full_solution()
                .map_err(|err| SolverError::internal(format!("failed to read solver assignment: {err:#}")))?;
            Ok(AttemptOutcome::Sat { model, assignment })
        }
        SolverResult::Unsat => {
            log::debug!(target: "driver", "attempt {iteration} ({}x{}) unsat", size.width, size.height);
            Ok(AttemptOutcome::Unsat)
        }
        SolverResult::Interrupted => {
            log::warn!(target: "driver", "attempt {iteration} ({}x{}) interrupted outside timeout/cancel", size.width, size.height);
            Err(SolverError::SolverUnknown {
                iteration,
                width: size.width,
                height: size.height,
                reason: "solver reported interrupted outside of a timeout or cancellation".to_string(),
            })
        }
    }
}
