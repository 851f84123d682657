//! The iterative controller (C7): the attempt loop / state machine
//! `{Idle, Solving(iteration, W, H), Done}` from spec.md §4.7.
//!
//! Re-solves at increasing trial bounds, logging each attempt at
//! `target: "controller"`, and streams progress via `async-stream`'s
//! `stream!` macro.

use std::time::Instant;

use async_stream::stream;
use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::bounds;
use crate::config::SolverConfig;
use crate::driver::{self, AttemptOutcome};
use crate::error::SolverError;
use crate::extractor;
use crate::graph::ValidatedGraph;
use crate::model::{Attempt, AttemptStatus, Bounds, LayoutSolution, StreamItem};

/// Runs the attempt loop to completion, yielding `attempt` events interleaved
/// with exactly one terminal `solution` event (spec.md §4.7).
pub fn run(
    graph: ValidatedGraph,
    config: SolverConfig,
    cancel: CancellationToken,
) -> impl Stream<Item = StreamItem> {
    stream! {
        let start = Instant::now();
        let mut attempts: Vec<Attempt> = Vec::new();
        let mut size = bounds::initial_size(&graph, &config);
        let mut k: u32 = 1;

        loop {
            if cancel.is_cancelled() {
                log::info!(target: "controller", "cancelled before attempt {k}");
                yield unknown_solution(size, attempts, elapsed_ms(start));
                return;
            }

            let outcome = driver::run_attempt(&graph, size, k, &config, &cancel).await;

            match outcome {
                Ok(AttemptOutcome::Sat { model, assignment }) => {
                    match extractor::extract(&graph, size, &model, &assignment) {
                        Ok((placements, segments)) => {
                            log::info!(target: "controller", "attempt {k} ({}x{}) sat", size.width, size.height);
                            yield StreamItem::Solution(LayoutSolution {
                                status: AttemptStatus::Sat,
                                bounds: Bounds { width: size.width, height: size.height },
                                placements,
                                segments,
                                attempts,
                                elapsed_ms: elapsed_ms(start),
                            });
                        }
                        Err(err) => {
                            log::error!(target: "controller", "extraction failed at attempt {k}: {err}");
                            yield unknown_solution(size, attempts, elapsed_ms(start));
                        }
                    }
                    return;
                }
                Ok(AttemptOutcome::Unsat) => {
                    log::info!(target: "controller", "attempt {k} ({}x{}) unsat", size.width, size.height);
                    attempts.push(Attempt {
                        iteration: k,
                        width: size.width,
                        height: size.height,
                        status: AttemptStatus::Unsat,
                    });
                    yield StreamItem::Attempt(attempts.last().expect("just pushed").clone());

                    if k >= config.max_iterations {
                        yield StreamItem::Solution(LayoutSolution {
                            status: AttemptStatus::Unsat,
                            bounds: Bounds { width: size.width, height: size.height },
                            placements: Vec::new(),
                            segments: Vec::new(),
                            attempts,
                            elapsed_ms: elapsed_ms(start),
                        });
                        return;
                    }

                    size = bounds::next_size(size, &config, k);
                    k += 1;
                }
                Err(SolverError::Cancelled) => {
                    log::info!(target: "controller", "attempt {k} cancelled mid-solve");
                    yield unknown_solution(size, attempts, elapsed_ms(start));
                    return;
                }
                Err(err @ (SolverError::SolverTimeout { .. } | SolverError::SolverUnknown { .. })) => {
                    log::warn!(target: "controller", "attempt {k} returned unknown: {err}");
                    attempts.push(Attempt {
                        iteration: k,
                        width: size.width,
                        height: size.height,
                        status: AttemptStatus::Unknown,
                    });
                    yield StreamItem::Attempt(attempts.last().expect("just pushed").clone());
                    yield unknown_solution(size, attempts, elapsed_ms(start));
                    return;
                }
                Err(err) => {
                    log::error!(target: "controller", "attempt {k} aborted: {err}");
                    yield unknown_solution(size, attempts, elapsed_ms(start));
                    return;
                }
            }
        }
    }
}

fn unknown_solution(size: bounds::TrialSize, attempts: Vec<Attempt>, elapsed_ms: u64) -> StreamItem {
    StreamItem::Solution(LayoutSolution {
        status: AttemptStatus::Unknown,
        bounds: Bounds { width: size.width, height: size.height },
        placements: Vec::new(),
        segments: Vec::new(),
        attempts,
        elapsed_ms,
    })
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
