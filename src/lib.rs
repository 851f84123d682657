//! A SAT-based factory layout solver: places machine rectangles on an
//! integer grid and routes every material-flow edge as a belt/bridge path,
//! searching over bounding-box sizes to find the smallest feasible one.
//!
//! The public surface is [`LayoutSolver::solve`], which validates its input
//! synchronously and then returns a [`SolveSession`] — a [`Stream`] of
//! [`StreamItem`]s (interleaved `attempt` events, terminated by exactly one
//! `solution` event) plus a cooperative cancellation handle.

use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use futures::Stream;
use tokio_util::sync::CancellationToken;

pub mod bounds;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod direction;
pub mod driver;
pub mod encoder;
pub mod error;
pub mod extractor;
pub mod graph;
pub mod health;
pub mod math;
pub mod model;

pub use config::SolverConfig;
pub use error::SolverError;
pub use graph::ProductionGraph;
pub use model::StreamItem;

use graph::ValidatedGraph;

/// A stateless entry point into the engine. Each [`LayoutSolver::solve`]
/// call owns its own encoder, solver context and attempt log — there is no
/// shared mutable session registry (spec.md §5).
#[derive(Copy, Clone, Debug, Default)]
pub struct LayoutSolver;

impl LayoutSolver {
    pub const fn new() -> Self {
        LayoutSolver
    }

    /// Validates `graph` and `config`, then starts a solve session.
    ///
    /// Returns synchronously with `Err` on malformed input (spec.md §7); no
    /// solver work happens before this call returns successfully.
    pub fn solve(&self, graph: &ProductionGraph, config: SolverConfig) -> Result<SolveSession, SolverError> {
        config.validate()?;
        let validated = ValidatedGraph::new(graph)?;
        let cancel = CancellationToken::new();
        let stream = Box::pin(controller::run(validated, config, cancel.clone()));
        Ok(SolveSession { stream, cancel })
    }
}

/// The live stream of one `solve` session, plus its cancellation handle.
pub struct SolveSession {
    stream: Pin<Box<dyn Stream<Item = StreamItem> + Send>>,
    cancel: CancellationToken,
}

impl SolveSession {
    /// Requests cancellation. The session still runs to its terminal
    /// `solution` event (status `unknown`), it just stops short (spec.md
    /// §4.7, §5) rather than ending mid-stream with nothing.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A cloneable cancellation handle, for callers (e.g. a Ctrl-C handler)
    /// that need to trigger cancellation from outside the task polling this
    /// stream.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Stream for SolveSession {
    type Item = StreamItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        self.stream.as_mut().poll_next(cx)
    }
}
