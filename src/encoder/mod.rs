//! The encoder (C4): lowers a [`crate::graph::ValidatedGraph`] plus a trial
//! [`crate::bounds::TrialSize`] into a CNF over a fresh [`SatInstance`].
//!
//! Two interchangeable backends live behind this module, chosen by
//! [`crate::config::EncodingBackend`]: [`cell::CellModel`] is the
//! authoritative per-cell routing model (spec.md §4.4), and
//! [`rectpack::RectPackModel`] is the degenerate placement-only fallback
//! (spec.md §9) that orders integer anchors without ever deciding belt paths.

pub mod cell;
pub mod rectpack;

use rustsat::instances::{BasicVarManager, SatInstance};
use rustsat::types::{Lit, Var};

use crate::bounds::TrialSize;
use crate::config::SolverConfig;
use crate::graph::ValidatedGraph;

/// The model produced by whichever backend built the current trial's CNF.
/// The driver only needs the instance; the extractor needs this to decode
/// a satisfying assignment back into placements and segments.
#[derive(derive_more::From)]
pub enum EncodedModel {
    Cell(cell::CellModel),
    RectPack(rectpack::RectPackModel),
}

impl EncodedModel {
    pub fn lit_readable_name(&self, lit: Lit) -> Option<String> {
        match self {
            EncodedModel::Cell(m) => m.lit_readable_name(lit),
            EncodedModel::RectPack(m) => m.lit_readable_name(lit),
        }
    }
}

/// Builds the CNF for `size` and returns the model needed to decode it.
pub fn encode(
    graph: &ValidatedGraph,
    size: TrialSize,
    config: &SolverConfig,
    instance: &mut SatInstance<BasicVarManager>,
) -> EncodedModel {
    match config.encoding_backend {
        crate::config::EncodingBackend::Cell => cell::encode(graph, size, instance).into(),
        crate::config::EncodingBackend::RectPack => {
            rectpack::encode(graph, size, config.rect_pack_gap, instance).into()
        }
    }
}

/// `instance.add_clause` over an at-least-one disjunction, skipped when the
/// pool is empty (an empty OR-clause is permanently unsat, which is what we
/// want when a node has no feasible placement at this trial size).
pub(crate) fn add_at_least_one(instance: &mut SatInstance<BasicVarManager>, lits: &[Lit]) {
    instance.add_clause(lits.iter().copied().collect());
}

/// Pairwise at-most-one. Quadratic in `lits.len()`; fine for the small
/// per-node/per-cell pools this encoder deals with.
pub(crate) fn add_at_most_one(instance: &mut SatInstance<BasicVarManager>, lits: &[Lit]) {
    for i in 0..lits.len() {
        for j in (i + 1)..lits.len() {
            instance.add_clause([negate(lits[i]), negate(lits[j])].into_iter().collect());
        }
    }
}

/// All lits this module deals with are built via [`Var::pos_lit`], but write
/// this defensively rather than assume the sign.
pub(crate) fn negate(lit: Lit) -> Lit {
    if lit.is_neg() { lit.var().pos_lit() } else { lit.var().neg_lit() }
}

pub(crate) fn add_exactly_one(instance: &mut SatInstance<BasicVarManager>, lits: &[Lit]) {
    add_at_least_one(instance, lits);
    add_at_most_one(instance, lits);
}

pub(crate) fn pos(vars: impl IntoIterator<Item = Var>) -> Vec<Lit> {
    vars.into_iter().map(|v| v.pos_lit()).collect()
}
