//! The bounds schedule (C3): computes the initial rectangle and the
//! deterministic expansion after an unsat attempt (spec.md §4.3).

use crate::catalog::footprint;
use crate::config::{FixedDimensionMode, SolverConfig};
use crate::graph::ValidatedGraph;

/// `(width, height)` of a trial bounding box.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TrialSize {
    pub width: usize,
    pub height: usize,
}

/// Computes the initial trial size for a graph, honoring caller-supplied
/// overrides on either axis independently.
pub fn initial_size(graph: &ValidatedGraph, config: &SolverConfig) -> TrialSize {
    let total_area: usize = graph.nodes().map(|(_, n)| footprint(n.kind).area()).sum();
    let max_long = graph.nodes().map(|(_, n)| footprint(n.kind).long).max().unwrap_or(1);
    let max_short = graph.nodes().map(|(_, n)| footprint(n.kind).short).max().unwrap_or(1);
    let sqrt_area = (total_area as f64).sqrt().ceil() as usize;

    let side = max_long.max(max_short).max(sqrt_area).max(1);

    TrialSize {
        width: config.initial_width.unwrap_or(side),
        height: config.initial_height.unwrap_or(side),
    }
}

/// Computes the next trial size after iteration `k` (1-indexed) was unsat.
///
/// Parity choice (documented, spec.md §4.3/§9): under `fixedDimensionMode =
/// none`, even `k` grows the width and odd `k` grows the height. This is an
/// arbitrary but deterministic tie-break; the only hard requirement is
/// strict monotonicity, which holds regardless of which axis is chosen on
/// which parity.
pub fn next_size(current: TrialSize, config: &SolverConfig, k: u32) -> TrialSize {
    let step = config.expansion_step;
    match config.fixed_dimension_mode {
        FixedDimensionMode::Width => TrialSize { width: current.width, height: current.height + step },
        FixedDimensionMode::Height => TrialSize { width: current.width + step, height: current.height },
        FixedDimensionMode::None => {
            if k % 2 == 0 {
                TrialSize { width: current.width + step, height: current.height }
            } else {
                TrialSize { width: current.width, height: current.height + step }
            }
        }
    }
}

pub const fn dominates(prev: TrialSize, next: TrialSize) -> bool {
    next.width > prev.width || next.height > prev.height
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::catalog::BuildingKind;
    use crate::graph::{MachineNode, ProductionGraph};

    fn graph_with(kinds: &[BuildingKind]) -> ValidatedGraph {
        let nodes = kinds
            .iter()
            .enumerate()
            .map(|(i, &kind)| MachineNode { id: format!("n{i}"), label: format!("n{i}"), kind })
            .collect();
        ValidatedGraph::new(&ProductionGraph { nodes, ..Default::default() }).unwrap()
    }

    #[test]
    fn empty_graph_initial_size_is_at_least_one() {
        let g = graph_with(&[]);
        let size = initial_size(&g, &SolverConfig::default());
        assert_eq!(size, TrialSize { width: 1, height: 1 });
    }

    #[test]
    fn single_grinder_initial_size_covers_its_footprint() {
        let g = graph_with(&[BuildingKind::Grinder]);
        let size = initial_size(&g, &SolverConfig::default());
        assert!(size.width >= 6);
        assert!(size.height >= 3);
    }

    #[test]
    fn caller_overrides_apply_independently() {
        let g = graph_with(&[BuildingKind::Crusher]);
        let config = SolverConfig { initial_width: Some(20), ..Default::default() };
        let size = initial_size(&g, &config);
        assert_eq!(size.width, 20);
        assert!(size.height >= 3);
    }

    #[test_case(1, TrialSize { width: 5, height: 6 })]
    #[test_case(2, TrialSize { width: 6, height: 5 })]
    fn none_mode_alternates_axis_by_parity(k: u32, expected: TrialSize) {
        let current = TrialSize { width: 5, height: 5 };
        let next = next_size(current, &SolverConfig::default(), k);
        assert_eq!(next, expected);
    }

    #[test]
    fn width_fixed_mode_only_grows_height() {
        let config = SolverConfig { fixed_dimension_mode: FixedDimensionMode::Width, ..Default::default() };
        let current = TrialSize { width: 5, height: 5 };
        let next = next_size(current, &config, 1);
        assert_eq!(next, TrialSize { width: 5, height: 6 });
    }

    #[test]
    fn height_fixed_mode_only_grows_width() {
        let config =
            SolverConfig { fixed_dimension_mode: FixedDimensionMode::Height, ..Default::default() };
        let current = TrialSize { width: 5, height: 5 };
        let next = next_size(current, &config, 1);
        assert_eq!(next, TrialSize { width: 6, height: 5 });
    }

    #[test]
    fn schedule_is_strictly_monotone_over_many_steps() {
        let config = SolverConfig { expansion_step: 2, ..Default::default() };
        let mut current = TrialSize { width: 3, height: 3 };
        for k in 1..20 {
            let next = next_size(current, &config, k);
            assert!(dominates(current, next));
            current = next;
        }
    }
}
