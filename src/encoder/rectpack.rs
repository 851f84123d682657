//! The degenerate fallback encoder backend (spec.md §9): orders machine
//! anchors and forbids overlap, but never decides a single belt cell. Used
//! when a caller only needs placement feasibility, not a routable layout.
//!
//! Built on the same anchor-selection machinery as [`super::cell::CellModel`],
//! stripped of the per-cell type/direction/flow variables — plain `rustsat`
//! clauses throughout, rather than reaching for a separate SMT/ILP crate.

use std::collections::HashMap;

use itertools::Itertools;
use petgraph::graph::NodeIndex;
use rustsat::instances::{BasicVarManager, SatInstance};
use rustsat::types::{Lit, Var};

use super::{add_exactly_one, pos};
use crate::bounds::TrialSize;
use crate::catalog::{Footprint, footprint};
use crate::graph::ValidatedGraph;
use crate::math::{Dimensions, Point};

pub struct RectPackModel {
    pub size: TrialSize,
    anchor_vars: HashMap<NodeIndex<usize>, HashMap<Point, Var>>,
    var_map: HashMap<Var, (NodeIndex<usize>, Point)>,
}

impl RectPackModel {
    pub(crate) fn anchors(&self, node: NodeIndex<usize>) -> Option<&HashMap<Point, Var>> {
        self.anchor_vars.get(&node)
    }

    pub fn lit_readable_name(&self, lit: Lit) -> Option<String> {
        self.var_map.get(&lit.var()).map(|(n, p)| {
            let sign = if lit.is_neg() { "~" } else { "" };
            format!("{sign}P{}({};{})", n.index(), p.x, p.y)
        })
    }
}

fn anchors_for(dims: Dimensions, long: usize, short: usize) -> Vec<Point> {
    if long > dims.width || short > dims.height {
        return vec![];
    }
    (0..=(dims.width - long))
        .flat_map(|x0| (0..=(dims.height - short)).map(move |y0| Point::new(x0 as isize, y0 as isize)))
        .collect()
}

fn overlaps_with_gap(a: Point, a_fp: Footprint, b: Point, b_fp: Footprint, gap: usize) -> bool {
    let gap = gap as isize;
    let (aw, ah) = (a_fp.long as isize, a_fp.short as isize);
    let (bw, bh) = (b_fp.long as isize, b_fp.short as isize);
    let separated = a.x + aw + gap <= b.x
        || b.x + bw + gap <= a.x
        || a.y + ah + gap <= b.y
        || b.y + bh + gap <= a.y;
    !separated
}

pub fn encode(
    graph: &ValidatedGraph,
    size: TrialSize,
    gap: usize,
    instance: &mut SatInstance<BasicVarManager>,
) -> RectPackModel {
    let dims = Dimensions::new(size.width, size.height);
    let mut anchor_vars: HashMap<NodeIndex<usize>, HashMap<Point, Var>> = HashMap::new();
    let mut footprints: HashMap<NodeIndex<usize>, Footprint> = HashMap::new();
    let mut var_map = HashMap::new();

    for (node_ix, node) in graph.nodes() {
        let fp = footprint(node.kind);
        footprints.insert(node_ix, fp);

        let mut anchors = HashMap::new();
        for anchor in anchors_for(dims, fp.long, fp.short) {
            let v = instance.new_var();
            var_map.insert(v, (node_ix, anchor));
            anchors.insert(anchor, v);
        }
        add_exactly_one(instance, &pos(anchors.values().copied()));
        anchor_vars.insert(node_ix, anchors);
    }

    let node_ixs: Vec<NodeIndex<usize>> = graph.nodes().map(|(ix, _)| ix).collect();
    for (n, m) in node_ixs.into_iter().tuple_combinations() {
        for (&anchor_n, &var_n) in &anchor_vars[&n] {
            for (&anchor_m, &var_m) in &anchor_vars[&m] {
                if overlaps_with_gap(anchor_n, footprints[&n], anchor_m, footprints[&m], gap) {
                    instance.add_cube_impl_clause(&[var_n.pos_lit(), var_m.pos_lit()], &[]);
                }
            }
        }
    }

    log::debug!(
        target: "encoder",
        "rectpack model for {}x{}: {} anchor vars, {} clauses",
        size.width,
        size.height,
        var_map.len(),
        instance.cnf().len(),
    );

    RectPackModel { size, anchor_vars, var_map }
}
