//! The authoritative encoder backend (spec.md §4.4): every grid cell gets a
//! type, machines get placement anchors, and every material edge gets an
//! explicit per-unit flow through the belt cells it's allowed to occupy.
//!
//! Built around implication-clause helpers (`add_lit_impl_lit`/
//! `add_lit_impl_clause`/`add_cube_impl_clause`) and a `var_map`/
//! `lit_readable_name` side table for decoding a model back into readable
//! terms.

use std::collections::HashMap;

use enum_map::EnumMap;
use petgraph::graph::{EdgeIndex, NodeIndex};
use rustsat::instances::{BasicVarManager, SatInstance};
use rustsat::types::{Lit, Var};

use super::{add_at_most_one, add_exactly_one, pos};
use crate::bounds::TrialSize;
use crate::catalog::footprint;
use crate::direction::Direction;
use crate::graph::ValidatedGraph;
use crate::math::{Dimensions, Grid, Point};

#[derive(Copy, Clone, Debug)]
pub(crate) struct TypeVars {
    pub empty: Var,
    pub machine: Var,
    pub conveyor: Var,
    pub bridge: Var,
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct DirVars {
    pub in_: EnumMap<Direction, Var>,
    pub out: EnumMap<Direction, Var>,
}

#[derive(Clone, Debug)]
enum EncodedVar {
    Type(Point, &'static str),
    Machine(Point, NodeIndex<usize>),
    Anchor(NodeIndex<usize>, Point),
    Dir(Point, Direction, bool),
}

pub struct CellModel {
    pub size: TrialSize,
    type_vars: Grid<TypeVars>,
    dir_vars: Grid<DirVars>,
    machine_vars: HashMap<NodeIndex<usize>, Grid<Var>>,
    anchor_vars: HashMap<NodeIndex<usize>, HashMap<Point, Var>>,
    var_map: HashMap<Var, EncodedVar>,
}

impl CellModel {
    pub(crate) fn type_at(&self, p: Point) -> TypeVars {
        *self.type_vars.get(p).expect("point within trial bounds")
    }

    pub(crate) fn dir_at(&self, p: Point) -> DirVars {
        *self.dir_vars.get(p).expect("point within trial bounds")
    }

    pub(crate) fn machine_at(&self, node: NodeIndex<usize>, p: Point) -> Option<Var> {
        self.machine_vars.get(&node)?.get(p).copied()
    }

    pub(crate) fn anchors(&self, node: NodeIndex<usize>) -> Option<&HashMap<Point, Var>> {
        self.anchor_vars.get(&node)
    }

    pub fn lit_readable_name(&self, lit: Lit) -> Option<String> {
        self.var_map.get(&lit.var()).map(|item| {
            let sign = if lit.is_neg() { "~" } else { "" };
            match item {
                EncodedVar::Type(p, kind) => format!("{sign}{kind}({};{})", p.x, p.y),
                EncodedVar::Machine(p, n) => format!("{sign}M{}({};{})", n.index(), p.x, p.y),
                EncodedVar::Anchor(n, p) => format!("{sign}P{}({};{})", n.index(), p.x, p.y),
                EncodedVar::Dir(p, d, is_in) => {
                    format!("{sign}{}[{}]({};{})", if *is_in { "In" } else { "Out" }, d.as_str(), p.x, p.y)
                }
            }
        })
    }
}

fn dims_of(size: TrialSize) -> Dimensions {
    Dimensions::new(size.width, size.height)
}

/// Candidate anchors `(x0, y0)` for a footprint of `(long, short)` within
/// `dims`, long axis along X.
fn anchors_for(dims: Dimensions, long: usize, short: usize) -> Vec<Point> {
    if long > dims.width || short > dims.height {
        return vec![];
    }
    (0..=(dims.width - long))
        .flat_map(|x0| (0..=(dims.height - short)).map(move |y0| Point::new(x0 as isize, y0 as isize)))
        .collect()
}

/// Anchors of a `(long, short)` footprint whose output (bottom) row passes
/// through `cell`.
fn anchors_explaining_output_face(dims: Dimensions, long: usize, short: usize, cell: Point) -> Vec<Point> {
    let y0 = cell.y - short as isize;
    if y0 < 0 || y0 as usize > dims.height.saturating_sub(short) {
        return vec![];
    }
    let max_x0 = dims.width.saturating_sub(long) as isize;
    let lo = (cell.x - (long as isize - 1)).max(0);
    let hi = cell.x.min(max_x0);
    if lo > hi {
        return vec![];
    }
    (lo..=hi).map(|x0| Point::new(x0, y0)).collect()
}

/// Anchors of a `(long, short)` footprint whose input (top) row passes
/// through `cell`.
fn anchors_explaining_input_face(dims: Dimensions, long: usize, short: usize, cell: Point) -> Vec<Point> {
    let y0 = cell.y + 1;
    if y0 < 0 || y0 as usize > dims.height.saturating_sub(short) {
        return vec![];
    }
    let max_x0 = dims.width.saturating_sub(long) as isize;
    let lo = (cell.x - (long as isize - 1)).max(0);
    let hi = cell.x.min(max_x0);
    if lo > hi {
        return vec![];
    }
    (lo..=hi).map(|x0| Point::new(x0, y0)).collect()
}

pub fn encode(graph: &ValidatedGraph, size: TrialSize, instance: &mut SatInstance<BasicVarManager>) -> CellModel {
    let dims = dims_of(size);
    let mut var_map = HashMap::new();

    // ===== 1: per-cell type vars =====
    let type_vars = Grid::from_fn(dims, |p| {
        let empty = instance.new_var();
        let machine = instance.new_var();
        let conveyor = instance.new_var();
        let bridge = instance.new_var();
        var_map.insert(empty, EncodedVar::Type(p, "Empty"));
        var_map.insert(machine, EncodedVar::Type(p, "Machine"));
        var_map.insert(conveyor, EncodedVar::Type(p, "Conveyor"));
        var_map.insert(bridge, EncodedVar::Type(p, "Bridge"));
        TypeVars { empty, machine, conveyor, bridge }
    });

    for p in dims.iter_within() {
        let t = type_vars.get(p).unwrap();
        add_exactly_one(instance, &pos([t.empty, t.machine, t.conveyor, t.bridge]));
    }

    // ===== 2: direction vars =====
    let dir_vars = Grid::from_fn(dims, |p| {
        let in_: EnumMap<Direction, Var> = EnumMap::from_fn(|_: Direction| instance.new_var());
        let out: EnumMap<Direction, Var> = EnumMap::from_fn(|_: Direction| instance.new_var());
        for (d, &v) in in_.iter() {
            var_map.insert(v, EncodedVar::Dir(p, d, true));
        }
        for (d, &v) in out.iter() {
            var_map.insert(v, EncodedVar::Dir(p, d, false));
        }
        DirVars { in_, out }
    });

    // ===== 3: direction gating by type =====
    for p in dims.iter_within() {
        let t = type_vars.get(p).unwrap();
        let d = dir_vars.get(p).unwrap();
        let all_dirs: Vec<Var> = d.in_.values().chain(d.out.values()).copied().collect();

        // Empty and Machine cells carry no belt direction.
        for &v in &all_dirs {
            instance.add_lit_impl_lit(t.empty.pos_lit(), v.neg_lit());
            instance.add_lit_impl_lit(t.machine.pos_lit(), v.neg_lit());
        }

        // Conveyor: exactly one in-direction, exactly one out-direction, not the same axis slot.
        let ins = pos(d.in_.values().copied());
        let outs = pos(d.out.values().copied());
        instance.add_lit_impl_clause(t.conveyor.pos_lit(), &ins);
        instance.add_lit_impl_clause(t.conveyor.pos_lit(), &outs);
        for in_dir in Direction::all() {
            let other_outs: Vec<Lit> =
                Direction::all().filter(|&o| o != in_dir).map(|o| d.out[o].pos_lit()).collect();
            instance.add_cube_impl_clause(&[t.conveyor.pos_lit(), d.in_[in_dir].pos_lit()], &other_outs);
        }
        add_at_most_one_conditional(instance, t.conveyor, &ins);
        add_at_most_one_conditional(instance, t.conveyor, &outs);

        // Bridge: an independent vertical lane and horizontal lane, each with one
        // in/out direction on its own axis.
        let vert_in = pos([d.in_[Direction::Up], d.in_[Direction::Down]]);
        let vert_out = pos([d.out[Direction::Up], d.out[Direction::Down]]);
        let horiz_in = pos([d.in_[Direction::Left], d.in_[Direction::Right]]);
        let horiz_out = pos([d.out[Direction::Left], d.out[Direction::Right]]);
        for group in [&vert_in, &vert_out, &horiz_in, &horiz_out] {
            instance.add_lit_impl_clause(t.bridge.pos_lit(), group);
            add_at_most_one_conditional(instance, t.bridge, group);
        }
        // A bridge never routes a vertical lane into itself (Up both in and out).
        instance.add_cube_impl_clause(&[t.bridge.pos_lit(), d.in_[Direction::Up].pos_lit()], &[d.out[Direction::Down].pos_lit()]);
        instance.add_cube_impl_clause(&[t.bridge.pos_lit(), d.in_[Direction::Down].pos_lit()], &[d.out[Direction::Up].pos_lit()]);
        instance.add_cube_impl_clause(&[t.bridge.pos_lit(), d.in_[Direction::Left].pos_lit()], &[d.out[Direction::Right].pos_lit()]);
        instance.add_cube_impl_clause(&[t.bridge.pos_lit(), d.in_[Direction::Right].pos_lit()], &[d.out[Direction::Left].pos_lit()]);
    }

    // ===== 4: machine placement anchors and identity =====
    let mut machine_vars: HashMap<NodeIndex<usize>, Grid<Var>> = HashMap::new();
    let mut anchor_vars: HashMap<NodeIndex<usize>, HashMap<Point, Var>> = HashMap::new();

    for (node_ix, node) in graph.nodes() {
        let fp = footprint(node.kind);
        let cells = Grid::from_fn(dims, |p| {
            let v = instance.new_var();
            var_map.insert(v, EncodedVar::Machine(p, node_ix));
            v
        });

        let mut anchors = HashMap::new();
        for anchor in anchors_for(dims, fp.long, fp.short) {
            let v = instance.new_var();
            var_map.insert(v, EncodedVar::Anchor(node_ix, anchor));
            anchors.insert(anchor, v);
        }

        let anchor_lits = pos(anchors.values().copied());
        add_exactly_one(instance, &anchor_lits);

        // Anchor -> exactly the footprint's cells are this node's machine cells.
        for (&anchor, &anchor_var) in &anchors {
            let footprint_cells: Vec<Point> = (0..fp.long)
                .flat_map(|dx| (0..fp.short).map(move |dy| (dx, dy)))
                .map(|(dx, dy)| Point::new(anchor.x + dx as isize, anchor.y + dy as isize))
                .collect();
            for p in dims.iter_within() {
                let cell_var = *cells.get(p).unwrap();
                if footprint_cells.contains(&p) {
                    instance.add_lit_impl_lit(anchor_var.pos_lit(), cell_var.pos_lit());
                } else {
                    instance.add_lit_impl_lit(anchor_var.pos_lit(), cell_var.neg_lit());
                }
            }
        }

        for p in dims.iter_within() {
            let cell_var = *cells.get(p).unwrap();
            let t = type_vars.get(p).unwrap();
            instance.add_lit_impl_lit(cell_var.pos_lit(), t.machine.pos_lit());
        }

        machine_vars.insert(node_ix, cells);
        anchor_vars.insert(node_ix, anchors);
    }

    // A Machine-typed cell belongs to exactly one node.
    for p in dims.iter_within() {
        let t = type_vars.get(p).unwrap();
        let owners: Vec<Lit> = machine_vars.values().map(|g| g.get(p).unwrap().pos_lit()).collect();
        instance.add_lit_impl_clause(t.machine.pos_lit(), &owners);
        add_at_most_one(instance, &owners);
    }

    // For every node/anchor pair, the set of cells where that anchor makes `p`
    // the canonical output-face (resp. input-face) belt row, keyed by `p`.
    // Used below to restrict the machine escape in belt adjacency consistency
    // to the canonical port faces (spec.md §4.4 #7) instead of any adjacent
    // machine cell.
    let mut output_face_lits: HashMap<Point, Vec<Lit>> = HashMap::new();
    let mut input_face_lits: HashMap<Point, Vec<Lit>> = HashMap::new();
    for (node_ix, node) in graph.nodes() {
        let fp = footprint(node.kind);
        let anchors = &anchor_vars[&node_ix];
        for p in dims.iter_within() {
            for a in anchors_explaining_output_face(dims, fp.long, fp.short, p) {
                if let Some(&v) = anchors.get(&a) {
                    output_face_lits.entry(p).or_default().push(v.pos_lit());
                }
            }
            for a in anchors_explaining_input_face(dims, fp.long, fp.short, p) {
                if let Some(&v) = anchors.get(&a) {
                    input_face_lits.entry(p).or_default().push(v.pos_lit());
                }
            }
        }
    }

    // ===== 5: belt adjacency consistency (spec.md §4.4 #6) =====
    for p in dims.iter_within() {
        let d = dir_vars.get(p).unwrap();
        for dir in Direction::all() {
            let neighbor = p.towards(dir);

            if !dims.contains(neighbor) {
                instance.add_unit(d.in_[dir].neg_lit());
                instance.add_unit(d.out[dir].neg_lit());
                continue;
            }

            let nd = dir_vars.get(neighbor).unwrap();

            // in_[dir](p): the predecessor lies at `neighbor`. Either that
            // neighbor is a belt cell whose Out points back here, or — only
            // when `dir == Up`, i.e. `neighbor` sits directly above `p` — `p`
            // is the canonical output-face cell below some machine's
            // footprint (spec.md §4.4 #7: output ports are the bottom edge).
            let mut in_options = vec![nd.out[dir.opposite()].pos_lit()];
            if dir == Direction::Up {
                if let Some(lits) = output_face_lits.get(&p) {
                    in_options.extend(lits.iter().copied());
                }
            }
            instance.add_lit_impl_clause(d.in_[dir].pos_lit(), &in_options);

            // out[dir](p): the successor lies at `neighbor`. Symmetrically,
            // only `dir == Down` admits a machine escape — `p` must be the
            // canonical input-face cell above some machine's footprint.
            let mut out_options = vec![nd.in_[dir.opposite()].pos_lit()];
            if dir == Direction::Down {
                if let Some(lits) = input_face_lits.get(&p) {
                    out_options.extend(lits.iter().copied());
                }
            }
            instance.add_lit_impl_clause(d.out[dir].pos_lit(), &out_options);
        }
    }

    // ===== 6: no direct machine-to-machine adjacency across distinct nodes =====
    let node_ixs: Vec<NodeIndex<usize>> = graph.nodes().map(|(ix, _)| ix).collect();
    for p in dims.iter_within() {
        for dir in [Direction::Right, Direction::Down] {
            let neighbor = p.towards(dir);
            if !dims.contains(neighbor) {
                continue;
            }
            for (i, &n) in node_ixs.iter().enumerate() {
                for &m in &node_ixs[(i + 1)..] {
                    let a = *machine_vars[&n].get(p).unwrap();
                    let b = *machine_vars[&m].get(neighbor).unwrap();
                    instance.add_cube_impl_clause(&[a.pos_lit(), b.pos_lit()], &[]);
                    let a2 = *machine_vars[&m].get(p).unwrap();
                    let b2 = *machine_vars[&n].get(neighbor).unwrap();
                    instance.add_cube_impl_clause(&[a2.pos_lit(), b2.pos_lit()], &[]);
                }
            }
        }
    }

    // ===== 7: machine I/O ports =====
    for (node_ix, _) in graph.nodes() {
        let has_in = graph
            .edges()
            .any(|(e_ix, _)| graph.edge_endpoints(e_ix).is_some_and(|(_, to)| to == node_ix));
        let has_out = graph
            .edges()
            .any(|(e_ix, _)| graph.edge_endpoints(e_ix).is_some_and(|(from, _)| from == node_ix));
        let Some(anchors) = anchor_vars.get(&node_ix) else { continue };
        let node = graph.node(node_ix);
        let fp = footprint(node.kind);

        for (&anchor, &anchor_var) in anchors {
            if has_in && anchor.y > 0 {
                let row_y = anchor.y - 1;
                let mut belt_lits = vec![];
                for dx in 0..fp.long {
                    let cell = Point::new(anchor.x + dx as isize, row_y);
                    if let Some(t) = type_vars.get(cell) {
                        belt_lits.push(t.conveyor.pos_lit());
                        belt_lits.push(t.bridge.pos_lit());
                    }
                }
                instance.add_lit_impl_clause(anchor_var.pos_lit(), &belt_lits);
            } else if has_in {
                instance.add_unit(anchor_var.neg_lit());
            }

            if has_out && (anchor.y as usize + fp.short) < dims.height {
                let row_y = anchor.y + fp.short as isize;
                let mut belt_lits = vec![];
                for dx in 0..fp.long {
                    let cell = Point::new(anchor.x + dx as isize, row_y);
                    if let Some(t) = type_vars.get(cell) {
                        belt_lits.push(t.conveyor.pos_lit());
                        belt_lits.push(t.bridge.pos_lit());
                    }
                }
                instance.add_lit_impl_clause(anchor_var.pos_lit(), &belt_lits);
            } else if has_out {
                instance.add_unit(anchor_var.neg_lit());
            }
        }
    }

    // ===== 8/9: per-edge, per-unit routed flow =====
    let mut occupancies: Vec<EdgeUnitOccupancy> = Vec::new();
    for (edge_ix, edge) in graph.edges() {
        let Some((from_ix, to_ix)) = graph.edge_endpoints(edge_ix) else { continue };
        let from_fp = footprint(graph.node(from_ix).kind);
        let to_fp = footprint(graph.node(to_ix).kind);

        for unit in 0..edge.belts.get() {
            let occupancy = encode_edge_unit(
                instance,
                dims,
                &type_vars,
                &dir_vars,
                edge_ix,
                unit,
                from_fp,
                to_fp,
            );
            occupancies.push(occupancy);
        }
    }

    // Cross-edge/unit capacity: a conveyor cell carries at most one edge/unit
    // regardless of axis; a bridge cell carries at most one edge/unit per
    // axis, its two lanes crossing independently (spec.md §4.4 #8, §8).
    for p in dims.iter_within() {
        let t = type_vars.get(p).unwrap();
        for (i, occ_a) in occupancies.iter().enumerate() {
            for occ_b in &occupancies[(i + 1)..] {
                let va = *occ_a.vert.get(p).unwrap();
                let ha = *occ_a.horiz.get(p).unwrap();
                let vb = *occ_b.vert.get(p).unwrap();
                let hb = *occ_b.horiz.get(p).unwrap();

                instance.add_cube_impl_clause(&[t.bridge.pos_lit(), va.pos_lit(), vb.pos_lit()], &[]);
                instance.add_cube_impl_clause(&[t.bridge.pos_lit(), ha.pos_lit(), hb.pos_lit()], &[]);

                instance.add_cube_impl_clause(&[t.conveyor.pos_lit(), va.pos_lit(), vb.pos_lit()], &[]);
                instance.add_cube_impl_clause(&[t.conveyor.pos_lit(), va.pos_lit(), hb.pos_lit()], &[]);
                instance.add_cube_impl_clause(&[t.conveyor.pos_lit(), ha.pos_lit(), vb.pos_lit()], &[]);
                instance.add_cube_impl_clause(&[t.conveyor.pos_lit(), ha.pos_lit(), hb.pos_lit()], &[]);
            }
        }
    }

    log::debug!(
        target: "encoder",
        "cell model for {}x{}: {} named vars, {} clauses, {} edge/unit occupancies",
        size.width,
        size.height,
        var_map.len(),
        instance.cnf().len(),
        occupancies.len(),
    );

    CellModel { size, type_vars, dir_vars, machine_vars, anchor_vars, var_map }
}

fn add_at_most_one_conditional(instance: &mut SatInstance<BasicVarManager>, guard: Var, lits: &[Lit]) {
    for i in 0..lits.len() {
        for j in (i + 1)..lits.len() {
            instance.add_cube_impl_clause(&[guard.pos_lit(), lits[i], lits[j]], &[]);
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn output_face_anchors_sit_one_row_above_the_footprint_bottom() {
        let dims = Dimensions::new(10, 10);
        let anchors = anchors_explaining_output_face(dims, 3, 2, Point::new(5, 4));
        assert_eq!(
            anchors,
            vec![Point::new(3, 2), Point::new(4, 2), Point::new(5, 2)],
            "cell (5,4) is the output row of any anchor whose footprint ends at y=4"
        );
    }

    #[test]
    fn input_face_anchors_sit_one_row_below_the_footprint_top() {
        let dims = Dimensions::new(10, 10);
        let anchors = anchors_explaining_input_face(dims, 3, 2, Point::new(5, 1));
        assert_eq!(
            anchors,
            vec![Point::new(3, 2), Point::new(4, 2), Point::new(5, 2)],
            "cell (5,1) is the input row of any anchor whose footprint starts at y=2"
        );
    }

    #[test_case(Point::new(0, 0))]
    #[test_case(Point::new(5, 9))]
    fn output_face_anchors_empty_when_the_footprint_would_fall_off_the_grid(cell: Point) {
        let dims = Dimensions::new(10, 10);
        assert!(anchors_explaining_output_face(dims, 3, 2, cell).is_empty());
    }

    #[test_case(Point::new(9, 9))]
    fn input_face_anchors_empty_when_the_footprint_would_fall_off_the_grid(cell: Point) {
        let dims = Dimensions::new(10, 10);
        assert!(anchors_explaining_input_face(dims, 3, 2, cell).is_empty());
    }

    #[test]
    fn face_anchors_are_disjoint_for_a_given_cell() {
        // A single cell can be at most one of a machine's two port faces at once.
        let dims = Dimensions::new(10, 10);
        let cell = Point::new(4, 4);
        let outputs = anchors_explaining_output_face(dims, 3, 2, cell);
        let inputs = anchors_explaining_input_face(dims, 3, 2, cell);
        for a in &outputs {
            assert!(!inputs.contains(a));
        }
    }
}

/// Per-cell "this edge/unit's flow uses the vertical (resp. horizontal) lane
/// here" indicator, one pair per `(edge, unit)`, fed into the cross-edge
/// capacity pass `encode` runs once every edge/unit has been encoded.
struct EdgeUnitOccupancy {
    vert: Grid<Var>,
    horiz: Grid<Var>,
}

#[allow(clippy::too_many_arguments)]
fn encode_edge_unit(
    instance: &mut SatInstance<BasicVarManager>,
    dims: Dimensions,
    type_vars: &Grid<TypeVars>,
    dir_vars: &Grid<DirVars>,
    edge_ix: EdgeIndex<usize>,
    unit: usize,
    from_fp: crate::catalog::Footprint,
    to_fp: crate::catalog::Footprint,
) -> EdgeUnitOccupancy {
    let _ = edge_ix;
    let _ = unit;

    let flow_out: Grid<EnumMap<Direction, Var>> =
        Grid::from_fn(dims, |_| EnumMap::from_fn(|_: Direction| instance.new_var()));

    let mut is_src = HashMap::new();
    let mut is_snk = HashMap::new();
    for p in dims.iter_within() {
        if !anchors_explaining_output_face(dims, from_fp.long, from_fp.short, p).is_empty() {
            is_src.insert(p, instance.new_var());
        }
        if !anchors_explaining_input_face(dims, to_fp.long, to_fp.short, p).is_empty() {
            is_snk.insert(p, instance.new_var());
        }
    }

    add_exactly_one(instance, &pos(is_src.values().copied()));
    add_exactly_one(instance, &pos(is_snk.values().copied()));

    for (&p, &v) in &is_src {
        let t = type_vars.get(p).unwrap();
        instance.add_lit_impl_clause(v.pos_lit(), &[t.conveyor.pos_lit(), t.bridge.pos_lit()]);
        let out_here = flow_out.get(p).unwrap();
        instance.add_cube_impl_clause(&[v.pos_lit(), out_here[Direction::Up].pos_lit()], &[]);
        instance.add_lit_impl_clause(
            v.pos_lit(),
            &pos([out_here[Direction::Right], out_here[Direction::Down], out_here[Direction::Left]]),
        );
    }
    for (&p, &v) in &is_snk {
        let t = type_vars.get(p).unwrap();
        instance.add_lit_impl_clause(v.pos_lit(), &[t.conveyor.pos_lit(), t.bridge.pos_lit()]);
        let out_here = flow_out.get(p).unwrap();
        for &o in out_here.values() {
            instance.add_lit_impl_lit(v.pos_lit(), o.neg_lit());
        }
        let arrivals: Vec<Lit> = Direction::all()
            .filter_map(|d| {
                let pred = p - d.delta();
                dims.contains(pred).then(|| flow_out.get(pred).unwrap()[d].pos_lit())
            })
            .collect();
        instance.add_lit_impl_clause(v.pos_lit(), &arrivals);
    }

    let vert_occ_grid: Grid<Var> = Grid::from_fn(dims, |_| instance.new_var());
    let horiz_occ_grid: Grid<Var> = Grid::from_fn(dims, |_| instance.new_var());

    for p in dims.iter_within() {
        let t = type_vars.get(p).unwrap();
        let d = dir_vars.get(p).unwrap();
        let out_here = flow_out.get(p).unwrap();
        let out_lits = pos(out_here.values().copied());
        add_at_most_one(instance, &out_lits);

        let is_src_here = is_src.get(&p).copied();
        let is_snk_here = is_snk.get(&p).copied();

        for (dir, &flow_lit) in out_here.iter() {
            // A chosen flow direction must actually match the cell's belt Out.
            instance.add_lit_impl_clause(flow_lit.pos_lit(), &[t.conveyor.pos_lit(), t.bridge.pos_lit()]);
            instance.add_lit_impl_lit(flow_lit.pos_lit(), d.out[dir].pos_lit());
        }

        let arrivals_by_dir: Vec<(Direction, Lit)> = Direction::all()
            .filter_map(|dir| {
                let pred = p - dir.delta();
                dims.contains(pred).then(|| (dir, flow_out.get(pred).unwrap()[dir].pos_lit()))
            })
            .collect();
        let arrivals: Vec<Lit> = arrivals_by_dir.iter().map(|&(_, lit)| lit).collect();

        // Forward conservation: arriving at a non-sink, non-source cell forces a continuation.
        for &arrive_lit in &arrivals {
            let mut cube = vec![arrive_lit];
            if let Some(snk) = is_snk_here {
                cube.push(snk.neg_lit());
            }
            instance.add_cube_impl_clause(&cube, &out_lits);
        }

        // Reverse conservation: a cell only emits flow if it's the source or
        // it actually received an arrival, so the chosen flow is a genuine
        // source -> sink path rather than a disconnected fragment.
        let mut out_cause = arrivals.clone();
        if let Some(src) = is_src_here {
            out_cause.push(src.pos_lit());
        }
        for &out_lit in &out_lits {
            instance.add_lit_impl_clause(out_lit, &out_cause);
        }

        // Forbid a direct source -> sink shortcut (k >= 3, spec.md §4.4 #8).
        if let Some(src_var) = is_src_here {
            for (dir, &flow_lit) in out_here.iter() {
                let neighbor = p.towards(dir);
                if let Some(&snk_var) = is_snk.get(&neighbor) {
                    instance.add_cube_impl_clause(
                        &[src_var.pos_lit(), flow_lit.pos_lit(), snk_var.pos_lit()],
                        &[],
                    );
                }
            }
        }

        // This edge/unit occupies the vertical (resp. horizontal) lane at `p`
        // whenever it emits or receives flow along that axis.
        let vert_occ = *vert_occ_grid.get(p).unwrap();
        let horiz_occ = *horiz_occ_grid.get(p).unwrap();
        for dir in [Direction::Up, Direction::Down] {
            instance.add_lit_impl_lit(out_here[dir].pos_lit(), vert_occ.pos_lit());
        }
        for dir in [Direction::Left, Direction::Right] {
            instance.add_lit_impl_lit(out_here[dir].pos_lit(), horiz_occ.pos_lit());
        }
        for &(dir, lit) in &arrivals_by_dir {
            let occ = if dir.is_vertical() { vert_occ } else { horiz_occ };
            instance.add_lit_impl_lit(lit, occ.pos_lit());
        }
    }

    EdgeUnitOccupancy { vert: vert_occ_grid, horiz: horiz_occ_grid }
}
