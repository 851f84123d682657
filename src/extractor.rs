//! The solution extractor (C6): decodes a satisfying [`Assignment`] back
//! into [`PlacedBuilding`]/[`BeltSegment`] lists (spec.md §4.6).
//!
//! Reads a `HashMap<Point, Var>` back out via `assignment.var_value(..)
//! .to_bool_with_def(false)`, then re-checks the decoded placements with an
//! overlap/adjacency sanity pass run right after extraction.

use std::collections::HashMap;

use itertools::Itertools;
use petgraph::graph::NodeIndex;
use rustsat::types::Assignment;

use crate::bounds::TrialSize;
use crate::catalog::footprint;
use crate::direction::Direction;
use crate::encoder::EncodedModel;
use crate::encoder::cell::CellModel;
use crate::error::SolverError;
use crate::graph::ValidatedGraph;
use crate::math::{Dimensions, Grid, Point};
use crate::model::{BeltSegment, PlacedBuilding, TileState};

fn is_true(assignment: &Assignment, var: rustsat::types::Var) -> bool {
    assignment.var_value(var).to_bool_with_def(false)
}

/// Decodes `assignment` into the placements and belt segments it encodes,
/// running the overlap/adjacency sanity checks spec.md §4.6 requires.
pub fn extract(
    graph: &ValidatedGraph,
    size: TrialSize,
    model: &EncodedModel,
    assignment: &Assignment,
) -> Result<(Vec<PlacedBuilding>, Vec<BeltSegment>), SolverError> {
    let (placements, segments, tiles) = match model {
        EncodedModel::Cell(cell_model) => {
            let placements = extract_placements(graph, cell_model, assignment)?;
            let (segments, tiles) = extract_segments(size, cell_model, assignment)?;
            (placements, segments, Some(tiles))
        }
        EncodedModel::RectPack(rect_model) => {
            let placements = extract_rectpack_placements(graph, rect_model, assignment)?;
            (placements, Vec::new(), None)
        }
    };

    validate(graph, size, &placements, tiles)?;
    Ok((placements, segments))
}

fn extract_placements(
    graph: &ValidatedGraph,
    model: &CellModel,
    assignment: &Assignment,
) -> Result<Vec<PlacedBuilding>, SolverError> {
    placements_from(graph, assignment, |node_ix| model.anchors(node_ix))
}

fn extract_rectpack_placements(
    graph: &ValidatedGraph,
    model: &crate::encoder::rectpack::RectPackModel,
    assignment: &Assignment,
) -> Result<Vec<PlacedBuilding>, SolverError> {
    placements_from(graph, assignment, |node_ix| model.anchors(node_ix))
}

fn placements_from<'a>(
    graph: &ValidatedGraph,
    assignment: &Assignment,
    anchors_of: impl Fn(NodeIndex<usize>) -> Option<&'a HashMap<Point, rustsat::types::Var>>,
) -> Result<Vec<PlacedBuilding>, SolverError> {
    let mut placements = Vec::with_capacity(graph.node_count());
    for (node_ix, node) in graph.nodes() {
        let anchors = anchors_of(node_ix).ok_or_else(|| {
            SolverError::internal(format!("no anchor variables recorded for node {:?}", node.id))
        })?;
        let anchor = chosen_anchor(anchors, assignment, &node.id)?;
        let fp = footprint(node.kind);
        placements.push(PlacedBuilding {
            node_id: node.id.clone(),
            x: anchor.x as usize,
            y: anchor.y as usize,
            w: fp.long,
            h: fp.short,
        });
    }
    Ok(placements)
}

fn chosen_anchor(
    anchors: &HashMap<Point, rustsat::types::Var>,
    assignment: &Assignment,
    node_id: &str,
) -> Result<Point, SolverError> {
    let mut chosen = anchors.iter().filter(|(_, &v)| is_true(assignment, v));
    let (&p, _) = chosen
        .next()
        .ok_or_else(|| SolverError::internal(format!("node {node_id:?} has no chosen anchor in the model")))?;
    if chosen.next().is_some() {
        return Err(SolverError::internal(format!("node {node_id:?} has more than one chosen anchor")));
    }
    Ok(p)
}

/// Decodes every belt cell twice over: once into the public, lossy
/// [`BeltSegment`] (spec.md §3 only records a single primary in/out pair
/// even for bridges) and once into the full [`TileState`] the grid-level
/// adjacency check in [`validate`] needs (a bridge occupies both a
/// vertical and a horizontal lane at once).
fn extract_segments(
    size: TrialSize,
    model: &CellModel,
    assignment: &Assignment,
) -> Result<(Vec<BeltSegment>, Grid<TileState>), SolverError> {
    let dims = Dimensions::new(size.width, size.height);
    let mut segments = Vec::new();
    let mut tiles = Grid::new_fill(dims, TileState::Empty);

    for p in dims.iter_within() {
        let t = model.type_at(p);
        let is_conveyor = is_true(assignment, t.conveyor);
        let is_bridge = is_true(assignment, t.bridge);
        if !is_conveyor && !is_bridge {
            continue;
        }
        let d = model.dir_at(p);

        if is_conveyor {
            let in_dir = unique_true_dir(assignment, &d.in_, p, "in")?;
            let out_dir = unique_true_dir(assignment, &d.out, p, "out")?;
            segments.push(BeltSegment {
                x: p.x as usize,
                y: p.y as usize,
                in_dir,
                out_dir,
                is_bridge: false,
                edge_id: None,
            });
            *tiles.get_mut(p).expect("point within trial bounds") = TileState::Conveyor { in_dir, out_dir };
        } else {
            let v_in = lane_dir(assignment, &d.in_, Direction::Up, Direction::Down);
            let v_out = lane_dir(assignment, &d.out, Direction::Up, Direction::Down);
            let h_in = lane_dir(assignment, &d.in_, Direction::Left, Direction::Right);
            let h_out = lane_dir(assignment, &d.out, Direction::Left, Direction::Right);
            let (Some(v_in), Some(v_out), Some(h_in), Some(h_out)) = (v_in, v_out, h_in, h_out) else {
                return Err(SolverError::internal(format!(
                    "bridge cell at {p} is missing a vertical or horizontal lane direction"
                )));
            };
            segments.push(BeltSegment {
                x: p.x as usize,
                y: p.y as usize,
                in_dir: v_in,
                out_dir: v_out,
                is_bridge: true,
                edge_id: None,
            });
            *tiles.get_mut(p).expect("point within trial bounds") =
                TileState::Bridge { v_in, v_out, h_in, h_out };
        }
    }

    Ok((segments, tiles))
}

/// Picks whichever of `a`/`b` holds true in `vars`, for decoding one lane
/// (vertical or horizontal) of a bridge cell's in/out direction pair.
fn lane_dir(
    assignment: &Assignment,
    vars: &enum_map::EnumMap<Direction, rustsat::types::Var>,
    a: Direction,
    b: Direction,
) -> Option<Direction> {
    is_true(assignment, vars[a]).then_some(a).or_else(|| is_true(assignment, vars[b]).then_some(b))
}

fn unique_true_dir(
    assignment: &Assignment,
    vars: &enum_map::EnumMap<Direction, rustsat::types::Var>,
    p: Point,
    label: &str,
) -> Result<Direction, SolverError> {
    let mut chosen = Direction::all().filter(|&d| is_true(assignment, vars[d]));
    let first = chosen
        .next()
        .ok_or_else(|| SolverError::internal(format!("conveyor at {p} has no {label} direction set")))?;
    if chosen.next().is_some() {
        return Err(SolverError::internal(format!("conveyor at {p} has more than one {label} direction set")));
    }
    Ok(first)
}

/// Sanity checks that must hold of any decoded solution (spec.md §4.6):
/// placements pairwise non-overlapping, and no two distinct machines
/// edge-adjacent. Both should already be impossible by construction (the
/// encoder's clauses forbid it); this re-derives them independently from
/// the decoded [`TileState`] grid as a defense against an encoder bug
/// producing a model the SAT solver still calls satisfiable.
fn validate(
    graph: &ValidatedGraph,
    size: TrialSize,
    placements: &[PlacedBuilding],
    tiles: Option<Grid<TileState>>,
) -> Result<(), SolverError> {
    if placements.len() != graph.node_count() {
        return Err(SolverError::internal(format!(
            "expected {} placements, decoded {}",
            graph.node_count(),
            placements.len()
        )));
    }
    for (a, b) in placements.iter().tuple_combinations() {
        if a.overlaps(b) {
            return Err(SolverError::internal(format!(
                "decoded placements {:?} and {:?} overlap",
                a.node_id, b.node_id
            )));
        }
    }

    let Some(mut tiles) = tiles else { return Ok(()) };
    for (index, placement) in placements.iter().enumerate() {
        for y in placement.y..placement.y + placement.h {
            for x in placement.x..placement.x + placement.w {
                let p = Point::new(x as isize, y as isize);
                if !matches!(tiles.get(p), Some(TileState::Empty)) {
                    return Err(SolverError::internal(format!(
                        "machine {:?} footprint cell {p} collides with a decoded belt tile",
                        placement.node_id
                    )));
                }
                *tiles.get_mut(p).expect("placement within trial bounds") =
                    TileState::Machine { node_id_index: index };
            }
        }
    }

    let dims = Dimensions::new(size.width, size.height);
    for p in dims.iter_within() {
        let Some(TileState::Machine { node_id_index }) = tiles.get(p).copied() else { continue };
        for neighbor in [p.towards(Direction::Up), p.towards(Direction::Right), p.towards(Direction::Down), p.towards(Direction::Left)]
        {
            if let Some(TileState::Machine { node_id_index: other }) = tiles.get(neighbor).copied() {
                if other != node_id_index {
                    return Err(SolverError::internal(format!(
                        "machines {:?} and {:?} are directly adjacent at {p}/{neighbor}",
                        placements[node_id_index].node_id, placements[other].node_id
                    )));
                }
            }
        }
    }

    Ok(())
}
