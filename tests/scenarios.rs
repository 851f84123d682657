//! End-to-end scenarios against the public `LayoutSolver` API (spec.md §8).

use factory_layout_solver::catalog::BuildingKind;
use factory_layout_solver::config::FixedDimensionMode;
use factory_layout_solver::direction::Direction;
use factory_layout_solver::graph::{MachineNode, MaterialEdge, ProductionGraph};
use factory_layout_solver::model::{AttemptStatus, StreamItem};
use factory_layout_solver::{LayoutSolver, SolverConfig};
use futures::StreamExt;

fn node(id: &str, kind: BuildingKind) -> MachineNode {
    MachineNode { id: id.to_string(), label: id.to_string(), kind }
}

fn edge(id: &str, from: &str, to: &str) -> MaterialEdge {
    MaterialEdge {
        id: id.to_string(),
        from_id: from.to_string(),
        to_id: to.to_string(),
        item: "x".to_string(),
        belts: new_zealand::nz!(1),
    }
}

async fn run_to_completion(
    graph: &ProductionGraph,
    config: SolverConfig,
) -> (Vec<factory_layout_solver::model::Attempt>, factory_layout_solver::model::LayoutSolution) {
    let solver = LayoutSolver::new();
    let mut session = solver.solve(graph, config).expect("valid input");

    let mut attempts = Vec::new();
    loop {
        match session.next().await.expect("stream must end with a solution") {
            StreamItem::Attempt(a) => attempts.push(a),
            StreamItem::Solution(solution) => return (attempts, solution),
        }
    }
}

#[tokio::test]
async fn single_refinery_is_satisfiable_immediately() {
    let graph = ProductionGraph {
        nodes: vec![node("r", BuildingKind::Refinery)],
        edges: vec![],
        ..Default::default()
    };

    let (attempts, solution) = run_to_completion(&graph, SolverConfig::default()).await;

    assert_eq!(solution.status, AttemptStatus::Sat);
    assert_eq!(solution.placements.len(), 1);
    let r = &solution.placements[0];
    assert_eq!(r.node_id, "r");
    assert_eq!((r.w, r.h), (3, 3));
    assert!(solution.segments.is_empty());
    assert!(solution.bounds.width >= 3 && solution.bounds.height >= 3);
    assert!(attempts.len() <= 1);
}

#[tokio::test]
async fn two_crushers_with_an_edge_get_routed() {
    let graph = ProductionGraph {
        nodes: vec![node("a", BuildingKind::Crusher), node("b", BuildingKind::Crusher)],
        edges: vec![edge("e", "a", "b")],
        ..Default::default()
    };
    let config = SolverConfig { initial_width: Some(6), initial_height: Some(6), ..Default::default() };

    let (_, solution) = run_to_completion(&graph, config).await;

    assert_eq!(solution.status, AttemptStatus::Sat);
    assert_eq!(solution.placements.len(), 2);
    for p in &solution.placements {
        assert_eq!((p.w, p.h), (3, 3));
    }
    let a = solution.placements.iter().find(|p| p.node_id == "a").unwrap();
    let b = solution.placements.iter().find(|p| p.node_id == "b").unwrap();
    assert!(!a.overlaps(b));
    assert!(!solution.segments.is_empty(), "the a->b edge should be carried by at least one belt segment");
}

#[tokio::test]
async fn fixed_width_too_small_for_a_grinder_grows_height_and_exhausts() {
    let graph =
        ProductionGraph { nodes: vec![node("g", BuildingKind::Grinder)], edges: vec![], ..Default::default() };
    let config = SolverConfig {
        initial_width: Some(3),
        initial_height: Some(3),
        fixed_dimension_mode: FixedDimensionMode::Width,
        max_iterations: 4,
        ..Default::default()
    };

    let (attempts, solution) = run_to_completion(&graph, config).await;

    assert_eq!(attempts[0].status, AttemptStatus::Unsat, "a grinder (long=6) cannot fit in width 3");
    assert!(attempts.iter().all(|a| a.width == 3), "width stays fixed under FixedDimensionMode::Width");
    for pair in attempts.windows(2) {
        assert!(pair[1].height > pair[0].height, "height must strictly grow each iteration");
    }
    assert_eq!(solution.status, AttemptStatus::Unsat);
    assert_eq!(solution.bounds.width, 3);
    assert_eq!(solution.bounds.height, 3 + 1 * (4 - 1));
}

#[tokio::test]
async fn cancellation_yields_a_terminal_unknown_solution() {
    // Two 3x3 machines can never both fit in a 4x4 box (18 cells of footprint
    // into 16), so the first attempt is guaranteed unsat and the loop is
    // guaranteed to still be running when we cancel.
    let graph = ProductionGraph {
        nodes: vec![node("a", BuildingKind::Crusher), node("b", BuildingKind::Crusher)],
        edges: vec![edge("e", "a", "b")],
        ..Default::default()
    };
    let config = SolverConfig { initial_width: Some(4), initial_height: Some(4), ..Default::default() };

    let solver = LayoutSolver::new();
    let mut session = solver.solve(&graph, config).expect("valid input");

    let first = session.next().await.expect("at least one stream item");
    let StreamItem::Attempt(first_attempt) = first else {
        panic!("first attempt on a 4x4 box must be unsat, not an immediate solution");
    };
    assert_eq!(first_attempt.status, AttemptStatus::Unsat);

    session.cancel();

    let StreamItem::Solution(solution) =
        session.next().await.expect("a terminal solution must follow cancellation")
    else {
        panic!("expected the terminal solution event");
    };

    assert_eq!(solution.status, AttemptStatus::Unknown);
    assert!(solution.placements.is_empty());
    assert!(solution.segments.is_empty());
    assert!(session.next().await.is_none(), "stream must end after the terminal solution");
}

#[tokio::test]
async fn iteration_exhaustion_reports_unsat_at_the_initial_bounds() {
    // A width 1 box can't fit even a 3x3 crusher, so the very first attempt is
    // unsat, and with max_iterations = 1 the controller gives up immediately.
    let graph =
        ProductionGraph { nodes: vec![node("c", BuildingKind::Crusher)], edges: vec![], ..Default::default() };
    let config = SolverConfig {
        initial_width: Some(1),
        initial_height: Some(1),
        max_iterations: 1,
        ..Default::default()
    };

    let (attempts, solution) = run_to_completion(&graph, config).await;

    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status, AttemptStatus::Unsat);
    assert_eq!(solution.status, AttemptStatus::Unsat);
    assert_eq!(solution.bounds.width, 1);
    assert_eq!(solution.bounds.height, 1);
}

#[tokio::test]
async fn crossing_paths_need_a_bridge() {
    // a, c are pure sources (top of the flow) and b, d are pure sinks
    // (bottom of the flow), joined by every a/c -> b/d edge. With only two
    // sources and two sinks, any left-to-right placement of {a, c} and any
    // left-to-right placement of {b, d} leaves one pair of edges whose
    // endpoints interleave — e.g. a left of c but d left of b — and two
    // belt paths with interleaved endpoints between the same two bands
    // cannot be drawn without crossing. So whichever anchors the solver
    // picks, at least one cell must carry two perpendicular belt paths at
    // once, i.e. a bridge.
    let graph = ProductionGraph {
        nodes: vec![
            node("a", BuildingKind::Crusher),
            node("c", BuildingKind::Crusher),
            node("b", BuildingKind::Crusher),
            node("d", BuildingKind::Crusher),
        ],
        edges: vec![
            edge("a-b", "a", "b"),
            edge("a-d", "a", "d"),
            edge("c-b", "c", "b"),
            edge("c-d", "c", "d"),
        ],
        ..Default::default()
    };
    let config = SolverConfig { initial_width: Some(9), initial_height: Some(9), max_iterations: 8, ..Default::default() };

    let (_, solution) = run_to_completion(&graph, config).await;

    assert_eq!(solution.status, AttemptStatus::Sat);
    assert_eq!(solution.placements.len(), 4);

    let bridges: Vec<_> = solution.segments.iter().filter(|s| s.is_bridge).collect();
    assert!(
        !bridges.is_empty(),
        "a->b, a->d, c->b and c->d cannot all be routed without two of them crossing"
    );
    for bridge in &bridges {
        let lane = (bridge.in_dir, bridge.out_dir);
        assert!(
            lane == (Direction::Up, Direction::Down) || lane == (Direction::Down, Direction::Up),
            "a bridge's decoded primary axis must be the vertical through-pair, got {lane:?}"
        );
    }
}
