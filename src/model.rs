//! The output-side data model (spec.md §3): tile states, placements, belt
//! segments, attempts and the terminal solution.

use serde::{Deserialize, Serialize};

use crate::direction::Direction;

/// The sealed, per-cell tile variant (spec.md §9 design note). Produced only
/// by the extractor (C6) as a read-only decoding of a satisfying model; it
/// never feeds back into the encoder.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TileState {
    Empty,
    Machine { node_id_index: usize },
    Conveyor { in_dir: Direction, out_dir: Direction },
    Bridge { v_in: Direction, v_out: Direction, h_in: Direction, h_out: Direction },
}

// `TileState` is decoded per grid cell for every trial rectangle; keep it
// small enough that a full-grid `Grid<TileState>` stays cache-friendly.
static_assertions::const_assert!(std::mem::size_of::<TileState>() <= 16);

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct PlacedBuilding {
    pub node_id: String,
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl PlacedBuilding {
    pub const fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x && x < self.x + self.w && y >= self.y && y < self.y + self.h
    }

    pub fn overlaps(&self, other: &PlacedBuilding) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct BeltSegment {
    pub x: usize,
    pub y: usize,
    pub in_dir: Direction,
    pub out_dir: Direction,
    pub is_bridge: bool,
    pub edge_id: Option<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[derive(Serialize, Deserialize)]
#[derive(derive_more::IsVariant)]
pub enum AttemptStatus {
    Sat,
    Unsat,
    Unknown,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Attempt {
    pub iteration: u32,
    pub width: usize,
    pub height: usize,
    pub status: AttemptStatus,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Bounds {
    pub width: usize,
    pub height: usize,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct LayoutSolution {
    pub status: AttemptStatus,
    pub bounds: Bounds,
    pub placements: Vec<PlacedBuilding>,
    pub segments: Vec<BeltSegment>,
    pub attempts: Vec<Attempt>,
    pub elapsed_ms: u64,
}

#[derive(Clone, Debug)]
#[derive(Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum StreamItem {
    Attempt(Attempt),
    Solution(LayoutSolution),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placed_buildings_detect_overlap() {
        let a = PlacedBuilding { node_id: "a".into(), x: 0, y: 0, w: 3, h: 3 };
        let b = PlacedBuilding { node_id: "b".into(), x: 2, y: 2, w: 3, h: 3 };
        let c = PlacedBuilding { node_id: "c".into(), x: 3, y: 0, w: 3, h: 3 };

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn placed_building_edge_adjacent_is_not_overlap() {
        let a = PlacedBuilding { node_id: "a".into(), x: 0, y: 0, w: 3, h: 3 };
        let b = PlacedBuilding { node_id: "b".into(), x: 3, y: 0, w: 3, h: 3 };
        assert!(!a.overlaps(&b));
    }
}
