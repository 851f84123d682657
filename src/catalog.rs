//! The building catalog (C1): a pure lookup from [`BuildingKind`] to its
//! footprint and port count. Read-only, no per-session state.

use enum_iterator::Sequence;
use enum_map::{Enum, EnumMap, enum_map};
use serde::{Deserialize, Serialize};

/// A machine kind. `Conveyor` is not a valid [`crate::graph::MachineNode`]
/// kind — it exists here only so belt tiles can share the footprint/port
/// lookup machinery.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[derive(Sequence, Enum)]
#[derive(Serialize, Deserialize)]
pub enum BuildingKind {
    Filler,
    Grinder,
    Molder,
    Refinery,
    Crusher,
    Conveyor,
}

impl BuildingKind {
    pub const fn is_machine(self) -> bool {
        !matches!(self, BuildingKind::Conveyor)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            BuildingKind::Filler => "filler",
            BuildingKind::Grinder => "grinder",
            BuildingKind::Molder => "molder",
            BuildingKind::Refinery => "refinery",
            BuildingKind::Crusher => "crusher",
            BuildingKind::Conveyor => "conveyor",
        }
    }

    pub fn from_str(s: &str) -> Option<BuildingKind> {
        match s.to_ascii_lowercase().as_str() {
            "filler" => Some(BuildingKind::Filler),
            "grinder" => Some(BuildingKind::Grinder),
            "molder" => Some(BuildingKind::Molder),
            "refinery" => Some(BuildingKind::Refinery),
            "crusher" => Some(BuildingKind::Crusher),
            "conveyor" => Some(BuildingKind::Conveyor),
            _ => None,
        }
    }
}

/// A machine's footprint, `long` along the grid's X axis and `short` along Y.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[derive(Serialize, Deserialize)]
pub struct Footprint {
    pub long: usize,
    pub short: usize,
}

impl Footprint {
    pub const fn new(long: usize, short: usize) -> Self {
        Footprint { long, short }
    }

    pub const fn area(self) -> usize {
        self.long * self.short
    }

    /// Port count equals the long side, one potential port cell per long-axis
    /// column.
    pub const fn ports(self) -> usize {
        self.long
    }
}

const CATALOG: EnumMap<BuildingKind, Footprint> = enum_map! {
    BuildingKind::Filler => Footprint::new(6, 3),
    BuildingKind::Grinder => Footprint::new(6, 3),
    BuildingKind::Molder => Footprint::new(3, 3),
    BuildingKind::Refinery => Footprint::new(3, 3),
    BuildingKind::Crusher => Footprint::new(3, 3),
    BuildingKind::Conveyor => Footprint::new(1, 1),
};

/// Looks up the `(long, short)` footprint for a building kind.
pub const fn footprint(kind: BuildingKind) -> Footprint {
    CATALOG[kind]
}

/// Looks up the port count (equal to `long`) for a building kind.
pub const fn ports(kind: BuildingKind) -> usize {
    CATALOG[kind].ports()
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(BuildingKind::Filler, 6, 3)]
    #[test_case(BuildingKind::Grinder, 6, 3)]
    #[test_case(BuildingKind::Molder, 3, 3)]
    #[test_case(BuildingKind::Refinery, 3, 3)]
    #[test_case(BuildingKind::Crusher, 3, 3)]
    #[test_case(BuildingKind::Conveyor, 1, 1)]
    fn footprints_match_catalog(kind: BuildingKind, long: usize, short: usize) {
        assert_eq!(footprint(kind), Footprint::new(long, short));
        assert_eq!(ports(kind), long);
    }

    #[test_case(BuildingKind::Filler, "filler")]
    #[test_case(BuildingKind::Grinder, "grinder")]
    #[test_case(BuildingKind::Molder, "molder")]
    #[test_case(BuildingKind::Refinery, "refinery")]
    #[test_case(BuildingKind::Crusher, "crusher")]
    #[test_case(BuildingKind::Conveyor, "conveyor")]
    fn kind_name_round_trips(kind: BuildingKind, s: &str) {
        assert_eq!(kind.as_str(), s);
        assert_eq!(BuildingKind::from_str(s), Some(kind));
    }

    #[test]
    fn all_non_conveyor_kinds_have_short_side_three() {
        for kind in enum_iterator::all::<BuildingKind>() {
            if kind.is_machine() {
                assert_eq!(footprint(kind).short, 3);
            }
        }
    }
}
