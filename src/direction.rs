//! The four unit directions a belt can face, and their grid deltas.

use enum_iterator::Sequence;
use enum_map::Enum;
use serde::{Deserialize, Serialize, Serializer, de::Deserializer};

use crate::math::Point;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[derive(Sequence, Enum)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
        }
    }

    /// The grid offset of moving one cell in this direction.
    /// Y increases downward, per the engine's coordinate convention.
    pub const fn delta(self) -> Point {
        match self {
            Direction::Up => Point::new(0, -1),
            Direction::Right => Point::new(1, 0),
            Direction::Down => Point::new(0, 1),
            Direction::Left => Point::new(-1, 0),
        }
    }

    pub const fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    pub const fn is_horizontal(self) -> bool {
        !self.is_vertical()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Right => "right",
            Direction::Down => "down",
            Direction::Left => "left",
        }
    }

    pub const fn from_str(s: &str) -> Option<Direction> {
        match s.as_bytes() {
            b"up" => Some(Direction::Up),
            b"right" => Some(Direction::Right),
            b"down" => Some(Direction::Down),
            b"left" => Some(Direction::Left),
            _ => None,
        }
    }

    pub fn all() -> impl Iterator<Item = Direction> {
        enum_iterator::all::<Direction>()
    }
}

impl Serialize for Direction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Direction::from_str(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid direction {s:?}")))
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(Direction::Up, Direction::Down)]
    #[test_case(Direction::Down, Direction::Up)]
    #[test_case(Direction::Left, Direction::Right)]
    #[test_case(Direction::Right, Direction::Left)]
    fn opposite_is_involution(d: Direction, expected: Direction) {
        assert_eq!(d.opposite(), expected);
        assert_eq!(d.opposite().opposite(), d);
    }

    #[test]
    fn exactly_one_vertical_pair_and_one_horizontal_pair() {
        let verticals: Vec<_> = Direction::all().filter(|d| d.is_vertical()).collect();
        let horizontals: Vec<_> = Direction::all().filter(|d| d.is_horizontal()).collect();
        assert_eq!(verticals.len(), 2);
        assert_eq!(horizontals.len(), 2);
    }

    #[test_case(Direction::Up, "up")]
    #[test_case(Direction::Right, "right")]
    #[test_case(Direction::Down, "down")]
    #[test_case(Direction::Left, "left")]
    fn serializes_to_lowercase_string(d: Direction, s: &str) {
        assert_eq!(d.as_str(), s);
        assert_eq!(Direction::from_str(s), Some(d));
    }
}
