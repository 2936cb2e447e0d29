use serde::{Deserialize, Serialize};

pub mod agent;
pub mod executor;
pub mod interaction;
pub mod items;
pub mod kitchen;
pub mod layout;
pub mod map;
pub mod pathfinding;
pub mod task;

/// Identifier of a cooperating agent. The kitchen runs exactly two: `1` and `2`.
pub type AgentId = usize;

/// Represents a 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Applies a signed offset, returning `None` if either coordinate would underflow.
    pub fn offset(self, dx: isize, dy: isize) -> Option<Position> {
        Some(Position {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }

    /// Returns manhattan distance between two positions
    pub fn manhattan_distance(self, other: Position) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Returns true if `other` is exactly one step away along a single axis.
    pub fn is_adjacent(self, other: Position) -> bool {
        self.manhattan_distance(other) == 1
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A primitive action for one tick.
///
/// Only the null action and the four unit moves are ever produced by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Action {
    #[default]
    Wait,
    Move { dx: isize, dy: isize },
}

impl Action {
    pub const UP: Action = Action::Move { dx: 0, dy: -1 };
    pub const DOWN: Action = Action::Move { dx: 0, dy: 1 };
    pub const LEFT: Action = Action::Move { dx: -1, dy: 0 };
    pub const RIGHT: Action = Action::Move { dx: 1, dy: 0 };

    /// Converts a move between two adjacent positions into an Action.
    ///
    /// Non-adjacent pairs degrade to `Wait`.
    pub fn toward(src: Position, dst: Position) -> Action {
        let dx = dst.x as isize - src.x as isize;
        let dy = dst.y as isize - src.y as isize;

        match (dx, dy) {
            (0, 0) => Action::Wait,
            (0, 1) | (0, -1) | (1, 0) | (-1, 0) => Action::Move { dx, dy },
            _ => {
                tracing::warn!(%src, %dst, "no single-step move between positions");
                Action::Wait
            }
        }
    }

    /// Returns the `(dx, dy)` pair, `(0, 0)` for `Wait`.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Action::Wait => (0, 0),
            Action::Move { dx, dy } => (dx, dy),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (dx, dy) = self.offset();
        write!(f, "({dx}, {dy})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toward_adjacent_cells() {
        let origin = Position::new(2, 2);
        assert_eq!(Action::toward(origin, Position::new(3, 2)), Action::RIGHT);
        assert_eq!(Action::toward(origin, Position::new(1, 2)), Action::LEFT);
        assert_eq!(Action::toward(origin, Position::new(2, 1)), Action::UP);
        assert_eq!(Action::toward(origin, Position::new(2, 3)), Action::DOWN);
        assert_eq!(Action::toward(origin, origin), Action::Wait);
    }

    #[test]
    fn toward_distant_cell_waits() {
        assert_eq!(
            Action::toward(Position::new(0, 0), Position::new(2, 1)),
            Action::Wait
        );
    }

    #[test]
    fn offset_underflow_is_none() {
        assert_eq!(Position::new(0, 3).offset(-1, 0), None);
        assert_eq!(Position::new(0, 3).offset(1, -1), Some(Position::new(1, 2)));
    }
}
