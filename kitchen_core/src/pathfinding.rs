//! A* search over the 4-connected kitchen grid.
//!
//! The frontier is ordered by total cost `f = g + h` and, among equal `f`,
//! by discovery order, so the first-discovered node wins every tie. The
//! heuristic is the squared Euclidean distance to the goal. It is not
//! admissible, and replacing it changes which of several equal-length paths
//! is returned.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet},
};

use crate::{
    Position,
    map::{Grid, Terrain},
};

/// Cost of a single move.
const STEP_COST: usize = 1;

/// Neighbor expansion order: left, up, right, down.
const NEIGHBOR_OFFSETS: [(isize, isize); 4] = [(-1, 0), (0, -1), (1, 0), (0, 1)];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("start {0} lies outside the grid")]
    StartOutOfBounds(Position),
    #[error("goal {0} lies outside the grid")]
    GoalOutOfBounds(Position),
    #[error("no walkable route from {start} to {goal}")]
    Unreachable { start: Position, goal: Position },
}

/// Result of a search: the visited cells from start onward.
///
/// `reaches_goal` is false when the iteration cap cut the search short; the
/// path then ends at the most promising frontier cell and callers are expected
/// to search again on a later tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    steps: Vec<Position>,
    reaches_goal: bool,
}

impl Path {
    pub fn steps(&self) -> &[Position] {
        &self.steps
    }

    pub fn reaches_goal(&self) -> bool {
        self.reaches_goal
    }

    /// The cell to step onto next, if the path leaves the start at all.
    pub fn next_step(&self) -> Option<Position> {
        self.steps.get(1).copied()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A discovered cell. Nodes live in an arena and refer to their parent by index.
#[derive(Debug, Clone, Copy)]
struct SearchNode {
    position: Position,
    parent: Option<usize>,
    g: usize,
}

/// Frontier entry. `order` is the node's arena index, which is also its discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrontierEntry {
    f: usize,
    order: usize,
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn heuristic(from: Position, goal: Position) -> usize {
    let dx = from.x.abs_diff(goal.x);
    let dy = from.y.abs_diff(goal.y);
    dx * dx + dy * dy
}

/// Maximum number of frontier pops: `(width / 2)^10`.
fn iteration_cap(grid: &Grid<Terrain>) -> usize {
    (grid.width() / 2).checked_pow(10).unwrap_or(usize::MAX)
}

fn reconstruct(nodes: &[SearchNode], mut index: usize) -> Vec<Position> {
    let mut steps = vec![nodes[index].position];
    while let Some(parent) = nodes[index].parent {
        steps.push(nodes[parent].position);
        index = parent;
    }
    steps.reverse();
    steps
}

/// Finds a path from `start` to `goal`, both inclusive.
///
/// The goal cell must be walkable; callers that want to end next to a
/// station pass a grid [carved](Grid::carved) at the destination.
pub fn find_path(grid: &Grid<Terrain>, start: Position, goal: Position) -> Result<Path, PathError> {
    if !grid.contains(start) {
        return Err(PathError::StartOutOfBounds(start));
    }
    if !grid.contains(goal) {
        return Err(PathError::GoalOutOfBounds(goal));
    }
    if start == goal {
        return Ok(Path {
            steps: vec![start],
            reaches_goal: true,
        });
    }

    let max_iterations = iteration_cap(grid);
    let mut nodes = vec![SearchNode {
        position: start,
        parent: None,
        g: 0,
    }];
    let mut frontier = BinaryHeap::from([FrontierEntry { f: 0, order: 0 }]);
    // Lowest g discovered so far per cell; stale heap entries are skipped when popped.
    let mut best_g: HashMap<Position, usize> = HashMap::from([(start, 0)]);
    let mut closed: HashSet<Position> = HashSet::new();
    let mut iterations = 0usize;

    while let Some(entry) = frontier.pop() {
        iterations += 1;
        let current = nodes[entry.order];

        if iterations > max_iterations {
            let steps = reconstruct(&nodes, entry.order);
            tracing::warn!(
                %start,
                %goal,
                reached = %current.position,
                iterations,
                "giving up on pathfinding, too many iterations"
            );
            return Ok(Path {
                steps,
                reaches_goal: false,
            });
        }

        if current.position == goal {
            let steps = reconstruct(&nodes, entry.order);
            tracing::debug!(%start, %goal, length = steps.len(), iterations, "path found");
            return Ok(Path {
                steps,
                reaches_goal: true,
            });
        }

        if !closed.insert(current.position) {
            continue;
        }

        for (dx, dy) in NEIGHBOR_OFFSETS {
            let Some(next) = current.position.offset(dx, dy) else {
                continue;
            };
            if !grid.is_walkable(next) || closed.contains(&next) {
                continue;
            }
            let g = current.g + STEP_COST;
            if best_g.get(&next).is_some_and(|&known| known <= g) {
                continue;
            }
            let f = g + heuristic(next, goal);
            let order = nodes.len();
            nodes.push(SearchNode {
                position: next,
                parent: Some(entry.order),
                g,
            });
            best_g.insert(next, g);
            frontier.push(FrontierEntry { f, order });
        }
    }

    Err(PathError::Unreachable { start, goal })
}
