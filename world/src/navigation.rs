//! Breadth-first path planner over walkable map cells.

use std::collections::VecDeque;

use outbreak_core::{Connectivity, MapAdapter, Position};

use crate::grid::{cell_index, neighbor_positions};

/// Plans shortest orthogonal routes between two cells.
///
/// Every call runs a fresh breadth-first search against the map adapter's
/// walkability predicate; nothing is cached between calls. Ties between
/// equally short routes resolve through the neighbor enumeration order
/// (north, east, south, west).
#[derive(Clone, Debug)]
pub struct PathFinder {
    width: u32,
    height: u32,
}

impl PathFinder {
    /// Creates a path finder for a map of the provided dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Creates a path finder sized to the map adapter.
    #[must_use]
    pub fn for_map<M>(map: &M) -> Self
    where
        M: MapAdapter + ?Sized,
    {
        let (width, height) = map.dimensions();
        Self::new(width, height)
    }

    /// Finds the cells leading from `start` to `end`.
    ///
    /// The returned route excludes `start` and ends with `end`, so callers pop
    /// one position per step. An empty route means the agent should stay put:
    /// `end` is unreachable, outside the map, or equal to `start`.
    #[must_use]
    pub fn find<M>(&self, map: &M, start: Position, end: Position) -> Vec<Position>
    where
        M: MapAdapter + ?Sized,
    {
        if start == end {
            return Vec::new();
        }

        let Some(start_index) = cell_index(start, self.width, self.height) else {
            return Vec::new();
        };
        if cell_index(end, self.width, self.height).is_none() {
            return Vec::new();
        }

        let cell_count = usize::try_from(u64::from(self.width) * u64::from(self.height))
            .unwrap_or(0);
        let mut parents: Vec<Option<Position>> = vec![None; cell_count];
        let mut visited = vec![false; cell_count];
        visited[start_index] = true;

        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            if current == end {
                return self.trace(&parents, start, end);
            }

            for neighbor in neighbor_positions(
                current,
                self.width,
                self.height,
                Connectivity::VonNeumann,
                false,
            ) {
                let Some(index) = cell_index(neighbor, self.width, self.height) else {
                    continue;
                };
                if visited[index] || !map.is_walkable(neighbor) {
                    continue;
                }

                visited[index] = true;
                parents[index] = Some(current);
                queue.push_back(neighbor);
            }
        }

        Vec::new()
    }

    fn trace(&self, parents: &[Option<Position>], start: Position, end: Position) -> Vec<Position> {
        let mut path = Vec::new();
        let mut cursor = end;

        while cursor != start {
            path.push(cursor);
            let Some(parent) = cell_index(cursor, self.width, self.height)
                .and_then(|index| parents.get(index).copied().flatten())
            else {
                return Vec::new();
            };
            cursor = parent;
        }

        path.reverse();
        path
    }
}
