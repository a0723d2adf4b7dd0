#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid shortest-path search used by enemy agents to chase the player.
//!
//! The search is an 8-connected A* over a [`WalkabilityGrid`]. Straight steps
//! cost [`STRAIGHT_COST`], diagonal steps cost [`DIAGONAL_COST`], and entering
//! a node adds that node's penalty. Diagonal steps never cut a blocked corner.
//! Equal-cost frontiers are broken by the lower heuristic and then by the
//! earlier insertion, so a fixed grid and endpoint pair always produce the
//! same path.

use std::{cmp::Ordering, collections::BinaryHeap};

use glam::Vec2;
use prophecy_core::NodeCoord;
use prophecy_world::WalkabilityGrid;

/// Cost of a step to an orthogonally adjacent node.
pub const STRAIGHT_COST: u32 = 10;

/// Cost of a step to a diagonally adjacent node.
pub const DIAGONAL_COST: u32 = 14;

/// Ordered waypoints produced by a single search.
///
/// The first waypoint is the centre of the start node and the last is the
/// centre of the destination node. An empty path means no route exists.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    nodes: Vec<NodeCoord>,
    waypoints: Vec<Vec2>,
}

impl Path {
    /// Creates a path with no waypoints.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a path from node coordinates, resolving their world centres.
    ///
    /// Coordinates outside the grid are skipped.
    #[must_use]
    pub fn from_nodes(grid: &WalkabilityGrid, nodes: Vec<NodeCoord>) -> Self {
        let nodes: Vec<_> = nodes
            .into_iter()
            .filter(|coord| grid.node(*coord).is_some())
            .collect();
        let waypoints = nodes
            .iter()
            .filter_map(|coord| grid.node(*coord).map(|node| node.world_position()))
            .collect();
        Self { nodes, waypoints }
    }

    /// World-space waypoints in travel order.
    #[must_use]
    pub fn waypoints(&self) -> &[Vec2] {
        &self.waypoints
    }

    /// Grid nodes visited in travel order.
    #[must_use]
    pub fn nodes(&self) -> &[NodeCoord] {
        &self.nodes
    }

    /// Waypoint stored at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Vec2> {
        self.waypoints.get(index).copied()
    }

    /// Number of waypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Reports whether the path holds no waypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Node the path ends at.
    #[must_use]
    pub fn destination(&self) -> Option<NodeCoord> {
        self.nodes.last().copied()
    }
}

/// Source of paths between two world positions.
///
/// Implementations must be read-only over the grid so any number of agents
/// may plan against it in the same frame.
pub trait PathPlanner {
    /// Computes a path from `start` to `destination`; empty when unreachable.
    fn find_path(&self, grid: &WalkabilityGrid, start: Vec2, destination: Vec2) -> Path;
}

/// A* path finder over a walkability grid.
///
/// The finder holds no search state between calls.
#[derive(Clone, Copy, Debug, Default)]
pub struct PathFinder;

impl PathFinder {
    /// Creates a new path finder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a path between two grid nodes.
    ///
    /// A blocked start falls back to the nearest walkable node. A blocked,
    /// out-of-bounds or disconnected destination yields an empty path.
    #[must_use]
    pub fn find_path_between(
        &self,
        grid: &WalkabilityGrid,
        start: NodeCoord,
        destination: NodeCoord,
    ) -> Path {
        if !grid.is_walkable(destination) {
            tracing::debug!(?destination, "destination node is not walkable");
            return Path::empty();
        }

        let start = if grid.is_walkable(start) {
            start
        } else {
            match grid.nearest_walkable(start) {
                Some(fallback) => {
                    tracing::trace!(?start, ?fallback, "start node blocked; using fallback");
                    fallback
                }
                None => return Path::empty(),
            }
        };

        tracing::trace!(?start, ?destination, "searching for path");
        match search(grid, start, destination) {
            Some(nodes) => Path::from_nodes(grid, nodes),
            None => {
                tracing::debug!(?start, ?destination, "destination unreachable");
                Path::empty()
            }
        }
    }
}

impl PathPlanner for PathFinder {
    fn find_path(&self, grid: &WalkabilityGrid, start: Vec2, destination: Vec2) -> Path {
        self.find_path_between(grid, grid.coord_at(start), grid.coord_at(destination))
    }
}

/// Octile distance in step-cost units.
#[must_use]
pub fn octile_distance(from: NodeCoord, to: NodeCoord) -> u32 {
    let dx = from.x().abs_diff(to.x());
    let dy = from.y().abs_diff(to.y());
    let (long, short) = if dx > dy { (dx, dy) } else { (dy, dx) };
    STRAIGHT_COST * long + (DIAGONAL_COST - STRAIGHT_COST) * short
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenEntry {
    f: u32,
    h: u32,
    order: u64,
    index: usize,
    g: u32,
}

impl OpenEntry {
    fn rank(&self) -> (u32, u32, u64) {
        (self.f, self.h, self.order)
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert so the lowest rank pops first.
        other.rank().cmp(&self.rank())
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn search(grid: &WalkabilityGrid, start: NodeCoord, goal: NodeCoord) -> Option<Vec<NodeCoord>> {
    let start_index = grid.index(start)?;
    let goal_index = grid.index(goal)?;

    let mut best_cost = vec![u32::MAX; grid.len()];
    let mut came_from: Vec<Option<usize>> = vec![None; grid.len()];
    let mut closed = vec![false; grid.len()];
    let mut open = BinaryHeap::new();
    let mut order = 0_u64;

    best_cost[start_index] = 0;
    let h = octile_distance(start, goal);
    open.push(OpenEntry {
        f: h,
        h,
        order,
        index: start_index,
        g: 0,
    });

    while let Some(entry) = open.pop() {
        if closed[entry.index] || entry.g > best_cost[entry.index] {
            continue;
        }
        if entry.index == goal_index {
            return Some(reconstruct(grid, &came_from, goal_index));
        }
        closed[entry.index] = true;

        let coord = coord_of(grid, entry.index);
        for neighbour in grid.neighbours(coord) {
            let Some(node) = grid.node(neighbour.coord) else {
                continue;
            };
            if !node.walkable() {
                continue;
            }
            if neighbour.diagonal && cuts_corner(grid, coord, neighbour.coord) {
                continue;
            }
            let Some(next_index) = grid.index(neighbour.coord) else {
                continue;
            };
            if closed[next_index] {
                continue;
            }

            let step = if neighbour.diagonal {
                DIAGONAL_COST
            } else {
                STRAIGHT_COST
            };
            let g = entry.g.saturating_add(step).saturating_add(node.penalty());
            if g >= best_cost[next_index] {
                continue;
            }

            best_cost[next_index] = g;
            came_from[next_index] = Some(entry.index);
            order += 1;
            let h = octile_distance(neighbour.coord, goal);
            open.push(OpenEntry {
                f: g.saturating_add(h),
                h,
                order,
                index: next_index,
                g,
            });
        }
    }

    None
}

fn cuts_corner(grid: &WalkabilityGrid, from: NodeCoord, to: NodeCoord) -> bool {
    let horizontal = NodeCoord::new(to.x(), from.y());
    let vertical = NodeCoord::new(from.x(), to.y());
    !grid.is_walkable(horizontal) || !grid.is_walkable(vertical)
}

fn coord_of(grid: &WalkabilityGrid, index: usize) -> NodeCoord {
    let columns = grid.columns() as usize;
    NodeCoord::new((index % columns) as u32, (index / columns) as u32)
}

fn reconstruct(grid: &WalkabilityGrid, came_from: &[Option<usize>], goal: usize) -> Vec<NodeCoord> {
    let mut nodes = vec![coord_of(grid, goal)];
    let mut current = goal;
    while let Some(previous) = came_from[current] {
        nodes.push(coord_of(grid, previous));
        current = previous;
    }
    nodes.reverse();
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use prophecy_world::NodeKind;

    fn open_grid(columns: u32, rows: u32) -> WalkabilityGrid {
        WalkabilityGrid::from_fn(columns, rows, 1.0, Vec2::ZERO, |_| NodeKind::OPEN)
            .expect("valid grid")
    }

    #[test]
    fn octile_distance_mixes_straight_and_diagonal_steps() {
        assert_eq!(
            octile_distance(NodeCoord::new(0, 0), NodeCoord::new(3, 1)),
            34
        );
        assert_eq!(
            octile_distance(NodeCoord::new(2, 2), NodeCoord::new(2, 2)),
            0
        );
    }

    #[test]
    fn path_to_self_contains_single_waypoint() {
        let grid = open_grid(3, 3);
        let path = PathFinder::new().find_path_between(
            &grid,
            NodeCoord::new(1, 1),
            NodeCoord::new(1, 1),
        );
        assert_eq!(path.waypoints(), &[Vec2::new(1.5, 1.5)]);
        assert_eq!(path.destination(), Some(NodeCoord::new(1, 1)));
    }

    #[test]
    fn straight_corridor_is_followed_node_by_node() {
        let grid = open_grid(5, 1);
        let path =
            PathFinder::new().find_path(&grid, Vec2::new(0.2, 0.5), Vec2::new(4.9, 0.1));
        let xs: Vec<_> = path.nodes().iter().map(|node| node.x()).collect();
        assert_eq!(xs, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn diagonal_does_not_cut_blocked_corner() {
        let grid =
            WalkabilityGrid::from_rows(&["..", "#."], 1.0, Vec2::ZERO).expect("layout");
        let path = PathFinder::new().find_path_between(
            &grid,
            NodeCoord::new(1, 0),
            NodeCoord::new(0, 1),
        );
        assert_eq!(
            path.nodes(),
            &[
                NodeCoord::new(1, 0),
                NodeCoord::new(1, 1),
                NodeCoord::new(0, 1)
            ]
        );
    }

    #[test]
    fn penalties_steer_search_around_costly_nodes() {
        let grid = WalkabilityGrid::from_rows(&["...", ".9.", "..."], 1.0, Vec2::ZERO)
            .expect("layout");
        let path = PathFinder::new().find_path_between(
            &grid,
            NodeCoord::new(0, 1),
            NodeCoord::new(2, 1),
        );
        assert!(!path.is_empty());
        assert!(!path.nodes().contains(&NodeCoord::new(1, 1)));
    }

    #[test]
    fn blocked_start_falls_back_to_nearest_walkable_node() {
        let grid = WalkabilityGrid::from_rows(&["...", "...", "#.."], 1.0, Vec2::ZERO)
            .expect("layout");
        let path = PathFinder::new().find_path_between(
            &grid,
            NodeCoord::new(0, 0),
            NodeCoord::new(2, 2),
        );
        assert_eq!(path.nodes().first(), Some(&NodeCoord::new(1, 0)));
        assert_eq!(path.destination(), Some(NodeCoord::new(2, 2)));
    }

    #[test]
    fn blocked_destination_yields_empty_path() {
        let grid = WalkabilityGrid::from_rows(&["..#"], 1.0, Vec2::ZERO).expect("layout");
        let path = PathFinder::new().find_path_between(
            &grid,
            NodeCoord::new(0, 0),
            NodeCoord::new(2, 0),
        );
        assert!(path.is_empty());
        assert_eq!(path.destination(), None);
    }

    #[test]
    fn open_entries_pop_lowest_rank_first() {
        let mut heap = BinaryHeap::new();
        for (f, h, order) in [(5, 1, 2), (4, 3, 1), (4, 2, 3), (4, 2, 0)] {
            heap.push(OpenEntry {
                f,
                h,
                order,
                index: 0,
                g: 0,
            });
        }
        let popped: Vec<_> = std::iter::from_fn(|| heap.pop().map(|entry| entry.rank())).collect();
        assert_eq!(popped, vec![(4, 2, 0), (4, 2, 3), (4, 3, 1), (5, 1, 2)]);
    }
}
