use glam::Vec2;
use prophecy_core::NodeCoord;
use prophecy_system_pathfinding::{PathFinder, PathPlanner};
use prophecy_world::{NodeKind, WalkabilityGrid};

fn uniform_grid() -> WalkabilityGrid {
    WalkabilityGrid::from_fn(10, 10, 1.0, Vec2::ZERO, |_| NodeKind::OPEN).expect("valid grid")
}

fn grid_with_obstacle(obstacle: NodeCoord) -> WalkabilityGrid {
    WalkabilityGrid::from_fn(10, 10, 1.0, Vec2::ZERO, |coord| {
        if coord == obstacle {
            NodeKind::Blocked
        } else {
            NodeKind::OPEN
        }
    })
    .expect("valid grid")
}

fn assert_sound(grid: &WalkabilityGrid, nodes: &[NodeCoord]) {
    for node in nodes {
        assert!(grid.is_walkable(*node), "path enters blocked node {node:?}");
    }
    for pair in nodes.windows(2) {
        assert!(
            pair[0].is_adjacent_or_equal(pair[1]),
            "waypoints {:?} and {:?} are not adjacent",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn diagonal_across_uniform_grid_takes_ten_waypoints() {
    let grid = uniform_grid();
    let destination = NodeCoord::new(9, 9);
    let path = PathFinder::new().find_path(&grid, Vec2::new(0.5, 0.5), Vec2::new(9.5, 9.5));

    assert_eq!(path.len(), 10);
    assert_eq!(path.nodes().first(), Some(&NodeCoord::new(0, 0)));
    assert_eq!(path.destination(), Some(destination));
    assert_sound(&grid, path.nodes());

    let distances: Vec<_> = path
        .nodes()
        .iter()
        .map(|node| node.chebyshev_distance(destination))
        .collect();
    for pair in distances.windows(2) {
        assert!(pair[1] < pair[0], "distance did not decrease: {distances:?}");
    }
    assert_eq!(path.get(9), Some(Vec2::new(9.5, 9.5)));
}

#[test]
fn single_obstacle_forces_detour() {
    let obstacle = NodeCoord::new(5, 5);
    let grid = grid_with_obstacle(obstacle);
    let path = PathFinder::new().find_path_between(
        &grid,
        NodeCoord::new(5, 0),
        NodeCoord::new(5, 9),
    );

    assert!(!path.is_empty());
    assert!(!path.nodes().contains(&obstacle));
    assert_eq!(path.nodes().first(), Some(&NodeCoord::new(5, 0)));
    assert_eq!(path.destination(), Some(NodeCoord::new(5, 9)));
    assert_sound(&grid, path.nodes());
}

#[test]
fn repeated_searches_return_identical_paths() {
    let grid = grid_with_obstacle(NodeCoord::new(5, 5));
    let finder = PathFinder::new();
    let start = Vec2::new(5.5, 0.5);
    let destination = Vec2::new(5.2, 9.7);

    let first = finder.find_path(&grid, start, destination);
    for _ in 0..5 {
        assert_eq!(finder.find_path(&grid, start, destination), first);
    }
}

#[test]
fn disconnected_regions_yield_empty_path() {
    let grid = WalkabilityGrid::from_rows(
        &["..#..", "..#..", "..#..", "..#..", "..#.."],
        1.0,
        Vec2::ZERO,
    )
    .expect("layout");
    let path = PathFinder::new().find_path_between(
        &grid,
        NodeCoord::new(0, 0),
        NodeCoord::new(4, 4),
    );
    assert!(path.is_empty());
}

#[test]
fn out_of_bounds_positions_clamp_to_boundary_nodes() {
    let grid = uniform_grid();
    let path = PathFinder::new().find_path(&grid, Vec2::new(-4.0, -4.0), Vec2::new(40.0, 0.5));

    assert_eq!(path.nodes().first(), Some(&NodeCoord::new(0, 0)));
    assert_eq!(path.destination(), Some(NodeCoord::new(9, 0)));
}

#[test]
fn maze_paths_stay_on_walkable_adjacent_nodes() {
    let grid = WalkabilityGrid::from_rows(
        &[
            "..........",
            ".########.",
            ".#......#.",
            ".#.####.#.",
            ".#.#..#.#.",
            ".#.#.2#.#.",
            ".#.#..#.#.",
            ".#.##.#.#.",
            ".#....#...",
            "..........",
        ],
        1.0,
        Vec2::ZERO,
    )
    .expect("layout");
    let path = PathFinder::new().find_path_between(
        &grid,
        NodeCoord::new(0, 0),
        NodeCoord::new(4, 5),
    );

    assert!(!path.is_empty());
    assert_eq!(path.destination(), Some(NodeCoord::new(4, 5)));
    assert_sound(&grid, path.nodes());
}
