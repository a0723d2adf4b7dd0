//! Per-agent path caching, re-planning and waypoint advance.

use std::time::Duration;

use glam::Vec2;
use prophecy_core::{Facing, NodeCoord};
use prophecy_system_pathfinding::{Path, PathPlanner};
use prophecy_world::WalkabilityGrid;

/// Tuning for a [`PathFollower`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FollowerConfig {
    /// Minimum time between destination checks.
    pub replan_interval: Duration,
    /// Distance to a waypoint's node centre at which the waypoint counts as reached.
    pub arrival_threshold: f32,
    /// Travel speed in world units per second.
    pub move_speed: f32,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            replan_interval: Duration::from_millis(70),
            arrival_threshold: 0.15,
            move_speed: 4.0,
        }
    }
}

/// Whether the follower is chasing its destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FollowMode {
    /// Re-planning and advancing along the path.
    Active,
    /// Holding a cached path without following it.
    Idle,
}

/// Displacement requested for a single physics step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step {
    /// Translation to apply to the agent.
    pub delta: Vec2,
    /// Facing derived from the horizontal component, if any.
    pub facing: Option<Facing>,
}

impl Step {
    /// Builds a step from `from` toward `to`, covering at most `max_distance`.
    #[must_use]
    pub fn towards(from: Vec2, to: Vec2, max_distance: f32) -> Self {
        let offset = to - from;
        let length = offset.length();
        let delta = if length <= max_distance || length <= f32::EPSILON {
            offset
        } else {
            offset * (max_distance / length)
        };
        Self {
            delta,
            facing: Facing::from_horizontal(delta.x),
        }
    }
}

/// Cached path plus the cursor and timer that decide when to re-plan.
///
/// The cursor only moves forward along a path and never passes its end. It
/// returns to zero only when the path is replaced.
#[derive(Clone, Debug)]
pub struct PathFollower {
    config: FollowerConfig,
    mode: FollowMode,
    path: Path,
    cursor: usize,
    destination: Option<NodeCoord>,
    timer: Duration,
}

impl PathFollower {
    /// Creates an active follower whose first update plans immediately.
    #[must_use]
    pub fn new(config: FollowerConfig) -> Self {
        Self {
            mode: FollowMode::Active,
            path: Path::empty(),
            cursor: 0,
            destination: None,
            timer: config.replan_interval,
            config,
        }
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> FollowMode {
        self.mode
    }

    /// Path currently being followed.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Index of the next waypoint.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Destination node the current path was planned for.
    #[must_use]
    pub fn destination_node(&self) -> Option<NodeCoord> {
        self.destination
    }

    /// Reports whether no waypoints remain.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.path.len()
    }

    /// Stops following; the cached path is kept but marked exhausted.
    pub fn deactivate(&mut self) {
        self.mode = FollowMode::Idle;
        self.cursor = self.path.len();
    }

    /// Resumes following `destination`.
    ///
    /// Plans immediately when the destination node differs from the cached
    /// one. Otherwise the next timer expiry re-plans, since the cached path
    /// was exhausted while idle. Returns whether a search ran.
    pub fn activate<P>(
        &mut self,
        planner: &P,
        grid: &WalkabilityGrid,
        position: Vec2,
        destination: Vec2,
    ) -> bool
    where
        P: PathPlanner + ?Sized,
    {
        if self.mode == FollowMode::Active {
            return false;
        }
        self.mode = FollowMode::Active;

        let node = grid.coord_at(destination);
        if self.destination == Some(node) {
            if self.is_exhausted() {
                self.destination = None;
            }
            return false;
        }

        self.timer = Duration::ZERO;
        self.replan(planner, grid, position, destination, node);
        true
    }

    /// Advances the re-plan timer and re-plans when the destination node
    /// changed. Returns whether a search ran.
    pub fn update<P>(
        &mut self,
        dt: Duration,
        planner: &P,
        grid: &WalkabilityGrid,
        position: Vec2,
        destination: Vec2,
    ) -> bool
    where
        P: PathPlanner + ?Sized,
    {
        if self.mode == FollowMode::Idle {
            return false;
        }

        self.timer = self.timer.saturating_add(dt);
        if self.timer < self.config.replan_interval {
            return false;
        }
        self.timer = Duration::ZERO;

        let node = grid.coord_at(destination);
        if self.destination == Some(node) {
            return false;
        }

        self.replan(planner, grid, position, destination, node);
        true
    }

    /// Advances the cursor past a reached waypoint and steps toward the next.
    ///
    /// Returns `None` while idle or once the path is exhausted.
    pub fn fixed_update(
        &mut self,
        dt: Duration,
        position: Vec2,
        grid: &WalkabilityGrid,
    ) -> Option<Step> {
        if self.mode == FollowMode::Idle {
            return None;
        }

        if let Some(waypoint) = self.path.get(self.cursor) {
            let centre = grid.node_at(waypoint).world_position();
            if position.distance(centre) <= self.config.arrival_threshold {
                self.cursor += 1;
            }
        }

        let waypoint = self.path.get(self.cursor)?;
        let step = Step::towards(position, waypoint, self.config.move_speed * dt.as_secs_f32());
        (step.delta != Vec2::ZERO).then_some(step)
    }

    fn replan<P>(
        &mut self,
        planner: &P,
        grid: &WalkabilityGrid,
        position: Vec2,
        destination: Vec2,
        node: NodeCoord,
    ) where
        P: PathPlanner + ?Sized,
    {
        let path = planner.find_path(grid, position, destination);
        self.destination = if path.is_empty() {
            tracing::trace!(?node, "re-plan found no path; holding position");
            None
        } else {
            Some(node)
        };
        self.path = path;
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use prophecy_system_pathfinding::PathFinder;
    use prophecy_world::NodeKind;

    struct CountingPlanner {
        finder: PathFinder,
        calls: Cell<usize>,
    }

    impl CountingPlanner {
        fn new() -> Self {
            Self {
                finder: PathFinder::new(),
                calls: Cell::new(0),
            }
        }
    }

    impl PathPlanner for CountingPlanner {
        fn find_path(&self, grid: &WalkabilityGrid, start: Vec2, destination: Vec2) -> Path {
            self.calls.set(self.calls.get() + 1);
            self.finder.find_path(grid, start, destination)
        }
    }

    fn open_grid() -> WalkabilityGrid {
        WalkabilityGrid::from_fn(10, 10, 1.0, Vec2::ZERO, |_| NodeKind::OPEN)
            .expect("valid grid")
    }

    const INTERVAL: Duration = Duration::from_millis(70);

    #[test]
    fn first_update_plans_immediately() {
        let grid = open_grid();
        let planner = CountingPlanner::new();
        let mut follower = PathFollower::new(FollowerConfig::default());

        assert!(follower.update(
            Duration::from_millis(1),
            &planner,
            &grid,
            Vec2::new(0.5, 0.5),
            Vec2::new(3.5, 0.5),
        ));
        assert_eq!(planner.calls.get(), 1);
        assert_eq!(follower.path().len(), 4);
        assert_eq!(follower.destination_node(), Some(NodeCoord::new(3, 0)));
    }

    #[test]
    fn jitter_within_same_node_does_not_replan() {
        let grid = open_grid();
        let planner = CountingPlanner::new();
        let mut follower = PathFollower::new(FollowerConfig::default());
        let start = Vec2::new(0.5, 0.5);

        let _ = follower.update(INTERVAL, &planner, &grid, start, Vec2::new(5.2, 5.2));
        let replanned = follower.update(INTERVAL, &planner, &grid, start, Vec2::new(5.8, 5.9));

        assert!(!replanned);
        assert_eq!(planner.calls.get(), 1);
    }

    #[test]
    fn crossing_into_new_node_replans_on_expiry() {
        let grid = open_grid();
        let planner = CountingPlanner::new();
        let mut follower = PathFollower::new(FollowerConfig::default());
        let start = Vec2::new(0.5, 0.5);

        let _ = follower.update(INTERVAL, &planner, &grid, start, Vec2::new(5.5, 5.5));
        assert!(!follower.update(
            Duration::from_millis(30),
            &planner,
            &grid,
            start,
            Vec2::new(6.5, 5.5),
        ));
        assert_eq!(planner.calls.get(), 1, "timer has not expired yet");

        assert!(follower.update(
            Duration::from_millis(40),
            &planner,
            &grid,
            start,
            Vec2::new(6.5, 5.5),
        ));
        assert_eq!(planner.calls.get(), 2);
        assert_eq!(follower.destination_node(), Some(NodeCoord::new(6, 5)));
    }

    #[test]
    fn empty_result_is_retried_at_next_expiry() {
        let grid = WalkabilityGrid::from_rows(&["..#.."], 1.0, Vec2::ZERO).expect("layout");
        let planner = CountingPlanner::new();
        let mut follower = PathFollower::new(FollowerConfig::default());
        let start = Vec2::new(0.5, 0.5);
        let unreachable = Vec2::new(4.5, 0.5);

        let _ = follower.update(INTERVAL, &planner, &grid, start, unreachable);
        assert!(follower.path().is_empty());
        assert_eq!(follower.destination_node(), None);
        assert!(follower
            .fixed_update(Duration::from_millis(20), start, &grid)
            .is_none());

        let _ = follower.update(INTERVAL, &planner, &grid, start, unreachable);
        assert_eq!(planner.calls.get(), 2);
    }

    #[test]
    fn cursor_never_passes_path_end_and_only_resets_on_replacement() {
        let grid = open_grid();
        let planner = CountingPlanner::new();
        let mut follower = PathFollower::new(FollowerConfig::default());
        let mut position = Vec2::new(0.5, 0.5);
        let destination = Vec2::new(4.5, 0.5);
        let dt = Duration::from_millis(20);

        let _ = follower.update(dt, &planner, &grid, position, destination);
        let mut previous = follower.cursor();
        for _ in 0..200 {
            if let Some(step) = follower.fixed_update(dt, position, &grid) {
                position += step.delta;
            }
            assert!(follower.cursor() >= previous);
            assert!(follower.cursor() <= follower.path().len());
            previous = follower.cursor();
        }

        assert!(follower.is_exhausted());
        assert!(position.distance(destination) <= 0.15);
        assert!(follower.fixed_update(dt, position, &grid).is_none());

        let _ = follower.update(INTERVAL, &planner, &grid, position, Vec2::new(4.5, 3.5));
        assert_eq!(follower.cursor(), 0);
    }

    #[test]
    fn steps_never_overshoot_and_report_facing() {
        let step = Step::towards(Vec2::new(2.0, 0.0), Vec2::new(0.0, 0.0), 0.5);
        assert_eq!(step.delta, Vec2::new(-0.5, 0.0));
        assert_eq!(step.facing, Some(Facing::Left));

        let step = Step::towards(Vec2::new(0.0, 0.0), Vec2::new(0.1, 0.0), 0.5);
        assert_eq!(step.delta, Vec2::new(0.1, 0.0));
        assert_eq!(step.facing, Some(Facing::Right));

        let step = Step::towards(Vec2::ZERO, Vec2::new(0.0, 3.0), 1.0);
        assert_eq!(step.facing, None);
    }

    #[test]
    fn deactivate_exhausts_but_keeps_path() {
        let grid = open_grid();
        let planner = CountingPlanner::new();
        let mut follower = PathFollower::new(FollowerConfig::default());
        let start = Vec2::new(0.5, 0.5);
        let _ = follower.update(INTERVAL, &planner, &grid, start, Vec2::new(5.5, 0.5));

        follower.deactivate();

        assert_eq!(follower.mode(), FollowMode::Idle);
        assert_eq!(follower.path().len(), 6);
        assert!(follower.is_exhausted());
        assert!(!follower.update(INTERVAL, &planner, &grid, start, Vec2::new(8.5, 0.5)));
        assert!(follower
            .fixed_update(Duration::from_millis(20), start, &grid)
            .is_none());
    }

    #[test]
    fn activate_replans_only_when_destination_node_changed() {
        let grid = open_grid();
        let planner = CountingPlanner::new();
        let mut follower = PathFollower::new(FollowerConfig::default());
        let start = Vec2::new(0.5, 0.5);
        let _ = follower.update(INTERVAL, &planner, &grid, start, Vec2::new(5.5, 0.5));

        follower.deactivate();
        assert!(follower.activate(&planner, &grid, start, Vec2::new(7.5, 0.5)));
        assert_eq!(planner.calls.get(), 2);
        assert_eq!(follower.cursor(), 0);

        follower.deactivate();
        assert!(!follower.activate(&planner, &grid, start, Vec2::new(7.4, 0.6)));
        assert_eq!(planner.calls.get(), 2);

        assert!(follower.update(INTERVAL, &planner, &grid, start, Vec2::new(7.4, 0.6)));
        assert_eq!(planner.calls.get(), 3);
    }
}
