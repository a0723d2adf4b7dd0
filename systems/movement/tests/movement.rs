use std::time::Duration;

use glam::Vec2;
use prophecy_core::{AgentId, AgentKind, Command, NodeCoord};
use prophecy_system_movement::{AvoidanceConfig, Config, Movement};
use prophecy_world::{self as world, query, NodeKind, WalkabilityGrid, World};

const FRAME: Duration = Duration::from_millis(20);

fn build_world(grid: WalkabilityGrid, player: Vec2) -> World {
    World::builder()
        .grid(grid)
        .player_spawn(player)
        .build()
        .expect("world builds")
}

fn open_grid() -> WalkabilityGrid {
    WalkabilityGrid::from_fn(20, 20, 1.0, Vec2::ZERO, |_| NodeKind::OPEN).expect("valid grid")
}

fn spawn(world: &mut World, position: Vec2) {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::SpawnAgent {
            position,
            kind: AgentKind::Melee,
        },
        &mut events,
    );
}

fn run_frames(world: &mut World, movement: &mut Movement, frames: usize) {
    for _ in 0..frames {
        let mut commands = Vec::new();
        {
            let agents = query::agent_view(world);
            let arena = query::arena(world);
            movement.update(FRAME, &agents, &arena, &mut commands);
            movement.fixed_update(FRAME, &agents, &arena, &mut commands);
        }
        let mut events = Vec::new();
        for command in commands {
            world::apply(world, command, &mut events);
        }
    }
}

#[test]
fn agent_in_range_chases_primary_anchor() {
    let mut world = build_world(open_grid(), Vec2::new(10.5, 10.5));
    spawn(&mut world, Vec2::new(4.5, 10.5));
    let mut movement = Movement::new(Config::default()).expect("valid config");

    run_frames(&mut world, &mut movement, 200);

    let agent = query::agent_view(&world)
        .get(AgentId::new(0))
        .copied()
        .expect("agent alive");
    assert!(movement.is_chasing(AgentId::new(0)));
    let anchor = query::arena(&world).primary_anchor;
    assert!(
        agent.position.distance(anchor) < 1.0,
        "agent stopped at {:?}",
        agent.position
    );
}

#[test]
fn agent_out_of_range_wanders_near_spawn() {
    let mut world = build_world(open_grid(), Vec2::new(1.5, 1.5));
    let spawn_point = Vec2::new(16.5, 16.5);
    spawn(&mut world, spawn_point);
    let mut movement = Movement::new(Config::default()).expect("valid config");

    for _ in 0..20 {
        run_frames(&mut world, &mut movement, 25);
        let agent = query::agent_view(&world)
            .get(AgentId::new(0))
            .copied()
            .expect("agent alive");
        assert!(!movement.is_chasing(AgentId::new(0)));
        assert!((agent.position - spawn_point).abs().max_element() <= 3.0 + 1e-4);
    }
}

#[test]
fn invisible_player_is_not_chased() {
    let mut world = build_world(open_grid(), Vec2::new(10.5, 10.5));
    spawn(&mut world, Vec2::new(8.5, 10.5));
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SetPlayerInvisible { invisible: true },
        &mut events,
    );
    let mut movement = Movement::new(Config::default()).expect("valid config");

    run_frames(&mut world, &mut movement, 10);

    assert!(!movement.is_chasing(AgentId::new(0)));
    let follower = movement.follower(AgentId::new(0)).expect("controller");
    assert!(follower.path().is_empty());
}

#[test]
fn blocked_primary_anchor_routes_to_fallback() {
    let player = Vec2::new(10.5, 10.5);
    let grid = WalkabilityGrid::from_fn(20, 20, 1.0, Vec2::ZERO, |coord| {
        if coord == NodeCoord::new(9, 10) {
            NodeKind::Blocked
        } else {
            NodeKind::OPEN
        }
    })
    .expect("valid grid");
    let config = world::WorldConfig {
        anchor_offset: 1.0,
        ..world::WorldConfig::default()
    };
    let mut world = World::builder()
        .grid(grid)
        .player_spawn(player)
        .config(config)
        .build()
        .expect("world builds");
    spawn(&mut world, Vec2::new(4.5, 10.5));
    let mut movement = Movement::new(Config::default()).expect("valid config");

    run_frames(&mut world, &mut movement, 1);

    let follower = movement.follower(AgentId::new(0)).expect("controller");
    assert_eq!(follower.destination_node(), Some(NodeCoord::new(11, 10)));
    assert!(!follower.path().nodes().contains(&NodeCoord::new(9, 10)));
}

#[test]
fn controllers_follow_agent_lifecycle() {
    let mut world = build_world(open_grid(), Vec2::new(10.5, 10.5));
    spawn(&mut world, Vec2::new(4.5, 10.5));
    let mut movement = Movement::new(Config::default()).expect("valid config");
    run_frames(&mut world, &mut movement, 1);
    assert!(movement.follower(AgentId::new(0)).is_some());

    let mut fresh = build_world(open_grid(), Vec2::new(10.5, 10.5));
    run_frames(&mut fresh, &mut movement, 1);
    assert!(movement.follower(AgentId::new(0)).is_none());
}

#[test]
fn separation_only_pushes_chasing_agents() {
    let mut world = build_world(open_grid(), Vec2::new(10.5, 10.5));
    for position in [
        Vec2::new(8.5, 10.5),
        Vec2::new(8.7, 10.5),
        Vec2::new(0.5, 0.5),
        Vec2::new(0.7, 0.5),
    ] {
        spawn(&mut world, position);
    }
    let config = Config {
        avoidance: Some(AvoidanceConfig { min_distance: 1.0 }),
        ..Config::default()
    };
    let mut movement = Movement::new(config).expect("valid config");

    for _ in 0..3 {
        let agents = query::agent_view(&world);
        let arena = query::arena(&world);
        let mut commands = Vec::new();
        movement.update(FRAME, &agents, &arena, &mut commands);

        let pushed: Vec<AgentId> = commands
            .iter()
            .filter_map(|command| match command {
                Command::MoveAgent {
                    agent,
                    facing: None,
                    ..
                } => Some(*agent),
                _ => None,
            })
            .collect();
        assert_eq!(pushed, vec![AgentId::new(0), AgentId::new(1)]);
    }
}

#[test]
fn player_against_a_wall_is_still_reachable() {
    let grid = WalkabilityGrid::from_rows(&["####.........."], 1.0, Vec2::ZERO).expect("layout");
    let mut world = build_world(grid, Vec2::new(6.5, 0.5));
    spawn(&mut world, Vec2::new(9.5, 0.5));
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SteerPlayer {
            velocity: Vec2::new(-5.0, 0.0),
            heading: std::f32::consts::PI,
        },
        &mut events,
    );
    for _ in 0..50 {
        world::apply(&mut world, Command::Tick { dt: FRAME }, &mut events);
    }
    let mut movement = Movement::new(Config::default()).expect("valid config");

    run_frames(&mut world, &mut movement, 1);

    assert!(movement.is_chasing(AgentId::new(0)));
    let follower = movement.follower(AgentId::new(0)).expect("controller");
    assert_eq!(follower.destination_node(), Some(NodeCoord::new(4, 0)));
    assert!(!follower.path().is_empty());
}
