use std::time::Duration;

use glam::Vec2;
use prophecy_core::Command;
use prophecy_system_steering::{Config, Steering, SteeringMode};
use prophecy_world::{self as world, query, NodeKind, WalkabilityGrid, World};

const FRAME: Duration = Duration::from_millis(20);

fn arena() -> World {
    let grid = WalkabilityGrid::from_fn(12, 12, 1.0, Vec2::ZERO, |_| NodeKind::OPEN)
        .expect("valid grid");
    World::builder()
        .grid(grid)
        .player_spawn(Vec2::new(6.0, 6.0))
        .build()
        .expect("world builds")
}

fn drive(world: &mut World, steering: &mut Steering, input: Vec2, frames: usize) {
    for _ in 0..frames {
        let mut commands = Vec::new();
        steering.fixed_update(FRAME, input, &query::player(world), &mut commands);
        commands.push(Command::Tick { dt: FRAME });
        let mut events = Vec::new();
        for command in commands {
            world::apply(world, command, &mut events);
        }
    }
}

#[test]
fn keyboard_thrust_moves_player_along_initial_heading() {
    let mut world = arena();
    let mut steering = Steering::new(SteeringMode::Keyboard, Config::default());

    drive(&mut world, &mut steering, Vec2::Y, 50);

    let player = query::player(&world);
    assert!(player.position.y > 6.5);
    assert!((player.position.x - 6.0).abs() < 1e-3);
}

#[test]
fn player_stays_inside_arena() {
    let mut world = arena();
    let mut steering = Steering::new(SteeringMode::Mouse, Config::default());

    drive(&mut world, &mut steering, Vec2::Y, 200);

    let player = query::player(&world);
    assert!(query::grid(&world).contains(player.position));
}

#[test]
fn each_mode_is_selected_once() {
    for mode in [
        SteeringMode::Keyboard,
        SteeringMode::Mouse,
        SteeringMode::Gamepad,
    ] {
        let steering = Steering::new(mode, Config::default());
        assert_eq!(steering.mode(), mode);
    }
}
