#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Player steering driven by a two-axis input stick.
//!
//! The strategy is chosen once through [`SteeringMode`]. Headings are radians
//! measured counter-clockwise from the positive x axis; turn rates are degrees
//! per second.

use std::time::Duration;

use glam::Vec2;
use prophecy_core::{Command, PlayerSnapshot};
use serde::{Deserialize, Serialize};

/// Input magnitude below which the gamepad stick counts as released.
const GAMEPAD_DEAD_ZONE: f32 = 0.1;

/// Speed below which braking snaps the keyboard ship to a halt.
const KEYBOARD_STOP_SPEED: f32 = 0.1;

/// Input device the steering strategy is tuned for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteeringMode {
    /// Thrust and brake on the vertical axis, turn on the horizontal axis.
    #[default]
    Keyboard,
    /// Full speed while pushing forward; rotate toward the stick angle.
    Mouse,
    /// Turn toward the stick angle and accelerate while it is deflected.
    Gamepad,
}

/// Acceleration and speed limits for the player ship.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// Maximum forward speed in world units per second.
    pub max_forward_speed: f32,
    /// Maximum turn rate in degrees per second.
    pub max_turn_speed: f32,
    /// Rate at which the turn speed builds up.
    pub turn_acceleration: f32,
    /// Rate at which forward speed builds up.
    pub forward_acceleration: f32,
    /// Rate at which the turn speed decays without input.
    pub rotation_deceleration: f32,
    /// Rate at which forward speed decays without input.
    pub forward_deceleration: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_forward_speed: 10.0,
            max_turn_speed: 100.0,
            turn_acceleration: 50.0,
            forward_acceleration: 5.0,
            rotation_deceleration: 500.0,
            forward_deceleration: 20.0,
        }
    }
}

/// Steering system that owns the ship's velocity and turn speed.
#[derive(Clone, Debug)]
pub struct Steering {
    mode: SteeringMode,
    config: Config,
    velocity: Vec2,
    turn_speed: f32,
}

impl Steering {
    /// Creates a steering system for the chosen input device.
    #[must_use]
    pub fn new(mode: SteeringMode, config: Config) -> Self {
        Self {
            mode,
            config,
            velocity: Vec2::ZERO,
            turn_speed: 0.0,
        }
    }

    /// Input device this system was built for.
    #[must_use]
    pub fn mode(&self) -> SteeringMode {
        self.mode
    }

    /// Velocity requested on the last step.
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Fixed-rate phase: turns stick input into a steering command.
    ///
    /// `input` is clamped to unit length. A dead player emits nothing.
    pub fn fixed_update(
        &mut self,
        dt: Duration,
        input: Vec2,
        player: &PlayerSnapshot,
        out: &mut Vec<Command>,
    ) {
        if !player.is_alive() {
            self.velocity = Vec2::ZERO;
            self.turn_speed = 0.0;
            return;
        }

        let input = if input.is_finite() {
            input.clamp_length_max(1.0)
        } else {
            Vec2::ZERO
        };
        let seconds = dt.as_secs_f32();
        let heading = match self.mode {
            SteeringMode::Keyboard => self.keyboard(seconds, input, player.heading),
            SteeringMode::Mouse => self.mouse(seconds, input, player.heading),
            SteeringMode::Gamepad => self.gamepad(seconds, input, player.heading),
        };

        out.push(Command::SteerPlayer {
            velocity: self.velocity,
            heading: wrap_radians(heading),
        });
    }

    fn keyboard(&mut self, dt: f32, input: Vec2, heading: f32) -> f32 {
        let config = self.config;
        if input.y > 0.0 {
            let target = Vec2::from_angle(heading) * config.max_forward_speed;
            self.velocity = move_towards(self.velocity, target, config.forward_acceleration * dt);
        } else if input.y < 0.0 {
            self.velocity =
                move_towards(self.velocity, Vec2::ZERO, config.forward_acceleration * dt);
            if self.velocity.length() < KEYBOARD_STOP_SPEED {
                self.velocity = Vec2::ZERO;
            }
        }

        if input.x != 0.0 {
            // Pushing right turns clockwise.
            let target = -config.max_turn_speed.copysign(input.x);
            self.turn_speed = approach(self.turn_speed, target, config.turn_acceleration * dt);
        } else {
            self.turn_speed = approach(self.turn_speed, 0.0, config.rotation_deceleration * dt);
        }
        self.turn_speed = self
            .turn_speed
            .clamp(-config.max_turn_speed, config.max_turn_speed);
        let heading = heading + (self.turn_speed * dt).to_radians();

        if input.y == 0.0 {
            self.velocity =
                move_towards(self.velocity, Vec2::ZERO, config.forward_deceleration * dt);
        }
        heading
    }

    fn mouse(&mut self, dt: f32, input: Vec2, heading: f32) -> f32 {
        let config = self.config;
        if input.y > 0.0 {
            self.velocity = Vec2::from_angle(heading) * config.max_forward_speed;
        } else if input.y < 0.0 {
            self.velocity = Vec2::ZERO;
        }

        if input.x != 0.0 && dt > 0.0 {
            let stick = input.y.atan2(input.x).to_degrees();
            let difference = delta_angle_degrees(heading.to_degrees(), stick);
            let target = (difference / dt).clamp(-config.max_turn_speed, config.max_turn_speed);
            self.turn_speed = approach(self.turn_speed, target, config.turn_acceleration * dt);
        } else {
            self.turn_speed = approach(self.turn_speed, 0.0, config.rotation_deceleration * dt);
        }
        self.turn_speed = self
            .turn_speed
            .clamp(-config.max_turn_speed, config.max_turn_speed);
        let heading = heading + (self.turn_speed * dt).to_radians();

        if input.y == 0.0 {
            self.velocity =
                move_towards(self.velocity, Vec2::ZERO, config.forward_deceleration * dt);
        }
        self.velocity = self.velocity.clamp_length_max(config.max_forward_speed);
        heading
    }

    fn gamepad(&mut self, dt: f32, input: Vec2, heading: f32) -> f32 {
        let config = self.config;
        let mut heading = heading;

        if input.length() > GAMEPAD_DEAD_ZONE {
            let target = input.y.atan2(input.x);
            let t = (config.turn_acceleration * dt).clamp(0.0, 1.0);
            heading = lerp_angle(heading, target, t);
            let target_velocity = Vec2::from_angle(heading) * config.max_forward_speed;
            self.velocity = move_towards(
                self.velocity,
                target_velocity,
                config.forward_acceleration * dt,
            );
        } else {
            self.velocity =
                move_towards(self.velocity, Vec2::ZERO, config.forward_deceleration * dt);
        }

        self.velocity = self.velocity.clamp_length_max(config.max_forward_speed);
        heading
    }
}

/// Moves `current` toward `target` by at most `max_delta`.
#[must_use]
pub fn move_towards(current: Vec2, target: Vec2, max_delta: f32) -> Vec2 {
    let offset = target - current;
    let distance = offset.length();
    if distance <= max_delta || distance <= f32::EPSILON {
        target
    } else {
        current + offset / distance * max_delta
    }
}

fn approach(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + max_delta.copysign(target - current)
    }
}

/// Shortest signed difference from `from` to `to`, in degrees within [-180, 180).
#[must_use]
pub fn delta_angle_degrees(from: f32, to: f32) -> f32 {
    (to - from + 180.0).rem_euclid(360.0) - 180.0
}

fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    let difference = delta_angle_degrees(from.to_degrees(), to.to_degrees()).to_radians();
    from + difference * t
}

fn wrap_radians(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    (angle + PI).rem_euclid(TAU) - PI
}
