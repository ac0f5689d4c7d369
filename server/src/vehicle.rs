//! Vehicle seating, per-kind controls, cannons and run-over damage.

use crate::combat::Impact;
use crate::game::{GameState, Vehicle};
use crate::spatial::resolve_collision;
use log::debug;
use shared::{
    InputState, Vec3, VehicleKind, AIR_BOUND, GRAVITY, KEY_A, KEY_D, KEY_DOWN, KEY_S, KEY_SHOOT,
    KEY_UP, KEY_W, MAX_ALTITUDE, PLAYER_HEIGHT, PLAYER_RADIUS, VEHICLE_ENTER_RANGE, WORLD_BOUND,
};
use std::f32::consts::{FRAC_PI_2, PI, TAU};

pub const GROUND_CLEARANCE: f32 = 0.1;
/// Player offset above the hull while seated.
const SEAT_HEIGHT: f32 = 1.0;
const EXIT_DISTANCE: f32 = 3.0;
const COAST_DECAY: f32 = 0.95;

const RUN_OVER_MIN_SPEED: f32 = 5.0;
const RUN_OVER_RADIUS: f32 = 2.5;
const RUN_OVER_DAMAGE_PER_SPEED: f32 = 3.0;

const CLIMB_RATE: f32 = 8.0;
const ROTOR_SPEED: f32 = 20.0;

/// Below this airspeed a fixed-wing aircraft sinks.
pub const STALL_SPEED: f32 = 12.0;
const THROTTLE_RATE: f32 = 10.0;
const MAX_BANK_PITCH: f32 = 0.6;
/// Distance inside `AIR_BOUND` where aircraft are turned back toward the centre.
const BOUNDARY_MARGIN: f32 = 10.0;

/// Signed shortest angle from `from` to `to`.
fn angle_delta(from: f32, to: f32) -> f32 {
    (to - from + PI).rem_euclid(TAU) - PI
}

fn turn_input(input: &InputState) -> f32 {
    let mut turn = 0.0;
    if input.pressed(KEY_A) {
        turn += 1.0;
    }
    if input.pressed(KEY_D) {
        turn -= 1.0;
    }
    turn
}

fn drive_ground(vehicle: &mut Vehicle, input: &InputState, dt: f32) {
    let def = vehicle.def();
    vehicle.yaw += turn_input(input) * def.turn_rate * dt;

    let mut accel = 0.0;
    if input.pressed(KEY_W) {
        accel = def.speed;
    }
    if input.pressed(KEY_S) {
        accel = -def.speed * 0.5;
    }
    vehicle.velocity = Vec3::forward(vehicle.yaw) * accel;

    if def.cannon_damage > 0 {
        vehicle.turret_yaw = input.yaw - vehicle.yaw;
    }

    let mut next = vehicle.position + vehicle.velocity * dt;
    next.y = GROUND_CLEARANCE;
    next.x = next.x.clamp(-WORLD_BOUND, WORLD_BOUND);
    next.z = next.z.clamp(-WORLD_BOUND, WORLD_BOUND);
    vehicle.position = next;
}

fn fly_rotary(vehicle: &mut Vehicle, input: &InputState, dt: f32) {
    let def = vehicle.def();
    vehicle.yaw += turn_input(input) * def.turn_rate * dt;
    vehicle.pitch = input.pitch;

    let mut accel = 0.0;
    if input.pressed(KEY_W) {
        accel = def.speed;
    }
    if input.pressed(KEY_S) {
        accel = -def.speed * 0.5;
    }
    let mut velocity = Vec3::forward(vehicle.yaw) * accel;
    if input.pressed(KEY_UP) {
        velocity.y += CLIMB_RATE;
    }
    if input.pressed(KEY_DOWN) {
        velocity.y -= CLIMB_RATE;
    }
    vehicle.velocity = velocity;
    vehicle.rotor_angle = (vehicle.rotor_angle + ROTOR_SPEED * dt) % TAU;

    integrate_aircraft(vehicle, dt);
}

fn fly_fixed_wing(vehicle: &mut Vehicle, input: &InputState, dt: f32) {
    let def = vehicle.def();

    let target = if input.pressed(KEY_W) {
        def.speed
    } else if input.pressed(KEY_S) {
        def.speed * 0.4
    } else {
        def.speed * 0.7
    };
    let step = THROTTLE_RATE * dt;
    vehicle.airspeed += (target - vehicle.airspeed).clamp(-step, step);

    let near_edge = vehicle.position.x.abs() > AIR_BOUND - BOUNDARY_MARGIN
        || vehicle.position.z.abs() > AIR_BOUND - BOUNDARY_MARGIN;
    if near_edge {
        let home = (-vehicle.position).yaw();
        let max_turn = def.turn_rate * dt;
        vehicle.yaw += angle_delta(vehicle.yaw, home).clamp(-max_turn, max_turn);
    } else {
        vehicle.yaw += turn_input(input) * def.turn_rate * dt;
    }

    if input.pressed(KEY_UP) {
        vehicle.pitch += def.turn_rate * dt;
    }
    if input.pressed(KEY_DOWN) {
        vehicle.pitch -= def.turn_rate * dt;
    }
    vehicle.pitch = vehicle.pitch.clamp(-MAX_BANK_PITCH, MAX_BANK_PITCH);

    let mut velocity = Vec3::from_yaw_pitch(vehicle.yaw, vehicle.pitch) * vehicle.airspeed;
    if vehicle.airspeed < STALL_SPEED {
        velocity.y -= STALL_SPEED - vehicle.airspeed;
    }
    vehicle.velocity = velocity;
    vehicle.rotor_angle = (vehicle.rotor_angle + ROTOR_SPEED * dt) % TAU;

    integrate_aircraft(vehicle, dt);
    if vehicle.position.y <= GROUND_CLEARANCE && vehicle.pitch < 0.0 {
        vehicle.pitch = 0.0;
    }
}

fn integrate_aircraft(vehicle: &mut Vehicle, dt: f32) {
    let mut next = vehicle.position + vehicle.velocity * dt;
    next.x = next.x.clamp(-AIR_BOUND, AIR_BOUND);
    next.z = next.z.clamp(-AIR_BOUND, AIR_BOUND);
    next.y = next.y.clamp(GROUND_CLEARANCE, MAX_ALTITUDE);
    vehicle.position = next;
}

/// Empty vehicles: ground vehicles roll to a stop, aircraft drop.
fn coast(vehicle: &mut Vehicle, dt: f32) {
    if vehicle.kind.is_aircraft() {
        vehicle.velocity.x *= COAST_DECAY;
        vehicle.velocity.z *= COAST_DECAY;
        vehicle.velocity.y -= GRAVITY * dt;
        vehicle.airspeed = 0.0;
        integrate_aircraft(vehicle, dt);
        if vehicle.position.y <= GROUND_CLEARANCE {
            vehicle.velocity = Vec3::ZERO;
            vehicle.pitch = 0.0;
        }
        return;
    }

    vehicle.velocity *= COAST_DECAY;
    if vehicle.velocity.length_sq() < 0.01 {
        vehicle.velocity = Vec3::ZERO;
    }
    let mut next = vehicle.position + vehicle.velocity * dt;
    next.x = next.x.clamp(-WORLD_BOUND, WORLD_BOUND);
    next.z = next.z.clamp(-WORLD_BOUND, WORLD_BOUND);
    vehicle.position = next;
}

impl GameState {
    /// USE: leave the current vehicle, or take the nearest free one in range.
    pub fn toggle_vehicle(&mut self, id: usize) {
        if !self.players[id].is_alive() {
            return;
        }
        if self.players[id].vehicle.is_some() {
            self.exit_vehicle(id);
        } else {
            self.enter_vehicle(id);
        }
    }

    pub fn enter_vehicle(&mut self, id: usize) -> bool {
        let player = &self.players[id];
        if player.vehicle.is_some() {
            return false;
        }

        let mut best_dist = VEHICLE_ENTER_RANGE;
        let mut best = None;
        for (vid, vehicle) in self.vehicles.iter().enumerate() {
            if !vehicle.active || vehicle.driver.is_some() {
                continue;
            }
            let d = player.position.distance(vehicle.position);
            if d < best_dist {
                best_dist = d;
                best = Some(vid);
            }
        }

        match best {
            Some(vid) => {
                self.vehicles[vid].driver = Some(id);
                self.players[id].vehicle = Some(vid);
                self.players[id].velocity = Vec3::ZERO;
                debug!("Player {} entered vehicle {}", id, vid);
                true
            }
            None => false,
        }
    }

    /// Steps out beside the hull. No-op for players on foot.
    pub fn exit_vehicle(&mut self, id: usize) {
        let Some(vid) = self.players[id].vehicle.take() else {
            return;
        };
        let vehicle = &mut self.vehicles[vid];
        vehicle.driver = None;

        let side = vehicle.yaw + FRAC_PI_2;
        let mut spot = vehicle.position
            + Vec3::new(side.sin() * EXIT_DISTANCE, 0.0, side.cos() * EXIT_DISTANCE);
        spot.y = if vehicle.kind.is_aircraft() {
            vehicle.position.y.max(GROUND_CLEARANCE)
        } else {
            GROUND_CLEARANCE
        };

        let player = &mut self.players[id];
        player.position = resolve_collision(self.map.blocks(), spot, PLAYER_RADIUS, PLAYER_HEIGHT);
        player.velocity = Vec3::ZERO;
        debug!("Player {} left vehicle {}", id, vid);
    }

    /// Advances every vehicle. `inputs` is indexed by player id and holds the
    /// control state for this tick.
    pub fn tick_vehicles(&mut self, inputs: &[Option<InputState>], dt: f32) {
        for vid in 0..self.vehicles.len() {
            let vehicle = &mut self.vehicles[vid];
            if !vehicle.active {
                vehicle.respawn_timer -= dt;
                if vehicle.respawn_timer <= 0.0 {
                    vehicle.reset();
                    debug!("{} {} respawned", vehicle.def().name, vid);
                }
                continue;
            }

            if vehicle.fire_cooldown > 0.0 {
                vehicle.fire_cooldown -= dt;
            }

            let Some(driver) = vehicle.driver else {
                coast(vehicle, dt);
                continue;
            };
            let input = inputs.get(driver).copied().flatten().unwrap_or_default();

            match vehicle.kind.def().kind {
                VehicleKind::Ground => drive_ground(vehicle, &input, dt),
                VehicleKind::Rotary => fly_rotary(vehicle, &input, dt),
                VehicleKind::FixedWing => fly_fixed_wing(vehicle, &input, dt),
            }

            let seat = vehicle.position + Vec3::new(0.0, SEAT_HEIGHT, 0.0);
            let driver_player = &mut self.players[driver];
            driver_player.position = seat;
            driver_player.yaw = input.yaw;
            driver_player.pitch = input.pitch;

            if input.pressed(KEY_SHOOT) {
                self.fire_cannon(vid, &input);
            }
            self.run_over(vid);
        }
    }

    fn fire_cannon(&mut self, vid: usize, input: &InputState) {
        let vehicle = &mut self.vehicles[vid];
        let def = vehicle.def();
        let Some(driver) = vehicle.driver else {
            return;
        };
        if def.cannon_damage <= 0 || vehicle.fire_cooldown > 0.0 {
            return;
        }
        vehicle.fire_cooldown = def.cannon_rate;

        let (aim_yaw, aim_pitch) = match def.kind {
            VehicleKind::Ground => (vehicle.yaw + vehicle.turret_yaw, input.pitch),
            VehicleKind::Rotary => (vehicle.yaw, input.pitch),
            VehicleKind::FixedWing => (vehicle.yaw, vehicle.pitch),
        };
        let dir = Vec3::from_yaw_pitch(aim_yaw, aim_pitch);
        let origin = vehicle.position + Vec3::new(0.0, def.height, 0.0) + dir * (def.length * 0.6);

        match self.trace_ray(driver, origin, dir, def.cannon_range, true) {
            Some(Impact::Player { id, .. }) => {
                self.hit_player(id, driver, def.cannon_damage);
            }
            Some(Impact::Vehicle { id, .. }) => {
                self.damage_vehicle(id, Some(driver), def.cannon_damage);
            }
            _ => {}
        }
    }

    /// Fast ground vehicles hurt enemies on foot they drive through.
    fn run_over(&mut self, vid: usize) {
        let vehicle = &self.vehicles[vid];
        if !vehicle.active || vehicle.kind.is_aircraft() {
            return;
        }
        let Some(driver) = vehicle.driver else {
            return;
        };
        let speed = vehicle.velocity.length();
        if speed <= RUN_OVER_MIN_SPEED {
            return;
        }
        let position = vehicle.position;
        let knockback = vehicle.velocity * 0.5 + Vec3::new(0.0, 5.0, 0.0);
        let damage = (speed * RUN_OVER_DAMAGE_PER_SPEED) as i32;

        let victims: Vec<usize> = self
            .players
            .iter()
            .enumerate()
            .filter(|(id, p)| {
                p.is_alive()
                    && p.vehicle.is_none()
                    && self.are_enemies(driver, *id)
                    && p.position.distance(position) < RUN_OVER_RADIUS
            })
            .map(|(id, _)| id)
            .collect();

        for victim in victims {
            self.players[victim].velocity = knockback;
            self.damage_player(victim, driver, damage);
        }
    }
}
