//! Wandering tornadoes: a small pool of moving zones that pull bodies in and
//! hurt anything caught near the core.

use crate::game::{GameState, Hazard};
use crate::spatial::resolve_collision;
use log::{debug, info};
use rand::Rng;
use shared::{Vec3, PLAYER_HEIGHT, PLAYER_RADIUS, WORLD_BOUND};
use std::f32::consts::TAU;

pub const OUTER_RADIUS: f32 = 15.0;
pub const INNER_RADIUS: f32 = 4.0;
/// Pull speed at the centre, in m/s.
pub const PULL_STRENGTH: f32 = 6.0;
/// Damage per second inside the inner radius.
pub const DAMAGE_RATE: f32 = 15.0;
/// Damage is dealt in discrete pulses this far apart.
pub const DAMAGE_PULSE: f32 = 0.2;
pub const MAX_SPEED: f32 = 4.0;
const WANDER_ACCEL: f32 = 3.0;
const SPIN_RATE: f32 = 3.0;

const SPAWN_INTERVAL_MIN: f32 = 20.0;
const SPAWN_INTERVAL_MAX: f32 = 45.0;
const LIFETIME_MIN: f32 = 20.0;
const LIFETIME_MAX: f32 = 40.0;
/// Spawns land inside this half extent so they start clear of the edges.
const SPAWN_EXTENT: f32 = 40.0;

impl Hazard {
    /// Pull speed at `distance` from the centre, falling linearly to zero at
    /// the outer radius.
    pub fn pull_at(&self, distance: f32) -> f32 {
        (self.pull_strength * (1.0 - distance / self.outer_radius)).max(0.0)
    }

    fn pulse_damage(&self) -> i32 {
        (self.damage_rate * DAMAGE_PULSE).round() as i32
    }
}

impl GameState {
    /// Claims a free hazard slot at `position`. `None` when the pool is full.
    pub fn spawn_hazard(&mut self, position: Vec3) -> Option<usize> {
        let slot = self.hazards.iter().position(Option::is_none)?;
        let lifetime = self.rng.gen_range(LIFETIME_MIN..LIFETIME_MAX);
        self.hazards[slot] = Some(Hazard {
            position,
            velocity: Vec3::ZERO,
            outer_radius: OUTER_RADIUS,
            inner_radius: INNER_RADIUS,
            pull_strength: PULL_STRENGTH,
            damage_rate: DAMAGE_RATE,
            age: 0.0,
            lifetime,
            rotation: 0.0,
            pulse_timer: 0.0,
        });
        info!(
            "Tornado {} touched down at ({:.1}, {:.1}) for {:.0}s",
            slot, position.x, position.z, lifetime
        );
        Some(slot)
    }

    pub fn update_hazards(&mut self, dt: f32) {
        self.hazard_timer -= dt;
        if self.hazard_timer <= 0.0 {
            self.hazard_timer = self.rng.gen_range(SPAWN_INTERVAL_MIN..SPAWN_INTERVAL_MAX);
            let position = Vec3::new(
                self.rng.gen_range(-SPAWN_EXTENT..SPAWN_EXTENT),
                0.0,
                self.rng.gen_range(-SPAWN_EXTENT..SPAWN_EXTENT),
            );
            if self.spawn_hazard(position).is_none() {
                debug!("Hazard pool full, skipping spawn");
            }
        }

        for slot in 0..self.hazards.len() {
            let Some(hazard) = self.hazards[slot].as_mut() else {
                continue;
            };

            hazard.age += dt;
            if hazard.age >= hazard.lifetime {
                self.hazards[slot] = None;
                debug!("Tornado {} dissipated", slot);
                continue;
            }

            hazard.rotation = (hazard.rotation + SPIN_RATE * dt) % TAU;
            hazard.velocity.x += self.rng.gen_range(-1.0..1.0) * WANDER_ACCEL * dt;
            hazard.velocity.z += self.rng.gen_range(-1.0..1.0) * WANDER_ACCEL * dt;
            let speed = hazard.velocity.length();
            if speed > MAX_SPEED {
                hazard.velocity *= MAX_SPEED / speed;
            }
            hazard.position += hazard.velocity * dt;
            if hazard.position.x.abs() > WORLD_BOUND {
                hazard.position.x = hazard.position.x.clamp(-WORLD_BOUND, WORLD_BOUND);
                hazard.velocity.x = -hazard.velocity.x;
            }
            if hazard.position.z.abs() > WORLD_BOUND {
                hazard.position.z = hazard.position.z.clamp(-WORLD_BOUND, WORLD_BOUND);
                hazard.velocity.z = -hazard.velocity.z;
            }

            hazard.pulse_timer -= dt;
            let pulse = hazard.pulse_timer <= 0.0;
            if pulse {
                hazard.pulse_timer += DAMAGE_PULSE;
            }

            let hazard = hazard.clone();
            self.apply_hazard(&hazard, dt, pulse);
        }
    }

    fn apply_hazard(&mut self, hazard: &Hazard, dt: f32, pulse: bool) {
        let center = hazard.position;
        let blocks = self.map.blocks();
        let mut burned = Vec::new();

        for (id, player) in self.players.iter_mut().enumerate() {
            if !player.is_alive() || player.vehicle.is_some() {
                continue;
            }
            let offset = (center - player.position).flat();
            let dist = offset.length();
            if dist >= hazard.outer_radius {
                continue;
            }
            if dist > 0.01 {
                let target = player.position + offset.normalize() * (hazard.pull_at(dist) * dt);
                player.position = resolve_collision(blocks, target, PLAYER_RADIUS, PLAYER_HEIGHT);
            }
            if pulse && dist < hazard.inner_radius {
                burned.push(id);
            }
        }

        let mut wrecked = Vec::new();
        for (vid, vehicle) in self.vehicles.iter_mut().enumerate() {
            if !vehicle.active {
                continue;
            }
            let offset = (center - vehicle.position).flat();
            let dist = offset.length();
            if dist >= hazard.outer_radius {
                continue;
            }
            if dist > 0.01 {
                vehicle.position += offset.normalize() * (hazard.pull_at(dist) * dt);
            }
            if pulse && dist < hazard.inner_radius {
                wrecked.push(vid);
            }
        }

        let damage = hazard.pulse_damage();
        for id in burned {
            self.damage_player(id, id, damage);
        }
        for vid in wrecked {
            self.damage_vehicle(vid, None, damage);
        }
    }
}
