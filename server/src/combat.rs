//! Weapon discharge, reloads, class abilities and weapon pickups.
//!
//! Every ray resolved here goes through [`GameState::trace_ray`], which also
//! serves vehicle cannons: the nearest of an enemy player box, an optional
//! vehicle box and the static geometry wins, and bodies only count when they
//! are strictly closer than the wall behind them.

use crate::game::GameState;
use crate::spatial::{line_of_sight, raycast_blocks, raycast_boxes};
use log::debug;
use rand::Rng;
use shared::{Ability, Vec3, MAX_HEALTH, PICKUP_RADIUS, WEAPON_RESPAWN};

/// Cooldown multiplier applied when a magazine is refilled.
pub const RELOAD_PENALTY: f32 = 3.0;

pub const GRENADE_RANGE: f32 = 25.0;
pub const GRENADE_RADIUS: f32 = 6.0;
pub const GRENADE_DAMAGE: f32 = 100.0;
pub const REPAIR_RANGE: f32 = 5.0;
pub const REPAIR_AMOUNT: i32 = 150;
pub const RESUPPLY_RADIUS: f32 = 8.0;
pub const RESUPPLY_HEAL: i32 = 50;
pub const SPOT_RANGE: f32 = 80.0;
/// Cosine of the spot cone's half angle.
pub const SPOT_CONE: f32 = 0.9;
pub const SPOT_DURATION: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Impact {
    Player { id: usize, distance: f32 },
    Vehicle { id: usize, distance: f32 },
    Wall { distance: f32 },
}

impl Impact {
    pub fn distance(&self) -> f32 {
        match *self {
            Impact::Player { distance, .. }
            | Impact::Vehicle { distance, .. }
            | Impact::Wall { distance } => distance,
        }
    }
}

/// Uniform offset in `[-spread, spread]`.
pub fn jitter(rng: &mut impl Rng, spread: f32) -> f32 {
    if spread > 0.0 {
        rng.gen_range(-spread..=spread)
    } else {
        0.0
    }
}

/// Linear falloff: full damage at the centre, none at `radius`.
pub fn splash_damage(max_damage: f32, radius: f32, distance: f32) -> i32 {
    if distance >= radius {
        return 0;
    }
    (max_damage * (1.0 - distance / radius)) as i32
}

impl GameState {
    /// Nearest impact along `dir` within `range`.
    ///
    /// The shooter, their teammates and anyone not alive are transparent.
    /// Vehicles are tested only with `hit_vehicles`; the shooter's own vehicle
    /// and vehicles driven by teammates are skipped.
    pub fn trace_ray(
        &self,
        shooter: usize,
        origin: Vec3,
        dir: Vec3,
        range: f32,
        hit_vehicles: bool,
    ) -> Option<Impact> {
        let team = self.players[shooter].team;
        let own_vehicle = self.players[shooter].vehicle;

        let player_boxes = self
            .players
            .iter()
            .enumerate()
            .filter(|(id, p)| *id != shooter && p.is_alive() && p.team != team)
            .map(|(id, p)| (id, p.bounds()));
        let player_hit = raycast_boxes(player_boxes, origin, dir, range);

        let vehicle_hit = if hit_vehicles {
            let vehicle_boxes = self
                .vehicles
                .iter()
                .enumerate()
                .filter(|(id, v)| {
                    v.active
                        && Some(*id) != own_vehicle
                        && v.driver.map_or(true, |d| self.players[d].team != team)
                })
                .map(|(id, v)| (id, v.bounds()));
            raycast_boxes(vehicle_boxes, origin, dir, range)
        } else {
            None
        };

        let wall = raycast_blocks(self.map.blocks(), origin, dir, range);
        let wall_dist = wall.unwrap_or(f32::INFINITY);

        let mut best: Option<Impact> = wall.map(|distance| Impact::Wall { distance });
        if let Some((id, distance)) = vehicle_hit {
            if distance < wall_dist {
                best = Some(Impact::Vehicle { id, distance });
            }
        }
        if let Some((id, distance)) = player_hit {
            let closest = best.map_or(f32::INFINITY, |b| b.distance());
            if distance < wall_dist && distance <= closest {
                best = Some(Impact::Player { id, distance });
            }
        }
        best
    }

    /// Fires the held weapon if the cooldown has elapsed and a round is
    /// chambered. Returns whether a discharge happened.
    pub fn fire_weapon(&mut self, shooter: usize) -> bool {
        let player = &mut self.players[shooter];
        if !player.is_alive() || player.fire_cooldown > 0.0 || player.ammo <= 0 {
            return false;
        }

        let def = player.weapon.def();
        player.fire_cooldown = def.fire_rate;
        player.ammo -= 1;
        if player.ammo <= 0 {
            player.ammo = def.mag_size;
            player.fire_cooldown = def.fire_rate * RELOAD_PENALTY;
        }

        let origin = player.eye();
        let (yaw, pitch) = (player.yaw, player.pitch);

        for _ in 0..def.pellets {
            let dir = Vec3::from_yaw_pitch(
                yaw + jitter(&mut self.rng, def.spread),
                pitch + jitter(&mut self.rng, def.spread),
            );
            if let Some(Impact::Player { id, .. }) =
                self.trace_ray(shooter, origin, dir, def.range, false)
            {
                self.hit_player(id, shooter, def.damage);
            }
        }
        true
    }

    pub fn reload(&mut self, id: usize) {
        let player = &mut self.players[id];
        let def = player.weapon.def();
        if !player.is_alive() || player.ammo >= def.mag_size {
            return;
        }
        player.ammo = def.mag_size;
        player.fire_cooldown = def.fire_rate * RELOAD_PENALTY;
    }

    /// Triggers the class ability. The cooldown is spent even when the
    /// ability finds nothing to act on.
    pub fn use_ability(&mut self, id: usize) -> bool {
        let player = &mut self.players[id];
        if !player.is_alive() || player.ability_cooldown > 0.0 {
            return false;
        }
        let class = player.class.def();
        player.ability_cooldown = class.ability_cooldown;

        match class.ability {
            Ability::FragGrenade => self.throw_grenade(id),
            Ability::Repair => self.repair_nearby(id),
            Ability::Resupply => self.resupply(id),
            Ability::Spot => self.spot_enemies(id),
        }
        true
    }

    fn throw_grenade(&mut self, id: usize) {
        let thrower = &self.players[id];
        let origin = thrower.eye();
        let dir = Vec3::from_yaw_pitch(thrower.yaw, thrower.pitch);
        let distance = self
            .trace_ray(id, origin, dir, GRENADE_RANGE, true)
            .map_or(GRENADE_RANGE, |impact| impact.distance());
        let blast = origin + dir * distance;

        let victims: Vec<(usize, i32)> = self
            .players
            .iter()
            .enumerate()
            .filter(|(other, p)| p.is_alive() && self.are_enemies(id, *other))
            .map(|(other, p)| {
                let damage = splash_damage(GRENADE_DAMAGE, GRENADE_RADIUS, p.torso().distance(blast));
                (other, damage)
            })
            .filter(|(_, damage)| *damage > 0)
            .collect();

        let team = self.players[id].team;
        let wrecks: Vec<(usize, i32)> = self
            .vehicles
            .iter()
            .enumerate()
            .filter(|(_, v)| v.active && v.driver.map_or(true, |d| self.players[d].team != team))
            .map(|(vid, v)| {
                let damage =
                    splash_damage(GRENADE_DAMAGE, GRENADE_RADIUS, v.bounds().center().distance(blast));
                (vid, damage)
            })
            .filter(|(_, damage)| *damage > 0)
            .collect();

        for (victim, damage) in victims {
            self.hit_player(victim, id, damage);
        }
        for (vid, damage) in wrecks {
            self.damage_vehicle(vid, Some(id), damage);
        }
    }

    fn repair_nearby(&mut self, id: usize) {
        let position = self.players[id].position;
        let team = self.players[id].team;

        let target = self
            .vehicles
            .iter()
            .enumerate()
            .filter(|(_, v)| v.active && v.driver.map_or(true, |d| self.players[d].team == team))
            .map(|(vid, v)| (vid, v.position.distance(position)))
            .filter(|(_, dist)| *dist < REPAIR_RANGE)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((vid, _)) = target {
            let vehicle = &mut self.vehicles[vid];
            vehicle.health = (vehicle.health + REPAIR_AMOUNT).min(vehicle.def().max_health);
        }
    }

    fn resupply(&mut self, id: usize) {
        let position = self.players[id].position;
        let team = self.players[id].team;

        for player in self.players.iter_mut() {
            if !player.is_alive()
                || player.team != team
                || player.position.distance(position) > RESUPPLY_RADIUS
            {
                continue;
            }
            player.health = (player.health + RESUPPLY_HEAL).min(MAX_HEALTH);
            player.ammo = player.weapon.def().mag_size;
        }
    }

    fn spot_enemies(&mut self, id: usize) {
        let eye = self.players[id].eye();
        let aim = Vec3::from_yaw_pitch(self.players[id].yaw, self.players[id].pitch);

        let spotted: Vec<usize> = self
            .players
            .iter()
            .enumerate()
            .filter(|(other, p)| p.is_alive() && self.are_enemies(id, *other))
            .filter(|(_, p)| {
                let to_target = p.torso() - eye;
                let dist = to_target.length();
                dist > 0.0
                    && dist <= SPOT_RANGE
                    && to_target.dot(aim) / dist >= SPOT_CONE
                    && line_of_sight(self.map.blocks(), eye, p.torso(), 0.5)
            })
            .map(|(other, _)| other)
            .collect();

        for other in spotted {
            self.players[other].spotted_timer = SPOT_DURATION;
        }
    }

    /// Respawns collected pickups and hands active ones to the first alive
    /// player standing on them.
    pub fn update_pickups(&mut self, dt: f32) {
        for pickup in self.pickups.iter_mut() {
            if !pickup.active {
                pickup.respawn_timer -= dt;
                if pickup.respawn_timer <= 0.0 {
                    pickup.active = true;
                    debug!("{} respawned at pickup {}", pickup.kind.def().name, pickup.id);
                }
                continue;
            }

            let collector = self
                .players
                .iter_mut()
                .enumerate()
                .find(|(_, p)| p.is_alive() && p.position.distance(pickup.position) < PICKUP_RADIUS);

            if let Some((id, player)) = collector {
                player.weapon = pickup.kind;
                player.ammo = pickup.kind.def().mag_size;
                pickup.active = false;
                pickup.respawn_timer = WEAPON_RESPAWN;
                debug!("Player {} picked up {}", id, pickup.kind.def().name);
            }
        }
    }
}
