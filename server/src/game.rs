//! The entity store: every player, vehicle, pickup, flag and hazard in one owned
//! aggregate, addressed by stable slot index.
//!
//! Gameplay systems extend `GameState` from their own modules (`combat`,
//! `vehicle`, `objective`, `hazard`); this module holds the storage, slot
//! lifecycle, damage bookkeeping and snapshot encoding they share.

use crate::map::{GameMap, VehicleSpawn};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::defs::VehicleDef;
use shared::protocol::{
    FlagRecord, HazardRecord, PlayerRecord, ServerPacket, Snapshot, VehicleRecord, WeaponRecord,
};
use shared::{
    Aabb, LifeState, PlayerClass, Vec3, VehicleType, WeaponType, EYE_HEIGHT, KILL_FEED_DURATION,
    MAX_HAZARDS, MAX_HEALTH, MAX_PLAYERS, MAX_VEHICLES, PLAYER_HEIGHT, PLAYER_RADIUS,
    RESPAWN_TIME, VEHICLE_RESPAWN,
};

#[derive(Debug, Clone, Default)]
pub struct Player {
    pub name: String,
    pub state: LifeState,
    pub is_bot: bool,
    pub team: u8,
    pub class: PlayerClass,
    pub position: Vec3,
    pub velocity: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub health: i32,
    pub weapon: WeaponType,
    pub ammo: i32,
    pub fire_cooldown: f32,
    pub ability_cooldown: f32,
    pub spotted_timer: f32,
    pub respawn_timer: f32,
    /// Vehicle slot this player is driving, if any.
    pub vehicle: Option<usize>,
}

impl Player {
    pub fn is_alive(&self) -> bool {
        self.state == LifeState::Alive
    }

    pub fn is_connected(&self) -> bool {
        self.state != LifeState::Disconnected
    }

    pub fn eye(&self) -> Vec3 {
        self.position + Vec3::new(0.0, EYE_HEIGHT, 0.0)
    }

    pub fn torso(&self) -> Vec3 {
        self.position + Vec3::new(0.0, PLAYER_HEIGHT * 0.5, 0.0)
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::upright(self.position, PLAYER_RADIUS, PLAYER_HEIGHT)
    }

    fn record(&self, id: usize) -> PlayerRecord {
        PlayerRecord {
            id: id as u8,
            state: self.state as u8,
            position: self.position,
            yaw: self.yaw,
            pitch: self.pitch,
            health: self.health.clamp(0, 255) as u8,
            weapon: self.weapon as u8,
            ammo: self.ammo.clamp(0, 255) as u8,
            vehicle: self.vehicle.map_or(-1, |v| v as i16),
            team: self.team,
            class: self.class as u8,
            spotted: u8::from(self.spotted_timer > 0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub kind: VehicleType,
    pub position: Vec3,
    pub velocity: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    /// Relative to the hull.
    pub turret_yaw: f32,
    /// Current forward speed; only fixed-wing aircraft keep momentum this way.
    pub airspeed: f32,
    pub health: i32,
    pub driver: Option<usize>,
    pub active: bool,
    pub fire_cooldown: f32,
    pub respawn_timer: f32,
    pub rotor_angle: f32,
    pub spawn_position: Vec3,
    pub spawn_yaw: f32,
}

impl Vehicle {
    pub fn from_spawn(spawn: &VehicleSpawn) -> Self {
        let mut vehicle = Self {
            kind: spawn.kind,
            position: spawn.position,
            velocity: Vec3::ZERO,
            yaw: spawn.yaw,
            pitch: 0.0,
            turret_yaw: 0.0,
            airspeed: 0.0,
            health: 0,
            driver: None,
            active: true,
            fire_cooldown: 0.0,
            respawn_timer: 0.0,
            rotor_angle: 0.0,
            spawn_position: spawn.position,
            spawn_yaw: spawn.yaw,
        };
        vehicle.reset();
        vehicle
    }

    /// Restores the vehicle to its spawn pose at full health.
    pub fn reset(&mut self) {
        self.position = self.spawn_position;
        self.yaw = self.spawn_yaw;
        self.pitch = 0.0;
        self.turret_yaw = 0.0;
        self.velocity = Vec3::ZERO;
        self.airspeed = 0.0;
        self.health = self.def().max_health;
        self.driver = None;
        self.active = true;
        self.fire_cooldown = 0.0;
        self.respawn_timer = 0.0;
    }

    pub fn def(&self) -> &'static VehicleDef {
        self.kind.def()
    }

    pub fn bounds(&self) -> Aabb {
        let def = self.def();
        Aabb::upright(self.position, def.length.max(def.width) * 0.5, def.height)
    }

    fn record(&self, id: usize) -> VehicleRecord {
        VehicleRecord {
            id: id as u8,
            kind: self.kind as u8,
            position: self.position,
            yaw: self.yaw,
            pitch: self.pitch,
            turret_yaw: self.turret_yaw,
            health: self.health.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
            driver: self.driver.map_or(-1, |d| d as i16),
            active: u8::from(self.active),
            rotor_angle: self.rotor_angle,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pickup {
    pub id: u16,
    pub kind: WeaponType,
    pub position: Vec3,
    pub active: bool,
    pub respawn_timer: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlagState {
    AtBase,
    Carried { carrier: usize },
    Dropped { return_timer: f32 },
}

#[derive(Debug, Clone)]
pub struct Flag {
    pub team: u8,
    pub base: Vec3,
    pub position: Vec3,
    pub state: FlagState,
}

impl Flag {
    pub fn new(team: u8, base: Vec3) -> Self {
        Self {
            team,
            base,
            position: base,
            state: FlagState::AtBase,
        }
    }

    pub fn carrier(&self) -> Option<usize> {
        match self.state {
            FlagState::Carried { carrier } => Some(carrier),
            _ => None,
        }
    }

    pub fn return_to_base(&mut self) {
        self.position = self.base;
        self.state = FlagState::AtBase;
    }

    fn record(&self) -> FlagRecord {
        FlagRecord {
            team: self.team,
            position: self.position,
            carrier: self.carrier().map_or(-1, |c| c as i16),
            at_base: u8::from(self.state == FlagState::AtBase),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Hazard {
    pub position: Vec3,
    pub velocity: Vec3,
    pub outer_radius: f32,
    pub inner_radius: f32,
    pub pull_strength: f32,
    /// Damage per second inside the inner radius.
    pub damage_rate: f32,
    pub age: f32,
    pub lifetime: f32,
    pub rotation: f32,
    pub pulse_timer: f32,
}

impl Hazard {
    fn record(&self) -> HazardRecord {
        HazardRecord {
            position: self.position,
            radius: self.outer_radius,
            rotation: self.rotation,
            active: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KillEvent {
    pub killer: usize,
    pub victim: usize,
    pub timer: f32,
}

pub struct GameState {
    pub tick: u32,
    pub map: GameMap,
    pub players: Vec<Player>,
    pub vehicles: Vec<Vehicle>,
    pub pickups: Vec<Pickup>,
    pub flags: [Flag; 2],
    pub hazards: [Option<Hazard>; MAX_HAZARDS],
    /// Seconds until the next hazard spawn attempt.
    pub hazard_timer: f32,
    pub kill_feed: Vec<KillEvent>,
    pub scores: [u8; 2],
    pub rng: StdRng,
    events: Vec<ServerPacket>,
    next_team: u8,
}

impl GameState {
    pub fn new(map: GameMap, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let vehicles = map
            .vehicle_spawns()
            .iter()
            .take(MAX_VEHICLES)
            .map(Vehicle::from_spawn)
            .collect();

        let pickups = map
            .pickup_sites()
            .iter()
            .enumerate()
            .map(|(i, site)| Pickup {
                id: i as u16,
                kind: site.kind,
                position: site.position,
                active: true,
                respawn_timer: 0.0,
            })
            .collect();

        let flags = [Flag::new(0, map.flag_base(0)), Flag::new(1, map.flag_base(1))];
        let hazard_timer = rng.gen_range(20.0..45.0);

        Self {
            tick: 0,
            map,
            players: vec![Player::default(); MAX_PLAYERS],
            vehicles,
            pickups,
            flags,
            hazards: Default::default(),
            hazard_timer,
            kill_feed: Vec::new(),
            scores: [0; 2],
            rng,
            events: Vec::new(),
            next_team: 0,
        }
    }

    pub fn find_free_slot(&self) -> Option<usize> {
        self.players.iter().position(|p| !p.is_connected())
    }

    /// Claims the first free slot, assigns the next team in rotation and
    /// spawns the player with their class loadout.
    pub fn add_player(&mut self, name: &str, is_bot: bool, class: PlayerClass) -> Option<usize> {
        let id = self.find_free_slot()?;
        let team = self.next_team;
        self.next_team ^= 1;

        self.players[id] = Player {
            name: name.to_string(),
            is_bot,
            team,
            class,
            ..Player::default()
        };
        self.spawn_player(id);

        debug!("Slot {} assigned to '{}' on team {}", id, name, team);
        Some(id)
    }

    /// Releases a slot. Any vehicle is vacated and a carried flag is dropped
    /// where the player stood.
    pub fn remove_player(&mut self, id: usize) {
        if id >= self.players.len() || !self.players[id].is_connected() {
            return;
        }
        self.exit_vehicle(id);
        self.drop_flag(id);
        self.players[id].state = LifeState::Disconnected;
        info!("Removed player {} ('{}')", id, self.players[id].name);
    }

    pub fn spawn_player(&mut self, id: usize) {
        let team = self.players[id].team;
        let spawns = self.map.team_spawns(team);
        let (position, yaw) = if spawns.is_empty() {
            (Vec3::new(0.0, 0.1, 0.0), 0.0)
        } else {
            let spawn = spawns[self.rng.gen_range(0..spawns.len())];
            (spawn.position, spawn.yaw)
        };

        let player = &mut self.players[id];
        let loadout = player.class.def().primary;
        player.position = position;
        player.yaw = yaw;
        player.pitch = 0.0;
        player.velocity = Vec3::ZERO;
        player.health = MAX_HEALTH;
        player.state = LifeState::Alive;
        player.weapon = loadout;
        player.ammo = loadout.def().mag_size;
        player.fire_cooldown = 0.0;
        player.ability_cooldown = 0.0;
        player.spotted_timer = 0.0;
        player.respawn_timer = 0.0;
        player.vehicle = None;
    }

    /// Counts down dead players and respawns those whose timer ran out.
    pub fn update_respawns(&mut self, dt: f32) {
        for id in 0..self.players.len() {
            if self.players[id].state != LifeState::Dead {
                continue;
            }
            self.players[id].respawn_timer -= dt;
            if self.players[id].respawn_timer <= 0.0 {
                self.spawn_player(id);
            }
        }
    }

    /// Per-tick decay of ability cooldowns and spotted markers.
    pub fn update_timers(&mut self, dt: f32) {
        for player in self.players.iter_mut().filter(|p| p.is_connected()) {
            player.fire_cooldown = (player.fire_cooldown - dt).max(0.0);
            player.ability_cooldown = (player.ability_cooldown - dt).max(0.0);
            player.spotted_timer = (player.spotted_timer - dt).max(0.0);
        }
    }

    pub fn age_kill_feed(&mut self, dt: f32) {
        for event in &mut self.kill_feed {
            event.timer -= dt;
        }
        self.kill_feed.retain(|e| e.timer > 0.0);
    }

    pub fn are_enemies(&self, a: usize, b: usize) -> bool {
        a != b && self.players[a].team != self.players[b].team
    }

    /// Weapon damage: notifies every client of the hit, then applies it.
    /// Returns true when the hit was lethal.
    pub fn hit_player(&mut self, victim: usize, attacker: usize, damage: i32) -> bool {
        if !self.players[victim].is_alive() {
            return false;
        }
        self.events.push(ServerPacket::PlayerHit {
            attacker: attacker as u8,
            victim: victim as u8,
            damage: damage.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
        });
        self.damage_player(victim, attacker, damage)
    }

    /// Applies damage without a hit notification (hazards, collisions).
    pub fn damage_player(&mut self, victim: usize, attacker: usize, damage: i32) -> bool {
        let player = &mut self.players[victim];
        if !player.is_alive() {
            return false;
        }
        player.health -= damage;
        if player.health <= 0 {
            self.kill(victim, attacker);
            return true;
        }
        false
    }

    /// The single path into the dead state.
    pub fn kill(&mut self, victim: usize, killer: usize) {
        if !self.players[victim].is_alive() {
            return;
        }
        self.exit_vehicle(victim);
        self.drop_flag(victim);

        let player = &mut self.players[victim];
        player.health = 0;
        player.state = LifeState::Dead;
        player.respawn_timer = RESPAWN_TIME;
        player.velocity = Vec3::ZERO;

        self.events.push(ServerPacket::PlayerDied {
            victim: victim as u8,
            killer: killer as u8,
        });
        self.kill_feed.push(KillEvent {
            killer,
            victim,
            timer: KILL_FEED_DURATION,
        });
        info!(
            "{} killed {}",
            self.players[killer].name, self.players[victim].name
        );
    }

    /// `attacker` is credited with the driver's death if this wrecks the vehicle;
    /// environmental damage passes `None`.
    pub fn damage_vehicle(&mut self, id: usize, attacker: Option<usize>, damage: i32) {
        let vehicle = &mut self.vehicles[id];
        if !vehicle.active {
            return;
        }
        vehicle.health -= damage;
        if vehicle.health <= 0 {
            self.destroy_vehicle(id, attacker);
        }
    }

    /// Wrecks a vehicle, killing its driver, and arms the respawn delay.
    pub fn destroy_vehicle(&mut self, id: usize, attacker: Option<usize>) {
        let vehicle = &mut self.vehicles[id];
        if !vehicle.active {
            return;
        }
        vehicle.health = 0;
        vehicle.active = false;
        vehicle.respawn_timer = VEHICLE_RESPAWN;
        vehicle.velocity = Vec3::ZERO;
        let driver = vehicle.driver;
        info!("{} {} destroyed", vehicle.def().name, id);

        if let Some(driver) = driver {
            self.kill(driver, attacker.unwrap_or(driver));
        }
    }

    /// Hands the accumulated hit and death notifications to the caller.
    pub fn take_events(&mut self) -> Vec<ServerPacket> {
        std::mem::take(&mut self.events)
    }

    pub fn connected_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_connected()).count()
    }

    pub fn snapshot(&self, ack_seq: u32) -> Snapshot {
        Snapshot {
            tick: self.tick,
            ack_seq,
            team_scores: self.scores,
            players: self
                .players
                .iter()
                .enumerate()
                .filter(|(_, p)| p.is_connected())
                .map(|(id, p)| p.record(id))
                .collect(),
            weapons: self
                .pickups
                .iter()
                .map(|p| WeaponRecord {
                    id: p.id,
                    kind: p.kind as u8,
                    position: p.position,
                    active: u8::from(p.active),
                })
                .collect(),
            vehicles: self
                .vehicles
                .iter()
                .enumerate()
                .map(|(id, v)| v.record(id))
                .collect(),
            flags: [self.flags[0].record(), self.flags[1].record()],
            hazards: self.hazards.iter().flatten().map(Hazard::record).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_state() -> GameState {
        GameState::new(GameMap::new(), Some(1))
    }

    #[test]
    fn test_slots_are_reused() {
        let mut state = empty_state();
        let a = state.add_player("a", false, PlayerClass::Assault).unwrap();
        let b = state.add_player("b", false, PlayerClass::Assault).unwrap();
        assert_eq!((a, b), (0, 1));

        state.remove_player(a);
        assert_eq!(state.players[a].state, LifeState::Disconnected);
        assert_eq!(state.add_player("c", false, PlayerClass::Recon), Some(0));
    }

    #[test]
    fn test_teams_alternate() {
        let mut state = empty_state();
        let teams: Vec<u8> = (0..4)
            .map(|i| {
                let id = state.add_player(&format!("p{}", i), true, PlayerClass::Assault).unwrap();
                state.players[id].team
            })
            .collect();
        assert_eq!(teams, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_server_full() {
        let mut state = empty_state();
        for i in 0..MAX_PLAYERS {
            assert!(state.add_player(&format!("p{}", i), true, PlayerClass::Assault).is_some());
        }
        assert!(state.add_player("late", false, PlayerClass::Assault).is_none());
    }

    #[test]
    fn test_spawn_issues_class_loadout() {
        let mut state = empty_state();
        let id = state.add_player("sniper", false, PlayerClass::Recon).unwrap();
        let p = &state.players[id];
        assert!(p.is_alive());
        assert_eq!(p.health, MAX_HEALTH);
        assert_eq!(p.weapon, WeaponType::Sniper);
        assert_eq!(p.ammo, WeaponType::Sniper.def().mag_size);
    }

    #[test]
    fn test_lethal_damage_arms_respawn() {
        let mut state = empty_state();
        let shooter = state.add_player("a", false, PlayerClass::Assault).unwrap();
        let victim = state.add_player("b", false, PlayerClass::Assault).unwrap();

        assert!(!state.hit_player(victim, shooter, 40));
        assert!(state.hit_player(victim, shooter, 250));

        let p = &state.players[victim];
        assert_eq!(p.state, LifeState::Dead);
        assert_eq!(p.health, 0);
        assert_eq!(p.respawn_timer, RESPAWN_TIME);
        assert_eq!(state.kill_feed.len(), 1);

        let events = state.take_events();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[2],
            ServerPacket::PlayerDied {
                victim: victim as u8,
                killer: shooter as u8
            }
        );

        // Dead players take no further hits
        assert!(!state.hit_player(victim, shooter, 10));
        assert!(state.take_events().is_empty());
    }

    #[test]
    fn test_respawn_after_timer() {
        let mut state = empty_state();
        let a = state.add_player("a", false, PlayerClass::Assault).unwrap();
        let b = state.add_player("b", false, PlayerClass::Assault).unwrap();
        state.kill(b, a);

        let ticks = (RESPAWN_TIME * 64.0) as usize;
        for _ in 0..ticks - 1 {
            state.update_respawns(1.0 / 64.0);
        }
        assert_eq!(state.players[b].state, LifeState::Dead);
        for _ in 0..2 {
            state.update_respawns(1.0 / 64.0);
        }
        assert!(state.players[b].is_alive());
    }

    #[test]
    fn test_snapshot_never_shows_negative_health() {
        let mut state = empty_state();
        let a = state.add_player("a", false, PlayerClass::Assault).unwrap();
        let b = state.add_player("b", false, PlayerClass::Assault).unwrap();
        state.hit_player(b, a, 500);

        let snapshot = state.snapshot(0);
        assert_eq!(snapshot.players.len(), 2);
        let record = snapshot.players.iter().find(|r| r.id == b as u8).unwrap();
        assert_eq!(record.health, 0);
        assert_eq!(record.state, LifeState::Dead as u8);
        assert_eq!(record.vehicle, -1);
    }

    #[test]
    fn test_weapon_cooldown_runs_while_driving() {
        let mut state = empty_state();
        let id = state.add_player("driver", false, PlayerClass::Assault).unwrap();
        state.players[id].fire_cooldown = 0.5;
        state.players[id].vehicle = Some(0);

        for _ in 0..32 {
            state.update_timers(1.0 / 64.0);
        }
        assert_eq!(state.players[id].fire_cooldown, 0.0);
    }

    #[test]
    fn test_kill_feed_expires() {
        let mut state = empty_state();
        let a = state.add_player("a", false, PlayerClass::Assault).unwrap();
        let b = state.add_player("b", false, PlayerClass::Assault).unwrap();
        state.kill(b, a);
        state.age_kill_feed(KILL_FEED_DURATION - 0.5);
        assert_eq!(state.kill_feed.len(), 1);
        state.age_kill_feed(1.0);
        assert!(state.kill_feed.is_empty());
    }

    #[test]
    fn test_vehicle_destruction_kills_driver() {
        let mut map = GameMap::new();
        map.add_vehicle_spawn(VehicleType::Jeep, Vec3::new(0.0, 0.1, 0.0), 0.0);
        let mut state = GameState::new(map, Some(3));
        let attacker = state.add_player("a", false, PlayerClass::Assault).unwrap();
        let driver = state.add_player("b", false, PlayerClass::Assault).unwrap();
        state.players[driver].vehicle = Some(0);
        state.vehicles[0].driver = Some(driver);

        state.damage_vehicle(0, Some(attacker), 1000);
        assert!(!state.vehicles[0].active);
        assert_eq!(state.vehicles[0].respawn_timer, VEHICLE_RESPAWN);
        assert_eq!(state.players[driver].state, LifeState::Dead);
        assert_eq!(state.players[driver].vehicle, None);
        assert_eq!(state.vehicles[0].driver, None);
    }
}
