//! Bot brains.
//!
//! Each bot owns a [`BotBrain`] that reads the world and produces the same
//! [`InputState`] a human client would send. The brain never mutates the world;
//! the orchestrator feeds its output through the regular input path.
//!
//! ```text
//!            enemy seen                in range + visible
//!   Patrol ─────────────▶ Chase ─────────────────────────▶ Attack
//!     ▲  │                  ▲ ◀─── lost sight / out of range ──┘ │
//!     │  │ pistol/low ammo  │                                    │ health < 30
//!     │  ▼                  │                                    ▼
//!   PickupWeapon ── enemy close ──▶ Attack               Retreat ──▶ Patrol
//! ```

use crate::game::{GameState, Player};
use crate::pathfinding::find_path;
use crate::spatial::line_of_sight;
use rand::Rng;
use shared::{
    InputState, Vec3, WeaponType, EYE_HEIGHT, KEY_A, KEY_D, KEY_JUMP, KEY_S, KEY_SHOOT, KEY_W,
    PLAYER_HEIGHT,
};
use std::f32::consts::FRAC_PI_2;

const SIGHT_TOLERANCE: f32 = 0.5;
const PATROL_SIGHT_RANGE: f32 = 40.0;
const PICKUP_SEARCH_RANGE: f32 = 30.0;
const PICKUP_ABORT_RANGE: f32 = 20.0;
const CHASE_GIVE_UP_RANGE: f32 = 20.0;
const RETREAT_HEALTH: i32 = 30;
const RECOVERED_HEALTH: i32 = 60;
const FLEE_DISTANCE: f32 = 25.0;

const PATROL_REPATH: f32 = 8.0;
const CHASE_REPATH: f32 = 2.0;
const JUMP_COOLDOWN: f32 = 0.4;
/// Movement below this many metres per second counts as stuck.
const STUCK_SPEED: f32 = 0.05;
const STUCK_JUMP_AFTER: f32 = 0.5;
const STUCK_REPATH_AFTER: f32 = 1.5;
const WAYPOINT_REACHED: f32 = 2.0;
/// Obstacles lower than this are jumped rather than routed around.
const JUMPABLE_HEIGHT: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BotState {
    Patrol,
    Chase {
        target: usize,
    },
    Attack {
        target: usize,
        strafe_dir: f32,
        strafe_timer: f32,
    },
    Retreat {
        threat: usize,
    },
    PickupWeapon {
        site: Vec3,
    },
}

#[derive(Debug, Clone)]
pub struct BotBrain {
    pub player_id: usize,
    pub state: BotState,
    state_timer: f32,
    path: Vec<usize>,
    path_cursor: usize,
    path_age: f32,
    /// Per-bot delay between acquiring a target and the first shot.
    reaction_delay: f32,
    reaction_timer: f32,
    /// Per-bot aim error in radians.
    aim_jitter: f32,
    last_position: Vec3,
    stuck_timer: f32,
    jump_cooldown: f32,
    combat_jump_timer: f32,
}

/// Yaw and pitch from `me`'s eye to `target`'s torso.
fn aim_at(me: &Player, target: &Player) -> (f32, f32) {
    let to = target.position - me.position;
    let pitch = (to.y + PLAYER_HEIGHT * 0.5 - EYE_HEIGHT).atan2(to.flat().length());
    (to.yaw(), pitch)
}

fn spread(rng: &mut impl Rng, amount: f32) -> f32 {
    if amount > 0.0 {
        rng.gen_range(-amount..=amount)
    } else {
        0.0
    }
}

/// Bots stop collecting once they carry something better than a sidearm
/// with at least a quarter magazine.
fn wants_weapon(player: &Player) -> bool {
    player.weapon == WeaponType::Pistol || player.ammo * 4 <= player.weapon.def().mag_size
}

pub fn can_see(world: &GameState, viewer: usize, target: usize) -> bool {
    let from = world.players[viewer].eye();
    let to = world.players[target].torso();
    line_of_sight(world.map.blocks(), from, to, SIGHT_TOLERANCE)
}

pub fn nearest_visible_enemy(world: &GameState, viewer: usize, range: f32) -> Option<usize> {
    let position = world.players[viewer].position;
    let mut candidates: Vec<(usize, f32)> = world
        .players
        .iter()
        .enumerate()
        .filter(|(id, other)| other.is_alive() && world.are_enemies(viewer, *id))
        .map(|(id, other)| (id, other.position.distance(position)))
        .filter(|(_, d)| *d < range)
        .collect();
    // Closest first, stopping at the first one in sight
    candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
    candidates
        .into_iter()
        .find(|(id, _)| can_see(world, viewer, *id))
        .map(|(id, _)| id)
}

impl BotBrain {
    pub fn new(player_id: usize, position: Vec3, rng: &mut impl Rng) -> Self {
        Self {
            player_id,
            state: BotState::Patrol,
            state_timer: 0.0,
            path: Vec::new(),
            path_cursor: 0,
            path_age: 0.0,
            reaction_delay: rng.gen_range(0.6..1.5),
            reaction_timer: 0.0,
            aim_jitter: rng.gen_range(0.06..0.14),
            last_position: position,
            stuck_timer: 0.0,
            jump_cooldown: 0.0,
            combat_jump_timer: 0.0,
        }
    }

    fn clear_path(&mut self) {
        self.path.clear();
        self.path_cursor = 0;
    }

    fn enter(&mut self, state: BotState, timer: f32) {
        self.state = state;
        self.state_timer = timer;
    }

    fn path_to(&mut self, world: &GameState, target: Vec3) {
        let from = world.map.nearest_waypoint(world.players[self.player_id].position);
        let to = world.map.nearest_waypoint(target);
        self.path = match (from, to) {
            (Some(from), Some(to)) => find_path(world.map.waypoints(), from, to),
            _ => Vec::new(),
        };
        self.path_cursor = 0;
        self.path_age = 0.0;
    }

    fn try_jump(&mut self, input: &mut InputState) {
        if self.jump_cooldown <= 0.0 {
            input.press(KEY_JUMP);
            self.jump_cooldown = JUMP_COOLDOWN;
        }
    }

    /// Produces this tick's input for the bot's player.
    pub fn think(&mut self, world: &GameState, rng: &mut impl Rng, dt: f32) -> InputState {
        let me = &world.players[self.player_id];
        if !me.is_alive() {
            self.state = BotState::Patrol;
            self.clear_path();
            self.stuck_timer = 0.0;
            self.last_position = me.position;
            return InputState::default();
        }

        self.state_timer -= dt;
        self.path_age += dt;
        if self.jump_cooldown > 0.0 {
            self.jump_cooldown -= dt;
        }
        if self.combat_jump_timer > 0.0 {
            self.combat_jump_timer -= dt;
        }

        let mut input = InputState::new(0, me.yaw, me.pitch);

        if me.position.distance(self.last_position) < STUCK_SPEED * dt {
            self.stuck_timer += dt;
        } else {
            self.stuck_timer = 0.0;
        }
        self.last_position = me.position;

        if self.stuck_timer > STUCK_JUMP_AFTER {
            self.try_jump(&mut input);
        }
        if self.stuck_timer > STUCK_REPATH_AFTER {
            let waypoints = world.map.waypoints();
            if let Some(start) = world.map.nearest_waypoint(me.position) {
                let goal = rng.gen_range(0..waypoints.len());
                self.path = find_path(waypoints, start, goal);
                self.path_cursor = 0;
            }
            self.stuck_timer = 0.0;
        }

        match self.state {
            BotState::Patrol => self.patrol(world, rng, &mut input),
            BotState::Chase { target } => self.chase(world, rng, target, &mut input),
            BotState::Attack {
                target,
                strafe_dir,
                strafe_timer,
            } => self.attack(world, rng, target, strafe_dir, strafe_timer - dt, dt, &mut input),
            BotState::Retreat { threat } => self.retreat(world, rng, threat, &mut input),
            BotState::PickupWeapon { site } => self.seek_pickup(world, rng, site, &mut input),
        }
        input
    }

    fn follow_path(&mut self, world: &GameState, input: &mut InputState) {
        let Some(&node) = self.path.get(self.path_cursor) else {
            return;
        };
        let me = &world.players[self.player_id];
        let waypoint = world.map.waypoints()[node].position;
        let to = waypoint - me.position;

        if to.flat().length() < WAYPOINT_REACHED && to.y.abs() < WAYPOINT_REACHED {
            self.path_cursor += 1;
            if self.path_cursor >= self.path.len() {
                self.clear_path();
            }
            return;
        }

        input.yaw = to.yaw();
        input.pitch = 0.0;
        input.press(KEY_W);

        if to.y > 0.5 {
            self.try_jump(input);
        }
        if let Some(height) = world.map.obstacle_ahead(me.position, input.yaw, 1.5) {
            if height < JUMPABLE_HEIGHT {
                self.try_jump(input);
            }
        }
    }

    fn patrol(&mut self, world: &GameState, rng: &mut impl Rng, input: &mut InputState) {
        let waypoints = world.map.waypoints();
        let me = &world.players[self.player_id];

        if !waypoints.is_empty() && (self.path.is_empty() || self.path_age > PATROL_REPATH) {
            // Farthest of a few random picks keeps patrols crossing the map
            let mut goal = rng.gen_range(0..waypoints.len());
            for _ in 0..3 {
                let candidate = rng.gen_range(0..waypoints.len());
                if waypoints[candidate].position.distance(me.position)
                    > waypoints[goal].position.distance(me.position)
                {
                    goal = candidate;
                }
            }
            if let Some(start) = world.map.nearest_waypoint(me.position) {
                self.path = find_path(waypoints, start, goal);
            }
            self.path_cursor = 0;
            self.path_age = 0.0;
        }

        self.follow_path(world, input);

        if let Some(enemy) = nearest_visible_enemy(world, self.player_id, PATROL_SIGHT_RANGE) {
            self.enter(BotState::Chase { target: enemy }, 10.0);
            self.reaction_timer = self.reaction_delay;
            self.clear_path();
            return;
        }

        if wants_weapon(me) {
            let site = world
                .pickups
                .iter()
                .filter(|p| p.active)
                .map(|p| (p.position, p.position.distance(me.position)))
                .filter(|(_, d)| *d < PICKUP_SEARCH_RANGE)
                .min_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((site, _)) = site {
                self.path_to(world, site);
                self.enter(BotState::PickupWeapon { site }, 12.0);
            }
        }
    }

    fn chase(
        &mut self,
        world: &GameState,
        rng: &mut impl Rng,
        target: usize,
        input: &mut InputState,
    ) {
        let me = &world.players[self.player_id];
        let enemy = &world.players[target];
        if !enemy.is_alive() || !world.are_enemies(self.player_id, target) {
            self.enter(BotState::Patrol, 0.0);
            self.clear_path();
            return;
        }

        let dist = enemy.position.distance(me.position);
        if self.path.is_empty() || self.path_age > CHASE_REPATH {
            self.path_to(world, enemy.position);
        }

        let (yaw, pitch) = aim_at(me, enemy);
        input.yaw = yaw + spread(rng, self.aim_jitter);
        input.pitch = pitch + spread(rng, self.aim_jitter);

        let visible = can_see(world, self.player_id, target);
        if dist < me.weapon.def().range * 0.8 && visible {
            let strafe_dir = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            self.enter(
                BotState::Attack {
                    target,
                    strafe_dir,
                    strafe_timer: 0.0,
                },
                5.0,
            );
            return;
        }

        self.follow_path(world, input);

        if self.combat_jump_timer <= 0.0 && rng.gen_bool(0.01) {
            input.press(KEY_JUMP);
            self.combat_jump_timer = rng.gen_range(1.0..3.0);
        }

        if self.state_timer <= 0.0 || (!visible && dist > CHASE_GIVE_UP_RANGE) {
            self.enter(BotState::Patrol, 0.0);
            self.clear_path();
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn attack(
        &mut self,
        world: &GameState,
        rng: &mut impl Rng,
        target: usize,
        mut strafe_dir: f32,
        mut strafe_timer: f32,
        dt: f32,
        input: &mut InputState,
    ) {
        let me = &world.players[self.player_id];
        let enemy = &world.players[target];
        if !enemy.is_alive() || !world.are_enemies(self.player_id, target) {
            self.enter(BotState::Patrol, 0.0);
            self.clear_path();
            return;
        }

        let dist = enemy.position.distance(me.position);
        let (yaw, pitch) = aim_at(me, enemy);
        input.yaw = yaw + spread(rng, self.aim_jitter);
        input.pitch = pitch + spread(rng, self.aim_jitter);

        if strafe_timer <= 0.0 {
            strafe_dir = -strafe_dir;
            strafe_timer = rng.gen_range(0.8..2.5);
            if rng.gen_bool(0.3) {
                input.press(if dist > 10.0 { KEY_W } else { KEY_S });
            }
        }
        input.press(if strafe_dir > 0.0 { KEY_D } else { KEY_A });
        self.state = BotState::Attack {
            target,
            strafe_dir,
            strafe_timer,
        };

        if self.combat_jump_timer <= 0.0 && rng.gen_bool(0.03) {
            input.press(KEY_JUMP);
            self.combat_jump_timer = rng.gen_range(0.8..2.0);
        }

        let side = input.yaw + if strafe_dir > 0.0 { FRAC_PI_2 } else { -FRAC_PI_2 };
        if let Some(height) = world.map.obstacle_ahead(me.position, side, 1.0) {
            if height < JUMPABLE_HEIGHT {
                self.try_jump(input);
            }
        }

        let visible = can_see(world, self.player_id, target);
        self.reaction_timer -= dt;
        if self.reaction_timer <= 0.0 && visible && rng.gen_bool(0.6) {
            input.press(KEY_SHOOT);
        }

        if me.health < RETREAT_HEALTH {
            self.enter(BotState::Retreat { threat: target }, 5.0);
            let away = (me.position - enemy.position).normalize();
            self.path_to(world, me.position + away * 20.0);
            return;
        }

        if dist > me.weapon.def().range || self.state_timer <= 0.0 {
            self.enter(BotState::Chase { target }, 10.0);
            self.clear_path();
        }
        if !visible {
            self.enter(BotState::Chase { target }, 5.0);
            self.path_to(world, enemy.position);
        }
    }

    fn retreat(&mut self, world: &GameState, rng: &mut impl Rng, threat: usize, input: &mut InputState) {
        let me = &world.players[self.player_id];
        let enemy = &world.players[threat];
        let threat_alive = enemy.is_alive() && world.are_enemies(self.player_id, threat);

        if !self.path.is_empty() {
            self.follow_path(world, input);
        } else if threat_alive {
            let away = (me.position - enemy.position).flat();
            if away.length_sq() > 0.1 {
                self.path_to(world, me.position + away.normalize() * FLEE_DISTANCE);
            }
        }

        if self.combat_jump_timer <= 0.0 && rng.gen_bool(0.04) {
            input.press(KEY_JUMP);
            self.combat_jump_timer = rng.gen_range(0.5..1.5);
        }

        if threat_alive && can_see(world, self.player_id, threat) {
            let (yaw, pitch) = aim_at(me, enemy);
            input.yaw = yaw + spread(rng, self.aim_jitter * 3.0);
            input.pitch = pitch;
            if rng.gen_bool(0.25) {
                input.press(KEY_SHOOT);
            }
        }

        if self.state_timer <= 0.0 || me.health > RECOVERED_HEALTH {
            self.enter(BotState::Patrol, 0.0);
            self.clear_path();
        }
    }

    fn seek_pickup(&mut self, world: &GameState, rng: &mut impl Rng, site: Vec3, input: &mut InputState) {
        let me = &world.players[self.player_id];

        if !self.path.is_empty() {
            self.follow_path(world, input);
        } else {
            let to = (site - me.position).flat();
            if to.length_sq() > 0.1 {
                input.yaw = to.yaw();
                input.pitch = 0.0;
                input.press(KEY_W);
            }
        }

        if site.distance(me.position) < 1.5 || self.state_timer <= 0.0 || !wants_weapon(me) {
            self.enter(BotState::Patrol, 0.0);
            self.clear_path();
            return;
        }

        if let Some(enemy) = nearest_visible_enemy(world, self.player_id, PICKUP_ABORT_RANGE) {
            let strafe_dir = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            self.enter(
                BotState::Attack {
                    target: enemy,
                    strafe_dir,
                    strafe_timer: 0.0,
                },
                5.0,
            );
            self.reaction_timer = self.reaction_delay;
            self.clear_path();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{Block, GameMap};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::{PlayerClass, TICK_DT};

    /// Bot on team 0 at the origin, enemy on team 1 twenty units ahead.
    fn standoff(map: GameMap) -> (GameState, BotBrain, usize, StdRng) {
        let mut rng = StdRng::seed_from_u64(42);
        let mut state = GameState::new(map, Some(42));
        let bot = state.add_player("Bot_1", true, PlayerClass::Assault).unwrap();
        let enemy = state.add_player("Bot_2", true, PlayerClass::Assault).unwrap();
        state.players[bot].position = Vec3::ZERO;
        state.players[enemy].position = Vec3::new(0.0, 0.0, 20.0);
        let brain = BotBrain::new(bot, Vec3::ZERO, &mut rng);
        (state, brain, enemy, rng)
    }

    #[test]
    fn test_personality_ranges() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let brain = BotBrain::new(0, Vec3::ZERO, &mut rng);
            assert!((0.6..1.5).contains(&brain.reaction_delay));
            assert!((0.06..0.14).contains(&brain.aim_jitter));
            assert_eq!(brain.state, BotState::Patrol);
        }
    }

    #[test]
    fn test_spots_enemy_and_closes_in() {
        let (state, mut brain, enemy, mut rng) = standoff(GameMap::new());

        brain.think(&state, &mut rng, TICK_DT);
        assert_eq!(brain.state, BotState::Chase { target: enemy });

        brain.think(&state, &mut rng, TICK_DT);
        assert!(matches!(brain.state, BotState::Attack { target, .. } if target == enemy));
    }

    #[test]
    fn test_ignores_teammates() {
        let (mut state, mut brain, enemy, mut rng) = standoff(GameMap::new());
        state.players[enemy].team = state.players[brain.player_id].team;
        brain.think(&state, &mut rng, TICK_DT);
        assert_eq!(brain.state, BotState::Patrol);
    }

    #[test]
    fn test_walls_hide_enemies() {
        let mut map = GameMap::new();
        map.add_block(Block::solid(Vec3::new(-5.0, 0.0, 9.0), Vec3::new(5.0, 4.0, 10.0)));
        let (state, mut brain, _, mut rng) = standoff(map);
        brain.think(&state, &mut rng, TICK_DT);
        assert_eq!(brain.state, BotState::Patrol);
    }

    #[test]
    fn test_attack_fires_after_reaction_delay() {
        let (state, mut brain, enemy, mut rng) = standoff(GameMap::new());
        brain.think(&state, &mut rng, TICK_DT);
        brain.think(&state, &mut rng, TICK_DT);

        let mut first_shot = None;
        for tick in 0..(3 * 64) {
            let input = brain.think(&state, &mut rng, TICK_DT);
            if input.pressed(KEY_SHOOT) {
                first_shot = Some(tick as f32 * TICK_DT);
                break;
            }
        }
        let at = first_shot.expect("bot never fired");
        assert!(at >= brain.reaction_delay - 2.0 * TICK_DT);
        assert!(matches!(brain.state, BotState::Attack { target, .. } if target == enemy));
    }

    #[test]
    fn test_attack_aims_at_target() {
        let (state, mut brain, _, mut rng) = standoff(GameMap::new());
        brain.think(&state, &mut rng, TICK_DT);
        brain.think(&state, &mut rng, TICK_DT);
        let input = brain.think(&state, &mut rng, TICK_DT);
        // Enemy is straight down +Z
        assert!(input.yaw.abs() <= brain.aim_jitter + 1e-6);
        assert!(input.pressed(KEY_A) || input.pressed(KEY_D));
    }

    #[test]
    fn test_low_health_retreats() {
        let (mut state, mut brain, enemy, mut rng) = standoff(GameMap::new());
        brain.think(&state, &mut rng, TICK_DT);
        brain.think(&state, &mut rng, TICK_DT);
        state.players[brain.player_id].health = 20;
        brain.think(&state, &mut rng, TICK_DT);
        assert_eq!(brain.state, BotState::Retreat { threat: enemy });
    }

    #[test]
    fn test_dead_bot_resets() {
        let (mut state, mut brain, enemy, mut rng) = standoff(GameMap::new());
        brain.think(&state, &mut rng, TICK_DT);
        state.kill(brain.player_id, enemy);
        let input = brain.think(&state, &mut rng, TICK_DT);
        assert_eq!(input, InputState::default());
        assert_eq!(brain.state, BotState::Patrol);
    }

    #[test]
    fn test_pistol_bot_seeks_pickup() {
        let mut map = GameMap::new();
        map.add_pickup(WeaponType::Rifle, Vec3::new(5.0, 0.0, 0.0));
        let mut rng = StdRng::seed_from_u64(3);
        let mut state = GameState::new(map, Some(3));
        let bot = state.add_player("Bot_1", true, PlayerClass::Support).unwrap();
        state.players[bot].position = Vec3::ZERO;
        let mut brain = BotBrain::new(bot, Vec3::ZERO, &mut rng);

        brain.think(&state, &mut rng, TICK_DT);
        assert_eq!(
            brain.state,
            BotState::PickupWeapon {
                site: Vec3::new(5.0, 0.0, 0.0)
            }
        );

        // No waypoints: walks straight at it
        let input = brain.think(&state, &mut rng, TICK_DT);
        assert!(input.pressed(KEY_W));
        assert!((input.yaw - FRAC_PI_2).abs() < 1e-5);

        state.players[bot].weapon = WeaponType::Rifle;
        state.players[bot].ammo = 30;
        brain.think(&state, &mut rng, TICK_DT);
        assert_eq!(brain.state, BotState::Patrol);
    }

    #[test]
    fn test_follows_waypoints() {
        let mut map = GameMap::new();
        let a = map.add_waypoint(Vec3::new(0.0, 0.0, 0.0));
        let b = map.add_waypoint(Vec3::new(20.0, 0.0, 0.0));
        map.link(a, b);
        let mut rng = StdRng::seed_from_u64(5);
        let mut state = GameState::new(map, Some(5));
        let bot = state.add_player("Bot_1", true, PlayerClass::Assault).unwrap();
        state.players[bot].position = Vec3::ZERO;
        let mut brain = BotBrain::new(bot, Vec3::ZERO, &mut rng);
        brain.path = vec![a, b];

        // Standing on `a` advances the cursor without moving
        brain.think(&state, &mut rng, TICK_DT);
        assert_eq!(brain.path_cursor, 1);

        let input = brain.think(&state, &mut rng, TICK_DT);
        assert!(input.pressed(KEY_W));
        assert!((input.yaw - FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_stuck_bot_replans_from_nearest_waypoint() {
        let mut map = GameMap::new();
        let near = map.add_waypoint(Vec3::new(10.0, 0.0, 0.0));
        let mid = map.add_waypoint(Vec3::new(20.0, 0.0, 0.0));
        let far = map.add_waypoint(Vec3::new(30.0, 0.0, 0.0));
        map.link(near, mid);
        map.link(mid, far);
        let (mut state, mut brain, enemy, mut rng) = standoff(map);
        state.players[enemy].position = Vec3::new(0.0, 0.0, 200.0);
        brain.path = vec![far, mid];

        // Never moves: the old route survives until the re-plan threshold
        let ticks_before = (STUCK_REPATH_AFTER / TICK_DT) as usize;
        for _ in 0..ticks_before {
            brain.think(&state, &mut rng, TICK_DT);
        }
        assert_eq!(brain.path, vec![far, mid]);

        for _ in 0..4 {
            brain.think(&state, &mut rng, TICK_DT);
        }
        assert_eq!(brain.state, BotState::Patrol);
        assert_eq!(brain.path.first(), Some(&near));
        let goal = *brain.path.last().unwrap();
        assert_eq!(brain.path, find_path(state.map.waypoints(), near, goal));
        assert!(brain.stuck_timer < STUCK_REPATH_AFTER);
    }

    #[test]
    fn test_retreat_ends_once_healed() {
        let (mut state, mut brain, enemy, mut rng) = standoff(GameMap::new());
        brain.think(&state, &mut rng, TICK_DT);
        brain.think(&state, &mut rng, TICK_DT);
        state.players[brain.player_id].health = 20;
        brain.think(&state, &mut rng, TICK_DT);
        assert_eq!(brain.state, BotState::Retreat { threat: enemy });

        brain.think(&state, &mut rng, TICK_DT);
        assert_eq!(brain.state, BotState::Retreat { threat: enemy });

        state.players[brain.player_id].health = RECOVERED_HEALTH + 10;
        brain.think(&state, &mut rng, TICK_DT);
        assert_eq!(brain.state, BotState::Patrol);
    }

    #[test]
    fn test_retreat_times_out() {
        let (mut state, mut brain, enemy, mut rng) = standoff(GameMap::new());
        brain.think(&state, &mut rng, TICK_DT);
        brain.think(&state, &mut rng, TICK_DT);
        state.players[brain.player_id].health = 20;
        brain.think(&state, &mut rng, TICK_DT);
        assert_eq!(brain.state, BotState::Retreat { threat: enemy });

        let mut ticks = 0;
        while brain.state == (BotState::Retreat { threat: enemy }) && ticks < 6 * 64 {
            brain.think(&state, &mut rng, TICK_DT);
            ticks += 1;
        }
        // Still hurt, so only the timer can have ended it
        assert_eq!(brain.state, BotState::Patrol);
        assert!(ticks as f32 * TICK_DT >= 5.0 - 2.0 * TICK_DT, "left after {} ticks", ticks);
    }

    #[test]
    fn test_pickup_run_aborts_for_visible_enemy() {
        let mut map = GameMap::new();
        map.add_pickup(WeaponType::Rifle, Vec3::new(5.0, 0.0, 0.0));
        let mut rng = StdRng::seed_from_u64(8);
        let mut state = GameState::new(map, Some(8));
        let bot = state.add_player("Bot_1", true, PlayerClass::Support).unwrap();
        state.players[bot].position = Vec3::ZERO;
        let mut brain = BotBrain::new(bot, Vec3::ZERO, &mut rng);

        brain.think(&state, &mut rng, TICK_DT);
        assert!(matches!(brain.state, BotState::PickupWeapon { .. }));

        let enemy = state.add_player("Bot_2", true, PlayerClass::Assault).unwrap();
        state.players[enemy].position = Vec3::new(0.0, 0.0, 10.0);
        brain.think(&state, &mut rng, TICK_DT);
        assert!(matches!(brain.state, BotState::Attack { target, .. } if target == enemy));
        assert!(brain.path.is_empty());
    }

    #[test]
    fn test_chase_drops_dead_target() {
        let (mut state, mut brain, enemy, mut rng) = standoff(GameMap::new());
        brain.think(&state, &mut rng, TICK_DT);
        assert_eq!(brain.state, BotState::Chase { target: enemy });

        state.kill(enemy, brain.player_id);
        brain.think(&state, &mut rng, TICK_DT);
        assert_eq!(brain.state, BotState::Patrol);
        assert!(brain.path.is_empty());
    }

    #[test]
    fn test_chase_drops_disconnected_target() {
        let (mut state, mut brain, enemy, mut rng) = standoff(GameMap::new());
        brain.think(&state, &mut rng, TICK_DT);
        assert_eq!(brain.state, BotState::Chase { target: enemy });

        state.remove_player(enemy);
        brain.think(&state, &mut rng, TICK_DT);
        assert_eq!(brain.state, BotState::Patrol);
    }

    #[test]
    fn test_stuck_bot_jumps() {
        let (mut state, mut brain, enemy, mut rng) = standoff(GameMap::new());
        state.players[enemy].position = Vec3::new(0.0, 0.0, 200.0);

        let jumped = (0..64).any(|_| brain.think(&state, &mut rng, TICK_DT).pressed(KEY_JUMP));
        assert!(jumped);
    }
}
