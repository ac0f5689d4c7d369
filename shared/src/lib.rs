pub mod defs;
pub mod math;
pub mod protocol;

pub use defs::{Ability, PlayerClass, VehicleKind, VehicleType, WeaponType};
pub use math::{Aabb, Vec3};

pub const MAX_PLAYERS: usize = 128;
pub const TICK_RATE: u32 = 64;
pub const TICK_DT: f32 = 1.0 / TICK_RATE as f32;
pub const DEFAULT_PORT: u16 = 27015;
pub const DEFAULT_BOTS: usize = 100;
/// Slots kept free for humans regardless of the requested bot count.
pub const RESERVED_HUMAN_SLOTS: usize = 4;

pub const GRAVITY: f32 = 20.0;
pub const PLAYER_SPEED: f32 = 7.0;
pub const JUMP_VELOCITY: f32 = 8.0;
/// Fraction of the wish speed gained per 1/60 s while airborne.
pub const AIR_CONTROL: f32 = 0.05;
pub const PLAYER_HEIGHT: f32 = 1.8;
pub const PLAYER_RADIUS: f32 = 0.4;
pub const EYE_HEIGHT: f32 = 1.6;
pub const MAX_HEALTH: i32 = 100;
pub const RESPAWN_TIME: f32 = 3.0;

pub const WEAPON_RESPAWN: f32 = 15.0;
pub const PICKUP_RADIUS: f32 = 1.5;

pub const MAX_VEHICLES: usize = 20;
pub const VEHICLE_ENTER_RANGE: f32 = 3.5;
pub const VEHICLE_RESPAWN: f32 = 30.0;

pub const SESSION_TIMEOUT: f32 = 10.0;
pub const KILL_FEED_DURATION: f32 = 5.0;

/// Half extent of the playable square for players and ground vehicles.
pub const WORLD_BOUND: f32 = 54.5;
pub const AIR_BOUND: f32 = 120.0;
pub const MAX_ALTITUDE: f32 = 80.0;

pub const FLAG_TOUCH_RADIUS: f32 = 2.0;
pub const FLAG_RETURN_TIME: f32 = 20.0;

pub const MAX_HAZARDS: usize = 4;

pub const KEY_W: u16 = 0x01;
pub const KEY_A: u16 = 0x02;
pub const KEY_S: u16 = 0x04;
pub const KEY_D: u16 = 0x08;
pub const KEY_JUMP: u16 = 0x10;
pub const KEY_SHOOT: u16 = 0x20;
pub const KEY_RELOAD: u16 = 0x40;
pub const KEY_USE: u16 = 0x80;
pub const KEY_ABILITY: u16 = 0x100;
pub const KEY_UP: u16 = 0x200;
pub const KEY_DOWN: u16 = 0x400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LifeState {
    #[default]
    Disconnected = 0,
    Alive = 1,
    Dead = 2,
    Spectating = 3,
}

/// The latest control state for a player, from a client or a bot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputState {
    pub keys: u16,
    pub yaw: f32,
    pub pitch: f32,
}

impl InputState {
    pub fn new(keys: u16, yaw: f32, pitch: f32) -> Self {
        Self { keys, yaw, pitch }
    }

    pub fn pressed(&self, key: u16) -> bool {
        self.keys & key != 0
    }

    pub fn press(&mut self, key: u16) {
        self.keys |= key;
    }

    pub fn release(&mut self, key: u16) {
        self.keys &= !key;
    }
}
