//! On-foot player movement, shared by humans and bots.

use crate::game::{GameState, Player};
use crate::map::Block;
use crate::spatial::{is_on_ground, resolve_collision};
use shared::{
    InputState, Vec3, AIR_CONTROL, GRAVITY, JUMP_VELOCITY, KEY_A, KEY_D, KEY_JUMP, KEY_S, KEY_W,
    PLAYER_HEIGHT, PLAYER_RADIUS, PLAYER_SPEED,
};
use std::f32::consts::PI;

pub const MAX_PITCH: f32 = PI * 0.49;
/// Resolution offsets smaller than this do not cancel velocity.
const BLOCKED_EPSILON: f32 = 0.001;

/// Normalised horizontal direction requested by the movement keys.
pub fn wish_direction(input: &InputState) -> Vec3 {
    let mut forward = 0.0;
    let mut side = 0.0;
    if input.pressed(KEY_W) {
        forward += 1.0;
    }
    if input.pressed(KEY_S) {
        forward -= 1.0;
    }
    if input.pressed(KEY_A) {
        side -= 1.0;
    }
    if input.pressed(KEY_D) {
        side += 1.0;
    }

    let wish = Vec3::forward(input.yaw) * forward + Vec3::right(input.yaw) * side;
    if wish.length_sq() > 0.01 {
        wish.normalize()
    } else {
        wish
    }
}

/// Advances one alive player by `dt`: look direction, walking or air control,
/// jump, gravity, then collision against the static blocks.
pub fn tick_player(player: &mut Player, input: &InputState, blocks: &[Block], dt: f32) {
    if !player.is_alive() {
        return;
    }

    player.yaw = input.yaw;
    player.pitch = input.pitch.clamp(-MAX_PITCH, MAX_PITCH);

    let speed = PLAYER_SPEED * player.class.def().speed_mult;
    let wish = wish_direction(input) * speed;

    if is_on_ground(blocks, player.position, PLAYER_RADIUS) {
        player.velocity.x = wish.x;
        player.velocity.z = wish.z;
        if input.pressed(KEY_JUMP) {
            player.velocity.y = JUMP_VELOCITY;
        }
    } else {
        let control = AIR_CONTROL * dt * 60.0;
        player.velocity.x += wish.x * control;
        player.velocity.z += wish.z * control;
    }

    player.velocity.y -= GRAVITY * dt;

    let target = player.position + player.velocity * dt;
    let resolved = resolve_collision(blocks, target, PLAYER_RADIUS, PLAYER_HEIGHT);

    if (resolved.x - target.x).abs() > BLOCKED_EPSILON {
        player.velocity.x = 0.0;
    }
    if (resolved.y - target.y).abs() > BLOCKED_EPSILON {
        player.velocity.y = 0.0;
    }
    if (resolved.z - target.z).abs() > BLOCKED_EPSILON {
        player.velocity.z = 0.0;
    }
    player.position = resolved;
}

impl GameState {
    pub fn apply_input(&mut self, id: usize, input: &InputState, dt: f32) {
        tick_player(&mut self.players[id], input, self.map.blocks(), dt);
    }
}
