//! Spatial queries over the static level: ground tests, box push-out and ray casts.
//!
//! Everything here is a pure function of its arguments. Dynamic bodies are passed
//! in as `(index, Aabb)` pairs so the same ray code serves players and vehicles.

use crate::map::Block;
use shared::{Aabb, Vec3, WORLD_BOUND};

/// Height of the slab tested under the feet for ground contact.
const FEET_PROBE: f32 = 0.05;
const RESOLVE_ITERATIONS: usize = 4;
/// Horizontal overlap a block needs under the feet to count as footing.
const FOOTING_OVERLAP: f32 = 1e-3;

/// Ground contact against the ground plane or the top of a block. Touching a
/// block only along a side face does not count.
pub fn is_on_ground(blocks: &[Block], feet: Vec3, radius: f32) -> bool {
    let probe = Aabb::new(
        Vec3::new(feet.x - radius, feet.y - FEET_PROBE, feet.z - radius),
        Vec3::new(feet.x + radius, feet.y + FEET_PROBE, feet.z + radius),
    );
    feet.y <= FEET_PROBE || blocks.iter().any(|b| supports(&probe, &b.bounds))
}

fn supports(probe: &Aabb, solid: &Aabb) -> bool {
    let overlap_x = probe.max.x.min(solid.max.x) - probe.min.x.max(solid.min.x);
    let overlap_z = probe.max.z.min(solid.max.z) - probe.min.z.max(solid.min.z);
    probe.intersects(solid) && overlap_x > FOOTING_OVERLAP && overlap_z > FOOTING_OVERLAP
}

/// Pushes an upright box standing at `feet` out of every overlapping block along
/// the axis of least penetration, then clamps it to the playable area.
pub fn resolve_collision(blocks: &[Block], feet: Vec3, radius: f32, height: f32) -> Vec3 {
    let mut resolved = feet;

    for _ in 0..RESOLVE_ITERATIONS {
        let mut moved = false;

        for block in blocks {
            let body = Aabb::upright(resolved, radius, height);
            if !body.intersects(&block.bounds) {
                continue;
            }
            resolved += separation(&body, &block.bounds);
            moved = true;
        }

        if !moved {
            break;
        }
    }

    resolved.x = resolved.x.clamp(-WORLD_BOUND, WORLD_BOUND);
    resolved.z = resolved.z.clamp(-WORLD_BOUND, WORLD_BOUND);
    resolved.y = resolved.y.max(0.0);
    resolved
}

/// Smallest single-axis translation that moves `body` out of `solid`.
fn separation(body: &Aabb, solid: &Aabb) -> Vec3 {
    let push = |lo_overlap: f32, hi_overlap: f32| {
        if lo_overlap < hi_overlap {
            -lo_overlap
        } else {
            hi_overlap
        }
    };

    let x = (body.max.x - solid.min.x, solid.max.x - body.min.x);
    let y = (body.max.y - solid.min.y, solid.max.y - body.min.y);
    let z = (body.max.z - solid.min.z, solid.max.z - body.min.z);

    let min_x = x.0.min(x.1);
    let min_y = y.0.min(y.1);
    let min_z = z.0.min(z.1);

    if min_x < min_y && min_x < min_z {
        Vec3::new(push(x.0, x.1), 0.0, 0.0)
    } else if min_y < min_z {
        Vec3::new(0.0, push(y.0, y.1), 0.0)
    } else {
        Vec3::new(0.0, 0.0, push(z.0, z.1))
    }
}

/// Distance to the nearest block along `dir`, if any lies within `max_dist`.
pub fn raycast_blocks(blocks: &[Block], origin: Vec3, dir: Vec3, max_dist: f32) -> Option<f32> {
    blocks
        .iter()
        .filter_map(|b| b.bounds.raycast(origin, dir))
        .filter(|t| *t < max_dist)
        .min_by(|a, b| a.total_cmp(b))
}

/// Nearest box hit along `dir` within `max_dist`. The first box wins ties.
pub fn raycast_boxes<I>(boxes: I, origin: Vec3, dir: Vec3, max_dist: f32) -> Option<(usize, f32)>
where
    I: IntoIterator<Item = (usize, Aabb)>,
{
    let mut best: Option<(usize, f32)> = None;
    for (index, bounds) in boxes {
        if let Some(t) = bounds.raycast(origin, dir) {
            let closest = best.map_or(max_dist, |(_, d)| d);
            if t < closest {
                best = Some((index, t));
            }
        }
    }
    best
}

/// True when no block interrupts the segment `from -> to`. A block within
/// `tolerance` of the far end counts as behind the target.
pub fn line_of_sight(blocks: &[Block], from: Vec3, to: Vec3, tolerance: f32) -> bool {
    let delta = to - from;
    let dist = delta.length();
    if dist < 0.1 {
        return true;
    }
    let dir = delta * (1.0 / dist);
    match raycast_blocks(blocks, from, dir, dist) {
        Some(hit) => hit > dist - tolerance,
        None => true,
    }
}
