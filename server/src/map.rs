//! Static level data: collidable blocks, spawn tables, pickup and vehicle sites,
//! flag bases and the bot waypoint graph.
//!
//! The simulation only ever reads a `GameMap`. `GameMap::arctic()` builds the
//! shipped layout; tests assemble small maps through the `add_*` builders.

use crate::spatial;
use shared::{Aabb, Vec3, VehicleType, WeaponType};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub bounds: Aabb,
    /// Walkable surface (floors, roofs, platforms) as opposed to a wall or prop.
    pub is_floor: bool,
}

impl Block {
    pub fn solid(min: Vec3, max: Vec3) -> Self {
        Self {
            bounds: Aabb::new(min, max),
            is_floor: false,
        }
    }

    pub fn floor(min: Vec3, max: Vec3) -> Self {
        Self {
            bounds: Aabb::new(min, max),
            is_floor: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPoint {
    pub position: Vec3,
    pub yaw: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickupSite {
    pub kind: WeaponType,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleSpawn {
    pub kind: VehicleType,
    pub position: Vec3,
    pub yaw: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub position: Vec3,
    pub neighbors: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct GameMap {
    blocks: Vec<Block>,
    spawns: Vec<SpawnPoint>,
    team_spawns: [Vec<SpawnPoint>; 2],
    pickup_sites: Vec<PickupSite>,
    vehicle_spawns: Vec<VehicleSpawn>,
    flag_bases: [Vec3; 2],
    waypoints: Vec<Waypoint>,
}

impl GameMap {
    /// An empty map: no blocks, only the implicit ground plane at y = 0.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn spawns(&self) -> &[SpawnPoint] {
        &self.spawns
    }

    /// Spawn points reserved for `team`, falling back to the shared list.
    pub fn team_spawns(&self, team: u8) -> &[SpawnPoint] {
        match self.team_spawns.get(team as usize) {
            Some(list) if !list.is_empty() => list,
            _ => &self.spawns,
        }
    }

    pub fn pickup_sites(&self) -> &[PickupSite] {
        &self.pickup_sites
    }

    pub fn vehicle_spawns(&self) -> &[VehicleSpawn] {
        &self.vehicle_spawns
    }

    pub fn flag_base(&self, team: u8) -> Vec3 {
        self.flag_bases[(team & 1) as usize]
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn nearest_waypoint(&self, pos: Vec3) -> Option<usize> {
        self.waypoints
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (a.position - pos)
                    .length_sq()
                    .total_cmp(&(b.position - pos).length_sq())
            })
            .map(|(i, _)| i)
    }

    /// Probes forward from `feet` at knee-to-chest heights. On a hit, returns
    /// the height above `feet` at which the obstacle ends (3.0 when it is too
    /// tall to measure).
    pub fn obstacle_ahead(&self, feet: Vec3, yaw: f32, check_dist: f32) -> Option<f32> {
        const MAX_PROBE: f32 = 3.0;
        let forward = Vec3::forward(yaw);

        for probe_height in [0.3f32, 0.6, 0.9, 1.2] {
            let origin = feet + Vec3::new(0.0, probe_height, 0.0);
            let Some(hit) = spatial::raycast_blocks(&self.blocks, origin, forward, check_dist) else {
                continue;
            };

            // Step back off the face and climb until the probe box is clear
            let column = origin + forward * (hit - 0.1);
            let mut height = probe_height;
            while height <= MAX_PROBE {
                let center = Vec3::new(column.x, feet.y + height, column.z);
                let probe = Aabb::new(
                    center - Vec3::new(0.1, 0.05, 0.1),
                    center + Vec3::new(0.1, 0.05, 0.1),
                );
                if !self.blocks.iter().any(|b| probe.intersects(&b.bounds)) {
                    return Some(height);
                }
                height += 0.2;
            }
            return Some(MAX_PROBE);
        }
        None
    }

    pub fn add_block(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Wall between two corners on the ground plan, at least 0.2 thick.
    pub fn add_wall(&mut self, x1: f32, z1: f32, x2: f32, z2: f32, height: f32, base_y: f32) {
        let (min_x, max_x) = (x1.min(x2), x1.max(x2));
        let (min_z, max_z) = (z1.min(z2), z1.max(z2));
        self.add_block(Block::solid(
            Vec3::new(min_x, base_y, min_z),
            Vec3::new(max_x.max(min_x + 0.2), base_y + height, max_z.max(min_z + 0.2)),
        ));
    }

    pub fn add_spawn(&mut self, team: Option<u8>, position: Vec3, yaw: f32) {
        let spawn = SpawnPoint { position, yaw };
        self.spawns.push(spawn);
        if let Some(list) = team.and_then(|t| self.team_spawns.get_mut(t as usize)) {
            list.push(spawn);
        }
    }

    pub fn add_pickup(&mut self, kind: WeaponType, position: Vec3) {
        self.pickup_sites.push(PickupSite { kind, position });
    }

    pub fn add_vehicle_spawn(&mut self, kind: VehicleType, position: Vec3, yaw: f32) {
        self.vehicle_spawns.push(VehicleSpawn {
            kind,
            position,
            yaw,
        });
    }

    pub fn set_flag_base(&mut self, team: u8, position: Vec3) {
        self.flag_bases[(team & 1) as usize] = position;
    }

    pub fn add_waypoint(&mut self, position: Vec3) -> usize {
        self.waypoints.push(Waypoint {
            position,
            neighbors: Vec::new(),
        });
        self.waypoints.len() - 1
    }

    /// Undirected edge between two waypoints.
    pub fn link(&mut self, a: usize, b: usize) {
        self.waypoints[a].neighbors.push(b);
        self.waypoints[b].neighbors.push(a);
    }

    fn add_building(&mut self, x: f32, z: f32, w: f32, d: f32, h: f32, stories: u32) {
        const DOOR_W: f32 = 1.5;
        const DOOR_H: f32 = 2.2;
        let story_h = h / stories as f32;

        for story in 0..stories {
            let y = story as f32 * story_h;
            self.add_block(Block::floor(
                Vec3::new(x, y, z),
                Vec3::new(x + w, y + 0.1, z + d),
            ));

            // Front wall, doorway on the ground floor
            if story == 0 {
                let door = x + w * 0.35;
                self.add_wall(x, z, door, z, story_h, y);
                self.add_wall(door + DOOR_W, z, x + w, z, story_h, y);
                self.add_wall(door, z, door + DOOR_W, z, story_h - DOOR_H, y + DOOR_H);
            } else {
                self.add_wall(x, z, x + w, z, story_h, y);
            }

            self.add_wall(x, z + d, x + w, z + d, story_h, y);
            self.add_wall(x, z, x, z + d, story_h, y);

            // Side wall, opening towards the corridors on the ground floor
            if story == 0 {
                let gap = z + d * 0.3;
                self.add_wall(x + w, z, x + w, gap, story_h, y);
                self.add_wall(x + w, gap + DOOR_W, x + w, z + d, story_h, y);
                self.add_wall(x + w, gap, x + w, gap + DOOR_W, story_h - DOOR_H, y + DOOR_H);
            } else {
                self.add_wall(x + w, z, x + w, z + d, story_h, y);
            }
        }

        let top = stories as f32 * story_h;
        self.add_block(Block::floor(
            Vec3::new(x, top - 0.1, z),
            Vec3::new(x + w, top, z + d),
        ));
    }

    fn add_stairs(&mut self, min_x: f32, min_z: f32, max_x: f32, max_z: f32, steps: u32, rise: f32, tread: f32) {
        for i in 0..steps {
            let y = i as f32 * rise;
            self.add_block(Block::solid(
                Vec3::new(min_x, y, min_z),
                Vec3::new(max_x, y + tread, max_z),
            ));
        }
    }

    fn add_tower(&mut self, x: f32, z: f32, open_east: bool) {
        for (dx, dz) in [(0.0, 0.0), (4.5, 0.0), (0.0, 4.5), (4.5, 4.5)] {
            self.add_block(Block::solid(
                Vec3::new(x + dx, 0.0, z + dz),
                Vec3::new(x + dx + 0.5, 5.0, z + dz + 0.5),
            ));
        }
        self.add_block(Block::floor(Vec3::new(x, 5.0, z), Vec3::new(x + 5.0, 5.2, z + 5.0)));

        // Railings on three sides; the ladder side stays open
        self.add_block(Block::solid(Vec3::new(x, 5.2, z), Vec3::new(x + 5.0, 6.0, z + 0.15)));
        self.add_block(Block::solid(Vec3::new(x, 5.2, z + 4.85), Vec3::new(x + 5.0, 6.0, z + 5.0)));
        if open_east {
            self.add_block(Block::solid(Vec3::new(x, 5.2, z), Vec3::new(x + 0.15, 6.0, z + 5.0)));
            self.add_stairs(x + 4.6, z + 2.0, x + 5.4, z + 3.0, 10, 0.5, 0.3);
        } else {
            self.add_block(Block::solid(Vec3::new(x + 4.85, 5.2, z), Vec3::new(x + 5.0, 6.0, z + 5.0)));
            self.add_stairs(x - 0.4, z + 2.0, x + 0.4, z + 3.0, 10, 0.5, 0.3);
        }
    }

    fn add_corridor(&mut self, min_x: f32, min_z: f32, max_x: f32, max_z: f32, along_x: bool) {
        self.add_block(Block::floor(Vec3::new(min_x, 0.0, min_z), Vec3::new(max_x, 0.1, max_z)));
        if along_x {
            self.add_wall(min_x, min_z, max_x, min_z, 3.0, 0.0);
            self.add_wall(min_x, max_z, max_x, max_z, 3.0, 0.0);
        } else {
            self.add_wall(min_x, min_z, min_x, max_z, 3.0, 0.0);
            self.add_wall(max_x, min_z, max_x, max_z, 3.0, 0.0);
        }
        self.add_block(Block::floor(Vec3::new(min_x, 2.9, min_z), Vec3::new(max_x, 3.0, max_z)));
    }

    /// The arctic outpost: four buildings joined by covered corridors around a
    /// central plaza, two sniper towers, and a walled snow field.
    pub fn arctic() -> Self {
        let mut map = GameMap::new();

        map.add_block(Block::floor(Vec3::new(-60.0, -0.5, -60.0), Vec3::new(60.0, 0.0, 60.0)));

        map.add_building(-25.0, -25.0, 12.0, 10.0, 6.0, 2);
        map.add_stairs(-24.5, -24.5, -23.0, -23.5, 6, 0.5, 0.5);

        map.add_building(10.0, -25.0, 14.0, 10.0, 3.5, 1);
        map.add_block(Block::solid(Vec3::new(12.0, 0.0, -23.0), Vec3::new(13.5, 1.2, -22.0)));
        map.add_block(Block::solid(Vec3::new(18.0, 0.0, -20.0), Vec3::new(19.5, 1.0, -19.0)));

        map.add_building(-25.0, 15.0, 12.0, 10.0, 3.5, 1);
        map.add_block(Block::solid(Vec3::new(-22.0, 0.0, 18.0), Vec3::new(-20.5, 1.2, 19.5)));

        map.add_building(10.0, 15.0, 14.0, 10.0, 6.0, 2);
        map.add_stairs(22.5, 16.0, 24.0, 17.0, 6, 0.5, 0.5);

        map.add_corridor(-13.0, -22.0, 10.0, -18.0, true);
        map.add_corridor(-13.0, 18.0, 10.0, 22.0, true);
        map.add_corridor(-3.0, -18.0, 3.0, 18.0, false);

        // Plaza and its cover
        map.add_block(Block::floor(Vec3::new(-8.0, 0.0, -5.0), Vec3::new(8.0, 0.05, 5.0)));
        map.add_block(Block::solid(Vec3::new(-6.0, 0.0, -1.0), Vec3::new(-4.5, 1.5, 1.0)));
        map.add_block(Block::solid(Vec3::new(4.5, 0.0, -1.0), Vec3::new(6.0, 1.5, 1.0)));
        map.add_block(Block::solid(Vec3::new(-1.0, 0.0, 3.0), Vec3::new(1.0, 1.0, 4.5)));
        map.add_block(Block::solid(Vec3::new(-1.0, 0.0, -4.5), Vec3::new(1.0, 1.0, -3.0)));

        map.add_tower(-35.0, -35.0, true);
        map.add_tower(30.0, 30.0, false);

        let bound = 55.0;
        map.add_wall(-bound, -bound, bound, -bound, 4.0, 0.0);
        map.add_wall(-bound, bound, bound, bound, 4.0, 0.0);
        map.add_wall(-bound, -bound, -bound, bound, 4.0, 0.0);
        map.add_wall(bound, -bound, bound, bound, 4.0, 0.0);

        // Snow mounds, barrels and loose crates
        for ((x0, x1), (z0, h, z1)) in [
            ((-40.0, -37.0), (5.0, 0.8, 8.0)),
            ((35.0, 38.0), (-10.0, 0.7, -7.0)),
            ((-15.0, -12.0), (35.0, 0.6, 38.0)),
            ((15.0, 18.0), (-35.0, 0.9, -32.0)),
        ] {
            map.add_block(Block::solid(Vec3::new(x0, 0.0, z0), Vec3::new(x1, h, z1)));
        }
        map.add_block(Block::solid(Vec3::new(-30.0, 0.0, 0.0), Vec3::new(-29.0, 1.2, 1.0)));
        map.add_block(Block::solid(Vec3::new(-29.5, 0.0, 1.2), Vec3::new(-28.5, 1.2, 2.2)));
        map.add_block(Block::solid(Vec3::new(28.0, 0.0, -2.0), Vec3::new(29.0, 1.2, -1.0)));
        map.add_block(Block::solid(Vec3::new(-28.0, 0.0, -15.0), Vec3::new(-26.5, 1.5, -13.5)));
        map.add_block(Block::solid(Vec3::new(25.0, 0.0, 12.0), Vec3::new(26.5, 1.5, 13.5)));

        // Team 0 holds the north half, team 1 the south
        map.add_spawn(Some(0), Vec3::new(-20.0, 0.1, -20.0), 0.8);
        map.add_spawn(Some(0), Vec3::new(-20.0, 0.1, -15.0), 0.5);
        map.add_spawn(Some(0), Vec3::new(15.0, 0.1, -20.0), -0.8);
        map.add_spawn(Some(0), Vec3::new(20.0, 0.1, -20.0), -0.5);
        map.add_spawn(Some(1), Vec3::new(-20.0, 0.1, 20.0), 2.3);
        map.add_spawn(Some(1), Vec3::new(-20.0, 0.1, 17.0), 2.0);
        map.add_spawn(Some(1), Vec3::new(15.0, 0.1, 20.0), -2.3);
        map.add_spawn(Some(1), Vec3::new(20.0, 0.1, 20.0), -2.0);
        map.add_spawn(None, Vec3::new(0.0, 0.1, 0.0), 0.0);
        map.add_spawn(None, Vec3::new(5.0, 0.1, -5.0), 1.5);

        map.add_pickup(WeaponType::Shotgun, Vec3::new(0.0, 0.5, 0.0));
        map.add_pickup(WeaponType::Rifle, Vec3::new(-20.0, 0.5, -20.0));
        map.add_pickup(WeaponType::Rifle, Vec3::new(15.0, 0.5, 20.0));
        map.add_pickup(WeaponType::Sniper, Vec3::new(-32.5, 5.7, -32.5));
        map.add_pickup(WeaponType::Sniper, Vec3::new(32.5, 5.7, 32.5));
        map.add_pickup(WeaponType::Shotgun, Vec3::new(-5.0, 0.5, 20.0));
        map.add_pickup(WeaponType::Rifle, Vec3::new(5.0, 0.5, -20.0));
        map.add_pickup(WeaponType::Shotgun, Vec3::new(15.0, 0.5, -20.0));

        map.set_flag_base(0, Vec3::new(0.0, 0.1, -45.0));
        map.set_flag_base(1, Vec3::new(0.0, 0.1, 45.0));

        map.add_vehicle_spawn(VehicleType::Jeep, Vec3::new(-10.0, 0.1, -40.0), 0.0);
        map.add_vehicle_spawn(VehicleType::Tank, Vec3::new(10.0, 0.1, -42.0), 0.0);
        map.add_vehicle_spawn(VehicleType::Jeep, Vec3::new(-10.0, 0.1, 40.0), std::f32::consts::PI);
        map.add_vehicle_spawn(VehicleType::Tank, Vec3::new(10.0, 0.1, 42.0), std::f32::consts::PI);
        map.add_vehicle_spawn(VehicleType::Helicopter, Vec3::new(-45.0, 0.1, -5.0), 0.0);
        map.add_vehicle_spawn(VehicleType::Plane, Vec3::new(45.0, 0.1, 5.0), std::f32::consts::PI);

        map.build_arctic_waypoints();
        map
    }

    fn build_arctic_waypoints(&mut self) {
        let ground = |x: f32, z: f32| Vec3::new(x, 0.1, z);

        let mid = self.add_waypoint(ground(0.0, 0.0));
        let mid_n = self.add_waypoint(ground(0.0, -10.0));
        let mid_s = self.add_waypoint(ground(0.0, 10.0));
        let mid_w = self.add_waypoint(ground(-8.0, 0.0));
        let mid_e = self.add_waypoint(ground(8.0, 0.0));

        let corr_na = self.add_waypoint(ground(-10.0, -20.0));
        let corr_nb = self.add_waypoint(ground(8.0, -20.0));
        let corr_nm = self.add_waypoint(ground(0.0, -20.0));
        let corr_sc = self.add_waypoint(ground(-10.0, 20.0));
        let corr_sd = self.add_waypoint(ground(8.0, 20.0));
        let corr_sm = self.add_waypoint(ground(0.0, 20.0));

        let bld_a = self.add_waypoint(ground(-19.0, -20.0));
        let bld_b = self.add_waypoint(ground(17.0, -20.0));
        let bld_c = self.add_waypoint(ground(-19.0, 20.0));
        let bld_d = self.add_waypoint(ground(17.0, 20.0));

        let tower_a = self.add_waypoint(Vec3::new(-32.5, 5.3, -32.5));
        let tower_a_base = self.add_waypoint(ground(-30.0, -32.5));
        let tower_b = self.add_waypoint(Vec3::new(32.5, 5.3, 32.5));
        let tower_b_base = self.add_waypoint(ground(35.0, 32.5));

        let out_nw = self.add_waypoint(ground(-40.0, -30.0));
        let out_ne = self.add_waypoint(ground(40.0, -30.0));
        let out_sw = self.add_waypoint(ground(-40.0, 30.0));
        let out_se = self.add_waypoint(ground(40.0, 30.0));

        let edges = [
            (mid, mid_n),
            (mid, mid_s),
            (mid, mid_w),
            (mid, mid_e),
            (mid_n, corr_nm),
            (mid_s, corr_sm),
            (corr_na, corr_nm),
            (corr_nm, corr_nb),
            (corr_sc, corr_sm),
            (corr_sm, corr_sd),
            (corr_na, bld_a),
            (corr_nb, bld_b),
            (corr_sc, bld_c),
            (corr_sd, bld_d),
            (tower_a_base, tower_a),
            (tower_a_base, out_nw),
            (tower_b_base, tower_b),
            (tower_b_base, out_se),
            (bld_a, out_nw),
            (bld_b, out_ne),
            (bld_c, out_sw),
            (bld_d, out_se),
            (out_nw, mid_w),
            (out_ne, mid_e),
            (out_sw, mid_w),
            (out_se, mid_e),
            (mid_w, corr_na),
            (mid_w, corr_sc),
            (mid_e, corr_nb),
            (mid_e, corr_sd),
        ];
        for (a, b) in edges {
            self.link(a, b);
        }

        // Upper floors, crate tops and stair feet
        let bld_a_upper = self.add_waypoint(Vec3::new(-20.0, 3.1, -20.0));
        let bld_d_upper = self.add_waypoint(Vec3::new(17.0, 3.1, 20.0));
        let crate_w = self.add_waypoint(Vec3::new(-5.25, 1.6, 0.0));
        let crate_e = self.add_waypoint(Vec3::new(5.25, 1.6, 0.0));
        let stairs_a = self.add_waypoint(ground(-23.5, -24.0));
        let stairs_d = self.add_waypoint(ground(23.0, 16.5));

        for (a, b) in [
            (bld_a, bld_a_upper),
            (bld_d, bld_d_upper),
            (mid_w, crate_w),
            (mid_e, crate_e),
            (crate_w, mid),
            (crate_e, mid),
            (bld_a, stairs_a),
            (stairs_a, bld_a_upper),
            (bld_d, stairs_d),
            (stairs_d, bld_d_upper),
        ] {
            self.link(a, b);
        }

        // Outer ring and base approaches
        let nw = self.add_waypoint(ground(-35.0, -15.0));
        let ne = self.add_waypoint(ground(35.0, -15.0));
        let sw = self.add_waypoint(ground(-35.0, 15.0));
        let se = self.add_waypoint(ground(35.0, 15.0));
        let base_n = self.add_waypoint(ground(0.0, -42.0));
        let base_s = self.add_waypoint(ground(0.0, 42.0));

        for (a, b) in [
            (nw, out_nw),
            (nw, mid_w),
            (nw, bld_a),
            (ne, out_ne),
            (ne, mid_e),
            (ne, bld_b),
            (sw, out_sw),
            (sw, mid_w),
            (sw, bld_c),
            (se, out_se),
            (se, mid_e),
            (se, bld_d),
            (tower_a_base, bld_a),
            (tower_b_base, bld_d),
            (base_n, out_nw),
            (base_n, out_ne),
            (base_s, out_sw),
            (base_s, out_se),
        ] {
            self.link(a, b);
        }
    }
}
