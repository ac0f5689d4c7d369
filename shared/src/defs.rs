//! Immutable parameter tables keyed by type tag.
//!
//! Weapons, classes and vehicles differ only in data, so each enum maps to a
//! `'static` definition record instead of carrying behaviour of its own.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum WeaponType {
    None = 0,
    #[default]
    Pistol = 1,
    Shotgun = 2,
    Rifle = 3,
    Sniper = 4,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponDef {
    pub name: &'static str,
    pub damage: i32,
    pub mag_size: i32,
    /// Seconds between shots.
    pub fire_rate: f32,
    /// Maximum jitter in radians, applied independently to yaw and pitch.
    pub spread: f32,
    pub pellets: u32,
    pub range: f32,
}

const WEAPONS: [WeaponDef; 5] = [
    WeaponDef {
        name: "None",
        damage: 0,
        mag_size: 0,
        fire_rate: 0.0,
        spread: 0.0,
        pellets: 0,
        range: 0.0,
    },
    WeaponDef {
        name: "Pistol",
        damage: 25,
        mag_size: 12,
        fire_rate: 0.3,
        spread: 0.015,
        pellets: 1,
        range: 200.0,
    },
    WeaponDef {
        name: "Shotgun",
        damage: 12,
        mag_size: 8,
        fire_rate: 0.8,
        spread: 0.08,
        pellets: 8,
        range: 30.0,
    },
    WeaponDef {
        name: "Rifle",
        damage: 30,
        mag_size: 30,
        fire_rate: 0.1,
        spread: 0.02,
        pellets: 1,
        range: 300.0,
    },
    WeaponDef {
        name: "Sniper",
        damage: 90,
        mag_size: 5,
        fire_rate: 1.2,
        spread: 0.002,
        pellets: 1,
        range: 500.0,
    },
];

impl WeaponType {
    pub fn def(self) -> &'static WeaponDef {
        &WEAPONS[self as usize]
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(WeaponType::None),
            1 => Some(WeaponType::Pistol),
            2 => Some(WeaponType::Shotgun),
            3 => Some(WeaponType::Rifle),
            4 => Some(WeaponType::Sniper),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ability {
    /// Thrown explosive with linear damage falloff.
    FragGrenade,
    /// Restores health to a nearby vehicle.
    Repair,
    /// Heals and refills ammo for the user and nearby teammates.
    Resupply,
    /// Marks enemies in a forward cone as spotted.
    Spot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PlayerClass {
    #[default]
    Assault = 0,
    Engineer = 1,
    Support = 2,
    Recon = 3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassDef {
    pub name: &'static str,
    pub speed_mult: f32,
    pub primary: WeaponType,
    pub ability: Ability,
    pub ability_cooldown: f32,
}

const CLASSES: [ClassDef; 4] = [
    ClassDef {
        name: "Assault",
        speed_mult: 1.0,
        primary: WeaponType::Rifle,
        ability: Ability::FragGrenade,
        ability_cooldown: 12.0,
    },
    ClassDef {
        name: "Engineer",
        speed_mult: 0.95,
        primary: WeaponType::Shotgun,
        ability: Ability::Repair,
        ability_cooldown: 15.0,
    },
    ClassDef {
        name: "Support",
        speed_mult: 0.9,
        primary: WeaponType::Pistol,
        ability: Ability::Resupply,
        ability_cooldown: 20.0,
    },
    ClassDef {
        name: "Recon",
        speed_mult: 1.1,
        primary: WeaponType::Sniper,
        ability: Ability::Spot,
        ability_cooldown: 10.0,
    },
];

impl PlayerClass {
    pub const ALL: [PlayerClass; 4] = [
        PlayerClass::Assault,
        PlayerClass::Engineer,
        PlayerClass::Support,
        PlayerClass::Recon,
    ];

    pub fn def(self) -> &'static ClassDef {
        &CLASSES[self as usize]
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        Self::ALL.get(v as usize).copied()
    }
}

/// Control scheme a vehicle uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleKind {
    Ground,
    Rotary,
    FixedWing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VehicleType {
    Jeep = 0,
    Tank = 1,
    Helicopter = 2,
    Plane = 3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleDef {
    pub name: &'static str,
    pub kind: VehicleKind,
    /// Top speed in m/s.
    pub speed: f32,
    /// Radians per second.
    pub turn_rate: f32,
    pub max_health: i32,
    /// 0 means unarmed.
    pub cannon_damage: i32,
    pub cannon_rate: f32,
    pub cannon_range: f32,
    pub length: f32,
    pub width: f32,
    pub height: f32,
}

const VEHICLES: [VehicleDef; 4] = [
    VehicleDef {
        name: "Jeep",
        kind: VehicleKind::Ground,
        speed: 22.0,
        turn_rate: 2.5,
        max_health: 250,
        cannon_damage: 0,
        cannon_rate: 0.0,
        cannon_range: 0.0,
        length: 3.5,
        width: 2.0,
        height: 1.8,
    },
    VehicleDef {
        name: "Tank",
        kind: VehicleKind::Ground,
        speed: 9.0,
        turn_rate: 1.2,
        max_health: 1200,
        cannon_damage: 80,
        cannon_rate: 2.0,
        cannon_range: 500.0,
        length: 5.0,
        width: 3.0,
        height: 2.5,
    },
    VehicleDef {
        name: "Helicopter",
        kind: VehicleKind::Rotary,
        speed: 18.0,
        turn_rate: 1.8,
        max_health: 600,
        cannon_damage: 30,
        cannon_rate: 0.4,
        cannon_range: 250.0,
        length: 6.0,
        width: 2.5,
        height: 2.5,
    },
    VehicleDef {
        name: "Plane",
        kind: VehicleKind::FixedWing,
        speed: 38.0,
        turn_rate: 1.1,
        max_health: 400,
        cannon_damage: 35,
        cannon_rate: 0.2,
        cannon_range: 300.0,
        length: 7.0,
        width: 8.0,
        height: 2.0,
    },
];

impl VehicleType {
    pub fn def(self) -> &'static VehicleDef {
        &VEHICLES[self as usize]
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(VehicleType::Jeep),
            1 => Some(VehicleType::Tank),
            2 => Some(VehicleType::Helicopter),
            3 => Some(VehicleType::Plane),
            _ => None,
        }
    }

    pub fn is_aircraft(self) -> bool {
        self.def().kind != VehicleKind::Ground
    }
}
