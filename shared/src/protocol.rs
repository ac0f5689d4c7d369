//! Datagram codec shared by server and clients.
//!
//! Every datagram starts with a one-byte message tag followed by packed,
//! little-endian, fixed-width records. Records are plain serde structs encoded
//! with bincode's default (fixed-int, little-endian) configuration, which adds
//! no padding and no length prefix for arrays, so the byte layout is exactly
//! the field order. Variable sections carry an explicit `u8` count.

use crate::math::Vec3;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NAME_LEN: usize = 32;
/// `Input.class_select` value meaning "keep the current class".
pub const NO_CLASS_CHANGE: u8 = 0xFF;
/// Receive buffer size; every message must fit one datagram.
pub const MAX_DATAGRAM: usize = 8192;

pub mod tag {
    pub const JOIN: u8 = 1;
    pub const INPUT: u8 = 2;
    pub const DISCONNECT: u8 = 3;

    pub const JOIN_ACK: u8 = 1;
    pub const SNAPSHOT: u8 = 2;
    pub const PLAYER_HIT: u8 = 3;
    pub const PLAYER_DIED: u8 = 4;
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty datagram")]
    Empty,
    #[error("unknown message type {0}")]
    UnknownType(u8),
    #[error("malformed payload: {0}")]
    Malformed(#[from] bincode::Error),
    #[error("{0} records do not fit a u8 count")]
    TooManyRecords(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputPacket {
    pub seq: u32,
    pub keys: u16,
    pub yaw: f32,
    pub pitch: f32,
    pub class_select: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientPacket {
    Join { name: String },
    Input(InputPacket),
    Disconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: u8,
    pub state: u8,
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub health: u8,
    pub weapon: u8,
    pub ammo: u8,
    pub vehicle: i16,
    pub team: u8,
    pub class: u8,
    pub spotted: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeaponRecord {
    pub id: u16,
    pub kind: u8,
    pub position: Vec3,
    pub active: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub id: u8,
    pub kind: u8,
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub turret_yaw: f32,
    pub health: i16,
    pub driver: i16,
    pub active: u8,
    pub rotor_angle: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FlagRecord {
    pub team: u8,
    pub position: Vec3,
    pub carrier: i16,
    pub at_base: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HazardRecord {
    pub position: Vec3,
    pub radius: f32,
    pub rotation: f32,
    pub active: u8,
}

#[derive(Serialize, Deserialize)]
struct SnapshotHeader {
    tick: u32,
    ack_seq: u32,
    num_players: u8,
    team_scores: [u8; 2],
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub tick: u32,
    pub ack_seq: u32,
    pub team_scores: [u8; 2],
    pub players: Vec<PlayerRecord>,
    pub weapons: Vec<WeaponRecord>,
    pub vehicles: Vec<VehicleRecord>,
    pub flags: [FlagRecord; 2],
    pub hazards: Vec<HazardRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerPacket {
    JoinAck { player_id: u8, num_bots: u8 },
    Snapshot(Snapshot),
    PlayerHit { attacker: u8, victim: u8, damage: i16 },
    PlayerDied { victim: u8, killer: u8 },
}

fn put<T: Serialize>(out: &mut Vec<u8>, value: &T) -> Result<(), ProtocolError> {
    bincode::serialize_into(&mut *out, value)?;
    Ok(())
}

fn take<T: DeserializeOwned>(input: &mut &[u8]) -> Result<T, ProtocolError> {
    Ok(bincode::deserialize_from(&mut *input)?)
}

fn put_section<T: Serialize>(out: &mut Vec<u8>, records: &[T]) -> Result<(), ProtocolError> {
    let count = u8::try_from(records.len())
        .map_err(|_| ProtocolError::TooManyRecords(records.len()))?;
    out.push(count);
    for record in records {
        put(out, record)?;
    }
    Ok(())
}

fn take_records<T: DeserializeOwned>(
    input: &mut &[u8],
    count: u8,
) -> Result<Vec<T>, ProtocolError> {
    (0..count).map(|_| take(input)).collect()
}

fn take_section<T: DeserializeOwned>(input: &mut &[u8]) -> Result<Vec<T>, ProtocolError> {
    let count: u8 = take(input)?;
    take_records(input, count)
}

fn split_tag(bytes: &[u8]) -> Result<(u8, &[u8]), ProtocolError> {
    match bytes.split_first() {
        Some((tag, rest)) => Ok((*tag, rest)),
        None => Err(ProtocolError::Empty),
    }
}

/// Packs a player name into the fixed, NUL-padded wire field.
pub fn encode_name(name: &str) -> [u8; NAME_LEN] {
    let mut field = [0u8; NAME_LEN];
    let bytes = name.as_bytes();
    // Keep one byte for the terminator
    let len = bytes.len().min(NAME_LEN - 1);
    field[..len].copy_from_slice(&bytes[..len]);
    field
}

pub fn decode_name(field: &[u8; NAME_LEN]) -> String {
    let end = field.iter().position(|b| *b == 0).unwrap_or(NAME_LEN);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

impl ClientPacket {
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut out = Vec::with_capacity(40);
        match self {
            ClientPacket::Join { name } => {
                out.push(tag::JOIN);
                put(&mut out, &encode_name(name))?;
            }
            ClientPacket::Input(input) => {
                out.push(tag::INPUT);
                put(&mut out, input)?;
            }
            ClientPacket::Disconnect => out.push(tag::DISCONNECT),
        }
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (tag, mut body) = split_tag(bytes)?;
        match tag {
            tag::JOIN => {
                let field: [u8; NAME_LEN] = take(&mut body)?;
                Ok(ClientPacket::Join {
                    name: decode_name(&field),
                })
            }
            tag::INPUT => Ok(ClientPacket::Input(take(&mut body)?)),
            tag::DISCONNECT => Ok(ClientPacket::Disconnect),
            other => Err(ProtocolError::UnknownType(other)),
        }
    }
}

impl ServerPacket {
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut out = Vec::new();
        match self {
            ServerPacket::JoinAck {
                player_id,
                num_bots,
            } => {
                out.push(tag::JOIN_ACK);
                put(&mut out, &(*player_id, *num_bots))?;
            }
            ServerPacket::Snapshot(snapshot) => {
                out.push(tag::SNAPSHOT);
                snapshot.write(&mut out)?;
            }
            ServerPacket::PlayerHit {
                attacker,
                victim,
                damage,
            } => {
                out.push(tag::PLAYER_HIT);
                put(&mut out, &(*attacker, *victim, *damage))?;
            }
            ServerPacket::PlayerDied { victim, killer } => {
                out.push(tag::PLAYER_DIED);
                put(&mut out, &(*victim, *killer))?;
            }
        }
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (tag, mut body) = split_tag(bytes)?;
        match tag {
            tag::JOIN_ACK => {
                let (player_id, num_bots): (u8, u8) = take(&mut body)?;
                Ok(ServerPacket::JoinAck {
                    player_id,
                    num_bots,
                })
            }
            tag::SNAPSHOT => Ok(ServerPacket::Snapshot(Snapshot::read(&mut body)?)),
            tag::PLAYER_HIT => {
                let (attacker, victim, damage): (u8, u8, i16) = take(&mut body)?;
                Ok(ServerPacket::PlayerHit {
                    attacker,
                    victim,
                    damage,
                })
            }
            tag::PLAYER_DIED => {
                let (victim, killer): (u8, u8) = take(&mut body)?;
                Ok(ServerPacket::PlayerDied { victim, killer })
            }
            other => Err(ProtocolError::UnknownType(other)),
        }
    }
}

impl Snapshot {
    fn write(&self, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        let num_players = u8::try_from(self.players.len())
            .map_err(|_| ProtocolError::TooManyRecords(self.players.len()))?;
        put(
            out,
            &SnapshotHeader {
                tick: self.tick,
                ack_seq: self.ack_seq,
                num_players,
                team_scores: self.team_scores,
            },
        )?;
        for player in &self.players {
            put(out, player)?;
        }
        put_section(out, &self.weapons)?;
        put_section(out, &self.vehicles)?;
        for flag in &self.flags {
            put(out, flag)?;
        }
        put_section(out, &self.hazards)
    }

    fn read(input: &mut &[u8]) -> Result<Self, ProtocolError> {
        let header: SnapshotHeader = take(input)?;
        let players = take_records(input, header.num_players)?;
        let weapons = take_section(input)?;
        let vehicles = take_section(input)?;
        let flags = [take(input)?, take(input)?];
        let hazards = take_section(input)?;
        Ok(Snapshot {
            tick: header.tick,
            ack_seq: header.ack_seq,
            team_scores: header.team_scores,
            players,
            weapons,
            vehicles,
            flags,
            hazards,
        })
    }
}
