//! Session table for connected human players
//!
//! This module tracks the network side of each human player:
//! - Session lifecycle (join, disconnect, idle timeout)
//! - Address lookup for routing inbound datagrams
//! - The monotonic input filter that discards stale or duplicated inputs
//!
//! Sessions are keyed by player slot. Bots own a player slot but never a
//! session, so every session maps to exactly one connected human player.

use log::{debug, info};
use shared::protocol::InputPacket;
use shared::{InputState, MAX_PLAYERS};
use std::collections::HashMap;
use std::net::SocketAddr;

/// Network and input-sequencing state for one human player
#[derive(Debug, Clone)]
pub struct Session {
    /// Player slot this session drives
    pub player_id: usize,
    /// Where snapshots and acknowledgments are sent
    pub addr: SocketAddr,
    /// Highest input sequence number accepted so far
    pub last_input_seq: u32,
    /// Latest accepted control state, reapplied every tick until replaced
    pub last_input: InputState,
    /// Seconds since the last accepted input
    pub idle: f32,
}

impl Session {
    pub fn new(player_id: usize, addr: SocketAddr) -> Self {
        Self {
            player_id,
            addr,
            last_input_seq: 0,
            last_input: InputState::default(),
            idle: 0.0,
        }
    }

    /// Accepts `packet` only if its sequence number is strictly greater than
    /// anything accepted before
    ///
    /// Sequence numbers start above zero; a packet numbered 0 is never newer
    /// than a fresh session and is dropped. Accepted inputs reset the idle
    /// timer.
    pub fn accept_input(&mut self, packet: &InputPacket) -> bool {
        if packet.seq <= self.last_input_seq {
            return false;
        }
        self.last_input_seq = packet.seq;
        self.last_input = InputState::new(packet.keys, packet.yaw, packet.pitch);
        self.idle = 0.0;
        true
    }

    /// Checks whether the session has been silent for longer than `timeout`
    pub fn is_timed_out(&self, timeout: f32) -> bool {
        self.idle > timeout
    }
}

/// Owns every active session and the address index used to find them
///
/// The slot vector mirrors the player table, so a session can be reached
/// from either its player id or the address its datagrams come from.
pub struct ClientManager {
    /// Sessions indexed by player slot
    sessions: Vec<Option<Session>>,
    /// Reverse lookup from network address to player slot
    by_addr: HashMap<SocketAddr, usize>,
    /// Idle seconds after which a session is dropped
    timeout: f32,
}

impl ClientManager {
    /// Creates an empty session table with the given idle timeout in seconds
    pub fn new(timeout: f32) -> Self {
        Self {
            sessions: vec![None; MAX_PLAYERS],
            by_addr: HashMap::new(),
            timeout,
        }
    }

    /// Opens a session for `player_id` reachable at `addr`
    ///
    /// Any previous session on the same slot or from the same address is
    /// replaced.
    pub fn add_session(&mut self, player_id: usize, addr: SocketAddr) {
        self.remove_session(player_id);
        if let Some(old) = self.by_addr.get(&addr).copied() {
            self.remove_session(old);
        }

        info!("Session opened for player {} at {}", player_id, addr);
        self.sessions[player_id] = Some(Session::new(player_id, addr));
        self.by_addr.insert(addr, player_id);
    }

    /// Closes the session on `player_id`, returning it if one was open
    ///
    /// Closing an already closed slot is a no-op, which keeps repeated
    /// disconnect packets harmless.
    pub fn remove_session(&mut self, player_id: usize) -> Option<Session> {
        let session = self.sessions.get_mut(player_id)?.take()?;
        self.by_addr.remove(&session.addr);
        info!("Session closed for player {} at {}", player_id, session.addr);
        Some(session)
    }

    /// Finds the player slot whose session lives at `addr`
    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<usize> {
        self.by_addr.get(&addr).copied()
    }

    pub fn session(&self, player_id: usize) -> Option<&Session> {
        self.sessions.get(player_id)?.as_ref()
    }

    pub fn session_mut(&mut self, player_id: usize) -> Option<&mut Session> {
        self.sessions.get_mut(player_id)?.as_mut()
    }

    /// Runs the monotonic filter for the session at `player_id`
    ///
    /// Returns false for unknown players and for stale or duplicate packets.
    pub fn accept_input(&mut self, player_id: usize, packet: &InputPacket) -> bool {
        match self.session_mut(player_id) {
            Some(session) => {
                let accepted = session.accept_input(packet);
                if !accepted {
                    debug!(
                        "Dropped stale input {} from player {} (last {})",
                        packet.seq, player_id, session.last_input_seq
                    );
                }
                accepted
            }
            None => false,
        }
    }

    /// Advances every idle timer by `dt` and closes sessions past the timeout
    ///
    /// Returns the player slots whose sessions were closed so the caller can
    /// release the matching players.
    pub fn check_timeouts(&mut self, dt: f32) -> Vec<usize> {
        let timeout = self.timeout;
        let timed_out: Vec<usize> = self
            .sessions
            .iter_mut()
            .flatten()
            .filter_map(|session| {
                session.idle += dt;
                session.is_timed_out(timeout).then_some(session.player_id)
            })
            .collect();

        for &player_id in &timed_out {
            info!("Player {} timed out", player_id);
            self.remove_session(player_id);
        }

        timed_out
    }

    /// Gets every active player slot with its address, in slot order
    pub fn get_client_addrs(&self) -> Vec<(usize, SocketAddr)> {
        self.sessions
            .iter()
            .flatten()
            .map(|session| (session.player_id, session.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_addr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_addr.is_empty()
    }
}
