//! The tick orchestrator.
//!
//! `Simulation` owns the world, the session table and the bot brains, and knows
//! nothing about sockets: datagrams come in through [`Simulation::handle_datagram`]
//! and outbound packets queue up as [`GameMessage`]s for the network layer to
//! flush. One call to [`Simulation::step`] advances the world by exactly one
//! tick in a fixed phase order.

use crate::bot::BotBrain;
use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::game::GameState;
use crate::map::GameMap;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::protocol::{ClientPacket, InputPacket, ServerPacket};
use shared::{
    InputState, PlayerClass, KEY_ABILITY, KEY_RELOAD, KEY_SHOOT, KEY_USE, MAX_PLAYERS,
};
use std::net::SocketAddr;

/// Packets produced by a tick, waiting for the network layer
#[derive(Debug, Clone, PartialEq)]
pub enum GameMessage {
    SendPacket {
        packet: ServerPacket,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: ServerPacket,
    },
}

pub struct Simulation {
    pub state: GameState,
    pub clients: ClientManager,
    bots: Vec<BotBrain>,
    bot_rng: StdRng,
    outbox: Vec<GameMessage>,
    dt: f32,
}

impl Simulation {
    pub fn new(map: GameMap, config: &ServerConfig) -> Self {
        let bot_rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };

        let mut simulation = Self {
            state: GameState::new(map, config.seed),
            clients: ClientManager::new(config.session_timeout),
            bots: Vec::new(),
            bot_rng,
            outbox: Vec::new(),
            dt: config.dt(),
        };
        simulation.spawn_bots(config.bots);
        simulation
    }

    fn spawn_bots(&mut self, count: usize) {
        for n in 0..count {
            let class = PlayerClass::ALL[self.bot_rng.gen_range(0..PlayerClass::ALL.len())];
            let Some(id) = self.state.add_player(&format!("Bot_{}", n), true, class) else {
                info!("No free slots left after {} bots", n);
                break;
            };
            let position = self.state.players[id].position;
            self.bots.push(BotBrain::new(id, position, &mut self.bot_rng));
        }
        info!("Spawned {} bots", self.bots.len());
    }

    pub fn bot_count(&self) -> usize {
        self.bots.len()
    }

    pub fn bots(&self) -> &[BotBrain] {
        &self.bots
    }

    /// Decodes one inbound datagram and applies it. Malformed datagrams are
    /// dropped.
    pub fn handle_datagram(&mut self, bytes: &[u8], addr: SocketAddr) {
        match ClientPacket::decode(bytes) {
            Ok(ClientPacket::Join { name }) => self.handle_join(&name, addr),
            Ok(ClientPacket::Input(input)) => self.handle_input(&input, addr),
            Ok(ClientPacket::Disconnect) => self.handle_disconnect(addr),
            Err(e) => debug!("Dropped {} byte datagram from {}: {}", bytes.len(), addr, e),
        }
    }

    fn join_ack(&self, player_id: usize) -> ServerPacket {
        ServerPacket::JoinAck {
            player_id: player_id as u8,
            num_bots: u8::try_from(self.bots.len()).unwrap_or(u8::MAX),
        }
    }

    fn handle_join(&mut self, name: &str, addr: SocketAddr) {
        // Retried joins get the same answer
        if let Some(id) = self.clients.find_by_addr(addr) {
            debug!("Repeated join from {}, resending ack for player {}", addr, id);
            let packet = self.join_ack(id);
            self.outbox.push(GameMessage::SendPacket { packet, addr });
            return;
        }

        let Some(id) = self.state.add_player(name, false, PlayerClass::Assault) else {
            info!("Server full, ignoring join from {}", addr);
            return;
        };
        self.clients.add_session(id, addr);
        info!(
            "Player {} '{}' joined team {} from {}",
            id, name, self.state.players[id].team, addr
        );

        let packet = self.join_ack(id);
        self.outbox.push(GameMessage::SendPacket { packet, addr });
    }

    fn handle_input(&mut self, input: &InputPacket, addr: SocketAddr) {
        let Some(id) = self.clients.find_by_addr(addr) else {
            debug!("Input from unknown address {}", addr);
            return;
        };
        if !self.clients.accept_input(id, input) {
            return;
        }
        if let Some(class) = PlayerClass::from_u8(input.class_select) {
            let player = &mut self.state.players[id];
            if player.class != class {
                info!("Player {} switched to {:?}", id, class);
                player.class = class;
            }
        }
    }

    fn handle_disconnect(&mut self, addr: SocketAddr) {
        if let Some(id) = self.clients.find_by_addr(addr) {
            self.clients.remove_session(id);
            self.state.remove_player(id);
        }
    }

    /// Gathers this tick's input for every player that has a source. Bots
    /// think first; humans replay their latest accepted input with USE
    /// consumed so a held key toggles only once.
    fn collect_inputs(&mut self) -> Vec<Option<InputState>> {
        let mut inputs = vec![None; MAX_PLAYERS];

        for brain in &mut self.bots {
            let input = brain.think(&self.state, &mut self.bot_rng, self.dt);
            inputs[brain.player_id] = Some(input);
        }

        for (id, _) in self.clients.get_client_addrs() {
            if let Some(session) = self.clients.session_mut(id) {
                inputs[id] = Some(session.last_input);
                session.last_input.release(KEY_USE);
            }
        }
        inputs
    }

    fn apply_inputs(&mut self, inputs: &[Option<InputState>]) {
        for (id, input) in inputs.iter().enumerate() {
            let Some(input) = input else {
                continue;
            };
            if !self.state.players[id].is_alive() {
                continue;
            }

            if input.pressed(KEY_USE) {
                self.state.toggle_vehicle(id);
            }
            if input.pressed(KEY_ABILITY) {
                self.state.use_ability(id);
            }
            if self.state.players[id].vehicle.is_some() {
                continue;
            }

            self.state.apply_input(id, input, self.dt);
            if input.pressed(KEY_RELOAD) {
                self.state.reload(id);
            }
            if input.pressed(KEY_SHOOT) {
                self.state.fire_weapon(id);
            }
        }
    }

    /// Advances the world by one tick.
    pub fn step(&mut self) {
        let dt = self.dt;

        let inputs = self.collect_inputs();
        self.state.update_respawns(dt);
        self.apply_inputs(&inputs);

        self.state.tick_vehicles(&inputs, dt);
        self.state.update_pickups(dt);
        self.state.update_flags(dt);
        self.state.update_hazards(dt);
        self.state.update_timers(dt);
        self.state.age_kill_feed(dt);

        for id in self.clients.check_timeouts(dt) {
            self.state.remove_player(id);
        }

        self.broadcast();
        self.state.tick = self.state.tick.wrapping_add(1);
    }

    fn broadcast(&mut self) {
        for packet in self.state.take_events() {
            self.outbox.push(GameMessage::BroadcastPacket { packet });
        }

        let clients = self.clients.get_client_addrs();
        if clients.is_empty() {
            return;
        }
        let mut snapshot = self.state.snapshot(0);
        for (id, addr) in clients {
            snapshot.ack_seq = self
                .clients
                .session(id)
                .map_or(0, |session| session.last_input_seq);
            self.outbox.push(GameMessage::SendPacket {
                packet: ServerPacket::Snapshot(snapshot.clone()),
                addr,
            });
        }
    }

    pub fn drain_outbox(&mut self) -> Vec<GameMessage> {
        std::mem::take(&mut self.outbox)
    }
}
