//! Integration tests for the server and the shared protocol
//!
//! These tests drive the server through its public API: real UDP sessions
//! against a running tick loop, and whole-tick scenarios against the
//! socket-free simulation.

use assert_approx_eq::assert_approx_eq;
use server::config::ServerConfig;
use server::game::{FlagState, GameState};
use server::map::{Block, GameMap};
use server::network::Server;
use server::simulation::{GameMessage, Simulation};
use shared::protocol::{
    ClientPacket, InputPacket, ServerPacket, Snapshot, MAX_DATAGRAM, NO_CLASS_CHANGE,
};
use shared::{
    LifeState, PlayerClass, Vec3, KEY_SHOOT, KEY_W, MAX_PLAYERS, RESPAWN_TIME, SESSION_TIMEOUT,
    TICK_RATE, WORLD_BOUND,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

fn local_config(bots: usize) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        bots,
        seed: Some(2024),
        ..ServerConfig::default()
    }
}

/// Starts a server on an ephemeral port and returns its address.
async fn start_server(bots: usize) -> SocketAddr {
    let mut server = Server::bind(&local_config(bots), GameMap::arctic())
        .await
        .expect("Failed to bind server");
    let addr = server.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

fn input(seq: u32, keys: u16) -> InputPacket {
    InputPacket {
        seq,
        keys,
        yaw: 0.0,
        pitch: 0.0,
        class_select: NO_CLASS_CHANGE,
    }
}

async fn send(socket: &UdpSocket, packet: &ClientPacket, server: SocketAddr) {
    socket
        .send_to(&packet.encode().unwrap(), server)
        .await
        .expect("Failed to send");
}

/// Reads packets until one satisfies `pred`, failing after two seconds.
async fn recv_until<T>(socket: &UdpSocket, mut pred: impl FnMut(ServerPacket) -> Option<T>) -> T {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    let wait = async {
        loop {
            let (len, _) = socket.recv_from(&mut buf).await.expect("Receive failed");
            if let Ok(packet) = ServerPacket::decode(&buf[..len]) {
                if let Some(found) = pred(packet) {
                    return found;
                }
            }
        }
    };
    timeout(Duration::from_secs(2), wait)
        .await
        .expect("Timed out waiting for server")
}

async fn join(socket: &UdpSocket, server: SocketAddr, name: &str) -> (u8, u8) {
    send(
        socket,
        &ClientPacket::Join {
            name: name.to_string(),
        },
        server,
    )
    .await;
    recv_until(socket, |packet| match packet {
        ServerPacket::JoinAck {
            player_id,
            num_bots,
        } => Some((player_id, num_bots)),
        _ => None,
    })
    .await
}

async fn next_snapshot(socket: &UdpSocket) -> Snapshot {
    recv_until(socket, |packet| match packet {
        ServerPacket::Snapshot(snapshot) => Some(snapshot),
        _ => None,
    })
    .await
}

/// SESSION TESTS OVER REAL UDP
mod session_tests {
    use super::*;

    /// Tests that a join is acknowledged and followed by snapshots
    #[tokio::test]
    async fn join_and_receive_snapshots() {
        let server = start_server(4).await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let (player_id, num_bots) = join(&client, server, "alice").await;
        assert_eq!(num_bots, 4);
        assert_eq!(player_id, 4);

        let snapshot = next_snapshot(&client).await;
        assert_eq!(snapshot.players.len(), 5);
        assert!(snapshot.players.iter().any(|p| p.id == player_id));
        assert_eq!(snapshot.flags[0].team, 0);
        assert_eq!(snapshot.flags[1].team, 1);
        assert!(!snapshot.vehicles.is_empty());
        assert!(!snapshot.weapons.is_empty());

        let later = next_snapshot(&client).await;
        assert!(later.tick > snapshot.tick);
    }

    /// Tests that a retried join gets the same slot back
    #[tokio::test]
    async fn duplicate_join_is_idempotent() {
        let server = start_server(0).await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let first = join(&client, server, "bob").await;
        let second = join(&client, server, "bob").await;
        assert_eq!(first, second);

        let snapshot = next_snapshot(&client).await;
        assert_eq!(snapshot.players.len(), 1);
    }

    /// Tests that snapshots acknowledge the newest accepted input only
    #[tokio::test]
    async fn snapshots_ack_newest_input() {
        let server = start_server(0).await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        join(&client, server, "carol").await;

        send(&client, &ClientPacket::Input(input(9, KEY_W)), server).await;
        send(&client, &ClientPacket::Input(input(4, 0)), server).await;

        let acked = recv_until(&client, |packet| match packet {
            ServerPacket::Snapshot(s) if s.ack_seq != 0 => Some(s.ack_seq),
            _ => None,
        })
        .await;
        assert_eq!(acked, 9);

        // Still 9 after the stale packet has certainly been processed
        tokio::time::sleep(Duration::from_millis(100)).await;
        let snapshot = next_snapshot(&client).await;
        assert_eq!(snapshot.ack_seq, 9);
    }

    /// Tests that a disconnect releases the slot for the next joiner
    #[tokio::test]
    async fn disconnect_frees_slot() {
        let server = start_server(0).await;
        let first = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let (id, _) = join(&first, server, "dave").await;

        send(&first, &ClientPacket::Disconnect, server).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let second = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let (reused, _) = join(&second, server, "erin").await;
        assert_eq!(reused, id);

        let snapshot = next_snapshot(&second).await;
        assert_eq!(snapshot.players.len(), 1);
    }

    /// Tests that garbage datagrams do not disturb the server
    #[tokio::test]
    async fn malformed_packets_are_ignored() {
        let server = start_server(0).await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        for garbage in [&[][..], &[0xFF][..], &[2, 1, 2][..], &[1][..]] {
            client.send_to(garbage, server).await.unwrap();
        }

        let (id, _) = join(&client, server, "frank").await;
        assert_eq!(id, 0);
    }
}

/// WHOLE-TICK SCENARIOS
mod scenario_tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn flat_map() -> GameMap {
        let mut map = GameMap::new();
        map.add_block(Block::floor(
            Vec3::new(-60.0, -0.5, -60.0),
            Vec3::new(60.0, 0.0, 60.0),
        ));
        map.set_flag_base(0, Vec3::new(0.0, 0.1, -30.0));
        map.set_flag_base(1, Vec3::new(0.0, 0.1, 30.0));
        map
    }

    fn simulation(map: GameMap) -> Simulation {
        let mut simulation = Simulation::new(map, &local_config(0));
        simulation.state.hazard_timer = 10_000.0;
        simulation
    }

    fn join_sim(simulation: &mut Simulation, port: u16) -> usize {
        let bytes = ClientPacket::Join {
            name: format!("p{}", port),
        }
        .encode()
        .unwrap();
        simulation.handle_datagram(&bytes, addr(port));
        simulation.clients.find_by_addr(addr(port)).unwrap()
    }

    /// Tests a single pistol shot against a stationary enemy
    #[test]
    fn basic_shot() {
        let mut state = GameState::new(flat_map(), Some(11));
        let shooter = state.add_player("shooter", false, PlayerClass::Support).unwrap();
        let target = state.add_player("target", false, PlayerClass::Assault).unwrap();
        state.players[shooter].position = Vec3::new(0.0, 0.0, 0.0);
        state.players[shooter].yaw = 0.0;
        state.players[shooter].pitch = 0.0;
        state.players[target].position = Vec3::new(0.0, 0.0, 10.0);

        let pistol = state.players[shooter].weapon.def();
        let ammo = state.players[shooter].ammo;
        assert!(state.fire_weapon(shooter));

        assert_eq!(state.players[target].health, 100 - pistol.damage);
        assert_eq!(state.players[shooter].ammo, ammo - 1);
        assert_eq!(
            state.take_events(),
            vec![ServerPacket::PlayerHit {
                attacker: shooter as u8,
                victim: target as u8,
                damage: pistol.damage as i16,
            }]
        );
    }

    /// Tests that lethal damage kills within the tick and is never shown negative
    #[test]
    fn lethality_invariant() {
        let mut state = GameState::new(flat_map(), Some(12));
        let a = state.add_player("a", false, PlayerClass::Assault).unwrap();
        let b = state.add_player("b", false, PlayerClass::Assault).unwrap();

        state.hit_player(b, a, 70);
        assert!(state.hit_player(b, a, 70));

        let victim = &state.players[b];
        assert_eq!(victim.state, LifeState::Dead);
        assert_approx_eq!(victim.respawn_timer, RESPAWN_TIME, 1e-6);
        let record = state.snapshot(0).players[b];
        assert_eq!(record.health, 0);
        assert!(state
            .take_events()
            .contains(&ServerPacket::PlayerDied {
                victim: b as u8,
                killer: a as u8
            }));
    }

    /// Tests carrying the enemy flag home through full ticks
    #[test]
    fn capture_round_trip() {
        let mut sim = simulation(flat_map());
        let raider = join_sim(&mut sim, 6000);
        assert_eq!(sim.state.players[raider].team, 0);
        let enemy_base = sim.state.flags[1].base;
        let home_base = sim.state.flags[0].base;

        sim.state.players[raider].position = enemy_base;
        sim.step();
        assert_eq!(sim.state.flags[1].state, FlagState::Carried { carrier: raider });

        sim.state.players[raider].position = home_base;
        sim.step();
        assert_eq!(sim.state.scores, [1, 0]);
        assert_eq!(sim.state.flags[1].state, FlagState::AtBase);

        let snapshot = sim
            .drain_outbox()
            .into_iter()
            .filter_map(|m| match m {
                GameMessage::SendPacket {
                    packet: ServerPacket::Snapshot(s),
                    ..
                } => Some(s),
                _ => None,
            })
            .last()
            .unwrap();
        assert_eq!(snapshot.team_scores, [1, 0]);
        assert_eq!(snapshot.flags[1].at_base, 1);
        assert_eq!(snapshot.flags[1].carrier, -1);
        assert_approx_eq!(snapshot.flags[1].position.x, enemy_base.x, 1e-4);
        assert_approx_eq!(snapshot.flags[1].position.z, enemy_base.z, 1e-4);
    }

    /// Tests that a silent session is dropped and its slot reused
    #[test]
    fn timeout_disconnect() {
        let mut sim = simulation(flat_map());
        let id = join_sim(&mut sim, 6000);

        let ticks = (SESSION_TIMEOUT * TICK_RATE as f32) as usize + 2;
        for _ in 0..ticks {
            sim.step();
        }
        assert_eq!(sim.state.players[id].state, LifeState::Disconnected);
        assert_eq!(join_sim(&mut sim, 6001), id);
    }

    /// Tests that a held trigger empties the magazine and reloads
    #[test]
    fn held_trigger_cycles_magazine() {
        let mut sim = simulation(flat_map());
        let id = join_sim(&mut sim, 6000);
        let bytes = ClientPacket::Input(input(1, KEY_SHOOT)).encode().unwrap();
        sim.handle_datagram(&bytes, addr(6000));

        let mag = sim.state.players[id].weapon.def().mag_size;
        let mut lowest = mag;
        for _ in 0..TICK_RATE * 6 {
            sim.step();
            lowest = lowest.min(sim.state.players[id].ammo);
        }
        assert!(lowest <= 1);
        assert!(sim.state.players[id].ammo > 0);
    }
}

/// STRESS TESTS
mod stress_tests {
    use super::*;

    /// Tests that a full bot match keeps everyone inside the world
    #[test]
    fn bots_stay_in_bounds() {
        let mut sim = Simulation::new(GameMap::arctic(), &local_config(32));

        for _ in 0..TICK_RATE * 20 {
            sim.step();
            for player in sim.state.players.iter().filter(|p| p.is_alive()) {
                if player.vehicle.is_some() {
                    continue;
                }
                assert!(player.position.x.abs() <= WORLD_BOUND + 1e-3);
                assert!(player.position.z.abs() <= WORLD_BOUND + 1e-3);
                assert!(player.position.y >= 0.0);
                assert!(player.health > 0);
            }
            for flag in &sim.state.flags {
                if let FlagState::Carried { carrier } = flag.state {
                    assert!(sim.state.players[carrier].is_alive());
                }
            }
        }
        assert_eq!(sim.state.connected_count(), 32);
    }

    /// Tests that the server fills up and then refuses joins quietly
    #[test]
    fn server_full() {
        let mut sim = Simulation::new(GameMap::arctic(), &local_config(MAX_PLAYERS - 4));
        for port in 0..4 {
            let bytes = ClientPacket::Join {
                name: "human".to_string(),
            }
            .encode()
            .unwrap();
            sim.handle_datagram(&bytes, SocketAddr::from(([127, 0, 0, 1], 7000 + port)));
        }
        assert_eq!(sim.clients.len(), 4);
        sim.drain_outbox();

        let bytes = ClientPacket::Join {
            name: "late".to_string(),
        }
        .encode()
        .unwrap();
        sim.handle_datagram(&bytes, SocketAddr::from(([127, 0, 0, 1], 7999)));
        assert_eq!(sim.clients.len(), 4);
        assert!(sim.drain_outbox().is_empty());
    }
}
