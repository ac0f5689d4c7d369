//! Server network layer: the UDP socket and the fixed-rate tick loop

use crate::config::ServerConfig;
use crate::map::GameMap;
use crate::simulation::{GameMessage, Simulation};
use log::{debug, info, log, warn, Level};
use shared::protocol::{ServerPacket, MAX_DATAGRAM};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::sleep;

/// Ticks between performance summaries
const PERF_LOG_INTERVAL: u32 = 64 * 5;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}

/// A full send buffer drops the datagram like any lost UDP packet; only other
/// failures are worth a warning.
fn send_failure_level(error: &std::io::Error) -> Level {
    if error.kind() == ErrorKind::WouldBlock {
        Level::Debug
    } else {
        Level::Warn
    }
}

/// Time left in the tick budget after `elapsed`, never negative. An overrun
/// tick shortens the next sleep to zero instead of scheduling catch-up steps.
pub fn remaining_budget(elapsed: Duration, tick: Duration) -> Duration {
    tick.saturating_sub(elapsed)
}

/// Main server coordinating the socket and the simulation
pub struct Server {
    socket: UdpSocket,
    simulation: Simulation,
    tick_duration: Duration,
    buffer: Vec<u8>,
}

impl Server {
    pub async fn bind(config: &ServerConfig, map: GameMap) -> Result<Self, ServerError> {
        let addr = config.bind_addr();
        let socket = UdpSocket::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        info!("Server listening on {}", socket.local_addr()?);

        Ok(Server {
            socket,
            simulation: Simulation::new(map, config),
            tick_duration: config.tick_duration(),
            buffer: vec![0u8; MAX_DATAGRAM],
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Reads every datagram already queued on the socket without waiting
    fn drain_socket(&mut self) {
        loop {
            match self.socket.try_recv_from(&mut self.buffer) {
                Ok((len, addr)) => self.simulation.handle_datagram(&self.buffer[..len], addr),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    debug!("Receive error: {}", e);
                    break;
                }
            }
        }
    }

    fn send(&self, bytes: &[u8], addr: SocketAddr) {
        if let Err(e) = self.socket.try_send_to(bytes, addr) {
            log!(
                send_failure_level(&e),
                "Failed to send {} bytes to {}: {}",
                bytes.len(),
                addr,
                e
            );
        }
    }

    fn encode(packet: &ServerPacket) -> Option<Vec<u8>> {
        match packet.encode() {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Failed to encode packet: {}", e);
                None
            }
        }
    }

    fn flush_outbox(&mut self) {
        for message in self.simulation.drain_outbox() {
            match message {
                GameMessage::SendPacket { packet, addr } => {
                    if let Some(bytes) = Self::encode(&packet) {
                        self.send(&bytes, addr);
                    }
                }
                GameMessage::BroadcastPacket { packet } => {
                    let Some(bytes) = Self::encode(&packet) else {
                        continue;
                    };
                    for (_, addr) in self.simulation.clients.get_client_addrs() {
                        self.send(&bytes, addr);
                    }
                }
            }
        }
    }

    /// Runs one full tick: drain, simulate, send
    pub fn tick(&mut self) {
        self.drain_socket();
        self.simulation.step();
        self.flush_outbox();
    }

    /// Main server loop. Never returns on its own; callers race it against a
    /// shutdown signal.
    pub async fn run(&mut self) -> Result<(), ServerError> {
        info!(
            "Server started: {} bots, {:.0} Hz",
            self.simulation.bot_count(),
            1.0 / self.tick_duration.as_secs_f64()
        );

        let mut busy = Duration::ZERO;
        let mut worst = Duration::ZERO;

        loop {
            let started = Instant::now();
            self.tick();
            let elapsed = started.elapsed();

            if elapsed > self.tick_duration {
                warn!(
                    "Tick {} overran its budget: {:.2}ms",
                    self.simulation.state.tick,
                    elapsed.as_secs_f64() * 1000.0
                );
            }

            // Periodic performance monitoring
            busy += elapsed;
            worst = worst.max(elapsed);
            if self.simulation.state.tick % PERF_LOG_INTERVAL == 0 {
                debug!(
                    "Tick {}: {} clients, {} players, avg {:.2}ms, worst {:.2}ms",
                    self.simulation.state.tick,
                    self.simulation.clients.len(),
                    self.simulation.state.connected_count(),
                    busy.as_secs_f64() * 1000.0 / f64::from(PERF_LOG_INTERVAL),
                    worst.as_secs_f64() * 1000.0
                );
                busy = Duration::ZERO;
                worst = Duration::ZERO;
            }

            sleep(remaining_budget(elapsed, self.tick_duration)).await;
        }
    }
}
