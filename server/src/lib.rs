//! # Game Server Library
//!
//! The authoritative server for a team shooter: up to 128 humans and bots on
//! one map, simulated at a fixed 64 Hz and streamed to clients as one
//! snapshot datagram per tick.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Every movement, shot, vehicle, flag and hazard is resolved here. Clients
//! send only their control state; the server owns the outcome.
//!
//! ### Session Handling
//! Humans join over UDP and are acknowledged with a player slot. Inputs are
//! filtered by sequence number so reordered or duplicated datagrams never
//! roll a player's controls backwards, and silent sessions time out.
//!
//! ### Bots
//! Bots occupy ordinary player slots. Each one is driven by a small state
//! machine that plans routes over the map's waypoint graph and produces the
//! same input a human would send.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Tick
//! The whole tick runs to completion on one thread: drain the socket, think
//! for bots, apply inputs, tick vehicles, resolve pickups, flags and hazards,
//! expire timers and sessions, then broadcast. No subsystem sees a half
//! updated world.
//!
//! ### Socket-Free Core
//! [`simulation::Simulation`] never touches a socket. It accepts raw
//! datagrams and leaves outbound packets in an outbox, which keeps the
//! tick fully testable without a network. [`network::Server`] wraps it with
//! a non-blocking UDP socket and the pacing loop.
//!
//! ### Fixed Pacing
//! After each tick the loop sleeps for whatever is left of the tick budget.
//! A slow tick shortens the next sleep; the loop never runs extra ticks to
//! catch up.
//!
//! ## Module Organization
//!
//! - `map`, `spatial`, `pathfinding`: static geometry, collision and ray
//!   queries, and A* over waypoints
//! - `game`: the entity store and its damage and snapshot bookkeeping
//! - `physics`, `combat`, `vehicle`, `objective`, `hazard`: gameplay systems,
//!   each extending `GameState`
//! - `bot`: bot brains
//! - `client_manager`, `simulation`, `network`, `config`: sessions, the tick
//!   orchestrator, the UDP server and the command line
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::map::GameMap;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         port: 27015,
//!         bots: 32,
//!         ..ServerConfig::default()
//!     };
//!     let mut server = Server::bind(&config, GameMap::arctic()).await?;
//!
//!     // Runs the 64 Hz tick loop until the task is dropped
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod client_manager;
pub mod combat;
pub mod config;
pub mod game;
pub mod hazard;
pub mod map;
pub mod network;
pub mod objective;
pub mod pathfinding;
pub mod physics;
pub mod simulation;
pub mod spatial;
pub mod vehicle;
