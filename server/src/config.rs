//! Command-line configuration.
//!
//! The historical launch line is `server -p 27015 -bots 100`; single-dash long
//! flags are rewritten to their `--` form before clap sees them.

use clap::Parser;
use log::warn;
use shared::{DEFAULT_BOTS, DEFAULT_PORT, MAX_PLAYERS, RESERVED_HUMAN_SLOTS, SESSION_TIMEOUT, TICK_RATE};
use std::time::Duration;

const LEGACY_FLAGS: [&str; 4] = ["bots", "port", "host", "seed"];

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about = "Authoritative arctic assault game server")]
pub struct Args {
    /// Address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    pub host: String,
    /// UDP port to listen on
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Number of bots to spawn at startup
    #[clap(long, default_value_t = DEFAULT_BOTS)]
    pub bots: usize,
    /// Seed for the world and bot random number generators
    #[clap(long)]
    pub seed: Option<u64>,
}

/// Rewrites `-bots 5` and `-bots=5` style flags to `--bots`.
pub fn normalize_legacy_flags<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .map(|arg| {
            let Some(rest) = arg.strip_prefix('-') else {
                return arg;
            };
            if rest.starts_with('-') {
                return arg;
            }
            let name = rest.split('=').next().unwrap_or(rest);
            if LEGACY_FLAGS.contains(&name) {
                format!("-{}", arg)
            } else {
                arg
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub bots: usize,
    pub tick_rate: u32,
    /// Idle seconds before a silent client is dropped.
    pub session_timeout: f32,
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            bots: DEFAULT_BOTS,
            tick_rate: TICK_RATE,
            session_timeout: SESSION_TIMEOUT,
            seed: None,
        }
    }
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        let max_bots = MAX_PLAYERS - RESERVED_HUMAN_SLOTS;
        if args.bots > max_bots {
            warn!(
                "Requested {} bots, capping at {} to keep slots for humans",
                args.bots, max_bots
            );
        }
        Self {
            host: args.host,
            port: args.port,
            bots: args.bots.min(max_bots),
            seed: args.seed,
            ..Self::default()
        }
    }
}

impl ServerConfig {
    /// Parses the process arguments, accepting legacy single-dash flags.
    pub fn from_env() -> Self {
        Args::parse_from(normalize_legacy_flags(std::env::args())).into()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate.max(1)))
    }

    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}
