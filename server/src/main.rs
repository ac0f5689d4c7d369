use log::{error, info};
use server::config::ServerConfig;
use server::map::GameMap;
use server::network::Server;

/// Parses the command line, binds the socket and runs the tick loop until
/// Ctrl+C.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env();
    info!(
        "Starting server on {} with {} bots",
        config.bind_addr(),
        config.bots
    );

    let mut server = match Server::bind(&config, GameMap::arctic()).await {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
