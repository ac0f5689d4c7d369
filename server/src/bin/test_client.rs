use clap::Parser;
use shared::protocol::{ClientPacket, InputPacket, ServerPacket, MAX_DATAGRAM, NO_CLASS_CHANGE};
use shared::{KEY_SHOOT, KEY_W, TICK_DT};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout};

/// Headless client that joins, walks in a circle while firing, and prints
/// what the server sends back.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address
    #[clap(short, long, default_value = "127.0.0.1:27015")]
    server: SocketAddr,
    /// Player name sent with the join
    #[clap(short, long, default_value = "probe")]
    name: String,
    /// Seconds to stay connected
    #[clap(short, long, default_value_t = 10)]
    duration: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    println!("Client socket bound to {}", socket.local_addr()?);

    let join = ClientPacket::Join {
        name: args.name.clone(),
    };
    let mut buf = vec![0u8; MAX_DATAGRAM];

    // Joins are idempotent, so retry until acknowledged
    let player_id = loop {
        println!("Sending join to {}", args.server);
        socket.send_to(&join.encode()?, args.server).await?;

        match timeout(Duration::from_secs(1), socket.recv_from(&mut buf)).await {
            Ok(Ok((len, _))) => match ServerPacket::decode(&buf[..len]) {
                Ok(ServerPacket::JoinAck {
                    player_id,
                    num_bots,
                }) => {
                    println!("Joined as player {} ({} bots online)", player_id, num_bots);
                    break player_id;
                }
                Ok(_) => continue,
                Err(e) => println!("Failed to decode response: {}", e),
            },
            Ok(Err(e)) => println!("Receive error: {}", e),
            Err(_) => println!("No answer yet"),
        }
    };

    let ticks = (args.duration as f32 / TICK_DT) as u32;
    let mut snapshots = 0u32;
    let mut hits = 0u32;
    let mut deaths = 0u32;

    for seq in 1..=ticks {
        let input = InputPacket {
            seq,
            keys: KEY_W | if seq % 32 == 0 { KEY_SHOOT } else { 0 },
            yaw: seq as f32 * TICK_DT * 0.5,
            pitch: 0.0,
            class_select: NO_CLASS_CHANGE,
        };
        socket
            .send_to(&ClientPacket::Input(input).encode()?, args.server)
            .await?;

        while let Ok((len, _)) = socket.try_recv_from(&mut buf) {
            match ServerPacket::decode(&buf[..len]) {
                Ok(ServerPacket::Snapshot(snapshot)) => {
                    snapshots += 1;
                    if snapshots % 64 == 0 {
                        let me = snapshot.players.iter().find(|p| p.id == player_id);
                        println!(
                            "tick {} ack {} score {}-{} players {} me {:?}",
                            snapshot.tick,
                            snapshot.ack_seq,
                            snapshot.team_scores[0],
                            snapshot.team_scores[1],
                            snapshot.players.len(),
                            me.map(|p| (p.position, p.health))
                        );
                    }
                }
                Ok(ServerPacket::PlayerHit { victim, .. }) if victim == player_id => hits += 1,
                Ok(ServerPacket::PlayerDied { victim, killer }) if victim == player_id => {
                    deaths += 1;
                    println!("Killed by player {}", killer);
                }
                Ok(_) => {}
                Err(e) => println!("Failed to decode packet: {}", e),
            }
        }

        sleep(Duration::from_secs_f32(TICK_DT)).await;
    }

    socket
        .send_to(&ClientPacket::Disconnect.encode()?, args.server)
        .await?;
    println!(
        "Test client finished: {} snapshots, hit {} times, died {} times",
        snapshots, hits, deaths
    );

    Ok(())
}
