use clap::Parser;
use shared::{encode, Handoff, MAX_PLAYERS, MIN_PLAYERS};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::sleep;

/// Hands a room assignment to peers started without `--peers`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Peer gossip addresses in join order
    #[arg(required = true, value_delimiter = ',')]
    peers: Vec<SocketAddr>,

    /// How many times to send the handoff
    #[arg(short, long, default_value = "1")]
    repeat: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&args.peers.len()) {
        return Err(format!(
            "a room needs {} to {} players, got {}",
            MIN_PLAYERS,
            MAX_PLAYERS,
            args.peers.len()
        )
        .into());
    }

    let handoff = Handoff::from_addrs(&args.peers);
    let data = encode(&handoff)?;

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    println!("Matchmaker bound to {}", socket.local_addr()?);

    for round in 0..args.repeat.max(1) {
        if round > 0 {
            sleep(Duration::from_millis(200)).await;
        }
        for entry in &handoff.roster {
            socket.send_to(&data, entry.addr).await?;
            println!("Sent handoff to {} at {}", entry.id, entry.addr);
        }
    }

    Ok(())
}
