use clap::Parser;
use log::{debug, info};
use peer::bridge::{self, direction_from_key, BridgeEvent, BridgeInput};
use peer::config::DEFAULT_FAILURE_MULTIPLIER;
use peer::handoff::{self, await_handoff};
use peer::{Node, Outcome, Session, SessionConfig};
use shared::{Handoff, PlayerId};
use std::net::SocketAddr;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Headless light-cycle peer. Type w/a/s/d and Enter to steer.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Local UDP address for gossip
    #[arg(short, long, default_value = "127.0.0.1:9001")]
    bind: String,

    /// Every peer's address in join order, this one included. Without it
    /// the node waits for a matchmaker handoff.
    #[arg(short, long, value_delimiter = ',')]
    peers: Vec<SocketAddr>,

    /// Movement tick period in milliseconds
    #[arg(long, default_value = "500")]
    tick_ms: u64,

    /// Routine update period in milliseconds
    #[arg(long, default_value = "1000")]
    update_ms: u64,

    /// Leader reconciliation period in milliseconds
    #[arg(long, default_value = "2000")]
    reconcile_ms: u64,

    /// Update periods of silence before a peer is evicted
    #[arg(long, default_value_t = DEFAULT_FAILURE_MULTIPLIER)]
    failure_multiplier: u32,

    /// Fraction of outgoing datagrams to drop, for testing
    #[arg(long, default_value = "0.0")]
    drop_rate: f64,

    /// Artificial send delay in milliseconds, for testing
    #[arg(short = 'l', long, default_value = "0")]
    fake_latency: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Tip: Set RUST_LOG=info to see node logs");
    }

    let args = Args::parse();
    let config = SessionConfig::from_millis(
        args.tick_ms,
        args.update_ms,
        args.reconcile_ms,
        args.failure_multiplier,
    )?
    .with_faults(args.drop_rate, args.fake_latency);
    config.validate()?;

    let socket = Node::bind(&args.bind).await?;
    let local_addr = socket.local_addr()?;

    let handoff = if args.peers.is_empty() {
        info!("Waiting for matchmaker handoff on {}", local_addr);
        await_handoff(&socket).await?
    } else {
        Handoff::from_addrs(&args.peers)
    };
    let assignment = handoff::validate(&handoff, local_addr)?;
    let local = assignment.local;
    println!("Playing as {}", local);

    let session = Session::new(assignment, &config, Instant::now());
    let (bridge, handle) = bridge::channel();
    let node = Node::new(socket, session, config, bridge)?;

    let mut events = handle.events;
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            report(event, local);
        }
    });

    let input = handle.input;
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(direction) = direction_from_key(&line) {
                if input.send(BridgeInput::LocalDirectionChange(direction)).is_err() {
                    break;
                }
            }
        }
    });

    tokio::select! {
        result = node.run() => {
            match result? {
                Outcome::Winner(id) if id == local => println!("You win!"),
                Outcome::Winner(id) => println!("{} wins", id),
                Outcome::Draw => println!("Draw"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("Received Ctrl+C, leaving the session...");
        }
    }

    Ok(())
}

fn report(event: BridgeEvent, local: PlayerId) {
    match event {
        BridgeEvent::BoardSnapshot(board) => debug!("\n{}", board),
        BridgeEvent::RecentTrails(_) => {}
        BridgeEvent::PlayerDead(id) if id == local => println!("You crashed"),
        BridgeEvent::PlayerDead(id) => println!("{} crashed", id),
        BridgeEvent::PlayerVictory(id) => info!("Victory for {}", id),
        BridgeEvent::SessionDraw => info!("Nobody survived"),
    }
}
