use clap::Parser;
use log::info;
use macroquad::prelude::*;
use peer::SessionConfig;
use std::net::SocketAddr;
use viewer::game::ViewState;
use viewer::input::InputManager;
use viewer::network::{NodeStatus, NodeThread};
use viewer::rendering::Renderer;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Local UDP address for gossip
    #[arg(short, long, default_value = "127.0.0.1:9001")]
    bind: String,

    /// Every peer's address in join order, this one included. Without it
    /// the viewer waits for a matchmaker handoff.
    #[arg(short, long, value_delimiter = ',')]
    peers: Vec<SocketAddr>,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_latency: u64,

    /// Fraction of outgoing datagrams to drop
    #[arg(long, default_value = "0.0")]
    drop_rate: f64,

    /// Window width
    #[arg(short = 'w', long, default_value = "800")]
    width: i32,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "600")]
    height: i32,
}

fn window_conf() -> Conf {
    let args = Args::parse();
    Conf {
        window_title: "Light Cycles".to_owned(),
        window_width: args.width,
        window_height: args.height,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let config = SessionConfig::default().with_faults(args.drop_rate, args.fake_latency);

    info!("Starting viewer on {}", args.bind);
    let mut node = NodeThread::spawn(args.bind, args.peers, config);

    let mut view = ViewState::new();
    let mut input = InputManager::new();
    let mut renderer = Renderer::new(screen_width(), screen_height());

    loop {
        match node.poll_status() {
            Some(NodeStatus::Ready(local)) => view.local = Some(local),
            Some(NodeStatus::Failed(reason)) => view.error = Some(reason),
            None => {}
        }

        while let Some(event) = node.bridge.try_next_event() {
            view.apply(event);
        }

        if let Some(direction) = input.update() {
            if view.accepts_input() {
                node.bridge.send_direction(direction);
            }
        }

        if is_key_pressed(KeyCode::Escape) {
            break;
        }

        renderer.resize(screen_width(), screen_height());
        renderer.render(&view);
        next_frame().await;
    }
}
