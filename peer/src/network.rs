//! Node network layer handling UDP gossip and the session's periodic loops

use crate::bridge::{self, Bridge, BridgeEvent, BridgeInput};
use crate::config::SessionConfig;
use crate::error::PeerError;
use crate::session::{Effects, Outcome, Session};
use log::{debug, error, info, warn};
use shared::{decode, encode, Message};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};

/// Messages queued for the sender task
#[derive(Debug)]
pub enum Outgoing {
    Broadcast {
        message: Message,
        peers: Vec<SocketAddr>,
    },
}

/// Carries a transition's effects out of the session lock.
#[derive(Debug, Clone)]
struct Dispatcher {
    outgoing: mpsc::UnboundedSender<Outgoing>,
    events: mpsc::UnboundedSender<BridgeEvent>,
}

impl Dispatcher {
    fn deliver(&self, effects: Effects, peers: &[SocketAddr]) {
        for message in effects.broadcasts {
            self.broadcast(message, peers);
        }
        bridge::publish(&self.events, effects.events);
    }

    fn broadcast(&self, message: Message, peers: &[SocketAddr]) {
        if peers.is_empty() {
            return;
        }
        if let Err(e) = self.outgoing.send(Outgoing::Broadcast {
            message,
            peers: peers.to_vec(),
        }) {
            error!("Failed to queue broadcast: {}", e);
        }
    }
}

/// One peer of a running session
pub struct Node {
    socket: Arc<UdpSocket>,
    session: Arc<Mutex<Session>>,
    config: SessionConfig,
    dispatcher: Dispatcher,
    outgoing_rx: mpsc::UnboundedReceiver<Outgoing>,
    input_rx: mpsc::UnboundedReceiver<BridgeInput>,
}

impl Node {
    /// Binds the gossip socket.
    pub async fn bind(addr: &str) -> Result<UdpSocket, PeerError> {
        let socket = UdpSocket::bind(addr).await.map_err(|source| PeerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        info!("Listening for gossip on {}", socket.local_addr()?);
        Ok(socket)
    }

    pub fn new(
        socket: UdpSocket,
        session: Session,
        config: SessionConfig,
        bridge: Bridge,
    ) -> Result<Self, PeerError> {
        config.validate()?;

        let (events, input_rx) = bridge.split();
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();

        Ok(Node {
            socket: Arc::new(socket),
            session: Arc::new(Mutex::new(session)),
            config,
            dispatcher: Dispatcher {
                outgoing: outgoing_tx,
                events,
            },
            outgoing_rx,
            input_rx,
        })
    }

    /// Shared handle to the session, for inspection while the node runs.
    pub fn session(&self) -> Arc<Mutex<Session>> {
        Arc::clone(&self.session)
    }

    pub fn local_addr(&self) -> Result<SocketAddr, PeerError> {
        Ok(self.socket.local_addr()?)
    }

    /// Runs the session to its conclusion.
    pub async fn run(self) -> Result<Outcome, PeerError> {
        let Node {
            socket,
            session,
            config,
            dispatcher,
            outgoing_rx,
            input_rx,
        } = self;

        {
            let session = session.lock().await;
            info!(
                "Node {} running with {} members, leader {:?}",
                session.local_id(),
                session.membership().len(),
                session.leader_id().map(|id| id.to_string())
            );
            bridge::publish(&dispatcher.events, vec![session.snapshot()]);
        }

        let receiver = spawn_network_receiver(&socket, &session, &dispatcher);
        let sender = spawn_network_sender(&socket, outgoing_rx, &config);
        let input = spawn_input_listener(input_rx, &session, &dispatcher);

        let loops = Loops {
            session: &session,
            dispatcher: &dispatcher,
            config: &config,
        };
        let (outcome, _, _, _) = tokio::join!(
            loops.tick_loop(),
            loops.update_loop(),
            loops.reconcile_loop(),
            loops.failure_loop()
        );
        info!("Session concluded: {:?}", outcome);

        {
            let session = session.lock().await;
            bridge::publish(&dispatcher.events, vec![session.snapshot()]);
        }

        receiver.abort();
        input.abort();
        let _ = receiver.await;
        let _ = input.await;

        // The sender exits once the last queue handle is gone, after flushing.
        drop(dispatcher);
        if tokio::time::timeout(Duration::from_secs(1), sender).await.is_err() {
            warn!("Outgoing queue not drained before shutdown");
        }

        Ok(outcome)
    }
}

/// Spawns task that continuously listens for incoming gossip
fn spawn_network_receiver(
    socket: &Arc<UdpSocket>,
    session: &Arc<Mutex<Session>>,
    dispatcher: &Dispatcher,
) -> JoinHandle<()> {
    let socket = Arc::clone(socket);
    let session = Arc::clone(session);
    let dispatcher = dispatcher.clone();

    tokio::spawn(async move {
        let mut buffer = [0u8; 2048];

        loop {
            match socket.recv_from(&mut buffer).await {
                Ok((len, addr)) => match decode::<Message>(&buffer[..len]) {
                    Ok(message) => {
                        debug!("Received {} from {}", message.kind(), addr);
                        let (effects, peers) = {
                            let mut session = session.lock().await;
                            let effects = session.handle_message(message, Instant::now());
                            (effects, session.peer_addrs())
                        };
                        dispatcher.deliver(effects, &peers);
                    }
                    Err(e) => warn!("Failed to decode datagram from {}: {}", addr, e),
                },
                Err(e) => {
                    error!("Error receiving datagram: {}", e);
                    sleep(Duration::from_millis(10)).await;
                }
            }
        }
    })
}

/// Spawns task that drains the outgoing queue onto the socket
fn spawn_network_sender(
    socket: &Arc<UdpSocket>,
    mut outgoing_rx: mpsc::UnboundedReceiver<Outgoing>,
    config: &SessionConfig,
) -> JoinHandle<()> {
    let socket = Arc::clone(socket);
    let drop_rate = config.drop_rate;
    let fake_latency = Duration::from_millis(config.fake_latency_ms);

    tokio::spawn(async move {
        while let Some(Outgoing::Broadcast { message, peers }) = outgoing_rx.recv().await {
            let data = match encode(&message) {
                Ok(data) => data,
                Err(e) => {
                    error!("Failed to encode {}: {}", message.kind(), e);
                    continue;
                }
            };

            if !fake_latency.is_zero() {
                sleep(fake_latency).await;
            }

            for addr in peers {
                if drop_rate > 0.0 && rand::random::<f64>() < drop_rate {
                    debug!("Dropping {} to {}", message.kind(), addr);
                    continue;
                }
                if let Err(e) = socket.send_to(&data, addr).await {
                    warn!("Failed to send {} to {}: {}", message.kind(), addr, e);
                }
            }
        }
    })
}

/// Spawns task that turns UI input into direction changes
fn spawn_input_listener(
    mut input_rx: mpsc::UnboundedReceiver<BridgeInput>,
    session: &Arc<Mutex<Session>>,
    dispatcher: &Dispatcher,
) -> JoinHandle<()> {
    let session = Arc::clone(session);
    let dispatcher = dispatcher.clone();

    tokio::spawn(async move {
        while let Some(BridgeInput::LocalDirectionChange(direction)) = input_rx.recv().await {
            let (message, peers) = {
                let mut session = session.lock().await;
                (session.change_direction(direction), session.peer_addrs())
            };
            if let Some(message) = message {
                dispatcher.broadcast(message, &peers);
            }
        }
    })
}

/// The four periodic loops. Each one returns the outcome as soon as it sees
/// the session concluded.
struct Loops<'a> {
    session: &'a Arc<Mutex<Session>>,
    dispatcher: &'a Dispatcher,
    config: &'a SessionConfig,
}

impl Loops<'_> {
    async fn tick_loop(&self) -> Outcome {
        let mut timer = interval(self.config.tick_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        timer.tick().await;

        loop {
            timer.tick().await;
            let (effects, peers, outcome) = {
                let mut session = self.session.lock().await;
                let effects = session.tick();
                (effects, session.peer_addrs(), session.outcome())
            };
            self.dispatcher.deliver(effects, &peers);
            if let Some(outcome) = outcome {
                return outcome;
            }
        }
    }

    async fn update_loop(&self) -> Outcome {
        let mut timer = interval(self.config.update_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            timer.tick().await;
            let (message, peers) = {
                let mut session = self.session.lock().await;
                if let Some(outcome) = session.outcome() {
                    return outcome;
                }
                (session.routine_update(), session.peer_addrs())
            };
            if let Some(message) = message {
                self.dispatcher.broadcast(message, &peers);
            }
        }
    }

    async fn reconcile_loop(&self) -> Outcome {
        let mut timer = interval(self.config.reconcile_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        timer.tick().await;

        loop {
            timer.tick().await;
            let (message, peers) = {
                let session = self.session.lock().await;
                if let Some(outcome) = session.outcome() {
                    return outcome;
                }
                (session.reconciliation(), session.peer_addrs())
            };
            if let Some(message) = message {
                self.dispatcher.broadcast(message, &peers);
            }
        }
    }

    async fn failure_loop(&self) -> Outcome {
        let mut timer = interval(self.config.update_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        timer.tick().await;

        loop {
            timer.tick().await;
            let (effects, peers, outcome) = {
                let mut session = self.session.lock().await;
                let effects =
                    session.detect_failures(Instant::now(), self.config.failure_threshold);
                (effects, session.peer_addrs(), session.outcome())
            };
            self.dispatcher.deliver(effects, &peers);
            if let Some(outcome) = outcome {
                return outcome;
            }
        }
    }
}
