//! Runs a peer node on its own thread so the render loop never blocks

use log::{error, info};
use peer::bridge::{self, Bridge, BridgeHandle};
use peer::handoff::{self, await_handoff};
use peer::{Node, Outcome, PeerError, Session, SessionConfig};
use shared::{Handoff, PlayerId};
use std::net::SocketAddr;
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

/// Startup report from the node thread
#[derive(Debug, Clone, PartialEq)]
pub enum NodeStatus {
    Ready(PlayerId),
    Failed(String),
}

pub struct NodeThread {
    pub bridge: BridgeHandle,
    status: mpsc::Receiver<NodeStatus>,
    _thread: thread::JoinHandle<()>,
}

impl NodeThread {
    /// Starts a node bound to `bind`. With an empty `peers` list it waits
    /// for a matchmaker handoff first.
    pub fn spawn(bind: String, peers: Vec<SocketAddr>, config: SessionConfig) -> Self {
        let (node_side, bridge) = bridge::channel();
        let (status_tx, status) = mpsc::channel();

        let thread = thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = status_tx.send(NodeStatus::Failed(e.to_string()));
                    return;
                }
            };

            let ready = status_tx.clone();
            let result = runtime.block_on(run_node(bind, peers, config, node_side, ready));
            match result {
                Ok(outcome) => info!("Node finished: {:?}", outcome),
                Err(e) => {
                    error!("Node failed: {}", e);
                    let _ = status_tx.send(NodeStatus::Failed(e.to_string()));
                }
            }
        });

        Self {
            bridge,
            status,
            _thread: thread,
        }
    }

    /// Non-blocking check for a startup report.
    pub fn poll_status(&self) -> Option<NodeStatus> {
        self.status.try_recv().ok()
    }
}

async fn run_node(
    bind: String,
    peers: Vec<SocketAddr>,
    config: SessionConfig,
    bridge: Bridge,
    ready: mpsc::Sender<NodeStatus>,
) -> Result<Outcome, PeerError> {
    config.validate()?;
    let socket = Node::bind(&bind).await?;
    let local_addr = socket.local_addr()?;

    let handoff = if peers.is_empty() {
        info!("Waiting for matchmaker handoff on {}", local_addr);
        await_handoff(&socket).await?
    } else {
        Handoff::from_addrs(&peers)
    };
    let assignment = handoff::validate(&handoff, local_addr)?;
    let _ = ready.send(NodeStatus::Ready(assignment.local));

    let session = Session::new(assignment, &config, Instant::now());
    Node::new(socket, session, config, bridge)?.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_bad_roster_is_reported() {
        let stranger: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let other: SocketAddr = "127.0.0.1:10".parse().unwrap();
        let node = NodeThread::spawn(
            "127.0.0.1:0".to_string(),
            vec![stranger, other],
            SessionConfig::default(),
        );

        let status = node.status.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(status, NodeStatus::Failed(reason) if reason.contains("not in the roster")));
    }
}
