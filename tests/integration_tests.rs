//! Integration tests for peers gossiping over real loopback sockets
//!
//! These tests start several nodes in one process and let them play.

use peer::bridge::{self, BridgeHandle};
use peer::handoff;
use peer::{Node, Outcome, Session, SessionConfig};
use shared::{decode, encode, Direction, Handoff, Message, PlayerId};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout};

struct Peer {
    node: Node,
    handle: BridgeHandle,
}

/// Binds `count` loopback sockets and builds nodes for the slots in `live`
/// (1-based). The other sockets are returned unused, standing in for
/// crashed peers.
async fn cluster(count: usize, live: &[u8], config: &SessionConfig) -> (Vec<Peer>, Vec<UdpSocket>) {
    let mut sockets = Vec::new();
    for _ in 0..count {
        sockets.push(Node::bind("127.0.0.1:0").await.unwrap());
    }
    let addrs: Vec<SocketAddr> = sockets.iter().map(|s| s.local_addr().unwrap()).collect();
    let handoff = Handoff::from_addrs(&addrs);

    let mut peers = Vec::new();
    let mut silent = Vec::new();
    for (index, socket) in sockets.into_iter().enumerate() {
        if !live.contains(&(index as u8 + 1)) {
            silent.push(socket);
            continue;
        }
        let assignment = handoff::validate(&handoff, addrs[index]).unwrap();
        let session = Session::new(assignment, config, Instant::now());
        let (bridge, handle) = bridge::channel();
        let node = Node::new(socket, session, config.clone(), bridge).unwrap();
        peers.push(Peer { node, handle });
    }
    (peers, silent)
}

/// PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// Tests that a handoff sent over UDP is picked up by a waiting peer
    #[tokio::test]
    async fn handoff_over_udp() {
        let waiting = Node::bind("127.0.0.1:0").await.unwrap();
        let other = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let matchmaker = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let waiting_addr = waiting.local_addr().unwrap();
        let handoff = Handoff::from_addrs(&[other.local_addr().unwrap(), waiting_addr]);
        matchmaker
            .send_to(&encode(&handoff).unwrap(), waiting_addr)
            .await
            .unwrap();

        let received = timeout(Duration::from_secs(2), handoff::await_handoff(&waiting))
            .await
            .unwrap()
            .unwrap();
        let assignment = handoff::validate(&received, waiting_addr).unwrap();
        assert_eq!(assignment.local, PlayerId(2));
    }

    /// Tests that garbage datagrams do not disturb a running node
    #[tokio::test]
    async fn garbage_is_ignored() {
        let config = SessionConfig::from_millis(1000, 20, 10_000, 7).unwrap();
        let (mut peers, silent) = cluster(2, &[1], &config).await;
        let peer = peers.remove(0);
        let session = peer.node.session();
        let target = peer.node.local_addr().unwrap();

        let task = tokio::spawn(peer.node.run());
        silent[0].send_to(&[1, 2, 3], target).await.unwrap();
        sleep(Duration::from_millis(50)).await;

        assert_eq!(session.lock().await.membership().len(), 2);
        task.abort();
    }

    /// Tests that a running leader's gossip decodes and names it
    #[tokio::test]
    async fn leader_announces_itself() {
        let config = SessionConfig::from_millis(1000, 20, 10_000, 7).unwrap();
        let (mut peers, silent) = cluster(2, &[1], &config).await;
        let peer = peers.remove(0);
        let task = tokio::spawn(peer.node.run());

        let mut buffer = [0u8; 2048];
        let (len, _) = timeout(Duration::from_secs(2), silent[0].recv_from(&mut buffer))
            .await
            .unwrap()
            .unwrap();
        let message: Message = decode(&buffer[..len]).unwrap();
        match message {
            Message::LeaderUpdate { sender, members, .. } => {
                assert_eq!(sender.id, PlayerId(1));
                assert_eq!(members, vec![PlayerId(1), PlayerId(2)]);
            }
            other => panic!("expected leader update, got {:?}", other),
        }
        task.abort();
    }
}

/// SESSION TESTS
mod session_tests {
    use super::*;

    /// Two untouched players run into opposite walls on the same tick
    #[tokio::test]
    async fn untouched_game_is_a_draw_everywhere() {
        let config = SessionConfig::from_millis(50, 20, 10_000, 7).unwrap();
        let (mut peers, _silent) = cluster(2, &[1, 2], &config).await;
        let second = peers.remove(1);
        let first = peers.remove(0);

        let (a, b) = timeout(
            Duration::from_secs(5),
            async { tokio::join!(first.node.run(), second.node.run()) },
        )
        .await
        .unwrap();

        assert_eq!(a.unwrap(), Outcome::Draw);
        assert_eq!(b.unwrap(), Outcome::Draw);
        drop((first.handle, second.handle));
    }

    /// A turn made through the bridge reaches the other peer
    #[tokio::test]
    async fn turn_reaches_other_peer() {
        let config = SessionConfig::from_millis(1000, 20, 10_000, 7).unwrap();
        let (mut peers, _silent) = cluster(2, &[1, 2], &config).await;
        let second = peers.remove(1);
        let first = peers.remove(0);
        let remote_view = second.node.session();

        let a = tokio::spawn(first.node.run());
        let b = tokio::spawn(second.node.run());

        assert!(first.handle.send_direction(Direction::Down));
        sleep(Duration::from_millis(200)).await;

        {
            let session = remote_view.lock().await;
            assert_eq!(session.player(PlayerId(1)).unwrap().heading, Direction::Down);
        }
        a.abort();
        b.abort();
    }
}

/// FAILURE TESTS
mod failure_tests {
    use super::*;

    /// A crashed follower is evicted by the leader and then by everyone
    #[tokio::test]
    async fn crashed_follower_is_evicted_everywhere() {
        let config = SessionConfig::from_millis(1000, 20, 10_000, 7).unwrap();
        let (mut peers, _silent) = cluster(3, &[1, 3], &config).await;
        let third = peers.remove(1);
        let first = peers.remove(0);
        let leader_view = first.node.session();
        let follower_view = third.node.session();

        let a = tokio::spawn(first.node.run());
        let b = tokio::spawn(third.node.run());
        sleep(Duration::from_millis(600)).await;

        assert_eq!(
            leader_view.lock().await.membership().ids(),
            vec![PlayerId(1), PlayerId(3)]
        );
        assert_eq!(
            follower_view.lock().await.membership().ids(),
            vec![PlayerId(1), PlayerId(3)]
        );
        a.abort();
        b.abort();
    }

    /// A crashed leader hands the role to the next member
    #[tokio::test]
    async fn crashed_leader_fails_over() {
        let config = SessionConfig::from_millis(1000, 20, 10_000, 7).unwrap();
        let (mut peers, _silent) = cluster(3, &[2, 3], &config).await;
        let third = peers.remove(1);
        let second = peers.remove(0);
        let successor_view = second.node.session();
        let follower_view = third.node.session();

        let a = tokio::spawn(second.node.run());
        let b = tokio::spawn(third.node.run());
        sleep(Duration::from_millis(600)).await;

        {
            let successor = successor_view.lock().await;
            assert!(successor.is_leader());
            assert_eq!(successor.membership().ids(), vec![PlayerId(2), PlayerId(3)]);
        }
        {
            let follower = follower_view.lock().await;
            assert_eq!(follower.leader_id(), Some(PlayerId(2)));
            assert!(!follower.is_leader());
        }
        a.abort();
        b.abort();
    }

    /// The last peer standing wins once the others go silent
    #[tokio::test]
    async fn lone_survivor_wins() {
        let config = SessionConfig::from_millis(1000, 20, 10_000, 7).unwrap();
        let (mut peers, _silent) = cluster(3, &[3], &config).await;
        let survivor = peers.remove(0);

        let outcome = timeout(Duration::from_secs(5), survivor.node.run())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, Outcome::Winner(PlayerId(3)));
    }
}
