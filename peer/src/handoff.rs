//! Matchmaking handoff: turning a room assignment into a starting roster.

use crate::error::PeerError;
use log::{info, warn};
use shared::{decode, Handoff, Player, PlayerId, MAX_PLAYERS, MIN_PLAYERS};
use std::collections::HashSet;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// A validated roster and which entry is us.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub local: PlayerId,
    /// Players at their spawn points, in join order
    pub players: Vec<Player>,
}

/// Checks a handoff and spawns its players.
pub fn validate(handoff: &Handoff, local_addr: SocketAddr) -> Result<Assignment, PeerError> {
    let count = handoff.roster.len();
    if count > MAX_PLAYERS {
        return Err(PeerError::TooManyPlayers {
            count,
            max: MAX_PLAYERS,
        });
    }
    if count < MIN_PLAYERS {
        return Err(PeerError::TooFewPlayers {
            count,
            min: MIN_PLAYERS,
        });
    }

    let mut ids = HashSet::new();
    let mut addrs = HashSet::new();
    let mut players = Vec::with_capacity(count);
    for entry in &handoff.roster {
        if !ids.insert(entry.id) {
            return Err(PeerError::InvalidRoster {
                reason: format!("{} appears twice", entry.id),
            });
        }
        if !addrs.insert(entry.addr) {
            return Err(PeerError::InvalidRoster {
                reason: format!("address {} appears twice", entry.addr),
            });
        }
        let player = Player::spawn(entry.id, entry.addr).ok_or_else(|| PeerError::InvalidRoster {
            reason: format!("{} has no spawn point", entry.id),
        })?;
        players.push(player);
    }

    let local = handoff
        .roster
        .iter()
        .find(|entry| entry.addr == local_addr)
        .map(|entry| entry.id)
        .ok_or(PeerError::NotInRoster { local: local_addr })?;

    Ok(Assignment { local, players })
}

/// Waits on the gossip socket for the matchmaker's handoff. Datagrams that
/// are not a handoff are logged and skipped.
pub async fn await_handoff(socket: &UdpSocket) -> Result<Handoff, PeerError> {
    let mut buffer = [0u8; 2048];
    loop {
        let (len, from) = socket.recv_from(&mut buffer).await?;
        match decode::<Handoff>(&buffer[..len]) {
            Ok(handoff) => {
                info!(
                    "Received handoff from {} with {} players",
                    from,
                    handoff.roster.len()
                );
                return Ok(handoff);
            }
            Err(e) => warn!("Ignoring datagram from {} while waiting for handoff: {}", from, e),
        }
    }
}
