//! The session aggregate shared by every loop of a node
//!
//! A [`Session`] owns the membership list, the board and the session
//! lifecycle. All of it sits behind one lock in the running node; every
//! operation here is a synchronous state transition that returns the
//! [`Effects`] the caller must carry out (datagrams to broadcast, events for
//! the UI) once the lock is released.
//!
//! The movement engine, reconciliation and failure detection add their own
//! `impl Session` blocks in `game`, `reconcile` and `failure`.

use crate::bridge::BridgeEvent;
use crate::config::SessionConfig;
use crate::handoff::Assignment;
use crate::membership::Membership;
use log::{debug, info, warn};
use shared::{Board, CellState, Message, Player, PlayerId, Pos};
use std::net::SocketAddr;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Winner(PlayerId),
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    InProgress,
    Concluded(Outcome),
}

/// Work produced by a state transition, to be performed outside the lock.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Effects {
    /// Messages for every other current member
    pub broadcasts: Vec<Message>,
    /// Events for the local UI bridge
    pub events: Vec<BridgeEvent>,
}

impl Effects {
    pub fn is_empty(&self) -> bool {
        self.broadcasts.is_empty() && self.events.is_empty()
    }

    pub fn broadcast(message: Message) -> Self {
        Self {
            broadcasts: vec![message],
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) local: PlayerId,
    pub(crate) membership: Membership,
    pub(crate) board: Board,
    /// Ids evicted here or learned from a leader, announced while leading
    pub(crate) evicted: Vec<PlayerId>,
    /// Remote players our own simulation crashed, frozen in place until the
    /// leader or the player itself confirms the death
    pub(crate) stalled: Vec<PlayerId>,
    pub(crate) status: SessionStatus,
    pub(crate) ticks: u64,
    pub(crate) leader_history_depth: usize,
    pub(crate) local_history_depth: usize,
}

impl Session {
    pub fn new(assignment: Assignment, config: &SessionConfig, now: Instant) -> Self {
        let mut board = Board::new();
        for player in &assignment.players {
            board.set(player.pos, player.head_cell());
        }

        info!(
            "Session starting as {} with {} players",
            assignment.local,
            assignment.players.len()
        );

        Self {
            local: assignment.local,
            membership: Membership::from_players(assignment.players, now),
            board,
            evicted: Vec::new(),
            stalled: Vec::new(),
            status: SessionStatus::InProgress,
            ticks: 0,
            leader_history_depth: config.leader_history_depth,
            local_history_depth: config.local_history_depth,
        }
    }

    pub fn local_id(&self) -> PlayerId {
        self.local
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.membership.get(self.local).map(|member| &member.player)
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.membership.get(id).map(|member| &member.player)
    }

    pub fn membership(&self) -> &Membership {
        &self.membership
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.status {
            SessionStatus::InProgress => None,
            SessionStatus::Concluded(outcome) => Some(outcome),
        }
    }

    pub fn is_concluded(&self) -> bool {
        self.outcome().is_some()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn evicted(&self) -> &[PlayerId] {
        &self.evicted
    }

    pub fn is_stalled(&self, id: PlayerId) -> bool {
        self.stalled.contains(&id)
    }

    /// Whether this peer currently holds the leader role. Every leader-only
    /// decision goes through here, at the time it is made.
    pub fn is_leader(&self) -> bool {
        self.membership.is_leader(self.local)
    }

    pub fn leader_id(&self) -> Option<PlayerId> {
        self.membership.leader().map(|leader| leader.id())
    }

    pub fn alive_count(&self) -> usize {
        self.membership.alive_count()
    }

    pub fn peer_addrs(&self) -> Vec<SocketAddr> {
        self.membership.peer_addrs(self.local)
    }

    pub fn snapshot(&self) -> BridgeEvent {
        BridgeEvent::BoardSnapshot(self.board.clone())
    }

    /// The periodic self announcement. Leaders fold in their pending
    /// evictions.
    pub fn routine_update(&mut self) -> Option<Message> {
        if self.is_leader() {
            self.prune_evictions();
        }

        let sender = self.local_player()?.clone();
        let members = self.membership.ids();

        let message = if self.is_leader() {
            Message::LeaderUpdate {
                sender,
                members,
                evicted: self.evicted.clone(),
            }
        } else {
            Message::RoutineUpdate { sender, members }
        };
        Some(message)
    }

    /// Applies one inbound message.
    pub fn handle_message(&mut self, message: Message, now: Instant) -> Effects {
        let mut effects = Effects::default();
        if self.is_concluded() {
            return effects;
        }

        let sender_id = message.sender().id;
        if sender_id == self.local {
            debug!("Ignoring {} echoed back to us", message.kind());
            return effects;
        }
        if !self.membership.touch(sender_id, now) {
            debug!("Ignoring {} from non-member {}", message.kind(), sender_id);
            return effects;
        }

        match message {
            Message::RoutineUpdate { sender, members } => {
                self.membership.record_view(sender.id, members);
                self.merge_remote(&sender, &mut effects);
            }
            Message::DirectionChange { sender } => {
                debug!("{} turned {:?} at {}", sender.id, sender.heading, sender.pos);
                self.merge_remote(&sender, &mut effects);
            }
            Message::LeaderUpdate {
                sender,
                members,
                evicted,
            } => {
                self.membership.record_view(sender.id, members);
                if self.accepts_authority(sender.id, &evicted) {
                    for id in evicted {
                        if id != sender.id {
                            self.evict(id);
                        }
                    }
                } else {
                    debug!(
                        "{} claims leadership but {:?} are still ahead of it",
                        sender.id,
                        self.membership.ahead_of(sender.id)
                    );
                }
                self.merge_remote(&sender, &mut effects);
            }
            Message::LeaderReconciliation { sender, history } => {
                if self.membership.is_leader(sender.id) {
                    self.apply_reconciliation(&history);
                } else {
                    debug!("Ignoring reconciliation from non-leader {}", sender.id);
                }
            }
            Message::DeathReport { sender, casualties } => {
                if self.membership.is_leader(sender.id) {
                    debug!("Death report from {}: {:?}", sender.id, casualties);
                    for casualty in casualties {
                        self.mark_dead(casualty.id, casualty.at, &mut effects);
                    }
                } else {
                    debug!("Ignoring death report from non-leader {}", sender.id);
                }
            }
        }

        self.evaluate_outcome(&mut effects);
        effects
    }

    /// A sender can act as leader once everyone ahead of it in our list is
    /// gone or being evicted by that very message.
    fn accepts_authority(&self, sender: PlayerId, evicted: &[PlayerId]) -> bool {
        self.membership
            .ahead_of(sender)
            .iter()
            .all(|id| evicted.contains(id))
    }

    /// Folds a remote player's own snapshot into our copy.
    fn merge_remote(&mut self, reported: &Player, effects: &mut Effects) {
        let Some(member) = self.membership.get(reported.id) else {
            return;
        };
        if !member.player.alive {
            return;
        }

        if !reported.alive {
            self.mark_dead(reported.id, reported.pos, effects);
            return;
        }

        if member.player.heading != reported.heading {
            self.backfill(reported);
        }
    }

    /// Alive -> Dead for `id`, leaving its dead marker at `at`. Returns false
    /// if the player is unknown or already dead.
    pub(crate) fn mark_dead(&mut self, id: PlayerId, at: Pos, effects: &mut Effects) -> bool {
        let Some(member) = self.membership.get_mut(id) else {
            debug!("Death of unknown player {} ignored", id);
            return false;
        };
        if !member.player.alive {
            return false;
        }

        member.player.alive = false;
        let previous = member.player.pos;
        if at.in_bounds() {
            member.player.pos = at;
        }
        let marker = member.player.pos;

        if previous != marker && self.board.get(previous) == CellState::Head(id) {
            self.board.set(previous, CellState::Trail(id));
        }
        self.board.set(marker, CellState::Dead(id));
        self.stalled.retain(|stalled| *stalled != id);

        info!(
            "Player {} died at {} ({} alive)",
            id,
            marker,
            self.membership.alive_count()
        );
        effects.events.push(BridgeEvent::PlayerDead(id));
        true
    }

    /// Permanently removes a member. The local player is never evicted.
    pub fn evict(&mut self, id: PlayerId) -> bool {
        if id == self.local {
            warn!("Refusing to evict ourselves ({})", id);
            return false;
        }

        let Some(member) = self.membership.remove(id) else {
            return false;
        };

        let head = member.player.pos;
        if self.board.get(head) == CellState::Head(id) {
            self.board.set(head, CellState::Dead(id));
        }
        if !self.evicted.contains(&id) {
            self.evicted.push(id);
        }
        self.stalled.retain(|stalled| *stalled != id);

        info!(
            "Evicted {}; leader is now {:?}",
            id,
            self.leader_id().map(|leader| leader.to_string())
        );
        true
    }

    /// Concludes the session once at most one player is left standing.
    /// Nothing is decided while a predicted crash awaits confirmation.
    pub(crate) fn evaluate_outcome(&mut self, effects: &mut Effects) {
        if self.is_concluded() {
            return;
        }
        if !self.stalled.is_empty() {
            debug!("Outcome waits on unconfirmed crashes of {:?}", self.stalled);
            return;
        }

        let alive = self.membership.alive_ids();
        match alive.as_slice() {
            [winner] => {
                info!("Player {} wins", winner);
                self.status = SessionStatus::Concluded(Outcome::Winner(*winner));
                effects.events.push(BridgeEvent::PlayerVictory(*winner));
            }
            [] => {
                info!("Nobody left alive, the session is a draw");
                self.status = SessionStatus::Concluded(Outcome::Draw);
                effects.events.push(BridgeEvent::SessionDraw);
            }
            _ => {}
        }
    }
}
