//! Leader reconciliation.
//!
//! The leader periodically walks every member's trail on its own board and
//! broadcasts the result. Followers overwrite their copy of each remote
//! player with it. The local player's own cells are left alone: each peer is
//! the authority on itself.

use crate::session::Session;
use log::debug;
use shared::{CellState, Direction, Message, PlayerId, Pos, TrailHistory};

impl Session {
    /// Most-recent-first positions of `id` on our board, head included.
    pub fn trail_history(&self, id: PlayerId, depth: usize) -> Option<TrailHistory> {
        let player = self.player(id)?;
        Some(TrailHistory {
            id,
            positions: self.board.trail_from(player.pos, id, depth),
        })
    }

    /// Short per-member histories kept for rendering on every peer.
    pub fn local_histories(&self) -> Vec<TrailHistory> {
        self.membership
            .iter()
            .filter_map(|member| self.trail_history(member.id(), self.local_history_depth))
            .collect()
    }

    /// The reconciliation broadcast, if we currently lead.
    pub fn reconciliation(&self) -> Option<Message> {
        if !self.is_leader() || self.is_concluded() {
            return None;
        }

        let sender = self.local_player()?.clone();
        let history = self
            .membership
            .iter()
            .filter_map(|member| self.trail_history(member.id(), self.leader_history_depth))
            .collect();
        Some(Message::LeaderReconciliation { sender, history })
    }

    /// Overwrites our copy of every remote player listed by the leader.
    /// Applying the same history twice changes nothing the second time. A
    /// player we froze after a predicted crash moves again once the leader
    /// shows its head somewhere else.
    pub(crate) fn apply_reconciliation(&mut self, history: &[TrailHistory]) {
        for entry in history {
            if entry.id == self.local {
                continue;
            }
            let Some(&head) = entry.positions.first() else {
                continue;
            };
            if entry.positions.iter().any(|pos| !pos.in_bounds()) {
                debug!("Dropping off-board history for {}", entry.id);
                continue;
            }
            let Some(player) = self.player(entry.id) else {
                debug!("Dropping history for non-member {}", entry.id);
                continue;
            };

            let head_cell = player.head_cell();
            let previous = player.pos;
            let depth = self.local_history_depth.max(entry.positions.len());
            let local_walk = self.board.trail_from(player.pos, entry.id, depth);
            if local_walk == entry.positions {
                continue;
            }

            debug!(
                "Reconciling {}: {:?} -> {:?}",
                entry.id, local_walk, entry.positions
            );
            for pos in local_walk
                .iter()
                .filter(|pos| !entry.positions.contains(pos))
            {
                self.board.clear_if_owned(*pos, entry.id);
            }
            for (index, pos) in entry.positions.iter().enumerate() {
                if self.is_local_head(*pos) {
                    continue;
                }
                let cell = if index == 0 {
                    head_cell
                } else {
                    CellState::Trail(entry.id)
                };
                self.board.set(*pos, cell);
            }

            let heading = entry
                .positions
                .get(1)
                .and_then(|previous| heading_between(*previous, head));
            if let Some(member) = self.membership.get_mut(entry.id) {
                member.player.pos = head;
                if let Some(heading) = heading {
                    member.player.heading = heading;
                }
            }
            if head != previous {
                self.stalled.retain(|stalled| *stalled != entry.id);
            }
        }
    }

    fn is_local_head(&self, pos: Pos) -> bool {
        matches!(
            self.board.get(pos),
            CellState::Head(id) | CellState::Dead(id) if id == self.local
        )
    }
}

/// The heading that takes one step from `from` to `to`.
fn heading_between(from: Pos, to: Pos) -> Option<Direction> {
    [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ]
    .into_iter()
    .find(|direction| from.step(*direction) == Some(to))
}
