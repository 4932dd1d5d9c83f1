//! Movement, collision and turn back-fill.
//!
//! Every peer runs the same deterministic pass on its own copy of the board;
//! the leader's reconciliation pulls copies back together when they drift.

use crate::bridge::BridgeEvent;
use crate::session::{Effects, Session};
use log::{debug, info};
use shared::{Casualty, CellState, Direction, Message, Player, PlayerId, Pos};

impl Session {
    /// Advances every alive player one cell.
    ///
    /// All candidate cells are computed before anything moves, so players
    /// meeting head-on or entering the same cell die together. Only the
    /// leader turns a remote player's crash into a death; a follower freezes
    /// that player's head until the leader or the player itself confirms it.
    pub fn tick(&mut self) -> Effects {
        let mut effects = Effects::default();
        if self.is_concluded() {
            return effects;
        }
        self.ticks += 1;

        let leading = self.is_leader();
        let movers: Vec<(PlayerId, Pos, Option<Pos>)> = self
            .membership
            .iter()
            .filter(|member| member.player.alive && !self.stalled.contains(&member.id()))
            .map(|member| {
                let player = &member.player;
                (player.id, player.pos, player.pos.step(player.heading))
            })
            .collect();

        for (id, pos, _) in &movers {
            self.board.set(*pos, CellState::Trail(*id));
        }

        let mut casualties = Vec::new();
        let mut moves = Vec::new();
        let mut stalls = Vec::new();
        for (id, pos, candidate) in &movers {
            let collided = match candidate {
                None => true,
                Some(cell) => {
                    !self.board.is_free(*cell)
                        || movers
                            .iter()
                            .any(|(other, _, theirs)| other != id && theirs.as_ref() == Some(cell))
                }
            };

            match candidate {
                Some(cell) if !collided => moves.push((*id, *cell)),
                _ if leading || *id == self.local => casualties.push(Casualty { id: *id, at: *pos }),
                _ => stalls.push((*id, *pos)),
            }
        }

        for (id, cell) in moves {
            self.board.set(cell, CellState::Head(id));
            if let Some(member) = self.membership.get_mut(id) {
                member.player.pos = cell;
            }
        }

        for (id, pos) in stalls {
            debug!("{} looks crashed at {}, holding it for the leader", id, pos);
            self.board.set(pos, CellState::Head(id));
            self.stalled.push(id);
        }

        if leading {
            // Crashes we predicted before taking over are ours to confirm.
            for id in std::mem::take(&mut self.stalled) {
                if let Some(player) = self.player(id) {
                    casualties.push(Casualty { id, at: player.pos });
                }
            }
        }

        for casualty in &casualties {
            debug!("{} crashed at {} on tick {}", casualty.id, casualty.at, self.ticks);
            self.mark_dead(casualty.id, casualty.at, &mut effects);
        }

        if !casualties.is_empty() && leading {
            if let Some(sender) = self.local_player().cloned() {
                effects
                    .broadcasts
                    .push(Message::DeathReport { sender, casualties });
            }
        }

        self.evaluate_outcome(&mut effects);
        effects.events.push(BridgeEvent::BoardSnapshot(self.board.clone()));
        effects.events.push(BridgeEvent::RecentTrails(self.local_histories()));
        debug!("Board after tick {}:\n{}", self.ticks, self.board);
        effects
    }

    /// Turns the local player. Returns the announcement to broadcast right
    /// away, or `None` if nothing changed.
    pub fn change_direction(&mut self, direction: Direction) -> Option<Message> {
        if self.is_concluded() {
            return None;
        }

        let member = self.membership.get_mut(self.local)?;
        if !member.player.alive || member.player.heading == direction {
            return None;
        }

        member.player.heading = direction;
        info!("Turning {:?} at {}", direction, member.player.pos);
        Some(Message::DirectionChange {
            sender: member.player.clone(),
        })
    }

    /// Re-draws a remote player's path after learning it turned somewhere
    /// other than where our copy predicted.
    ///
    /// The path runs from our predicted head along the old heading's axis to
    /// the corner shared with the reported position, then along the new axis
    /// to the reported position. Cells predicted past the corner are erased.
    /// Cells owned by other players are never touched.
    pub(crate) fn backfill(&mut self, reported: &Player) {
        let id = reported.id;
        if id == self.local || !reported.pos.in_bounds() {
            return;
        }
        let Some(member) = self.membership.get(id) else {
            return;
        };

        let from = member.player.pos;
        let old = member.player.heading;
        let target = reported.pos;
        if let Some(holder) = self.board.get(target).owner().filter(|owner| *owner != id) {
            debug!(
                "{} reported at {}, which {} holds here; waiting for reconciliation",
                id, target, holder
            );
            return;
        }
        let corner = if old.is_vertical() {
            Pos::new(from.x, target.y)
        } else {
            Pos::new(target.x, from.y)
        };

        let (dx, dy) = old.delta();
        let overshot = (corner.x - from.x) * dx + (corner.y - from.y) * dy < 0;

        for pos in segment(from, corner) {
            if overshot {
                self.board.clear_if_owned(pos, id);
            } else {
                self.paint(pos, CellState::Trail(id));
            }
        }
        for pos in segment(corner, target) {
            self.paint(pos, CellState::Trail(id));
        }
        self.paint(target, CellState::Head(id));

        debug!(
            "Back-filled {} from {} via {} to {} heading {:?}",
            id, from, corner, target, reported.heading
        );

        if let Some(member) = self.membership.get_mut(id) {
            member.player.pos = target;
            member.player.heading = reported.heading;
        }
        self.stalled.retain(|stalled| *stalled != id);
    }

    /// Writes `cell` unless the position belongs to another player.
    fn paint(&mut self, pos: Pos, cell: CellState) {
        let current = self.board.get(pos);
        let free = match cell.owner() {
            Some(owner) => current.is_empty() || current.is_owned_by(owner),
            None => current.is_empty(),
        };
        if free {
            self.board.set(pos, cell);
        }
    }
}

/// Cells from `from` toward `to` along one axis, excluding `to`.
fn segment(from: Pos, to: Pos) -> Vec<Pos> {
    let step_x = (to.x - from.x).signum();
    let step_y = (to.y - from.y).signum();
    let mut cells = Vec::new();
    let mut current = from;
    while current != to {
        cells.push(current);
        current = Pos::new(current.x + step_x, current.y + step_y);
    }
    cells
}
