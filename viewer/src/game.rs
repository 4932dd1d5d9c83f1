//! What the viewer knows about the session, rebuilt from bridge events

use log::info;
use peer::{BridgeEvent, Outcome};
use shared::{Board, PlayerId, Pos, TrailHistory};

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    /// Our slot, once matchmaking has placed us
    pub local: Option<PlayerId>,
    pub board: Board,
    /// Latest cells of every member, from the node's short trail cache
    pub recent: Vec<TrailHistory>,
    pub dead: Vec<PlayerId>,
    pub outcome: Option<Outcome>,
    /// Setup failure reported by the node thread
    pub error: Option<String>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: BridgeEvent) {
        match event {
            BridgeEvent::BoardSnapshot(board) => self.board = board,
            BridgeEvent::RecentTrails(recent) => self.recent = recent,
            BridgeEvent::PlayerDead(id) => {
                if !self.dead.contains(&id) {
                    self.dead.push(id);
                }
            }
            BridgeEvent::PlayerVictory(id) => {
                info!("{} won the session", id);
                self.outcome = Some(Outcome::Winner(id));
            }
            BridgeEvent::SessionDraw => {
                info!("Session ended in a draw");
                self.outcome = Some(Outcome::Draw);
            }
        }
    }

    pub fn is_recent(&self, pos: Pos) -> bool {
        self.recent.iter().any(|trail| trail.positions.contains(&pos))
    }

    pub fn is_dead(&self, id: PlayerId) -> bool {
        self.dead.contains(&id)
    }

    /// Whether steering input still means anything.
    pub fn accepts_input(&self) -> bool {
        match self.local {
            Some(local) => self.outcome.is_none() && !self.is_dead(local),
            None => false,
        }
    }
}
