use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

mod board;

pub use board::{Board, CellState};

pub const BOARD_SIZE: usize = 10;
pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 6;
/// Positions per player in a leader reconciliation, head included.
pub const LEADER_HISTORY_DEPTH: usize = 7;
/// Positions per player in a non-leader's local trail cache.
pub const LOCAL_HISTORY_DEPTH: usize = 5;
/// Largest encoded message we are willing to put in one datagram.
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Player slot label, `p1`..`p6`. The slot is the join order handed out by
/// matchmaking and picks the spawn point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    pub fn slot(&self) -> u8 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        (1..=MAX_PLAYERS as u8).contains(&self.0)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn in_bounds(&self) -> bool {
        let size = BOARD_SIZE as i32;
        (0..size).contains(&self.x) && (0..size).contains(&self.y)
    }

    /// The neighboring cell in `direction`, or `None` when that would leave
    /// the board.
    pub fn step(&self, direction: Direction) -> Option<Pos> {
        let (dx, dy) = direction.delta();
        let next = Pos::new(self.x + dx, self.y + dy);
        next.in_bounds().then_some(next)
    }

    /// Orthogonal neighbors in walk order: up, down, left, right.
    pub fn neighbors(&self) -> impl Iterator<Item = Pos> + '_ {
        [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ]
        .into_iter()
        .filter_map(move |direction| self.step(direction))
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn is_vertical(&self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }
}

/// Spawn cell and initial heading for a slot.
pub fn spawn_point(id: PlayerId) -> Option<(Pos, Direction)> {
    let spawn = match id.slot() {
        1 => (Pos::new(1, 1), Direction::Right),
        2 => (Pos::new(8, 8), Direction::Left),
        3 => (Pos::new(1, 8), Direction::Right),
        4 => (Pos::new(8, 1), Direction::Left),
        5 => (Pos::new(1, 4), Direction::Right),
        6 => (Pos::new(8, 5), Direction::Left),
        _ => return None,
    };
    Some(spawn)
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub addr: SocketAddr,
    pub pos: Pos,
    pub heading: Direction,
    pub alive: bool,
}

impl Player {
    pub fn new(id: PlayerId, addr: SocketAddr, pos: Pos, heading: Direction) -> Self {
        Self {
            id,
            addr,
            pos,
            heading,
            alive: true,
        }
    }

    /// A live player at the slot's spawn point.
    pub fn spawn(id: PlayerId, addr: SocketAddr) -> Option<Self> {
        spawn_point(id).map(|(pos, heading)| Player::new(id, addr, pos, heading))
    }

    /// Board label for this player's head cell.
    pub fn head_cell(&self) -> CellState {
        if self.alive {
            CellState::Head(self.id)
        } else {
            CellState::Dead(self.id)
        }
    }
}

/// Recent positions of one player, most recent first.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TrailHistory {
    pub id: PlayerId,
    pub positions: Vec<Pos>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Casualty {
    pub id: PlayerId,
    pub at: Pos,
}

/// Gossip unit exchanged between peers. Every variant carries the sender's
/// own snapshot so that a single message is enough to act on.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Message {
    RoutineUpdate {
        sender: Player,
        members: Vec<PlayerId>,
    },
    DirectionChange {
        sender: Player,
    },
    LeaderUpdate {
        sender: Player,
        members: Vec<PlayerId>,
        evicted: Vec<PlayerId>,
    },
    LeaderReconciliation {
        sender: Player,
        history: Vec<TrailHistory>,
    },
    DeathReport {
        sender: Player,
        casualties: Vec<Casualty>,
    },
}

impl Message {
    pub fn sender(&self) -> &Player {
        match self {
            Message::RoutineUpdate { sender, .. }
            | Message::DirectionChange { sender }
            | Message::LeaderUpdate { sender, .. }
            | Message::LeaderReconciliation { sender, .. }
            | Message::DeathReport { sender, .. } => sender,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::RoutineUpdate { .. } => "routine-update",
            Message::DirectionChange { .. } => "direction-change",
            Message::LeaderUpdate { .. } => "leader-update",
            Message::LeaderReconciliation { .. } => "leader-reconciliation",
            Message::DeathReport { .. } => "death-report",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RosterEntry {
    pub id: PlayerId,
    pub addr: SocketAddr,
}

/// Room assignment delivered once by matchmaking, in join order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Handoff {
    pub roster: Vec<RosterEntry>,
}

impl Handoff {
    /// Assigns `p1`.. in the order the addresses are given. Every address
    /// gets an entry, so an oversized room still shows its real size to
    /// whoever validates it.
    pub fn from_addrs(addrs: &[SocketAddr]) -> Self {
        let roster = addrs
            .iter()
            .enumerate()
            .map(|(index, addr)| RosterEntry {
                id: PlayerId(u8::try_from(index + 1).unwrap_or(u8::MAX)),
                addr: *addr,
            })
            .collect();
        Self { roster }
    }
}

#[derive(Debug)]
pub enum WireError {
    Codec(bincode::Error),
    Oversized { len: usize, max: usize },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Codec(e) => write!(f, "codec error: {}", e),
            WireError::Oversized { len, max } => {
                write!(f, "encoded datagram is {} bytes, limit is {}", len, max)
            }
        }
    }
}

impl std::error::Error for WireError {}

impl From<bincode::Error> for WireError {
    fn from(e: bincode::Error) -> Self {
        WireError::Codec(e)
    }
}

/// Serializes a wire value, refusing anything that would not fit in one
/// unfragmented datagram.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, WireError> {
    let data = bincode::serialize(value)?;
    if data.len() > MAX_DATAGRAM_SIZE {
        return Err(WireError::Oversized {
            len: data.len(),
            max: MAX_DATAGRAM_SIZE,
        });
    }
    Ok(data)
}

pub fn decode<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T, WireError> {
    Ok(bincode::deserialize(data)?)
}
