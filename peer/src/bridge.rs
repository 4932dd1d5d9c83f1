//! Channel pair connecting a running node to whatever renders it.

use log::debug;
use shared::{Board, Direction, PlayerId, TrailHistory};
use tokio::sync::mpsc;

/// Events a node produces for its UI.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    BoardSnapshot(Board),
    /// Each member's latest few cells, head first
    RecentTrails(Vec<TrailHistory>),
    PlayerDead(PlayerId),
    PlayerVictory(PlayerId),
    SessionDraw,
}

/// Input a UI feeds back into its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeInput {
    LocalDirectionChange(Direction),
}

/// Node side of the bridge.
#[derive(Debug)]
pub struct Bridge {
    events: mpsc::UnboundedSender<BridgeEvent>,
    input: mpsc::UnboundedReceiver<BridgeInput>,
}

/// UI side of the bridge.
#[derive(Debug)]
pub struct BridgeHandle {
    pub events: mpsc::UnboundedReceiver<BridgeEvent>,
    pub input: mpsc::UnboundedSender<BridgeInput>,
}

pub fn channel() -> (Bridge, BridgeHandle) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    (
        Bridge {
            events: events_tx,
            input: input_rx,
        },
        BridgeHandle {
            events: events_rx,
            input: input_tx,
        },
    )
}

impl Bridge {
    /// Splits into the event sender and input receiver so they can live in
    /// different loops.
    pub fn split(
        self,
    ) -> (
        mpsc::UnboundedSender<BridgeEvent>,
        mpsc::UnboundedReceiver<BridgeInput>,
    ) {
        (self.events, self.input)
    }
}

impl BridgeHandle {
    /// Returns false once the node has shut down.
    pub fn send_direction(&self, direction: Direction) -> bool {
        self.input
            .send(BridgeInput::LocalDirectionChange(direction))
            .is_ok()
    }

    /// Non-blocking poll for the next event, for render loops that cannot
    /// await.
    pub fn try_next_event(&mut self) -> Option<BridgeEvent> {
        self.events.try_recv().ok()
    }
}

/// Maps a typed key or word (`w`, `up`, ...) to a heading.
pub fn direction_from_key(key: &str) -> Option<Direction> {
    match key.trim().to_ascii_lowercase().as_str() {
        "w" | "up" => Some(Direction::Up),
        "s" | "down" => Some(Direction::Down),
        "a" | "left" => Some(Direction::Left),
        "d" | "right" => Some(Direction::Right),
        _ => None,
    }
}

/// Forwards events to the UI; a UI that went away is not an error.
pub fn publish(events: &mpsc::UnboundedSender<BridgeEvent>, batch: Vec<BridgeEvent>) {
    for event in batch {
        if events.send(event).is_err() {
            debug!("UI bridge closed, dropping event");
            return;
        }
    }
}
