//! # Light-Cycle Peer Library
//!
//! Every participant of a session runs one peer. There is no server: peers
//! gossip their own state to each other over UDP and each keeps a full copy
//! of the board.
//!
//! ## Core Responsibilities
//!
//! ### Local Simulation
//! Each peer moves every alive player one cell per tick and resolves
//! collisions on its own copy of the board. The pass is deterministic, so
//! peers that saw the same turns at the same time agree without talking.
//!
//! ### Gossip
//! A peer announces itself on a fixed period and announces turns the moment
//! they happen. Late or lost announcements are absorbed by back-filling the
//! path a remote player must have taken.
//!
//! ### Leadership and Reconciliation
//! The leader is whoever sits first in the ordered membership list. It is
//! the only peer that reports deaths and publishes evictions, and it
//! periodically broadcasts recent trails so every copy converges on its own.
//!
//! ### Failure Detection
//! Silent peers are evicted after a fixed timeout. Evicting the leader moves
//! the role to the next entry with no election round.
//!
//! ## Module Organization
//!
//! ### Session (`session`)
//! The aggregate every loop works on: membership, board and lifecycle,
//! plus inbound message dispatch.
//!
//! ### Game (`game`)
//! Movement, collisions, local turns and back-fill.
//!
//! ### Reconcile (`reconcile`) and Failure (`failure`)
//! Leader reconciliation and the heartbeat failure detector.
//!
//! ### Network (`network`)
//! The running node: UDP receive and send tasks and the periodic loops.
//!
//! ### Bridge (`bridge`)
//! Channel pair between a node and whatever renders it.

pub mod bridge;
pub mod config;
pub mod error;
pub mod failure;
pub mod game;
pub mod handoff;
pub mod membership;
pub mod network;
pub mod reconcile;
pub mod session;

pub use bridge::{BridgeEvent, BridgeHandle, BridgeInput};
pub use config::SessionConfig;
pub use error::PeerError;
pub use network::Node;
pub use session::{Outcome, Session, SessionStatus};
