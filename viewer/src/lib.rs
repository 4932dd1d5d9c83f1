//! # Light-Cycle Viewer Library
//!
//! A graphical front end for one peer. The node itself runs on a background
//! thread with its own async runtime; the render loop only talks to it
//! through the bridge channels, polling for events each frame and pushing
//! steering input back.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The viewer's picture of the session, rebuilt from bridge events.
//!
//! ### Input Module (`input`)
//! Arrow and WASD keys to headings, once per key press.
//!
//! ### Network Module (`network`)
//! Starting the node thread and reporting its setup.
//!
//! ### Rendering Module (`rendering`)
//! Grid layout and drawing.

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
