//! # TESSERA
//!
//! Real-time harness around [`tessera_core`].
//!
//! ## Threads
//!
//! ```text
//! ┌──────────────┐  publish   ┌──────────────────────┐  snapshot  ┌──────────────┐
//! │ input/timers │──────────> │ simulation (GameLoop)│──────────> │ presentation │
//! └──────────────┘            └──────────────────────┘            └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - `tick`: fixed-timestep pacing and tick statistics
//! - `game_loop`: world ownership, stepping, snapshot publishing
//! - `timer`: background event producer
//! - `config`: TOML runtime configuration

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod game_loop;
pub mod tick;
pub mod timer;

pub use config::RuntimeConfig;
pub use error::{RuntimeError, RuntimeResult};
pub use game_loop::{FrameStats, FrameStatsAccumulator, GameLoop};
pub use tick::{TickLoop, TickStats};
pub use timer::{TimerFired, TimerProducer};
