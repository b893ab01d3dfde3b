//! # ChessBreak Core Library
//!
//! Tilt prevention for online chess. The library watches the game page for
//! games starting and ending, keeps per-session win/loss/draw counts and a
//! loss streak, and when a configurable trigger fires it locks the viewer out
//! of starting new games for a while.
//!
//! ## Architecture
//!
//! - **Page**: the game page seen through fixed class/attribute markers, and
//!   batches of DOM mutations
//! - **Game**: lifecycle detection, outcome classification, participant check,
//!   rating deltas and history records
//! - **Tilt**: the state machine owning all session state, trigger evaluation
//!   and the lockout actuator
//! - **Storage**: key/value session persistence (SQLite) and TOML options
//! - **Monitor**: the async driver multiplexing page, control and timer events
//!
//! ## Key Components
//!
//! - [`TiltMachine`]: session state machine
//! - [`Monitor`]: async event loop around it
//! - [`Database`]: durable key/value store
//! - [`OptionsFile`]: user options

pub mod error;
pub mod events;
pub mod game;
pub mod monitor;
pub mod page;
pub mod stats;
pub mod storage;
pub mod tilt;

pub use error::{ConfigError, CoreError, Result, StorageError};
pub use events::{ControlMessage, Signal};
pub use game::{GamePhase, GameResult, OutcomeRecord, PlayerIdentity};
pub use monitor::Monitor;
pub use page::{DocumentPage, MutationBatch, Page, PageNode};
pub use stats::{PerformanceAnalyzer, PerformanceReport};
pub use storage::{
    Database, KvStore, MemoryStore, Options, OptionsFile, OptionsSource, SessionSnapshot,
};
pub use tilt::TiltMachine;
