//! # Minefield Duel Server Library
//!
//! This library provides the authoritative server for a two-player hidden
//! minefield game played over plain TCP. Each player secretly places five
//! mines, then both take turns guessing cells on the opponent's board until
//! one of them has found all five.
//!
//! ## Core Responsibilities
//!
//! ### Session Coordination
//! Every accepted connection runs its own session task. Sessions move through
//! a two-phase protocol: a setup phase where the player submits their mines,
//! then a turn phase where guesses are scored against the opponent's layout.
//!
//! ### Shared Match State
//! All sessions share one [`match_state::MatchState`] per server instance. It
//! owns the participant registry and the start gate behind a single lock, so
//! registration, mine placement, opponent lookup and removal never interleave.
//!
//! ### Authoritative Outcomes
//! The server alone decides hits, misses and the winner, and broadcasts every
//! outcome to both players.
//!
//! ## Module Organization
//!
//! ### Registry Module (`registry`)
//! Participant bookkeeping: join order, monotonic `Player-N` names, hidden
//! target sets and the recorded winner.
//!
//! ### Gate Module (`gate`)
//! A one-shot signal that releases waiting players once the second
//! participant has joined.
//!
//! ### Match State Module (`match_state`)
//! The locked registry plus gate, and best-effort broadcast that prunes
//! connections whose writes fail.
//!
//! ### Turn Module (`turn`)
//! Pure scoring of a single guess.
//!
//! ### Session Module (`session`)
//! The per-connection state machine from setup to victory or disconnect.
//!
//! ### Network Module (`network`)
//! TCP listener, match-full refusal and session task spawning.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(&ServerConfig::default()).await?;
//!
//!     tokio::select! {
//!         _ = server.run() => {}
//!         _ = tokio::signal::ctrl_c() => {}
//!     }
//!
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod gate;
pub mod match_state;
pub mod network;
pub mod registry;
pub mod session;
pub mod turn;
