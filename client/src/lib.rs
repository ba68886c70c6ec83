//! # Minefield Duel Client Library
//!
//! A thin terminal client for the minefield duel server. It connects over
//! TCP, prints every line the server sends, and forwards the player's typed
//! mines and guesses after validating them locally.
//!
//! ## Module Organization
//!
//! ### Input Module (`input`)
//! Validation of typed mines and moves for the current phase of the match,
//! plus random mine placement.
//!
//! ### Network Module (`network`)
//! The connection itself: a receiver task that prints and decodes server
//! lines, and the input loop that sends the player's lines.

pub mod input;
pub mod network;
