//! Retouch - Telegram bot and HTTP API for photo enhancement
//!
//! The queue, worker pool and processors live in `retouchcore`; this crate wires
//! them to Telegram and to an HTTP API.
//!
//! # Module Structure
//!
//! - `api`: HTTP processing API (`/process/{mode}`, `/ping`, `/status`, `/metrics`)
//! - `cli`: Command line interface
//! - `telegram`: Bot commands, photo intake, result delivery

pub mod api;
pub mod cli;
pub mod telegram;

pub use retouchcore::{config, Mode};
