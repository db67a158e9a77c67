//! # Snake Grid Server Library
//!
//! Authoritative, tick-driven simulation of a shared snake grid. Players steer
//! snakes on a bounded board; the server moves every snake once per tick,
//! applies collision, border and food rules, and publishes compact versioned
//! diffs of the cells that changed.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! [`engine::TickEngine`] owns the occupancy grid, every snake, the food and the
//! version history. Clients only send direction changes; every outcome is
//! decided here.
//!
//! ### Versioned Diffs
//! Each tick that changes at least one cell produces a [`shared::VersionDiff`]
//! numbered one above the last. The most recent diffs are kept for catch-up
//! queries and a full snapshot is available for late joiners.
//!
//! ### Transport
//! [`network::Server`] speaks a small bincode-over-UDP protocol. It subscribes
//! to the engine's diff channel and broadcasts each diff; the engine never
//! calls transport code.
//!
//! ## Module Organization
//!
//! - `grid`, `snake`, `food`: the data model and per-entity state machine
//! - `encoder`, `history`: diff/snapshot encoding and the bounded archive
//! - `engine`: the five-phase tick
//! - `game_loop`: fixed-delay scheduling on a single task
//! - `client_manager`, `network`: UDP clients and packet handling
//! - `config`, `error`, `utils`: ambient pieces
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::EngineConfig;
//! use server::engine::TickEngine;
//! use server::game_loop::GameLoop;
//! use server::network::Server;
//! use std::sync::Arc;
//! use tokio::sync::RwLock;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::with_size(80, 80);
//!     let interval = config.tick_interval();
//!     let engine = Arc::new(RwLock::new(TickEngine::new(config)?));
//!
//!     let game_loop = GameLoop::start(Arc::clone(&engine), interval);
//!     let mut server = Server::new("127.0.0.1:8080", engine, 32).await?;
//!     server.run().await?;
//!
//!     game_loop.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod food;
pub mod game_loop;
pub mod grid;
pub mod history;
pub mod network;
pub mod snake;
pub mod utils;
