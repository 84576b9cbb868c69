//! # Rate Fan-out Server
//!
//! A real-time currency-rate fan-out server: polls an upstream quote feed,
//! derives a mid-price tick per symbol per poll, persists a
//! retention-bounded history, and streams per-symbol updates to whichever
//! clients have subscribed over a duplex message connection.
//!
//! ## Core Problem Solved
//!
//! The upstream feed is a single shared snapshot; this crate turns it into
//! a fan-out point: many independently-subscribed clients, each wanting a
//! different symbol, each needing history to seed their view before they
//! start receiving live ticks.
//!
//! ## Key Features
//!
//! - **Bounded retention**: history queries and the underlying store both
//!   honor the same retention window, no unbounded growth.
//! - **Pluggable persistence**: Mongo (document store) or Redis (list
//!   store), chosen at startup.
//! - **Non-blocking fan-out**: a slow or disconnected subscriber never
//!   blocks the poll loop or other subscribers.
//! - **Single-timestamp batches**: every point derived from one poll tick
//!   shares that tick's timestamp.
//!
//! For the full component breakdown see `DESIGN.md` in the repository root.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Shared domain types: the symbol table, rate points, and service errors.
pub mod core;
/// Environment-sourced configuration.
pub mod config;
/// The duplex message connection handler, one task per accepted peer.
pub mod connection;
/// The orchestrator: wires configuration, repository, pools, poller, and
/// service together and runs the accept loop until shutdown.
pub mod orchestrator;
/// Periodic upstream fetch, republished as a channel of quote batches.
pub mod poller;
/// The bounded, fire-and-forget worker pool used for notification and
/// persistence.
pub mod pool;
/// Pluggable bounded-retention rate store.
pub mod repository;
/// Coordinates poll batches, persistence, and subscriber fan-out.
pub mod service;
/// Shared utilities: clock access and telemetry bootstrap.
pub mod util;
/// Wire types for the upstream feed and the client<->server protocol.
pub mod wire;
