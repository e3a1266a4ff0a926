//! Sync Loop Module
//!
//! This module contains the core of the daemon: the periodic fetch→filter→
//! submit loop that keeps the target relay's validator registrations in step
//! with the source relay. It is composed of several submodules, each with a
//! single responsibility:
//!
//! - `engine`: runs one cycle — fetch the source set, drop malformed records,
//!   compute the delta against what was already forwarded, submit it with
//!   bounded retries, and reconcile per-record outcomes.
//! - `state`: the in-memory pubkey → last-forwarded-timestamp map owned by
//!   the engine. Never persisted; restarts re-forward the full set.
//! - `scheduler`: drives cycles on a fixed interval with skip-not-overlap
//!   semantics and a graceful shutdown path.
//! - `health`: the liveness handle an external supervisor polls.

/// Runs one fetch→filter→submit→reconcile cycle
pub mod engine;
/// Liveness reporting for external health probing
pub mod health;
/// Fixed-interval cycle driver
pub mod scheduler;
/// Last-forwarded timestamps per validator
pub mod state;

pub use engine::SyncEngine;
pub use scheduler::Scheduler;
