//! Relay integration module
//!
//! This module provides the clients and types for talking to validator
//! registration relays: reading the full registration set from the source
//! relay and submitting batches to the target relay. Both clients are plain
//! I/O boundaries with bounded request timeouts; retry policy lives in the
//! sync engine.

/// HTTP client for the source relay's read endpoint
mod source;
/// HTTP client for the target relay's write endpoint
mod target;
/// Registration record model, outcomes, and relay error types
mod types;

pub use source::{SourceClient, SourceRelay};
pub use target::{TargetClient, TargetRelay};
pub use types::*;
