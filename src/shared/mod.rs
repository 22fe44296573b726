//! Shared state and messaging between the capture loop, the worker and the display
//!
//! This module provides thread-safe shared state and message passing
//! for communication between the runtime threads.

pub mod state;
pub mod messages;

pub use state::{SharedAppState, RuntimeState};
pub use messages::WorkerMessage;
