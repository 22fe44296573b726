//! Message types for communication between the capture loop and the worker

use crate::capture::frame::CapturedFrame;

/// Messages sent from the capture loop to the translation worker
#[derive(Debug)]
pub enum WorkerMessage {
    /// Recognize and translate this frame
    Frame(CapturedFrame),
    /// Stop after the current frame
    Shutdown,
}
