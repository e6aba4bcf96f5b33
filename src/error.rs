//! Error types for the wave engine.
//!
//! The engine clamps out-of-range configuration instead of rejecting it, so
//! the only operations that can fail are the ones that talk to the operating
//! system when the engine threads are brought up.

use std::fmt;

/// Errors that can occur while constructing or running an engine.
#[derive(Debug)]
pub enum EngineError {
    /// The conductor thread could not be spawned.
    Spawn(std::io::Error),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Spawn(e) => write!(f, "Failed to spawn engine thread: {}", e),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Spawn(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Spawn(e)
    }
}
