//! # Transport Abstraction
//!
//! A minimal, async interface for moving bytes across the isolation boundary.
//!
//! The Transport knows nothing about frames, values, or operations. It moves
//! opaque buffers: send a payload toward the context, receive reply payloads
//! back.

use std::fmt;

/// Errors that occur at the message-passing layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The far side is unreachable or the link was dropped.
    ConnectionLost(String),
    /// The execution context behind this transport has been terminated.
    Terminated,
    /// Generic internal transport failure.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::Terminated => write!(f, "Execution context terminated"),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// A mechanism to exchange byte buffers with an execution context.
///
/// This trait is object-safe (`Arc<dyn Transport>`).
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends a payload toward the context.
    ///
    /// # Invariants
    /// - Must not interpret the payload content.
    /// - Must return `Err` if the context can no longer receive.
    async fn send(&self, payload: &[u8]) -> Result<()>;

    /// Waits for the next payload from the context.
    ///
    /// Returns `Ok(None)` when the context has hung up and no further
    /// payloads will arrive.
    async fn recv(&self) -> Result<Option<Vec<u8>>>;
}
