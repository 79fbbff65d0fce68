//! # Context Manager
//!
//! Owns the zero-or-one live {context, channel} pair.
//!
//! Acquire is memoizing: while an instance is held, every acquire hands back
//! the same one. Release tears the pair down and empties the slot, so the
//! next acquire constructs a genuinely fresh context.
//!
//! ## Invariants
//! - **Singleton**: at most one managed instance exists at a time.
//! - **Freshness**: an acquire after a release yields an instance with a new
//!   [`ContextId`], never a resurrected one.
//! - **Teardown order**: release lets go of the channel before terminating
//!   the context, mirroring construction in reverse.
//!
//! [`ContextId`]: crate::context::ContextId

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use crate::channel::RemoteChannel;
use crate::context;
use crate::context::ContextId;
use crate::context::ExecutionContext;
use crate::ops::OpTable;

#[derive(Debug)]
pub enum Error {
    /// The execution context could not be constructed.
    Construction(context::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Construction(e) => write!(f, "Context construction failed: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<context::Error> for Error {
    fn from(e: context::Error) -> Self {
        Self::Construction(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// One live context plus the channel reaching into it.
///
/// Clones are handles to the same underlying pair.
#[derive(Clone)]
pub struct ManagedInstance {
    context: ExecutionContext,
    channel: Arc<RemoteChannel>,
}

impl ManagedInstance {
    pub fn id(&self) -> ContextId {
        self.context.id()
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn channel(&self) -> &Arc<RemoteChannel> {
        &self.channel
    }
}

type OpsFactory = Box<dyn Fn() -> OpTable + Send + Sync>;

/// Lifecycle owner for the managed {context, channel} pair.
pub struct ContextManager {
    ops: OpsFactory,
    slot: StdMutex<Option<ManagedInstance>>,
}

impl ContextManager {
    /// Creates a manager that builds each fresh context from `ops`.
    ///
    /// The factory runs once per construction; contexts never share an
    /// operation table.
    pub fn new<F>(ops: F) -> Self
    where
        F: Fn() -> OpTable + Send + Sync + 'static,
    {
        Self {
            ops: Box::new(ops),
            slot: StdMutex::new(None),
        }
    }

    /// Returns the managed instance, constructing it if the slot is empty.
    ///
    /// Must be called from within a Tokio runtime when construction is
    /// needed: the channel's reply pump is spawned as a task. If
    /// construction fails the slot stays empty, so a later acquire retries
    /// from scratch.
    pub fn acquire(&self) -> Result<ManagedInstance> {
        let mut slot = self.lock_slot();
        if let Some(instance) = slot.as_ref() {
            tracing::trace!(context = %instance.id(), "reusing managed context");
            return Ok(instance.clone());
        }

        let (context, endpoint) = ExecutionContext::spawn((self.ops)())?;
        let channel = RemoteChannel::connect(Arc::new(endpoint));
        let instance = ManagedInstance { context, channel };
        tracing::debug!(context = %instance.id(), "constructed managed context");

        *slot = Some(instance.clone());
        Ok(instance)
    }

    /// Tears down the managed instance, if any.
    ///
    /// The channel is released first, then the context is terminated.
    /// Releasing an empty slot is a no-op.
    pub fn release(&self) {
        let taken = self.lock_slot().take();
        if let Some(instance) = taken {
            tracing::debug!(context = %instance.id(), "releasing managed context");
            instance.channel.release();
            instance.context.terminate();
        }
    }

    /// Whether an instance is currently held.
    pub fn is_populated(&self) -> bool {
        self.lock_slot().is_some()
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Option<ManagedInstance>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
