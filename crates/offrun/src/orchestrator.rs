//! # Call Orchestrator
//!
//! The consumer-facing facade: fire a call, observe its state.
//!
//! State transitions are published through a watch channel, so any number of
//! observers can follow along without polling. A generation counter guards
//! against stale publications: when a new request supersedes an in-flight
//! one, the older call's result is dropped instead of clobbering the state.
//!
//! ## Invariants
//! - **Ordering**: the in-progress state is published before the call is
//!   dispatched, so an observer that looks immediately after `request`
//!   returns always sees `calculating`.
//! - **Last writer wins**: only the most recent request may publish a
//!   completion or failure.
//! - **Cleanup**: dropping the orchestrator releases the managed context.

use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use offrpc::Value;
use offrpc::ValueType;
use tokio::sync::watch;

use crate::channel;
use crate::manager;
use crate::manager::ContextManager;

#[derive(Debug)]
pub enum Error {
    /// The managed context could not be acquired.
    Acquire(manager::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acquire(e) => write!(f, "Could not acquire context: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<manager::Error> for Error {
    fn from(e: manager::Error) -> Self {
        Self::Acquire(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The observable state of the most recent call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallState {
    /// A call is in flight.
    pub calculating: bool,
    /// The result of the last completed call, if any.
    pub result: Option<Value>,
    /// The failure of the last completed call, if any.
    pub error: Option<channel::Error>,
}

impl CallState {
    /// No call has run yet.
    pub fn idle() -> Self {
        Self { calculating: false, result: None, error: None }
    }

    /// A call is in flight; any previous outcome is cleared.
    pub fn in_progress() -> Self {
        Self { calculating: true, result: None, error: None }
    }

    /// The call completed with a value.
    pub fn completed(result: Value) -> Self {
        Self { calculating: false, result: Some(result), error: None }
    }

    /// The call failed.
    pub fn failed(error: channel::Error) -> Self {
        Self { calculating: false, result: None, error: Some(error) }
    }
}

/// Dispatches calls through the managed context and publishes their state.
pub struct CallOrchestrator {
    manager: Arc<ContextManager>,
    state: watch::Sender<CallState>,
    generation: Arc<AtomicU64>,
}

impl CallOrchestrator {
    pub fn new(manager: Arc<ContextManager>) -> Self {
        let (state, _) = watch::channel(CallState::idle());
        Self {
            manager,
            state,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Starts a call and returns immediately.
    ///
    /// The in-progress state is published before this method returns; the
    /// outcome arrives later through the watch channel. A request started
    /// while another is in flight supersedes it: the older call still runs
    /// to completion on the context, but its result is discarded.
    ///
    /// If the context cannot be acquired the state reverts to idle and the
    /// construction error is returned here, synchronously.
    pub fn request(
        &self,
        method: &str,
        args: Vec<Value>,
        result_ty: ValueType,
    ) -> Result<()> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.state.send_replace(CallState::in_progress());

        let instance = match self.manager.acquire() {
            Ok(instance) => instance,
            Err(e) => {
                self.state.send_replace(CallState::idle());
                return Err(e.into());
            }
        };

        let state = self.state.clone();
        let latest = Arc::clone(&self.generation);
        let channel = Arc::clone(instance.channel());
        let method = method.to_string();
        tokio::spawn(async move {
            let outcome = channel.call(&method, &args, result_ty).await;
            if latest.load(Ordering::Acquire) != generation {
                tracing::debug!(generation, "dropping superseded call result");
                return;
            }
            let next = match outcome {
                Ok(value) => CallState::completed(value),
                Err(e) => CallState::failed(e),
            };
            state.send_replace(next);
        });

        Ok(())
    }

    /// Subscribes to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<CallState> {
        self.state.subscribe()
    }

    /// A snapshot of the current state.
    pub fn current(&self) -> CallState {
        self.state.borrow().clone()
    }
}

impl Drop for CallOrchestrator {
    fn drop(&mut self) {
        self.manager.release();
    }
}

#[cfg(test)]
mod tests {
    use offrpc::FailureReason;

    use super::*;
    use crate::ops::OpTable;

    fn adding_ops() -> OpTable {
        let mut ops = OpTable::new();
        ops.register(
            "add",
            vec![ValueType::S64, ValueType::S64],
            ValueType::S64,
            |args| {
                let (Value::S64(a), Value::S64(b)) = (args[0], args[1]) else {
                    return Err(FailureReason::BadArgumentType);
                };
                Ok(Value::S64(a.wrapping_add(b)))
            },
        );
        ops
    }

    fn orchestrator() -> CallOrchestrator {
        CallOrchestrator::new(Arc::new(ContextManager::new(adding_ops)))
    }

    #[tokio::test]
    async fn initial_state_is_idle() {
        let orch = orchestrator();
        assert_eq!(orch.current(), CallState::idle());
    }

    #[tokio::test]
    async fn in_progress_is_visible_before_the_outcome() {
        let orch = orchestrator();
        let mut state = orch.subscribe();

        orch.request("add", vec![Value::S64(1), Value::S64(2)], ValueType::S64)
            .unwrap();
        assert!(state.borrow_and_update().calculating);

        state.changed().await.unwrap();
        assert_eq!(*state.borrow_and_update(), CallState::completed(Value::S64(3)));
    }

    #[tokio::test]
    async fn remote_failure_lands_in_the_state() {
        let orch = orchestrator();
        let mut state = orch.subscribe();

        orch.request("missing", vec![], ValueType::Unit).unwrap();
        assert!(state.borrow_and_update().calculating);
        state.changed().await.unwrap();

        assert_eq!(
            state.borrow_and_update().error,
            Some(channel::Error::Remote(FailureReason::MethodNotFound))
        );
    }

    #[tokio::test]
    async fn drop_releases_the_managed_context() {
        let manager = Arc::new(ContextManager::new(adding_ops));
        let orch = CallOrchestrator::new(Arc::clone(&manager));
        orch.request("add", vec![Value::S64(1), Value::S64(1)], ValueType::S64)
            .unwrap();
        assert!(manager.is_populated());

        drop(orch);
        assert!(!manager.is_populated());
    }
}
