//! # Slow Adder
//!
//! A small consumer facade over the orchestrator shaped like a UI hook:
//! feed it two numbers, watch `{calculating, total}` evolve.

use std::sync::Arc;
use std::time::Duration;

use offrpc::Value;
use offrpc::ValueType;
use tokio::sync::watch;

use crate::compute;
use crate::manager::ContextManager;
use crate::orchestrator;
use crate::orchestrator::CallOrchestrator;
use crate::orchestrator::CallState;

/// What a consumer renders: whether a sum is being computed, and the last
/// computed total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SumState {
    pub calculating: bool,
    pub total: Option<i64>,
}

impl From<&CallState> for SumState {
    fn from(state: &CallState) -> Self {
        let total = match state.result {
            Some(Value::S64(v)) => Some(v),
            _ => None,
        };
        Self { calculating: state.calculating, total }
    }
}

/// Adds two numbers on an offloaded context, slowly.
pub struct SlowAdder {
    orchestrator: CallOrchestrator,
    inputs: Option<(i64, i64)>,
}

impl SlowAdder {
    /// Wraps an existing orchestrator.
    pub fn new(orchestrator: CallOrchestrator) -> Self {
        Self { orchestrator, inputs: None }
    }

    /// Builds the whole stack with the stock operations at the given delay.
    pub fn with_delay(delay: Duration) -> Self {
        let manager = ContextManager::new(move || compute::op_table(delay));
        Self::new(CallOrchestrator::new(Arc::new(manager)))
    }

    /// Sets the inputs and starts computing their sum.
    ///
    /// Setting the same inputs again while they are already current is a
    /// no-op: the computation is not restarted and the state does not move.
    /// Different inputs supersede any in-flight sum.
    pub fn set_inputs(&mut self, a: i64, b: i64) -> orchestrator::Result<()> {
        if self.inputs == Some((a, b)) {
            tracing::trace!(a, b, "inputs unchanged, keeping current sum");
            return Ok(());
        }
        self.inputs = Some((a, b));
        self.orchestrator.request(
            compute::ADD_TWO_NUMBERS,
            vec![Value::S64(a), Value::S64(b)],
            ValueType::S64,
        )
    }

    /// Subscribes to raw call-state transitions.
    pub fn subscribe(&self) -> watch::Receiver<CallState> {
        self.orchestrator.subscribe()
    }

    /// The current `{calculating, total}` reading.
    pub fn reading(&self) -> SumState {
        SumState::from(&self.orchestrator.current())
    }
}
