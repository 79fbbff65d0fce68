//! # offrun
//!
//! Offloads blocking computations onto an isolated execution context — a
//! dedicated OS thread with its own control stack that shares no memory with
//! its caller — and exposes them through an asynchronous call proxy with
//! observable in-progress/completed state.
//!
//! ## Architecture
//!
//! - **ExecutionContext**: the isolated unit of execution; owns a serve loop
//!   dispatching typed calls through an [`OpTable`]
//! - **RemoteChannel**: the call proxy; correlates replies to calls by
//!   sequence number over a byte [`Transport`]
//! - **ContextManager**: owns the zero-or-one live {context, channel} pair;
//!   memoizes it across acquires and tears it down on release
//! - **CallOrchestrator**: the consumer facade; publishes [`CallState`]
//!   transitions through a watch channel
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use offrun::SlowAdder;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut adder = SlowAdder::with_delay(Duration::from_secs(5));
//! let mut state = adder.subscribe();
//!
//! adder.set_inputs(1, 2)?;
//! assert!(state.borrow_and_update().calculating);
//!
//! state.changed().await?;
//! assert_eq!(adder.reading().total, Some(3));
//! # Ok(())
//! # }
//! ```

pub mod adder;
pub mod channel;
pub mod compute;
pub mod context;
pub mod manager;
pub mod ops;
pub mod orchestrator;
pub mod transport;

pub use adder::SlowAdder;
pub use adder::SumState;
pub use channel::RemoteChannel;
pub use context::ContextId;
pub use context::ExecutionContext;
pub use manager::ContextManager;
pub use manager::ManagedInstance;
pub use ops::OpTable;
pub use orchestrator::CallOrchestrator;
pub use orchestrator::CallState;
pub use transport::Transport;
