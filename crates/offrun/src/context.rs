//! # Execution Context
//!
//! An isolated unit of execution: a dedicated OS thread with its own control
//! stack, reachable only through message passing.
//!
//! The context runs a serve loop that decodes inbound call frames, dispatches
//! them through its [`OpTable`], and sends reply frames back. It shares no
//! state with the host; the [`HostEndpoint`] returned from [`ExecutionContext::spawn`]
//! is the host's only way to talk to it.
//!
//! ## Invariants
//! - **Identity**: every spawned context gets a process-unique, monotonically
//!   increasing [`ContextId`]. Ids are never reused.
//! - **Isolation**: a malformed or panicking request is answered with a
//!   failure reply; the serve loop keeps running.
//! - **Termination**: after [`ExecutionContext::terminate`], the endpoint
//!   rejects sends and the serve loop winds down.

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use offpack::Decoder;
use offpack::Encoder;
use offrpc::decode_seq;
use offrpc::FailureReason;
use offrpc::ReplyErrEncoder;
use offrpc::ReplyOkEncoder;
use offrpc::RpcFrame;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;

use crate::ops::OpTable;
use crate::transport;
use crate::transport::Transport;

#[derive(Debug)]
pub enum Error {
    /// The OS refused to create the context thread.
    Spawn(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(e) => write!(f, "Could not spawn execution context: {}", e),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A process-unique identity for one execution context.
///
/// Ids are monotonic and never reused, so observing a different id after a
/// release proves a genuinely fresh context was constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    fn fresh() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context-{}", self.0)
    }
}

type RequestSlot = Arc<StdMutex<Option<mpsc::Sender<Vec<u8>>>>>;

/// A handle to a running execution context.
///
/// The handle is cheap to clone; all clones refer to the same context.
/// Dropping every handle does NOT stop the context; call [`terminate`].
///
/// [`terminate`]: ExecutionContext::terminate
#[derive(Clone)]
pub struct ExecutionContext {
    id: ContextId,
    live: Arc<AtomicBool>,
    halt: Arc<AtomicBool>,
    requests: RequestSlot,
}

impl ExecutionContext {
    /// Spawns a new context thread serving the given operation table.
    ///
    /// Returns the context handle and the single [`HostEndpoint`] through
    /// which it can be reached.
    pub fn spawn(ops: OpTable) -> Result<(ExecutionContext, HostEndpoint)> {
        let id = ContextId::fresh();
        let (request_tx, request_rx) = mpsc::channel::<Vec<u8>>();
        let (reply_tx, reply_rx) = tokio::sync::mpsc::unbounded_channel::<Vec<u8>>();

        let live = Arc::new(AtomicBool::new(true));
        let halt = Arc::new(AtomicBool::new(false));

        let thread_live = Arc::clone(&live);
        let thread_halt = Arc::clone(&halt);
        std::thread::Builder::new()
            .name(id.to_string())
            .spawn(move || {
                serve(id, ops, request_rx, reply_tx, thread_halt);
                thread_live.store(false, Ordering::Release);
            })
            .map_err(Error::Spawn)?;

        let requests: RequestSlot = Arc::new(StdMutex::new(Some(request_tx)));
        let context = ExecutionContext {
            id,
            live,
            halt,
            requests: Arc::clone(&requests),
        };
        let endpoint = HostEndpoint {
            requests,
            replies: Mutex::new(reply_rx),
        };

        tracing::debug!(context = %id, "spawned execution context");
        Ok((context, endpoint))
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Whether the serve loop is still running.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Stops the context.
    ///
    /// The request channel is closed immediately; the serve loop exits once
    /// it observes the closure. In-flight work on the context thread cannot
    /// be interrupted, but its replies go nowhere once the host lets go of
    /// the endpoint. Terminating twice is a no-op.
    pub fn terminate(&self) {
        self.halt.store(true, Ordering::Release);
        let taken = lock_slot(&self.requests).take();
        if taken.is_some() {
            tracing::debug!(context = %self.id, "terminated execution context");
        }
    }
}

/// The host side of the link to one execution context.
///
/// Implements [`Transport`] so the call layer stays independent of how the
/// context is actually hosted.
pub struct HostEndpoint {
    requests: RequestSlot,
    replies: Mutex<UnboundedReceiver<Vec<u8>>>,
}

#[async_trait::async_trait]
impl Transport for HostEndpoint {
    async fn send(&self, payload: &[u8]) -> transport::Result<()> {
        let slot = lock_slot(&self.requests);
        match slot.as_ref() {
            Some(tx) => tx
                .send(payload.to_vec())
                .map_err(|_| transport::Error::ConnectionLost("context stopped receiving".into())),
            None => Err(transport::Error::Terminated),
        }
    }

    async fn recv(&self) -> transport::Result<Option<Vec<u8>>> {
        Ok(self.replies.lock().await.recv().await)
    }
}

fn lock_slot(slot: &RequestSlot) -> std::sync::MutexGuard<'_, Option<mpsc::Sender<Vec<u8>>>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The context thread body: decode, dispatch, reply, repeat.
fn serve(
    id: ContextId,
    ops: OpTable,
    requests: mpsc::Receiver<Vec<u8>>,
    replies: UnboundedSender<Vec<u8>>,
    halt: Arc<AtomicBool>,
) {
    while let Ok(payload) = requests.recv() {
        if halt.load(Ordering::Acquire) {
            break;
        }
        let reply = match serve_one(&ops, &payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(context = %id, error = %e, "failed to encode reply");
                continue;
            }
        };
        if replies.send(reply).is_err() {
            // Host dropped the endpoint; nobody is listening anymore.
            break;
        }
    }
    tracing::debug!(context = %id, "serve loop exiting");
}

fn serve_one(ops: &OpTable, payload: &[u8]) -> offrpc::Result<Vec<u8>> {
    let mut dec = Decoder::new(payload);
    let mut enc = Encoder::new();

    match RpcFrame::decode(&mut dec) {
        Ok(RpcFrame::Call(call)) => match ops.dispatch(call.method, call.args) {
            Ok(value) => ReplyOkEncoder::new(call.seq, &value).encode(&mut enc)?,
            Err(reason) => ReplyErrEncoder::new(call.seq, reason).encode(&mut enc)?,
        },
        // A context only serves calls; anything else is malformed traffic.
        // Echo back whatever seq we can recover so the caller unblocks.
        Ok(RpcFrame::Reply(_)) | Err(_) => {
            let seq = decode_seq(payload).unwrap_or(0);
            ReplyErrEncoder::new(seq, FailureReason::MalformedRequest).encode(&mut enc)?;
        }
    }

    Ok(enc.into_bytes()?)
}
