//! # Remote Channel
//!
//! The asynchronous call proxy over a [`Transport`].
//!
//! Each call gets a fresh sequence number; a background pump task reads reply
//! frames off the transport and routes them to the suspended caller by that
//! number. Callers suspend until the reply arrives, however long the remote
//! operation takes; there is deliberately no timeout at this layer.
//!
//! ## Invariants
//! - **Correlation**: a reply resolves exactly the call whose seq it echoes.
//! - **No leaks**: when the link dies or the channel is released, every
//!   pending call is failed rather than left suspended forever.
//! - **Release**: after [`RemoteChannel::release`], new calls fail with
//!   [`Error::Released`] immediately.

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::DashMap;
use offpack::Decoder;
use offpack::Encoder;
use offrpc::decode_val;
use offrpc::CallEncoder;
use offrpc::FailureReason;
use offrpc::RpcFrame;
use offrpc::Value;
use offrpc::ValueType;
use tokio::sync::oneshot;

use crate::transport;
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The message-passing layer failed.
    Transport(transport::Error),
    /// A frame could not be encoded or decoded.
    Rpc(offrpc::Error),
    /// The context ran the operation and reported a failure.
    Remote(FailureReason),
    /// The channel shut down while the call was pending.
    ChannelClosed,
    /// The channel was released; it accepts no further calls.
    Released,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Transport failure: {}", e),
            Self::Rpc(e) => write!(f, "Protocol failure: {}", e),
            Self::Remote(reason) => write!(f, "Remote failure: {}", reason),
            Self::ChannelClosed => write!(f, "Channel closed while call was pending"),
            Self::Released => write!(f, "Channel has been released"),
        }
    }
}

impl std::error::Error for Error {}

impl From<transport::Error> for Error {
    fn from(e: transport::Error) -> Self {
        Self::Transport(e)
    }
}

impl From<offrpc::Error> for Error {
    fn from(e: offrpc::Error) -> Self {
        Self::Rpc(e)
    }
}

impl From<offpack::Error> for Error {
    fn from(e: offpack::Error) -> Self {
        Self::Rpc(offrpc::Error::Serialization(e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

struct PendingReply {
    result_ty: ValueType,
    tx: oneshot::Sender<Result<Value>>,
}

/// An asynchronous call proxy to one execution context.
///
/// Cheap to share behind an `Arc`; calls from many tasks are multiplexed over
/// the single underlying transport.
pub struct RemoteChannel {
    transport: Arc<dyn Transport>,
    pending: Arc<DashMap<u64, PendingReply>>,
    seq_gen: AtomicU64,
    released: Arc<AtomicBool>,
}

impl RemoteChannel {
    /// Wraps a transport and starts the reply pump.
    ///
    /// Must be called from within a Tokio runtime: the pump runs as a
    /// spawned task for the life of the link.
    pub fn connect(transport: Arc<dyn Transport>) -> Arc<Self> {
        let channel = Arc::new(Self {
            transport: Arc::clone(&transport),
            pending: Arc::new(DashMap::new()),
            seq_gen: AtomicU64::new(0),
            released: Arc::new(AtomicBool::new(false)),
        });

        let pending = Arc::clone(&channel.pending);
        tokio::spawn(async move {
            pump(transport, pending).await;
        });

        channel
    }

    /// Invokes `method` on the remote context and suspends until it replies.
    ///
    /// There is no timeout: a slow operation suspends the caller for exactly
    /// as long as it takes. The future resolves early only if the link dies
    /// or the channel is released out from under it.
    pub async fn call(
        &self,
        method: &str,
        args: &[Value],
        result_ty: ValueType,
    ) -> Result<Value> {
        if self.is_released() {
            return Err(Error::Released);
        }

        let seq = self.seq_gen.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = oneshot::channel();
        self.pending.insert(seq, PendingReply { result_ty, tx });

        let mut enc = Encoder::new();
        CallEncoder::new(seq, method, args).encode(&mut enc)?;
        let bytes = enc.into_bytes()?;

        if let Err(e) = self.transport.send(&bytes).await {
            self.pending.remove(&seq);
            return Err(e.into());
        }

        tracing::trace!(seq, method, "call dispatched");
        rx.await.unwrap_or(Err(Error::ChannelClosed))
    }

    /// Releases the channel.
    ///
    /// Pending calls are failed with [`Error::Released`]; subsequent calls
    /// are rejected without touching the transport. Releasing twice is a
    /// no-op.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        fail_all(&self.pending, Error::Released);
        tracing::debug!("channel released");
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

/// Reads reply frames off the transport until the link dies.
async fn pump(transport: Arc<dyn Transport>, pending: Arc<DashMap<u64, PendingReply>>) {
    loop {
        match transport.recv().await {
            Ok(Some(payload)) => route_reply(&pending, &payload),
            Ok(None) => {
                tracing::debug!("context hung up, pump exiting");
                fail_all(
                    &pending,
                    Error::Transport(transport::Error::ConnectionLost("context hung up".into())),
                );
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "transport failure, pump exiting");
                fail_all(&pending, Error::Transport(e));
                break;
            }
        }
    }
}

fn route_reply(pending: &DashMap<u64, PendingReply>, payload: &[u8]) {
    let mut dec = Decoder::new(payload);
    let reply = match RpcFrame::decode(&mut dec) {
        Ok(RpcFrame::Reply(reply)) => reply,
        Ok(RpcFrame::Call(_)) => {
            tracing::warn!("inbound call frame on a host channel, dropping");
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, "undecodable reply frame, dropping");
            return;
        }
    };

    let Some((_, waiter)) = pending.remove(&reply.seq) else {
        // Late reply for a caller that already gave up.
        tracing::debug!(seq = reply.seq, "reply for unknown seq, dropping");
        return;
    };

    let outcome = match reply.status {
        Ok(mut result) => decode_val(&mut result, &waiter.result_ty).map_err(Error::Rpc),
        Err(reason) => Err(Error::Remote(reason)),
    };

    // The caller may have been dropped; that is fine.
    let _ = waiter.tx.send(outcome);
}

fn fail_all(pending: &DashMap<u64, PendingReply>, error: Error) {
    let seqs: Vec<u64> = pending.iter().map(|entry| *entry.key()).collect();
    for seq in seqs {
        if let Some((_, waiter)) = pending.remove(&seq) {
            let _ = waiter.tx.send(Err(error.clone()));
        }
    }
}
