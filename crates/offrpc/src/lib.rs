//! # OffRPC
//!
//! A strict, schema-driven call protocol over [offpack] for talking to an
//! isolated execution context.
//!
//! ## Wire Format
//!
//! - Call: `Variant("Call") { Map { seq, method, args: List } }`
//! - Reply: `Variant("Reply") { Result< Map { seq, result }, Map { seq, reason } > }`
//!
//! Every call carries a sequence number; the matching reply echoes it back so
//! concurrent callers can be demultiplexed on one link. Only the closed set of
//! [`Value`] primitives can cross the boundary: anything that would need
//! identity on the far side (handles, closures) is simply unrepresentable.

pub mod codec;
pub mod error;
pub mod frame;
pub mod value;

#[cfg(test)]
mod tests;

pub use codec::decode_val;
pub use codec::decode_vals;
pub use codec::encode_val;
pub use error::Error;
pub use error::FailureReason;
pub use error::Result;
pub use frame::decode_seq;
pub use frame::CallDecoder;
pub use frame::CallEncoder;
pub use frame::ReplyDecoder;
pub use frame::ReplyErrEncoder;
pub use frame::ReplyOkEncoder;
pub use frame::RpcFrame;
pub use value::Value;
pub use value::ValueType;
