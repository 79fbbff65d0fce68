//! # Protocol Frames
//!
//! Defines the structure of the call envelope (Call vs Reply).
//!
//! ## Invariants
//! - **Panic Safety**: all decoding paths return `Result`, never panicking on
//!   unknown data.
//! - **Forward Compatibility**: unknown header fields are safely skipped.
//! - **Correlation**: a Reply always echoes the seq of the Call it answers.

use offpack::Decoder;
use offpack::Encoder;

use crate::codec::encode_val;
use crate::codec::encode_vals;
use crate::error::Error;
use crate::error::FailureReason;
use crate::error::Result;
use crate::value::Value;

/// Encodes an outbound Call frame.
pub struct CallEncoder<'a> {
    pub seq: u64,
    pub method: &'a str,
    pub args: &'a [Value],
}

impl<'a> CallEncoder<'a> {
    pub fn new(seq: u64, method: &'a str, args: &'a [Value]) -> Self {
        Self { seq, method, args }
    }

    /// Encode this call into the encoder.
    pub fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.variant_begin("Call")?;
        enc.map_begin()?;

        write_map_u64(enc, "seq", self.seq)?;
        write_map_str(enc, "method", self.method)?;

        enc.variant_begin("args")?;
        encode_vals(enc, self.args)?;
        enc.variant_end()?;

        enc.map_end()?;
        enc.variant_end()?;
        Ok(())
    }
}

/// Decodes an inbound Call frame.
#[derive(Debug)]
pub struct CallDecoder<'a> {
    pub seq: u64,
    pub method: &'a str,
    /// Points to the List container of arguments. Use `decode_vals` with the
    /// operation signature.
    pub args: Decoder<'a>,
}

impl<'a> CallDecoder<'a> {
    /// Decode a Call frame body.
    pub fn decode(mut dec: Decoder<'a>) -> Result<Self> {
        let mut map = dec.map()?;
        let mut seq = None;
        let mut method = None;
        let mut args_dec = None;

        while let Some((key, mut val)) = map.next()? {
            match key {
                "seq" => seq = Some(val.u64()?),
                "method" => method = Some(val.str()?),
                "args" => args_dec = Some(val),
                _ => val.skip()?,
            }
        }

        Ok(CallDecoder {
            seq: seq.ok_or(Error::ProtocolViolation("Missing seq".into()))?,
            method: method.ok_or(Error::ProtocolViolation("Missing method".into()))?,
            args: args_dec.ok_or(Error::ProtocolViolation("Missing args".into()))?,
        })
    }
}

/// Encodes an outbound Reply frame (success).
pub struct ReplyOkEncoder<'a> {
    pub seq: u64,
    pub result: &'a Value,
}

impl<'a> ReplyOkEncoder<'a> {
    pub fn new(seq: u64, result: &'a Value) -> Self {
        Self { seq, result }
    }

    /// Encode this success reply into the encoder.
    pub fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.variant_begin("Reply")?;
        enc.result_ok_begin()?;
        enc.map_begin()?;

        write_map_u64(enc, "seq", self.seq)?;

        enc.variant_begin("result")?;
        encode_val(enc, self.result)?;
        enc.variant_end()?;

        enc.map_end()?;
        enc.result_ok_end()?;
        enc.variant_end()?;
        Ok(())
    }
}

/// Encodes an outbound Reply frame (failure).
pub struct ReplyErrEncoder {
    pub seq: u64,
    pub reason: FailureReason,
}

impl ReplyErrEncoder {
    pub fn new(seq: u64, reason: FailureReason) -> Self {
        Self { seq, reason }
    }

    /// Encode this failure reply into the encoder.
    pub fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.variant_begin("Reply")?;
        enc.result_err_begin()?;
        enc.map_begin()?;

        write_map_u64(enc, "seq", self.seq)?;

        enc.variant_begin("reason")?;
        encode_unit_variant(enc, self.reason.as_tag())?;
        enc.variant_end()?;

        enc.map_end()?;
        enc.result_err_end()?;
        enc.variant_end()?;
        Ok(())
    }
}

/// Decodes an inbound Reply frame.
#[derive(Debug)]
pub struct ReplyDecoder<'a> {
    pub seq: u64,
    /// The outcome of the call.
    /// - `Ok(Decoder)`: success. Points at the encoded result value; use
    ///   `decode_val` with the expected return type.
    /// - `Err(FailureReason)`: the context failed to run the operation.
    pub status: std::result::Result<Decoder<'a>, FailureReason>,
}

impl<'a> ReplyDecoder<'a> {
    /// Decode a Reply frame body.
    pub fn decode(mut dec: Decoder<'a>) -> Result<Self> {
        match dec.result()? {
            Ok(ok_body) => Self::decode_success(ok_body),
            Err(err_body) => Self::decode_failure(err_body),
        }
    }

    fn decode_success(mut ok_body: Decoder<'a>) -> Result<Self> {
        let mut map = ok_body.map()?;
        let mut seq = None;
        let mut result_dec = None;

        while let Some((key, mut val)) = map.next()? {
            match key {
                "seq" => seq = Some(val.u64()?),
                "result" => result_dec = Some(val),
                _ => val.skip()?,
            }
        }

        Ok(ReplyDecoder {
            seq: seq.ok_or(Error::ProtocolViolation("Missing seq".into()))?,
            status: Ok(result_dec.ok_or(Error::ProtocolViolation("Missing result".into()))?),
        })
    }

    fn decode_failure(mut err_body: Decoder<'a>) -> Result<Self> {
        let mut map = err_body.map()?;
        let mut seq = None;
        let mut reason = None;

        while let Some((key, mut val)) = map.next()? {
            match key {
                "seq" => seq = Some(val.u64()?),
                "reason" => {
                    let tag = decode_unit_variant(&mut val)?;
                    reason = Some(FailureReason::from_tag(tag)?);
                }
                _ => val.skip()?,
            }
        }

        Ok(ReplyDecoder {
            seq: seq.ok_or(Error::ProtocolViolation("Missing seq".into()))?,
            status: Err(reason.ok_or(Error::ProtocolViolation("Missing reason".into()))?),
        })
    }
}

/// Top-level frame decoder.
#[derive(Debug)]
pub enum RpcFrame<'a> {
    Call(CallDecoder<'a>),
    Reply(ReplyDecoder<'a>),
}

impl<'a> RpcFrame<'a> {
    /// Decode a frame from the decoder.
    pub fn decode(dec: &mut Decoder<'a>) -> Result<Self> {
        let (msg_type, body) = dec.variant()?;
        match msg_type {
            "Call" => Ok(RpcFrame::Call(CallDecoder::decode(body)?)),
            "Reply" => Ok(RpcFrame::Reply(ReplyDecoder::decode(body)?)),
            _ => Err(Error::UnknownVariant(format!("Top-level frame: {}", msg_type))),
        }
    }
}

/// Decodes just the sequence number from a raw frame.
///
/// Useful for answering a request whose full decoding failed: the reply can
/// still carry the right correlation number.
pub fn decode_seq(bytes: &[u8]) -> Result<u64> {
    let mut dec = Decoder::new(bytes);
    let (msg_type, mut body) = dec.variant()?;
    let mut map = match msg_type {
        "Call" => body.map()?,
        "Reply" => match body.result()? {
            Ok(mut ok_body) => ok_body.map()?,
            Err(mut err_body) => err_body.map()?,
        },
        _ => return Err(Error::UnknownVariant(format!("Top-level frame: {}", msg_type))),
    };

    while let Some((key, mut val)) = map.next()? {
        if key == "seq" {
            return Ok(val.u64()?);
        } else {
            val.skip()?;
        }
    }

    Err(Error::ProtocolViolation("Missing seq".into()))
}

// Helper functions

fn write_map_u64(enc: &mut Encoder, key: &str, val: u64) -> Result<()> {
    enc.variant_begin(key)?;
    enc.u64(val)?;
    enc.variant_end()?;
    Ok(())
}

fn write_map_str(enc: &mut Encoder, key: &str, val: &str) -> Result<()> {
    enc.variant_begin(key)?;
    enc.str(val)?;
    enc.variant_end()?;
    Ok(())
}

/// Encode a unit variant (variant with no payload).
fn encode_unit_variant(enc: &mut Encoder, tag: &str) -> Result<()> {
    enc.variant_begin(tag)?;
    enc.unit()?;
    enc.variant_end()?;
    Ok(())
}

/// Decode a unit variant and return its tag.
fn decode_unit_variant<'a>(dec: &mut Decoder<'a>) -> Result<&'a str> {
    let (tag, mut body) = dec.variant()?;
    body.unit()?;
    Ok(tag)
}
