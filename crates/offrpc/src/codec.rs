//! # Codec
//!
//! The translation layer between [`Value`] and the offpack wire format.
//!
//! Decoding is schema-directed: the caller supplies the expected
//! [`ValueType`]s and the wire tags are verified against them, so a context
//! can never hand back a value of the wrong shape without it surfacing as a
//! `TypeMismatch`.

use offpack::Decoder;
use offpack::Encoder;

use crate::error::Error;
use crate::error::Result;
use crate::value::Value;
use crate::value::ValueType;

/// Encodes a single [`Value`] into the encoder stream.
pub fn encode_val(enc: &mut Encoder, val: &Value) -> Result<()> {
    match val {
        Value::Unit => enc.unit()?,
        Value::S64(v) => enc.s64(*v)?,
        Value::F64(v) => enc.f64(*v)?,
    }
    Ok(())
}

/// Decodes a single value of the expected type.
pub fn decode_val(dec: &mut Decoder, ty: &ValueType) -> Result<Value> {
    let found = dec.peek_tag().map_err(Error::from)?;
    let val = match ty {
        ValueType::Unit => {
            dec.unit().map_err(|_| mismatch(ty, found))?;
            Value::Unit
        }
        ValueType::S64 => Value::S64(dec.s64().map_err(|_| mismatch(ty, found))?),
        ValueType::F64 => Value::F64(dec.f64().map_err(|_| mismatch(ty, found))?),
    };
    Ok(val)
}

fn mismatch(expected: &ValueType, found: offpack::Tag) -> Error {
    Error::TypeMismatch {
        expected: expected.name(),
        found: format!("{:?}", found),
    }
}

/// Encodes a list of values.
pub fn encode_vals(enc: &mut Encoder, vals: &[Value]) -> Result<()> {
    enc.list_begin()?;
    for val in vals {
        encode_val(enc, val)?;
    }
    enc.list_end()?;
    Ok(())
}

/// Decodes a list of values given the expected types.
///
/// The list length must match the type list exactly; extra or missing items
/// are protocol violations, never silently dropped.
pub fn decode_vals(mut list_decoder: Decoder, types: &[ValueType]) -> Result<Vec<Value>> {
    let mut list_iter = list_decoder.list()?;
    let mut vals = Vec::with_capacity(types.len());

    for ty in types {
        if let Some(mut item_dec) = list_iter.next() {
            vals.push(decode_val(&mut item_dec, ty)?);
        } else {
            return Err(Error::ProtocolViolation("Fewer values than types".into()));
        }
    }

    if list_iter.next().is_some() {
        return Err(Error::ProtocolViolation("More values than types".into()));
    }

    Ok(vals)
}
