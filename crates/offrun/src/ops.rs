//! # Operation Table
//!
//! The registry of named operations an execution context is willing to run.
//!
//! Each operation declares its parameter and result types; dispatch verifies
//! the inbound arguments against the declared signature before the handler
//! runs, and isolates handler panics so a misbehaving operation can never
//! take down the serve loop.

use std::collections::HashMap;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;

use offpack::Decoder;
use offrpc::decode_vals;
use offrpc::Error as RpcError;
use offrpc::FailureReason;
use offrpc::Value;
use offrpc::ValueType;

/// The outcome of running one operation inside the context.
pub type OpResult = std::result::Result<Value, FailureReason>;

type OpFn = Box<dyn Fn(&[Value]) -> OpResult + Send + 'static>;

/// A registered operation: signature plus handler.
struct OpSpec {
    params: Vec<ValueType>,
    result: ValueType,
    handler: OpFn,
}

/// Named operation registry executed inside an execution context.
///
/// The table is moved into the context thread at spawn time; it is never
/// shared back with the caller.
pub struct OpTable {
    ops: HashMap<String, OpSpec>,
}

impl OpTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self { ops: HashMap::new() }
    }

    /// Registers an operation under a name.
    ///
    /// Re-registering a name replaces the previous handler.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        params: Vec<ValueType>,
        result: ValueType,
        handler: F,
    ) where
        F: Fn(&[Value]) -> OpResult + Send + 'static,
    {
        self.ops.insert(
            name.into(),
            OpSpec { params, result, handler: Box::new(handler) },
        );
    }

    /// Returns the declared result type of an operation, if registered.
    pub fn result_type(&self, method: &str) -> Option<ValueType> {
        self.ops.get(method).map(|spec| spec.result)
    }

    /// Decodes the arguments for `method` and runs its handler.
    ///
    /// Argument count/type mismatches and handler panics all come back as
    /// `FailureReason`s; they are replies, not host failures.
    pub(crate) fn dispatch(&self, method: &str, args: Decoder<'_>) -> OpResult {
        let Some(spec) = self.ops.get(method) else {
            return Err(FailureReason::MethodNotFound);
        };

        let args = decode_vals(args, &spec.params).map_err(|e| match e {
            RpcError::TypeMismatch { .. } => FailureReason::BadArgumentType,
            _ => FailureReason::BadArgumentCount,
        })?;

        catch_unwind(AssertUnwindSafe(|| (spec.handler)(&args)))
            .unwrap_or(Err(FailureReason::OperationPanicked))
    }
}

impl Default for OpTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use offpack::Encoder;
    use offrpc::codec::encode_vals;

    use super::*;

    fn encode_args(args: &[Value]) -> Vec<u8> {
        let mut enc = Encoder::new();
        encode_vals(&mut enc, args).unwrap();
        enc.into_bytes().unwrap()
    }

    fn table() -> OpTable {
        let mut ops = OpTable::new();
        ops.register("double", vec![ValueType::S64], ValueType::S64, |args| {
            let Value::S64(v) = args[0] else {
                return Err(FailureReason::BadArgumentType);
            };
            Ok(Value::S64(v * 2))
        });
        ops.register("explode", vec![], ValueType::Unit, |_| panic!("kaboom"));
        ops
    }

    #[test]
    fn dispatch_runs_registered_handler() {
        let bytes = encode_args(&[Value::S64(21)]);
        let result = table().dispatch("double", Decoder::new(&bytes));
        assert_eq!(result, Ok(Value::S64(42)));
    }

    #[test]
    fn unknown_method_is_reported() {
        let bytes = encode_args(&[]);
        let result = table().dispatch("missing", Decoder::new(&bytes));
        assert_eq!(result, Err(FailureReason::MethodNotFound));
    }

    #[test]
    fn argument_count_is_checked_before_the_handler_runs() {
        let bytes = encode_args(&[Value::S64(1), Value::S64(2)]);
        let result = table().dispatch("double", Decoder::new(&bytes));
        assert_eq!(result, Err(FailureReason::BadArgumentCount));
    }

    #[test]
    fn argument_type_is_checked_before_the_handler_runs() {
        let bytes = encode_args(&[Value::F64(1.0)]);
        let result = table().dispatch("double", Decoder::new(&bytes));
        assert_eq!(result, Err(FailureReason::BadArgumentType));
    }

    #[test]
    fn handler_panic_is_isolated() {
        let bytes = encode_args(&[]);
        let result = table().dispatch("explode", Decoder::new(&bytes));
        assert_eq!(result, Err(FailureReason::OperationPanicked));
    }

    #[test]
    fn result_type_reflects_registration() {
        let ops = table();
        assert_eq!(ops.result_type("double"), Some(ValueType::S64));
        assert_eq!(ops.result_type("missing"), None);
    }
}
