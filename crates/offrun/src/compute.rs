//! # Built-in Computations
//!
//! The stock operation table: a pure time sink and a deliberately slow
//! addition. Both block their context thread with a real sleep for the
//! configured delay, which is exactly the point; the host stays responsive
//! while the context is busy.

use std::time::Duration;

use offrpc::FailureReason;
use offrpc::Value;
use offrpc::ValueType;

use crate::ops::OpTable;

/// Burns the configured delay and returns nothing.
pub const LONG_COMPUTATION: &str = "long-computation";

/// Burns the configured delay, then adds its two integer arguments.
pub const ADD_TWO_NUMBERS: &str = "add-two-numbers";

/// The delay used by the convenience constructors.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

/// Builds the stock operation table with the given delay per call.
pub fn op_table(delay: Duration) -> OpTable {
    let mut ops = OpTable::new();

    ops.register(LONG_COMPUTATION, vec![], ValueType::Unit, move |_| {
        std::thread::sleep(delay);
        Ok(Value::Unit)
    });

    ops.register(
        ADD_TWO_NUMBERS,
        vec![ValueType::S64, ValueType::S64],
        ValueType::S64,
        move |args| {
            std::thread::sleep(delay);
            let (Value::S64(a), Value::S64(b)) = (args[0], args[1]) else {
                return Err(FailureReason::BadArgumentType);
            };
            Ok(Value::S64(a.wrapping_add(b)))
        },
    );

    ops
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use offpack::Decoder;
    use offpack::Encoder;
    use offrpc::codec::encode_vals;

    use super::*;

    fn encode_args(args: &[Value]) -> Vec<u8> {
        let mut enc = Encoder::new();
        encode_vals(&mut enc, args).unwrap();
        enc.into_bytes().unwrap()
    }

    #[test]
    fn both_operations_are_registered() {
        let ops = op_table(Duration::ZERO);
        assert_eq!(ops.result_type(LONG_COMPUTATION), Some(ValueType::Unit));
        assert_eq!(ops.result_type(ADD_TWO_NUMBERS), Some(ValueType::S64));
    }

    #[test]
    fn addition_adds() {
        let ops = op_table(Duration::ZERO);
        let bytes = encode_args(&[Value::S64(-5), Value::S64(5)]);
        let result = ops.dispatch(ADD_TWO_NUMBERS, Decoder::new(&bytes));
        assert_eq!(result, Ok(Value::S64(0)));
    }

    #[test]
    fn delay_is_actually_observed() {
        let delay = Duration::from_millis(30);
        let ops = op_table(delay);
        let bytes = encode_args(&[]);

        let start = Instant::now();
        let result = ops.dispatch(LONG_COMPUTATION, Decoder::new(&bytes));
        assert_eq!(result, Ok(Value::Unit));
        assert!(start.elapsed() >= delay);
    }
}
