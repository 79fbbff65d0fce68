//! # Boundary Values
//!
//! The closed set of primitives that may cross the isolation boundary.
//!
//! Values are passed by copy, never by reference: anything whose meaning
//! depends on identity on the caller's side (resources, closures, shared
//! state) has no representation here and therefore cannot be smuggled across.

/// A primitive value crossing the isolation boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// No value; the result of a side-effect-only operation.
    Unit,
    /// Signed 64-bit integer.
    S64(i64),
    /// 64-bit float, preserved bit-for-bit on the wire.
    F64(f64),
}

impl Value {
    /// Returns the type of this value.
    pub fn ty(&self) -> ValueType {
        match self {
            Value::Unit => ValueType::Unit,
            Value::S64(_) => ValueType::S64,
            Value::F64(_) => ValueType::F64,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::S64(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
        }
    }
}

/// The type of a boundary value, used to drive schema-directed decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Unit,
    S64,
    F64,
}

impl ValueType {
    /// Human-readable name, used in type-mismatch diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Unit => "unit",
            ValueType::S64 => "s64",
            ValueType::F64 => "f64",
        }
    }
}
