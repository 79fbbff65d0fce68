//! # Error Definitions
//!
//! The central ledger of operational and protocol failures.

use offpack::Error as PackError;

/// Operational failures within the call protocol itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The underlying offpack serialization failed.
    Serialization(PackError),
    /// The wire tag did not match the expected value type.
    TypeMismatch { expected: &'static str, found: String },
    /// An unknown variant or top-level frame type was encountered.
    UnknownVariant(String),
    /// The internal structure of the message was malformed (e.g. missing seq).
    ProtocolViolation(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialization(e) => write!(f, "Serialization failed: {}", e),
            Self::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {}, found {}", expected, found)
            }
            Self::UnknownVariant(name) => write!(f, "Unknown variant: {}", name),
            Self::ProtocolViolation(msg) => write!(f, "Protocol violation: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<PackError> for Error {
    fn from(e: PackError) -> Self {
        Self::Serialization(e)
    }
}

/// A specialized Result type for protocol operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons the remote side failed to produce a result (the "Err" arm of a
/// Reply).
///
/// These are distinct from [`Error`]: a `FailureReason` means the *context*
/// failed to run the operation, whereas `Error` means the *wire* failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The operation panicked inside the execution context.
    OperationPanicked,
    /// No operation is registered under the requested name.
    MethodNotFound,
    /// The argument count did not match the operation signature.
    BadArgumentCount,
    /// An argument type did not match the operation signature.
    BadArgumentType,
    /// The inbound request frame could not be decoded.
    MalformedRequest,
}

impl FailureReason {
    /// Wire tag for this reason.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::OperationPanicked => "Panicked",
            Self::MethodNotFound => "NoMethod",
            Self::BadArgumentCount => "BadArgCount",
            Self::BadArgumentType => "BadArgType",
            Self::MalformedRequest => "Malformed",
        }
    }

    /// Parses a wire tag back into a reason.
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "Panicked" => Ok(Self::OperationPanicked),
            "NoMethod" => Ok(Self::MethodNotFound),
            "BadArgCount" => Ok(Self::BadArgumentCount),
            "BadArgType" => Ok(Self::BadArgumentType),
            "Malformed" => Ok(Self::MalformedRequest),
            _ => Err(Error::UnknownVariant(tag.to_string())),
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OperationPanicked => write!(f, "operation panicked in the execution context"),
            Self::MethodNotFound => write!(f, "no such operation"),
            Self::BadArgumentCount => write!(f, "wrong number of arguments"),
            Self::BadArgumentType => write!(f, "argument type mismatch"),
            Self::MalformedRequest => write!(f, "request frame could not be decoded"),
        }
    }
}
