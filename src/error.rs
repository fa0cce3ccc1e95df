//! Error types for the element-wise engine
//!
//! Every fallible operation in the crate returns [`EwiseResult`]. Errors fall
//! into three groups:
//!
//! - **Resource exhaustion**: an allocation was refused by the configured
//!   [`Allocator`](crate::matrix::block::Allocator) or by the system.
//! - **Precondition violations**: mismatched dimensions, orientations or
//!   types, and misuse of the null-operator merge mode. These are detected
//!   before any output is built.
//! - **Malformed input**: a matrix whose arrays break the format invariants.

use thiserror::Error;

use crate::matrix::types::TypeCode;

/// Top-level error type for all engine operations
#[derive(Error, Debug)]
pub enum EwiseError {
    /// An allocation request was refused
    #[error("Out of memory: failed to allocate {bytes} bytes")]
    OutOfMemory { bytes: usize },

    /// Operand dimensions differ
    #[error("Dimension mismatch: {what} is {got_vlen}×{got_vdim}, expected {vlen}×{vdim}")]
    DimensionMismatch {
        what: &'static str,
        vlen: usize,
        vdim: usize,
        got_vlen: usize,
        got_vdim: usize,
    },

    /// Operands are stored with different orientations
    #[error("Orientation mismatch: {what} is not stored in the same orientation as A")]
    OrientationMismatch { what: &'static str },

    /// A type cannot be cast to the type the operation needs
    #[error("Type mismatch: cannot cast {what} from {from:?} to {to:?}")]
    TypeMismatch {
        what: &'static str,
        from: TypeCode,
        to: TypeCode,
    },

    /// The null-operator merge was called with a mask
    #[error("Null-operator merge does not accept a mask")]
    NullOpMaskPresent,

    /// The null-operator merge found an entry present in both inputs
    #[error("Null-operator merge requires disjoint patterns: {overlaps} overlapping entries")]
    NullOpOverlap { overlaps: usize },

    /// A matrix violates the format invariants
    #[error("Invalid matrix: {0}")]
    InvalidMatrix(String),

    /// A value or argument is outside its valid domain
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// The worker pool could not be created
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type alias for engine operations
pub type EwiseResult<T> = Result<T, EwiseError>;

impl EwiseError {
    /// Create an invalid-matrix error with a message
    pub fn invalid_matrix(msg: impl Into<String>) -> Self {
        EwiseError::InvalidMatrix(msg.into())
    }

    /// Create an invalid-value error with a message
    pub fn invalid_value(msg: impl Into<String>) -> Self {
        EwiseError::InvalidValue(msg.into())
    }

    /// Returns true for resource exhaustion errors
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, EwiseError::OutOfMemory { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_memory_message() {
        let err = EwiseError::OutOfMemory { bytes: 64 };
        assert_eq!(err.to_string(), "Out of memory: failed to allocate 64 bytes");
        assert!(err.is_out_of_memory());
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = EwiseError::DimensionMismatch {
            what: "B",
            vlen: 3,
            vdim: 4,
            got_vlen: 3,
            got_vdim: 5,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: B is 3×5, expected 3×4");
        assert!(!err.is_out_of_memory());
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = EwiseError::TypeMismatch {
            what: "A",
            from: TypeCode::UserDefined,
            to: TypeCode::Fp64,
        };
        assert!(err.to_string().contains("UserDefined"));
    }
}
