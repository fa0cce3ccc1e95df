//! # ewise: element-wise sparse matrix algebra
//!
//! ewise computes `C<M> = A ⊕ B` (element-wise add, over the union of the
//! patterns of A and B) and `C<M> = A ⊗ B` (element-wise multiply, over
//! their intersection) for matrices held in any of four storage formats.
//!
//! ## Overview
//!
//! - **Formats**: hypersparse, sparse, bitmap and full, with optional iso
//!   values (one value shared by every entry) and jumbled (unsorted) index
//!   lists.
//! - **Masks**: structural or valued, optionally complemented.
//! - **Types**: eleven built-in scalar types with full casting between them,
//!   plus opaque user-defined types of any size.
//! - **Operators**: twenty built-in binary operators and user closures.
//!
//! ## Algorithm Components
//!
//! 1. **Analysis**: decide which vectors the result can hold and map each of
//!    them to the vectors of A, B and the mask.
//!
//! 2. **Count**: cut the work into balanced tasks (large vectors are split
//!    across tasks) and count the entries of every result vector.
//!
//! 3. **Compute**: fill the result in parallel. Built-in operators on
//!    matching types run a specialized kernel; everything else goes through
//!    a generic kernel that casts through byte buffers.
//!
//! ## Usage
//!
//! ```
//! use ewise::{ewise_mult, BinaryOp, ElementType, EwiseConfig, Mask, Matrix, Opcode, Sparsity};
//!
//! let a = Matrix::from_triplets(4, 4, &[(0, 0, 2.0f64), (3, 1, 4.0), (2, 3, 1.0)], Sparsity::Sparse).unwrap();
//! let b = Matrix::from_triplets(4, 4, &[(0, 0, 5.0f64), (3, 1, 0.5)], Sparsity::Bitmap).unwrap();
//! let times = BinaryOp::of::<f64>(Opcode::Times).unwrap();
//! let config = EwiseConfig::default();
//!
//! let c = ewise_mult(&ElementType::FP64, true, None, &times, &a, &b, &config).unwrap();
//! assert_eq!(c.to_tuples::<f64>().unwrap(), vec![(0, 0, 10.0), (3, 1, 2.0)]);
//!
//! // Keep only the entries outside the pattern of `b`
//! let mask = Mask::structural(&b).complemented();
//! let plus = BinaryOp::of::<f64>(Opcode::Plus).unwrap();
//! let d = ewise::ewise_add(&ElementType::FP64, true, Some(&mask), Some(&plus), &a, &b, &config).unwrap();
//! assert_eq!(d.to_tuples::<f64>().unwrap(), vec![(2, 3, 1.0)]);
//! ```
//!
//! A reference implementation is available for validation:
//!
//! ```
//! use ewise::{reference_ewise, EwiseKind, ElementType, Matrix, Sparsity};
//!
//! let a = Matrix::from_triplets(2, 2, &[(0, 0, 1i32)], Sparsity::Sparse).unwrap();
//! let b = Matrix::from_triplets(2, 2, &[(1, 1, 2i32)], Sparsity::Sparse).unwrap();
//! let c = reference_ewise(EwiseKind::Add, &ElementType::INT32, None, None, &a, &b).unwrap();
//! assert_eq!(c.len(), 2);
//! ```

pub mod constants;
pub mod error;
pub mod ewise;
pub mod matrix;
pub mod ops;
pub mod parallel;
pub mod utils;

// Re-export primary components
pub use error::{EwiseError, EwiseResult};
pub use ewise::{ewise_add, ewise_mult, EwiseKind};
pub use matrix::config::{EwiseConfig, SystemParameters};
pub use matrix::{matches_reference, reference_ewise};
pub use matrix::{system_allocator, Allocator, SystemAllocator, TrackingAllocator};
pub use matrix::{Bool8, ElementType, Scalar, TypeCode};
pub use matrix::{Mask, Matrix, MatrixParts, Sparsity};
pub use ops::{BinaryOp, Opcode};
pub use utils::{from_dense, from_sprs, to_dense, to_sprs};

/// Version information for the ewise library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
