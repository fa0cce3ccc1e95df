// Matrix data structures and operations

pub mod block;
pub mod config;
pub mod conversion;
pub mod mask;
pub mod prune;
pub mod reference;
pub mod sparse;
pub mod types;

pub use block::{system_allocator, Allocator, Block, SystemAllocator, TrackingAllocator, ValueArray};
pub use config::{EwiseConfig, SystemParameters};
pub use mask::Mask;
pub use reference::{matches_reference, reference_ewise, values_agree, ByteTuples};
pub use sparse::{Matrix, MatrixParts, Sparsity};
pub use types::{Bool8, ElementType, Scalar, TypeCode, Value};
