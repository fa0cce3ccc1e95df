//! Centralized constants for the element-wise engine
//!
//! All tuning knobs and fixed sizes live here rather than scattered through
//! the code.

// ============================================================================
// TASK SCHEDULING
// ============================================================================

/// Work units a single thread is given before another thread is worth using.
/// Vectors with more work than this may be split across tasks.
pub const DEFAULT_CHUNK: usize = 64 * 1024;

/// Tasks created per thread when more than one thread is used
pub const DEFAULT_TASKS_PER_THREAD: usize = 16;

/// Extra work charged to every output vector, so long runs of empty vectors
/// still spread across tasks
pub const PER_VECTOR_WORK: usize = 1;

// ============================================================================
// MEMORY
// ============================================================================

/// Alignment of value arrays in bytes
pub const VALUE_ALIGN: usize = 64;

// ============================================================================
// FORMAT SELECTION
// ============================================================================

/// Default ratio of non-empty vectors to vdim below which a result is kept
/// hypersparse by [`Matrix::conform`](crate::Matrix::conform)
pub const DEFAULT_HYPER_SWITCH: f64 = 0.0625;

// ============================================================================
// DISPLAY AND DEBUG CONSTANTS
// ============================================================================

/// Maximum vectors to print in debug display
pub const MAX_DISPLAY_VECTORS: usize = 5;

/// Maximum elements per vector in debug display
pub const MAX_DISPLAY_ELEMENTS_PER_VECTOR: usize = 5;

// ============================================================================
// FLOATING POINT TOLERANCES
// ============================================================================

/// Standard floating point comparison epsilon
pub const FLOAT_COMPARISON_EPSILON: f64 = 1e-10;
