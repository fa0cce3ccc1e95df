//! Utility functions and helpers

pub mod formats;

pub use formats::{from_dense, from_sprs, to_dense, to_sprs};

/// Exclusive prefix sum computed in place
///
/// Afterwards `values[k]` holds the sum of the original `values[..k]`.
/// Returns the sum of all original values, which is also what the last slot
/// ends up holding when its original value was zero.
pub fn exclusive_scan_in_place(values: &mut [usize]) -> usize {
    let mut sum = 0;
    for v in values.iter_mut() {
        let count = *v;
        *v = sum;
        sum += count;
    }
    sum
}
