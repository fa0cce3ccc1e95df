//! Reference implementation of element-wise add and multiply
//!
//! This provides a baseline for correctness testing. Entries of A and B are
//! gathered into an ordered map keyed by position and combined one at a
//! time through the byte-level operator, with no task slicing, no format
//! specific traversal and no specialized kernels.

use std::collections::BTreeMap;

use crate::constants::FLOAT_COMPARISON_EPSILON;
use crate::error::{EwiseError, EwiseResult};
use crate::ewise::EwiseKind;
use crate::matrix::mask::Mask;
use crate::matrix::sparse::Matrix;
use crate::matrix::types::{cast_fn, ElementType, TypeCode};
use crate::ops::BinaryOp;

/// `(index, vector, value bytes)` triplets ordered by vector and index
pub type ByteTuples = Vec<(usize, usize, Vec<u8>)>;

fn cast(what: &'static str, from: &ElementType, value: &[u8], to: &ElementType) -> EwiseResult<Vec<u8>> {
    let f = cast_fn(from, to).ok_or(EwiseError::TypeMismatch {
        what,
        from: from.code(),
        to: to.code(),
    })?;
    let mut out = vec![0u8; to.size()];
    f(value, &mut out);
    Ok(out)
}

/// Computes the entries of `C<M> = A ⊕ B` (add) or `C<M> = A ⊗ B` (mult)
///
/// Without an operator the entries of B overwrite those of A, without any
/// check that the patterns are disjoint.
pub fn reference_ewise(
    kind: EwiseKind,
    ctype: &ElementType,
    mask: Option<&Mask<'_>>,
    op: Option<&BinaryOp>,
    a: &Matrix,
    b: &Matrix,
) -> EwiseResult<ByteTuples> {
    let implicit = BinaryOp::second_for(a.element_type());
    let op = op.unwrap_or(&implicit);

    let mut entries: BTreeMap<(usize, usize), (Option<&[u8]>, Option<&[u8]>)> = BTreeMap::new();
    a.for_each_entry(|i, j, pos| {
        entries.entry((j, i)).or_default().0 = Some(a.value_bytes(pos));
    });
    b.for_each_entry(|i, j, pos| {
        entries.entry((j, i)).or_default().1 = Some(b.value_bytes(pos));
    });

    let mut out = Vec::with_capacity(entries.len());
    for ((j, i), sources) in entries {
        if mask.is_some_and(|m| !m.admits(i, j)) {
            continue;
        }
        let value = match (sources, kind) {
            ((Some(x), Some(y)), _) => {
                let x = if op.reads_x() {
                    cast("A", a.element_type(), x, op.xtype())?
                } else {
                    vec![0u8; op.xtype().size()]
                };
                let y = if op.reads_y() {
                    cast("B", b.element_type(), y, op.ytype())?
                } else {
                    vec![0u8; op.ytype().size()]
                };
                let mut z = vec![0u8; op.ztype().size()];
                op.apply_bytes(&x, &y, &mut z);
                cast("operator result", op.ztype(), &z, ctype)?
            }
            ((Some(x), None), EwiseKind::Add) => cast("A", a.element_type(), x, ctype)?,
            ((None, Some(y)), EwiseKind::Add) => cast("B", b.element_type(), y, ctype)?,
            _ => continue,
        };
        out.push((i, j, value));
    }
    Ok(out)
}

/// Whether two values of type `ty` agree
///
/// Floating-point values are compared with a relative tolerance; every
/// other type must match byte for byte.
pub fn values_agree(ty: &ElementType, x: &[u8], y: &[u8]) -> bool {
    let close = |x: f64, y: f64| {
        x == y
            || (x.is_nan() && y.is_nan())
            || (x - y).abs() <= FLOAT_COMPARISON_EPSILON * x.abs().max(y.abs()).max(1.0)
    };
    match ty.code() {
        TypeCode::Fp32 => close(
            bytemuck::pod_read_unaligned::<f32>(x) as f64,
            bytemuck::pod_read_unaligned::<f32>(y) as f64,
        ),
        TypeCode::Fp64 => close(
            bytemuck::pod_read_unaligned::<f64>(x),
            bytemuck::pod_read_unaligned::<f64>(y),
        ),
        _ => x == y,
    }
}

/// Whether `c` holds exactly the expected entries
pub fn matches_reference(c: &Matrix, expected: &ByteTuples) -> bool {
    let got = c.to_byte_tuples();
    got.len() == expected.len()
        && got.iter().zip(expected).all(|((i, j, x), (ei, ej, ex))| {
            i == ei && j == ej && values_agree(c.element_type(), x, ex)
        })
}
