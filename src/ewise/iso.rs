//! Iso result detection
//!
//! A result is iso when every entry provably gets the same value, decided
//! from the operator and the iso-ness of the inputs alone:
//!
//! - multiply: every operand the operator reads comes from an iso input
//!   (this covers `PAIR`, `FIRST` with iso A, `SECOND` with iso B, and two
//!   iso inputs);
//! - add: both inputs are iso and the three ways an entry can be formed
//!   (A alone, B alone, both) produce the same value in the result type.

use crate::error::{EwiseError, EwiseResult};
use crate::ewise::EwiseKind;
use crate::matrix::sparse::Matrix;
use crate::matrix::types::{cast_fn, ElementType};
use crate::ops::BinaryOp;

fn cast_value(what: &'static str, from: &ElementType, value: &[u8], to: &ElementType) -> EwiseResult<Vec<u8>> {
    let cast = cast_fn(from, to).ok_or(EwiseError::TypeMismatch {
        what,
        from: from.code(),
        to: to.code(),
    })?;
    let mut out = vec![0u8; to.size()];
    cast(value, &mut out);
    Ok(out)
}

/// The single value of an iso input
fn iso_scalar(x: &Matrix) -> Option<&[u8]> {
    let size = x.element_type().size();
    (x.is_iso() && x.x_bytes().len() >= size).then(|| &x.x_bytes()[..size])
}

/// `op(a0, b0)` in the result type; operands the operator ignores may be
/// missing
fn apply(
    op: &BinaryOp,
    a: &Matrix,
    a0: Option<&[u8]>,
    b: &Matrix,
    b0: Option<&[u8]>,
    ctype: &ElementType,
) -> EwiseResult<Vec<u8>> {
    let x = match a0 {
        Some(a0) if op.reads_x() => cast_value("A", a.element_type(), a0, op.xtype())?,
        _ => vec![0u8; op.xtype().size()],
    };
    let y = match b0 {
        Some(b0) if op.reads_y() => cast_value("B", b.element_type(), b0, op.ytype())?,
        _ => vec![0u8; op.ytype().size()],
    };
    let mut z = vec![0u8; op.ztype().size()];
    op.apply_bytes(&x, &y, &mut z);
    cast_value("operator result", op.ztype(), &z, ctype)
}

/// The value every result entry holds, when the result is iso
pub fn iso_value(
    kind: EwiseKind,
    op: &BinaryOp,
    a: &Matrix,
    b: &Matrix,
    ctype: &ElementType,
) -> EwiseResult<Option<Vec<u8>>> {
    let a0 = iso_scalar(a);
    let b0 = iso_scalar(b);
    match kind {
        EwiseKind::Mult => {
            let x_known = !op.reads_x() || a0.is_some();
            let y_known = !op.reads_y() || b0.is_some();
            if x_known && y_known {
                apply(op, a, a0, b, b0, ctype).map(Some)
            } else {
                Ok(None)
            }
        }
        EwiseKind::Add => {
            let (Some(a0), Some(b0)) = (a0, b0) else {
                return Ok(None);
            };
            let ca = cast_value("A", a.element_type(), a0, ctype)?;
            let cb = cast_value("B", b.element_type(), b0, ctype)?;
            if ca != cb {
                return Ok(None);
            }
            let cz = apply(op, a, Some(a0), b, Some(b0), ctype)?;
            Ok((cz == ca).then_some(ca))
        }
    }
}
