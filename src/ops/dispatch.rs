//! Kernel selection
//!
//! The choice between the specialized and the generic kernel is made once
//! per call. The caller supplies a [`KernelVisitor`] that is monomorphized
//! for whichever kernel is chosen, so the per-entry loop never branches on
//! types or opcodes.

use crate::error::{EwiseError, EwiseResult};
use crate::matrix::sparse::Matrix;
use crate::matrix::types::{cast_fn, with_scalar, ElementType, Scalar};
use crate::ops::kernel::{EntryKernel, GenericCasts, GenericKernel, PatternKernel, TypedKernel};
use crate::ops::native::{with_functor, BinaryFunctor};
use crate::ops::{BinaryOp, Opcode};

/// Code run with the selected kernel
pub trait KernelVisitor {
    type Output;

    fn visit<K: EntryKernel>(self, kernel: K) -> Self::Output;
}

/// Which kernel family a call uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelPath {
    Specialized,
    Generic,
    Pattern,
}

/// Everything kernel selection looks at
pub struct KernelInputs<'a> {
    pub a: &'a Matrix,
    pub b: &'a Matrix,
    pub op: &'a BinaryOp,
    pub ctype: &'a ElementType,
    /// The result is iso and its value already computed
    pub iso: bool,
    /// Never use the specialized path
    pub force_generic: bool,
    /// Entries held by only one input reach C (union)
    pub one_sided: bool,
}

impl KernelInputs<'_> {
    /// True when the specialized path can evaluate this call
    pub fn specializable(&self) -> bool {
        let op = self.op;
        !self.force_generic
            && op.opcode() != Opcode::User
            && op.xtype().is_builtin()
            && self.a.element_type() == op.xtype()
            && self.b.element_type() == op.xtype()
            && op.ytype() == op.xtype()
            && op.ztype() == self.ctype
    }

    /// Cast functions for the generic kernel
    ///
    /// # Errors
    ///
    /// Returns [`EwiseError::TypeMismatch`] naming the first cast that does
    /// not exist.
    pub fn generic_casts(&self) -> EwiseResult<GenericCasts> {
        let op = self.op;
        let need = |what: &'static str, from: &ElementType, to: &ElementType| {
            cast_fn(from, to).ok_or(EwiseError::TypeMismatch {
                what,
                from: from.code(),
                to: to.code(),
            })
        };
        let a_to_x = if op.reads_x() {
            Some(need("A", self.a.element_type(), op.xtype())?)
        } else {
            None
        };
        let b_to_y = if op.reads_y() {
            Some(need("B", self.b.element_type(), op.ytype())?)
        } else {
            None
        };
        let z_to_c = need("operator result", op.ztype(), self.ctype)?;
        let (a_to_c, b_to_c) = if self.one_sided {
            (
                Some(need("A", self.a.element_type(), self.ctype)?),
                Some(need("B", self.b.element_type(), self.ctype)?),
            )
        } else {
            (None, None)
        };
        Ok(GenericCasts {
            a_to_x,
            b_to_y,
            z_to_c,
            a_to_c,
            b_to_c,
        })
    }
}

/// Selects a kernel and runs `visitor` with it
pub fn dispatch<V: KernelVisitor>(
    inputs: &KernelInputs<'_>,
    visitor: V,
) -> EwiseResult<(KernelPath, V::Output)> {
    if inputs.iso {
        log::debug!("iso result: pattern-only kernel");
        return Ok((KernelPath::Pattern, visitor.visit(PatternKernel)));
    }

    // The specialized attempt hands the visitor back when it declines
    let visitor = if inputs.specializable() {
        let opcode = inputs.op.opcode();
        let code = inputs.op.xtype().code();
        match with_scalar!(code, T => {
            with_functor!(opcode, F => visit_typed_or_return::<T, F, V>(inputs, visitor), _ => Err(visitor))
        }, _ => Err(visitor))
        {
            Ok(output) => {
                log::debug!("specialized kernel {}", inputs.op.name());
                return Ok((KernelPath::Specialized, output));
            }
            Err(visitor) => visitor,
        }
    } else {
        visitor
    };

    let casts = inputs.generic_casts()?;
    log::debug!(
        "generic kernel {} ({} ⊕ {} -> {})",
        inputs.op.name(),
        inputs.a.element_type(),
        inputs.b.element_type(),
        inputs.ctype
    );
    let kernel = GenericKernel::new(inputs.a, inputs.b, inputs.op, casts, inputs.ctype.size());
    Ok((KernelPath::Generic, visitor.visit(kernel)))
}

fn visit_typed_or_return<T, F, V>(inputs: &KernelInputs<'_>, visitor: V) -> Result<V::Output, V>
where
    T: Scalar,
    F: BinaryFunctor<T>,
    V: KernelVisitor,
{
    if <F::Z as Scalar>::TYPE != *inputs.ctype {
        return Err(visitor);
    }
    Ok(visitor.visit(TypedKernel::<T, F>::new(inputs.a, inputs.b)))
}
