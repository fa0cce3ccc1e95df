//! Per-entry kernels used by the compute pass
//!
//! The compute pass walks the output pattern and, for every entry, calls one
//! of three kernel methods depending on where the entry comes from. A kernel
//! owns the way values are read from A and B and written to C:
//!
//! - [`TypedKernel`]: A, B and the operator share a built-in type and C has
//!   the operator's result type; values are read and written as native
//!   scalars.
//! - [`GenericKernel`]: anything else; values are cast through byte buffers.
//! - [`PatternKernel`]: the result is iso, so only the pattern is written.

use std::marker::PhantomData;

use bytemuck::Pod;

use crate::matrix::sparse::Matrix;
use crate::matrix::types::{CastFn, Scalar};
use crate::ops::native::BinaryFunctor;
use crate::ops::BinaryOp;

/// Writes the value of one output entry
///
/// `cx` is the slice of output cells owned by the current task and `pos` an
/// entry position relative to it. An entry occupies
/// [`EntryKernel::cells_per_entry`] cells.
pub trait EntryKernel: Sync {
    type Cell: Pod + Send;
    type Scratch;

    /// Per-task workspace
    fn scratch(&self) -> Self::Scratch;

    fn cells_per_entry(&self) -> usize;

    /// Entry present in both A (at `pa`) and B (at `pb`)
    fn both(&self, s: &mut Self::Scratch, cx: &mut [Self::Cell], pos: usize, pa: usize, pb: usize);

    /// Entry present only in A
    fn a_only(&self, s: &mut Self::Scratch, cx: &mut [Self::Cell], pos: usize, pa: usize);

    /// Entry present only in B
    fn b_only(&self, s: &mut Self::Scratch, cx: &mut [Self::Cell], pos: usize, pb: usize);
}

/// Specialized kernel for the functor `F` over the scalar `T`
pub struct TypedKernel<'a, T: Scalar, F: BinaryFunctor<T>> {
    ax: &'a [T],
    bx: &'a [T],
    a_iso: bool,
    b_iso: bool,
    _op: PhantomData<F>,
}

impl<'a, T: Scalar, F: BinaryFunctor<T>> TypedKernel<'a, T, F> {
    pub fn new(a: &'a Matrix, b: &'a Matrix) -> Self {
        Self {
            ax: a.values().as_typed::<T>(),
            bx: b.values().as_typed::<T>(),
            a_iso: a.is_iso(),
            b_iso: b.is_iso(),
            _op: PhantomData,
        }
    }

    #[inline(always)]
    fn a(&self, pa: usize) -> T {
        if self.a_iso {
            self.ax[0]
        } else {
            self.ax[pa]
        }
    }

    #[inline(always)]
    fn b(&self, pb: usize) -> T {
        if self.b_iso {
            self.bx[0]
        } else {
            self.bx[pb]
        }
    }
}

impl<T: Scalar, F: BinaryFunctor<T>> EntryKernel for TypedKernel<'_, T, F> {
    type Cell = F::Z;
    type Scratch = ();

    fn scratch(&self) {}

    fn cells_per_entry(&self) -> usize {
        1
    }

    #[inline(always)]
    fn both(&self, _s: &mut (), cx: &mut [F::Z], pos: usize, pa: usize, pb: usize) {
        let x = if F::OPCODE.reads_x() { self.a(pa) } else { T::zero() };
        let y = if F::OPCODE.reads_y() { self.b(pb) } else { T::zero() };
        cx[pos] = F::apply(x, y);
    }

    #[inline(always)]
    fn a_only(&self, _s: &mut (), cx: &mut [F::Z], pos: usize, pa: usize) {
        cx[pos] = self.a(pa).cast();
    }

    #[inline(always)]
    fn b_only(&self, _s: &mut (), cx: &mut [F::Z], pos: usize, pb: usize) {
        cx[pos] = self.b(pb).cast();
    }
}

/// Cast functions selected once per call for the generic kernel
#[derive(Clone, Copy)]
pub struct GenericCasts {
    /// A to the operator's x type (absent when x is not read)
    pub a_to_x: Option<CastFn>,
    /// B to the operator's y type (absent when y is not read)
    pub b_to_y: Option<CastFn>,
    /// Operator result to C
    pub z_to_c: CastFn,
    /// A to C, for entries only A holds
    pub a_to_c: Option<CastFn>,
    /// B to C, for entries only B holds
    pub b_to_c: Option<CastFn>,
}

/// Byte-casting kernel that works for every type and operator
pub struct GenericKernel<'a> {
    a: &'a Matrix,
    b: &'a Matrix,
    op: &'a BinaryOp,
    casts: GenericCasts,
    csize: usize,
}

/// Workspace of the generic kernel: one x, y and z value
pub struct GenericScratch {
    x: Vec<u8>,
    y: Vec<u8>,
    z: Vec<u8>,
}

impl<'a> GenericKernel<'a> {
    pub fn new(a: &'a Matrix, b: &'a Matrix, op: &'a BinaryOp, casts: GenericCasts, csize: usize) -> Self {
        Self {
            a,
            b,
            op,
            casts,
            csize,
        }
    }

    #[inline]
    fn cell<'c>(&self, cx: &'c mut [u8], pos: usize) -> &'c mut [u8] {
        &mut cx[pos * self.csize..(pos + 1) * self.csize]
    }
}

impl EntryKernel for GenericKernel<'_> {
    type Cell = u8;
    type Scratch = GenericScratch;

    fn scratch(&self) -> GenericScratch {
        GenericScratch {
            x: vec![0; self.op.xtype().size()],
            y: vec![0; self.op.ytype().size()],
            z: vec![0; self.op.ztype().size()],
        }
    }

    fn cells_per_entry(&self) -> usize {
        self.csize
    }

    fn both(&self, s: &mut GenericScratch, cx: &mut [u8], pos: usize, pa: usize, pb: usize) {
        if let Some(cast) = self.casts.a_to_x {
            cast(self.a.value_bytes(pa), &mut s.x);
        }
        if let Some(cast) = self.casts.b_to_y {
            cast(self.b.value_bytes(pb), &mut s.y);
        }
        self.op.apply_bytes(&s.x, &s.y, &mut s.z);
        (self.casts.z_to_c)(&s.z, self.cell(cx, pos));
    }

    fn a_only(&self, _s: &mut GenericScratch, cx: &mut [u8], pos: usize, pa: usize) {
        if let Some(cast) = self.casts.a_to_c {
            cast(self.a.value_bytes(pa), self.cell(cx, pos));
        }
    }

    fn b_only(&self, _s: &mut GenericScratch, cx: &mut [u8], pos: usize, pb: usize) {
        if let Some(cast) = self.casts.b_to_c {
            cast(self.b.value_bytes(pb), self.cell(cx, pos));
        }
    }
}

/// Kernel for iso results: the value is already stored, nothing to write
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternKernel;

impl EntryKernel for PatternKernel {
    type Cell = u8;
    type Scratch = ();

    fn scratch(&self) {}

    fn cells_per_entry(&self) -> usize {
        0
    }

    #[inline(always)]
    fn both(&self, _s: &mut (), _cx: &mut [u8], _pos: usize, _pa: usize, _pb: usize) {}

    #[inline(always)]
    fn a_only(&self, _s: &mut (), _cx: &mut [u8], _pos: usize, _pa: usize) {}

    #[inline(always)]
    fn b_only(&self, _s: &mut (), _cx: &mut [u8], _pos: usize, _pb: usize) {}
}
