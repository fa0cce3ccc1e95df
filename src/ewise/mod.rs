//! Element-wise add and multiply
//!
//! Both operations run the same three phases:
//!
//! 1. **Analysis** ([`analysis`]): decide which vectors the result can have
//!    and map every result vector to the matching vector of A, B and the
//!    mask.
//! 2. **Count** ([`count`]): slice the work into tasks ([`slice`]) and count
//!    the entries of every result vector. The counts become the result's
//!    vector pointers.
//! 3. **Compute** ([`compute`]): fill the index and value arrays, with a
//!    kernel chosen once per call ([`crate::ops::dispatch`]).
//!
//! Add keeps the union of the two patterns and multiply the intersection.
//! The choice is a const parameter of the shared traversal in [`skeleton`],
//! so neither pass tests it per entry.

pub mod analysis;
pub mod compute;
pub mod count;
pub mod iso;
pub mod method;
pub mod skeleton;
pub mod slice;

use std::sync::Arc;

use crate::error::{EwiseError, EwiseResult};
use crate::matrix::block::{Allocator, Block};
use crate::matrix::config::EwiseConfig;
use crate::matrix::mask::Mask;
use crate::matrix::sparse::Matrix;
use crate::matrix::types::ElementType;
use crate::ops::dispatch::{dispatch, KernelInputs};
use crate::ops::BinaryOp;
use crate::parallel::{fill_indexed, with_pool};
use crate::utils::exclusive_scan_in_place;

use analysis::analyze;
use compute::ComputeVisitor;
use count::count_entries;
use iso::iso_value;
use method::select_method;
use skeleton::Operands;
use slice::{merge_counts, search_slot, slice_work, task_count, TaskTally};

/// Which pattern the result takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EwiseKind {
    /// Union of the patterns of A and B
    Add,
    /// Intersection of the patterns of A and B
    Mult,
}

/// `C<M> = A ⊕ B` over the union of the patterns of A and B
///
/// Entries present in both inputs are combined with `op`; entries present in
/// only one are cast to `ctype`. Without an operator the patterns of A and B
/// must be disjoint and the entries are copied as they are.
///
/// # Arguments
///
/// * `ctype` - Element type of the result
/// * `c_by_col` - Storage orientation of the result
/// * `mask` - Optional mask restricting which entries the result may hold
/// * `op` - Combining operator, or `None` to merge disjoint patterns
/// * `a`, `b` - Inputs of identical shape and orientation
/// * `config` - Threads, task sizing, allocator
///
/// # Errors
///
/// * [`EwiseError::DimensionMismatch`] / [`EwiseError::OrientationMismatch`]
///   when the shapes or orientations of A, B and the mask disagree
/// * [`EwiseError::TypeMismatch`] when a needed cast does not exist
/// * [`EwiseError::NullOpMaskPresent`] when a mask is given without operator
/// * [`EwiseError::NullOpOverlap`] when the patterns overlap without operator
/// * [`EwiseError::OutOfMemory`] when the allocator refuses a request; all
///   workspace allocated so far is released
///
/// # Examples
///
/// ```
/// use ewise::{ewise_add, BinaryOp, ElementType, EwiseConfig, Matrix, Opcode, Sparsity};
///
/// let a = Matrix::from_triplets(3, 3, &[(0, 0, 1.0f64), (1, 1, 2.0)], Sparsity::Sparse).unwrap();
/// let b = Matrix::from_triplets(3, 3, &[(1, 1, 3.0f64), (2, 2, 4.0)], Sparsity::Sparse).unwrap();
/// let plus = BinaryOp::of::<f64>(Opcode::Plus).unwrap();
///
/// let c = ewise_add(&ElementType::FP64, true, None, Some(&plus), &a, &b, &EwiseConfig::default()).unwrap();
/// assert_eq!(c.to_tuples::<f64>().unwrap(), vec![(0, 0, 1.0), (1, 1, 5.0), (2, 2, 4.0)]);
/// ```
pub fn ewise_add(
    ctype: &ElementType,
    c_by_col: bool,
    mask: Option<&Mask<'_>>,
    op: Option<&BinaryOp>,
    a: &Matrix,
    b: &Matrix,
    config: &EwiseConfig,
) -> EwiseResult<Matrix> {
    ewise(EwiseKind::Add, ctype, c_by_col, mask, op, a, b, config)
}

/// `C<M> = A ⊗ B` over the intersection of the patterns of A and B
///
/// Arguments and errors as for [`ewise_add`], except that an operator is
/// always required.
pub fn ewise_mult(
    ctype: &ElementType,
    c_by_col: bool,
    mask: Option<&Mask<'_>>,
    op: &BinaryOp,
    a: &Matrix,
    b: &Matrix,
    config: &EwiseConfig,
) -> EwiseResult<Matrix> {
    ewise(EwiseKind::Mult, ctype, c_by_col, mask, Some(op), a, b, config)
}

/// Shared entry point of [`ewise_add`] and [`ewise_mult`]
#[allow(clippy::too_many_arguments)]
pub fn ewise(
    kind: EwiseKind,
    ctype: &ElementType,
    c_by_col: bool,
    mask: Option<&Mask<'_>>,
    op: Option<&BinaryOp>,
    a: &Matrix,
    b: &Matrix,
    config: &EwiseConfig,
) -> EwiseResult<Matrix> {
    check_inputs(kind, ctype, mask, op, a, b)?;

    let implicit;
    let (op, disjoint) = match op {
        Some(op) => (op, false),
        None => {
            implicit = BinaryOp::second_for(a.element_type());
            (&implicit, true)
        }
    };

    let a_sorted = sorted(a, &config.allocator)?;
    let a = a_sorted.as_ref().unwrap_or(a);
    let b_sorted = sorted(b, &config.allocator)?;
    let b = b_sorted.as_ref().unwrap_or(b);
    let m_sorted = mask.map(|m| sorted(m.matrix, &config.allocator)).transpose()?.flatten();
    let mask = mask.map(|m| Mask {
        matrix: m_sorted.as_ref().unwrap_or(m.matrix),
        ..*m
    });

    log::debug!(
        "ewise {kind:?} {}: A {:?} {}x{} ({} vals), B {:?} ({} vals), mask: {}",
        op.name(),
        a.sparsity(),
        a.vlen(),
        a.vdim(),
        a.nvals(),
        b.sparsity(),
        b.nvals(),
        mask.map_or("none", |m| if m.complement { "complemented" } else { "plain" }),
    );

    let n_threads = config.n_threads();
    let mut c = with_pool(n_threads, || {
        run(kind, ctype, mask.as_ref(), op, disjoint, a, b, config)
    })??;

    if let Some(ratio) = config.hyper_switch {
        c.conform(ratio)?;
    }
    if c.by_col() != c_by_col {
        c = c.transpose_storage()?;
    }
    Ok(c)
}

/// Sorted copy of a jumbled input, charged to the call's allocator
fn sorted(x: &Matrix, alloc: &Arc<dyn Allocator>) -> EwiseResult<Option<Matrix>> {
    if x.is_jumbled() {
        log::debug!("sorting jumbled input");
        x.unjumbled_in(alloc).map(Some)
    } else {
        Ok(None)
    }
}

fn check_shape(what: &'static str, a: &Matrix, x: &Matrix) -> EwiseResult<()> {
    if x.vlen() != a.vlen() || x.vdim() != a.vdim() {
        return Err(EwiseError::DimensionMismatch {
            what,
            vlen: a.vlen(),
            vdim: a.vdim(),
            got_vlen: x.vlen(),
            got_vdim: x.vdim(),
        });
    }
    if x.by_col() != a.by_col() {
        return Err(EwiseError::OrientationMismatch { what });
    }
    Ok(())
}

fn check_cast(what: &'static str, from: &ElementType, to: &ElementType) -> EwiseResult<()> {
    if from.can_cast_to(to) {
        Ok(())
    } else {
        Err(EwiseError::TypeMismatch {
            what,
            from: from.code(),
            to: to.code(),
        })
    }
}

/// Precondition checks, run before anything is allocated
fn check_inputs(
    kind: EwiseKind,
    ctype: &ElementType,
    mask: Option<&Mask<'_>>,
    op: Option<&BinaryOp>,
    a: &Matrix,
    b: &Matrix,
) -> EwiseResult<()> {
    check_shape("B", a, b)?;
    if let Some(m) = mask {
        check_shape("M", a, m.matrix)?;
        if !m.structural && !m.matrix.element_type().is_builtin() {
            log::warn!(
                "valued mask of user type {}: entries with any nonzero byte count as true",
                m.matrix.element_type()
            );
        }
    }

    let Some(op) = op else {
        if kind == EwiseKind::Mult {
            return Err(EwiseError::invalid_value(
                "element-wise multiply requires an operator",
            ));
        }
        if mask.is_some() {
            return Err(EwiseError::NullOpMaskPresent);
        }
        if b.element_type() != a.element_type() {
            return Err(EwiseError::TypeMismatch {
                what: "B",
                from: b.element_type().code(),
                to: a.element_type().code(),
            });
        }
        if ctype != a.element_type() {
            return Err(EwiseError::TypeMismatch {
                what: "C",
                from: a.element_type().code(),
                to: ctype.code(),
            });
        }
        return Ok(());
    };

    if op.reads_x() {
        check_cast("A", a.element_type(), op.xtype())?;
    }
    if op.reads_y() {
        check_cast("B", b.element_type(), op.ytype())?;
    }
    check_cast("operator result", op.ztype(), ctype)?;
    if kind == EwiseKind::Add {
        check_cast("A", a.element_type(), ctype)?;
        check_cast("B", b.element_type(), ctype)?;
    }
    Ok(())
}

/// The three phases, run inside the thread pool
#[allow(clippy::too_many_arguments)]
fn run(
    kind: EwiseKind,
    ctype: &ElementType,
    mask: Option<&Mask<'_>>,
    op: &BinaryOp,
    disjoint: bool,
    a: &Matrix,
    b: &Matrix,
    config: &EwiseConfig,
) -> EwiseResult<Matrix> {
    let alloc = &config.allocator;
    let n_threads = config.n_threads();

    // phase 0: analysis
    let mut analysis = analyze(kind, a, b, mask, alloc)?;
    let method = select_method(kind, a, b, mask);
    let vlen = a.vlen();
    let nvec = analysis.nvec(a.vdim());
    log::debug!(
        "analysis: {nvec} result vectors ({}), method {method:?}",
        if analysis.ch.is_some() { "hypersparse" } else { "sparse" }
    );

    let ops = Operands {
        a,
        b,
        mask,
        maps: &analysis.maps,
        ch: analysis.ch.as_deref(),
        method,
    };

    // task slicing
    let mut work = Block::filled(alloc, nvec + 1, 0usize)?;
    fill_indexed(&mut work[..nvec], n_threads > 1, |k| ops.vector_work(k));
    let total_work = exclusive_scan_in_place(&mut work);
    let ntasks = task_count(total_work, n_threads, config.tasks_per_thread, config.chunk);
    let tasks = slice_work(alloc, &work, vlen, ntasks, config.chunk, |k, offset| {
        search_slot(vlen, offset, |i| ops.work_before(k, i))
    })?;
    drop(work);

    // phase 1: count
    let tallies: Vec<TaskTally> = match kind {
        EwiseKind::Add => count_entries::<true>(alloc, &ops, &tasks)?,
        EwiseKind::Mult => count_entries::<false>(alloc, &ops, &tasks)?,
    };
    let mut cp = Block::filled(alloc, nvec + 1, 0usize)?;
    let merged = merge_counts(alloc, &tasks, &tallies, &mut cp)?;
    log::debug!(
        "count: {} entries in {} nonempty vectors, {} tasks",
        merged.nnz,
        merged.nvec_nonempty,
        tasks.len()
    );
    if disjoint && merged.overlaps > 0 {
        return Err(EwiseError::NullOpOverlap {
            overlaps: merged.overlaps,
        });
    }

    // phase 2: compute
    let iso = iso_value(kind, op, a, b, ctype)?;
    let ch = analysis.ch.take();
    let mut c = Matrix::alloc_pattern(alloc, ctype.clone(), vlen, a.vdim(), a.by_col(), cp, ch)?;
    c.alloc_values(merged.nnz, iso.is_some())?;
    {
        let parts = c.compute_parts();
        if let Some(value) = &iso {
            parts.x[..value.len()].copy_from_slice(value);
        }
        let ops = Operands {
            a,
            b,
            mask,
            maps: &analysis.maps,
            ch: parts.h,
            method,
        };
        let inputs = KernelInputs {
            a,
            b,
            op,
            ctype,
            iso: iso.is_some(),
            force_generic: config.force_generic,
            one_sided: kind == EwiseKind::Add,
        };
        let visitor = ComputeVisitor {
            ops: &ops,
            tasks: &tasks,
            cp_kfirst: &merged.cp_kfirst,
            ci: parts.i,
            cx: parts.x,
            union: kind == EwiseKind::Add,
        };
        let (path, ()) = dispatch(&inputs, visitor)?;
        log::debug!("compute: {path:?} kernel");
    }

    c.set_nvec_nonempty(merged.nvec_nonempty);
    if c.is_hyper() {
        c.prune_hyper();
    }
    Ok(c)
}
