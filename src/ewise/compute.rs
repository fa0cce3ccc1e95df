//! Compute pass (phase 2)
//!
//! Each task owns the contiguous run of result positions that starts at its
//! `cp_kfirst` entry, so the index and value arrays are split per task and
//! filled without synchronization.

use crate::ewise::skeleton::{Operands, Source};
use crate::ewise::slice::Task;
use crate::ops::dispatch::KernelVisitor;
use crate::ops::kernel::EntryKernel;
use crate::parallel::{map_tasks, split_chunks_mut};

/// Fills the result's index and value arrays with whichever kernel the
/// dispatcher picks
pub struct ComputeVisitor<'a> {
    pub ops: &'a Operands<'a>,
    pub tasks: &'a [Task],
    pub cp_kfirst: &'a [usize],
    pub ci: &'a mut [usize],
    pub cx: &'a mut [u8],
    pub union: bool,
}

impl KernelVisitor for ComputeVisitor<'_> {
    type Output = ();

    fn visit<K: EntryKernel>(self, kernel: K) {
        if self.union {
            fill::<true, K>(self, &kernel);
        } else {
            fill::<false, K>(self, &kernel);
        }
    }
}

fn fill<const UNION: bool, K: EntryKernel>(v: ComputeVisitor<'_>, kernel: &K) {
    let ComputeVisitor {
        ops,
        tasks,
        cp_kfirst,
        ci,
        cx,
        ..
    } = v;
    let cpe = kernel.cells_per_entry();
    let cells: &mut [K::Cell] = if cpe == 0 || cx.is_empty() {
        Default::default()
    } else {
        bytemuck::cast_slice_mut(cx)
    };

    debug_assert_eq!(cp_kfirst.len(), tasks.len());
    let nnz = ci.len();
    let ends = cp_kfirst.iter().skip(1).copied().chain(std::iter::once(nnz));
    let lens = cp_kfirst.iter().zip(ends).map(|(&start, end)| end - start);

    let ci_chunks = split_chunks_mut(ci, lens.clone());
    let cx_chunks = split_chunks_mut(cells, lens.map(|n| n * cpe));
    let work: Vec<_> = tasks
        .iter()
        .copied()
        .zip(ci_chunks)
        .zip(cx_chunks)
        .map(|((task, ci), cx)| (task, ci, cx))
        .collect();

    let vlen = ops.vlen();
    map_tasks(work, |(task, ci, cx)| {
        let mut scratch = kernel.scratch();
        let mut pos = 0;
        for k in task.vectors() {
            let (lo, hi) = task.slot_range(k, vlen);
            ops.for_each_entry::<UNION>(k, lo, hi, |i, src| {
                ci[pos] = i;
                match src {
                    Source::Both(pa, pb) => kernel.both(&mut scratch, cx, pos, pa, pb),
                    Source::AOnly(pa) => kernel.a_only(&mut scratch, cx, pos, pa),
                    Source::BOnly(pb) => kernel.b_only(&mut scratch, cx, pos, pb),
                }
                pos += 1;
            });
        }
        debug_assert_eq!(pos, ci.len());
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ewise::analysis::analyze;
    use crate::ewise::count::count_entries;
    use crate::ewise::method::select_method;
    use crate::ewise::slice::merge_counts;
    use crate::ewise::EwiseKind;
    use crate::matrix::block::{system_allocator, Block};
    use crate::matrix::sparse::{Matrix, Sparsity};
    use crate::ops::kernel::TypedKernel;
    use crate::ops::native::Plus;

    #[test]
    fn test_split_vector_writes_at_task_offsets() {
        let a = Matrix::full(8, 1, (0..8).map(|i| i as f64).collect()).unwrap();
        let b = Matrix::from_triplets(8, 1, &[(1usize, 0usize, 100.0f64), (5, 0, 100.0)], Sparsity::Sparse)
            .unwrap();
        let alloc = system_allocator();
        let analysis = analyze(EwiseKind::Add, &a, &b, None, &alloc).unwrap();
        let ops = Operands {
            a: &a,
            b: &b,
            mask: None,
            maps: &analysis.maps,
            ch: None,
            method: select_method(EwiseKind::Add, &a, &b, None),
        };
        let tasks = [
            Task { kfirst: 0, klast: 0, first_start: 0, last_end: 3 },
            Task { kfirst: 0, klast: 0, first_start: 3, last_end: 8 },
        ];
        let tallies = count_entries::<true>(&alloc, &ops, &tasks).unwrap();
        let mut cp = Block::filled(&alloc, 2, 0usize).unwrap();
        let merged = merge_counts(&alloc, &tasks, &tallies, &mut cp).unwrap();
        assert_eq!(&merged.cp_kfirst[..], &[0, 3]);

        let mut ci = vec![usize::MAX; merged.nnz];
        let mut cx = vec![0.0f64; merged.nnz];
        let visitor = ComputeVisitor {
            ops: &ops,
            tasks: &tasks,
            cp_kfirst: &merged.cp_kfirst,
            ci: &mut ci,
            cx: bytemuck::cast_slice_mut(&mut cx),
            union: true,
        };
        visitor.visit(TypedKernel::<f64, Plus>::new(&a, &b));

        assert_eq!(ci, (0..8).collect::<Vec<_>>());
        assert_eq!(cx, vec![0.0, 101.0, 2.0, 3.0, 4.0, 105.0, 6.0, 7.0]);
    }
}
