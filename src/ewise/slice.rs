//! Task slicing and merging of per-task counts
//!
//! Work is measured per result vector (see
//! [`Operands::vector_work`](crate::ewise::skeleton::Operands::vector_work))
//! and accumulated into a prefix array. Task boundaries are placed at equal
//! fractions of the total work. A boundary that falls inside a vector whose
//! work exceeds the chunk size splits that vector at a slot; otherwise it
//! rounds down to the start of the vector.
//!
//! Everything here depends only on the work prefix and a slot search, so it
//! behaves the same for every storage format.

use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::error::EwiseResult;
use crate::matrix::block::{Allocator, Block};
use crate::utils::exclusive_scan_in_place;

/// A contiguous run of result vectors handled by one worker
///
/// The task owns slots `[first_start, vlen)` of `kfirst`, all of every
/// vector in between, and slots `[0, last_end)` of `klast`. When
/// `kfirst == klast` it owns `[first_start, last_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Task {
    pub kfirst: usize,
    pub klast: usize,
    pub first_start: usize,
    pub last_end: usize,
}

impl Task {
    /// Result vectors the task touches
    pub fn vectors(&self) -> RangeInclusive<usize> {
        self.kfirst..=self.klast
    }

    /// Slot range of vector `k` owned by this task
    #[inline]
    pub fn slot_range(&self, k: usize, vlen: usize) -> (usize, usize) {
        let lo = if k == self.kfirst { self.first_start } else { 0 };
        let hi = if k == self.klast { self.last_end } else { vlen };
        (lo, hi)
    }
}

/// Number of tasks for a given amount of work
///
/// One thread is used per `chunk` of work, up to `n_threads`. A single
/// thread gets a single task; otherwise each thread gets `tasks_per_thread`
/// tasks, never more tasks than units of work.
pub fn task_count(total_work: usize, n_threads: usize, tasks_per_thread: usize, chunk: usize) -> usize {
    let nthreads = (total_work / chunk.max(1)).clamp(1, n_threads.max(1));
    if nthreads == 1 {
        1
    } else {
        (nthreads * tasks_per_thread.max(1)).min(total_work).max(1)
    }
}

/// Smallest slot `s` in `[0, vlen]` with `work_before(s) >= offset`
///
/// `work_before` must be non-decreasing.
pub fn search_slot(vlen: usize, offset: usize, work_before: impl Fn(usize) -> usize) -> usize {
    let (mut lo, mut hi) = (0, vlen);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if work_before(mid) < offset {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Cuts `nvec` result vectors into at most `ntasks` tasks
///
/// # Arguments
///
/// * `work_prefix` - Exclusive prefix sum of per-vector work (size: nvec + 1)
/// * `vlen` - Number of slots per vector
/// * `ntasks` - Requested number of tasks
/// * `chunk` - Vectors with more work than this may be split
/// * `split_slot` - Maps `(k, work offset within k)` to a slot of `k`
///
/// # Returns
///
/// Tasks in vector order. They cover every vector exactly once, and the
/// slot ranges of a split vector partition `[0, vlen)`. No tasks are
/// returned when there are no vectors.
pub fn slice_work(
    alloc: &Arc<dyn Allocator>,
    work_prefix: &[usize],
    vlen: usize,
    ntasks: usize,
    chunk: usize,
    split_slot: impl Fn(usize, usize) -> usize,
) -> EwiseResult<Block<Task>> {
    let nvec = work_prefix.len().saturating_sub(1);
    if nvec == 0 {
        return Block::with_capacity(alloc, 0);
    }
    let total = work_prefix[nvec];
    let ntasks = ntasks.max(1);

    let mut points: Block<(usize, usize)> = Block::with_capacity(alloc, ntasks + 1)?;
    points.push((0, 0));
    for t in 1..ntasks {
        let target = (t as u128 * total as u128 / ntasks as u128) as usize;
        let k = work_prefix.partition_point(|&w| w <= target) - 1;
        if k >= nvec {
            continue;
        }
        let offset = target - work_prefix[k];
        let vector_work = work_prefix[k + 1] - work_prefix[k];
        let point = if vector_work > chunk && offset > 0 {
            let slot = split_slot(k, offset);
            if slot >= vlen {
                (k + 1, 0)
            } else {
                (k, slot)
            }
        } else {
            (k, 0)
        };
        if point.0 < nvec && points.last().is_some_and(|&last| point > last) {
            points.push(point);
        }
    }
    points.push((nvec, 0));

    let mut tasks = Block::with_capacity(alloc, points.len() - 1)?;
    for w in points.windows(2) {
        let ((k0, s0), (k1, s1)) = (w[0], w[1]);
        tasks.push(if s1 == 0 {
            Task {
                kfirst: k0,
                klast: k1 - 1,
                first_start: s0,
                last_end: vlen,
            }
        } else {
            Task {
                kfirst: k0,
                klast: k1,
                first_start: s0,
                last_end: s1,
            }
        });
    }
    log::trace!("sliced {nvec} vectors ({total} work) into {} tasks", tasks.len());
    Ok(tasks)
}

/// Entry counts of one task, one per vector of [`Task::vectors`]
#[derive(Debug)]
pub struct TaskTally {
    pub counts: Block<usize>,
    /// Entries present in both A and B
    pub overlaps: usize,
}

/// Result of merging the per-task tallies
#[derive(Debug)]
pub struct CountMerge {
    pub nnz: usize,
    pub nvec_nonempty: usize,
    pub overlaps: usize,
    /// Position of each task's first entry in the result
    pub cp_kfirst: Block<usize>,
}

/// Folds per-task counts into the vector pointers
///
/// `cp` must hold `nvec + 1` zeros on entry; on return it holds the vector
/// pointers of the result. A vector shared by consecutive tasks gets the
/// sum of their counts, and the later task starts writing where the earlier
/// one stops.
pub fn merge_counts(
    alloc: &Arc<dyn Allocator>,
    tasks: &[Task],
    tallies: &[TaskTally],
    cp: &mut [usize],
) -> EwiseResult<CountMerge> {
    let nvec = cp.len() - 1;
    let mut overlaps = 0;
    for (task, tally) in tasks.iter().zip(tallies) {
        for (d, k) in task.vectors().enumerate() {
            cp[k] += tally.counts[d];
        }
        overlaps += tally.overlaps;
    }
    let nvec_nonempty = cp[..nvec].iter().filter(|&&c| c > 0).count();
    let nnz = exclusive_scan_in_place(cp);

    let mut cp_kfirst = Block::filled(alloc, tasks.len(), 0usize)?;
    for t in 0..tasks.len() {
        let task = tasks[t];
        cp_kfirst[t] = match t.checked_sub(1) {
            Some(prev) if tasks[prev].klast == task.kfirst => {
                let p = tasks[prev];
                let last_start = if p.kfirst == p.klast {
                    cp_kfirst[prev]
                } else {
                    cp[p.klast]
                };
                let last_count = tallies[prev].counts.last().copied().unwrap_or(0);
                last_start + last_count
            }
            _ => cp[task.kfirst],
        };
    }

    Ok(CountMerge {
        nnz,
        nvec_nonempty,
        overlaps,
        cp_kfirst,
    })
}
