//! Counting pass (phase 1)

use std::sync::Arc;

use crate::error::EwiseResult;
use crate::ewise::skeleton::{Operands, Source};
use crate::ewise::slice::{Task, TaskTally};
use crate::matrix::block::{Allocator, Block};
use crate::parallel::map_tasks;

/// Counts the result entries of every vector slice each task owns
///
/// Entries present in both inputs are tallied as well, which the merge
/// without an operator uses to reject overlapping patterns.
pub fn count_entries<const UNION: bool>(
    alloc: &Arc<dyn Allocator>,
    ops: &Operands<'_>,
    tasks: &[Task],
) -> EwiseResult<Vec<TaskTally>> {
    let vlen = ops.vlen();
    map_tasks(tasks.to_vec(), |task| {
        let mut counts = Block::filled(alloc, task.klast - task.kfirst + 1, 0usize)?;
        let mut overlaps = 0;
        for (d, k) in task.vectors().enumerate() {
            let (lo, hi) = task.slot_range(k, vlen);
            let mut n = 0;
            ops.for_each_entry::<UNION>(k, lo, hi, |_, src| {
                n += 1;
                if matches!(src, Source::Both(..)) {
                    overlaps += 1;
                }
            });
            counts[d] = n;
        }
        Ok(TaskTally { counts, overlaps })
    })
    .into_iter()
    .collect()
}
