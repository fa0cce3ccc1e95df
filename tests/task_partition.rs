//! Property tests for task slicing and count merging

use ewise::ewise::slice::{merge_counts, search_slot, slice_work, task_count, TaskTally};
use ewise::matrix::Block;
use ewise::system_allocator;
use ewise::utils::exclusive_scan_in_place;
use proptest::prelude::*;

fn prefix(work: &[usize]) -> Vec<usize> {
    let mut p = work.to_vec();
    p.push(0);
    exclusive_scan_in_place(&mut p);
    p
}

proptest! {
    #[test]
    fn tasks_cover_every_slot_once(
        work in prop::collection::vec(0usize..200, 1..40),
        vlen in 1usize..64,
        ntasks in 1usize..32,
        chunk in 1usize..100,
    ) {
        let p = prefix(&work);
        // work spread evenly over the slots of each vector
        let split = |k: usize, offset: usize| {
            let w = work[k];
            search_slot(vlen, offset, |s| s * w / vlen)
        };
        let tasks = slice_work(&system_allocator(), &p, vlen, ntasks, chunk, split).unwrap();

        prop_assert!(!tasks.is_empty());
        prop_assert!(tasks.len() <= ntasks);
        prop_assert_eq!(tasks[0].kfirst, 0);
        prop_assert_eq!(tasks[0].first_start, 0);
        prop_assert_eq!(tasks[tasks.len() - 1].klast, work.len() - 1);
        prop_assert_eq!(tasks[tasks.len() - 1].last_end, vlen);

        // (vector, slot) ranges follow one another without gaps or overlap
        let mut next = (0usize, 0usize);
        for task in tasks.iter() {
            prop_assert!(task.kfirst <= task.klast);
            for k in task.vectors() {
                let (lo, hi) = task.slot_range(k, vlen);
                prop_assert_eq!((k, lo), next);
                prop_assert!(lo < hi || (lo == 0 && hi == vlen));
                next = if hi == vlen { (k + 1, 0) } else { (k, hi) };
            }
        }
        prop_assert_eq!(next, (work.len(), 0));
    }

    #[test]
    fn merged_counts_give_consistent_offsets(
        work in prop::collection::vec(0usize..50, 1..20),
        ntasks in 1usize..10,
    ) {
        let alloc = system_allocator();
        let vlen = 50;
        let p = prefix(&work);
        let tasks = slice_work(&alloc, &p, vlen, ntasks, 1, |_, offset| offset).unwrap();

        // every slot below work[k] holds one entry
        let tallies: Vec<_> = tasks
            .iter()
            .map(|task| {
                let counts: Vec<usize> = task
                    .vectors()
                    .map(|k| {
                        let (lo, hi) = task.slot_range(k, vlen);
                        hi.min(work[k]).saturating_sub(lo)
                    })
                    .collect();
                TaskTally { counts: Block::from_vec(&alloc, counts).unwrap(), overlaps: 0 }
            })
            .collect();

        let mut cp = vec![0; work.len() + 1];
        let merged = merge_counts(&alloc, &tasks, &tallies, &mut cp).unwrap();
        prop_assert_eq!(&cp, &p);
        prop_assert_eq!(merged.nnz, work.iter().sum::<usize>());
        prop_assert_eq!(merged.nvec_nonempty, work.iter().filter(|&&w| w > 0).count());

        // each task starts where the previous one stopped
        let mut expected = 0;
        for (t, tally) in tallies.iter().enumerate() {
            prop_assert_eq!(merged.cp_kfirst[t], expected);
            expected += tally.counts.iter().sum::<usize>();
        }
    }

    #[test]
    fn task_count_is_bounded(
        total in 0usize..1_000_000,
        threads in 1usize..64,
        per_thread in 1usize..32,
        chunk in 1usize..100_000,
    ) {
        let n = task_count(total, threads, per_thread, chunk);
        prop_assert!(n >= 1);
        prop_assert!(n <= (threads * per_thread).max(1));
        prop_assert!(n == 1 || n <= total);
    }
}
