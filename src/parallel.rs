//! Thread pool plumbing
//!
//! Every call runs on a pool sized from the configuration. With one thread
//! the work runs on the calling thread and no pool is built. Work lists of a
//! single item also run inline.

use rayon::prelude::*;

use crate::error::EwiseResult;

/// Runs `f` on a pool of `n_threads` threads
///
/// # Errors
///
/// Returns [`EwiseError::ThreadPool`](crate::EwiseError::ThreadPool) when the
/// pool cannot be built.
pub fn with_pool<R, F>(n_threads: usize, f: F) -> EwiseResult<R>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    if n_threads <= 1 {
        return Ok(f());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build()?;
    Ok(pool.install(f))
}

/// Maps `f` over `items`, in parallel when there is more than one
pub fn map_tasks<T, R, F>(items: Vec<T>, f: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync + Send,
{
    if items.len() <= 1 {
        items.into_iter().map(f).collect()
    } else {
        items.into_par_iter().map(f).collect()
    }
}

/// Sets `out[k] = f(k)` for every `k`
pub fn fill_indexed<F>(out: &mut [usize], parallel: bool, f: F)
where
    F: Fn(usize) -> usize + Sync + Send,
{
    if parallel {
        out.par_iter_mut().enumerate().for_each(|(k, w)| *w = f(k));
    } else {
        out.iter_mut().enumerate().for_each(|(k, w)| *w = f(k));
    }
}

/// Splits `slice` into consecutive pieces of the given lengths
///
/// The lengths must not add up to more than `slice.len()`.
pub fn split_chunks_mut<'a, T>(
    mut slice: &'a mut [T],
    lens: impl IntoIterator<Item = usize>,
) -> Vec<&'a mut [T]> {
    let mut out = Vec::new();
    for len in lens {
        let (head, tail) = std::mem::take(&mut slice).split_at_mut(len);
        out.push(head);
        slice = tail;
    }
    out
}
