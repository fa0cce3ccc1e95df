//! Structural analysis (phase 0)
//!
//! Decides which vectors the result can hold and, for every result vector,
//! where the matching vector of A, B and the mask lives.
//!
//! The result is hypersparse only when its vector list can be taken from an
//! input hyperlist:
//!
//! | case | result vectors |
//! |------|----------------|
//! | non-complemented hypersparse mask | the mask's hyperlist |
//! | add, A and B hypersparse | union of the two hyperlists |
//! | mult, A and B hypersparse | intersection of the two hyperlists |
//! | mult, one of A and B hypersparse | that operand's hyperlist |
//! | anything else | every vector `0..vdim` (result is sparse) |

use std::sync::Arc;

use crate::error::EwiseResult;
use crate::ewise::EwiseKind;
use crate::matrix::block::{Allocator, Block};
use crate::matrix::mask::Mask;
use crate::matrix::sparse::Matrix;

/// Maps result vector `k` (with id `j`) to a stored vector of an operand
#[derive(Debug)]
pub enum VectorMap {
    /// The operand stores every vector; its vector `j` is at position `j`
    Direct,
    /// The operand's hyperlist is the result's; position `k`
    Aligned,
    /// Explicit positions, indexed by `k` (or by `j` when the result is
    /// sparse)
    Table(Block<Option<usize>>),
}

impl VectorMap {
    #[inline]
    pub fn resolve(&self, k: usize, j: usize) -> Option<usize> {
        match self {
            VectorMap::Direct => Some(j),
            VectorMap::Aligned => Some(k),
            VectorMap::Table(t) => t[k],
        }
    }
}

/// Vector maps of A, B and the mask
#[derive(Debug)]
pub struct VectorMaps {
    pub a: VectorMap,
    pub b: VectorMap,
    /// `Direct` when there is no mask
    pub m: VectorMap,
    /// The result hyperlist is a copy of the mask's
    pub ch_is_mh: bool,
}

/// Outcome of phase 0
#[derive(Debug)]
pub struct Analysis {
    /// Result hyperlist; `None` means the result is sparse
    pub ch: Option<Block<usize>>,
    pub maps: VectorMaps,
}

impl Analysis {
    /// Number of result vectors
    pub fn nvec(&self, vdim: usize) -> usize {
        self.ch.as_ref().map_or(vdim, |h| h.len())
    }
}

/// Which hyperlist the result vectors come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Mask,
    A,
    B,
    Merged,
    Dense,
}

/// Runs phase 0
pub fn analyze(
    kind: EwiseKind,
    a: &Matrix,
    b: &Matrix,
    mask: Option<&Mask<'_>>,
    alloc: &Arc<dyn Allocator>,
) -> EwiseResult<Analysis> {
    let mask_hyper = mask.filter(|m| m.matrix.is_hyper() && !m.complement);

    let (source, ch) = if let Some(m) = mask_hyper {
        (Source::Mask, Some(Block::from_slice(alloc, m.matrix.h())?))
    } else {
        match (kind, a.is_hyper(), b.is_hyper()) {
            (EwiseKind::Add, true, true) => (Source::Merged, Some(union(alloc, a.h(), b.h())?)),
            (EwiseKind::Mult, true, true) => {
                (Source::Merged, Some(intersection(alloc, a.h(), b.h())?))
            }
            (EwiseKind::Mult, true, false) => (Source::A, Some(Block::from_slice(alloc, a.h())?)),
            (EwiseKind::Mult, false, true) => (Source::B, Some(Block::from_slice(alloc, b.h())?)),
            _ => (Source::Dense, None),
        }
    };

    let ids = ch.as_deref();
    let a_map = operand_map(alloc, a, source == Source::A, ids)?;
    let b_map = operand_map(alloc, b, source == Source::B, ids)?;
    let m_map = match mask {
        Some(_) if source == Source::Mask => VectorMap::Aligned,
        Some(m) if m.matrix.is_hyper() => lookup_map(alloc, m.matrix, ids)?,
        _ => VectorMap::Direct,
    };

    log::debug!(
        "phase 0: {:?} result vectors ({})",
        source,
        ids.map_or_else(|| "sparse".to_string(), |h| format!("{} hypersparse", h.len()))
    );

    Ok(Analysis {
        ch,
        maps: VectorMaps {
            a: a_map,
            b: b_map,
            m: m_map,
            ch_is_mh: source == Source::Mask,
        },
    })
}

fn operand_map(
    alloc: &Arc<dyn Allocator>,
    x: &Matrix,
    aligned: bool,
    ch: Option<&[usize]>,
) -> EwiseResult<VectorMap> {
    if !x.is_hyper() {
        return Ok(VectorMap::Direct);
    }
    if aligned {
        return Ok(VectorMap::Aligned);
    }
    match ch {
        Some(ch) => merge_map(alloc, x.h(), ch),
        None => scatter_map(alloc, x.h(), x.vdim()),
    }
}

/// Positions of `ch` in the sorted list `xh`, found by one linear merge
fn merge_map(alloc: &Arc<dyn Allocator>, xh: &[usize], ch: &[usize]) -> EwiseResult<VectorMap> {
    let mut table = Block::filled(alloc, ch.len(), None)?;
    let mut kx = 0;
    for (k, &j) in ch.iter().enumerate() {
        while kx < xh.len() && xh[kx] < j {
            kx += 1;
        }
        if kx < xh.len() && xh[kx] == j {
            table[k] = Some(kx);
        }
    }
    Ok(VectorMap::Table(table))
}

/// Table indexed by vector id for a sparse result
fn scatter_map(alloc: &Arc<dyn Allocator>, xh: &[usize], vdim: usize) -> EwiseResult<VectorMap> {
    let mut table = Block::filled(alloc, vdim, None)?;
    for (kx, &j) in xh.iter().enumerate() {
        table[j] = Some(kx);
    }
    Ok(VectorMap::Table(table))
}

/// Positions of the result vectors in a hypersparse mask, by binary search
fn lookup_map(
    alloc: &Arc<dyn Allocator>,
    m: &Matrix,
    ch: Option<&[usize]>,
) -> EwiseResult<VectorMap> {
    let n = ch.map_or(m.vdim(), |h| h.len());
    let mut table = Block::filled(alloc, n, None)?;
    for (k, slot) in table.iter_mut().enumerate() {
        let j = ch.map_or(k, |h| h[k]);
        *slot = m.find_vector(j);
    }
    Ok(VectorMap::Table(table))
}

/// Sorted union of two strictly increasing lists
pub(crate) fn union(alloc: &Arc<dyn Allocator>, x: &[usize], y: &[usize]) -> EwiseResult<Block<usize>> {
    let mut out = Block::with_capacity(alloc, x.len() + y.len())?;
    let (mut s, mut t) = (0, 0);
    while s < x.len() && t < y.len() {
        let (u, v) = (x[s], y[t]);
        out.push(u.min(v));
        if u <= v {
            s += 1;
        }
        if v <= u {
            t += 1;
        }
    }
    for &u in &x[s..] {
        out.push(u);
    }
    for &v in &y[t..] {
        out.push(v);
    }
    Ok(out)
}

/// Sorted intersection of two strictly increasing lists
pub(crate) fn intersection(
    alloc: &Arc<dyn Allocator>,
    x: &[usize],
    y: &[usize],
) -> EwiseResult<Block<usize>> {
    let mut out = Block::with_capacity(alloc, x.len().min(y.len()))?;
    let (mut s, mut t) = (0, 0);
    while s < x.len() && t < y.len() {
        match x[s].cmp(&y[t]) {
            std::cmp::Ordering::Less => s += 1,
            std::cmp::Ordering::Greater => t += 1,
            std::cmp::Ordering::Equal => {
                out.push(x[s]);
                s += 1;
                t += 1;
            }
        }
    }
    Ok(out)
}
