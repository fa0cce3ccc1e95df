//! Entry enumeration shared by the counting and compute passes
//!
//! For one result vector and a slot range of it, [`Operands::for_each_entry`]
//! produces every result entry in increasing index order together with the
//! positions of its inputs. The counting pass counts what it emits; the
//! compute pass writes it. Sharing one enumeration keeps the two passes in
//! agreement by construction.

use crate::constants::PER_VECTOR_WORK;
use crate::ewise::analysis::VectorMaps;
use crate::ewise::method::EwiseMethod;
use crate::matrix::mask::Mask;
use crate::matrix::sparse::{Matrix, Sparsity};

/// Where a result entry's inputs are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Both(usize, usize),
    AOnly(usize),
    BOnly(usize),
}

/// The inputs of one call, as seen by the passes
pub struct Operands<'a> {
    pub a: &'a Matrix,
    pub b: &'a Matrix,
    pub mask: Option<&'a Mask<'a>>,
    pub maps: &'a VectorMaps,
    /// Result hyperlist, if the result is hypersparse
    pub ch: Option<&'a [usize]>,
    pub method: EwiseMethod,
}

/// One operand's vector, in whatever format it is stored
#[derive(Debug, Clone, Copy)]
enum View<'a> {
    Absent,
    List { idx: &'a [usize], base: usize },
    Bitmap { b: &'a [u8], base: usize },
    Full { base: usize },
}

impl<'a> View<'a> {
    fn of(x: &'a Matrix, kx: Option<usize>) -> Self {
        let Some(kx) = kx else {
            return View::Absent;
        };
        let range = x.vector_range(kx);
        match x.sparsity() {
            Sparsity::Hypersparse | Sparsity::Sparse => View::List {
                idx: &x.i()[range.clone()],
                base: range.start,
            },
            Sparsity::Bitmap => View::Bitmap {
                b: &x.b()[range.clone()],
                base: range.start,
            },
            Sparsity::Full => View::Full { base: range.start },
        }
    }

    /// Narrows an index list to `[lo, hi)`
    fn restrict(self, lo: usize, hi: usize) -> Self {
        match self {
            View::List { idx, base } => {
                let s = idx.partition_point(|&r| r < lo);
                let e = idx.partition_point(|&r| r < hi);
                View::List {
                    idx: &idx[s..e],
                    base: base + s,
                }
            }
            other => other,
        }
    }

    fn work(&self, vlen: usize) -> usize {
        match self {
            View::Absent => 0,
            View::List { idx, .. } => idx.len(),
            View::Bitmap { .. } | View::Full { .. } => vlen,
        }
    }

    fn work_before(&self, i: usize) -> usize {
        match self {
            View::Absent => 0,
            View::List { idx, .. } => idx.partition_point(|&r| r < i),
            View::Bitmap { .. } | View::Full { .. } => i,
        }
    }

    /// Index list of a list-like view; an absent vector is an empty list
    fn as_list(&self) -> Option<(&'a [usize], usize)> {
        match *self {
            View::Absent => Some((&[][..], 0)),
            View::List { idx, base } => Some((idx, base)),
            _ => None,
        }
    }
}

/// Monotone lookup of indices in a view
struct Probe<'a> {
    view: View<'a>,
    t: usize,
}

impl<'a> Probe<'a> {
    fn new(view: View<'a>) -> Self {
        Self { view, t: 0 }
    }

    /// Position of index `i`; calls must come with non-decreasing `i`
    #[inline]
    fn find(&mut self, i: usize) -> Option<usize> {
        match self.view {
            View::Absent => None,
            View::List { idx, base } => {
                while self.t < idx.len() && idx[self.t] < i {
                    self.t += 1;
                }
                (self.t < idx.len() && idx[self.t] == i).then_some(base + self.t)
            }
            View::Bitmap { b, base } => (b[i] != 0).then_some(base + i),
            View::Full { base } => Some(base + i),
        }
    }
}

/// Mask test for methods the mask does not drive
struct MaskFilter<'a> {
    mask: Option<&'a Mask<'a>>,
    probe: Probe<'a>,
}

impl MaskFilter<'_> {
    #[inline]
    fn admits(&mut self, i: usize) -> bool {
        let Some(m) = self.mask else {
            return true;
        };
        let hit = self.probe.find(i).is_some_and(|pos| m.entry_admits(pos));
        hit != m.complement
    }
}

#[inline(always)]
fn combine<const UNION: bool>(pa: Option<usize>, pb: Option<usize>) -> Option<Source> {
    match (pa, pb) {
        (Some(pa), Some(pb)) => Some(Source::Both(pa, pb)),
        (Some(pa), None) if UNION => Some(Source::AOnly(pa)),
        (None, Some(pb)) if UNION => Some(Source::BOnly(pb)),
        _ => None,
    }
}

impl<'a> Operands<'a> {
    pub fn vlen(&self) -> usize {
        self.a.vlen()
    }

    /// Number of result vectors
    pub fn nvec(&self) -> usize {
        self.ch.map_or(self.a.vdim(), |h| h.len())
    }

    #[inline]
    pub fn vector_id(&self, k: usize) -> usize {
        self.ch.map_or(k, |h| h[k])
    }

    fn mask_drives(&self) -> bool {
        self.method == EwiseMethod::MaskDriven && self.mask.is_some()
    }

    fn views(&self, k: usize) -> (View<'a>, View<'a>, Option<View<'a>>) {
        let j = self.vector_id(k);
        let a = View::of(self.a, self.maps.a.resolve(k, j));
        let b = View::of(self.b, self.maps.b.resolve(k, j));
        let m = self
            .mask
            .map(|m| View::of(m.matrix, self.maps.m.resolve(k, j)));
        (a, b, m)
    }

    /// Estimated work of result vector `k`
    pub fn vector_work(&self, k: usize) -> usize {
        let vlen = self.vlen();
        let (a, b, m) = self.views(k);
        let work = match m {
            Some(m) if self.mask_drives() => m.work(vlen),
            _ => a.work(vlen) + b.work(vlen),
        };
        work + PER_VECTOR_WORK
    }

    /// Work of result vector `k` that lies below slot `i`
    pub fn work_before(&self, k: usize, i: usize) -> usize {
        let (a, b, m) = self.views(k);
        match m {
            Some(m) if self.mask_drives() => m.work_before(i),
            _ => a.work_before(i) + b.work_before(i),
        }
    }

    /// Emits every result entry of vector `k` with index in `[lo, hi)`, in
    /// increasing index order
    ///
    /// With `UNION` the result holds entries present in A or B; without it,
    /// entries present in both.
    pub fn for_each_entry<const UNION: bool>(
        &self,
        k: usize,
        lo: usize,
        hi: usize,
        mut emit: impl FnMut(usize, Source),
    ) {
        let (av, bv, mv) = self.views(k);
        let av = av.restrict(lo, hi);
        let bv = bv.restrict(lo, hi);
        let mv = mv.map(|v| v.restrict(lo, hi));

        if self.mask_drives() {
            if let (Some(m), Some(view)) = (self.mask, mv) {
                if let Some((idx, base)) = view.as_list() {
                    let mut pa = Probe::new(av);
                    let mut pb = Probe::new(bv);
                    for (t, &i) in idx.iter().enumerate() {
                        if !m.entry_admits(base + t) {
                            continue;
                        }
                        if let Some(src) = combine::<UNION>(pa.find(i), pb.find(i)) {
                            emit(i, src);
                        }
                    }
                    return;
                }
            }
        }

        let mut filter = MaskFilter {
            mask: self.mask,
            probe: Probe::new(mv.unwrap_or(View::Absent)),
        };

        if let (Some((ai, abase)), Some((bi, bbase))) = (av.as_list(), bv.as_list()) {
            if !UNION && (ai.is_empty() || bi.is_empty()) {
                return;
            }
            let (mut s, mut t) = (0, 0);
            while s < ai.len() && t < bi.len() {
                let (ia, ib) = (ai[s], bi[t]);
                if ia == ib {
                    if filter.admits(ia) {
                        emit(ia, Source::Both(abase + s, bbase + t));
                    }
                    s += 1;
                    t += 1;
                } else if ia < ib {
                    if UNION && filter.admits(ia) {
                        emit(ia, Source::AOnly(abase + s));
                    }
                    s += 1;
                } else {
                    if UNION && filter.admits(ib) {
                        emit(ib, Source::BOnly(bbase + t));
                    }
                    t += 1;
                }
            }
            if UNION {
                for (s, &i) in ai.iter().enumerate().skip(s) {
                    if filter.admits(i) {
                        emit(i, Source::AOnly(abase + s));
                    }
                }
                for (t, &i) in bi.iter().enumerate().skip(t) {
                    if filter.admits(i) {
                        emit(i, Source::BOnly(bbase + t));
                    }
                }
            }
            return;
        }

        if !UNION {
            // One side is a list and the other addressed by slot
            if let View::List { idx, base } = av {
                let mut pb = Probe::new(bv);
                for (s, &i) in idx.iter().enumerate() {
                    if let Some(pb) = pb.find(i) {
                        if filter.admits(i) {
                            emit(i, Source::Both(base + s, pb));
                        }
                    }
                }
                return;
            }
            if let View::List { idx, base } = bv {
                let mut pa = Probe::new(av);
                for (t, &i) in idx.iter().enumerate() {
                    if let Some(pa) = pa.find(i) {
                        if filter.admits(i) {
                            emit(i, Source::Both(pa, base + t));
                        }
                    }
                }
                return;
            }
        }

        let mut pa = Probe::new(av);
        let mut pb = Probe::new(bv);
        for i in lo..hi {
            if let Some(src) = combine::<UNION>(pa.find(i), pb.find(i)) {
                if filter.admits(i) {
                    emit(i, src);
                }
            }
        }
    }
}
