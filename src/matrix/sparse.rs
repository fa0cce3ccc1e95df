//! Multi-format matrix storage
//!
//! A [`Matrix`] is a collection of `vdim` vectors of length `vlen`. When the
//! matrix is stored by column (the default) a vector is a column and `vlen`
//! is the number of rows. Four sparsity formats share the one type:
//!
//! - **Hypersparse**: `p` (length nvec+1), `h` (ids of the nvec vectors that
//!   are stored), `i` (indices within each vector), `x` (values)
//! - **Sparse**: like hypersparse, but every vector is stored (`nvec = vdim`)
//!   and there is no `h`
//! - **Bitmap**: `b` holds one presence byte per slot (`vlen * vdim`) and
//!   `x` holds a value per slot
//! - **Full**: every slot is present and only `x` is stored
//!
//! Any format can be *iso*, meaning `x` holds a single value shared by every
//! present entry.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::constants::{MAX_DISPLAY_ELEMENTS_PER_VECTOR, MAX_DISPLAY_VECTORS};
use crate::error::{EwiseError, EwiseResult};
use crate::matrix::block::{system_allocator, Allocator, Block, ValueArray};
use crate::matrix::types::{read_scalar, with_scalar, write_scalar, ElementType, Scalar};

/// Storage format of a matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sparsity {
    Hypersparse,
    Sparse,
    Bitmap,
    Full,
}

impl Sparsity {
    pub const ALL: [Sparsity; 4] = [
        Sparsity::Hypersparse,
        Sparsity::Sparse,
        Sparsity::Bitmap,
        Sparsity::Full,
    ];

    /// True for formats that store an explicit index list per vector
    pub fn has_pattern(self) -> bool {
        matches!(self, Sparsity::Hypersparse | Sparsity::Sparse)
    }

    /// True for formats addressed slot-by-slot (bitmap and full)
    pub fn is_dense(self) -> bool {
        !self.has_pattern()
    }
}

/// Raw arrays used to build a matrix
///
/// Only the arrays the chosen [`Sparsity`] needs are read: `p`, `i` (and `h`
/// when hypersparse) for the pattern formats, `b` for bitmap. `x` holds the
/// values as bytes, or a single value when `iso` is set.
#[derive(Debug, Clone, Default)]
pub struct MatrixParts {
    pub p: Vec<usize>,
    pub h: Vec<usize>,
    pub i: Vec<usize>,
    pub b: Vec<u8>,
    pub x: Vec<u8>,
    pub iso: bool,
    pub jumbled: bool,
}

/// A matrix in one of the four sparsity formats
pub struct Matrix {
    ty: ElementType,
    vlen: usize,
    vdim: usize,
    by_col: bool,
    sparsity: Sparsity,
    p: Option<Block<usize>>,
    h: Option<Block<usize>>,
    i: Option<Block<usize>>,
    b: Option<Block<u8>>,
    x: ValueArray,
    iso: bool,
    jumbled: bool,
    nvals: usize,
    nvec_nonempty: usize,
    allocator: Arc<dyn Allocator>,
}

/// Mutable view of a matrix being filled by the compute pass
pub(crate) struct ComputeParts<'a> {
    pub h: Option<&'a [usize]>,
    pub i: &'a mut [usize],
    pub x: &'a mut [u8],
}

fn dense_len(vlen: usize, vdim: usize) -> EwiseResult<usize> {
    vlen.checked_mul(vdim)
        .ok_or_else(|| EwiseError::invalid_value(format!("{vlen}×{vdim} does not fit in memory")))
}

impl Matrix {
    /// Builds a matrix from raw arrays and validates it
    pub fn from_parts(
        ty: ElementType,
        vlen: usize,
        vdim: usize,
        sparsity: Sparsity,
        parts: MatrixParts,
    ) -> EwiseResult<Self> {
        Self::from_parts_in(&system_allocator(), ty, vlen, vdim, sparsity, parts)
    }

    /// Builds a matrix from raw arrays, charging `allocator` for its storage
    pub fn from_parts_in(
        allocator: &Arc<dyn Allocator>,
        ty: ElementType,
        vlen: usize,
        vdim: usize,
        sparsity: Sparsity,
        parts: MatrixParts,
    ) -> EwiseResult<Self> {
        let MatrixParts {
            p,
            h,
            i,
            b,
            x,
            iso,
            jumbled,
        } = parts;

        let (p, h, i, b) = match sparsity {
            Sparsity::Hypersparse => (
                Some(Block::from_vec(allocator, p)?),
                Some(Block::from_vec(allocator, h)?),
                Some(Block::from_vec(allocator, i)?),
                None,
            ),
            Sparsity::Sparse => (
                Some(Block::from_vec(allocator, p)?),
                None,
                Some(Block::from_vec(allocator, i)?),
                None,
            ),
            Sparsity::Bitmap => (None, None, None, Some(Block::from_vec(allocator, b)?)),
            Sparsity::Full => (None, None, None, None),
        };
        let x = ValueArray::from_bytes(allocator, &x)?;

        let mut matrix = Self {
            ty,
            vlen,
            vdim,
            by_col: true,
            sparsity,
            p,
            h,
            i,
            b,
            x,
            iso,
            jumbled: jumbled && sparsity.has_pattern(),
            nvals: 0,
            nvec_nonempty: 0,
            allocator: Arc::clone(allocator),
        };
        matrix.check()?;
        matrix.nvals = matrix.count_entries();
        matrix.nvec_nonempty = matrix.count_nonempty_vectors();
        Ok(matrix)
    }

    /// Creates a sparse matrix from typed arrays
    ///
    /// # Arguments
    ///
    /// * `vlen` - Length of each vector
    /// * `vdim` - Number of vectors
    /// * `p` - Vector pointers (size: vdim + 1)
    /// * `i` - Indices within each vector (size: nnz)
    /// * `x` - Values (size: nnz)
    pub fn sparse<T: Scalar>(
        vlen: usize,
        vdim: usize,
        p: Vec<usize>,
        i: Vec<usize>,
        x: Vec<T>,
    ) -> EwiseResult<Self> {
        let parts = MatrixParts {
            p,
            i,
            x: bytemuck::cast_slice(&x).to_vec(),
            ..MatrixParts::default()
        };
        Self::from_parts(T::TYPE, vlen, vdim, Sparsity::Sparse, parts)
    }

    /// Creates a hypersparse matrix from typed arrays
    ///
    /// `h` lists the ids of the stored vectors in increasing order and `p`
    /// has one entry per stored vector plus one.
    pub fn hypersparse<T: Scalar>(
        vlen: usize,
        vdim: usize,
        p: Vec<usize>,
        h: Vec<usize>,
        i: Vec<usize>,
        x: Vec<T>,
    ) -> EwiseResult<Self> {
        let parts = MatrixParts {
            p,
            h,
            i,
            x: bytemuck::cast_slice(&x).to_vec(),
            ..MatrixParts::default()
        };
        Self::from_parts(T::TYPE, vlen, vdim, Sparsity::Hypersparse, parts)
    }

    /// Creates a bitmap matrix; `present` and `x` have one slot per entry
    /// position, vector after vector
    pub fn bitmap<T: Scalar>(
        vlen: usize,
        vdim: usize,
        present: Vec<bool>,
        x: Vec<T>,
    ) -> EwiseResult<Self> {
        let parts = MatrixParts {
            b: present.into_iter().map(u8::from).collect(),
            x: bytemuck::cast_slice(&x).to_vec(),
            ..MatrixParts::default()
        };
        Self::from_parts(T::TYPE, vlen, vdim, Sparsity::Bitmap, parts)
    }

    /// Creates a full matrix; `x` holds every slot, vector after vector
    pub fn full<T: Scalar>(vlen: usize, vdim: usize, x: Vec<T>) -> EwiseResult<Self> {
        let parts = MatrixParts {
            x: bytemuck::cast_slice(&x).to_vec(),
            ..MatrixParts::default()
        };
        Self::from_parts(T::TYPE, vlen, vdim, Sparsity::Full, parts)
    }

    /// Creates an empty sparse matrix
    pub fn empty(ty: ElementType, vlen: usize, vdim: usize) -> EwiseResult<Self> {
        let parts = MatrixParts {
            p: vec![0; vdim + 1],
            ..MatrixParts::default()
        };
        Self::from_parts(ty, vlen, vdim, Sparsity::Sparse, parts)
    }

    /// Creates a matrix in the requested format from `(index, vector, value)`
    /// triplets
    ///
    /// Triplets may come in any order; duplicates are rejected. A full
    /// matrix needs every slot to be given.
    pub fn from_triplets<T: Scalar>(
        vlen: usize,
        vdim: usize,
        entries: &[(usize, usize, T)],
        sparsity: Sparsity,
    ) -> EwiseResult<Self> {
        let mut sorted: Vec<(usize, usize, T)> = entries.to_vec();
        sorted.sort_by_key(|&(i, j, _)| (j, i));

        for w in sorted.windows(2) {
            if w[0].0 == w[1].0 && w[0].1 == w[1].1 {
                return Err(EwiseError::invalid_value(format!(
                    "duplicate entry at ({}, {})",
                    w[0].0, w[0].1
                )));
            }
        }
        for &(i, j, _) in &sorted {
            if i >= vlen || j >= vdim {
                return Err(EwiseError::invalid_value(format!(
                    "entry ({i}, {j}) out of bounds for {vlen}×{vdim}"
                )));
            }
        }

        let mut parts = MatrixParts::default();
        match sparsity {
            Sparsity::Sparse | Sparsity::Hypersparse => {
                let hyper = sparsity == Sparsity::Hypersparse;
                parts.p.push(0);
                let mut current: Option<usize> = None;
                for (n, &(i, j, v)) in sorted.iter().enumerate() {
                    if hyper {
                        if current != Some(j) {
                            if current.is_some() {
                                parts.p.push(n);
                            }
                            parts.h.push(j);
                            current = Some(j);
                        }
                    } else {
                        while parts.p.len() <= j {
                            parts.p.push(n);
                        }
                    }
                    parts.i.push(i);
                    parts.x.extend_from_slice(bytemuck::bytes_of(&v));
                }
                if hyper {
                    if current.is_some() {
                        parts.p.push(sorted.len());
                    }
                } else {
                    while parts.p.len() <= vdim {
                        parts.p.push(sorted.len());
                    }
                }
            }
            Sparsity::Bitmap | Sparsity::Full => {
                let n = dense_len(vlen, vdim)?;
                if sparsity == Sparsity::Full && sorted.len() != n {
                    return Err(EwiseError::invalid_value(
                        "a full matrix needs a value for every entry",
                    ));
                }
                parts.b = vec![0; n];
                parts.x = vec![0; n * T::TYPE.size()];
                for &(i, j, v) in &sorted {
                    let slot = j * vlen + i;
                    parts.b[slot] = 1;
                    write_scalar(&mut parts.x, slot, v);
                }
                if sparsity == Sparsity::Full {
                    parts.b.clear();
                }
            }
        }
        Self::from_parts(T::TYPE, vlen, vdim, sparsity, parts)
    }

    /// Replaces every stored value with one shared value of type `T`
    pub fn into_iso<T: Scalar>(mut self, value: T) -> EwiseResult<Self> {
        self.x = ValueArray::from_bytes(&self.allocator, bytemuck::bytes_of(&value))?;
        self.ty = T::TYPE;
        self.iso = true;
        Ok(self)
    }

    /// Marks the matrix as stored by row (vectors are rows)
    pub fn by_row(mut self) -> Self {
        self.by_col = false;
        self
    }

    /// Sets the storage orientation
    pub fn with_orientation(mut self, by_col: bool) -> Self {
        self.by_col = by_col;
        self
    }

    // ------------------------------------------------------------------
    // two-step allocation used by the engine
    // ------------------------------------------------------------------

    /// Allocates a header around already computed vector pointers
    ///
    /// The result is hypersparse when `h` is given and sparse otherwise. Its
    /// index and value arrays are empty until [`Matrix::alloc_values`].
    pub(crate) fn alloc_pattern(
        allocator: &Arc<dyn Allocator>,
        ty: ElementType,
        vlen: usize,
        vdim: usize,
        by_col: bool,
        p: Block<usize>,
        h: Option<Block<usize>>,
    ) -> EwiseResult<Self> {
        let sparsity = if h.is_some() {
            Sparsity::Hypersparse
        } else {
            Sparsity::Sparse
        };
        Ok(Self {
            ty,
            vlen,
            vdim,
            by_col,
            sparsity,
            p: Some(p),
            h,
            i: None,
            b: None,
            x: ValueArray::zeroed(allocator, 0)?,
            iso: false,
            jumbled: false,
            nvals: 0,
            nvec_nonempty: 0,
            allocator: Arc::clone(allocator),
        })
    }

    /// Allocates index and value arrays for `nnz` entries
    pub(crate) fn alloc_values(&mut self, nnz: usize, iso: bool) -> EwiseResult<()> {
        let nvalues = if iso { 1 } else { nnz };
        self.i = Some(Block::filled(&self.allocator, nnz, 0)?);
        self.x = ValueArray::zeroed(&self.allocator, nvalues * self.ty.size())?;
        self.iso = iso;
        self.nvals = nnz;
        Ok(())
    }

    pub(crate) fn compute_parts(&mut self) -> ComputeParts<'_> {
        ComputeParts {
            h: self.h.as_deref(),
            i: self.i.as_deref_mut().unwrap_or(&mut []),
            x: &mut self.x,
        }
    }

    pub(crate) fn set_nvec_nonempty(&mut self, n: usize) {
        self.nvec_nonempty = n;
    }

    pub(crate) fn pattern_mut(&mut self) -> (Option<&mut Block<usize>>, Option<&mut Block<usize>>) {
        (self.p.as_mut(), self.h.as_mut())
    }

    // ------------------------------------------------------------------
    // accessors
    // ------------------------------------------------------------------

    pub fn element_type(&self) -> &ElementType {
        &self.ty
    }

    /// Length of each vector
    pub fn vlen(&self) -> usize {
        self.vlen
    }

    /// Number of vectors
    pub fn vdim(&self) -> usize {
        self.vdim
    }

    /// Returns `(nrows, ncols)`
    pub fn shape(&self) -> (usize, usize) {
        if self.by_col {
            (self.vlen, self.vdim)
        } else {
            (self.vdim, self.vlen)
        }
    }

    pub fn by_col(&self) -> bool {
        self.by_col
    }

    pub fn sparsity(&self) -> Sparsity {
        self.sparsity
    }

    pub fn is_hyper(&self) -> bool {
        self.sparsity == Sparsity::Hypersparse
    }

    pub fn is_sparse(&self) -> bool {
        self.sparsity == Sparsity::Sparse
    }

    pub fn is_bitmap(&self) -> bool {
        self.sparsity == Sparsity::Bitmap
    }

    pub fn is_full(&self) -> bool {
        self.sparsity == Sparsity::Full
    }

    pub fn is_iso(&self) -> bool {
        self.iso
    }

    /// True when indices within a vector may be out of order
    pub fn is_jumbled(&self) -> bool {
        self.jumbled
    }

    /// Number of present entries
    pub fn nvals(&self) -> usize {
        self.nvals
    }

    /// Number of stored vectors
    pub fn nvec(&self) -> usize {
        match &self.h {
            Some(h) => h.len(),
            None => self.vdim,
        }
    }

    /// Number of vectors holding at least one entry
    pub fn nvec_nonempty(&self) -> usize {
        self.nvec_nonempty
    }

    /// Vector pointers (empty for bitmap and full)
    pub fn p(&self) -> &[usize] {
        self.p.as_deref().unwrap_or(&[])
    }

    /// Hyperlist (empty unless hypersparse)
    pub fn h(&self) -> &[usize] {
        self.h.as_deref().unwrap_or(&[])
    }

    /// Indices within vectors (empty for bitmap and full)
    pub fn i(&self) -> &[usize] {
        self.i.as_deref().unwrap_or(&[])
    }

    /// Presence bytes (empty unless bitmap)
    pub fn b(&self) -> &[u8] {
        self.b.as_deref().unwrap_or(&[])
    }

    /// Raw value bytes
    pub fn x_bytes(&self) -> &[u8] {
        &self.x
    }

    pub(crate) fn values(&self) -> &ValueArray {
        &self.x
    }

    pub fn allocator(&self) -> &Arc<dyn Allocator> {
        &self.allocator
    }

    /// Id of the `k`-th stored vector
    #[inline]
    pub fn vector_id(&self, k: usize) -> usize {
        match &self.h {
            Some(h) => h[k],
            None => k,
        }
    }

    /// Position of vector `j` among the stored vectors
    pub fn find_vector(&self, j: usize) -> Option<usize> {
        match &self.h {
            Some(h) => h.binary_search(&j).ok(),
            None => (j < self.vdim).then_some(j),
        }
    }

    /// Entry positions of the `k`-th stored vector
    ///
    /// For bitmap and full matrices this is the vector's slot range.
    #[inline]
    pub fn vector_range(&self, k: usize) -> Range<usize> {
        match &self.p {
            Some(p) => p[k]..p[k + 1],
            None => k * self.vlen..(k + 1) * self.vlen,
        }
    }

    /// Bytes of the value stored at entry position `pos`
    #[inline]
    pub fn value_bytes(&self, pos: usize) -> &[u8] {
        let size = self.ty.size();
        let pos = if self.iso { 0 } else { pos };
        &self.x[pos * size..(pos + 1) * size]
    }

    /// Entry position of `(i, j)`, if present
    pub fn position(&self, i: usize, j: usize) -> Option<usize> {
        if i >= self.vlen || j >= self.vdim {
            return None;
        }
        match self.sparsity {
            Sparsity::Sparse | Sparsity::Hypersparse => {
                let k = self.find_vector(j)?;
                let range = self.vector_range(k);
                let idx = &self.i()[range.clone()];
                if self.jumbled {
                    idx.iter().position(|&r| r == i).map(|t| range.start + t)
                } else {
                    idx.binary_search(&i).ok().map(|t| range.start + t)
                }
            }
            Sparsity::Bitmap => {
                let slot = j * self.vlen + i;
                (self.b()[slot] != 0).then_some(slot)
            }
            Sparsity::Full => Some(j * self.vlen + i),
        }
    }

    /// True when entry `(i, j)` is present
    pub fn is_present(&self, i: usize, j: usize) -> bool {
        self.position(i, j).is_some()
    }

    /// Raw bytes of entry `(i, j)`, if present
    pub fn get_bytes(&self, i: usize, j: usize) -> Option<&[u8]> {
        self.position(i, j).map(|pos| self.value_bytes(pos))
    }

    /// Value of entry `(i, j)` cast to `T`
    ///
    /// Returns `None` when the entry is absent or the matrix holds a
    /// user-defined type.
    pub fn get<T: Scalar>(&self, i: usize, j: usize) -> Option<T> {
        let bytes = self.get_bytes(i, j)?;
        with_scalar!(self.ty.code(), S => Some(read_scalar::<S>(bytes, 0).cast::<T>()), _ => None)
    }

    /// Calls `f(i, j, pos)` for every present entry, vector by vector
    pub fn for_each_entry(&self, mut f: impl FnMut(usize, usize, usize)) {
        match self.sparsity {
            Sparsity::Sparse | Sparsity::Hypersparse => {
                let idx = self.i();
                for k in 0..self.nvec() {
                    let j = self.vector_id(k);
                    for pos in self.vector_range(k) {
                        f(idx[pos], j, pos);
                    }
                }
            }
            Sparsity::Bitmap => {
                let b = self.b();
                for j in 0..self.vdim {
                    for i in 0..self.vlen {
                        let slot = j * self.vlen + i;
                        if b[slot] != 0 {
                            f(i, j, slot);
                        }
                    }
                }
            }
            Sparsity::Full => {
                for j in 0..self.vdim {
                    for i in 0..self.vlen {
                        f(i, j, j * self.vlen + i);
                    }
                }
            }
        }
    }

    /// Decodes every entry as `(i, j, value)` cast to `T`, ordered by vector
    /// and then index
    pub fn to_tuples<T: Scalar>(&self) -> EwiseResult<Vec<(usize, usize, T)>> {
        let mut out = Vec::with_capacity(self.nvals);
        with_scalar!(self.ty.code(), S => {
            self.for_each_entry(|i, j, pos| {
                out.push((i, j, read_scalar::<S>(self.value_bytes(pos), 0).cast::<T>()));
            });
        }, _ => {
            return Err(EwiseError::TypeMismatch {
                what: "matrix",
                from: self.ty.code(),
                to: T::TYPE.code(),
            });
        });
        out.sort_by_key(|&(i, j, _)| (j, i));
        Ok(out)
    }

    /// Decodes every entry as `(i, j, bytes)`, ordered by vector and index
    pub fn to_byte_tuples(&self) -> Vec<(usize, usize, Vec<u8>)> {
        let mut out = Vec::with_capacity(self.nvals);
        self.for_each_entry(|i, j, pos| out.push((i, j, self.value_bytes(pos).to_vec())));
        out.sort_by_key(|(i, j, _)| (*j, *i));
        out
    }

    /// True when a hypersparse matrix holds no empty vectors
    ///
    /// Always true for the other formats.
    pub fn is_pruned(&self) -> bool {
        !self.is_hyper() || self.p().windows(2).all(|w| w[1] > w[0])
    }

    /// Copies the matrix, charging its allocator
    pub fn dup(&self) -> EwiseResult<Self> {
        let copy = |b: &Option<Block<usize>>| b.as_ref().map(|b| b.try_clone()).transpose();
        Ok(Self {
            ty: self.ty.clone(),
            vlen: self.vlen,
            vdim: self.vdim,
            by_col: self.by_col,
            sparsity: self.sparsity,
            p: copy(&self.p)?,
            h: copy(&self.h)?,
            i: copy(&self.i)?,
            b: self.b.as_ref().map(|b| b.try_clone()).transpose()?,
            x: self.x.try_clone()?,
            iso: self.iso,
            jumbled: self.jumbled,
            nvals: self.nvals,
            nvec_nonempty: self.nvec_nonempty,
            allocator: Arc::clone(&self.allocator),
        })
    }

    fn count_entries(&self) -> usize {
        match self.sparsity {
            Sparsity::Sparse | Sparsity::Hypersparse => self.p().last().copied().unwrap_or(0),
            Sparsity::Bitmap => self.b().iter().filter(|&&b| b != 0).count(),
            Sparsity::Full => self.vlen * self.vdim,
        }
    }

    pub(crate) fn count_nonempty_vectors(&self) -> usize {
        match self.sparsity {
            Sparsity::Sparse | Sparsity::Hypersparse => {
                self.p().windows(2).filter(|w| w[1] > w[0]).count()
            }
            Sparsity::Bitmap => {
                if self.vlen == 0 {
                    return 0;
                }
                self.b()
                    .chunks(self.vlen)
                    .filter(|v| v.iter().any(|&b| b != 0))
                    .count()
            }
            Sparsity::Full => {
                if self.vlen == 0 {
                    0
                } else {
                    self.vdim
                }
            }
        }
    }

    /// Verifies the format invariants
    ///
    /// # Errors
    ///
    /// Returns [`EwiseError::InvalidMatrix`] describing the first violation.
    pub fn check(&self) -> EwiseResult<()> {
        let size = self.ty.size();
        let expect_values = |n: usize| -> EwiseResult<()> {
            let want = if self.iso { size } else { n * size };
            if self.x.len() != want {
                return Err(EwiseError::invalid_matrix(format!(
                    "value array holds {} bytes, expected {want}",
                    self.x.len()
                )));
            }
            Ok(())
        };

        match self.sparsity {
            Sparsity::Sparse | Sparsity::Hypersparse => {
                let p = self.p();
                let nvec = self.nvec();
                if p.len() != nvec + 1 {
                    return Err(EwiseError::invalid_matrix(format!(
                        "p has length {}, expected {}",
                        p.len(),
                        nvec + 1
                    )));
                }
                if p[0] != 0 {
                    return Err(EwiseError::invalid_matrix("p[0] must be 0"));
                }
                if p.windows(2).any(|w| w[1] < w[0]) {
                    return Err(EwiseError::invalid_matrix("p must be non-decreasing"));
                }
                let nnz = p[nvec];
                if self.i().len() != nnz {
                    return Err(EwiseError::invalid_matrix(format!(
                        "i has length {}, expected {nnz}",
                        self.i().len()
                    )));
                }
                if self.is_hyper() {
                    let h = self.h();
                    if h.windows(2).any(|w| w[1] <= w[0]) {
                        return Err(EwiseError::invalid_matrix("h must be strictly increasing"));
                    }
                    if h.last().is_some_and(|&j| j >= self.vdim) {
                        return Err(EwiseError::invalid_matrix("h holds a vector id out of range"));
                    }
                } else if self.h.is_some() {
                    return Err(EwiseError::invalid_matrix("sparse matrix holds a hyperlist"));
                }
                let idx = self.i();
                for k in 0..nvec {
                    let v = &idx[p[k]..p[k + 1]];
                    if v.iter().any(|&r| r >= self.vlen) {
                        return Err(EwiseError::invalid_matrix(format!(
                            "vector {k} holds an index out of range"
                        )));
                    }
                    if self.jumbled {
                        let mut sorted = v.to_vec();
                        sorted.sort_unstable();
                        if sorted.windows(2).any(|w| w[0] == w[1]) {
                            return Err(EwiseError::invalid_matrix(format!(
                                "vector {k} holds duplicate indices"
                            )));
                        }
                    } else if v.windows(2).any(|w| w[1] <= w[0]) {
                        return Err(EwiseError::invalid_matrix(format!(
                            "vector {k} is not strictly increasing"
                        )));
                    }
                }
                expect_values(nnz)
            }
            Sparsity::Bitmap => {
                let n = dense_len(self.vlen, self.vdim)?;
                if self.b().len() != n {
                    return Err(EwiseError::invalid_matrix(format!(
                        "b has length {}, expected {n}",
                        self.b().len()
                    )));
                }
                if self.b().iter().any(|&b| b > 1) {
                    return Err(EwiseError::invalid_matrix("b must hold 0 or 1"));
                }
                expect_values(n)
            }
            Sparsity::Full => expect_values(dense_len(self.vlen, self.vdim)?),
        }
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix {{")?;
        writeln!(
            f,
            "  {:?} {} {} × {} ({} vectors of length {})",
            self.sparsity,
            self.ty,
            self.shape().0,
            self.shape().1,
            self.vdim,
            self.vlen
        )?;
        writeln!(f, "  nvals: {}{}", self.nvals, if self.iso { " (iso)" } else { "" })?;

        let nvec = self.nvec();
        let max_vectors = MAX_DISPLAY_VECTORS.min(nvec);
        if max_vectors > 0 {
            writeln!(f, "  content sample:")?;
            let tuples = self.to_byte_tuples();
            let mut shown = 0;
            for k in 0..nvec {
                if shown == max_vectors {
                    writeln!(f, "    ... ({} more vectors)", nvec - shown)?;
                    break;
                }
                let j = self.vector_id(k);
                let entries: Vec<_> = tuples.iter().filter(|t| t.1 == j).collect();
                write!(f, "    vector {j}: ")?;
                if entries.is_empty() {
                    writeln!(f, "(empty)")?;
                } else {
                    for (i, _, bytes) in entries.iter().take(MAX_DISPLAY_ELEMENTS_PER_VECTOR) {
                        write!(f, "({i}, {bytes:?}) ")?;
                    }
                    if entries.len() > MAX_DISPLAY_ELEMENTS_PER_VECTOR {
                        write!(
                            f,
                            "... ({} more)",
                            entries.len() - MAX_DISPLAY_ELEMENTS_PER_VECTOR
                        )?;
                    }
                    writeln!(f)?;
                }
                shown += 1;
            }
        }
        write!(f, "}}")
    }
}
