//! Conversion functions between matrix formats and orientations

use std::sync::Arc;

use crate::error::{EwiseError, EwiseResult};
use crate::matrix::block::{Allocator, Block};
use crate::matrix::sparse::{Matrix, MatrixParts, Sparsity};

impl Matrix {
    /// Returns a copy of this matrix stored in `target` format
    ///
    /// Converting to hypersparse keeps only the non-empty vectors. Converting
    /// to full fails unless every entry is present.
    pub fn to_sparsity(&self, target: Sparsity) -> EwiseResult<Matrix> {
        if target == self.sparsity() {
            return self.dup();
        }

        let size = self.element_type().size();
        let iso = self.is_iso();
        let mut parts = MatrixParts {
            iso,
            ..MatrixParts::default()
        };
        if iso {
            parts.x.extend_from_slice(self.value_bytes(0));
        }

        match target {
            Sparsity::Hypersparse | Sparsity::Sparse => {
                let hyper = target == Sparsity::Hypersparse;
                parts.jumbled = self.is_jumbled();
                parts.p.push(0);
                parts.i.reserve(self.nvals());
                let mut current: Option<usize> = None;
                self.for_each_entry(|i, j, pos| {
                    if hyper {
                        if current != Some(j) {
                            if current.is_some() {
                                parts.p.push(parts.i.len());
                            }
                            parts.h.push(j);
                            current = Some(j);
                        }
                    } else {
                        while parts.p.len() <= j {
                            parts.p.push(parts.i.len());
                        }
                    }
                    parts.i.push(i);
                    if !iso {
                        parts.x.extend_from_slice(self.value_bytes(pos));
                    }
                });
                let nnz = parts.i.len();
                if hyper {
                    if current.is_some() {
                        parts.p.push(nnz);
                    }
                } else {
                    while parts.p.len() <= self.vdim() {
                        parts.p.push(nnz);
                    }
                }
            }
            Sparsity::Bitmap | Sparsity::Full => {
                let n = self.vlen().checked_mul(self.vdim()).ok_or_else(|| {
                    EwiseError::invalid_value("matrix too large for a dense format")
                })?;
                if target == Sparsity::Full && self.nvals() != n {
                    return Err(EwiseError::invalid_value(format!(
                        "cannot store {} of {n} entries as a full matrix",
                        self.nvals()
                    )));
                }
                let vlen = self.vlen();
                parts.b = vec![0; n];
                if !iso {
                    parts.x = vec![0; n * size];
                }
                self.for_each_entry(|i, j, pos| {
                    let slot = j * vlen + i;
                    parts.b[slot] = 1;
                    if !iso {
                        parts.x[slot * size..(slot + 1) * size]
                            .copy_from_slice(self.value_bytes(pos));
                    }
                });
                if target == Sparsity::Full {
                    parts.b = Vec::new();
                }
            }
        }

        let converted = Matrix::from_parts_in(
            self.allocator(),
            self.element_type().clone(),
            self.vlen(),
            self.vdim(),
            target,
            parts,
        )?;
        Ok(converted.with_orientation(self.by_col()))
    }

    /// Stores the same matrix in the other orientation
    ///
    /// Vectors become indices and indices become vectors, so a matrix held by
    /// column comes back held by row. The result is sparse and never
    /// jumbled.
    pub fn transpose_storage(&self) -> EwiseResult<Matrix> {
        let alloc = self.allocator();
        let new_vlen = self.vdim();
        let new_vdim = self.vlen();
        let nnz = self.nvals();

        // Count entries per new vector
        let mut counts = Block::filled(alloc, new_vdim, 0usize)?;
        self.for_each_entry(|i, _, _| counts[i] += 1);

        // Compute vector pointers via prefix sum
        let mut p = Block::filled(alloc, new_vdim + 1, 0usize)?;
        let mut sum = 0;
        for (k, &count) in counts.iter().enumerate() {
            p[k] = sum;
            sum += count;
        }
        p[new_vdim] = sum;
        let nonempty = counts.iter().filter(|&&c| c > 0).count();

        // Scatter positions, reusing the count block
        counts.copy_from_slice(&p[..new_vdim]);
        let mut next = counts;

        let size = self.element_type().size();
        let iso = self.is_iso();
        let mut out = Matrix::alloc_pattern(
            alloc,
            self.element_type().clone(),
            new_vlen,
            new_vdim,
            !self.by_col(),
            p,
            None,
        )?;
        out.alloc_values(nnz, iso)?;
        {
            let parts = out.compute_parts();
            if iso {
                parts.x[..size].copy_from_slice(self.value_bytes(0));
            }
            self.for_each_entry(|i, j, pos| {
                let dst = next[i];
                next[i] += 1;
                parts.i[dst] = j;
                if !iso {
                    parts.x[dst * size..(dst + 1) * size].copy_from_slice(self.value_bytes(pos));
                }
            });
        }
        out.set_nvec_nonempty(nonempty);
        Ok(out)
    }

    /// Returns a copy with the indices of every vector in increasing order
    pub fn unjumbled(&self) -> EwiseResult<Matrix> {
        if !self.is_jumbled() {
            return self.dup();
        }
        self.unjumbled_in(self.allocator())
    }

    /// Sorted copy whose storage is charged to `allocator`
    pub fn unjumbled_in(&self, allocator: &Arc<dyn Allocator>) -> EwiseResult<Matrix> {
        let size = self.element_type().size();
        let iso = self.is_iso();
        let idx = self.i();
        let mut parts = MatrixParts {
            p: self.p().to_vec(),
            h: self.h().to_vec(),
            i: Vec::with_capacity(idx.len()),
            x: Vec::with_capacity(if iso { size } else { idx.len() * size }),
            iso,
            ..MatrixParts::default()
        };
        if iso {
            parts.x.extend_from_slice(self.value_bytes(0));
        }

        let mut order: Vec<usize> = Vec::new();
        for k in 0..self.nvec() {
            order.clear();
            order.extend(self.vector_range(k));
            order.sort_unstable_by_key(|&pos| idx[pos]);
            for &pos in &order {
                parts.i.push(idx[pos]);
                if !iso {
                    parts.x.extend_from_slice(self.value_bytes(pos));
                }
            }
        }

        let sorted = Matrix::from_parts_in(
            allocator,
            self.element_type().clone(),
            self.vlen(),
            self.vdim(),
            self.sparsity(),
            parts,
        )?;
        Ok(sorted.with_orientation(self.by_col()))
    }

    /// Sorts the indices of every vector in place
    pub fn sort_vectors(&mut self) -> EwiseResult<()> {
        if self.is_jumbled() {
            *self = self.unjumbled()?;
        }
        Ok(())
    }

    /// Switches between sparse and hypersparse by the fraction of non-empty
    /// vectors
    ///
    /// A sparse matrix with at most `hyper_switch * vdim` non-empty vectors
    /// becomes hypersparse; a hypersparse one with more than twice that
    /// becomes sparse. Bitmap and full matrices are left alone.
    pub fn conform(&mut self, hyper_switch: f64) -> EwiseResult<()> {
        let limit = hyper_switch * self.vdim() as f64;
        let nonempty = self.nvec_nonempty() as f64;
        match self.sparsity() {
            Sparsity::Sparse if nonempty <= limit => {
                *self = self.to_sparsity(Sparsity::Hypersparse)?;
            }
            Sparsity::Hypersparse if nonempty > 2.0 * limit => {
                *self = self.to_sparsity(Sparsity::Sparse)?;
            }
            _ => {}
        }
        Ok(())
    }
}
