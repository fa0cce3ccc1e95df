//! Masks restricting which entries of a result may be written

use crate::matrix::sparse::Matrix;

/// A read-only mask over a matrix
///
/// A *structural* mask admits every present entry. A *valued* mask admits
/// present entries whose value is non-zero (any non-zero byte for
/// user-defined types). A *complemented* mask admits exactly the positions
/// the plain mask would reject, absent positions included.
#[derive(Debug, Clone, Copy)]
pub struct Mask<'a> {
    pub matrix: &'a Matrix,
    pub structural: bool,
    pub complement: bool,
}

impl<'a> Mask<'a> {
    /// Valued, non-complemented mask
    pub fn new(matrix: &'a Matrix) -> Self {
        Self {
            matrix,
            structural: false,
            complement: false,
        }
    }

    /// Structural, non-complemented mask
    pub fn structural(matrix: &'a Matrix) -> Self {
        Self {
            structural: true,
            ..Self::new(matrix)
        }
    }

    /// Complements the mask
    pub fn complemented(mut self) -> Self {
        self.complement = !self.complement;
        self
    }

    /// Whether the entry stored at position `pos` passes the value test
    #[inline]
    pub(crate) fn entry_admits(&self, pos: usize) -> bool {
        self.structural
            || self
                .matrix
                .element_type()
                .is_nonzero(self.matrix.value_bytes(pos))
    }

    /// Whether position `(i, j)` admits a result entry
    pub fn admits(&self, i: usize, j: usize) -> bool {
        let hit = self
            .matrix
            .position(i, j)
            .is_some_and(|pos| self.entry_admits(pos));
        hit != self.complement
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::sparse::Sparsity;

    #[test]
    fn test_valued_and_structural() {
        let m = Matrix::from_triplets(2, 1, &[(0usize, 0usize, 0i32), (1, 0, 5)], Sparsity::Sparse)
            .unwrap();
        let valued = Mask::new(&m);
        assert!(!valued.admits(0, 0));
        assert!(valued.admits(1, 0));

        let structural = Mask::structural(&m);
        assert!(structural.admits(0, 0));
        assert!(structural.admits(1, 0));
    }

    #[test]
    fn test_complement() {
        let m = Matrix::from_triplets(3, 1, &[(1usize, 0usize, 1.0f64)], Sparsity::Bitmap).unwrap();
        let mask = Mask::structural(&m).complemented();
        assert!(mask.admits(0, 0));
        assert!(!mask.admits(1, 0));
        assert!(mask.admits(2, 0));
    }

    #[test]
    fn test_iso_mask_uses_single_value() {
        let m = Matrix::full(2, 1, vec![1u8, 1]).unwrap().into_iso(0u8).unwrap();
        assert!(!Mask::new(&m).admits(0, 0));
        assert!(Mask::structural(&m).admits(0, 0));
    }
}
