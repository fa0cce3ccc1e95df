//! Removal of empty vectors from hypersparse matrices

use crate::matrix::sparse::Matrix;

impl Matrix {
    /// Drops every empty vector from the hyperlist, compacting `p` and `h`
    /// in place
    ///
    /// A no-op for the other formats. Running it twice changes nothing.
    pub fn prune_hyper(&mut self) {
        if !self.is_hyper() {
            return;
        }
        let before = self.nvec();
        let (Some(p), Some(h)) = self.pattern_mut() else {
            return;
        };

        let mut kept = 0;
        for k in 0..before {
            let (start, end) = (p[k], p[k + 1]);
            if end > start {
                p[kept] = start;
                h[kept] = h[k];
                kept += 1;
            }
        }
        p[kept] = p[before];
        p.truncate(kept + 1);
        h.truncate(kept);

        if kept < before {
            log::debug!("pruned {} empty vectors ({} kept)", before - kept, kept);
        }
        self.set_nvec_nonempty(kept);
    }
}

#[cfg(test)]
mod tests {
    use crate::matrix::sparse::Matrix;

    #[test]
    fn test_prune_removes_empty_vectors() {
        let mut m = Matrix::hypersparse(
            4,
            10,
            vec![0, 2, 2, 3, 3],
            vec![1, 3, 5, 8],
            vec![0, 2, 1],
            vec![1i32, 2, 3],
        )
        .unwrap();
        assert!(!m.is_pruned());

        m.prune_hyper();
        assert!(m.is_pruned());
        assert_eq!(m.h(), &[1, 5]);
        assert_eq!(m.p(), &[0, 2, 3]);
        assert_eq!(m.nvec_nonempty(), 2);
        assert_eq!(m.get::<i32>(1, 5), Some(3));
        m.check().unwrap();

        m.prune_hyper();
        assert_eq!(m.h(), &[1, 5]);
        assert_eq!(m.p(), &[0, 2, 3]);
    }

    #[test]
    fn test_prune_to_empty() {
        let mut m =
            Matrix::hypersparse::<f32>(4, 10, vec![0, 0, 0], vec![2, 7], vec![], vec![]).unwrap();
        m.prune_hyper();
        assert_eq!(m.nvec(), 0);
        assert_eq!(m.p(), &[0]);
        m.check().unwrap();
    }
}
