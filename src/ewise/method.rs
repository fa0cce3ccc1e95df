//! Traversal method selection

use crate::ewise::EwiseKind;
use crate::matrix::mask::Mask;
use crate::matrix::sparse::Matrix;

/// How output entries are enumerated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EwiseMethod {
    /// Two-pointer merge of two index lists
    Merge,
    /// Walk the mask's index list and probe A and B; used when the mask is
    /// sparse or hypersparse, not complemented, and A or B is bitmap or full
    MaskDriven,
    /// Intersection: walk A's index list, probe B by slot
    ADriven,
    /// Intersection: walk B's index list, probe A by slot
    BDriven,
    /// Visit every slot of the vector
    SlotScan,
}

/// Chooses the method for one call
pub fn select_method(kind: EwiseKind, a: &Matrix, b: &Matrix, mask: Option<&Mask<'_>>) -> EwiseMethod {
    let a_list = a.sparsity().has_pattern();
    let b_list = b.sparsity().has_pattern();

    if let Some(m) = mask {
        if !m.complement && m.matrix.sparsity().has_pattern() && (!a_list || !b_list) {
            return EwiseMethod::MaskDriven;
        }
    }

    match (kind, a_list, b_list) {
        (_, true, true) => EwiseMethod::Merge,
        (EwiseKind::Mult, true, false) => EwiseMethod::ADriven,
        (EwiseKind::Mult, false, true) => EwiseMethod::BDriven,
        _ => EwiseMethod::SlotScan,
    }
}
