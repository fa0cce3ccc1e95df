//! Tests for iso-valued results

use ewise::{
    ewise_add, ewise_mult, matches_reference, reference_ewise, BinaryOp, ElementType, EwiseConfig,
    EwiseKind, Matrix, Opcode, Sparsity,
};

fn config() -> EwiseConfig {
    EwiseConfig::default().with_threads(1)
}

fn pattern(entries: &[(usize, usize)], sparsity: Sparsity) -> Matrix {
    let with_values: Vec<_> = entries
        .iter()
        .enumerate()
        .map(|(n, &(i, j))| (i, j, n as f64 + 1.0))
        .collect();
    Matrix::from_triplets(5, 4, &with_values, sparsity).unwrap()
}

#[test]
fn test_pair_gives_iso_one() {
    let a = pattern(&[(0, 0), (1, 1), (4, 3)], Sparsity::Sparse);
    let b = pattern(&[(1, 1), (4, 3), (2, 2)], Sparsity::Bitmap);
    let pair = BinaryOp::of::<f64>(Opcode::Pair).unwrap();

    let c = ewise_mult(&ElementType::FP64, true, None, &pair, &a, &b, &config()).unwrap();
    assert!(c.is_iso());
    assert_eq!(c.x_bytes().len(), 8);
    c.check().unwrap();
    assert_eq!(c.to_tuples::<f64>().unwrap(), vec![(1, 1, 1.0), (4, 3, 1.0)]);
}

#[test]
fn test_first_with_iso_a() {
    let a = pattern(&[(0, 0), (1, 1), (3, 2)], Sparsity::Hypersparse)
        .into_iso(2.5f64)
        .unwrap();
    let b = pattern(&[(0, 0), (3, 2)], Sparsity::Sparse);
    let first = BinaryOp::of::<f64>(Opcode::First).unwrap();
    let second = BinaryOp::of::<f64>(Opcode::Second).unwrap();

    let c = ewise_mult(&ElementType::FP64, true, None, &first, &a, &b, &config()).unwrap();
    assert!(c.is_iso());
    assert_eq!(c.to_tuples::<f64>().unwrap(), vec![(0, 0, 2.5), (3, 2, 2.5)]);

    // SECOND reads the non-iso B
    let c = ewise_mult(&ElementType::FP64, true, None, &second, &a, &b, &config()).unwrap();
    assert!(!c.is_iso());
    assert_eq!(c.to_tuples::<f64>().unwrap(), vec![(0, 0, 1.0), (3, 2, 2.0)]);
}

#[test]
fn test_iso_value_is_cast_to_result_type() {
    let a = pattern(&[(0, 0), (2, 1)], Sparsity::Sparse).into_iso(7.9f64).unwrap();
    let b = pattern(&[(0, 0), (2, 1)], Sparsity::Sparse).into_iso(1.0f64).unwrap();
    let times = BinaryOp::of::<f64>(Opcode::Times).unwrap();

    let c = ewise_mult(&ElementType::INT8, true, None, &times, &a, &b, &config()).unwrap();
    assert!(c.is_iso());
    assert_eq!(c.x_bytes(), &[7]);
    assert_eq!(c.nvals(), 2);
}

#[test]
fn test_add_iso_only_when_all_paths_agree() {
    let a = pattern(&[(0, 0), (1, 0)], Sparsity::Sparse).into_iso(4i32).unwrap();
    let b = pattern(&[(1, 0), (3, 3)], Sparsity::Sparse).into_iso(4i32).unwrap();
    let max = BinaryOp::of::<i32>(Opcode::Max).unwrap();
    let plus = BinaryOp::of::<i32>(Opcode::Plus).unwrap();

    let c = ewise_add(&ElementType::INT32, true, None, Some(&max), &a, &b, &config()).unwrap();
    assert!(c.is_iso());
    assert_eq!(c.nvals(), 3);

    let c = ewise_add(&ElementType::INT32, true, None, Some(&plus), &a, &b, &config()).unwrap();
    assert!(!c.is_iso());
    assert_eq!(
        c.to_tuples::<i32>().unwrap(),
        vec![(0, 0, 4), (1, 0, 8), (3, 3, 4)]
    );
}

#[test]
fn test_iso_inputs_in_generic_kernel() {
    // iso inputs still read their single value when the result is not iso
    let a = pattern(&[(0, 0), (1, 1), (2, 2)], Sparsity::Bitmap).into_iso(3i16).unwrap();
    let b = pattern(&[(1, 1), (2, 2), (4, 3)], Sparsity::Sparse);
    let minus = BinaryOp::of::<f64>(Opcode::Minus).unwrap();

    let expected = reference_ewise(EwiseKind::Add, &ElementType::FP64, None, Some(&minus), &a, &b).unwrap();
    let c = ewise_add(&ElementType::FP64, true, None, Some(&minus), &a, &b, &config()).unwrap();
    assert!(!c.is_iso());
    assert!(matches_reference(&c, &expected));
    assert_eq!(c.get::<f64>(1, 1), Some(3.0 - 1.0));
}
