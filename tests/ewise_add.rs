//! Tests for element-wise add (union of patterns)

use ewise::{
    ewise_add, matches_reference, reference_ewise, BinaryOp, ElementType, EwiseConfig, EwiseError,
    EwiseKind, Matrix, Opcode, Sparsity,
};

/// Deterministic pseudo-random entries with roughly `density` percent filled
fn entries(vlen: usize, vdim: usize, density: u64, seed: u64) -> Vec<(usize, usize, f64)> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut out = Vec::new();
    for j in 0..vdim {
        for i in 0..vlen {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            if (state >> 33) % 100 < density {
                out.push((i, j, ((state >> 40) % 97) as f64 - 48.0));
            }
        }
    }
    out
}

fn config() -> EwiseConfig {
    EwiseConfig::default().with_threads(1)
}

#[test]
fn test_add_small_example() {
    // A = [1 0; 0 2], B = [0 3; 0 4] (stored by column)
    let a = Matrix::from_triplets(2, 2, &[(0, 0, 1.0f64), (1, 1, 2.0)], Sparsity::Sparse).unwrap();
    let b = Matrix::from_triplets(2, 2, &[(0, 1, 3.0f64), (1, 1, 4.0)], Sparsity::Sparse).unwrap();
    let plus = BinaryOp::of::<f64>(Opcode::Plus).unwrap();

    let c = ewise_add(&ElementType::FP64, true, None, Some(&plus), &a, &b, &config()).unwrap();
    c.check().unwrap();
    assert_eq!(c.nvals(), 3);
    assert_eq!(
        c.to_tuples::<f64>().unwrap(),
        vec![(0, 0, 1.0), (0, 1, 3.0), (1, 1, 6.0)]
    );
}

#[test]
fn test_add_every_format_pair_matches_reference() {
    let plus = BinaryOp::of::<f64>(Opcode::Plus).unwrap();
    let ea = entries(9, 7, 35, 1);
    let eb = entries(9, 7, 35, 2);
    let expected = {
        let a = Matrix::from_triplets(9, 7, &ea, Sparsity::Sparse).unwrap();
        let b = Matrix::from_triplets(9, 7, &eb, Sparsity::Sparse).unwrap();
        reference_ewise(EwiseKind::Add, &ElementType::FP64, None, Some(&plus), &a, &b).unwrap()
    };

    for fa in [Sparsity::Hypersparse, Sparsity::Sparse, Sparsity::Bitmap] {
        for fb in [Sparsity::Hypersparse, Sparsity::Sparse, Sparsity::Bitmap] {
            let a = Matrix::from_triplets(9, 7, &ea, fa).unwrap();
            let b = Matrix::from_triplets(9, 7, &eb, fb).unwrap();
            let c = ewise_add(&ElementType::FP64, true, None, Some(&plus), &a, &b, &config()).unwrap();
            c.check().unwrap();
            assert!(matches_reference(&c, &expected), "A {fa:?}, B {fb:?}");
        }
    }
}

#[test]
fn test_add_with_full_operand() {
    let minus = BinaryOp::of::<f64>(Opcode::Minus).unwrap();
    let dense: Vec<_> = (0..4)
        .flat_map(|j| (0..3).map(move |i| (i, j, (i + 10 * j) as f64)))
        .collect();
    let a = Matrix::from_triplets(3, 4, &dense, Sparsity::Full).unwrap();
    let b = Matrix::from_triplets(3, 4, &[(1, 2, 100.0f64)], Sparsity::Hypersparse).unwrap();

    let c = ewise_add(&ElementType::FP64, true, None, Some(&minus), &a, &b, &config()).unwrap();
    assert_eq!(c.nvals(), 12);
    assert_eq!(c.get::<f64>(1, 2), Some(21.0 - 100.0));
    assert_eq!(c.get::<f64>(2, 3), Some(32.0));

    // B alone is copied, not negated
    let c = ewise_add(&ElementType::FP64, true, None, Some(&minus), &b, &a, &config()).unwrap();
    assert_eq!(c.get::<f64>(1, 2), Some(100.0 - 21.0));
    assert_eq!(c.get::<f64>(0, 0), Some(0.0));
}

#[test]
fn test_add_casts_one_sided_entries() {
    let a = Matrix::from_triplets(3, 1, &[(0, 0, 7i32), (1, 0, -2)], Sparsity::Sparse).unwrap();
    let b = Matrix::from_triplets(3, 1, &[(1, 0, 0.5f64), (2, 0, 2.75)], Sparsity::Sparse).unwrap();
    let plus = BinaryOp::of::<f64>(Opcode::Plus).unwrap();

    let c = ewise_add(&ElementType::INT16, true, None, Some(&plus), &a, &b, &config()).unwrap();
    assert_eq!(c.element_type(), &ElementType::INT16);
    // -2 + 0.5 = -1.5 truncates to -1; B's 2.75 alone truncates to 2
    assert_eq!(
        c.to_tuples::<i16>().unwrap(),
        vec![(0, 0, 7), (1, 0, -1), (2, 0, 2)]
    );
}

#[test]
fn test_add_comparison_into_bool() {
    let a = Matrix::from_triplets(3, 1, &[(0, 0, 1u32), (1, 0, 5)], Sparsity::Sparse).unwrap();
    let b = Matrix::from_triplets(3, 1, &[(1, 0, 3u32), (2, 0, 0)], Sparsity::Bitmap).unwrap();
    let gt = BinaryOp::of::<u32>(Opcode::Gt).unwrap();
    assert_eq!(gt.ztype(), &ElementType::BOOL);

    let c = ewise_add(&ElementType::BOOL, true, None, Some(&gt), &a, &b, &config()).unwrap();
    // one-sided entries are cast to bool: 1 -> true, 0 -> false
    assert_eq!(
        c.to_tuples::<u8>().unwrap(),
        vec![(0, 0, 1), (1, 0, 1), (2, 0, 0)]
    );
}

#[test]
fn test_add_user_type_and_operator() {
    // two u8 lanes added with wrap-around
    let lanes = ElementType::user_defined("lanes2", 2).unwrap();
    let op = BinaryOp::user("lane_add", lanes.clone(), lanes.clone(), lanes.clone(), |x, y, z| {
        z[0] = x[0].wrapping_add(y[0]);
        z[1] = x[1].wrapping_add(y[1]);
    });
    let a = Matrix::from_parts(
        lanes.clone(),
        2,
        1,
        Sparsity::Sparse,
        ewise::MatrixParts {
            p: vec![0, 2],
            i: vec![0, 1],
            x: vec![1, 2, 250, 10],
            ..Default::default()
        },
    )
    .unwrap();
    let b = Matrix::from_parts(
        lanes.clone(),
        2,
        1,
        Sparsity::Sparse,
        ewise::MatrixParts {
            p: vec![0, 1],
            i: vec![1],
            x: vec![10, 20],
            ..Default::default()
        },
    )
    .unwrap();

    let c = ewise_add(&lanes, true, None, Some(&op), &a, &b, &config()).unwrap();
    assert_eq!(
        c.to_byte_tuples(),
        vec![(0, 0, vec![1, 2]), (1, 0, vec![4, 30])]
    );

    // user values cannot be cast to a built-in result
    let err = ewise_add(&ElementType::FP64, true, None, Some(&op), &a, &b, &config()).unwrap_err();
    assert!(matches!(err, EwiseError::TypeMismatch { .. }));
}

#[test]
fn test_add_empty_inputs() {
    let a = Matrix::empty(ElementType::FP32, 5, 5).unwrap();
    let b = Matrix::from_triplets(5, 5, &[(4, 4, 1.0f32)], Sparsity::Hypersparse).unwrap();
    let plus = BinaryOp::of::<f32>(Opcode::Plus).unwrap();

    let c = ewise_add(&ElementType::FP32, true, None, Some(&plus), &a, &a, &config()).unwrap();
    assert_eq!(c.nvals(), 0);
    assert_eq!(c.nvec_nonempty(), 0);

    let c = ewise_add(&ElementType::FP32, true, None, Some(&plus), &a, &b, &config()).unwrap();
    assert_eq!(c.to_tuples::<f32>().unwrap(), vec![(4, 4, 1.0)]);
}

#[test]
fn test_add_hypersparse_inputs_give_hypersparse_result() {
    let a = Matrix::from_triplets(100, 1000, &[(3, 10, 1i64), (4, 500, 2)], Sparsity::Hypersparse)
        .unwrap();
    let b = Matrix::from_triplets(100, 1000, &[(3, 10, 5i64), (9, 999, 7)], Sparsity::Hypersparse)
        .unwrap();
    let plus = BinaryOp::of::<i64>(Opcode::Plus).unwrap();

    let c = ewise_add(&ElementType::INT64, true, None, Some(&plus), &a, &b, &config()).unwrap();
    assert!(c.is_hyper());
    assert!(c.is_pruned());
    assert_eq!(c.h(), &[10, 500, 999]);
    assert_eq!(c.nvec_nonempty(), 3);
    assert_eq!(c.get::<i64>(3, 10), Some(6));
}

#[test]
fn test_add_many_threads_matches_single_thread() {
    let ea = entries(300, 40, 20, 11);
    let eb = entries(300, 40, 20, 12);
    let a = Matrix::from_triplets(300, 40, &ea, Sparsity::Sparse).unwrap();
    let b = Matrix::from_triplets(300, 40, &eb, Sparsity::Bitmap).unwrap();
    let max = BinaryOp::of::<f64>(Opcode::Max).unwrap();

    let serial = ewise_add(&ElementType::FP64, true, None, Some(&max), &a, &b, &config()).unwrap();
    let parallel_config = EwiseConfig::default()
        .with_threads(4)
        .with_chunk(16)
        .with_tasks_per_thread(3);
    let parallel = ewise_add(&ElementType::FP64, true, None, Some(&max), &a, &b, &parallel_config).unwrap();
    parallel.check().unwrap();
    assert_eq!(parallel.to_byte_tuples(), serial.to_byte_tuples());
}

#[test]
fn test_add_result_by_row() {
    let a = Matrix::from_triplets(2, 3, &[(0, 2, 1u8)], Sparsity::Sparse).unwrap();
    let b = Matrix::from_triplets(2, 3, &[(1, 0, 2u8)], Sparsity::Sparse).unwrap();
    let plus = BinaryOp::of::<u8>(Opcode::Plus).unwrap();

    let c = ewise_add(&ElementType::UINT8, false, None, Some(&plus), &a, &b, &config()).unwrap();
    assert!(!c.by_col());
    assert_eq!(c.shape(), (2, 3));
    // stored by row: (index, vector) = (column, row)
    assert_eq!(c.get::<u8>(2, 0), Some(1));
    assert_eq!(c.get::<u8>(0, 1), Some(2));
}

#[test]
fn test_add_rejects_mismatched_inputs() {
    let a = Matrix::empty(ElementType::FP64, 3, 3).unwrap();
    let b = Matrix::empty(ElementType::FP64, 3, 3).unwrap().by_row();
    let plus = BinaryOp::of::<f64>(Opcode::Plus).unwrap();
    let err = ewise_add(&ElementType::FP64, true, None, Some(&plus), &a, &b, &config()).unwrap_err();
    assert!(matches!(err, EwiseError::OrientationMismatch { what: "B" }));

    let tall = Matrix::empty(ElementType::FP64, 4, 3).unwrap();
    let err = ewise_add(&ElementType::FP64, true, None, Some(&plus), &a, &tall, &config()).unwrap_err();
    assert!(matches!(err, EwiseError::DimensionMismatch { .. }));
}

#[test]
fn test_add_without_operator_merges_disjoint_patterns() {
    let a = Matrix::from_triplets(4, 2, &[(0, 0, 1i8), (3, 1, 4)], Sparsity::Sparse).unwrap();
    let b = Matrix::from_triplets(4, 2, &[(1, 0, 2i8), (2, 1, 3)], Sparsity::Hypersparse).unwrap();

    let c = ewise_add(&ElementType::INT8, true, None, None, &a, &b, &config()).unwrap();
    assert_eq!(
        c.to_tuples::<i8>().unwrap(),
        vec![(0, 0, 1), (1, 0, 2), (2, 1, 3), (3, 1, 4)]
    );

    let overlapping = Matrix::from_triplets(4, 2, &[(0, 0, 9i8)], Sparsity::Bitmap).unwrap();
    let err = ewise_add(&ElementType::INT8, true, None, None, &a, &overlapping, &config()).unwrap_err();
    assert!(matches!(err, EwiseError::NullOpOverlap { overlaps: 1 }));
}
