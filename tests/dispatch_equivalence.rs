//! The specialized and the generic kernels must produce identical results
//! for every built-in operator over every built-in type

use ewise::{
    ewise_add, ewise_mult, matches_reference, reference_ewise, BinaryOp, Bool8, ElementType,
    EwiseConfig, EwiseKind, Matrix, Opcode, Scalar, Sparsity,
};

fn operands<T: Scalar>(sa: Sparsity, sb: Sparsity) -> (Matrix, Matrix) {
    let value = |v: i32| v.cast::<T>();
    let ea = vec![
        (0, 0, value(3)),
        (2, 0, value(0)),
        (1, 1, value(7)),
        (3, 2, value(-2)),
        (0, 3, value(5)),
    ];
    let eb = vec![
        (0, 0, value(2)),
        (1, 0, value(4)),
        (1, 1, value(0)),
        (3, 2, value(-2)),
        (2, 3, value(9)),
    ];
    (
        Matrix::from_triplets(4, 4, &ea, sa).unwrap(),
        Matrix::from_triplets(4, 4, &eb, sb).unwrap(),
    )
}

fn check_all_opcodes<T: Scalar>() {
    let specialized = EwiseConfig::default().with_threads(1);
    let generic = EwiseConfig::default().with_threads(1).with_force_generic(true);

    for (sa, sb) in [
        (Sparsity::Sparse, Sparsity::Sparse),
        (Sparsity::Bitmap, Sparsity::Hypersparse),
    ] {
        let (a, b) = operands::<T>(sa, sb);
        for opcode in Opcode::BUILTIN {
            let op = BinaryOp::of::<T>(opcode).unwrap();
            let ctype = op.ztype().clone();

            let fast = ewise_add(&ctype, true, None, Some(&op), &a, &b, &specialized).unwrap();
            let slow = ewise_add(&ctype, true, None, Some(&op), &a, &b, &generic).unwrap();
            assert_eq!(
                fast.to_byte_tuples(),
                slow.to_byte_tuples(),
                "add {} ({sa:?}, {sb:?})",
                op.name()
            );

            let fast = ewise_mult(&ctype, true, None, &op, &a, &b, &specialized).unwrap();
            let slow = ewise_mult(&ctype, true, None, &op, &a, &b, &generic).unwrap();
            assert_eq!(
                fast.to_byte_tuples(),
                slow.to_byte_tuples(),
                "mult {} ({sa:?}, {sb:?})",
                op.name()
            );
        }
    }
}

#[test]
fn test_signed_integers() {
    check_all_opcodes::<i8>();
    check_all_opcodes::<i16>();
    check_all_opcodes::<i32>();
    check_all_opcodes::<i64>();
}

#[test]
fn test_unsigned_integers() {
    check_all_opcodes::<u8>();
    check_all_opcodes::<u16>();
    check_all_opcodes::<u32>();
    check_all_opcodes::<u64>();
}

#[test]
fn test_floats() {
    check_all_opcodes::<f32>();
    check_all_opcodes::<f64>();
}

#[test]
fn test_bool() {
    check_all_opcodes::<Bool8>();
}

#[test]
fn test_casting_path_matches_reference() {
    // A is int8, B is fp32, the operator works in int64 and C is uint16
    let a = Matrix::from_triplets(3, 2, &[(0, 0, -3i8), (1, 0, 100), (2, 1, 7)], Sparsity::Sparse)
        .unwrap();
    let b = Matrix::from_triplets(3, 2, &[(0, 0, 2.9f32), (2, 1, -1.5), (1, 1, 300.7)], Sparsity::Bitmap)
        .unwrap();
    let config = EwiseConfig::default().with_threads(1);

    for opcode in [Opcode::Plus, Opcode::Times, Opcode::Max, Opcode::Lt, Opcode::Second] {
        let op = BinaryOp::of::<i64>(opcode).unwrap();
        for kind in [EwiseKind::Add, EwiseKind::Mult] {
            let expected = reference_ewise(kind, &ElementType::UINT16, None, Some(&op), &a, &b).unwrap();
            let c = match kind {
                EwiseKind::Add => ewise_add(&ElementType::UINT16, true, None, Some(&op), &a, &b, &config),
                EwiseKind::Mult => ewise_mult(&ElementType::UINT16, true, None, &op, &a, &b, &config),
            }
            .unwrap();
            assert!(matches_reference(&c, &expected), "{kind:?} {}", op.name());
        }
    }
}

#[test]
fn test_result_type_differs_from_operator_type() {
    // PLUS over fp64 written into an int32 result goes through the generic kernel
    let a = Matrix::from_triplets(2, 1, &[(0, 0, 1.75f64), (1, 0, 2.5)], Sparsity::Sparse).unwrap();
    let b = Matrix::from_triplets(2, 1, &[(0, 0, 1.5f64)], Sparsity::Sparse).unwrap();
    let plus = BinaryOp::of::<f64>(Opcode::Plus).unwrap();
    let c = ewise_add(&ElementType::INT32, true, None, Some(&plus), &a, &b, &EwiseConfig::default())
        .unwrap();
    assert_eq!(c.to_tuples::<i32>().unwrap(), vec![(0, 0, 3), (1, 0, 2)]);
}
