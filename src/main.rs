use ewise::constants::DEFAULT_HYPER_SWITCH;
use ewise::{ewise_add, ewise_mult, BinaryOp, ElementType, EwiseConfig, Mask, Matrix, Opcode, Sparsity};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("ewise {}: element-wise sparse matrix algebra", ewise::VERSION);

    // Create two small example matrices in different formats
    let a = Matrix::from_triplets(
        4,
        4,
        &[(0, 0, 1.0f64), (2, 0, 2.0), (1, 1, 3.0), (3, 3, 4.0)],
        Sparsity::Sparse,
    )?;
    let b = Matrix::from_triplets(
        4,
        4,
        &[(0, 0, 10.0f64), (1, 1, 20.0), (2, 2, 30.0)],
        Sparsity::Bitmap,
    )?;

    println!("\nMatrix A:");
    println!("{:?}", a);

    println!("\nMatrix B:");
    println!("{:?}", b);

    let config = EwiseConfig::default().with_hyper_switch(DEFAULT_HYPER_SWITCH);
    println!("\nConfiguration:");
    println!("  Threads: {}", config.n_threads());
    println!("  Chunk: {}", config.chunk);
    println!("  Tasks per thread: {}", config.tasks_per_thread);

    let plus = BinaryOp::of::<f64>(Opcode::Plus)?;
    let times = BinaryOp::of::<f64>(Opcode::Times)?;

    let sum = ewise_add(&ElementType::FP64, true, None, Some(&plus), &a, &b, &config)?;
    println!("\nA + B (union):");
    println!("{:?}", sum);

    let product = ewise_mult(&ElementType::FP64, true, None, &times, &a, &b, &config)?;
    println!("\nA .* B (intersection):");
    println!("{:?}", product);

    let mask = Mask::structural(&b).complemented();
    let outside = ewise_add(&ElementType::FP64, true, Some(&mask), Some(&plus), &a, &b, &config)?;
    println!("\nA + B outside the pattern of B:");
    for (i, j, v) in outside.to_tuples::<f64>()? {
        println!("  ({}, {}) = {}", i, j, v);
    }

    Ok(())
}
