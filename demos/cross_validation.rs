use knn_survival::{
    cv_accuracy, metrics::CIndexSummary, FailedFoldPolicy, FoldPartition, PartitionConfig,
    SurvivalData, TuneConfig,
};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

fn generate_synthetic_dataset(n_samples: usize, n_features: usize, seed: u64) -> knn_survival::Result<SurvivalData> {
    let mut rng = StdRng::seed_from_u64(seed);

    // Generate random features
    let mut features_vec = Vec::with_capacity(n_samples * n_features);
    for _ in 0..(n_samples * n_features) {
        features_vec.push(rng.gen_range(-2.0..2.0));
    }
    let features = Array2::from_shape_vec((n_samples, n_features), features_vec)
        .map_err(|e| knn_survival::KnnSurvivalError::invalid_input(e.to_string()))?;

    // True coefficients - first 3 features are truly predictive
    let true_coefficients = Array1::from(vec![0.8, -0.5, 0.3]);

    let mut times = Vec::with_capacity(n_samples);
    let mut censored = Vec::with_capacity(n_samples);

    for i in 0..n_samples {
        let linear_pred: f64 = features.slice(ndarray::s![i, 0..3]).dot(&true_coefficients);

        let hazard = 0.1 * linear_pred.exp();

        // Exponential survival time vs uniform censoring time
        let time = -rng.gen::<f64>().ln() / hazard;
        let censoring_time = rng.gen_range(1.0..15.0);

        if time < censoring_time {
            times.push(time);
            censored.push(false);
        } else {
            times.push(censoring_time);
            censored.push(true);
        }
    }

    SurvivalData::new(times, censored, features)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("KNN Survival - Nested Cross-Validation Example");
    println!("==============================================\n");

    println!("Generating synthetic dataset...");
    let mut data = generate_synthetic_dataset(400, 10, 42)?;
    data.standardize_features()?;

    println!("Dataset created:");
    println!("  - Samples: {}", data.n_samples());
    println!("  - Features: {}", data.n_features());
    println!("  - Events: {}", data.n_samples() - data.n_censored());
    println!("  - Censored: {}", data.n_censored());
    println!();

    // One partition for the whole experiment, so every K sees the same folds
    let partition_config = PartitionConfig::new()
        .with_folds(3)
        .with_shuffles(5)
        .with_outer_folds(2)
        .with_seed(2017);
    let partition = FoldPartition::balanced(data.censored(), &partition_config)?;

    // keep it around so a re-run can load the exact same splits
    let json = partition.to_json()?;
    println!("Partition: {} outer folds, {} cv folds each ({} bytes as json)",
             partition.n_outer(), partition.n_folds(0), json.len());
    println!();

    let tune_config = TuneConfig::new()
        .with_folds(5)
        .with_shuffles(1)
        .with_ks(vec![5, 10, 20, 30, 40, 60])
        .with_failed_folds(FailedFoldPolicy::Exclude);

    let mut all_folds = Vec::new();

    for outer_fold in 0..partition.n_outer() {
        println!("Outer fold {} of {}", outer_fold, partition.n_outer() - 1);
        println!("{:-<40}", "");

        let result = cv_accuracy(&data, &partition, outer_fold, &tune_config)?;

        println!("{:<8} {:>14}", "K", "median C-idx");
        for (k, score) in result.tuning.ks.iter().zip(result.tuning.median_c_index.iter()) {
            match score {
                Some(c) => println!("{:<8} {:>14.4}", k, c),
                None => println!("{:<8} {:>14}", k, "n/a"),
            }
        }
        println!("Optimal K = {}", result.k_optim);
        println!();

        println!("{:<8} {:>10}", "fold", "C-index");
        for (fold, score) in result.c_indices.iter().enumerate() {
            match score {
                Some(c) => println!("{:<8} {:>10.4}", fold, c),
                None => println!("{:<8} {:>10}", fold, "excluded"),
            }
        }
        println!();

        all_folds.extend(result.c_indices);
    }

    let summary = CIndexSummary::from_folds(&all_folds)?;
    summary.print();

    println!("\nCross-validation completed successfully!");

    Ok(())
}
