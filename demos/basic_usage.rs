use knn_survival::{metrics::concordance_index, KnnSurvival, SurvivalData};
use ndarray::{array, Array2};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("KNN Survival - Basic Usage Example");
    println!("==================================\n");

    // Raw loader output: one follow-up time is 0, so the cohort gets shifted
    let times = vec![0.0, 2.1, 3.5, 4.2, 5.8, 6.1, 7.3, 8.9, 9.2, 10.5,
                     2.3, 3.1, 4.8, 5.2, 6.9, 7.1, 8.3, 9.8, 10.1, 11.2];

    let censored = vec![false, true, false, false, true, false, false, true, false, true,
                        false, false, true, false, false, true, false, false, true, false];

    // Features: age, treatment (0/1), biomarker_level, site (constant)
    let features = Array2::from_shape_vec((20, 4), vec![
        65.0, 0.0, 2.3, 1.0,
        70.0, 1.0, 1.8, 1.0,
        55.0, 0.0, 3.1, 1.0,
        62.0, 1.0, 2.1, 1.0,
        68.0, 0.0, 2.8, 1.0,
        72.0, 1.0, 1.5, 1.0,
        58.0, 0.0, 3.4, 1.0,
        66.0, 1.0, 1.9, 1.0,
        71.0, 0.0, 2.6, 1.0,
        59.0, 1.0, 2.0, 1.0,
        63.0, 0.0, 2.9, 1.0,
        69.0, 1.0, 1.7, 1.0,
        57.0, 0.0, 3.2, 1.0,
        64.0, 1.0, 2.2, 1.0,
        67.0, 0.0, 2.7, 1.0,
        73.0, 1.0, 1.6, 1.0,
        61.0, 0.0, 3.0, 1.0,
        65.0, 1.0, 1.8, 1.0,
        70.0, 0.0, 2.5, 1.0,
        56.0, 1.0, 2.4, 1.0,
    ])?;

    let mut data = SurvivalData::from_raw(times, censored, features)?;
    let kept = data.remove_zero_variance_features();
    data.standardize_features()?;

    println!("Dataset Information:");
    println!("  - Number of samples: {}", data.n_samples());
    println!("  - Number of features kept: {} (columns {:?})", data.n_features(), kept);
    println!("  - Number of events: {}", data.n_samples() - data.n_censored());
    println!("  - Number of censored: {}", data.n_censored());
    println!();

    // Example 1: leave the last five patients out and predict them
    println!("Example 1: Held-out Prediction");
    println!("------------------------------");

    let train = data.subset(&(0..15).collect::<Vec<_>>())?;
    let test = data.subset(&(15..20).collect::<Vec<_>>())?;

    let mut model = KnnSurvival::new().with_k(5);
    model.fit(&train)?;

    let scores = model.predict(test.features())?;
    println!("{:<10} {:>10} {:>10} {:>10}", "patient", "time", "censored", "score");
    println!("{:-<44}", "");
    for i in 0..test.n_samples() {
        println!("{:<10} {:>10.2} {:>10} {:>10.3}",
                 15 + i, test.times()[i], test.censored()[i], scores[i]);
    }
    println!();

    match concordance_index(scores.view(), test.times(), test.censored()) {
        Ok(c) => println!("Held-out C-index: {:.4}", c),
        Err(e) => println!("Held-out C-index unavailable: {}", e),
    }
    println!();

    // Example 2: the survival curve behind one prediction
    println!("Example 2: Neighbourhood Survival Curve");
    println!("---------------------------------------");

    let curves = model.predict_curves(test.features())?;
    let curve = &curves[0];
    println!("{:<10} {:>10}", "time", "survival");
    for (t, p) in curve.times.iter().zip(curve.survival.iter()) {
        println!("{:<10.2} {:>10.3}", t, p);
    }
    println!("score = {:.3}", curve.score());
    println!();

    // Example 3: effect of k
    println!("Example 3: Effect of K");
    println!("----------------------");
    println!("{:<6} {:>10}", "k", "C-index");
    for k in [2, 5, 10, 15] {
        let mut model = KnnSurvival::new().with_k(k);
        model.fit(&train)?;
        match model.evaluate(&test) {
            Ok(c) => println!("{:<6} {:>10.4}", k, c),
            Err(e) => println!("{:<6} {:>10}", k, e),
        }
    }
    println!();

    // Example 4: a learned diagonal transform (e.g. from NCA) is just feature weights
    println!("Example 4: Weighted Features");
    println!("----------------------------");
    let weights = array![0.2, 1.5, 1.0];
    let weighted_train = train.apply_feature_weights(weights.view())?;
    let weighted_test = test.apply_feature_weights(weights.view())?;

    let mut weighted_model = KnnSurvival::new().with_k(5);
    weighted_model.fit(&weighted_train)?;
    match weighted_model.evaluate(&weighted_test) {
        Ok(c) => println!("Weighted C-index: {:.4}", c),
        Err(e) => println!("Weighted C-index unavailable: {}", e),
    }

    Ok(())
}
