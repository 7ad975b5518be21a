use knn_survival::{
    cv_accuracy, cv_tune, metrics::CIndexSummary, model::predict, neighbors::rank_neighbors,
    risk_set::compute_at_risk, FailedFoldPolicy, FoldPartition, KnnSurvival, PartitionConfig,
    SurvivalData, TestLabels, TuneConfig,
};
use ndarray::{array, Array1, Array2};
use approx::assert_relative_eq;

fn create_synthetic_data(n_samples: usize, n_features: usize, seed: u64) -> SurvivalData {
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    let mut rng = StdRng::seed_from_u64(seed);

    // Generate random features
    let mut features_vec = Vec::with_capacity(n_samples * n_features);
    for _ in 0..(n_samples * n_features) {
        features_vec.push(rng.gen_range(-2.0..2.0));
    }
    let features = Array2::from_shape_vec((n_samples, n_features), features_vec).unwrap();

    let mut times = Vec::with_capacity(n_samples);
    let mut censored = Vec::with_capacity(n_samples);

    let true_coefficients = Array1::from(vec![0.8, -0.5, 0.3]); // first 3 features drive hazard

    for i in 0..n_samples {
        let n_coef = n_features.min(3);
        let linear_pred: f64 = features
            .slice(ndarray::s![i, 0..n_coef])
            .dot(&true_coefficients.slice(ndarray::s![0..n_coef]));

        let hazard = 0.1 * linear_pred.exp();
        let time = (-rng.gen::<f64>().ln() / hazard).max(0.1);
        let censoring_time = rng.gen_range(1.0..15.0);

        if time < censoring_time {
            times.push(time);
            censored.push(false);
        } else {
            times.push(censoring_time);
            censored.push(true);
        }
    }

    SurvivalData::new(times, censored, features).unwrap()
}

#[test]
fn test_worked_example_through_public_api() {
    // cohort of four, query is the subject at time 2 with its three other members as neighbours
    let features = array![[0.0], [1.0], [2.0], [3.0]];
    let data = SurvivalData::new(vec![2.0, 4.0, 6.0, 8.0], vec![false, false, true, false], features).unwrap();

    let reference = data.subset(&[1, 2, 3]).unwrap();
    let ranking = rank_neighbors(data.features().slice(ndarray::s![0..1, ..]), reference.features()).unwrap();
    assert_eq!(ranking.row(0).to_vec(), vec![0, 1, 2]);

    let risk = compute_at_risk(&[4.0, 6.0, 8.0], &[true, false, true]).unwrap();
    assert_eq!(risk.at_risk, vec![3, 2, 1]);

    let out = predict(ranking.view(), reference.times(), reference.censored(), 3, None).unwrap();
    assert_relative_eq!(out.predictions[0], 2.5, epsilon = 1e-12);
}

#[test]
fn test_model_scores_held_out_patients() {
    let data = create_synthetic_data(300, 3, 42);
    let train = data.subset(&(0..200).collect::<Vec<_>>()).unwrap();
    let test = data.subset(&(200..300).collect::<Vec<_>>()).unwrap();

    let mut model = KnnSurvival::new().with_k(30);
    model.fit(&train).unwrap();

    let scores = model.predict(test.features()).unwrap();
    assert_eq!(scores.len(), 100);
    assert!(scores.iter().all(|&s| s.is_finite() && s >= 0.0 && s <= 30.0));

    let c_index = model.evaluate(&test).unwrap();
    assert!(c_index >= 0.0 && c_index <= 1.0, "c-index {} out of range", c_index);
}

#[test]
fn test_predict_matches_model() {
    let data = create_synthetic_data(80, 4, 7);
    let train = data.subset(&(0..60).collect::<Vec<_>>()).unwrap();
    let test = data.subset(&(60..80).collect::<Vec<_>>()).unwrap();

    let mut model = KnnSurvival::new().with_k(10);
    model.fit(&train).unwrap();
    let from_model = model.predict(test.features()).unwrap();

    let ranking = rank_neighbors(test.features(), train.features()).unwrap();
    let labels = TestLabels { times: test.times(), censored: test.censored() };
    let out = predict(ranking.view(), train.times(), train.censored(), 10, Some(labels)).unwrap();

    assert_eq!(out.predictions, from_model);
    assert_relative_eq!(out.c_index.unwrap(), model.evaluate(&test).unwrap(), epsilon = 1e-12);

    let curves = model.predict_curves(test.features()).unwrap();
    for (curve, &score) in curves.iter().zip(from_model.iter()) {
        assert_relative_eq!(curve.score(), score, epsilon = 1e-12);
    }
}

#[test]
fn test_tuning_is_reproducible() {
    let data = create_synthetic_data(150, 3, 321);
    let config = TuneConfig::new()
        .with_folds(5)
        .with_shuffles(2)
        .with_ks(vec![5, 10, 20, 40])
        .with_seed(11);

    let first = cv_tune(&data, &config).unwrap();
    let second = cv_tune(&data, &config).unwrap();

    assert_eq!(first.k_optim, second.k_optim);
    assert_eq!(first.c_indices, second.c_indices);
    assert_eq!(first.c_indices.len(), 10);
}

#[test]
fn test_nested_cross_validation() {
    let data = create_synthetic_data(240, 3, 555);
    let partition = FoldPartition::balanced(
        data.censored(),
        &PartitionConfig::new().with_folds(3).with_shuffles(2).with_outer_folds(2).with_seed(5),
    ).unwrap();
    let config = TuneConfig::new().with_folds(3).with_ks(vec![5, 10, 20]);

    let mut all_folds = Vec::new();
    for outer_fold in 0..partition.n_outer() {
        let result = cv_accuracy(&data, &partition, outer_fold, &config).unwrap();
        assert_eq!(result.c_indices.len(), partition.n_folds(outer_fold));
        assert!(config.ks.contains(&result.k_optim));
        all_folds.extend(result.c_indices);
    }

    let summary = CIndexSummary::from_folds(&all_folds).unwrap();
    assert_eq!(summary.n_folds, 12);
    assert_eq!(summary.n_failed, 0);
    assert!(summary.p25 <= summary.median && summary.median <= summary.p75);
    assert!(summary.p25 >= 0.0 && summary.p75 <= 1.0);
}

#[test]
fn test_partition_survives_json_and_gives_same_accuracy() {
    let data = create_synthetic_data(120, 3, 99);
    let partition = FoldPartition::balanced(
        data.censored(),
        &PartitionConfig::new().with_shuffles(1).with_seed(3),
    ).unwrap();
    let reloaded = FoldPartition::from_json(&partition.to_json().unwrap()).unwrap();

    let config = TuneConfig::new().with_folds(3).with_ks(vec![5, 15]);
    let a = cv_accuracy(&data, &partition, 0, &config).unwrap();
    let b = cv_accuracy(&data, &reloaded, 0, &config).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_excluded_folds_are_reported() {
    // a handful of observed deaths, mostly censored: some test folds can't be scored
    let n = 30;
    let times: Vec<f64> = (1..=n).map(|t| t as f64).collect();
    let censored: Vec<bool> = (0..n).map(|i| i != 0 && i != 1).collect();
    let features = Array2::from_shape_vec((n, 1), times.clone()).unwrap();
    let data = SurvivalData::new(times, censored, features).unwrap();

    let config = TuneConfig::new().with_folds(5).with_ks(vec![3]);
    assert!(cv_tune(&data, &config).is_err());

    let result = cv_tune(&data, &config.with_failed_folds(FailedFoldPolicy::Exclude)).unwrap();
    let failed = result.c_indices.iter().filter(|fold| fold[0].is_none()).count();
    // two observed subjects land in at most two of the five folds
    assert!(failed >= 3);
    assert_eq!(result.k_optim, 3);
}

#[test]
fn test_feature_weights_change_neighbourhoods() {
    // feature 0 tracks survival, feature 1 is loud noise
    let features = array![[0.0, 100.0], [1.0, -100.0], [2.0, 100.0], [9.0, -100.0]];
    let data = SurvivalData::new(vec![1.0, 2.0, 3.0, 10.0], vec![false; 4], features).unwrap();
    let query = array![[1.2, 100.0]];

    let raw = rank_neighbors(query.view(), data.features()).unwrap();
    assert_eq!(raw.row(0).to_vec(), vec![2, 0, 1, 3]);

    let weights = array![1.0, 0.0];
    let weighted = data.apply_feature_weights(weights.view()).unwrap();
    let weighted_query = &query * &weights;
    let ranking = rank_neighbors(weighted_query.view(), weighted.features()).unwrap();
    assert_eq!(ranking.row(0).to_vec(), vec![1, 2, 0, 3]);
}

#[test]
fn test_raw_cohort_cleaning() {
    let features = array![[1.0, 3.0, 0.5], [2.0, 3.0, 1.5], [4.0, 3.0, 2.5]];
    let mut data = SurvivalData::from_raw(vec![0.0, 5.0, 10.0], vec![false, true, false], features).unwrap();

    assert_eq!(data.times().to_vec(), vec![1.0, 6.0, 11.0]);
    assert_eq!(data.remove_zero_variance_features(), vec![0, 2]);
    data.standardize_features().unwrap();

    for column in data.features().columns() {
        assert_relative_eq!(column.mean().unwrap(), 0.0, epsilon = 1e-10);
        assert_relative_eq!(column.std(0.0), 1.0, epsilon = 1e-10);
    }
}

#[test]
fn test_malformed_partition_json_is_an_error() {
    let data = create_synthetic_data(40, 3, 8);
    // two optimization folds but cv folds for only the first
    let json = r#"{
        "idx_optim": [[0, 1, 2, 3, 4, 5, 6, 7, 8, 9], [10, 11, 12, 13, 14, 15, 16, 17, 18, 19]],
        "idx_optim_train": [[0, 1, 2, 3, 4, 5, 6], [10, 11, 12, 13, 14, 15, 16]],
        "idx_optim_valid": [[7, 8, 9], [17, 18, 19]],
        "fold_cv_train": [[[20, 21, 22, 23, 24]]],
        "fold_cv_test": [[[25, 26, 27]]]
    }"#;
    assert!(FoldPartition::from_json(json).is_err());

    // the same shapes put together by hand are caught at use
    let partition = FoldPartition {
        idx_optim: vec![(0..10).collect(), (10..20).collect()],
        idx_optim_train: vec![(0..7).collect(), (10..17).collect()],
        idx_optim_valid: vec![(7..10).collect(), (17..20).collect()],
        fold_cv_train: vec![vec![(20..25).collect()]],
        fold_cv_test: vec![vec![(25..28).collect()]],
    };
    let config = TuneConfig::new().with_folds(2).with_ks(vec![2]);
    assert!(cv_accuracy(&data, &partition, 1, &config).is_err());
}
