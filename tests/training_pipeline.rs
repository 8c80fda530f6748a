mod support;

use churnpal::artifact::{self, ArtifactLocation};
use churnpal::dataset::DatasetError;
use churnpal::predictor;
use churnpal::record::example_customer;
use churnpal::training::{self, FinalFit, TrainError};
use support::churn_csv::{config_for, write_churn_csv};
use tempfile::tempdir;

#[test]
fn run_writes_a_loadable_artifact() {
    let dir = tempdir().unwrap();
    let data = write_churn_csv(dir.path(), 300, 7, false);
    let config = config_for(dir.path(), data, "model.json");

    let report = training::run(&config).unwrap();
    assert_eq!(report.rows, 300);
    assert_eq!(report.test_rows, 60);
    assert_eq!(report.folds.len(), 5);
    let summary = report.summary.unwrap();
    assert_eq!(summary.count, 5);
    assert!(summary.mean > 0.5, "cv auc {summary}");
    assert!(report.test_auc.is_some());

    let loaded = artifact::load(&config.training.artifact).unwrap();
    assert_eq!(loaded, report.artifact);
    let probability = predictor::predict_one(&example_customer(), &loaded).unwrap();
    assert!((0.0..=1.0).contains(&probability));
}

#[test]
fn identical_runs_produce_identical_artifacts() {
    let dir = tempdir().unwrap();
    let data = write_churn_csv(dir.path(), 200, 3, false);
    let first = config_for(dir.path(), data.clone(), "first.json");
    let second = config_for(dir.path(), data, "second.json");

    let a = training::run(&first).unwrap();
    let b = training::run(&second).unwrap();
    assert_eq!(a.fold_scores(), b.fold_scores());
    let bytes_a = std::fs::read(dir.path().join("first.json")).unwrap();
    let bytes_b = std::fs::read(dir.path().join("second.json")).unwrap();
    assert_eq!(bytes_a, bytes_b);
}

#[test]
fn different_seeds_shuffle_differently() {
    let dir = tempdir().unwrap();
    let data = write_churn_csv(dir.path(), 200, 3, false);
    let first = config_for(dir.path(), data.clone(), "seed1.json");
    let mut second = config_for(dir.path(), data, "seed2.json");
    second.training.seed = 2;

    let a = training::run(&first).unwrap();
    let b = training::run(&second).unwrap();
    assert_ne!(a.fold_scores(), b.fold_scores());
}

#[test]
fn all_negative_labels_predict_low_churn() {
    let dir = tempdir().unwrap();
    let data = write_churn_csv(dir.path(), 120, 11, true);
    let config = config_for(dir.path(), data, "model.json");

    let report = training::run(&config).unwrap();
    assert!(report.summary.is_none());
    assert!(report.folds.iter().all(|fold| fold.auc.is_none()));

    let loaded = artifact::load(&config.training.artifact).unwrap();
    let probability = predictor::predict_one(&example_customer(), &loaded).unwrap();
    assert!(probability < 0.5, "p = {probability}");
}

#[test]
fn full_train_refit_and_split_layout() {
    let dir = tempdir().unwrap();
    let data = write_churn_csv(dir.path(), 200, 5, false);
    let mut config = config_for(dir.path(), data, "unused.json");
    config.training.final_fit = FinalFit::FullTrain;
    config.training.artifact = ArtifactLocation::Split {
        encoder_path: dir.path().join("dv.json"),
        model_path: dir.path().join("clf.json"),
    };

    let report = training::run(&config).unwrap();
    assert_eq!(report.final_fit_rows, report.full_train_rows);
    let loaded = artifact::load(&config.training.artifact).unwrap();
    assert_eq!(loaded, report.artifact);
}

#[test]
fn missing_data_file_writes_nothing() {
    let dir = tempdir().unwrap();
    let config = config_for(dir.path(), dir.path().join("absent.csv"), "model.json");

    let err = training::run(&config).unwrap_err();
    assert!(matches!(err, TrainError::Dataset(DatasetError::Open { .. })));
    assert!(!dir.path().join("model.json").exists());
}

#[test]
fn unconverged_folds_still_produce_an_artifact() {
    let dir = tempdir().unwrap();
    let data = write_churn_csv(dir.path(), 200, 13, false);
    let mut config = config_for(dir.path(), data, "model.json");
    config.training.max_iter = 1;

    let report = training::run(&config).unwrap();
    assert_eq!(report.folds.len(), 5);
    assert!(report.convergence_warnings > 0);
    assert!(report.folds.iter().any(|fold| !fold.converged));
    assert!(dir.path().join("model.json").exists());
    let loaded = artifact::load(&config.training.artifact).unwrap();
    assert_eq!(loaded, report.artifact);
}
