//! Churn training pipeline: partition, cross-validate, fit the final pair, persist it.
//!
//! Every random choice is driven by the configured seed, so identical input produces identical
//! fold scores and an identical artifact.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::artifact::{self, ArtifactError, ArtifactLocation, TrainedArtifact};
use crate::config::{AppConfig, TrainingSettings};
use crate::dataset::{self, CleaningOptions, DatasetError, LabeledDataset};
use crate::ml::encoder::FeatureEncoder;
use crate::ml::logreg::{FitOutcome, LogRegError, TrainOptions, train_logreg};
use crate::ml::metrics::{ScoreSummary, accuracy_at, roc_auc_score};
use crate::predictor::{self, PredictError};
use crate::schema::{FeatureSchema, SchemaError};

pub mod split;
pub use split::{Fold, KFold, SplitError, train_test_split};

/// Which rows the persisted pair is fit on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalFit {
    /// Keep the pair fit inside the last cross-validation fold (historical behavior).
    #[default]
    LastFold,
    /// Refit on the whole full-train partition after cross-validation.
    FullTrain,
}

#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error(transparent)]
    Fit(#[from] LogRegError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl From<PredictError> for TrainError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::Schema(err) => TrainError::Schema(err),
            PredictError::Model(err) => TrainError::Fit(err),
            PredictError::Empty => TrainError::Fit(LogRegError::EmptyTrainingSet),
        }
    }
}

/// Row ids of each partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partitions {
    pub full_train: Vec<usize>,
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
    pub test: Vec<usize>,
}

/// Outcome of one cross-validation round.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldReport {
    pub fold: usize,
    pub train_rows: usize,
    pub validation_rows: usize,
    /// `None` when the held-out rows contain a single class.
    pub auc: Option<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// Everything a training run produced.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub rows: usize,
    pub full_train_rows: usize,
    pub train_rows: usize,
    pub validation_rows: usize,
    pub test_rows: usize,
    pub folds: Vec<FoldReport>,
    pub summary: Option<ScoreSummary>,
    pub final_fit: FinalFit,
    pub final_fit_rows: usize,
    pub test_auc: Option<f64>,
    pub test_accuracy: f64,
    pub convergence_warnings: usize,
    pub artifact: TrainedArtifact,
}

impl TrainReport {
    /// Fold AUCs that were defined, in fold order.
    pub fn fold_scores(&self) -> Vec<f64> {
        self.folds.iter().filter_map(|fold| fold.auc).collect()
    }
}

impl TrainingSettings {
    pub fn train_options(&self) -> TrainOptions {
        TrainOptions {
            c: self.c,
            max_iter: self.max_iter,
            tol: self.tol,
        }
    }

    pub fn cleaning_options(&self) -> CleaningOptions {
        CleaningOptions {
            target_column: self.target_column.clone(),
            positive_label: self.positive_label.clone(),
            coerce_numeric: self.coerce_numeric.clone(),
        }
    }
}

/// 80/20 full-train/test, then full-train split into train/validation.
pub fn partition(rows: usize, settings: &TrainingSettings) -> Result<Partitions, SplitError> {
    let (full_train, test) = train_test_split(rows, settings.test_fraction, settings.seed)?;
    let (train_pos, val_pos) =
        train_test_split(full_train.len(), settings.val_fraction, settings.seed)?;
    Ok(Partitions {
        train: train_pos.iter().map(|&p| full_train[p]).collect(),
        validation: val_pos.iter().map(|&p| full_train[p]).collect(),
        full_train,
        test,
    })
}

/// Fit an encoder and classifier on `data`.
///
/// A non-converging classifier is logged and kept.
pub fn fit_pair(
    schema: &FeatureSchema,
    data: &LabeledDataset,
    options: &TrainOptions,
) -> Result<(TrainedArtifact, FitOutcome), TrainError> {
    let (encoder, x) = FeatureEncoder::fit_transform(schema, &data.records)?;
    let outcome = train_logreg(&x, &data.labels, options)?;
    if let Some(warning) = &outcome.convergence {
        warn!("{warning}; keeping best-effort coefficients");
    }
    let artifact = TrainedArtifact::new(encoder, outcome.model.clone())?;
    Ok((artifact, outcome))
}

/// Run k-fold cross-validation; returns per-fold reports and the last fold's pair.
pub fn cross_validate(
    schema: &FeatureSchema,
    data: &LabeledDataset,
    kfold: KFold,
    options: &TrainOptions,
) -> Result<(Vec<FoldReport>, TrainedArtifact), TrainError> {
    let mut reports = Vec::with_capacity(kfold.n_splits);
    let mut last = None;
    for (fold_idx, fold) in kfold.split(data.len())?.into_iter().enumerate() {
        let train = data.select(&fold.train);
        let validation = data.select(&fold.validation);
        let (artifact, outcome) = fit_pair(schema, &train, options)?;
        let scores = predictor::predict(&validation.records, &artifact)?;
        let auc = roc_auc_score(&validation.labels, &scores);
        match auc {
            Some(auc) => info!(fold = fold_idx, auc = format_args!("{auc:.3}"), "Fold scored"),
            None => warn!(
                fold = fold_idx,
                "Fold has a single class in its held-out rows; AUC undefined, skipping score"
            ),
        }
        reports.push(FoldReport {
            fold: fold_idx,
            train_rows: train.len(),
            validation_rows: validation.len(),
            auc,
            iterations: outcome.iterations,
            converged: outcome.converged(),
        });
        last = Some(artifact);
    }
    let last = last.ok_or(SplitError::TooFewRows {
        rows: data.len(),
        needed: kfold.n_splits,
    })?;
    Ok((reports, last))
}

/// Train on already-cleaned data without touching the filesystem.
pub fn train(
    schema: &FeatureSchema,
    data: &LabeledDataset,
    settings: &TrainingSettings,
) -> Result<TrainReport, TrainError> {
    let options = settings.train_options();
    let parts = partition(data.len(), settings)?;
    info!(
        full_train = parts.full_train.len(),
        train = parts.train.len(),
        validation = parts.validation.len(),
        test = parts.test.len(),
        "Partitioned dataset"
    );
    let full_train = data.select(&parts.full_train);
    let test = data.select(&parts.test);

    let (folds, last_fold) = cross_validate(
        schema,
        &full_train,
        KFold::new(settings.n_splits, settings.seed),
        &options,
    )?;
    let scores: Vec<f64> = folds.iter().filter_map(|f| f.auc).collect();
    let summary = ScoreSummary::from_scores(&scores);
    match &summary {
        Some(summary) => info!("C={} {summary}", settings.c),
        None => warn!("C={} no fold produced a defined AUC", settings.c),
    }
    let mut convergence_warnings = folds.iter().filter(|f| !f.converged).count();

    let (artifact, final_fit_rows) = match settings.final_fit {
        FinalFit::LastFold => {
            let rows = folds.last().map(|f| f.train_rows).unwrap_or_default();
            info!(
                rows,
                "Persisting the pair fit on the last fold's training rows (final_fit = last_fold)"
            );
            (last_fold, rows)
        }
        FinalFit::FullTrain => {
            info!(rows = full_train.len(), "Refitting on the full-train partition");
            let (artifact, outcome) = fit_pair(schema, &full_train, &options)?;
            convergence_warnings += usize::from(!outcome.converged());
            (artifact, full_train.len())
        }
    };

    let test_scores = predictor::predict(&test.records, &artifact)?;
    let test_auc = roc_auc_score(&test.labels, &test_scores);
    let test_accuracy = accuracy_at(&test.labels, &test_scores, 0.5);
    match test_auc {
        Some(auc) => info!(
            auc = format_args!("{auc:.3}"),
            accuracy = format_args!("{test_accuracy:.3}"),
            "Held-out test scores"
        ),
        None => info!(
            accuracy = format_args!("{test_accuracy:.3}"),
            "Held-out test scores (AUC undefined)"
        ),
    }

    Ok(TrainReport {
        rows: data.len(),
        full_train_rows: parts.full_train.len(),
        train_rows: parts.train.len(),
        validation_rows: parts.validation.len(),
        test_rows: parts.test.len(),
        folds,
        summary,
        final_fit: settings.final_fit,
        final_fit_rows,
        test_auc,
        test_accuracy,
        convergence_warnings,
        artifact,
    })
}

/// Load the CSV named by `config`, train, and persist the artifact.
///
/// Nothing is written unless every earlier step succeeded.
pub fn run(config: &AppConfig) -> Result<TrainReport, TrainError> {
    let settings = &config.training;
    info!(path = %settings.data_path.display(), "Loading training data");
    let (data, cleaning) = dataset::load_training_data(
        &settings.data_path,
        &config.schema,
        &settings.cleaning_options(),
    )?;
    info!(
        rows = cleaning.rows,
        positives = cleaning.positives,
        "Loaded training data"
    );
    let report = train(&config.schema, &data, settings)?;
    save_artifact(&report.artifact, &settings.artifact)?;
    Ok(report)
}

fn save_artifact(artifact: &TrainedArtifact, location: &ArtifactLocation) -> Result<(), TrainError> {
    artifact::save(artifact, location)?;
    info!(artifact = %location, "Saved trained artifact");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CustomerRecord;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(["contract"], ["tenure"]).unwrap()
    }

    fn synthetic(rows: usize) -> LabeledDataset {
        let mut data = LabeledDataset::default();
        for i in 0..rows {
            let monthly = i % 3 != 0;
            let tenure = ((i * 7) % 40) as f64;
            let churn = monthly && tenure < 20.0 || i % 11 == 0;
            data.records.push(
                CustomerRecord::new()
                    .with("contract", if monthly { "month-to-month" } else { "two_year" })
                    .with("tenure", tenure),
            );
            data.labels.push(u8::from(churn));
        }
        data
    }

    #[test]
    fn partitions_are_60_20_20_and_disjoint() {
        let parts = partition(100, &TrainingSettings::default()).unwrap();
        assert_eq!(parts.full_train.len(), 80);
        assert_eq!(parts.test.len(), 20);
        assert_eq!(parts.train.len(), 60);
        assert_eq!(parts.validation.len(), 20);
        for idx in &parts.test {
            assert!(!parts.full_train.contains(idx));
        }
        for idx in &parts.validation {
            assert!(parts.full_train.contains(idx));
            assert!(!parts.train.contains(idx));
        }
    }

    #[test]
    fn train_reports_every_fold() {
        let report = train(&schema(), &synthetic(120), &TrainingSettings::default()).unwrap();
        assert_eq!(report.folds.len(), 5);
        assert_eq!(report.full_train_rows, 96);
        assert_eq!(report.final_fit, FinalFit::LastFold);
        assert_eq!(report.final_fit_rows, report.folds[4].train_rows);
        let summary = report.summary.unwrap();
        assert!(summary.mean > 0.5);
        assert!(report.fold_scores().iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn full_train_refit_uses_all_full_train_rows() {
        let settings = TrainingSettings {
            final_fit: FinalFit::FullTrain,
            ..TrainingSettings::default()
        };
        let report = train(&schema(), &synthetic(120), &settings).unwrap();
        assert_eq!(report.final_fit_rows, 96);
    }

    #[test]
    fn identical_input_gives_identical_results() {
        let data = synthetic(90);
        let a = train(&schema(), &data, &TrainingSettings::default()).unwrap();
        let b = train(&schema(), &data, &TrainingSettings::default()).unwrap();
        assert_eq!(a.folds, b.folds);
        assert_eq!(a.artifact, b.artifact);
    }

    #[test]
    fn encoding_errors_abort_training() {
        let mut data = synthetic(40);
        data.records[3].remove("contract");
        let err = train(&schema(), &data, &TrainingSettings::default()).unwrap_err();
        assert!(matches!(err, TrainError::Schema(SchemaError::MissingAttribute { .. })));
    }
}
