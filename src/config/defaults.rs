use std::path::PathBuf;

use crate::artifact::ArtifactLocation;

pub(super) fn default_data_path() -> PathBuf {
    PathBuf::from("churn.csv")
}

pub(super) fn default_artifact() -> ArtifactLocation {
    ArtifactLocation::bundle("model.json")
}

pub(super) fn default_c() -> f64 {
    1.0
}

pub(super) fn default_max_iter() -> usize {
    100
}

pub(super) fn default_tol() -> f64 {
    1e-4
}

pub(super) fn default_n_splits() -> usize {
    5
}

pub(super) fn default_seed() -> u64 {
    1
}

pub(super) fn default_test_fraction() -> f64 {
    0.2
}

pub(super) fn default_val_fraction() -> f64 {
    0.25
}

pub(super) fn default_target_column() -> String {
    "churn".to_string()
}

pub(super) fn default_positive_label() -> String {
    "yes".to_string()
}

pub(super) fn default_coerce_numeric() -> Vec<String> {
    vec!["totalcharges".to_string()]
}

pub(super) fn default_bind() -> String {
    "0.0.0.0:9696".to_string()
}

pub(super) fn default_route() -> String {
    "/predict".to_string()
}
