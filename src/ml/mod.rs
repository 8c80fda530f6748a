//! Feature encoding, the churn classifier and its evaluation metrics.

pub mod encoder;
pub mod logreg;
pub mod metrics;
