#![allow(dead_code)]

pub mod churn_csv;
