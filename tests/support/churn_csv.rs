use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use churnpal::artifact::ArtifactLocation;
use churnpal::config::{AppConfig, TrainingSettings};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const HEADER: &str = "customerID,gender,SeniorCitizen,Partner,Dependents,tenure,PhoneService,\
MultipleLines,InternetService,OnlineSecurity,OnlineBackup,DeviceProtection,TechSupport,\
StreamingTV,StreamingMovies,Contract,PaperlessBilling,PaymentMethod,MonthlyCharges,\
TotalCharges,Churn";

const CONTRACTS: [&str; 3] = ["Month-to-month", "One year", "Two year"];
const INTERNET: [&str; 3] = ["DSL", "Fiber optic", "No"];
const PAYMENT: [&str; 4] = [
    "Electronic check",
    "Mailed check",
    "Bank transfer (automatic)",
    "Credit card (automatic)",
];

fn yes_no(rng: &mut StdRng) -> &'static str {
    if rng.random_bool(0.5) { "Yes" } else { "No" }
}

/// Telco-style churn CSV. Short month-to-month fiber customers churn most often.
pub fn churn_csv(rows: usize, seed: u64, all_negative: bool) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = String::from(HEADER);
    out.push('\n');
    for idx in 0..rows {
        let contract = CONTRACTS[rng.random_range(0..CONTRACTS.len())];
        let internet = INTERNET[rng.random_range(0..INTERNET.len())];
        let tenure: u32 = rng.random_range(0..72);
        let phone = yes_no(&mut rng);
        let multiple = if phone == "No" {
            "No phone service"
        } else {
            yes_no(&mut rng)
        };
        let addon = |rng: &mut StdRng| {
            if internet == "No" {
                "No internet service"
            } else {
                yes_no(rng)
            }
        };
        let security = addon(&mut rng);
        let backup = addon(&mut rng);
        let protection = addon(&mut rng);
        let support = addon(&mut rng);
        let tv = addon(&mut rng);
        let movies = addon(&mut rng);
        let monthly: f64 = rng.random_range(20.0..110.0);
        let total = if tenure == 0 {
            " ".to_string()
        } else {
            format!("{:.2}", monthly * f64::from(tenure))
        };

        let mut risk = 0.05;
        if contract == "Month-to-month" {
            risk += 0.4;
        }
        if tenure < 12 {
            risk += 0.25;
        }
        if internet == "Fiber optic" {
            risk += 0.15;
        }
        let churn = !all_negative && rng.random_bool(f64::min(risk, 0.95));

        let _ = writeln!(
            out,
            "{idx:04}-TEST,{},{},{},{},{tenure},{phone},{multiple},{internet},{security},{backup},\
{protection},{support},{tv},{movies},{contract},{},{},{monthly:.2},{total},{}",
            if rng.random_bool(0.5) { "Female" } else { "Male" },
            u8::from(rng.random_bool(0.2)),
            yes_no(&mut rng),
            yes_no(&mut rng),
            yes_no(&mut rng),
            PAYMENT[rng.random_range(0..PAYMENT.len())],
            if churn { "Yes" } else { "No" },
        );
    }
    out
}

pub fn write_churn_csv(dir: &Path, rows: usize, seed: u64, all_negative: bool) -> PathBuf {
    let path = dir.join("churn.csv");
    std::fs::write(&path, churn_csv(rows, seed, all_negative)).unwrap();
    path
}

/// Default config reading `data_path` and writing a bundle artifact into `dir`.
pub fn config_for(dir: &Path, data_path: PathBuf, artifact_name: &str) -> AppConfig {
    AppConfig {
        training: TrainingSettings {
            data_path,
            artifact: ArtifactLocation::bundle(dir.join(artifact_name)),
            ..TrainingSettings::default()
        },
        ..AppConfig::default()
    }
}
