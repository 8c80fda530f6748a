use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use churnpal::artifact::TrainedArtifact;
use churnpal::ml::encoder::FeatureEncoder;
use churnpal::ml::logreg::{TrainOptions, train_logreg};
use churnpal::predictor;
use churnpal::record::{CustomerRecord, example_customer};
use churnpal::schema::FeatureSchema;

const RECORD_COUNT: usize = 1_000;

fn customers() -> (Vec<CustomerRecord>, Vec<u8>) {
    let contracts = ["month-to-month", "one_year", "two_year"];
    let internet = ["dsl", "fiber_optic", "no"];
    let mut records = Vec::with_capacity(RECORD_COUNT);
    let mut labels = Vec::with_capacity(RECORD_COUNT);
    for i in 0..RECORD_COUNT {
        let mut record = example_customer();
        let contract = contracts[i % contracts.len()];
        let tenure = (i * 13 % 72) as f64;
        record.insert("contract", contract);
        record.insert("internetservice", internet[i % internet.len()]);
        record.insert("tenure", tenure);
        record.insert("totalcharges", tenure * 29.85);
        labels.push(u8::from(contract == "month-to-month" && tenure < 24.0));
        records.push(record);
    }
    (records, labels)
}

fn fitted(records: &[CustomerRecord], labels: &[u8]) -> TrainedArtifact {
    let schema = FeatureSchema::churn_default();
    let (encoder, x) = FeatureEncoder::fit_transform(&schema, records).expect("encode");
    let outcome = train_logreg(&x, labels, &TrainOptions::default()).expect("fit");
    TrainedArtifact::new(encoder, outcome.model).expect("artifact")
}

fn bench_predict(c: &mut Criterion) {
    let (records, labels) = customers();
    let artifact = fitted(&records, &labels);
    c.bench_function("predict_one", |b| {
        let customer = example_customer();
        b.iter(|| predictor::predict_one(black_box(&customer), &artifact).expect("predict"));
    });
    c.bench_with_input(
        BenchmarkId::new("predict_batch", RECORD_COUNT),
        &records,
        |b, records| {
            b.iter(|| predictor::predict(black_box(records), &artifact).expect("predict"));
        },
    );
}

fn bench_fit(c: &mut Criterion) {
    let (records, labels) = customers();
    let schema = FeatureSchema::churn_default();
    let (_, x) = FeatureEncoder::fit_transform(&schema, &records).expect("encode");
    c.bench_with_input(BenchmarkId::new("train_logreg", RECORD_COUNT), &x, |b, x| {
        b.iter(|| train_logreg(black_box(x), &labels, &TrainOptions::default()).expect("fit"));
    });
}

criterion_group!(benches, bench_predict, bench_fit);
criterion_main!(benches);
