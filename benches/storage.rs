//! Secure storage benchmark: encrypted profile writes and reads, attempt log.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use keyauth::decision::{AttemptRecord, DecisionEngine};
use keyauth::features::{FeatureVector, FEATURE_LEN};
use keyauth::model::Method;
use keyauth::storage::{ProfileStore, SecureStore};
use keyauth::EnrollmentProfile;
use tempfile::tempdir;

fn profile(identity: &str) -> EnrollmentProfile {
    let vectors = (0..5)
        .map(|j| FeatureVector::try_from(vec![j as f64 + 80.0; FEATURE_LEN]).unwrap())
        .collect();
    EnrollmentProfile::from_parts(
        identity.to_string(),
        vectors,
        0.85,
        None,
        "web".into(),
        chrono::Utc::now(),
    )
}

fn bench_save_profile(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let store = SecureStore::open(&dir.path().join("store.db"), b"bench-secret").unwrap();
    let mut n: u64 = 0;

    c.bench_function("storage_save_profile", |b| {
        b.iter(|| {
            n += 1;
            let p = profile(&format!("user-{}", n));
            black_box(store.save_profile(&p, None)).unwrap()
        })
    });
}

fn bench_load_profile(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let store = SecureStore::open(&dir.path().join("store.db"), b"bench-secret").unwrap();
    store.save_profile(&profile("ada"), None).unwrap();

    c.bench_function("storage_load_profile", |b| {
        b.iter(|| black_box(store.load_profile("ada")).unwrap())
    });
}

fn bench_record_attempt(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let store = SecureStore::open(&dir.path().join("store.db"), b"bench-secret").unwrap();
    let decision = DecisionEngine::new(0.85).decide(0.9, Method::AnomalyDetection, None);

    c.bench_function("storage_record_attempt", |b| {
        b.iter(|| {
            let attempt = AttemptRecord::new("ada", &decision, "web");
            black_box(store.record_attempt(&attempt)).unwrap()
        })
    });
}

criterion_group!(benches, bench_save_profile, bench_load_profile, bench_record_attempt);
criterion_main!(benches);
