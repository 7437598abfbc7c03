//! Integration test: config load, enrollment to scoring end to end, guards, stores.

use chrono::Duration;
use keyauth::{
    config::{AuthConfig, DetectorKind},
    error::AuthError,
    features::{FeatureExtractor, KeystrokeEvent, FEATURE_LEN},
    guards::{ManualClock, RateLimiter, ReplayGuard},
    model::Method,
    service::{AttemptOutcome, AuthService, SampleSubmission},
    storage::{MemoryStore, ProfileStore, SecureStore},
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::sync::Arc;

const PHRASE: &str = "keystroke auth";

/// Deterministic typing of `PHRASE`: `scale` stretches every interval,
/// `jitter` perturbs dwell and flight with a fixed per-key pattern.
fn typed(scale: f64, jitter: f64) -> Vec<KeystrokeEvent> {
    let mut t = 1000.0;
    PHRASE
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let p = ((i * 7) % 5) as f64 - 2.0;
            let q = ((i * 3) % 5) as f64 - 2.0;
            let dwell = scale * (90.0 + ((13 * i) % 30) as f64 + jitter * p);
            let flight = scale * (60.0 + ((29 * i) % 50) as f64 + jitter * q);
            let e = KeystrokeEvent::new(c.to_string(), t, t + dwell);
            t += dwell + flight;
            e
        })
        .collect()
}

/// `PHRASE` typed with independent uniform noise on every interval
/// (dwell ±8 ms, flight ±12 ms), stretched by `scale`.
fn typed_noisy(rng: &mut StdRng, scale: f64) -> Vec<KeystrokeEvent> {
    let mut t = 1000.0;
    PHRASE
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let dwell = scale * (90.0 + ((13 * i) % 30) as f64 + rng.gen_range(-8.0..8.0));
            let flight = scale * (60.0 + ((29 * i) % 50) as f64 + rng.gen_range(-12.0..12.0));
            let e = KeystrokeEvent::new(c.to_string(), t, t + dwell);
            t += dwell + flight;
            e
        })
        .collect()
}

fn enrolled_service() -> AuthService<MemoryStore> {
    let service = AuthService::new(AuthConfig::default(), Arc::new(MemoryStore::new())).unwrap();
    let mut jitters = [-2.0, -1.0, 0.0, 1.0, 2.0].into_iter();
    let first = jitters.next().unwrap();
    service
        .register("ada", &SampleSubmission::new(typed(1.0, first)))
        .unwrap();
    for j in jitters {
        service
            .enroll_sample("ada", &SampleSubmission::new(typed(1.0, j)))
            .unwrap();
    }
    service
}

fn scored(outcome: AttemptOutcome) -> keyauth::AuthDecision {
    match outcome {
        AttemptOutcome::Scored(d) => d,
        other => panic!("expected a scored attempt, got {:?}", other),
    }
}

#[test]
fn config_load_default() {
    let c = AuthConfig::load(Path::new("nonexistent.json"));
    assert_eq!(c.enrollment.samples_required, 5);
    assert_eq!(c.enrollment.confidence_threshold, 0.85);
    assert_eq!(c.guards.rate_limit_max_attempts, 10);
    assert!(c.validate().is_ok());
}

#[test]
fn extraction_produces_finite_fixed_vector() {
    let f = FeatureExtractor::new().extract(&typed(1.0, 0.0)).unwrap();
    assert_eq!(f.vector.len(), FEATURE_LEN);
    assert!(f.vector.as_slice().iter().all(|v| v.is_finite()));
    assert_eq!(f.summary.feature_count, FEATURE_LEN);

    let one = &typed(1.0, 0.0)[..1];
    assert!(matches!(
        FeatureExtractor::new().extract(one),
        Err(AuthError::InsufficientData { got: 1 })
    ));
}

#[test]
fn genuine_accepted_and_slow_typist_rejected() {
    let service = enrolled_service();
    let status = service.enrollment_status("ada").unwrap();
    assert!(status.enrolled);
    assert_eq!(status.remaining, 0);

    let genuine = scored(
        service
            .score_authentication_attempt("ada", &SampleSubmission::new(typed(1.0, 0.5)))
            .unwrap(),
    );
    assert_eq!(genuine.method, Method::AnomalyDetection);
    assert!(genuine.confidence >= 0.85, "genuine {}", genuine.confidence);
    assert!(genuine.accepted);

    let impostor = scored(
        service
            .score_authentication_attempt("ada", &SampleSubmission::new(typed(3.0, 0.5)))
            .unwrap(),
    );
    assert_eq!(impostor.method, Method::AnomalyDetection);
    assert!(impostor.confidence < 0.85, "impostor {}", impostor.confidence);
    assert!(!impostor.accepted);

    let history = service.auth_history("ada").unwrap();
    assert_eq!(history.total_attempts, 2);
    assert_eq!(history.success_rate, 50.0);
    assert_eq!(history.security_score, Some(50.0));
    assert!(!history.attempts[0].accepted);
}

#[test]
fn fresh_noisy_samples_are_accepted_and_slower_typing_is_not() {
    for (kind, seed) in [(DetectorKind::Envelope, 11), (DetectorKind::IsolationForest, 12)] {
        let mut config = AuthConfig::default();
        config.model.detector = kind;
        let service = AuthService::new(config, Arc::new(MemoryStore::new()))
            .unwrap()
            .with_guards(
                Arc::new(ReplayGuard::new(300)),
                Arc::new(RateLimiter::new(1000, 60)),
            );
        let mut rng = StdRng::seed_from_u64(seed);

        service
            .register("ada", &SampleSubmission::new(typed_noisy(&mut rng, 1.0)))
            .unwrap();
        for _ in 1..5 {
            service
                .enroll_sample("ada", &SampleSubmission::new(typed_noisy(&mut rng, 1.0)))
                .unwrap();
        }

        let mut attempt = |scale: f64| {
            let sample = SampleSubmission::new(typed_noisy(&mut rng, scale));
            scored(service.score_authentication_attempt("ada", &sample).unwrap())
        };
        let accepted = (0..50).filter(|_| attempt(1.0).accepted).count();
        assert!(accepted >= 48, "{:?}: {} of 50 genuine accepted", kind, accepted);

        for scale in [1.5, 3.0] {
            for _ in 0..5 {
                let d = attempt(scale);
                assert!(!d.accepted, "{:?}: {}x slower scored {}", kind, scale, d.confidence);
            }
        }
    }
}

#[test]
fn replayed_attempt_is_flagged_until_window_expires() {
    let clock = Arc::new(ManualClock::default());
    let service = enrolled_service().with_guards(
        Arc::new(ReplayGuard::with_clock(300, clock.clone())),
        Arc::new(RateLimiter::with_clock(10, 60, clock.clone())),
    );
    let sample = SampleSubmission::new(typed(1.0, 0.5));

    assert!(matches!(
        service.score_authentication_attempt("ada", &sample).unwrap(),
        AttemptOutcome::Scored(_)
    ));
    assert_eq!(
        service.score_authentication_attempt("ada", &sample).unwrap(),
        AttemptOutcome::ReplayDetected
    );

    clock.advance(Duration::seconds(301));
    assert!(matches!(
        service.score_authentication_attempt("ada", &sample).unwrap(),
        AttemptOutcome::Scored(_)
    ));
    // the replay was not scored
    assert_eq!(service.auth_history("ada").unwrap().total_attempts, 2);
}

#[test]
fn rate_limit_reports_remaining() {
    let clock = Arc::new(ManualClock::default());
    let service = enrolled_service().with_guards(
        Arc::new(ReplayGuard::with_clock(300, clock.clone())),
        Arc::new(RateLimiter::with_clock(3, 60, clock.clone())),
    );
    for k in 0..3 {
        let sample = SampleSubmission::new(typed(1.0, 0.1 * k as f64));
        assert!(matches!(
            service.score_authentication_attempt("ada", &sample).unwrap(),
            AttemptOutcome::Scored(_)
        ));
    }
    let sample = SampleSubmission::new(typed(1.0, 0.9));
    assert_eq!(
        service.score_authentication_attempt("ada", &sample).unwrap(),
        AttemptOutcome::RateLimited { remaining: 0 }
    );

    clock.advance(Duration::seconds(60));
    assert!(matches!(
        service.score_authentication_attempt("ada", &sample).unwrap(),
        AttemptOutcome::Scored(_)
    ));
}

#[test]
fn concurrent_enrollment_trains_once() {
    let service = AuthService::new(AuthConfig::default(), Arc::new(MemoryStore::new())).unwrap();
    service
        .register("ada", &SampleSubmission::new(typed(1.0, 0.0)))
        .unwrap();

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|k| {
                let service = &service;
                s.spawn(move || {
                    let sample = SampleSubmission::new(typed(1.0, 0.25 * (k as f64 + 1.0)));
                    service.enroll_sample("ada", &sample)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let already = results
        .iter()
        .filter(|r| matches!(r, Err(AuthError::AlreadyEnrolled(_))))
        .count();
    assert_eq!((ok, already), (4, 4));

    let status = service.enrollment_status("ada").unwrap();
    assert!(status.enrolled);
    assert_eq!(status.samples_collected, 5);
}

#[test]
fn storage_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let store = Arc::new(SecureStore::open(&path, b"test-secret").unwrap());
    let service = AuthService::new(AuthConfig::default(), store.clone()).unwrap();

    for (i, j) in [-2.0, -1.0, 0.0, 1.0, 2.0].into_iter().enumerate() {
        let sample = SampleSubmission {
            keystrokes: typed(1.0, j),
            device_type: "mobile".into(),
        };
        if i == 0 {
            service.register("ada", &sample).unwrap();
        } else {
            service.enroll_sample("ada", &sample).unwrap();
        }
    }
    let decision = scored(
        service
            .score_authentication_attempt("ada", &SampleSubmission::new(typed(1.0, 0.5)))
            .unwrap(),
    );
    assert!(decision.accepted);

    // a fresh handle on the same file sees the same profile and log
    let reopened = SecureStore::open(&path, b"test-secret").unwrap();
    let profile = reopened.load_profile("ada").unwrap().unwrap();
    assert_eq!(profile, store.load_profile("ada").unwrap().unwrap());
    assert!(profile.is_enrolled());
    assert_eq!(profile.sample_count(), 5);
    assert_eq!(profile.device_type, "mobile");

    let attempts = reopened.attempts("ada", 10).unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].method, Method::AnomalyDetection);
    assert_eq!(attempts[0].confidence, decision.confidence);
}

#[test]
fn stale_profile_write_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = SecureStore::open(&dir.path().join("store.db"), b"test-secret").unwrap();
    let service = AuthService::new(AuthConfig::default(), Arc::new(MemoryStore::new())).unwrap();
    let first = service.extract_features(&typed(1.0, 0.0)).unwrap().vector;

    let enrollment = keyauth::Enrollment::new(
        AuthConfig::default().enrollment,
        AuthConfig::default().model,
    );
    let p1 = enrollment.register(None, "ada", first.clone(), "web").unwrap();
    store.save_profile(&p1, None).unwrap();

    let a = enrollment.add_sample(&p1, first.clone()).unwrap();
    let b = enrollment.add_sample(&p1, first).unwrap();
    store.save_profile(&a, Some(1)).unwrap();
    assert!(matches!(
        store.save_profile(&b, Some(1)),
        Err(AuthError::ConcurrentUpdate {
            expected: Some(1),
            found: Some(2),
            ..
        })
    ));
}

#[test]
fn corrupt_artifact_is_not_a_low_score() {
    let store = Arc::new(MemoryStore::new());
    let service = AuthService::new(AuthConfig::default(), store.clone()).unwrap();
    let good = service.extract_features(&typed(1.0, 0.0)).unwrap().vector;

    let broken = keyauth::EnrollmentProfile::from_parts(
        "ada".into(),
        vec![good; 5],
        0.85,
        Some("{\"mode\":\"anomaly_detection\",\"version\":99}".into()),
        "web".into(),
        chrono::Utc::now(),
    );
    store.save_profile(&broken, None).unwrap();

    let err = service
        .score_authentication_attempt("ada", &SampleSubmission::new(typed(1.0, 0.5)))
        .unwrap_err();
    assert!(matches!(err, AuthError::CorruptModel(_)));
}
