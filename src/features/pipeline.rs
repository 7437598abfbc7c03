//! Extraction pipeline: events → timing series → feature vector + summary.

use super::{FeatureVector, KeystrokeEvent, TimingSeries};
use crate::error::{AuthError, Result};
use crate::stats::{mean, std_dev};
use serde::{Deserialize, Serialize};

/// Human-readable breakdown of a sample, rounded for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub dwell_time_mean: f64,
    pub dwell_time_std: f64,
    pub flight_time_mean: f64,
    pub flight_time_std: f64,
    pub digraph_latency_mean: f64,
    pub typing_speed: f64,
    pub pressure_mean: f64,
    pub touch_size_mean: f64,
    pub feature_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedFeatures {
    pub vector: FeatureVector,
    pub summary: FeatureSummary,
    pub dwell_times: Vec<f64>,
    pub flight_times: Vec<f64>,
    pub typing_speed: f64,
}

fn round_to(v: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (v * f).round() / f
}

/// Stateless; one instance can serve any number of threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, events: &[KeystrokeEvent]) -> Result<ExtractedFeatures> {
        if events.len() < 2 {
            return Err(AuthError::InsufficientData { got: events.len() });
        }
        let series = TimingSeries::from_events(events);
        let vector = series.to_vector();

        let summary = FeatureSummary {
            dwell_time_mean: round_to(mean(&series.dwell), 2),
            dwell_time_std: round_to(std_dev(&series.dwell), 2),
            flight_time_mean: round_to(mean(&series.flight), 2),
            flight_time_std: round_to(std_dev(&series.flight), 2),
            digraph_latency_mean: round_to(mean(&series.digraph), 2),
            typing_speed: round_to(series.typing_speed, 2),
            pressure_mean: round_to(mean(&series.pressure), 4),
            touch_size_mean: round_to(mean(&series.touch_size), 4),
            feature_count: vector.len(),
        };
        tracing::debug!(
            events = events.len(),
            dwell = series.dwell.len(),
            typing_speed = summary.typing_speed,
            "features extracted"
        );

        Ok(ExtractedFeatures {
            vector,
            summary,
            typing_speed: series.typing_speed,
            dwell_times: series.dwell,
            flight_times: series.flight,
        })
    }
}
