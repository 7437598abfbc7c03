//! Raw timing series derived from one typing sample.

use super::{FeatureVector, KeystrokeEvent, FEATURE_LEN};
use crate::stats::{statistics, Statistics};
use serde::{Deserialize, Serialize};

/// Floor on the elapsed time used for typing speed (seconds)
const MIN_ELAPSED_SECS: f64 = 0.001;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingSeries {
    /// Hold duration per key; non-positive values are dropped
    pub dwell: Vec<f64>,
    /// Release-to-press gap per adjacent pair; negative when keys overlap
    pub flight: Vec<f64>,
    /// Press-to-press interval per adjacent pair
    pub digraph: Vec<f64>,
    /// Keys per second over the whole sample
    pub typing_speed: f64,
    /// Only from devices that report it
    pub pressure: Vec<f64>,
    pub touch_size: Vec<f64>,
}

impl TimingSeries {
    pub fn from_events(events: &[KeystrokeEvent]) -> Self {
        let mut s = TimingSeries::default();

        for e in events {
            let dwell = e.release_time - e.press_time;
            if dwell > 0.0 {
                s.dwell.push(dwell);
            }
            if let Some(p) = e.pressure {
                s.pressure.push(p);
            }
            if let Some(t) = e.touch_size {
                s.touch_size.push(t);
            }
        }

        for pair in events.windows(2) {
            let (prev, cur) = (&pair[0], &pair[1]);
            s.flight.push(cur.press_time - prev.release_time);
            s.digraph.push(cur.press_time - prev.press_time);
        }

        if let (Some(first), Some(last)) = (events.first(), events.last()) {
            let elapsed_secs = (last.release_time - first.press_time) / 1000.0;
            s.typing_speed = events.len() as f64 / elapsed_secs.max(MIN_ELAPSED_SECS);
        }
        s
    }

    /// Summarize each series and lay the result out in vector order.
    pub fn to_vector(&self) -> FeatureVector {
        let blocks: [Statistics; 3] = [
            statistics(&self.dwell),
            statistics(&self.flight),
            statistics(&self.digraph),
        ];
        let mut out = Vec::with_capacity(FEATURE_LEN);
        for b in &blocks {
            out.extend_from_slice(&b.to_array());
        }
        out.push(self.typing_speed);
        out.extend_from_slice(&statistics(&self.pressure).to_array());
        out.extend_from_slice(&statistics(&self.touch_size).to_array());
        FeatureVector { values: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_each_series() {
        let events = vec![
            KeystrokeEvent::new("a", 0.0, 100.0),
            KeystrokeEvent::new("b", 150.0, 240.0),
            KeystrokeEvent::new("c", 230.0, 330.0),
        ];
        let s = TimingSeries::from_events(&events);
        assert_eq!(s.dwell, vec![100.0, 90.0, 100.0]);
        assert_eq!(s.flight, vec![50.0, -10.0]);
        assert_eq!(s.digraph, vec![150.0, 80.0]);
        assert!((s.typing_speed - 3.0 / 0.33).abs() < 1e-9);
        assert!(s.pressure.is_empty());
    }

    #[test]
    fn drops_non_positive_dwell() {
        let events = vec![
            KeystrokeEvent::new("a", 10.0, 10.0),
            KeystrokeEvent::new("b", 20.0, 15.0),
            KeystrokeEvent::new("c", 30.0, 80.0),
        ];
        assert_eq!(TimingSeries::from_events(&events).dwell, vec![50.0]);
    }

    #[test]
    fn zero_duration_sample_uses_floor() {
        let events = vec![
            KeystrokeEvent::new("a", 5.0, 5.0),
            KeystrokeEvent::new("b", 5.0, 5.0),
        ];
        let s = TimingSeries::from_events(&events);
        assert_eq!(s.typing_speed, 2.0 / MIN_ELAPSED_SECS);
    }

    #[test]
    fn absent_touch_data_yields_zero_blocks() {
        let events = vec![
            KeystrokeEvent::new("a", 0.0, 80.0),
            KeystrokeEvent::new("b", 120.0, 200.0),
        ];
        let v = TimingSeries::from_events(&events).to_vector();
        assert_eq!(v.len(), FEATURE_LEN);
        assert!(v.as_slice()[22..].iter().all(|x| *x == 0.0));
    }
}
