mod types;

pub use types::{AnxietyLevel, Reading, Stats};

use std::collections::VecDeque;

pub const MIN_THRESHOLD: f64 = 0.0;
pub const MAX_THRESHOLD: f64 = 100.0;

/// Range the dashboard slider exposes. Wider values are still accepted by
/// the controller.
pub const UI_MIN_THRESHOLD: f64 = 40.0;
pub const UI_MAX_THRESHOLD: f64 = 90.0;

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;
pub const DEFAULT_STATS_WINDOW: usize = 50;
pub const DEFAULT_RECENT_WINDOW: usize = 10;

/// Heuristic score from the beta/alpha ratio plus a gamma term, rounded and
/// clamped to 0..=100. Not a physiological model.
pub fn anxiety_score(alpha: f64, beta: f64, gamma: f64) -> f64 {
    let ratio = beta / alpha;
    ((ratio - 0.8) * 50.0 + gamma * 2.0).clamp(0.0, 100.0).round()
}

/// Window sizes used when projecting [`Stats`] out of a [`History`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsWindows {
    /// Trailing readings averaged into the `*_avg` fields.
    pub averages: usize,
    /// Trailing readings counted for `readings_above_threshold`.
    pub recent: usize,
}

impl Default for StatsWindows {
    fn default() -> Self {
        Self {
            averages: DEFAULT_STATS_WINDOW,
            recent: DEFAULT_RECENT_WINDOW,
        }
    }
}

/// Bounded FIFO of readings. Pushing past capacity evicts the oldest entry.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    readings: VecDeque<Reading>,
    capacity: usize,
}

impl History {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a reading, returning the evicted one when the buffer was full.
    pub fn push(&mut self, reading: Reading) -> Option<Reading> {
        let evicted = if self.readings.len() >= self.capacity {
            self.readings.pop_front()
        } else {
            None
        };
        self.readings.push_back(reading);
        evicted
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Reading> + ExactSizeIterator {
        self.readings.iter()
    }

    /// The last `n` readings (or all of them when shorter), oldest first.
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &Reading> {
        self.readings.iter().skip(self.readings.len().saturating_sub(n))
    }

    pub fn to_vec(&self) -> Vec<Reading> {
        self.readings.iter().copied().collect()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Project rolling statistics out of `history`. Returns `None` for an empty
/// history since there is nothing to average.
pub fn compute_stats(
    history: &History,
    current: &Reading,
    threshold: f64,
    windows: StatsWindows,
) -> Option<Stats> {
    let window = history.tail(windows.averages);
    let mut count = 0usize;
    let (mut alpha, mut beta, mut gamma, mut score) = (0.0, 0.0, 0.0, 0.0);
    for reading in window {
        count += 1;
        alpha += reading.alpha;
        beta += reading.beta;
        gamma += reading.gamma;
        score += reading.anxiety_score;
    }

    if count == 0 {
        return None;
    }

    let n = count as f64;
    let readings_above_threshold = history
        .tail(windows.recent)
        .filter(|r| r.anxiety_score > threshold)
        .count();

    Some(Stats {
        current_reading: *current,
        alpha_avg: alpha / n,
        beta_avg: beta / n,
        gamma_avg: gamma / n,
        anxiety_score_avg: score / n,
        threshold_exceeded: current.anxiety_score > threshold,
        readings_above_threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scored(timestamp: i64, anxiety_score: f64) -> Reading {
        Reading {
            timestamp,
            alpha: 10.0,
            beta: 15.0,
            gamma: 5.0,
            anxiety_score,
        }
    }

    fn history_of(readings: &[Reading]) -> History {
        let mut history = History::default();
        for reading in readings {
            history.push(*reading);
        }
        history
    }

    #[test]
    fn score_matches_baseline_reading() {
        // ratio 1.5 -> 35 + gamma 5 * 2 = 45
        assert_eq!(anxiety_score(10.0, 15.0, 5.0), 45.0);
    }

    #[test]
    fn score_is_clamped_and_rounded() {
        assert_eq!(anxiety_score(20.0, 1.0, 1.0), 0.0);
        assert_eq!(anxiety_score(1.0, 23.0, 8.0), 100.0);
        // (12.3 / 10 - 0.8) * 50 + 2.2 * 2 = 25.9
        assert_eq!(anxiety_score(10.0, 12.3, 2.2), 26.0);
    }

    #[test]
    fn history_evicts_oldest_past_capacity() {
        let mut history = History::with_capacity(100);
        for ts in 0..100 {
            assert!(history.push(scored(ts, 10.0)).is_none());
        }
        let evicted = history.push(scored(100, 10.0));
        assert_eq!(evicted.map(|r| r.timestamp), Some(0));
        assert_eq!(history.len(), 100);
        assert_eq!(history.iter().next().map(|r| r.timestamp), Some(1));
        assert_eq!(history.latest().map(|r| r.timestamp), Some(100));
    }

    #[test]
    fn averages_are_arithmetic_means() {
        let readings: Vec<Reading> = (0..7)
            .map(|i| Reading::new(i, 5.0 + i as f64, 12.0 + i as f64 * 0.5, 2.0 + i as f64 * 0.25))
            .collect();
        let history = history_of(&readings);
        let current = readings[readings.len() - 1];
        let stats = compute_stats(&history, &current, 70.0, StatsWindows::default()).unwrap();

        let n = readings.len() as f64;
        let alpha: f64 = readings.iter().map(|r| r.alpha).sum::<f64>() / n;
        let beta: f64 = readings.iter().map(|r| r.beta).sum::<f64>() / n;
        let gamma: f64 = readings.iter().map(|r| r.gamma).sum::<f64>() / n;
        let score: f64 = readings.iter().map(|r| r.anxiety_score).sum::<f64>() / n;
        assert!((stats.alpha_avg - alpha).abs() < 1e-9);
        assert!((stats.beta_avg - beta).abs() < 1e-9);
        assert!((stats.gamma_avg - gamma).abs() < 1e-9);
        assert!((stats.anxiety_score_avg - score).abs() < 1e-9);
    }

    #[test]
    fn averages_only_use_trailing_window() {
        // First 10 readings have alpha 100, the last 50 alpha 2.
        let mut readings = Vec::new();
        for ts in 0..10 {
            readings.push(Reading::new(ts, 100.0, 15.0, 5.0));
        }
        for ts in 10..60 {
            readings.push(Reading::new(ts, 2.0, 15.0, 5.0));
        }
        let history = history_of(&readings);
        let stats =
            compute_stats(&history, &readings[59], 70.0, StatsWindows::default()).unwrap();
        assert!((stats.alpha_avg - 2.0).abs() < 1e-9);
    }

    #[test]
    fn counts_recent_readings_above_threshold() {
        let scores = [50.0, 80.0, 90.0, 60.0, 95.0, 40.0, 85.0, 30.0, 92.0, 88.0];
        let readings: Vec<Reading> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| scored(i as i64, *s))
            .collect();
        let history = history_of(&readings);
        let stats =
            compute_stats(&history, &readings[9], 70.0, StatsWindows::default()).unwrap();
        assert_eq!(stats.readings_above_threshold, 6);
        assert!(stats.threshold_exceeded);
    }

    #[test]
    fn recent_count_ignores_older_readings() {
        let mut readings: Vec<Reading> = (0..5).map(|i| scored(i, 99.0)).collect();
        readings.extend((5..15).map(|i| scored(i, 10.0)));
        let history = history_of(&readings);
        let stats =
            compute_stats(&history, &readings[14], 70.0, StatsWindows::default()).unwrap();
        assert_eq!(stats.readings_above_threshold, 0);
    }

    #[test]
    fn exceedance_is_strict() {
        let reading = scored(0, 70.0);
        let history = history_of(&[reading]);
        let stats = compute_stats(&history, &reading, 70.0, StatsWindows::default()).unwrap();
        assert!(!stats.threshold_exceeded);
        assert_eq!(stats.readings_above_threshold, 0);
        assert_eq!(reading.level(70.0), AnxietyLevel::High);
    }

    #[test]
    fn empty_history_has_no_stats() {
        let history = History::default();
        assert!(compute_stats(&history, &scored(0, 10.0), 70.0, StatsWindows::default()).is_none());
    }

    #[test]
    fn gauge_bands() {
        assert_eq!(AnxietyLevel::classify(75.0, 70.0), AnxietyLevel::High);
        assert_eq!(AnxietyLevel::classify(56.0, 70.0), AnxietyLevel::Elevated);
        assert_eq!(AnxietyLevel::classify(42.0, 70.0), AnxietyLevel::Moderate);
        assert_eq!(AnxietyLevel::classify(41.9, 70.0), AnxietyLevel::Calm);
    }

    #[test]
    fn reading_serializes_camel_case() {
        let json = serde_json::to_value(Reading::new(1, 10.0, 15.0, 5.0)).unwrap();
        assert_eq!(json["anxietyScore"], 45.0);
    }

    proptest! {
        #[test]
        fn history_never_exceeds_capacity(count in 0usize..400, capacity in 1usize..150) {
            let mut history = History::with_capacity(capacity);
            for ts in 0..count {
                history.push(scored(ts as i64, 10.0));
                prop_assert!(history.len() <= capacity);
            }
            if count > 0 {
                prop_assert_eq!(history.latest().map(|r| r.timestamp), Some(count as i64 - 1));
            }
        }

        #[test]
        fn stats_are_pure(
            scores in proptest::collection::vec(0.0f64..=100.0, 1..120),
            threshold in 0.0f64..=100.0,
        ) {
            let readings: Vec<Reading> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| scored(i as i64, *s))
                .collect();
            let history = history_of(&readings);
            let current = *history.latest().unwrap();
            let first = compute_stats(&history, &current, threshold, StatsWindows::default());
            let second = compute_stats(&history, &current, threshold, StatsWindows::default());
            prop_assert_eq!(first, second);
        }
    }
}
