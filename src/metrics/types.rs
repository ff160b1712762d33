use serde::{Deserialize, Serialize};

/// One simulated EEG sample. `anxiety_score` is always derived from the band
/// powers of the same reading, see [`Reading::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub timestamp: i64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub anxiety_score: f64,
}

impl Reading {
    pub fn new(timestamp: i64, alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            timestamp,
            alpha,
            beta,
            gamma,
            anxiety_score: super::anxiety_score(alpha, beta, gamma),
        }
    }

    pub fn level(&self, threshold: f64) -> AnxietyLevel {
        AnxietyLevel::classify(self.anxiety_score, threshold)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub current_reading: Reading,
    pub alpha_avg: f64,
    pub beta_avg: f64,
    pub gamma_avg: f64,
    pub anxiety_score_avg: f64,
    pub threshold_exceeded: bool,
    pub readings_above_threshold: usize,
}

/// Gauge banding of a score relative to the threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum AnxietyLevel {
    Calm,
    Moderate,
    Elevated,
    High,
}

impl AnxietyLevel {
    /// Bands are inclusive at the lower edge (`score >= threshold` is `High`),
    /// unlike [`Stats::threshold_exceeded`] which is strict.
    pub fn classify(score: f64, threshold: f64) -> Self {
        if score >= threshold {
            AnxietyLevel::High
        } else if score >= threshold * 0.8 {
            AnxietyLevel::Elevated
        } else if score >= threshold * 0.6 {
            AnxietyLevel::Moderate
        } else {
            AnxietyLevel::Calm
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnxietyLevel::Calm => "calm",
            AnxietyLevel::Moderate => "moderate",
            AnxietyLevel::Elevated => "elevated",
            AnxietyLevel::High => "high",
        }
    }
}
