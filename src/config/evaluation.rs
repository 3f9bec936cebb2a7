use super::traits::ConfigSection;
use crate::engines::metrics::MetricKind;
use crate::error::KerndiscError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub metric: MetricKind,
    pub workers: usize,
    pub jitter: bool,
    pub jitter_mean: f64,
    pub jitter_sd: f64,
    /// Randomise the order candidates are handed to workers.
    pub shuffle: bool,
    pub seed: Option<u64>,
    pub max_optimizer_evaluations: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            metric: MetricKind::BayesianInformationCriterion,
            workers: 1,
            jitter: true,
            jitter_mean: 0.0,
            jitter_sd: 0.1,
            shuffle: false,
            seed: None,
            max_optimizer_evaluations: 200,
        }
    }
}

impl ConfigSection for EvaluationConfig {
    fn section_name() -> &'static str {
        "evaluation"
    }

    fn validate(&self) -> Result<(), KerndiscError> {
        if self.workers == 0 {
            return Err(KerndiscError::Configuration(
                "workers must be at least 1".to_string(),
            ));
        }
        if !self.jitter_mean.is_finite() || !self.jitter_sd.is_finite() || self.jitter_sd < 0.0 {
            return Err(KerndiscError::Configuration(
                "Jitter mean must be finite and jitter sd finite and non-negative".to_string(),
            ));
        }
        if self.max_optimizer_evaluations == 0 {
            return Err(KerndiscError::Configuration(
                "max_optimizer_evaluations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
