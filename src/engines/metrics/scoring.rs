// src/engines/metrics/scoring.rs
use crate::engines::evaluation::gp::{FitError, GpModel};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maps a fitted model to a score. Lower is better.
pub trait ScoringMetric: Send + Sync {
    fn name(&self) -> &str;
    fn score(&self, model: &dyn GpModel) -> Result<f64, FitError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    NegativeLogLikelihood,
    #[default]
    BayesianInformationCriterion,
    BayesianInformationCriterionDuvenaud,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::NegativeLogLikelihood => "negative_log_likelihood",
            MetricKind::BayesianInformationCriterion => "bayesian_information_criterion",
            MetricKind::BayesianInformationCriterionDuvenaud => {
                "bayesian_information_criterion_duvenaud"
            }
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ScoringMetric for MetricKind {
    fn name(&self) -> &str {
        self.as_str()
    }

    fn score(&self, model: &dyn GpModel) -> Result<f64, FitError> {
        let nll = -model.log_likelihood()?;
        let log_n = (model.num_data() as f64).ln();

        let score = match self {
            MetricKind::NegativeLogLikelihood => nll,
            // BIC = 2 * NLL + |theta| * ln(n)
            MetricKind::BayesianInformationCriterion => {
                2.0 * nll + model.parameter_count() as f64 * log_n
            }
            // Only one variance per product matters, and the likelihood
            // variance is not counted.
            MetricKind::BayesianInformationCriterionDuvenaud => {
                let effective = model
                    .parameter_count()
                    .saturating_sub(1)
                    .saturating_sub(model.kernel().redundant_product_variances());
                2.0 * nll + effective as f64 * log_n
            }
        };

        if score.is_finite() {
            Ok(score)
        } else {
            Err(FitError::NonFinite)
        }
    }
}
