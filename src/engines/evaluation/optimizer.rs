use super::gp::{FitError, GpModel, MIN_PARAMETER};
use std::collections::BTreeMap;

const MAX_LOG_PARAMETER: f64 = 13.8;

/// Derivative-free compass search over log-parameters, maximising the
/// model's log likelihood.
#[derive(Debug, Clone)]
pub struct PatternSearch {
    pub max_evaluations: usize,
    pub initial_step: f64,
    pub min_step: f64,
}

impl PatternSearch {
    pub fn new(max_evaluations: usize) -> Self {
        Self {
            max_evaluations,
            initial_step: 1.0,
            min_step: 1e-3,
        }
    }

    /// Fit `model` in place and return its final negative log likelihood.
    ///
    /// Only a failure at the starting point is an error; trial points that
    /// fail to decompose are treated as worse than the current point.
    pub fn minimize(&self, model: &mut dyn GpModel) -> Result<f64, FitError> {
        let names: Vec<String> = model.read_values().into_keys().collect();
        let mut point: Vec<f64> = model
            .read_values()
            .into_values()
            .map(|value| value.max(MIN_PARAMETER).ln().min(MAX_LOG_PARAMETER))
            .collect();

        let mut best = objective(model, &names, &point)?;
        let mut evaluations = 1;
        let mut step = self.initial_step;

        while step >= self.min_step && evaluations < self.max_evaluations {
            let mut improved = false;

            'coordinates: for i in 0..point.len() {
                for direction in [1.0, -1.0] {
                    if evaluations >= self.max_evaluations {
                        break 'coordinates;
                    }
                    let mut trial = point.clone();
                    trial[i] = (trial[i] + direction * step)
                        .clamp(MIN_PARAMETER.ln(), MAX_LOG_PARAMETER);
                    evaluations += 1;

                    if let Ok(value) = objective(model, &names, &trial) {
                        if value < best {
                            best = value;
                            point = trial;
                            improved = true;
                            break;
                        }
                    }
                }
            }

            if !improved {
                step *= 0.5;
            }
        }

        apply(model, &names, &point)?;
        Ok(best)
    }
}

impl Default for PatternSearch {
    fn default() -> Self {
        Self::new(200)
    }
}

fn apply(model: &mut dyn GpModel, names: &[String], point: &[f64]) -> Result<(), FitError> {
    let values: BTreeMap<String, f64> = names
        .iter()
        .cloned()
        .zip(point.iter().map(|log_value| log_value.exp()))
        .collect();
    model.assign(&values)
}

fn objective(model: &mut dyn GpModel, names: &[String], point: &[f64]) -> Result<f64, FitError> {
    apply(model, names, point)?;
    let nll = -model.log_likelihood()?;
    if nll.is_finite() {
        Ok(nll)
    } else {
        Err(FitError::NonFinite)
    }
}
