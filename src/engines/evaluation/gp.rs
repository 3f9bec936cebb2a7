use crate::kernels::Kernel;
use std::collections::BTreeMap;
use thiserror::Error;

const LOG_2PI: f64 = 1.837_877_066_409_345_3;

/// Smallest value any positive parameter may take.
pub const MIN_PARAMETER: f64 = 1e-6;

pub const LIKELIHOOD_VARIANCE: &str = "likelihood/variance";

/// Numerical failure while building, fitting or scoring one model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("no data to condition on")]
    EmptyData,

    #[error("covariance is not positive definite")]
    NotPositiveDefinite,

    #[error("non-finite likelihood or score")]
    NonFinite,

    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),
}

/// A regression model conditioned on data, with readable and assignable parameters.
pub trait GpModel: Send {
    fn log_likelihood(&self) -> Result<f64, FitError>;

    /// Parameter path to value, e.g. `kernel/0/rbf/lengthscales`.
    fn read_values(&self) -> BTreeMap<String, f64>;

    /// Overwrite the named parameters. Values are floored at `MIN_PARAMETER`.
    fn assign(&mut self, values: &BTreeMap<String, f64>) -> Result<(), FitError>;

    fn num_data(&self) -> usize;

    fn kernel(&self) -> &Kernel;

    fn inputs(&self) -> &[f64];

    fn targets(&self) -> &[f64];

    fn parameter_count(&self) -> usize {
        self.read_values().len()
    }
}

/// Exact GP regression with a Gaussian likelihood.
///
/// Each model owns copies of its data and kernel, so no buffers are shared
/// between candidates.
#[derive(Debug, Clone)]
pub struct GpRegression {
    x: Vec<f64>,
    y: Vec<f64>,
    kernel: Kernel,
    noise_variance: f64,
}

impl GpRegression {
    pub fn new(x: &[f64], y: &[f64], kernel: Kernel) -> Result<Self, FitError> {
        if x.is_empty() || y.is_empty() {
            return Err(FitError::EmptyData);
        }
        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            kernel,
            noise_variance: 1.0,
        })
    }

    /// Negative log marginal likelihood of `y` under the model.
    pub fn negative_log_likelihood(&self) -> Result<f64, FitError> {
        let n = self.x.len();
        if n == 0 {
            return Err(FitError::EmptyData);
        }
        let mut cov = self.kernel.gram(&self.x);
        for i in 0..n {
            cov[i * n + i] += self.noise_variance;
        }
        nll_from_cov(&mut cov, &self.y, n)
    }
}

impl GpModel for GpRegression {
    fn log_likelihood(&self) -> Result<f64, FitError> {
        self.negative_log_likelihood().map(|nll| -nll)
    }

    fn read_values(&self) -> BTreeMap<String, f64> {
        let mut values: BTreeMap<String, f64> = self.kernel.parameters().into_iter().collect();
        values.insert(LIKELIHOOD_VARIANCE.to_string(), self.noise_variance);
        values
    }

    fn assign(&mut self, values: &BTreeMap<String, f64>) -> Result<(), FitError> {
        let known = self.read_values();
        if let Some(unknown) = values.keys().find(|name| !known.contains_key(*name)) {
            return Err(FitError::UnknownParameter(unknown.clone()));
        }

        self.kernel.for_each_parameter_mut(|name, value| {
            if let Some(new_value) = values.get(name) {
                *value = new_value.max(MIN_PARAMETER);
            }
        });
        if let Some(noise) = values.get(LIKELIHOOD_VARIANCE) {
            self.noise_variance = noise.max(MIN_PARAMETER);
        }
        Ok(())
    }

    fn num_data(&self) -> usize {
        self.x.len()
    }

    fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    fn inputs(&self) -> &[f64] {
        &self.x
    }

    fn targets(&self) -> &[f64] {
        &self.y
    }
}

fn nll_from_cov(cov: &mut [f64], y: &[f64], n: usize) -> Result<f64, FitError> {
    cholesky_in_place(cov, n)?;

    let mut z = vec![0.0; n];
    for i in 0..n {
        let mut sum = y[i];
        for k in 0..i {
            sum -= cov[i * n + k] * z[k];
        }
        z[i] = sum / cov[i * n + i];
    }

    let mut alpha = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in i + 1..n {
            sum -= cov[k * n + i] * alpha[k];
        }
        alpha[i] = sum / cov[i * n + i];
    }

    let quad = y.iter().zip(&alpha).map(|(lhs, rhs)| lhs * rhs).sum::<f64>();
    let log_det = (0..n).map(|i| cov[i * n + i].ln()).sum::<f64>() * 2.0;
    let nll = 0.5 * (quad + log_det + n as f64 * LOG_2PI);

    if !nll.is_finite() {
        return Err(FitError::NonFinite);
    }
    Ok(nll)
}

fn cholesky_in_place(matrix: &mut [f64], n: usize) -> Result<(), FitError> {
    for i in 0..n {
        for j in 0..=i {
            let mut sum = matrix[i * n + j];
            for k in 0..j {
                sum -= matrix[i * n + k] * matrix[j * n + k];
            }

            if i == j {
                if !sum.is_finite() || sum <= 0.0 {
                    return Err(FitError::NotPositiveDefinite);
                }
                matrix[i * n + i] = sum.sqrt();
            } else {
                matrix[i * n + j] = sum / matrix[j * n + j];
            }
        }

        for j in i + 1..n {
            matrix[i * n + j] = 0.0;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BaseKernel;

    #[test]
    fn test_white_noise_likelihood_matches_closed_form() {
        // White kernel (variance 1) plus unit noise: covariance 2I.
        let y = [1.0, -1.0, 0.5];
        let model = GpRegression::new(&[0.0, 1.0, 2.0], &y, Kernel::base(BaseKernel::White)).unwrap();
        let quad: f64 = y.iter().map(|v| v * v / 2.0).sum();
        let expected = 0.5 * (quad + 3.0 * 2f64.ln() + 3.0 * LOG_2PI);
        let nll = model.negative_log_likelihood().unwrap();
        assert!((nll - expected).abs() < 1e-10);
    }

    #[test]
    fn test_empty_data_rejected() {
        let result = GpRegression::new(&[], &[], Kernel::base(BaseKernel::Rbf));
        assert_eq!(result.unwrap_err(), FitError::EmptyData);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let mut matrix = vec![1.0, 2.0, 2.0, 1.0];
        assert_eq!(cholesky_in_place(&mut matrix, 2), Err(FitError::NotPositiveDefinite));
    }

    #[test]
    fn test_read_and_assign() {
        let kernel = Kernel::Sum(vec![Kernel::base(BaseKernel::Rbf), Kernel::base(BaseKernel::Linear)]);
        let mut model = GpRegression::new(&[0.0, 1.0], &[0.0, 1.0], kernel).unwrap();
        let values = model.read_values();
        assert_eq!(values.len(), 4);
        assert!(values.contains_key(LIKELIHOOD_VARIANCE));

        let mut update = BTreeMap::new();
        update.insert("kernel/0/rbf/lengthscales".to_string(), 2.5);
        update.insert(LIKELIHOOD_VARIANCE.to_string(), -3.0);
        model.assign(&update).unwrap();

        let values = model.read_values();
        assert_eq!(values["kernel/0/rbf/lengthscales"], 2.5);
        assert_eq!(values[LIKELIHOOD_VARIANCE], MIN_PARAMETER);
    }

    #[test]
    fn test_assign_unknown_parameter() {
        let mut model =
            GpRegression::new(&[0.0], &[0.0], Kernel::base(BaseKernel::White)).unwrap();
        let mut update = BTreeMap::new();
        update.insert("kernel/periodic/period".to_string(), 1.0);
        assert!(matches!(model.assign(&update), Err(FitError::UnknownParameter(_))));
    }
}
