use crate::kernels::registry::base_spec;
use crate::types::BaseKernel;
use std::f64::consts::PI;

const SQRT3: f64 = 1.732_050_807_568_877_2;
const SQRT5: f64 = 2.236_067_977_499_79;

/// An instantiated covariance function with concrete parameter values.
#[derive(Debug, Clone, PartialEq)]
pub enum Kernel {
    /// Parameters are stored in registry order for the kernel kind.
    Base { kernel: BaseKernel, params: Vec<f64> },
    Sum(Vec<Kernel>),
    Product(Vec<Kernel>),
}

impl Kernel {
    /// Base kernel with the registry's default (unit) parameters.
    pub fn base(kernel: BaseKernel) -> Self {
        let params = base_spec(kernel).parameters.iter().map(|p| p.default).collect();
        Kernel::Base { kernel, params }
    }

    pub fn covariance(&self, a: f64, b: f64, same_point: bool) -> f64 {
        match self {
            Kernel::Base { kernel, params } => base_covariance(*kernel, params, a, b, same_point),
            Kernel::Sum(children) => children
                .iter()
                .map(|k| k.covariance(a, b, same_point))
                .sum(),
            Kernel::Product(children) => children
                .iter()
                .map(|k| k.covariance(a, b, same_point))
                .product(),
        }
    }

    /// Row-major `n x n` covariance matrix over `x`.
    pub fn gram(&self, x: &[f64]) -> Vec<f64> {
        let n = x.len();
        let mut gram = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..=i {
                let cov = self.covariance(x[i], x[j], i == j);
                gram[i * n + j] = cov;
                gram[j * n + i] = cov;
            }
        }
        gram
    }

    /// All parameters as `(path, value)` pairs, e.g. `kernel/0/rbf/lengthscales`.
    pub fn parameters(&self) -> Vec<(String, f64)> {
        let mut out = Vec::new();
        self.collect_parameters("kernel", &mut out);
        out
    }

    fn collect_parameters(&self, prefix: &str, out: &mut Vec<(String, f64)>) {
        match self {
            Kernel::Base { kernel, params } => {
                let spec = base_spec(*kernel);
                for (p, value) in spec.parameters.iter().zip(params) {
                    out.push((format!("{}/{}/{}", prefix, spec.name, p.name), *value));
                }
            }
            Kernel::Sum(children) | Kernel::Product(children) => {
                for (i, child) in children.iter().enumerate() {
                    child.collect_parameters(&format!("{}/{}", prefix, i), out);
                }
            }
        }
    }

    /// Visit every parameter mutably together with its path.
    pub fn for_each_parameter_mut<F: FnMut(&str, &mut f64)>(&mut self, mut f: F) {
        self.visit_mut("kernel", &mut f);
    }

    fn visit_mut<F: FnMut(&str, &mut f64)>(&mut self, prefix: &str, f: &mut F) {
        match self {
            Kernel::Base { kernel, params } => {
                let spec = base_spec(*kernel);
                for (p, value) in spec.parameters.iter().zip(params.iter_mut()) {
                    f(&format!("{}/{}/{}", prefix, spec.name, p.name), value);
                }
            }
            Kernel::Sum(children) | Kernel::Product(children) => {
                for (i, child) in children.iter_mut().enumerate() {
                    child.visit_mut(&format!("{}/{}", prefix, i), f);
                }
            }
        }
    }

    pub fn parameter_count(&self) -> usize {
        match self {
            Kernel::Base { params, .. } => params.len(),
            Kernel::Sum(children) | Kernel::Product(children) => {
                children.iter().map(|k| k.parameter_count()).sum()
            }
        }
    }

    /// Sum of `factors - 1` over every product in the kernel.
    pub fn redundant_product_variances(&self) -> usize {
        match self {
            Kernel::Base { .. } => 0,
            Kernel::Sum(children) => children.iter().map(|k| k.redundant_product_variances()).sum(),
            Kernel::Product(children) => {
                children.len().saturating_sub(1)
                    + children
                        .iter()
                        .map(|k| k.redundant_product_variances())
                        .sum::<usize>()
            }
        }
    }
}

fn base_covariance(kernel: BaseKernel, params: &[f64], a: f64, b: f64, same_point: bool) -> f64 {
    let variance = params.first().copied().unwrap_or(1.0);
    let lengthscale = || params.get(1).copied().unwrap_or(1.0);
    let scaled = || (a - b).abs() / lengthscale();

    match kernel {
        BaseKernel::White => {
            if same_point {
                variance
            } else {
                0.0
            }
        }
        BaseKernel::Constant => variance,
        BaseKernel::Linear => variance * a * b,
        BaseKernel::Polynomial { degree } => {
            let offset = params.get(1).copied().unwrap_or(1.0);
            (variance * a * b + offset).powi(degree as i32)
        }
        BaseKernel::Rbf => {
            let r = scaled();
            variance * (-0.5 * r * r).exp()
        }
        BaseKernel::Periodic => {
            let period = params.get(2).copied().unwrap_or(1.0);
            let s = (PI * (a - b).abs() / period).sin() / lengthscale();
            variance * (-0.5 * s * s).exp()
        }
        BaseKernel::Cosine => variance * scaled().cos(),
        BaseKernel::Matern12 => variance * (-scaled()).exp(),
        BaseKernel::Matern32 => {
            let z = SQRT3 * scaled();
            variance * (1.0 + z) * (-z).exp()
        }
        BaseKernel::Matern52 => {
            let r = scaled();
            let z = SQRT5 * r;
            variance * (1.0 + z + 5.0 / 3.0 * r * r) * (-z).exp()
        }
        BaseKernel::RationalQuadratic => {
            let r = scaled();
            let alpha = params.get(2).copied().unwrap_or(1.0);
            variance * (1.0 + r * r / (2.0 * alpha)).powf(-alpha)
        }
        BaseKernel::Exponential => variance * (-0.5 * scaled()).exp(),
        BaseKernel::ArcCosine => {
            let weight = params.get(1).copied().unwrap_or(1.0);
            let bias = params.get(2).copied().unwrap_or(1.0);
            let norm = ((weight * a * a + bias) * (weight * b * b + bias)).sqrt();
            let cos_theta = if norm > 0.0 {
                ((weight * a * b + bias) / norm).clamp(-1.0, 1.0)
            } else {
                1.0
            };
            variance * (PI - cos_theta.acos()) / PI
        }
    }
}
