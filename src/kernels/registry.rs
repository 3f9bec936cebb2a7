use crate::error::{KerndiscError, Result};
use crate::types::{BaseKernel, Combinator};
use std::borrow::Cow;
use std::collections::HashMap;

/// Number of operands a kernel kind takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Leaf,
    Variadic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub default: f64,
}

const fn param(name: &'static str) -> ParameterSpec {
    ParameterSpec { name, default: 1.0 }
}

/// Registry row: everything the crate needs to know about one kernel kind.
#[derive(Debug, Clone, Copy)]
pub struct KernelSpec {
    /// Token used in canonical text and grammar expressions.
    pub name: &'static str,
    /// Name shown by `pretty_print`.
    pub display_name: &'static str,
    pub arity: Arity,
    pub stationary: bool,
    pub parameters: &'static [ParameterSpec],
}

const VARIANCE: &[ParameterSpec] = &[param("variance")];
const STATIONARY: &[ParameterSpec] = &[param("variance"), param("lengthscales")];

const WHITE: KernelSpec = leaf("white", "White", true, VARIANCE);
const CONSTANT: KernelSpec = leaf("constant", "Constant", true, VARIANCE);
const LINEAR: KernelSpec = leaf("linear", "Linear", false, VARIANCE);
const POLYNOMIAL: KernelSpec = leaf(
    "polynomial",
    "Polynomial",
    false,
    &[param("variance"), param("offset")],
);
const RBF: KernelSpec = leaf("rbf", "RBF", true, STATIONARY);
const PERIODIC: KernelSpec = leaf(
    "periodic",
    "Periodic",
    true,
    &[param("variance"), param("lengthscales"), param("period")],
);
const COSINE: KernelSpec = leaf("cosine", "Cosine", true, STATIONARY);
const MATERN12: KernelSpec = leaf("matern12", "Matern12", true, STATIONARY);
const MATERN32: KernelSpec = leaf("matern32", "Matern32", true, STATIONARY);
const MATERN52: KernelSpec = leaf("matern52", "Matern52", true, STATIONARY);
const RATIONAL_QUADRATIC: KernelSpec = leaf(
    "rationalquadratic",
    "RationalQuadratic",
    true,
    &[param("variance"), param("lengthscales"), param("alpha")],
);
const ARC_COSINE: KernelSpec = leaf(
    "arccosine",
    "ArcCosine",
    false,
    &[param("variance"), param("weight_variances"), param("bias_variance")],
);
const EXPONENTIAL: KernelSpec = leaf("exponential", "Exponential", true, STATIONARY);

const SUM: KernelSpec = KernelSpec {
    name: "sum",
    display_name: "Sum",
    arity: Arity::Variadic,
    stationary: false,
    parameters: &[],
};
const PRODUCT: KernelSpec = KernelSpec {
    name: "product",
    display_name: "Product",
    arity: Arity::Variadic,
    stationary: false,
    parameters: &[],
};

const fn leaf(
    name: &'static str,
    display_name: &'static str,
    stationary: bool,
    parameters: &'static [ParameterSpec],
) -> KernelSpec {
    KernelSpec {
        name,
        display_name,
        arity: Arity::Leaf,
        stationary,
        parameters,
    }
}

/// Every registered base kernel, in registry order.
pub const BASE_KERNELS: &[BaseKernel] = &[
    BaseKernel::ArcCosine,
    BaseKernel::Constant,
    BaseKernel::Cosine,
    BaseKernel::Exponential,
    BaseKernel::Linear,
    BaseKernel::Matern12,
    BaseKernel::Matern32,
    BaseKernel::Matern52,
    BaseKernel::Periodic,
    BaseKernel::Polynomial { degree: 1 },
    BaseKernel::RationalQuadratic,
    BaseKernel::Rbf,
    BaseKernel::White,
];

/// Base kernels the Duvenaud grammar expands with unless configured otherwise.
pub const DEFAULT_GRAMMAR_KERNELS: &[&str] = &[
    "cosine",
    "linear",
    "matern12",
    "matern32",
    "matern52",
    "periodic",
    "rbf",
    "white",
    "rationalquadratic",
    "constant",
];

/// Registry row for a base kernel. Every base kernel kind is registered.
pub fn base_spec(kernel: BaseKernel) -> &'static KernelSpec {
    match kernel {
        BaseKernel::White => &WHITE,
        BaseKernel::Constant => &CONSTANT,
        BaseKernel::Linear => &LINEAR,
        BaseKernel::Polynomial { .. } => &POLYNOMIAL,
        BaseKernel::Rbf => &RBF,
        BaseKernel::Periodic => &PERIODIC,
        BaseKernel::Cosine => &COSINE,
        BaseKernel::Matern12 => &MATERN12,
        BaseKernel::Matern32 => &MATERN32,
        BaseKernel::Matern52 => &MATERN52,
        BaseKernel::RationalQuadratic => &RATIONAL_QUADRATIC,
        BaseKernel::ArcCosine => &ARC_COSINE,
        BaseKernel::Exponential => &EXPONENTIAL,
    }
}

/// Registry row for a combinator, `None` for the inactive changepoint/changewindow.
pub fn combinator_spec(combinator: Combinator) -> Option<&'static KernelSpec> {
    match combinator {
        Combinator::Sum => Some(&SUM),
        Combinator::Product => Some(&PRODUCT),
        Combinator::ChangePoint | Combinator::ChangeWindow => None,
    }
}

pub fn combinator_token(combinator: Combinator) -> &'static str {
    match combinator {
        Combinator::Sum => "sum",
        Combinator::Product => "product",
        Combinator::ChangePoint => "cp",
        Combinator::ChangeWindow => "cw",
    }
}

impl BaseKernel {
    /// Canonical token, e.g. `rbf` or `polynomial3`.
    pub fn name(&self) -> Cow<'static, str> {
        match self {
            BaseKernel::Polynomial { degree } if *degree != 1 => {
                Cow::Owned(format!("polynomial{}", degree))
            }
            other => Cow::Borrowed(base_spec(*other).name),
        }
    }

    pub fn spec(&self) -> &'static KernelSpec {
        base_spec(*self)
    }

    pub fn is_stationary(&self) -> bool {
        base_spec(*self).stationary
    }
}

/// Name-indexed view over the registered base kernels.
pub struct KernelRegistry {
    kernels: HashMap<&'static str, BaseKernel>,
}

impl KernelRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            kernels: HashMap::new(),
        };
        registry.register_base_kernels();
        registry
    }

    fn register_base_kernels(&mut self) {
        for kernel in BASE_KERNELS {
            self.kernels.insert(base_spec(*kernel).name, *kernel);
        }
    }

    /// Resolve a token such as `rbf`, `polynomial` or `polynomial2`.
    pub fn get_base(&self, name: &str) -> Option<BaseKernel> {
        if let Some(kernel) = self.kernels.get(name) {
            return Some(*kernel);
        }
        let degree = name.strip_prefix(POLYNOMIAL.name)?;
        match degree.parse::<u32>() {
            Ok(degree) if degree >= 1 => Some(BaseKernel::Polynomial { degree }),
            _ => None,
        }
    }

    pub fn require_base(&self, name: &str) -> Result<BaseKernel> {
        self.get_base(name).ok_or_else(|| {
            KerndiscError::Configuration(format!("Unknown base kernel: {}", name))
        })
    }

    /// Resolve a list of names, failing on the first unknown one.
    pub fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<BaseKernel>> {
        names.iter().map(|name| self.require_base(name.as_ref())).collect()
    }
}

impl Default for KernelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_base_retrieval() {
        let registry = KernelRegistry::new();
        assert_eq!(registry.get_base("rbf"), Some(BaseKernel::Rbf));
        assert_eq!(registry.get_base("white"), Some(BaseKernel::White));
        assert_eq!(
            registry.get_base("rationalquadratic"),
            Some(BaseKernel::RationalQuadratic)
        );
    }

    #[test]
    fn test_polynomial_degree_tokens() {
        let registry = KernelRegistry::new();
        assert_eq!(
            registry.get_base("polynomial"),
            Some(BaseKernel::Polynomial { degree: 1 })
        );
        assert_eq!(
            registry.get_base("polynomial3"),
            Some(BaseKernel::Polynomial { degree: 3 })
        );
        assert_eq!(registry.get_base("polynomial0"), None);
        assert_eq!(BaseKernel::Polynomial { degree: 3 }.name(), "polynomial3");
        assert_eq!(BaseKernel::Polynomial { degree: 1 }.name(), "polynomial");
    }

    #[test]
    fn test_unknown_kernel_not_found() {
        let registry = KernelRegistry::new();
        assert!(registry.get_base("changepoint").is_none());
        assert!(registry.require_base("nonexistent").is_err());
    }

    #[test]
    fn test_changepoint_not_registered() {
        assert!(combinator_spec(Combinator::ChangePoint).is_none());
        assert!(combinator_spec(Combinator::ChangeWindow).is_none());
        assert!(combinator_spec(Combinator::Sum).is_some());
    }

    #[test]
    fn test_default_grammar_kernels_are_registered() {
        let registry = KernelRegistry::new();
        let kernels = registry.resolve_all(DEFAULT_GRAMMAR_KERNELS).unwrap();
        assert_eq!(kernels.len(), 10);
    }

    #[test]
    fn test_stationarity_flags() {
        assert!(!BaseKernel::Linear.is_stationary());
        assert!(!BaseKernel::Polynomial { degree: 2 }.is_stationary());
        assert!(BaseKernel::Rbf.is_stationary());
        assert!(BaseKernel::Periodic.is_stationary());
    }
}
