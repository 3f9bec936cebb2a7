use super::gp::{FitError, GpModel, GpRegression};
use super::optimizer::PatternSearch;
use crate::config::EvaluationConfig;
use crate::engines::metrics::ScoringMetric;
use crate::error::{KerndiscError, Result};
use crate::kernels::{ast_to_kernel, ast_to_text, Kernel};
use crate::types::KernelNode;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds and fits regression models for the evaluator.
pub trait FitBackend: Send + Sync {
    fn build(&self, x: &[f64], y: &[f64], kernel: Kernel) -> std::result::Result<Box<dyn GpModel>, FitError>;
    fn optimize(&self, model: &mut dyn GpModel) -> std::result::Result<(), FitError>;
}

/// Exact GP regression fitted by pattern search.
pub struct ExactGpBackend {
    optimizer: PatternSearch,
}

impl ExactGpBackend {
    pub fn new(max_evaluations: usize) -> Self {
        Self {
            optimizer: PatternSearch::new(max_evaluations),
        }
    }
}

impl Default for ExactGpBackend {
    fn default() -> Self {
        Self {
            optimizer: PatternSearch::default(),
        }
    }
}

impl FitBackend for ExactGpBackend {
    fn build(&self, x: &[f64], y: &[f64], kernel: Kernel) -> std::result::Result<Box<dyn GpModel>, FitError> {
        Ok(Box::new(GpRegression::new(x, y, kernel)?))
    }

    fn optimize(&self, model: &mut dyn GpModel) -> std::result::Result<(), FitError> {
        self.optimizer.minimize(model).map(|_| ())
    }
}

/// Outcome for one candidate. A failed fit has an infinite score and no parameters.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub ast: KernelNode,
    pub params: Option<BTreeMap<String, f64>>,
    pub score: f64,
}

struct Job {
    index: usize,
    kernel: Kernel,
    seed: u64,
}

pub struct Evaluator {
    backend: Arc<dyn FitBackend>,
    metric: Arc<dyn ScoringMetric>,
    jitter: Option<Normal<f64>>,
    shuffle: bool,
    pool: rayon::ThreadPool,
    rng: StdRng,
}

impl Evaluator {
    pub fn new(
        config: &EvaluationConfig,
        backend: Arc<dyn FitBackend>,
        metric: Arc<dyn ScoringMetric>,
    ) -> Result<Self> {
        let jitter = if config.jitter {
            Some(Normal::new(config.jitter_mean, config.jitter_sd).map_err(|e| {
                KerndiscError::Configuration(format!("Invalid jitter distribution: {}", e))
            })?)
        } else {
            None
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .build()
            .map_err(|e| KerndiscError::Configuration(format!("Failed to build worker pool: {}", e)))?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            backend,
            metric,
            jitter,
            shuffle: config.shuffle,
            pool,
            rng,
        })
    }

    pub fn metric_name(&self) -> &str {
        self.metric.name()
    }

    /// Fit and score every candidate. Results come back in input order.
    ///
    /// Fit failures become `f64::INFINITY`; an unregistered node kind fails
    /// the whole batch before anything is fitted.
    pub fn evaluate(&mut self, x: &[f64], y: &[f64], candidates: &[KernelNode]) -> Result<Vec<Evaluation>> {
        let mut jobs = candidates
            .iter()
            .enumerate()
            .map(|(index, ast)| {
                Ok(Job {
                    index,
                    kernel: ast_to_kernel(ast)?,
                    seed: self.rng.gen(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if self.shuffle {
            jobs.shuffle(&mut self.rng);
        }

        let backend = self.backend.as_ref();
        let metric = self.metric.as_ref();
        let jitter = self.jitter;

        let mut scored: Vec<(usize, f64, Option<BTreeMap<String, f64>>)> = self.pool.install(|| {
            jobs.into_par_iter()
                .map(|job| {
                    let (score, params) = fit_one(backend, metric, jitter, x, y, job.kernel, job.seed);
                    (job.index, score, params)
                })
                .collect()
        });
        scored.sort_by_key(|(index, _, _)| *index);

        let total = candidates.len();
        let evaluations = scored
            .into_iter()
            .zip(candidates)
            .enumerate()
            .map(|(n, ((_, score, params), ast))| {
                info!(
                    "({}/{}) {} score was {:.3} for {}",
                    n + 1,
                    total,
                    self.metric.name(),
                    score,
                    ast_to_text(ast).unwrap_or_else(|_| format!("{:?}", ast))
                );
                Evaluation {
                    ast: ast.clone(),
                    params,
                    score,
                }
            })
            .collect();

        Ok(evaluations)
    }
}

fn fit_one(
    backend: &dyn FitBackend,
    metric: &dyn ScoringMetric,
    jitter: Option<Normal<f64>>,
    x: &[f64],
    y: &[f64],
    kernel: Kernel,
    seed: u64,
) -> (f64, Option<BTreeMap<String, f64>>) {
    let fitted = (|| -> std::result::Result<(f64, BTreeMap<String, f64>), FitError> {
        let mut model = backend.build(x, y, kernel)?;
        if let Some(normal) = jitter {
            let mut rng = StdRng::seed_from_u64(seed);
            add_jitter(model.as_mut(), &normal, &mut rng)?;
        }
        backend.optimize(model.as_mut())?;
        let score = metric.score(model.as_ref())?;
        if !score.is_finite() {
            return Err(FitError::NonFinite);
        }
        Ok((score, model.read_values()))
    })();

    match fitted {
        Ok((score, params)) => (score, Some(params)),
        Err(e) => {
            debug!("Fit failed, scoring as infinity: {}", e);
            (f64::INFINITY, None)
        }
    }
}

/// Add independent normal noise to every parameter of `model`.
pub fn add_jitter<R: Rng>(
    model: &mut dyn GpModel,
    normal: &Normal<f64>,
    rng: &mut R,
) -> std::result::Result<(), FitError> {
    let jittered: BTreeMap<String, f64> = model
        .read_values()
        .into_iter()
        .map(|(name, value)| (name, value + normal.sample(&mut *rng)))
        .collect();
    model.assign(&jittered)
}
