use super::evaluator::FitBackend;
use super::gp::{FitError, GpModel, LIKELIHOOD_VARIANCE};
use crate::engines::metrics::ScoringMetric;
use crate::error::{KerndiscError, Result};
use crate::kernels::{ast_to_text, kernel_to_ast, Kernel};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Score change caused by removing one summand from a fitted model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentImpact {
    pub component: String,
    pub impact: f64,
}

/// Rank the summands of a fitted sum kernel by how much the score moves
/// when each one is left out. Fitted parameters are reused, nothing is
/// re-optimised. Largest impact first.
pub fn rank_components(
    backend: &dyn FitBackend,
    model: &dyn GpModel,
    model_score: f64,
    metric: &dyn ScoringMetric,
) -> Result<Vec<ComponentImpact>> {
    let components = match model.kernel() {
        Kernel::Sum(children) if children.len() >= 2 => children,
        other => {
            return Err(KerndiscError::NotDecomposable(format!(
                "`{}` is not a sum of at least two components",
                ast_to_text(&kernel_to_ast(other))?
            )))
        }
    };

    let noise = model.read_values().get(LIKELIHOOD_VARIANCE).copied();
    let mut ranked = Vec::with_capacity(components.len());

    for i in 0..components.len() {
        let mut remaining: Vec<Kernel> = components
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, k)| k.clone())
            .collect();
        let reduced = if remaining.len() == 1 {
            remaining.remove(0)
        } else {
            Kernel::Sum(remaining)
        };

        let score = score_reduced(backend, model, reduced, noise, metric).unwrap_or_else(|e| {
            debug!("Leave-one-out fit failed, scoring as infinity: {}", e);
            f64::INFINITY
        });

        ranked.push(ComponentImpact {
            component: ast_to_text(&kernel_to_ast(&components[i]))?,
            impact: (model_score - score).abs(),
        });
    }

    ranked.sort_by(|a, b| {
        b.impact
            .partial_cmp(&a.impact)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(ranked)
}

fn score_reduced(
    backend: &dyn FitBackend,
    model: &dyn GpModel,
    reduced: Kernel,
    noise: Option<f64>,
    metric: &dyn ScoringMetric,
) -> std::result::Result<f64, FitError> {
    let mut reduced_model = backend.build(model.inputs(), model.targets(), reduced)?;
    if let Some(noise) = noise {
        let mut values = BTreeMap::new();
        values.insert(LIKELIHOOD_VARIANCE.to_string(), noise);
        reduced_model.assign(&values)?;
    }
    metric.score(reduced_model.as_ref())
}
