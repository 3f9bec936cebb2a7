use super::early_stopping::EarlyStopping;
use super::table::ScoredKernelTable;
use crate::config::{DiscoveryConfig, SearchConfig};
use crate::engines::evaluation::{Evaluator, FitBackend};
use crate::engines::expansion::{simplify, Candidate, Grammar};
use crate::engines::metrics::ScoringMetric;
use crate::error::Result;
use crate::kernels::{ast_to_text, KernelRegistry};
use crate::types::{BaseKernel, DiscoveryResult, KernelNode, ScoredKernel, TerminationReason};
use log::{debug, info};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub trait ProgressCallback: Send {
    fn on_depth_start(&mut self, depth: usize, frontier: &[String]);
    fn on_depth_complete(&mut self, depth: usize, best_score: f64, explored: usize);
    fn on_kernel_evaluated(&mut self, key: &str, score: f64, current: usize, total: usize);
}

/// Cooperative stop signal, checked before every depth.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

struct NewKernel {
    key: String,
    ast: KernelNode,
    expression: Option<String>,
}

/// Greedy depth-bounded search over kernel structures.
pub struct KernelSearch {
    config: SearchConfig,
    grammar: Grammar,
    evaluator: Evaluator,
    start_kernel: BaseKernel,
    cancellation: CancellationToken,
}

impl KernelSearch {
    pub fn new(
        config: &DiscoveryConfig,
        backend: Arc<dyn FitBackend>,
        metric: Arc<dyn ScoringMetric>,
    ) -> Result<Self> {
        config.validate()?;
        let start_kernel = KernelRegistry::new().require_base(&config.search.start_kernel)?;
        Ok(Self {
            config: config.search.clone(),
            grammar: Grammar::from_config(&config.grammar)?,
            evaluator: Evaluator::new(&config.evaluation, backend, metric)?,
            start_kernel,
            cancellation: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn run(&mut self, x: &[f64], y: &[f64], callback: &mut dyn ProgressCallback) -> Result<DiscoveryResult> {
        let started_at = chrono::Utc::now().to_rfc3339();
        let mut table = ScoredKernelTable::new();
        let mut progression: Vec<f64> = Vec::new();

        let seed = self.grammar.seed(self.start_kernel);
        let mut seed_entry = ScoredKernel::unscored(ast_to_text(&seed.ast)?, seed.ast, 0);
        seed_entry.expression = seed.expression;
        table.insert(seed_entry);

        info!(
            "Starting discovery: depth {}, {} kernel(s) per depth, metric {}",
            self.config.search_depth,
            self.config.kernels_per_depth,
            self.evaluator.metric_name()
        );

        let mut termination = None;

        for depth in 0..self.config.search_depth {
            if self.cancellation.is_cancelled() {
                info!("Discovery cancelled before depth {}", depth);
                termination = Some(TerminationReason::Cancelled { depth });
                break;
            }

            let frontier: Vec<ScoredKernel> = table
                .n_best(self.config.kernels_per_depth)
                .into_iter()
                .cloned()
                .collect();
            let frontier_keys: Vec<String> = frontier.iter().map(|e| e.key.clone()).collect();
            progression.push(table.best_score());

            info!(
                "Depth {}: expanding {:?} with scores {:?}",
                depth,
                frontier_keys,
                frontier.iter().map(|e| e.score).collect::<Vec<_>>()
            );
            callback.on_depth_start(depth, &frontier_keys);

            if let Some(threshold) = self.config.early_stopping_min_rel_delta {
                if depth >= 2 {
                    if let Some(improvement) = EarlyStopping::new(threshold).check(&progression) {
                        let reason = TerminationReason::EarlyStopping {
                            depth,
                            improvement,
                            threshold,
                        };
                        info!("Depth {}: {}", depth, reason);
                        termination = Some(reason);
                        break;
                    }
                }
            }

            let mut candidates: Vec<Candidate> = Vec::new();
            for entry in &frontier {
                candidates.extend(self.grammar.expand(entry)?);
            }
            if depth == 0 && self.config.full_initial_base_kernel_expansion {
                candidates.extend(self.grammar.expand_base_kernels()?);
            }

            let produced = candidates.len();
            let new_kernels = deduplicate(candidates, &table)?;
            debug!(
                "Depth {}: {} candidates, {} new after deduplication",
                depth,
                produced,
                new_kernels.len()
            );

            if new_kernels.is_empty() {
                let reason = TerminationReason::EmptySearchSpace { depth };
                info!("Depth {}: {}", depth, reason);
                termination = Some(reason);
                break;
            }

            let asts: Vec<KernelNode> = new_kernels.iter().map(|k| k.ast.clone()).collect();
            for kernel in new_kernels.iter() {
                let mut entry = ScoredKernel::unscored(kernel.key.clone(), kernel.ast.clone(), depth);
                entry.expression = kernel.expression.clone();
                table.insert(entry);
            }

            let evaluations = self.evaluator.evaluate(x, y, &asts)?;
            let total = evaluations.len();
            for (n, (kernel, evaluation)) in new_kernels.iter().zip(evaluations).enumerate() {
                callback.on_kernel_evaluated(&kernel.key, evaluation.score, n + 1, total);
                table.record_score(&kernel.key, evaluation.score, evaluation.params);
            }

            callback.on_depth_complete(depth, table.best_score(), table.len());
        }

        let termination_reason = termination.unwrap_or(TerminationReason::MaxDepthReached {
            depth: self.config.search_depth as i64 - 1,
        });
        info!("Discovery finished: {}", termination_reason);

        Ok(DiscoveryResult {
            kernels: table
                .n_best(self.config.find_n_best)
                .into_iter()
                .cloned()
                .collect(),
            highscore_progression: progression,
            termination_reason,
            explored: table.len(),
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

/// Simplify every candidate and keep the first occurrence of each key that
/// is not already in the table.
fn deduplicate(candidates: Vec<Candidate>, table: &ScoredKernelTable) -> Result<Vec<NewKernel>> {
    let mut seen = HashSet::new();
    let mut new_kernels = Vec::new();
    for candidate in candidates {
        let ast = simplify(&candidate.ast);
        let key = ast_to_text(&ast)?;
        if table.contains(&key) || !seen.insert(key.clone()) {
            continue;
        }
        new_kernels.push(NewKernel {
            key,
            ast,
            expression: candidate.expression,
        });
    }
    Ok(new_kernels)
}
