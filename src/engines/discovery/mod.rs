pub mod early_stopping;
pub mod progress;
pub mod search;
pub mod table;

pub use early_stopping::{relative_improvement, EarlyStopping};
pub use progress::{ChannelProgressCallback, LogProgressCallback, ProgressMessage};
pub use search::{CancellationToken, KernelSearch, ProgressCallback};
pub use table::ScoredKernelTable;

use crate::config::DiscoveryConfig;
use crate::data::preprocess;
use crate::engines::evaluation::{ExactGpBackend, FitBackend};
use crate::error::Result;
use crate::types::DiscoveryResult;
use std::sync::Arc;

/// Discover kernel structure in a univariate series with the exact GP backend.
pub fn discover(x: &[f64], y: &[f64], config: &DiscoveryConfig) -> Result<DiscoveryResult> {
    let backend = Arc::new(ExactGpBackend::new(config.evaluation.max_optimizer_evaluations));
    discover_with(x, y, config, backend, &mut LogProgressCallback)
}

/// Preprocess the series and run a search with a caller-supplied backend.
pub fn discover_with(
    x: &[f64],
    y: &[f64],
    config: &DiscoveryConfig,
    backend: Arc<dyn FitBackend>,
    callback: &mut dyn ProgressCallback,
) -> Result<DiscoveryResult> {
    config.validate()?;
    let (x, y) = preprocess(x, y, config.preprocessing.rescale_x_to_upper_bound)?;
    let metric = Arc::new(config.evaluation.metric);
    KernelSearch::new(config, backend, metric)?.run(&x, &y, callback)
}
