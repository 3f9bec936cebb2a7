use super::traits::ConfigSection;
use crate::error::KerndiscError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of expansion rounds. `0` returns the start kernel unexpanded.
    pub search_depth: usize,
    /// Frontier size: best entries expanded at every depth.
    pub kernels_per_depth: usize,
    pub find_n_best: usize,
    /// Also expand every base kernel at depth 0.
    pub full_initial_base_kernel_expansion: bool,
    /// Stop once the relative improvement between depths drops below this.
    pub early_stopping_min_rel_delta: Option<f64>,
    pub start_kernel: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            search_depth: 10,
            kernels_per_depth: 1,
            find_n_best: 1,
            full_initial_base_kernel_expansion: false,
            early_stopping_min_rel_delta: None,
            start_kernel: "white".to_string(),
        }
    }
}

impl ConfigSection for SearchConfig {
    fn section_name() -> &'static str {
        "search"
    }

    fn validate(&self) -> Result<(), KerndiscError> {
        if self.kernels_per_depth == 0 {
            return Err(KerndiscError::Configuration(
                "kernels_per_depth must be at least 1".to_string(),
            ));
        }
        if self.find_n_best == 0 {
            return Err(KerndiscError::Configuration(
                "find_n_best must be at least 1".to_string(),
            ));
        }
        if let Some(delta) = self.early_stopping_min_rel_delta {
            if !delta.is_finite() {
                return Err(KerndiscError::Configuration(
                    "early_stopping_min_rel_delta must be finite".to_string(),
                ));
            }
        }
        Ok(())
    }
}
