use super::traits::ConfigSection;
use crate::error::KerndiscError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Rescale `x` onto `[0, bound]` before searching.
    pub rescale_x_to_upper_bound: Option<f64>,
}

impl ConfigSection for PreprocessingConfig {
    fn section_name() -> &'static str {
        "preprocessing"
    }

    fn validate(&self) -> Result<(), KerndiscError> {
        match self.rescale_x_to_upper_bound {
            Some(bound) if !(bound.is_finite() && bound > 0.0) => Err(KerndiscError::InvalidBound(
                format!("upper bound must be positive, got {}", bound),
            )),
            _ => Ok(()),
        }
    }
}
