use super::traits::ConfigSection;
use crate::error::KerndiscError;
use crate::kernels::{KernelRegistry, DEFAULT_GRAMMAR_KERNELS};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GrammarKind {
    /// Rules applied to kernel trees.
    #[default]
    Duvenaud,
    /// Rules applied to expression strings, re-parsed after every step.
    DuvenaudText,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarConfig {
    pub grammar: GrammarKind,
    pub base_kernels: Vec<String>,
    pub base_kernels_to_exclude: Vec<String>,
    pub lax_product_with_constant: bool,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            grammar: GrammarKind::Duvenaud,
            base_kernels: DEFAULT_GRAMMAR_KERNELS.iter().map(|s| s.to_string()).collect(),
            base_kernels_to_exclude: Vec::new(),
            lax_product_with_constant: true,
        }
    }
}

impl ConfigSection for GrammarConfig {
    fn section_name() -> &'static str {
        "grammar"
    }

    fn validate(&self) -> Result<(), KerndiscError> {
        let registry = KernelRegistry::new();
        registry.resolve_all(&self.base_kernels)?;
        registry.resolve_all(&self.base_kernels_to_exclude)?;
        if self
            .base_kernels
            .iter()
            .all(|name| self.base_kernels_to_exclude.contains(name))
        {
            return Err(KerndiscError::Configuration(
                "Every base kernel is excluded".to_string(),
            ));
        }
        Ok(())
    }
}
