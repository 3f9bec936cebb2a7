use super::{
    evaluation::EvaluationConfig, grammar::GrammarConfig, preprocessing::PreprocessingConfig,
    search::SearchConfig, traits::ConfigSection,
};
use crate::error::KerndiscError;
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

pub const ENV_PREFIX: &str = "KERNDISC";

/// Everything a discovery run is configured with.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub search: SearchConfig,
    pub grammar: GrammarConfig,
    pub evaluation: EvaluationConfig,
    pub preprocessing: PreprocessingConfig,
}

impl DiscoveryConfig {
    pub fn validate(&self) -> Result<(), KerndiscError> {
        self.search.validate()?;
        self.grammar.validate()?;
        self.evaluation.validate()?;
        self.preprocessing.validate()?;
        Ok(())
    }

    /// Optional file (format from its extension), then `KERNDISC__SECTION__KEY`
    /// environment overrides, e.g. `KERNDISC__EVALUATION__METRIC=negative_log_likelihood`.
    pub fn load_layered<P: AsRef<Path>>(path: Option<P>) -> Result<Self, KerndiscError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path.as_ref()).required(false));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("grammar.base_kernels")
                    .with_list_parse_key("grammar.base_kernels_to_exclude")
                    .try_parsing(true),
            )
            .build()?;

        let config: DiscoveryConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<DiscoveryConfig>>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(DiscoveryConfig::default())),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), KerndiscError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| KerndiscError::Configuration(format!("Failed to read config: {}", e)))?;

        let config: DiscoveryConfig = toml::from_str(&contents)
            .map_err(|e| KerndiscError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        *self.write()? = config;
        Ok(())
    }

    /// Replace the current config with a layered file + environment load.
    pub fn load_layered<P: AsRef<Path>>(&self, path: Option<P>) -> Result<(), KerndiscError> {
        let config = DiscoveryConfig::load_layered(path)?;
        *self.write()? = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), KerndiscError> {
        let toml_str = toml::to_string_pretty(&self.get())
            .map_err(|e| KerndiscError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| KerndiscError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> DiscoveryConfig {
        match self.config.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Apply `f` and keep the result only if it validates.
    pub fn update<F>(&self, f: F) -> Result<(), KerndiscError>
    where
        F: FnOnce(&mut DiscoveryConfig),
    {
        let mut config = self.write()?;
        let mut updated = config.clone();
        f(&mut updated);
        updated.validate()?;
        *config = updated;
        Ok(())
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, DiscoveryConfig>, KerndiscError> {
        self.config
            .write()
            .map_err(|_| KerndiscError::Configuration("Config lock poisoned".to_string()))
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GrammarKind;
    use crate::engines::metrics::MetricKind;

    #[test]
    fn test_defaults_validate() {
        let config = DiscoveryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.search_depth, 10);
        assert_eq!(config.grammar.base_kernels.len(), 10);
        assert_eq!(config.evaluation.jitter_sd, 0.1);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: DiscoveryConfig = toml::from_str(
            r#"
            [search]
            search_depth = 3

            [evaluation]
            metric = "negative_log_likelihood"
            "#,
        )
        .unwrap();
        assert_eq!(config.search.search_depth, 3);
        assert_eq!(config.search.kernels_per_depth, 1);
        assert_eq!(config.evaluation.metric, MetricKind::NegativeLogLikelihood);
        assert_eq!(config.grammar.grammar, GrammarKind::Duvenaud);
    }

    #[test]
    fn test_update_rejects_invalid() {
        let manager = ConfigManager::new();
        let result = manager.update(|c| c.search.kernels_per_depth = 0);
        assert!(result.is_err());
        assert_eq!(manager.get().search.kernels_per_depth, 1);

        manager.update(|c| c.search.find_n_best = 5).unwrap();
        assert_eq!(manager.get().search.find_n_best, 5);
    }

    #[test]
    fn test_unknown_kernel_fails_validation() {
        let mut config = DiscoveryConfig::default();
        config.grammar.base_kernels.push("squiggle".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = std::env::temp_dir().join(format!("kerndisc-config-{}.toml", std::process::id()));
        let manager = ConfigManager::new();
        manager
            .update(|c| {
                c.search.search_depth = 4;
                c.grammar.base_kernels_to_exclude = vec!["periodic".to_string()];
            })
            .unwrap();
        manager.save_to_file(&path).unwrap();

        let loaded = ConfigManager::new();
        loaded.load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.get().search.search_depth, 4);
        assert_eq!(loaded.get().grammar.base_kernels_to_exclude, vec!["periodic"]);
    }

    #[test]
    fn test_layered_load_without_file() {
        let config = DiscoveryConfig::load_layered(None::<&str>).unwrap();
        assert!(config.validate().is_ok());
    }
}
