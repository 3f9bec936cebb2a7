pub mod evaluation;
pub mod grammar;
pub mod manager;
pub mod preprocessing;
pub mod search;
pub mod traits;

pub use evaluation::EvaluationConfig;
pub use grammar::{GrammarConfig, GrammarKind};
pub use manager::{ConfigManager, DiscoveryConfig};
pub use preprocessing::PreprocessingConfig;
pub use search::SearchConfig;
pub use traits::ConfigSection;
