pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod kernels;
pub mod types;

pub use config::{ConfigManager, DiscoveryConfig};
pub use engines::discovery::{discover, discover_with};
pub use error::{KerndiscError, Result};
pub use types::{BaseKernel, Combinator, DiscoveryResult, KernelNode, ScoredKernel, TerminationReason};
