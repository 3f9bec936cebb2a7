pub mod evaluator;
pub mod gp;
pub mod optimizer;
pub mod rank;

pub use evaluator::{add_jitter, Evaluation, Evaluator, ExactGpBackend, FitBackend};
pub use gp::{FitError, GpModel, GpRegression};
pub use optimizer::PatternSearch;
pub use rank::{rank_components, ComponentImpact};
