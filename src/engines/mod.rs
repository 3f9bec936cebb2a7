pub mod discovery;
pub mod evaluation;
pub mod expansion;
pub mod metrics;
