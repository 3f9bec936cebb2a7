pub mod scoring;

pub use scoring::{MetricKind, ScoringMetric};
