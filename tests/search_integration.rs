use kerndisc::config::{DiscoveryConfig, GrammarKind};
use kerndisc::engines::discovery::{
    discover_with, CancellationToken, ChannelProgressCallback, KernelSearch, ProgressCallback,
    ProgressMessage,
};
use kerndisc::engines::evaluation::{FitBackend, FitError, GpModel};
use kerndisc::engines::metrics::MetricKind;
use kerndisc::kernels::{ast_to_text, kernel_to_ast, Kernel};
use kerndisc::{discover, KerndiscError, TerminationReason};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// Model whose negative log likelihood is looked up by canonical text.
struct ScriptedModel {
    kernel: Kernel,
    x: Vec<f64>,
    y: Vec<f64>,
    nll: Option<f64>,
}

impl GpModel for ScriptedModel {
    fn log_likelihood(&self) -> Result<f64, FitError> {
        self.nll.map(|nll| -nll).ok_or(FitError::NotPositiveDefinite)
    }

    fn read_values(&self) -> BTreeMap<String, f64> {
        let mut values = BTreeMap::new();
        values.insert("likelihood/variance".to_string(), 1.0);
        values
    }

    fn assign(&mut self, _values: &BTreeMap<String, f64>) -> Result<(), FitError> {
        Ok(())
    }

    fn num_data(&self) -> usize {
        self.x.len()
    }

    fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    fn inputs(&self) -> &[f64] {
        &self.x
    }

    fn targets(&self) -> &[f64] {
        &self.y
    }
}

struct ScriptedBackend {
    scores: HashMap<String, f64>,
    failing: Vec<String>,
    default_score: f64,
    built: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(scores: &[(&str, f64)]) -> Self {
        Self {
            scores: scores.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            failing: Vec::new(),
            default_score: 1000.0,
            built: Mutex::new(Vec::new()),
        }
    }

    fn failing(mut self, key: &str) -> Self {
        self.failing.push(key.to_string());
        self
    }

    fn built(&self) -> Vec<String> {
        self.built.lock().unwrap().clone()
    }
}

impl FitBackend for ScriptedBackend {
    fn build(&self, x: &[f64], y: &[f64], kernel: Kernel) -> Result<Box<dyn GpModel>, FitError> {
        let key = ast_to_text(&kernel_to_ast(&kernel)).unwrap();
        self.built.lock().unwrap().push(key.clone());
        let nll = if self.failing.contains(&key) {
            None
        } else {
            Some(self.scores.get(&key).copied().unwrap_or(self.default_score))
        };
        Ok(Box::new(ScriptedModel {
            kernel,
            x: x.to_vec(),
            y: y.to_vec(),
            nll,
        }))
    }

    fn optimize(&self, _model: &mut dyn GpModel) -> Result<(), FitError> {
        Ok(())
    }
}

struct Quiet;

impl ProgressCallback for Quiet {
    fn on_depth_start(&mut self, _depth: usize, _frontier: &[String]) {}
    fn on_depth_complete(&mut self, _depth: usize, _best_score: f64, _explored: usize) {}
    fn on_kernel_evaluated(&mut self, _key: &str, _score: f64, _current: usize, _total: usize) {}
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn series() -> (Vec<f64>, Vec<f64>) {
    let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
    let y: Vec<f64> = x.iter().map(|v| v.sin()).collect();
    (x, y)
}

fn scripted_config() -> DiscoveryConfig {
    let mut config = DiscoveryConfig::default();
    config.evaluation.metric = MetricKind::NegativeLogLikelihood;
    config.evaluation.jitter = false;
    config.evaluation.seed = Some(1);
    config
}

#[test]
fn test_early_stopping_reports_improvement() {
    init_logging();
    let (x, y) = series();
    let backend = Arc::new(ScriptedBackend::new(&[("linear", 100.0), ("linear + rbf", 90.0)]));
    let mut config = scripted_config();
    config.search.early_stopping_min_rel_delta = Some(0.2);

    let result = discover_with(&x, &y, &config, backend, &mut Quiet).unwrap();

    assert_eq!(result.highscore_progression.len(), 3);
    assert_eq!(&result.highscore_progression[1..], &[100.0, 90.0]);
    assert!(matches!(
        result.termination_reason,
        TerminationReason::EarlyStopping { depth: 2, .. }
    ));
    let message = result.termination_reason.to_string();
    assert!(message.contains("early stopping"));
    assert!(message.contains("10.00%"));
    assert!(message.contains("20.00%"));
    assert_eq!(result.best().unwrap().key, "linear + rbf");
}

#[test]
fn test_seed_only_when_depth_is_zero() {
    init_logging();
    let mut config = DiscoveryConfig::default();
    config.search.search_depth = 0;

    let result = discover(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0], &config).unwrap();

    assert_eq!(result.keys(), vec!["white"]);
    assert_eq!(result.explored, 1);
    assert!(result.highscore_progression.is_empty());
    assert_eq!(
        result.termination_reason,
        TerminationReason::MaxDepthReached { depth: -1 }
    );
    assert!(result
        .termination_reason
        .to_string()
        .contains("maximum search depth reached at depth -1"));
}

#[test]
fn test_empty_search_space_when_frontier_is_exhausted() {
    init_logging();
    let (x, y) = series();
    let backend = Arc::new(ScriptedBackend::new(&[("linear", 100.0)]));
    let config = scripted_config();

    let result = discover_with(&x, &y, &config, backend.clone(), &mut Quiet).unwrap();

    assert_eq!(
        result.termination_reason,
        TerminationReason::EmptySearchSpace { depth: 2 }
    );
    assert_eq!(result.best().unwrap().key, "linear");
    assert_eq!(result.best().unwrap().depth, 0);
}

#[test]
fn test_no_kernel_is_scored_twice() {
    init_logging();
    let (x, y) = series();
    let backend = Arc::new(ScriptedBackend::new(&[
        ("linear", 100.0),
        ("linear + periodic", 80.0),
        ("linear * periodic + periodic", 70.0),
    ]));
    let mut config = scripted_config();
    config.search.search_depth = 4;
    config.search.kernels_per_depth = 2;

    let result = discover_with(&x, &y, &config, backend.clone(), &mut Quiet).unwrap();

    let built = backend.built();
    let mut unique = built.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), built.len());
    // every table entry except the seed was fitted exactly once
    assert_eq!(result.explored, built.len() + 1);
    assert!(!built.contains(&"white".to_string()));
}

#[test]
fn test_top_n_results_are_sorted() {
    init_logging();
    let (x, y) = series();
    let backend = Arc::new(ScriptedBackend::new(&[
        ("linear", 100.0),
        ("rbf", 110.0),
        ("periodic", 120.0),
    ]));
    let mut config = scripted_config();
    config.search.search_depth = 1;
    config.search.find_n_best = 3;

    let result = discover_with(&x, &y, &config, backend, &mut Quiet).unwrap();

    assert_eq!(result.keys(), vec!["linear", "rbf", "periodic"]);
    assert_eq!(
        result.termination_reason,
        TerminationReason::MaxDepthReached { depth: 0 }
    );
    assert!(result.kernels.iter().all(|k| k.depth == 0));
}

#[test]
fn test_fit_failure_is_absorbed() {
    init_logging();
    let (x, y) = series();
    let backend = Arc::new(ScriptedBackend::new(&[("linear", 100.0)]).failing("rbf"));
    let mut config = scripted_config();
    config.search.search_depth = 1;
    config.search.find_n_best = 1000;

    let result = discover_with(&x, &y, &config, backend, &mut Quiet).unwrap();

    let rbf = result.get("rbf").unwrap();
    assert_eq!(rbf.score, f64::INFINITY);
    assert!(rbf.evaluated);
    assert!(rbf.params.is_none());
    assert_eq!(result.best().unwrap().key, "linear");
}

#[test]
fn test_textual_grammar_finds_same_kernel() {
    init_logging();
    let (x, y) = series();
    let backend = Arc::new(ScriptedBackend::new(&[("linear", 100.0), ("linear + rbf", 90.0)]));
    let mut config = scripted_config();
    config.grammar.grammar = GrammarKind::DuvenaudText;
    config.search.early_stopping_min_rel_delta = Some(0.2);

    let result = discover_with(&x, &y, &config, backend, &mut Quiet).unwrap();

    let best = result.best().unwrap();
    assert_eq!(best.key, "linear + rbf");
    assert_eq!(best.expression.as_deref(), Some("linear + rbf"));
}

#[test]
fn test_full_initial_expansion_explores_more() {
    init_logging();
    let (x, y) = series();
    let mut config = scripted_config();
    config.search.search_depth = 1;

    let plain = discover_with(&x, &y, &config, Arc::new(ScriptedBackend::new(&[])), &mut Quiet).unwrap();
    config.search.full_initial_base_kernel_expansion = true;
    let full = discover_with(&x, &y, &config, Arc::new(ScriptedBackend::new(&[])), &mut Quiet).unwrap();

    assert!(full.explored > plain.explored);
}

#[test]
fn test_progress_messages() {
    init_logging();
    let (x, y) = series();
    let (sender, receiver) = std::sync::mpsc::channel();
    let mut callback = ChannelProgressCallback::new(sender);
    let mut config = scripted_config();
    config.search.search_depth = 2;

    discover_with(
        &x,
        &y,
        &config,
        Arc::new(ScriptedBackend::new(&[("linear", 100.0)])),
        &mut callback,
    )
    .unwrap();
    drop(callback);

    let messages: Vec<ProgressMessage> = receiver.iter().collect();
    assert_eq!(
        messages.first(),
        Some(&ProgressMessage::DepthStart {
            depth: 0,
            frontier: vec!["white".to_string()]
        })
    );
    let completed = messages
        .iter()
        .filter(|m| matches!(m, ProgressMessage::DepthComplete { .. }))
        .count();
    assert_eq!(completed, 2);
}

#[test]
fn test_cancelled_search() {
    init_logging();
    let (x, y) = series();
    let config = scripted_config();
    let token = CancellationToken::new();
    token.cancel();

    let mut search = KernelSearch::new(
        &config,
        Arc::new(ScriptedBackend::new(&[])),
        Arc::new(MetricKind::NegativeLogLikelihood),
    )
    .unwrap()
    .with_cancellation(token);
    let result = search.run(&x, &y, &mut Quiet).unwrap();

    assert_eq!(result.termination_reason, TerminationReason::Cancelled { depth: 0 });
    assert_eq!(result.explored, 1);
}

#[test]
fn test_shape_mismatch_is_fatal() {
    let result = discover(&[0.0, 1.0], &[0.0], &DiscoveryConfig::default());
    assert!(matches!(result, Err(KerndiscError::ShapeMismatch { .. })));
}

#[test]
fn test_result_serialises_to_json() {
    let (x, y) = series();
    let mut config = scripted_config();
    config.search.search_depth = 1;
    let result = discover_with(&x, &y, &config, Arc::new(ScriptedBackend::new(&[])), &mut Quiet).unwrap();

    let json = result.to_json().unwrap();
    assert!(json.contains("\"termination_reason\""));
    assert!(json.contains("max_depth_reached"));
}
