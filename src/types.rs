use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Atomic covariance function kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseKernel {
    White,
    Constant,
    Linear,
    Polynomial { degree: u32 },
    Rbf,
    Periodic,
    Cosine,
    Matern12,
    Matern32,
    Matern52,
    RationalQuadratic,
    ArcCosine,
    Exponential,
}

/// Operators that combine kernels.
///
/// `ChangePoint` and `ChangeWindow` are recognised by the parser but have no
/// registry entry, so they cannot be instantiated or serialized to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    Sum,
    Product,
    ChangePoint,
    ChangeWindow,
}

/// Kernel expression tree.
///
/// Trees are values: every transformation returns a new tree and leaves its
/// input untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KernelNode {
    Leaf(BaseKernel),
    Internal {
        combinator: Combinator,
        children: Vec<KernelNode>,
    },
}

impl KernelNode {
    /// Sum of `children`, absorbing the terms of any child that is itself a sum.
    pub fn sum(children: Vec<KernelNode>) -> Self {
        Self::flattened(Combinator::Sum, children)
    }

    /// Product of `children`, absorbing the factors of any child product.
    pub fn product(children: Vec<KernelNode>) -> Self {
        Self::flattened(Combinator::Product, children)
    }

    pub fn internal(combinator: Combinator, children: Vec<KernelNode>) -> Self {
        KernelNode::Internal {
            combinator,
            children,
        }
    }

    fn flattened(combinator: Combinator, children: Vec<KernelNode>) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                KernelNode::Internal {
                    combinator: inner,
                    children: grandchildren,
                } if inner == combinator => flat.extend(grandchildren),
                other => flat.push(other),
            }
        }
        KernelNode::Internal {
            combinator,
            children: flat,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, KernelNode::Leaf(_))
    }

    pub fn base_kernel(&self) -> Option<BaseKernel> {
        match self {
            KernelNode::Leaf(kernel) => Some(*kernel),
            KernelNode::Internal { .. } => None,
        }
    }

    pub fn combinator(&self) -> Option<Combinator> {
        match self {
            KernelNode::Leaf(_) => None,
            KernelNode::Internal { combinator, .. } => Some(*combinator),
        }
    }

    pub fn children(&self) -> &[KernelNode] {
        match self {
            KernelNode::Leaf(_) => &[],
            KernelNode::Internal { children, .. } => children,
        }
    }

    pub fn is_combination(&self, kind: Combinator) -> bool {
        self.combinator() == Some(kind)
    }
}

/// Entry of the search's result table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredKernel {
    /// Canonical text of the simplified tree; unique across the table.
    pub key: String,
    pub ast: KernelNode,
    pub depth: usize,
    /// Lower is better. `f64::INFINITY` while unscored or when the fit failed.
    pub score: f64,
    pub params: Option<BTreeMap<String, f64>>,
    /// Grammar expression this entry was first generated from (textual grammar only).
    pub expression: Option<String>,
    pub evaluated: bool,
}

impl ScoredKernel {
    pub fn unscored(key: String, ast: KernelNode, depth: usize) -> Self {
        Self {
            key,
            ast,
            depth,
            score: f64::INFINITY,
            params: None,
            expression: None,
            evaluated: false,
        }
    }
}

/// Why a discovery run stopped. Exactly one is recorded per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum TerminationReason {
    /// Last completed depth; `-1` when no expansion happened at all.
    MaxDepthReached { depth: i64 },
    EmptySearchSpace { depth: usize },
    EarlyStopping {
        depth: usize,
        improvement: f64,
        threshold: f64,
    },
    Cancelled { depth: usize },
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::MaxDepthReached { depth } => {
                write!(f, "maximum search depth reached at depth {}", depth)
            }
            TerminationReason::EmptySearchSpace { depth } => {
                write!(f, "empty search space, no new kernels found at depth {}", depth)
            }
            TerminationReason::EarlyStopping {
                depth,
                improvement,
                threshold,
            } => write!(
                f,
                "early stopping at depth {}, improvement {:.2}% below threshold {:.2}%",
                depth,
                improvement * 100.0,
                threshold * 100.0
            ),
            TerminationReason::Cancelled { depth } => {
                write!(f, "search cancelled before depth {}", depth)
            }
        }
    }
}

/// Outcome of a discovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryResult {
    /// Best `find_n_best` entries, best first.
    pub kernels: Vec<ScoredKernel>,
    pub highscore_progression: Vec<f64>,
    pub termination_reason: TerminationReason,
    /// Number of distinct kernel structures seen during the run.
    pub explored: usize,
    pub started_at: String,
    pub finished_at: String,
}

impl DiscoveryResult {
    pub fn best(&self) -> Option<&ScoredKernel> {
        self.kernels.first()
    }

    pub fn get(&self, key: &str) -> Option<&ScoredKernel> {
        self.kernels.iter().find(|k| k.key == key)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.kernels.iter().map(|k| k.key.as_str()).collect()
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
