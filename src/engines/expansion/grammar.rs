use crate::config::GrammarConfig;
use crate::error::{KerndiscError, Result};
use crate::kernels::transform::validate;
use crate::kernels::KernelRegistry;
use crate::types::{BaseKernel, Combinator, KernelNode};
use log::debug;

/// Base kernels a grammar draws from, and which of them are excluded.
#[derive(Debug, Clone)]
pub struct GrammarOptions {
    pub base_kernels: Vec<BaseKernel>,
    /// Removed from substitute/add/multiply/lax-multiply. Decompose ignores it.
    pub excluded: Vec<BaseKernel>,
    /// Also emit `current * (constant + constant)`.
    pub lax_product_with_constant: bool,
}

impl GrammarOptions {
    pub fn from_config(config: &GrammarConfig, registry: &KernelRegistry) -> Result<Self> {
        Ok(Self {
            base_kernels: registry.resolve_all(&config.base_kernels)?,
            excluded: registry.resolve_all(&config.base_kernels_to_exclude)?,
            lax_product_with_constant: config.lax_product_with_constant,
        })
    }

    /// Base kernels in configured order, minus exclusions.
    pub fn active_kernels(&self) -> Vec<BaseKernel> {
        self.base_kernels
            .iter()
            .copied()
            .filter(|kernel| !self.excluded.contains(kernel))
            .collect()
    }

    /// Kernels that get a `(b + constant)` lax-multiply candidate.
    pub fn lax_kernels(&self) -> Vec<BaseKernel> {
        self.active_kernels()
            .into_iter()
            .filter(|kernel| self.lax_product_with_constant || *kernel != BaseKernel::Constant)
            .collect()
    }

    pub fn with_exclusions(mut self, excluded: Vec<BaseKernel>) -> Self {
        self.excluded = excluded;
        self
    }
}

impl Default for GrammarOptions {
    fn default() -> Self {
        let registry = KernelRegistry::new();
        Self {
            base_kernels: registry
                .resolve_all(crate::kernels::DEFAULT_GRAMMAR_KERNELS)
                .unwrap_or_default(),
            excluded: Vec::new(),
            lax_product_with_constant: true,
        }
    }
}

/// Duvenaud grammar applied directly to kernel trees.
#[derive(Debug, Clone)]
pub struct AstGrammar {
    options: GrammarOptions,
}

impl AstGrammar {
    pub fn new(options: GrammarOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GrammarOptions {
        &self.options
    }

    /// All one-step mutations of `node`, in rule order: substitute, then per
    /// base kernel add, multiply and lax-multiply, then decompose.
    pub fn expand(&self, node: &KernelNode) -> Result<Vec<KernelNode>> {
        ensure_registered(node)?;

        let active = self.options.active_kernels();
        let lax = self.options.lax_kernels();
        let mut candidates = Vec::with_capacity(active.len() * 4 + node.children().len().max(1));

        candidates.extend(active.iter().map(|kernel| KernelNode::Leaf(*kernel)));

        for kernel in &active {
            let base = KernelNode::Leaf(*kernel);
            candidates.push(KernelNode::sum(vec![node.clone(), base.clone()]));
            candidates.push(KernelNode::product(vec![node.clone(), base]));
            if lax.contains(kernel) {
                candidates.push(KernelNode::product(vec![
                    node.clone(),
                    KernelNode::internal(
                        Combinator::Sum,
                        vec![KernelNode::Leaf(*kernel), KernelNode::Leaf(BaseKernel::Constant)],
                    ),
                ]));
            }
        }

        candidates.extend(decompose(node));

        debug!("Expanded tree into {} candidates", candidates.len());
        Ok(candidates)
    }
}

/// Immediate operands of a sum or product; a base kernel decomposes to itself.
pub fn decompose(node: &KernelNode) -> Vec<KernelNode> {
    match node {
        KernelNode::Leaf(_) => vec![node.clone()],
        KernelNode::Internal {
            combinator: Combinator::Sum | Combinator::Product,
            children,
        } => children.clone(),
        KernelNode::Internal { .. } => vec![node.clone()],
    }
}

fn ensure_registered(node: &KernelNode) -> Result<()> {
    validate(node).map_err(|e| {
        KerndiscError::InvalidExpression(format!("cannot expand {:?}: {}", node, e))
    })
}
