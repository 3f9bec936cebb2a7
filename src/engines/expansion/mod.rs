pub mod grammar;
pub mod parser;
pub mod simplify;
pub mod text_grammar;

pub use grammar::{decompose, AstGrammar, GrammarOptions};
pub use parser::{Expression, ExpressionParser};
pub use simplify::{absorb_white_products, distribute, merge_rbfs, simplify};
pub use text_grammar::TextGrammar;

use crate::config::{GrammarConfig, GrammarKind};
use crate::error::{KerndiscError, Result};
use crate::kernels::KernelRegistry;
use crate::types::{BaseKernel, KernelNode, ScoredKernel};

/// One grammar output, before simplification and deduplication.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub ast: KernelNode,
    /// Source expression, set by the textual grammar only.
    pub expression: Option<String>,
}

impl Candidate {
    pub fn from_ast(ast: KernelNode) -> Self {
        Self {
            ast,
            expression: None,
        }
    }
}

/// The rule set that governs expansion.
pub enum Grammar {
    Duvenaud(AstGrammar),
    DuvenaudText(TextGrammar),
}

impl Grammar {
    pub fn from_config(config: &GrammarConfig) -> Result<Self> {
        let registry = KernelRegistry::new();
        let options = GrammarOptions::from_config(config, &registry)?;
        Ok(match config.grammar {
            GrammarKind::Duvenaud => Grammar::Duvenaud(AstGrammar::new(options)),
            GrammarKind::DuvenaudText => Grammar::DuvenaudText(TextGrammar::new(options)),
        })
    }

    pub fn options(&self) -> &GrammarOptions {
        match self {
            Grammar::Duvenaud(grammar) => grammar.options(),
            Grammar::DuvenaudText(grammar) => grammar.options(),
        }
    }

    /// Starting candidate for a search from a single base kernel.
    pub fn seed(&self, kernel: BaseKernel) -> Candidate {
        let ast = KernelNode::Leaf(kernel);
        match self {
            Grammar::Duvenaud(_) => Candidate::from_ast(ast),
            Grammar::DuvenaudText(_) => Candidate {
                ast,
                expression: Some(kernel.name().into_owned()),
            },
        }
    }

    /// Expand a table entry. The textual grammar works from the expression
    /// the entry was generated from.
    pub fn expand(&self, entry: &ScoredKernel) -> Result<Vec<Candidate>> {
        match self {
            Grammar::Duvenaud(grammar) => Ok(grammar
                .expand(&entry.ast)?
                .into_iter()
                .map(Candidate::from_ast)
                .collect()),
            Grammar::DuvenaudText(grammar) => {
                let expression = entry.expression.as_deref().ok_or_else(|| {
                    KerndiscError::InvalidExpression(format!(
                        "kernel `{}` has no source expression",
                        entry.key
                    ))
                })?;
                self.expand_expression(grammar, expression)
            }
        }
    }

    /// Expansion of every active base kernel, used for a full first depth.
    pub fn expand_base_kernels(&self) -> Result<Vec<Candidate>> {
        let mut candidates = Vec::new();
        for kernel in self.options().active_kernels() {
            match self {
                Grammar::Duvenaud(grammar) => candidates.extend(
                    grammar
                        .expand(&KernelNode::Leaf(kernel))?
                        .into_iter()
                        .map(Candidate::from_ast),
                ),
                Grammar::DuvenaudText(grammar) => {
                    candidates.extend(self.expand_expression(grammar, &kernel.name())?)
                }
            }
        }
        Ok(candidates)
    }

    fn expand_expression(&self, grammar: &TextGrammar, expression: &str) -> Result<Vec<Candidate>> {
        grammar
            .extend(expression)?
            .into_iter()
            .map(|alteration| {
                let ast = grammar.parse(&alteration)?.to_ast();
                Ok(Candidate {
                    ast,
                    expression: Some(alteration),
                })
            })
            .collect()
    }
}
