use super::grammar::GrammarOptions;
use super::parser::{Expression, ExpressionParser};
use crate::error::{KerndiscError, Result};
use crate::kernels::KernelRegistry;
use crate::types::BaseKernel;
use log::{debug, error};

/// Duvenaud grammar over expression strings.
pub struct TextGrammar {
    options: GrammarOptions,
    registry: KernelRegistry,
}

impl TextGrammar {
    pub fn new(options: GrammarOptions) -> Self {
        Self {
            options,
            registry: KernelRegistry::new(),
        }
    }

    pub fn options(&self) -> &GrammarOptions {
        &self.options
    }

    pub fn parse(&self, expression: &str) -> Result<Expression> {
        ExpressionParser::new(&self.registry).parse(expression)
    }

    /// Every one-step alteration of `expression`.
    ///
    /// For `linear` this is each base kernel, then per base kernel `b`:
    /// `linear + b`, `(linear) * b` and `(linear) * (b + constant)`, then the
    /// top-level operands of `linear` (just `linear`).
    pub fn extend(&self, expression: &str) -> Result<Vec<String>> {
        let parsed = self.parse(expression)?;
        let current = parsed.to_string();

        let active = self.options.active_kernels();
        let lax = self.options.lax_kernels();
        let constant = BaseKernel::Constant.name();

        let mut alterations: Vec<String> =
            active.iter().map(|kernel| kernel.name().into_owned()).collect();

        for kernel in &active {
            let name = kernel.name();
            alterations.push(format!("{} + {}", current, name));
            alterations.push(format!("({}) * {}", current, name));
            if lax.contains(kernel) {
                alterations.push(format!("({}) * ({} + {})", current, name, constant));
            }
        }

        alterations.extend(parsed.operands().iter().map(|operand| operand.to_string()));

        for alteration in &alterations {
            if let Err(e) = self.parse(alteration) {
                error!("Grammar generated invalid expression `{}`: {}", alteration, e);
                return Err(KerndiscError::GrammarViolation(alteration.clone()));
            }
        }

        debug!("Extended `{}` into {} expressions", current, alterations.len());
        Ok(alterations)
    }
}
