use crate::error::{KerndiscError, Result};
use crate::kernels::covariance::Kernel;
use crate::kernels::registry::{combinator_spec, combinator_token, Arity};
use crate::types::{Combinator, KernelNode};

/// Structure of an instantiated kernel. Parameter values are dropped.
pub fn kernel_to_ast(kernel: &Kernel) -> KernelNode {
    match kernel {
        Kernel::Base { kernel, .. } => KernelNode::Leaf(*kernel),
        Kernel::Sum(children) => {
            KernelNode::internal(Combinator::Sum, children.iter().map(kernel_to_ast).collect())
        }
        Kernel::Product(children) => KernelNode::internal(
            Combinator::Product,
            children.iter().map(kernel_to_ast).collect(),
        ),
    }
}

/// Instantiate a tree with unit parameters on every leaf.
pub fn ast_to_kernel(node: &KernelNode) -> Result<Kernel> {
    validate(node)?;
    instantiate(node)
}

fn instantiate(node: &KernelNode) -> Result<Kernel> {
    match node {
        KernelNode::Leaf(kernel) => Ok(Kernel::base(*kernel)),
        KernelNode::Internal {
            combinator,
            children,
        } => {
            let children = children.iter().map(instantiate).collect::<Result<Vec<_>>>()?;
            match combinator {
                Combinator::Sum => Ok(Kernel::Sum(children)),
                Combinator::Product => Ok(Kernel::Product(children)),
                Combinator::ChangePoint | Combinator::ChangeWindow => {
                    Err(unregistered(*combinator))
                }
            }
        }
    }
}

/// Canonical text form, the equality and deduplication key of the search.
///
/// Operands of every sum and product are sorted, so commutative
/// rearrangements produce the same string. A sum directly inside a product
/// is parenthesized.
pub fn ast_to_text(node: &KernelNode) -> Result<String> {
    render(node, false)
}

fn render(node: &KernelNode, inside_product: bool) -> Result<String> {
    match node {
        KernelNode::Leaf(kernel) => Ok(kernel.name().into_owned()),
        KernelNode::Internal {
            combinator,
            children,
        } => {
            if combinator_spec(*combinator).is_none() {
                return Err(unregistered(*combinator));
            }
            let is_product = *combinator == Combinator::Product;
            let mut parts = children
                .iter()
                .map(|child| render(child, is_product))
                .collect::<Result<Vec<_>>>()?;
            parts.sort();
            if is_product {
                Ok(parts.join(" * "))
            } else if inside_product {
                Ok(format!("({})", parts.join(" + ")))
            } else {
                Ok(parts.join(" + "))
            }
        }
    }
}

/// Check that every node is a registered kernel kind with as many operands
/// as its registry arity allows.
pub fn validate(node: &KernelNode) -> Result<()> {
    match node {
        KernelNode::Leaf(_) => Ok(()),
        KernelNode::Internal {
            combinator,
            children,
        } => {
            let spec = combinator_spec(*combinator).ok_or_else(|| unregistered(*combinator))?;
            match spec.arity {
                Arity::Variadic if children.is_empty() => {
                    return Err(KerndiscError::InvalidNode(format!(
                        "`{}` needs at least one operand",
                        spec.name
                    )))
                }
                Arity::Leaf => {
                    return Err(KerndiscError::InvalidNode(format!(
                        "`{}` takes no operands",
                        spec.name
                    )))
                }
                Arity::Variadic => {}
            }
            children.iter().try_for_each(validate)
        }
    }
}

fn unregistered(combinator: Combinator) -> KerndiscError {
    KerndiscError::InvalidNode(format!(
        "`{}` is not a registered kernel type",
        combinator_token(combinator)
    ))
}

/// ASCII rendering of the tree, one node per line.
pub fn pretty_print(node: &KernelNode) -> String {
    let mut out = String::new();
    out.push_str(display_name(node));
    out.push('\n');
    let children = node.children();
    for (i, child) in children.iter().enumerate() {
        pretty_child(child, "", i + 1 == children.len(), &mut out);
    }
    out
}

fn pretty_child(node: &KernelNode, indent: &str, last: bool, out: &mut String) {
    out.push_str(indent);
    out.push_str(if last { "+-- " } else { "|-- " });
    out.push_str(display_name(node));
    out.push('\n');

    let child_indent = format!("{}{}", indent, if last { "    " } else { "|   " });
    let children = node.children();
    for (i, child) in children.iter().enumerate() {
        pretty_child(child, &child_indent, i + 1 == children.len(), out);
    }
}

fn display_name(node: &KernelNode) -> &'static str {
    match node {
        KernelNode::Leaf(kernel) => kernel.spec().display_name,
        KernelNode::Internal { combinator, .. } => match combinator_spec(*combinator) {
            Some(spec) => spec.display_name,
            None => match combinator {
                Combinator::ChangePoint => "ChangePoint",
                _ => "ChangeWindow",
            },
        },
    }
}
