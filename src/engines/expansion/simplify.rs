// src/engines/expansion/simplify.rs
use crate::types::{BaseKernel, Combinator, KernelNode};

/// Distribute, then merge smooth factors, then absorb noise products.
///
/// The result is a single base kernel, a product of base kernels, or a sum
/// whose terms are base kernels or products of base kernels. The input is
/// left untouched.
pub fn simplify(node: &KernelNode) -> KernelNode {
    absorb_white_products(&merge_rbfs(&distribute(node)))
}

/// Multiply out every product over its sum operands until no product has a
/// sum child. Nested sums and nested products are flattened on the way.
pub fn distribute(node: &KernelNode) -> KernelNode {
    match node {
        KernelNode::Leaf(_) => node.clone(),
        KernelNode::Internal {
            combinator,
            children,
        } => {
            let children: Vec<KernelNode> = children.iter().map(distribute).collect();
            match combinator {
                Combinator::Sum => KernelNode::sum(children),
                Combinator::Product => distribute_product(children),
                other => KernelNode::internal(*other, children),
            }
        }
    }
}

/// `factors` are already distributed, so any sum among them only holds base
/// kernels and products of base kernels.
fn distribute_product(factors: Vec<KernelNode>) -> KernelNode {
    let mut terms: Vec<Vec<KernelNode>> = vec![Vec::new()];
    let mut expanded = false;

    for factor in factors {
        match factor {
            KernelNode::Internal {
                combinator: Combinator::Sum,
                children: summands,
            } => {
                expanded = true;
                let mut next = Vec::with_capacity(terms.len() * summands.len());
                for term in &terms {
                    for summand in &summands {
                        let mut extended = term.clone();
                        extended.push(summand.clone());
                        next.push(extended);
                    }
                }
                terms = next;
            }
            other => {
                for term in &mut terms {
                    term.push(other.clone());
                }
            }
        }
    }

    if !expanded {
        return KernelNode::product(terms.pop().unwrap_or_default());
    }
    KernelNode::sum(terms.into_iter().map(product_or_single).collect())
}

fn product_or_single(mut factors: Vec<KernelNode>) -> KernelNode {
    if factors.len() == 1 {
        factors.remove(0)
    } else {
        KernelNode::product(factors)
    }
}

/// Keep a single RBF factor in every product. A product left with one factor
/// is replaced by that factor.
pub fn merge_rbfs(node: &KernelNode) -> KernelNode {
    rewrite_products(node, &|factors| {
        let (rbfs, mut kept): (Vec<KernelNode>, Vec<KernelNode>) = factors
            .into_iter()
            .partition(|f| f.base_kernel() == Some(BaseKernel::Rbf));
        kept.extend(rbfs.into_iter().take(1));
        kept
    })
}

/// Replace every product holding a white-noise factor by the first white
/// factor times the product's non-stationary base kernels.
pub fn absorb_white_products(node: &KernelNode) -> KernelNode {
    rewrite_products(node, &|factors| {
        let Some(white) = factors
            .iter()
            .find(|f| f.base_kernel() == Some(BaseKernel::White))
            .cloned()
        else {
            return factors;
        };
        let mut kept = vec![white];
        kept.extend(factors.into_iter().filter(|f| {
            f.base_kernel()
                .map(|kernel| !kernel.is_stationary())
                .unwrap_or(false)
        }));
        kept
    })
}

/// Bottom-up rewrite of product factor lists, collapsing single-factor products.
fn rewrite_products<F>(node: &KernelNode, rewrite: &F) -> KernelNode
where
    F: Fn(Vec<KernelNode>) -> Vec<KernelNode>,
{
    match node {
        KernelNode::Leaf(_) => node.clone(),
        KernelNode::Internal {
            combinator,
            children,
        } => {
            let children: Vec<KernelNode> = children
                .iter()
                .map(|child| rewrite_products(child, rewrite))
                .collect();
            match combinator {
                Combinator::Product => product_or_single(rewrite(children)),
                Combinator::Sum => KernelNode::sum(children),
                other => KernelNode::internal(*other, children),
            }
        }
    }
}
