// src/engines/expansion/parser.rs
use crate::error::{KerndiscError, Result};
use crate::kernels::KernelRegistry;
use crate::types::{BaseKernel, Combinator, KernelNode};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Kernel(BaseKernel),
    Add(Box<Expression>, Box<Expression>),
    Mul(Box<Expression>, Box<Expression>),
    /// `(left) * (a + b)` where at least one of `a`, `b` is `constant`.
    LaxMul(Box<Expression>, BaseKernel, BaseKernel),
    ChangePoint(Box<Expression>, Box<Expression>),
    ChangeWindow(Box<Expression>, Box<Expression>),
}

impl Expression {
    /// Tree form. Chained sums and products are flattened.
    pub fn to_ast(&self) -> KernelNode {
        match self {
            Expression::Kernel(kernel) => KernelNode::Leaf(*kernel),
            Expression::Add(left, right) => KernelNode::sum(vec![left.to_ast(), right.to_ast()]),
            Expression::Mul(left, right) => {
                KernelNode::product(vec![left.to_ast(), right.to_ast()])
            }
            Expression::LaxMul(left, a, b) => KernelNode::product(vec![
                left.to_ast(),
                KernelNode::internal(Combinator::Sum, vec![KernelNode::Leaf(*a), KernelNode::Leaf(*b)]),
            ]),
            Expression::ChangePoint(a, b) => {
                KernelNode::internal(Combinator::ChangePoint, vec![a.to_ast(), b.to_ast()])
            }
            Expression::ChangeWindow(a, b) => {
                KernelNode::internal(Combinator::ChangeWindow, vec![a.to_ast(), b.to_ast()])
            }
        }
    }

    /// Top-level operands: the terms of a sum chain, the two sides of a
    /// product, or the expression itself when it has no top-level operator.
    pub fn operands(&self) -> Vec<Expression> {
        match self {
            Expression::Add(_, _) => {
                let mut terms = Vec::new();
                let mut current = self;
                while let Expression::Add(left, right) = current {
                    terms.push((**right).clone());
                    current = left;
                }
                terms.push(current.clone());
                terms.reverse();
                terms
            }
            Expression::Mul(left, right) => vec![(**left).clone(), (**right).clone()],
            Expression::LaxMul(left, a, b) => {
                vec![(**left).clone(), lax_sum(*a, *b)]
            }
            other => vec![other.clone()],
        }
    }
}

/// `a + b` as an expression; only valid standing alone, never as a factor.
fn lax_sum(a: BaseKernel, b: BaseKernel) -> Expression {
    Expression::Add(Box::new(Expression::Kernel(a)), Box::new(Expression::Kernel(b)))
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Kernel(kernel) => write!(f, "{}", kernel.name()),
            Expression::Add(left, right) => write!(f, "{} + {}", left, right),
            Expression::Mul(left, right) => write!(f, "({}) * {}", left, right),
            Expression::LaxMul(left, a, b) => {
                write!(f, "({}) * ({} + {})", left, a.name(), b.name())
            }
            Expression::ChangePoint(a, b) => write!(f, "cp({}, {})", a, b),
            Expression::ChangeWindow(a, b) => write!(f, "cw({}, {})", a, b),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    LParen,
    RParen,
    Plus,
    Star,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Name(name) => write!(f, "`{}`", name),
            Token::LParen => write!(f, "`(`"),
            Token::RParen => write!(f, "`)`"),
            Token::Plus => write!(f, "`+`"),
            Token::Star => write!(f, "`*`"),
            Token::Comma => write!(f, "`,`"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' | '+' | '*' | ',' => {
                chars.next();
                tokens.push(match c {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '+' => Token::Plus,
                    '*' => Token::Star,
                    _ => Token::Comma,
                });
            }
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let mut name = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Name(name));
            }
            other => {
                return Err(KerndiscError::InvalidExpression(format!(
                    "unexpected character `{}` at position {} in `{}`",
                    other, pos, input
                )))
            }
        }
    }
    Ok(tokens)
}

/// Recursive-descent parser for the Duvenaud kernel expression language.
///
/// ```text
/// expr   := item ("+" atom)*
/// item   := atom | "(" expr ")" "*" factor
/// factor := atom | "(" lax ")"
/// lax    := base "+" "constant" | "constant" "+" base | "constant" "+" "constant"
/// atom   := NAME | "cp" "(" expr "," expr ")" | "cw" "(" expr "," expr ")"
/// ```
///
/// Products always carry a parenthesized left operand, so `(rbf) * linear + white`
/// is valid while `rbf * linear` is not.
pub struct ExpressionParser<'a> {
    registry: &'a KernelRegistry,
}

impl<'a> ExpressionParser<'a> {
    pub fn new(registry: &'a KernelRegistry) -> Self {
        Self { registry }
    }

    pub fn parse(&self, input: &str) -> Result<Expression> {
        let tokens = tokenize(input)?;
        let mut cursor = Cursor {
            tokens: &tokens,
            pos: 0,
            input,
            registry: self.registry,
        };
        let expression = cursor.expr()?;
        match cursor.peek() {
            None => Ok(expression),
            Some(token) => Err(cursor.error(&format!("unexpected trailing {}", token))),
        }
    }
}

struct Cursor<'t> {
    tokens: &'t [Token],
    pos: usize,
    input: &'t str,
    registry: &'t KernelRegistry,
}

impl<'t> Cursor<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'t Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn error(&self, message: &str) -> KerndiscError {
        KerndiscError::InvalidExpression(format!("{} in `{}`", message, self.input))
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.advance() {
            Some(token) if *token == expected => Ok(()),
            Some(token) => Err(self.error(&format!("expected {}, found {}", expected, token))),
            None => Err(self.error(&format!("expected {}, found end of input", expected))),
        }
    }

    fn expr(&mut self) -> Result<Expression> {
        let mut expression = self.item()?;
        while self.peek() == Some(&Token::Plus) {
            self.advance();
            let right = self.atom()?;
            expression = Expression::Add(Box::new(expression), Box::new(right));
        }
        Ok(expression)
    }

    fn item(&mut self) -> Result<Expression> {
        if self.peek() != Some(&Token::LParen) {
            return self.atom();
        }
        self.advance();
        let left = self.expr()?;
        self.expect(Token::RParen)?;
        self.expect(Token::Star)?;

        if self.peek() == Some(&Token::LParen) {
            self.advance();
            let a = self.base()?;
            self.expect(Token::Plus)?;
            let b = self.base()?;
            self.expect(Token::RParen)?;
            if a != BaseKernel::Constant && b != BaseKernel::Constant {
                return Err(self.error(&format!(
                    "lax product `({} + {})` needs a `constant` operand",
                    a.name(),
                    b.name()
                )));
            }
            return Ok(Expression::LaxMul(Box::new(left), a, b));
        }

        let right = self.atom()?;
        Ok(Expression::Mul(Box::new(left), Box::new(right)))
    }

    fn atom(&mut self) -> Result<Expression> {
        let name = match self.peek() {
            Some(Token::Name(name)) => name,
            Some(token) => return Err(self.error(&format!("expected a kernel, found {}", token))),
            None => return Err(self.error("expected a kernel, found end of input")),
        };

        let combinator = match name.as_str() {
            "cp" if self.peek_at(1) == Some(&Token::LParen) => Some(Combinator::ChangePoint),
            "cw" if self.peek_at(1) == Some(&Token::LParen) => Some(Combinator::ChangeWindow),
            _ => None,
        };
        let Some(combinator) = combinator else {
            return self.base().map(Expression::Kernel);
        };

        self.advance();
        self.expect(Token::LParen)?;
        let first = self.expr()?;
        self.expect(Token::Comma)?;
        let second = self.expr()?;
        self.expect(Token::RParen)?;

        Ok(match combinator {
            Combinator::ChangePoint => Expression::ChangePoint(Box::new(first), Box::new(second)),
            _ => Expression::ChangeWindow(Box::new(first), Box::new(second)),
        })
    }

    fn base(&mut self) -> Result<BaseKernel> {
        match self.advance() {
            Some(Token::Name(name)) => self
                .registry
                .get_base(name)
                .ok_or_else(|| self.error(&format!("unknown kernel `{}`", name))),
            Some(token) => Err(self.error(&format!("expected a kernel, found {}", token))),
            None => Err(self.error("expected a kernel, found end of input")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::ast_to_text;

    fn parse(input: &str) -> Result<Expression> {
        let registry = KernelRegistry::new();
        ExpressionParser::new(&registry).parse(input)
    }

    #[test]
    fn test_parse_base_kernel() {
        assert_eq!(parse("linear").unwrap(), Expression::Kernel(BaseKernel::Linear));
        assert_eq!(parse("  rbf ").unwrap(), Expression::Kernel(BaseKernel::Rbf));
    }

    #[test]
    fn test_parse_and_display_round_trip() {
        let inputs = [
            "linear + rbf",
            "(linear) * rbf",
            "(linear) * (rbf + constant)",
            "(linear) * (constant + constant)",
            "((linear) * rbf + white) * periodic + constant",
            "cp(linear, rbf) + white",
        ];
        for input in inputs {
            let parsed = parse(input).unwrap();
            assert_eq!(parsed.to_string(), input);
        }
    }

    #[test]
    fn test_unparenthesized_product_rejected() {
        assert!(matches!(parse("linear * rbf"), Err(KerndiscError::InvalidExpression(_))));
        assert!(matches!(parse("(linear) * rbf * white"), Err(KerndiscError::InvalidExpression(_))));
        assert!(matches!(parse("linear + (rbf) * white"), Err(KerndiscError::InvalidExpression(_))));
    }

    #[test]
    fn test_lax_product_requires_constant() {
        assert!(parse("(linear) * (rbf + white)").is_err());
        assert!(parse("(linear) * (constant + rbf)").is_ok());
    }

    #[test]
    fn test_unknown_kernel_rejected() {
        let err = parse("linear + squiggle").unwrap_err();
        assert!(err.to_string().contains("squiggle"));
        assert!(parse("").is_err());
        assert!(parse("linear +").is_err());
        assert!(parse("linear $ rbf").is_err());
    }

    #[test]
    fn test_to_ast_flattens() {
        let ast = parse("(linear + rbf + white) * periodic").unwrap().to_ast();
        assert_eq!(ast_to_text(&ast).unwrap(), "(linear + rbf + white) * periodic");

        let ast = parse("((linear) * rbf) * (periodic + constant)").unwrap().to_ast();
        assert_eq!(ast.children().len(), 3);
        assert_eq!(
            ast_to_text(&ast).unwrap(),
            "(constant + periodic) * linear * rbf"
        );
    }

    #[test]
    fn test_operands() {
        let parsed = parse("(linear) * rbf + white + periodic").unwrap();
        let operands: Vec<String> = parsed.operands().iter().map(|e| e.to_string()).collect();
        assert_eq!(operands, vec!["(linear) * rbf", "white", "periodic"]);

        let parsed = parse("(linear + white) * (rbf + constant)").unwrap();
        let operands: Vec<String> = parsed.operands().iter().map(|e| e.to_string()).collect();
        assert_eq!(operands, vec!["linear + white", "rbf + constant"]);

        let parsed = parse("linear").unwrap();
        assert_eq!(parsed.operands(), vec![parsed.clone()]);
    }
}
