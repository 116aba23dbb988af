//! Recursive-descent parser for `$filter` and `$orderby` expressions.
//!
//! Binary operators are parsed by precedence climbing over
//! [`BinaryOperatorKind::precedence`]; every nested expression (parentheses,
//! unary operands, call arguments, lambda bodies) spends one level of the
//! [`RecursionBudget`]. Operator chains and member paths are built in loops,
//! so the height of each finished token is checked against the same limit.

use tracing::{debug, trace};

use crate::error::{QueryError, Result};
use crate::lexer::{Lexer, TokenKind};
use crate::parser::ast::{
    BinaryOperatorKind, FunctionArgument, FunctionCallToken, LambdaKind, LambdaToken,
    OrderByDirection, OrderByToken, PathSegmentToken, PathToken, QueryToken, UnaryOperatorKind,
};
use crate::parser::{ensure_stack, RecursionBudget};
use crate::types::LiteralValue;

/// Built-in functions that may be called with `()`.
const NULLARY_FUNCTIONS: &[&str] = &["now", "maxdatetime", "mindatetime"];

const IMPLICIT_VARIABLE: &str = "$it";

/// Parser over one expression option value.
#[derive(Debug)]
pub struct ExpressionParser<'a> {
    lexer: Lexer<'a>,
    max_depth: usize,
    lambda_variables: Vec<String>,
}

impl<'a> ExpressionParser<'a> {
    /// Creates a parser over `text` with the given recursion budget.
    ///
    /// # Errors
    ///
    /// Returns a `Lexical` error if the first token is malformed.
    pub fn new(text: &'a str, max_depth: usize) -> Result<Self> {
        Ok(ExpressionParser {
            lexer: Lexer::with_depth_limit(text, max_depth)?,
            max_depth,
            lambda_variables: Vec::new(),
        })
    }

    /// Parses the whole text as a single expression.
    ///
    /// # Errors
    ///
    /// Returns a `Syntax` error if tokens remain after the expression.
    pub fn parse_filter(mut self) -> Result<QueryToken> {
        debug!(text = self.lexer.text(), max_depth = self.max_depth, "parsing filter");
        let expression = self.parse_expression(RecursionBudget::new(self.max_depth))?;
        self.expect_end()?;
        Ok(expression.token)
    }

    /// Parses `expr [asc|desc] (, expr [asc|desc])*`.
    ///
    /// Each item starts from the full budget.
    ///
    /// # Errors
    ///
    /// Returns a `Syntax` error if tokens remain after the last item.
    pub fn parse_order_by(mut self) -> Result<Vec<OrderByToken>> {
        debug!(text = self.lexer.text(), max_depth = self.max_depth, "parsing orderby");
        let mut items = Vec::new();
        loop {
            let expression = self.parse_expression(RecursionBudget::new(self.max_depth))?.token;
            let direction = if self.lexer.current().is_identifier("asc") {
                self.lexer.next_token()?;
                OrderByDirection::Ascending
            } else if self.lexer.current().is_identifier("desc") {
                self.lexer.next_token()?;
                OrderByDirection::Descending
            } else {
                OrderByDirection::Ascending
            };
            items.push(OrderByToken {
                expression,
                direction,
            });
            if self.lexer.current().kind != TokenKind::Comma {
                break;
            }
            self.lexer.next_token()?;
        }
        self.expect_end()?;
        Ok(items)
    }

    fn expect_end(&self) -> Result<()> {
        if self.lexer.at_end() {
            Ok(())
        } else {
            let token = self.lexer.current();
            Err(QueryError::syntax(
                token.position,
                format!("unexpected {} after expression", token.describe()),
            ))
        }
    }

    fn parse_expression(&mut self, budget: RecursionBudget) -> Result<Parsed> {
        let budget = budget.descend()?;
        ensure_stack(|| self.parse_binary(1, budget))
    }

    /// Checks a newly built token against the depth limit.
    fn node(&self, token: QueryToken, height: usize) -> Result<Parsed> {
        if height > self.max_depth {
            return Err(QueryError::RecursionLimitExceeded {
                limit: self.max_depth,
            });
        }
        Ok(Parsed { token, height })
    }

    fn parse_binary(&mut self, min_precedence: u8, budget: RecursionBudget) -> Result<Parsed> {
        let mut left = self.parse_unary(budget)?;
        while let Some(op) = self.current_binary_operator() {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.lexer.next_token()?;
            let right = self.parse_binary(precedence + 1, budget)?;
            // Left-associative chains deepen the tree without recursing.
            let height = left.height.max(right.height) + 1;
            left = self.node(QueryToken::binary(op, left.token, right.token), height)?;
        }
        Ok(left)
    }

    fn current_binary_operator(&self) -> Option<BinaryOperatorKind> {
        let token = self.lexer.current();
        if token.kind == TokenKind::Identifier {
            BinaryOperatorKind::parse(&token.text)
        } else {
            None
        }
    }

    fn parse_unary(&mut self, budget: RecursionBudget) -> Result<Parsed> {
        let op = if self.lexer.current().is_identifier("not") {
            UnaryOperatorKind::Not
        } else if self.lexer.current().kind == TokenKind::Minus {
            UnaryOperatorKind::Negate
        } else {
            return self.parse_postfix(budget);
        };
        self.lexer.next_token()?;
        let budget = budget.descend()?;
        let operand = ensure_stack(|| self.parse_unary(budget))?;
        self.node(
            QueryToken::UnaryOperator {
                op,
                operand: Box::new(operand.token),
            },
            operand.height + 1,
        )
    }

    /// Primary followed by any number of `/member` steps.
    fn parse_postfix(&mut self, budget: RecursionBudget) -> Result<Parsed> {
        let mut parsed = self.parse_primary(budget)?;
        while self.lexer.current().kind == TokenKind::Slash {
            self.lexer.next_token()?;
            parsed = self.parse_member_access(parsed, budget)?;
        }
        Ok(parsed)
    }

    fn parse_primary(&mut self, budget: RecursionBudget) -> Result<Parsed> {
        let current = self.lexer.current().clone();
        match current.kind {
            TokenKind::Literal(value) => {
                self.lexer.next_token()?;
                self.node(QueryToken::literal(value, current.text), 1)
            }
            TokenKind::OpenParen => {
                self.lexer.next_token()?;
                let inner = self.parse_expression(budget)?;
                self.lexer.expect(&TokenKind::CloseParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Identifier => {
                let name = self.lexer.read_dotted_identifier(false)?;
                if self.lexer.current().kind == TokenKind::OpenParen {
                    return self.parse_call(name, None, budget);
                }
                self.node(QueryToken::path(vec![segment_for(name)]), 1)
            }
            _ => Err(QueryError::syntax(
                current.position,
                format!("expected expression, found {}", current.describe()),
            )),
        }
    }

    /// Parses the step after a `/`: a lambda, a bound call, a type cast or
    /// a member name.
    fn parse_member_access(&mut self, source: Parsed, budget: RecursionBudget) -> Result<Parsed> {
        let current = self.lexer.current().clone();
        if current.kind != TokenKind::Identifier {
            return Err(QueryError::syntax(
                current.position,
                format!("expected member name after '/', found {}", current.describe()),
            ));
        }
        let lambda_kind = match current.text.as_str() {
            "any" => Some(LambdaKind::Any),
            "all" => Some(LambdaKind::All),
            _ => None,
        };
        if let Some(kind) = lambda_kind {
            if self.lexer.peek()?.kind == TokenKind::OpenParen {
                self.lexer.next_token()?;
                return self.parse_lambda(kind, source, budget);
            }
        }

        let name = self.lexer.read_dotted_identifier(false)?;
        if self.lexer.current().kind == TokenKind::OpenParen {
            return self.parse_call(name, Some(source), budget);
        }
        // Each segment becomes its own node once bound.
        self.node(append_segment(source.token, segment_for(name)), source.height + 1)
    }

    fn parse_call(
        &mut self,
        name: String,
        source: Option<Parsed>,
        budget: RecursionBudget,
    ) -> Result<Parsed> {
        let open = self.lexer.expect(&TokenKind::OpenParen, "'('")?;
        let mut height = source.as_ref().map_or(0, |source| source.height);
        let mut arguments = Vec::new();
        if self.lexer.current().kind == TokenKind::CloseParen {
            if !name.contains('.') && !NULLARY_FUNCTIONS.contains(&name.as_str()) {
                return Err(QueryError::syntax(
                    open.position,
                    format!("function '{name}' requires arguments"),
                ));
            }
        } else {
            loop {
                let (argument, argument_height) = self.parse_argument(budget)?;
                height = height.max(argument_height);
                arguments.push(argument);
                if self.lexer.current().kind != TokenKind::Comma {
                    break;
                }
                self.lexer.next_token()?;
            }
        }
        self.lexer.expect(&TokenKind::CloseParen, "')' or ','")?;
        trace!(function = %name, arity = arguments.len(), "parsed call");
        self.node(
            QueryToken::FunctionCall(FunctionCallToken {
                name,
                arguments,
                source: source.map(|source| Box::new(source.token)),
            }),
            height + 1,
        )
    }

    fn parse_argument(&mut self, budget: RecursionBudget) -> Result<(FunctionArgument, usize)> {
        let named = self.lexer.current().kind == TokenKind::Identifier
            && self.lexer.peek()?.kind == TokenKind::Equal;
        let name = if named {
            let name = self.lexer.expect_identifier()?;
            self.lexer.next_token()?;
            Some(name)
        } else {
            None
        };
        let value = self.parse_expression(budget)?;
        Ok((
            FunctionArgument {
                name,
                value: value.token,
            },
            value.height,
        ))
    }

    /// Parses `(var: body)`, `(body)` or `()` after `any`/`all`.
    fn parse_lambda(&mut self, kind: LambdaKind, parent: Parsed, budget: RecursionBudget) -> Result<Parsed> {
        let open = self.lexer.expect(&TokenKind::OpenParen, "'('")?;
        if self.lexer.current().kind == TokenKind::CloseParen {
            if kind == LambdaKind::All {
                return Err(QueryError::syntax(
                    open.position,
                    "'all' requires a lambda expression",
                ));
            }
            self.lexer.next_token()?;
            return self.node(
                QueryToken::Lambda(LambdaToken {
                    kind,
                    parent: Box::new(parent.token),
                    variable: None,
                    body: Box::new(QueryToken::literal(LiteralValue::Boolean(true), "true")),
                }),
                parent.height.max(1) + 1,
            );
        }

        let has_variable = self.lexer.current().kind == TokenKind::Identifier
            && self.lexer.peek()?.kind == TokenKind::Colon;
        let variable = if has_variable {
            let position = self.lexer.position();
            let name = self.lexer.expect_identifier()?;
            if name == IMPLICIT_VARIABLE || self.lambda_variables.contains(&name) {
                return Err(QueryError::syntax(
                    position,
                    format!("range variable '{name}' is already in use"),
                ));
            }
            self.lexer.expect(&TokenKind::Colon, "':'")?;
            self.lambda_variables.push(name.clone());
            Some(name)
        } else {
            None
        };

        let body = self.parse_expression(budget);
        if variable.is_some() {
            self.lambda_variables.pop();
        }
        let body = body?;
        self.lexer.expect(&TokenKind::CloseParen, "')'")?;
        let height = parent.height.max(body.height) + 1;
        self.node(
            QueryToken::Lambda(LambdaToken {
                kind,
                parent: Box::new(parent.token),
                variable,
                body: Box::new(body.token),
            }),
            height,
        )
    }
}

/// Token together with its height, the longest chain of nodes it binds to.
#[derive(Debug)]
struct Parsed {
    token: QueryToken,
    height: usize,
}

fn segment_for(name: String) -> PathSegmentToken {
    if name.contains('.') {
        PathSegmentToken::TypeCast(name)
    } else {
        PathSegmentToken::Identifier(name)
    }
}

fn append_segment(source: QueryToken, segment: PathSegmentToken) -> QueryToken {
    match source {
        QueryToken::Path(mut path) => {
            path.segments.push(segment);
            QueryToken::Path(path)
        }
        other => QueryToken::Path(PathToken {
            source: Some(Box::new(other)),
            segments: vec![segment],
        }),
    }
}
