//! Parsers for `$select`/`$expand` term lists and per-term option lists.
//!
//! Term options are sliced out as raw balanced text and handed to a fresh
//! parser; nested `$expand` text gets one level less of budget than its
//! parent, while nested `$filter`, `$orderby` and `$select` inside an expand
//! term keep the parent's depth.

use tracing::debug;

use crate::error::{QueryError, Result};
use crate::lexer::{Lexer, TokenKind};
use crate::parser::ast::{
    ExpandLevels, ExpandTermToken, ExpandToken, SelectExpandPath, SelectTermToken, SelectToken,
};
use crate::parser::{ensure_stack, ExpressionParser, RecursionBudget};

/// Parser for a comma-separated list of select or expand terms.
#[derive(Debug, Clone)]
pub struct SelectExpandParser<'a> {
    text: &'a str,
    budget: RecursionBudget,
}

impl<'a> SelectExpandParser<'a> {
    /// Creates a parser over `text` with the given recursion budget.
    #[must_use]
    pub fn new(text: &'a str, max_depth: usize) -> Self {
        Self::with_budget(text, RecursionBudget::new(max_depth))
    }

    pub(crate) fn with_budget(text: &'a str, budget: RecursionBudget) -> Self {
        SelectExpandParser { text, budget }
    }

    /// Parses `$select` text.
    ///
    /// # Errors
    ///
    /// Returns `Syntax` on malformed terms and `RecursionLimitExceeded` when
    /// no budget remains.
    pub fn parse_select(self) -> Result<SelectToken> {
        debug!(text = self.text, depth = self.budget.remaining(), "parsing select");
        // The list itself must fit; its options still start from this budget.
        let _list_level = self.budget.descend()?;
        let options = ExpandOptionParser::for_select(self.budget);
        let terms = ensure_stack(|| {
            self.parse_terms(|path, raw| match raw {
                Some(raw) => options.with_text(raw).parse_select_term(path),
                None => Ok(SelectTermToken {
                    path,
                    ..SelectTermToken::default()
                }),
            })
        })?;
        Ok(SelectToken { terms })
    }

    /// Parses `$expand` text.
    ///
    /// # Errors
    ///
    /// Returns `Syntax` on malformed terms or options and
    /// `RecursionLimitExceeded` when nesting exhausts the budget.
    pub fn parse_expand(self) -> Result<ExpandToken> {
        debug!(text = self.text, depth = self.budget.remaining(), "parsing expand");
        // Nested `$expand` text descends again when its option is applied.
        let _list_level = self.budget.descend()?;
        let options = ExpandOptionParser::for_expand(self.budget);
        let terms = ensure_stack(|| {
            self.parse_terms(|path, raw| match raw {
                Some(raw) => options.with_text(raw).parse_expand_term(path),
                None => Ok(ExpandTermToken {
                    path,
                    ..ExpandTermToken::default()
                }),
            })
        })?;
        Ok(ExpandToken { terms })
    }

    fn parse_terms<T>(
        &self,
        mut build: impl FnMut(SelectExpandPath, Option<&'a str>) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut lexer = Lexer::with_depth_limit(self.text, self.budget.limit())?;
        let mut terms = Vec::new();
        if lexer.at_end() {
            return Ok(terms);
        }
        loop {
            let path = read_path(&mut lexer)?;
            let raw = if lexer.current().kind == TokenKind::OpenParen {
                let position = lexer.position();
                let raw = lexer.advance_through_balanced_parentheses()?;
                if raw.trim().is_empty() {
                    return Err(QueryError::syntax(position, "empty option list '()'"));
                }
                Some(raw)
            } else {
                None
            };
            terms.push(build(path, raw)?);

            let current = lexer.current().clone();
            match current.kind {
                TokenKind::Comma => {
                    lexer.next_token()?;
                }
                TokenKind::End => break,
                _ => {
                    return Err(QueryError::syntax(
                        current.position,
                        format!("expected ',' or end of text, found {}", current.describe()),
                    ))
                }
            }
        }
        Ok(terms)
    }
}

/// Reads `segment(/segment)*` where a segment is `*`, `NS.*`, a qualified
/// type name or a member name.
fn read_path(lexer: &mut Lexer<'_>) -> Result<SelectExpandPath> {
    let mut segments = Vec::new();
    loop {
        let current = lexer.current().clone();
        let segment = match current.kind {
            TokenKind::Star => {
                lexer.next_token()?;
                "*".to_string()
            }
            TokenKind::Identifier => lexer.read_dotted_identifier(true)?,
            _ => {
                return Err(QueryError::syntax(
                    current.position,
                    format!("expected path segment, found {}", current.describe()),
                ))
            }
        };
        segments.push(segment);
        if lexer.current().kind != TokenKind::Slash {
            break;
        }
        lexer.next_token()?;
    }
    Ok(SelectExpandPath { segments })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TermKind {
    Select,
    Expand,
}

/// Parser for the `;`-separated option list inside a term's parentheses.
#[derive(Debug, Clone)]
pub struct ExpandOptionParser<'a> {
    text: &'a str,
    budget: RecursionBudget,
    kind: TermKind,
}

impl<'a> ExpandOptionParser<'a> {
    /// Creates a parser for the options of an expand term.
    #[must_use]
    pub fn new(text: &'a str, max_depth: usize) -> Self {
        ExpandOptionParser {
            text,
            budget: RecursionBudget::new(max_depth),
            kind: TermKind::Expand,
        }
    }

    fn for_select(budget: RecursionBudget) -> ExpandOptionParser<'static> {
        ExpandOptionParser {
            text: "",
            budget,
            kind: TermKind::Select,
        }
    }

    fn for_expand(budget: RecursionBudget) -> ExpandOptionParser<'static> {
        ExpandOptionParser {
            text: "",
            budget,
            kind: TermKind::Expand,
        }
    }

    fn with_text<'t>(&self, text: &'t str) -> ExpandOptionParser<'t> {
        ExpandOptionParser {
            text,
            budget: self.budget,
            kind: self.kind,
        }
    }

    /// Parses the options into an expand term for `path`.
    ///
    /// # Errors
    ///
    /// Returns `Syntax` on unknown, duplicate or malformed options and on
    /// trailing text, and propagates errors from nested parsers.
    pub fn parse_expand_term(&self, path: SelectExpandPath) -> Result<ExpandTermToken> {
        let mut term = ExpandTermToken {
            path,
            ..ExpandTermToken::default()
        };
        self.for_each_option(|key, position, value| self.apply_option(&mut term, key, position, value))?;
        Ok(term)
    }

    /// Parses the options into a select term for `path`; `$expand` and
    /// `$levels` are rejected.
    ///
    /// # Errors
    ///
    /// Same as [`parse_expand_term`](Self::parse_expand_term).
    pub fn parse_select_term(&self, path: SelectExpandPath) -> Result<SelectTermToken> {
        let select_only = ExpandOptionParser {
            kind: TermKind::Select,
            ..self.clone()
        };
        let term = select_only.parse_expand_term(path)?;
        Ok(SelectTermToken {
            path: term.path,
            filter: term.filter,
            order_by: term.order_by,
            top: term.top,
            skip: term.skip,
            count: term.count,
            select: term.select,
        })
    }

    fn for_each_option(&self, mut apply: impl FnMut(&str, usize, &str) -> Result<()>) -> Result<()> {
        let mut lexer = Lexer::with_depth_limit(self.text, self.budget.limit())?;
        loop {
            let position = lexer.position();
            let key = lexer.expect_identifier()?;
            lexer.expect(&TokenKind::Equal, "'='")?;
            let value = lexer.read_option_value()?;
            apply(&key, position, value)?;

            let current = lexer.current().clone();
            match current.kind {
                TokenKind::Semicolon => {
                    lexer.next_token()?;
                    if lexer.at_end() {
                        return Ok(());
                    }
                }
                TokenKind::End => return Ok(()),
                _ => {
                    return Err(QueryError::syntax(
                        current.position,
                        format!("unexpected {} after option value", current.describe()),
                    ))
                }
            }
        }
    }

    fn apply_option(
        &self,
        term: &mut ExpandTermToken,
        key: &str,
        position: usize,
        value: &str,
    ) -> Result<()> {
        let depth = self.budget.remaining();
        match key {
            "$filter" => set_once(&mut term.filter, key, position, || {
                ExpressionParser::new(value, depth)?.parse_filter()
            }),
            "$orderby" => set_once(&mut term.order_by, key, position, || {
                ExpressionParser::new(value, depth)?.parse_order_by()
            }),
            "$top" => set_once(&mut term.top, key, position, || {
                parse_non_negative(key, position, value)
            }),
            "$skip" => set_once(&mut term.skip, key, position, || {
                parse_non_negative(key, position, value)
            }),
            "$count" => set_once(&mut term.count, key, position, || match value {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(QueryError::syntax(
                    position,
                    format!("$count must be true or false, found '{value}'"),
                )),
            }),
            "$select" => set_once(&mut term.select, key, position, || {
                // Select nested in select consumes a level to bound the recursion.
                let budget = match self.kind {
                    TermKind::Select => self.budget.descend()?,
                    TermKind::Expand => self.budget,
                };
                SelectExpandParser::with_budget(value, budget).parse_select()
            }),
            "$expand" | "$levels" if self.kind == TermKind::Select => Err(QueryError::syntax(
                position,
                format!("{key} is not allowed in a select term"),
            )),
            "$expand" => set_once(&mut term.expand, key, position, || {
                SelectExpandParser::with_budget(value, self.budget.descend()?).parse_expand()
            }),
            "$levels" => set_once(&mut term.levels, key, position, || {
                if value == "max" {
                    return Ok(ExpandLevels::Max);
                }
                value.parse::<u32>().map(ExpandLevels::Count).map_err(|_| {
                    QueryError::syntax(
                        position,
                        format!("$levels must be a non-negative integer or max, found '{value}'"),
                    )
                })
            }),
            _ => Err(QueryError::syntax(position, format!("unknown option '{key}'"))),
        }
    }
}

fn set_once<T>(
    slot: &mut Option<T>,
    key: &str,
    position: usize,
    parse: impl FnOnce() -> Result<T>,
) -> Result<()> {
    if slot.is_some() {
        return Err(QueryError::syntax(position, format!("duplicate option '{key}'")));
    }
    *slot = Some(parse()?);
    Ok(())
}

fn parse_non_negative(key: &str, position: usize, value: &str) -> Result<i64> {
    match value.parse::<i64>() {
        Ok(n) if n >= 0 => Ok(n),
        _ => Err(QueryError::syntax(
            position,
            format!("{key} must be a non-negative integer, found '{value}'"),
        )),
    }
}
