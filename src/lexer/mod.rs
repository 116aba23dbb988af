//! Lexer for query option text.
//!
//! Token recognition is driven by a pest grammar (`token.pest`) matched one
//! token at a time; this module decodes literal values and provides the
//! single-token look-ahead and raw balanced-text scans the parsers need.

mod token;

pub use token::{Token, TokenKind};

use chrono::{DateTime, NaiveDate, NaiveTime};
use pest::error::{Error as PestError, ErrorVariant};
use pest::Parser;
use pest_derive::Parser;
use uuid::Uuid;

use crate::error::{QueryError, Result};
use crate::types::LiteralValue;

#[derive(Parser)]
#[grammar = "lexer/token.pest"]
struct TokenGrammar;

/// Tokenizer over a single query option value.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    text: &'a str,
    current: Token,
    depth_limit: Option<usize>,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer positioned on the first token of `text`.
    ///
    /// # Errors
    ///
    /// Returns a `Lexical` error if the first token is malformed.
    pub fn new(text: &'a str) -> Result<Self> {
        Self::start(text, None)
    }

    /// Creates a lexer for a parser running under a `max_depth` budget.
    ///
    /// Native stack exhaustion while lexing is then reported as
    /// `RecursionLimitExceeded` for that limit.
    ///
    /// # Errors
    ///
    /// Returns a `Lexical` error if the first token is malformed.
    pub fn with_depth_limit(text: &'a str, max_depth: usize) -> Result<Self> {
        Self::start(text, Some(max_depth))
    }

    fn start(text: &'a str, depth_limit: Option<usize>) -> Result<Self> {
        let current = lex_at(text, 0, depth_limit)?;
        Ok(Lexer {
            text,
            current,
            depth_limit,
        })
    }

    /// Returns the full text being tokenized.
    #[must_use]
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Returns the current token.
    #[must_use]
    pub fn current(&self) -> &Token {
        &self.current
    }

    /// Returns the byte offset of the current token.
    #[must_use]
    pub fn position(&self) -> usize {
        self.current.position
    }

    /// Returns true once the end of the text has been reached.
    #[must_use]
    pub fn at_end(&self) -> bool {
        self.current.kind == TokenKind::End
    }

    /// Advances to the next token and returns it.
    ///
    /// # Errors
    ///
    /// Returns a `Lexical` error if the next token is malformed.
    pub fn next_token(&mut self) -> Result<&Token> {
        if self.current.kind != TokenKind::End {
            self.current = lex_at(self.text, self.current.end(), self.depth_limit)?;
        }
        Ok(&self.current)
    }

    /// Returns the token after the current one without consuming anything.
    ///
    /// # Errors
    ///
    /// Returns a `Lexical` error if the next token is malformed.
    pub fn peek(&self) -> Result<Token> {
        if self.current.kind == TokenKind::End {
            return Ok(self.current.clone());
        }
        lex_at(self.text, self.current.end(), self.depth_limit)
    }

    /// Consumes the current token if it has the given kind.
    ///
    /// # Errors
    ///
    /// Returns a `Syntax` error naming `what` if the kind does not match.
    pub fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<Token> {
        if &self.current.kind != kind {
            return Err(QueryError::syntax(
                self.current.position,
                format!("expected {what}, found {}", self.current.describe()),
            ));
        }
        let token = self.current.clone();
        self.next_token()?;
        Ok(token)
    }

    /// Consumes an identifier token and returns its text.
    ///
    /// # Errors
    ///
    /// Returns a `Syntax` error if the current token is not an identifier.
    pub fn expect_identifier(&mut self) -> Result<String> {
        Ok(self.expect(&TokenKind::Identifier, "identifier")?.text)
    }

    /// Reads `Identifier(.Identifier)*` and returns the dotted name.
    ///
    /// # Errors
    ///
    /// Returns a `Syntax` error if a dot is not followed by an identifier.
    pub fn read_dotted_identifier(&mut self, allow_star: bool) -> Result<String> {
        let mut name = self.expect_identifier()?;
        while self.current.kind == TokenKind::Dot {
            self.next_token()?;
            if allow_star && self.current.kind == TokenKind::Star {
                name.push_str(".*");
                self.next_token()?;
                break;
            }
            name.push('.');
            name.push_str(&self.expect_identifier()?);
        }
        Ok(name)
    }

    /// Reads raw text starting at the current token up to, but excluding,
    /// the first `;` or unbalanced `)` outside a quoted literal, then lexes
    /// the delimiter as the new current token.
    ///
    /// Used to slice one nested option value out of an option list without
    /// tokenizing it.
    ///
    /// # Errors
    ///
    /// Returns a `Lexical` error on an unterminated quoted literal.
    pub fn read_option_value(&mut self) -> Result<&'a str> {
        let start = self.current.position;
        let end = scan_balanced(self.text, start, true)?;
        self.current = lex_at(self.text, end, self.depth_limit)?;
        Ok(self.text[start..end].trim())
    }

    /// With the current token on `(`, returns the raw text between it and
    /// its matching `)` and moves to the token after the `)`.
    ///
    /// # Errors
    ///
    /// Returns a `Syntax` error if the current token is not `(` or the
    /// parenthesis is never closed, and a `Lexical` error on an unterminated
    /// quoted literal.
    pub fn advance_through_balanced_parentheses(&mut self) -> Result<&'a str> {
        let open = self.expect_position(&TokenKind::OpenParen, "'('")?;
        let start = open + 1;
        let end = scan_balanced(self.text, start, false)?;
        if end >= self.text.len() {
            return Err(QueryError::syntax(open, "unbalanced parentheses"));
        }
        // `end` is the matching ')'.
        self.current = lex_at(self.text, end + 1, self.depth_limit)?;
        Ok(&self.text[start..end])
    }

    fn expect_position(&self, kind: &TokenKind, what: &str) -> Result<usize> {
        if &self.current.kind == kind {
            Ok(self.current.position)
        } else {
            Err(QueryError::syntax(
                self.current.position,
                format!("expected {what}, found {}", self.current.describe()),
            ))
        }
    }
}

/// Returns the offset of the first depth-zero `)` (or `;` when
/// `stop_at_semicolon`) at or after `start`, or the text length.
fn scan_balanced(text: &str, start: usize, stop_at_semicolon: bool) -> Result<usize> {
    let mut depth = 0usize;
    let mut quote_start: Option<usize> = None;
    for (offset, ch) in text[start..].char_indices() {
        let at = start + offset;
        if ch == '\'' {
            // A doubled quote toggles twice and stays inside the literal.
            quote_start = match quote_start {
                Some(_) => None,
                None => Some(at),
            };
            continue;
        }
        if quote_start.is_some() {
            continue;
        }
        match ch {
            '(' => depth += 1,
            ')' if depth == 0 => return Ok(at),
            ')' => depth -= 1,
            ';' if depth == 0 && stop_at_semicolon => return Ok(at),
            _ => {}
        }
    }
    if let Some(at) = quote_start {
        return Err(QueryError::lexical(at, "unterminated string literal"));
    }
    Ok(text.len())
}

/// Lexes the token starting at or after byte offset `pos`.
fn lex_at(text: &str, pos: usize, depth_limit: Option<usize>) -> Result<Token> {
    let rest = &text[pos..];
    let trimmed = rest.trim_start_matches(|c: char| matches!(c, ' ' | '\t' | '\r' | '\n'));
    let position = pos + (rest.len() - trimmed.len());
    if trimmed.is_empty() {
        return Ok(Token::new(TokenKind::End, String::new(), text.len()));
    }

    let mut pairs = TokenGrammar::parse(Rule::token, trimmed).map_err(|err| {
        grammar_error(&err, depth_limit, position)
            .unwrap_or_else(|| unrecognized_token(trimmed, position))
    })?;
    let Some(pair) = pairs.next().and_then(|token| token.into_inner().next()) else {
        return Err(unrecognized_token(trimmed, position));
    };
    let raw = pair.as_str();
    let kind = match pair.as_rule() {
        Rule::identifier => TokenKind::Identifier,
        Rule::open_paren => TokenKind::OpenParen,
        Rule::close_paren => TokenKind::CloseParen,
        Rule::comma => TokenKind::Comma,
        Rule::slash => TokenKind::Slash,
        Rule::colon => TokenKind::Colon,
        Rule::semicolon => TokenKind::Semicolon,
        Rule::equal => TokenKind::Equal,
        Rule::dot => TokenKind::Dot,
        Rule::star => TokenKind::Star,
        Rule::minus => TokenKind::Minus,
        rule => TokenKind::Literal(decode_literal(rule, raw, position, depth_limit)?),
    };
    Ok(Token::new(kind, raw.to_string(), position))
}

/// Maps pest's call and stack guards, which it raises as custom errors, to
/// the caller's nesting limit. Returns `None` for an ordinary mismatch.
fn grammar_error(
    err: &PestError<Rule>,
    depth_limit: Option<usize>,
    position: usize,
) -> Option<QueryError> {
    let ErrorVariant::CustomError { message } = &err.variant else {
        return None;
    };
    Some(match depth_limit {
        Some(limit) => QueryError::RecursionLimitExceeded { limit },
        None => QueryError::lexical(position, message.clone()),
    })
}

fn unrecognized_token(rest: &str, position: usize) -> QueryError {
    let mut chars = rest.chars();
    let first = chars.next().unwrap_or(' ');
    let second = chars.next();
    if first == '\'' {
        QueryError::lexical(position, "unterminated string literal")
    } else if first.is_ascii_digit() || (first == '-' && second.is_some_and(|c| c.is_ascii_digit())) {
        let word: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '+'))
            .collect();
        QueryError::lexical(position, format!("malformed numeric literal '{word}'"))
    } else {
        QueryError::lexical(position, format!("unexpected character '{first}'"))
    }
}

fn strip_suffix_ci<'s>(raw: &'s str, suffix: char) -> &'s str {
    raw.strip_suffix(suffix)
        .or_else(|| raw.strip_suffix(suffix.to_ascii_uppercase()))
        .unwrap_or(raw)
}

/// Returns the text between the first `'` and the trailing `'`.
fn quoted_body(raw: &str) -> &str {
    let start = raw.find('\'').map_or(0, |i| i + 1);
    let end = raw.len().saturating_sub(1).max(start);
    &raw[start..end]
}

fn decode_literal(
    rule: Rule,
    raw: &str,
    position: usize,
    depth_limit: Option<usize>,
) -> Result<LiteralValue> {
    let malformed = |what: &str| QueryError::lexical(position, format!("malformed {what} literal '{raw}'"));
    let value = match rule {
        Rule::string_literal => LiteralValue::String(quoted_body(raw).replace("''", "'")),
        Rule::true_literal => LiteralValue::Boolean(true),
        Rule::false_literal => LiteralValue::Boolean(false),
        Rule::null_literal => LiteralValue::Null,
        Rule::int_literal => match raw.parse::<i32>() {
            Ok(v) => LiteralValue::Int32(v),
            Err(_) => LiteralValue::Int64(raw.parse::<i64>().map_err(|_| malformed("integer"))?),
        },
        Rule::int64_literal => LiteralValue::Int64(
            strip_suffix_ci(raw, 'l')
                .parse::<i64>()
                .map_err(|_| malformed("integer"))?,
        ),
        Rule::decimal_literal => LiteralValue::Decimal(strip_suffix_ci(raw, 'm').to_string()),
        Rule::double_literal => LiteralValue::Double(
            strip_suffix_ci(raw, 'd')
                .parse::<f64>()
                .map_err(|_| malformed("double"))?,
        ),
        Rule::single_literal => LiteralValue::Single(
            strip_suffix_ci(raw, 'f')
                .parse::<f32>()
                .map_err(|_| malformed("single"))?,
        ),
        Rule::special_float_literal => LiteralValue::Double(match raw {
            "INF" => f64::INFINITY,
            "-INF" => f64::NEG_INFINITY,
            _ => f64::NAN,
        }),
        Rule::guid_literal => LiteralValue::Guid(Uuid::parse_str(raw).map_err(|_| malformed("guid"))?),
        Rule::date_literal => LiteralValue::Date(
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| malformed("date"))?,
        ),
        Rule::datetimeoffset_literal => LiteralValue::DateTimeOffset(
            DateTime::parse_from_rfc3339(&normalize_date_time(raw))
                .map_err(|_| malformed("datetimeoffset"))?,
        ),
        Rule::timeofday_literal => LiteralValue::TimeOfDay(
            NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
                .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
                .map_err(|_| malformed("timeofday"))?,
        ),
        Rule::duration_literal => {
            let body = quoted_body(raw);
            TokenGrammar::parse(Rule::duration_value, body).map_err(|err| {
                grammar_error(&err, depth_limit, position).unwrap_or_else(|| malformed("duration"))
            })?;
            LiteralValue::Duration(body.to_string())
        }
        Rule::binary_literal => LiteralValue::Binary(quoted_body(raw).to_string()),
        Rule::enum_literal => {
            let quote = raw.find('\'').unwrap_or(raw.len());
            LiteralValue::Enum {
                type_name: raw[..quote].to_string(),
                member: quoted_body(raw).to_string(),
            }
        }
        _ => return Err(QueryError::lexical(position, format!("unexpected token '{raw}'"))),
    };
    Ok(value)
}

/// Rewrites `Z` offsets and minute-precision times into RFC 3339 form.
fn normalize_date_time(raw: &str) -> String {
    let (date, rest) = raw.split_once('T').unwrap_or((raw, ""));
    let offset_at = rest
        .find(|c| matches!(c, 'Z' | '+' | '-'))
        .unwrap_or(rest.len());
    let (time, offset) = rest.split_at(offset_at);
    let time = if time.len() == 5 {
        format!("{time}:00")
    } else {
        time.to_string()
    };
    let offset = if offset == "Z" { "+00:00" } else { offset };
    format!("{date}T{time}{offset}")
}
