//! Predicate expressions over record attributes.

use super::lexer::{tokenize, Token};
use crate::error::{CoreError, CoreResult};
use crate::record::Record;
use crate::schema::{Role, Schema};
use persist_codec::{Converter, Datatype, Operand, Operator, Regex, Value};
use std::fmt;

/// A boolean condition over one record.
///
/// Comparisons are resolved against a schema when built: the attribute
/// must exist and be stored, literals are coerced to the attribute's
/// datatype and patterns are compiled. Evaluation therefore only fails if
/// a stored value is outside its datatype.
///
/// # Grammar
///
/// ```text
/// expr       := or
/// or         := and (("or" | "||") and)*
/// and        := unary (("and" | "&&") unary)*
/// unary      := ("not" | "!") unary | "(" expr ")" | comparison
/// comparison := IDENT op literal
///             | IDENT ["not"] "like" STRING
/// op         := "=" | "==" | "!=" | "<>" | "<" | "<=" | ">" | ">=" | "=~" | "!~"
/// literal    := STRING | NUMBER | "null" | /REGEX/
/// ```
///
/// Keywords are case-insensitive. `like` patterns use `%` for any run of
/// characters and `_` for one character, and must match the whole value.
/// An empty expression matches every record.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every record.
    All,
    /// `attribute <operator> operand`.
    Compare {
        /// Attribute name.
        attribute: String,
        /// Declaration position of the attribute.
        position: usize,
        /// Datatype the comparison is made in.
        datatype: Datatype,
        /// Comparison or pattern operator.
        operator: Operator,
        /// Coerced literal or compiled pattern.
        operand: Operand,
    },
    /// Both sides hold.
    And(Box<Predicate>, Box<Predicate>),
    /// Either side holds.
    Or(Box<Predicate>, Box<Predicate>),
    /// The inner predicate does not hold.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Parses a predicate expression against a schema.
    ///
    /// # Errors
    ///
    /// Returns a query error for malformed input, unknown or transient
    /// attributes, literals outside the attribute's datatype, or invalid
    /// regular expressions.
    pub fn parse(input: &str, schema: &Schema) -> CoreResult<Self> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Ok(Predicate::All);
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            schema,
        };
        let predicate = parser.or()?;
        if let Some(token) = parser.peek() {
            return Err(CoreError::query(format!(
                "unexpected {token:?} after complete expression"
            )));
        }
        Ok(predicate)
    }

    /// Builds `attribute <operator> value`, coercing `value` to the
    /// attribute's datatype.
    ///
    /// # Errors
    ///
    /// Returns a query error if the attribute cannot be queried, the
    /// operator is a pattern operator, or the value does not coerce.
    pub fn compare(
        schema: &Schema,
        attribute: &str,
        operator: Operator,
        value: impl Into<Value>,
    ) -> CoreResult<Self> {
        if operator.is_pattern() {
            return Err(CoreError::query(format!(
                "operator {operator} takes a pattern"
            )));
        }
        let (position, datatype) = resolve(schema, attribute)?;
        let value = datatype
            .coerce(value.into())
            .map_err(|e| CoreError::query(format!("`{attribute}`: {e}")))?;
        Ok(Predicate::Compare {
            attribute: attribute.to_string(),
            position,
            datatype,
            operator,
            operand: Operand::Value(value),
        })
    }

    /// Builds `attribute =~ /pattern/` (or `!~` when `negated`).
    ///
    /// # Errors
    ///
    /// Returns a query error if the attribute cannot be queried or the
    /// pattern does not compile.
    pub fn pattern(schema: &Schema, attribute: &str, pattern: &str, negated: bool) -> CoreResult<Self> {
        let (position, datatype) = resolve(schema, attribute)?;
        let regex = Regex::new(pattern)
            .map_err(|e| CoreError::query(format!("invalid pattern for `{attribute}`: {e}")))?;
        Ok(Predicate::Compare {
            attribute: attribute.to_string(),
            position,
            datatype,
            operator: if negated {
                Operator::NotMatches
            } else {
                Operator::Matches
            },
            operand: Operand::Pattern(regex),
        })
    }

    /// Conjunction with another predicate.
    #[must_use]
    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    /// Disjunction with another predicate.
    #[must_use]
    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    /// Evaluates the predicate against a record.
    ///
    /// # Errors
    ///
    /// Returns a datatype error if a compared value cannot be serialized
    /// for pattern matching.
    pub fn evaluate(&self, record: &Record) -> CoreResult<bool> {
        match self {
            Predicate::All => Ok(true),
            Predicate::Compare {
                position,
                datatype,
                operator,
                operand,
                ..
            } => {
                let value = record.get(*position).unwrap_or(&Value::Null);
                Ok(datatype.matches(value, *operator, operand)?)
            }
            Predicate::And(a, b) => Ok(a.evaluate(record)? && b.evaluate(record)?),
            Predicate::Or(a, b) => Ok(a.evaluate(record)? || b.evaluate(record)?),
            Predicate::Not(inner) => Ok(!inner.evaluate(record)?),
        }
    }
}

impl std::ops::Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Self::Output {
        Predicate::Not(Box::new(self))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::All => f.write_str("true"),
            Predicate::Compare {
                attribute,
                operator,
                operand,
                ..
            } => write!(f, "{attribute} {operator} {operand}"),
            Predicate::And(a, b) => write!(f, "({a} and {b})"),
            Predicate::Or(a, b) => write!(f, "({a} or {b})"),
            Predicate::Not(inner) => write!(f, "not {inner}"),
        }
    }
}

fn resolve(schema: &Schema, attribute: &str) -> CoreResult<(usize, Datatype)> {
    let (position, descriptor) = schema
        .require(attribute)
        .map_err(|_| CoreError::query(format!("unknown attribute `{attribute}`")))?;
    if descriptor.role == Role::Transient {
        return Err(CoreError::query(format!(
            "attribute `{attribute}` is transient and cannot be queried"
        )));
    }
    Ok((position, descriptor.datatype.clone()))
}

/// Translates a `like` pattern into an anchored regular expression.
fn like_to_regex(pattern: &str) -> String {
    let mut out = String::from("(?s)^");
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    out.push('$');
    out
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    schema: &'a Schema,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> CoreResult<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| CoreError::query("unexpected end of expression"))?;
        self.pos += 1;
        Ok(token)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> CoreResult<Predicate> {
        let mut left = self.and()?;
        while self.eat(&Token::Or) {
            left = left.or(self.and()?);
        }
        Ok(left)
    }

    fn and(&mut self) -> CoreResult<Predicate> {
        let mut left = self.unary()?;
        while self.eat(&Token::And) {
            left = left.and(self.unary()?);
        }
        Ok(left)
    }

    fn unary(&mut self) -> CoreResult<Predicate> {
        if self.eat(&Token::Not) {
            return Ok(!self.unary()?);
        }
        if self.eat(&Token::LParen) {
            let inner = self.or()?;
            if !self.eat(&Token::RParen) {
                return Err(CoreError::query("expected `)`"));
            }
            return Ok(inner);
        }
        self.comparison()
    }

    fn comparison(&mut self) -> CoreResult<Predicate> {
        let attribute = match self.next()? {
            Token::Ident(name) => name,
            other => {
                return Err(CoreError::query(format!(
                    "expected attribute name, found {other:?}"
                )))
            }
        };

        match self.next()? {
            Token::Like => self.like(&attribute, false),
            Token::Not => {
                if self.eat(&Token::Like) {
                    self.like(&attribute, true)
                } else {
                    Err(CoreError::query(format!(
                        "expected `like` after `{attribute} not`"
                    )))
                }
            }
            Token::Op(op) if op.is_pattern() => match self.next()? {
                Token::Regex(pattern) | Token::Str(pattern) => Predicate::pattern(
                    self.schema,
                    &attribute,
                    &pattern,
                    op == Operator::NotMatches,
                ),
                other => Err(CoreError::query(format!(
                    "operator {op} expects a pattern, found {other:?}"
                ))),
            },
            Token::Op(op) => {
                let value = match self.next()? {
                    Token::Str(text) => Value::Text(text),
                    Token::Number(n) => Value::Number(n),
                    Token::Null => Value::Null,
                    other => {
                        return Err(CoreError::query(format!(
                            "operator {op} expects a literal, found {other:?}"
                        )))
                    }
                };
                Predicate::compare(self.schema, &attribute, op, value)
            }
            other => Err(CoreError::query(format!(
                "expected operator after `{attribute}`, found {other:?}"
            ))),
        }
    }

    fn like(&mut self, attribute: &str, negated: bool) -> CoreResult<Predicate> {
        match self.next()? {
            Token::Str(pattern) => {
                Predicate::pattern(self.schema, attribute, &like_to_regex(&pattern), negated)
            }
            other => Err(CoreError::query(format!(
                "like expects a string pattern, found {other:?}"
            ))),
        }
    }
}
