//! Predicate operators understood by every converter.

use crate::value::Value;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

/// A comparison or pattern operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `=~`: the value matches a regular expression.
    Matches,
    /// `!~`: the value does not match a regular expression.
    NotMatches,
}

impl Operator {
    /// The operator's textual symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Matches => "=~",
            Operator::NotMatches => "!~",
        }
    }

    /// Whether this operator takes a pattern rather than a value.
    pub fn is_pattern(self) -> bool {
        matches!(self, Operator::Matches | Operator::NotMatches)
    }

    /// Whether a comparison result satisfies this operator.
    ///
    /// Pattern operators never hold for an ordering.
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Ne => ordering != Ordering::Equal,
            Operator::Lt => ordering == Ordering::Less,
            Operator::Le => ordering != Ordering::Greater,
            Operator::Gt => ordering == Ordering::Greater,
            Operator::Ge => ordering != Ordering::Less,
            Operator::Matches | Operator::NotMatches => false,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Right-hand side of a predicate comparison.
#[derive(Debug, Clone)]
pub enum Operand {
    /// A literal already coerced to the attribute's datatype.
    Value(Value),
    /// A compiled regular expression.
    Pattern(Regex),
}

impl PartialEq for Operand {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Operand::Value(a), Operand::Value(b)) => a == b,
            (Operand::Pattern(a), Operand::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(v) => write!(f, "{v}"),
            Operand::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}
