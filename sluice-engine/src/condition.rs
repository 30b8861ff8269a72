//! Filter condition evaluator
//!
//! Grammar: `<field> <operator> <value>`
//!
//! - `field` is an identifier, optionally dotted once (`rating.rate`)
//! - `operator` is one of `==`, `!=`, `>`, `>=`, `<`, `<=`, `contains`
//!   (case-insensitive)
//! - `value` is a quoted string or a bare token
//!
//! A condition that does not match the grammar is treated as "no filter":
//! every record passes. [`Filter::compile`] in strict mode rejects it instead.

use regex::Regex;
use serde_json::Value;
use sluice_core::domain::record::{Record, lookup};
use std::sync::LazyLock;
use thiserror::Error;

static CONDITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\w+(?:\.\w+)?)\s*(==|!=|>=|<=|>|<|contains)\s*(.+?)\s*$")
        .expect("condition pattern is valid")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConditionError {
    #[error("Invalid filter condition '{0}': expected '<field> <operator> <value>'")]
    InvalidCondition(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
}

impl Operator {
    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "==" => Some(Operator::Eq),
            "!=" => Some(Operator::Ne),
            ">" => Some(Operator::Gt),
            ">=" => Some(Operator::Ge),
            "<" => Some(Operator::Lt),
            "<=" => Some(Operator::Le),
            "contains" => Some(Operator::Contains),
            _ => None,
        }
    }
}

/// Right-hand side of a condition
#[derive(Debug, Clone, PartialEq)]
struct Literal {
    text: String,
    number: Option<f64>,
}

impl Literal {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let quoted = raw.len() >= 2
            && ((raw.starts_with('"') && raw.ends_with('"'))
                || (raw.starts_with('\'') && raw.ends_with('\'')));

        if quoted {
            Self {
                text: raw[1..raw.len() - 1].to_string(),
                number: None,
            }
        } else {
            Self {
                text: raw.to_string(),
                number: raw.parse::<f64>().ok().filter(|n| n.is_finite()),
            }
        }
    }
}

/// A parsed filter condition
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    field: String,
    operator: Operator,
    value: Literal,
}

/// How a filter treats malformed input
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Match(Condition),
    /// Malformed condition in lenient mode: everything passes
    PassAll,
}

impl Condition {
    /// Parses a condition; `None` when it does not match the grammar
    pub fn parse(input: &str) -> Option<Self> {
        let captures = CONDITION.captures(input)?;
        let operator = Operator::parse(&captures[2])?;
        Some(Self {
            field: captures[1].to_string(),
            operator,
            value: Literal::parse(&captures[3]),
        })
    }

    pub fn matches(&self, record: &Record) -> bool {
        let actual = lookup(record, &self.field);
        match self.operator {
            Operator::Eq => loose_eq(actual, &self.value),
            Operator::Ne => !loose_eq(actual, &self.value),
            Operator::Gt => compare(actual, &self.value, |a, b| a > b),
            Operator::Ge => compare(actual, &self.value, |a, b| a >= b),
            Operator::Lt => compare(actual, &self.value, |a, b| a < b),
            Operator::Le => compare(actual, &self.value, |a, b| a <= b),
            Operator::Contains => match actual.and_then(string_form) {
                Some(text) => text
                    .to_lowercase()
                    .contains(&self.value.text.to_lowercase()),
                None => false,
            },
        }
    }
}

impl Filter {
    /// Compiles a filter, failing open on malformed input unless `strict`
    pub fn compile(input: &str, strict: bool) -> Result<Self, ConditionError> {
        match Condition::parse(input) {
            Some(condition) => Ok(Filter::Match(condition)),
            None if strict => Err(ConditionError::InvalidCondition(input.to_string())),
            None => {
                tracing::warn!(
                    "Filter condition '{}' is malformed; passing every record through",
                    input
                );
                Ok(Filter::PassAll)
            }
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::Match(condition) => condition.matches(record),
            Filter::PassAll => true,
        }
    }
}

// =============================================================================
// Coercions
// =============================================================================

/// Loose equality: numbers compare numerically, everything else by text
fn loose_eq(actual: Option<&Value>, literal: &Literal) -> bool {
    let Some(actual) = actual else {
        return false;
    };

    if let Some(expected) = literal.number {
        return match actual {
            Value::Number(_) | Value::String(_) | Value::Bool(_) => {
                to_number(actual).is_some_and(|n| n == expected)
            }
            _ => false,
        };
    }

    match actual {
        Value::String(s) => *s == literal.text,
        Value::Bool(b) => literal.text.eq_ignore_ascii_case(if *b { "true" } else { "false" }),
        Value::Null => literal.text.eq_ignore_ascii_case("null"),
        Value::Number(n) => n.to_string() == literal.text,
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Numeric ordering; either side not being a number makes it false
fn compare(actual: Option<&Value>, literal: &Literal, op: impl Fn(f64, f64) -> bool) -> bool {
    let expected = literal
        .number
        .or_else(|| literal.text.trim().parse::<f64>().ok());
    match (actual.and_then(to_number), expected) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    }
}

fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn string_form(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => Some("null".to_string()),
        other => Some(other.to_string()),
    }
}
