//! Coercion of loosely-typed JSON scalars.
//!
//! The source is not consistent about how it encodes numbers: the same field
//! can arrive as an integer, a float or a numeric string depending on the
//! endpoint and firmware. Everything funnels through [`coerce`].

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot read {expected} from {found}")]
pub struct ParseError {
    pub expected: &'static str,
    pub found: String,
}

impl ParseError {
    fn new(expected: &'static str, found: &Value) -> Self {
        Self { expected, found: found.to_string() }
    }

    pub(crate) fn out_of_range(expected: &'static str, found: impl ToString) -> Self {
        Self { expected, found: found.to_string() }
    }
}

/// A scalar type that can be read out of a JSON value.
pub trait Scalar: Sized {
    const NAME: &'static str;

    fn from_number(n: &serde_json::Number) -> Option<Self>;
    fn from_text(s: &str) -> Option<Self>;
}

impl Scalar for i64 {
    const NAME: &'static str = "integer";

    fn from_number(n: &serde_json::Number) -> Option<Self> {
        n.as_i64().or_else(|| n.as_f64().and_then(truncate))
    }

    fn from_text(s: &str) -> Option<Self> {
        s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().and_then(truncate))
    }
}

impl Scalar for f64 {
    const NAME: &'static str = "number";

    fn from_number(n: &serde_json::Number) -> Option<Self> {
        n.as_f64().filter(|v| v.is_finite())
    }

    fn from_text(s: &str) -> Option<Self> {
        s.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

/// Read `value` as `T`, accepting JSON numbers and numeric strings.
pub fn coerce<T: Scalar>(value: &Value) -> Result<T, ParseError> {
    let parsed = match value {
        Value::Number(n) => T::from_number(n),
        Value::String(s) => T::from_text(s.trim()),
        _ => None,
    };

    parsed.ok_or_else(|| ParseError::new(T::NAME, value))
}

fn truncate(v: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound
    if v.is_finite() && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v.trunc() as i64)
    } else {
        None
    }
}
