//! Best-effort value normalization.
//!
//! Converts raw scalars read from a tabular source into typed [`Value`]s.
//! Conversion never fails: anything that cannot be coerced becomes
//! [`Value::Null`], so one malformed cell degrades to a null instead of
//! aborting a batch load.

use crate::db::Value;

/// Tokens a dataframe-style CSV reader treats as missing values.
const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "NULL", "null", "None", "#N/A",
];

/// Target type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Integer,
    Float,
    Boolean,
    Text,
}

/// A raw scalar as read from the source, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Missing-value sentinel.
    Missing,
    Text(String),
    Int(i64),
    Float(f64),
}

impl RawValue {
    /// Classifies a raw cell the way a dataframe reader would: missing tokens
    /// become [`RawValue::Missing`], numeric-looking cells become numbers and
    /// everything else stays text.
    pub fn infer(cell: &str) -> Self {
        if is_missing_token(cell) {
            return Self::Missing;
        }
        let trimmed = cell.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Self::Int(i);
        }
        match trimmed.parse::<f64>() {
            Ok(f) => Self::Float(f),
            Err(_) => Self::Text(cell.to_string()),
        }
    }

    /// Builds the raw value for a CSV field destined for a column of `kind`.
    ///
    /// Text columns keep the cell verbatim so identifiers such as `00123`
    /// survive; other columns go through [`RawValue::infer`].
    pub fn from_csv_field(cell: &str, kind: TargetKind) -> Self {
        match kind {
            TargetKind::Text if is_missing_token(cell) => Self::Missing,
            TargetKind::Text => Self::Text(cell.to_string()),
            _ => Self::infer(cell),
        }
    }

    fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Text(s) => s.is_empty(),
            Self::Float(f) => f.is_nan(),
            Self::Int(_) => false,
        }
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl<T> From<Option<T>> for RawValue
where
    T: Into<RawValue>,
{
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Missing)
    }
}

fn is_missing_token(cell: &str) -> bool {
    MISSING_TOKENS.contains(&cell)
}

/// Normalizes `value` into a [`Value`] of the given kind.
///
/// Missing input, empty strings and NaN yield [`Value::Null`] for every kind.
/// Integers go through a float parse and are truncated toward zero, so `"3.0"`
/// becomes `3`. Booleans parse as an integer and test nonzero: `"1"` is true,
/// `"0"` is false, and literal `"true"` is null.
pub fn normalize(value: impl Into<RawValue>, kind: TargetKind) -> Value {
    let value = value.into();
    if value.is_missing() {
        return Value::Null;
    }

    let converted = match kind {
        TargetKind::Integer => to_integer(&value).map(Value::Int),
        TargetKind::Float => to_float(&value).map(Value::Float),
        TargetKind::Boolean => to_boolean(&value).map(Value::Bool),
        TargetKind::Text => Some(Value::String(to_text(value))),
    };

    converted.unwrap_or(Value::Null)
}

fn to_integer(value: &RawValue) -> Option<i64> {
    match value {
        RawValue::Int(i) => Some(*i),
        RawValue::Float(f) => truncate(*f),
        RawValue::Text(s) => s.trim().parse::<f64>().ok().and_then(truncate),
        RawValue::Missing => None,
    }
}

fn to_float(value: &RawValue) -> Option<f64> {
    let f = match value {
        RawValue::Int(i) => *i as f64,
        RawValue::Float(f) => *f,
        RawValue::Text(s) => s.trim().parse::<f64>().ok()?,
        RawValue::Missing => return None,
    };
    (!f.is_nan()).then_some(f)
}

fn to_boolean(value: &RawValue) -> Option<bool> {
    match value {
        RawValue::Int(i) => Some(*i != 0),
        RawValue::Float(f) => truncate(*f).map(|i| i != 0),
        RawValue::Text(s) => s.trim().parse::<i64>().ok().map(|i| i != 0),
        RawValue::Missing => None,
    }
}

fn to_text(value: RawValue) -> String {
    match value {
        RawValue::Text(s) => s,
        RawValue::Int(i) => i.to_string(),
        // Debug keeps the decimal point: 3.0 -> "3.0"
        RawValue::Float(f) => format!("{f:?}"),
        RawValue::Missing => String::new(),
    }
}

/// Truncates toward zero, rejecting values with no `i64` representation.
fn truncate(f: f64) -> Option<i64> {
    if !f.is_finite() {
        return None;
    }
    let t = f.trunc();
    if t < i64::MIN as f64 || t >= i64::MAX as f64 {
        return None;
    }
    Some(t as i64)
}
