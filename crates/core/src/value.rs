use std::cmp::Ordering;
use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Cell value
// ---------------------------------------------------------------------------

/// A single cell. `Missing` is the absent marker (blank cell, failed join).
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Missing,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Missing, or text made only of whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer view. Floats qualify only when integral and in range.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(f) => float_to_i64(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// String form used by suffix and length rules. Missing renders empty.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Hashable key form; `None` for missing values.
    pub fn key(&self) -> Option<KeyValue> {
        KeyValue::from_value(self)
    }

    /// Numeric addition. Missing acts as zero; integers stay integers unless
    /// the sum overflows.
    pub fn checked_add(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Missing, v) | (v, Value::Missing) if v.is_numeric() || v.is_missing() => {
                Some(v.clone())
            }
            (Value::Int(a), Value::Int(b)) => Some(
                a.checked_add(*b)
                    .map(Value::Int)
                    .unwrap_or(Value::Float(*a as f64 + *b as f64)),
            ),
            (a, b) => Some(Value::Float(a.as_f64()? + b.as_f64()?)),
        }
    }
}

fn float_to_i64(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Missing, Value::Missing) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (a, b) if a.is_numeric() && b.is_numeric() => a.as_f64() == b.as_f64(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Missing)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Missing => serializer.serialize_none(),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Scalar {
            Int(i64),
            Float(f64),
            Text(String),
        }

        Ok(match Option::<Scalar>::deserialize(deserializer)? {
            None => Value::Missing,
            Some(Scalar::Int(n)) => Value::Int(n),
            Some(Scalar::Float(x)) => Value::Float(x),
            Some(Scalar::Text(s)) => Value::Text(s),
        })
    }
}

// ---------------------------------------------------------------------------
// Key form
// ---------------------------------------------------------------------------

/// Hashable, totally ordered form of a non-missing `Value`.
///
/// Integral floats normalize to `Int`, so `Int(3)` and `Float(3.0)` produce
/// the same key. Numbers order before text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyValue {
    Int(i64),
    Float(OrderedFloat<f64>),
    Text(String),
}

impl KeyValue {
    pub fn from_value(value: &Value) -> Option<KeyValue> {
        match value {
            Value::Missing => None,
            Value::Int(n) => Some(KeyValue::Int(*n)),
            Value::Float(x) => Some(match float_to_i64(*x) {
                Some(n) => KeyValue::Int(n),
                None => KeyValue::Float(OrderedFloat(*x)),
            }),
            Value::Text(s) => Some(KeyValue::Text(s.clone())),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            KeyValue::Int(n) => Value::Int(*n),
            KeyValue::Float(x) => Value::Float(x.0),
            KeyValue::Text(s) => Value::Text(s.clone()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            KeyValue::Int(_) => 0,
            KeyValue::Float(_) => 1,
            KeyValue::Text(_) => 2,
        }
    }
}

impl Ord for KeyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (KeyValue::Int(a), KeyValue::Int(b)) => a.cmp(b),
            (KeyValue::Text(a), KeyValue::Text(b)) => a.cmp(b),
            (KeyValue::Text(_), _) => Ordering::Greater,
            (_, KeyValue::Text(_)) => Ordering::Less,
            (a, b) => {
                let x = OrderedFloat(a.to_value().as_f64().unwrap_or(f64::NAN));
                let y = OrderedFloat(b.to_value().as_f64().unwrap_or(f64::NAN));
                x.cmp(&y).then_with(|| a.rank().cmp(&b.rank()))
            }
        }
    }
}

impl PartialOrd for KeyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_value().fmt(f)
    }
}

impl Serialize for KeyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
