// Copyright 2023 RisingWave Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Primitive values held by leaf nodes.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use base64::Engine as _;
use chrono::{DateTime, FixedOffset, TimeDelta, Timelike};
use uuid::Uuid;

/// A primitive JSON value.
///
/// Besides the plain JSON scalars, a document may carry richer primitives
/// (dates, byte sequences, GUIDs, URIs and time spans). Their type tag matters
/// when comparing values in a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Boolean(bool),
    /// Integral number.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Date and time with an offset.
    Date(DateTime<FixedOffset>),
    /// Byte sequence.
    Bytes(Vec<u8>),
    /// GUID.
    Guid(Uuid),
    /// URI, kept as its original string.
    Uri(String),
    /// Time span.
    TimeSpan(TimeDelta),
}

/// The type tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Null,
    Boolean,
    Integer,
    Float,
    String,
    Date,
    Bytes,
    Guid,
    Uri,
    TimeSpan,
}

impl Value {
    /// Creates a URI value, validating the text as an absolute URI.
    pub fn uri(s: &str) -> Result<Self, url::ParseError> {
        url::Url::parse(s)?;
        Ok(Value::Uri(s.to_owned()))
    }

    /// Returns the type tag of the value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Integer(_) => ValueType::Integer,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::Date(_) => ValueType::Date,
            Value::Bytes(_) => ValueType::Bytes,
            Value::Guid(_) => ValueType::Guid,
            Value::Uri(_) => ValueType::Uri,
            Value::TimeSpan(_) => ValueType::TimeSpan,
        }
    }

    /// Returns `true` if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// If the value is a boolean, returns it.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// If the value is an integer, returns it.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// If the value is a number, returns it as a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// If the value is a string, returns it.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Compares two values by their natural order.
    ///
    /// Integers and floats compare numerically with each other. Values of any
    /// other differing types are incomparable and return `None`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        use Value::*;
        match (self, other) {
            (Null, Null) => Some(Ordering::Equal),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Integer(a), Integer(b)) => Some(a.cmp(b)),
            (Integer(a), Float(b)) => Some(compare_f64(*a as f64, *b)),
            (Float(a), Integer(b)) => Some(compare_f64(*a, *b as f64)),
            (Float(a), Float(b)) => Some(compare_f64(*a, *b)),
            (String(a), String(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            // shorter byte sequences sort first
            (Bytes(a), Bytes(b)) => Some(a.len().cmp(&b.len()).then_with(|| a.cmp(b))),
            (Guid(a), Guid(b)) => Some(a.cmp(b)),
            (Uri(a), Uri(b)) => Some(a.cmp(b)),
            (TimeSpan(a), TimeSpan(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Equality without type coercion, except that integers and floats
    /// compare numerically (`===`).
    pub fn strict_eq(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Equality with string coercion (`==`).
    ///
    /// `query` is the value being compared against. When it is a string and
    /// `self` is a date, byte sequence, GUID, URI or time span, `self` is
    /// converted to its canonical string form and compared ordinally.
    pub fn loose_eq(&self, query: &Value) -> bool {
        if self.strict_eq(query) {
            return true;
        }
        match (query, self.coerced_string()) {
            (Value::String(query), Some(s)) => s == query.as_str(),
            _ => false,
        }
    }

    /// The string form of a non-JSON primitive used by coercive equality.
    pub(crate) fn coerced_string(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Date(d) => Some(Cow::Owned(format_date(d))),
            Value::Bytes(b) => Some(Cow::Owned(
                base64::engine::general_purpose::STANDARD.encode(b),
            )),
            Value::Guid(g) => Some(Cow::Owned(g.hyphenated().to_string())),
            Value::Uri(u) => Some(Cow::Borrowed(u)),
            Value::TimeSpan(t) => Some(Cow::Owned(format_time_span(t))),
            _ => None,
        }
    }
}

/// Total order over floats where NaN sorts first and equals itself.
fn compare_f64(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// ISO-8601 with up to seven fractional digits, trailing zeros trimmed.
fn format_date(date: &DateTime<FixedOffset>) -> String {
    let mut s = date.format("%Y-%m-%dT%H:%M:%S").to_string();
    // leap seconds report nanoseconds above 1e9
    let ticks = (date.nanosecond() % 1_000_000_000) / 100;
    if ticks != 0 {
        let fraction = format!("{ticks:07}");
        s.push('.');
        s.push_str(fraction.trim_end_matches('0'));
    }
    s.push_str(&date.format("%:z").to_string());
    s
}

/// `[-][d.]hh:mm:ss[.fffffff]`
fn format_time_span(span: &TimeDelta) -> String {
    let mut s = String::new();
    if *span < TimeDelta::zero() {
        s.push('-');
    }
    let span = span.abs();
    let seconds = span.num_seconds();
    let (days, hours, minutes, seconds) = (
        seconds / 86_400,
        seconds / 3_600 % 24,
        seconds / 60 % 60,
        seconds % 60,
    );
    if days > 0 {
        s.push_str(&format!("{days}."));
    }
    s.push_str(&format!("{hours:02}:{minutes:02}:{seconds:02}"));
    let ticks = span.subsec_nanos() / 100;
    if ticks > 0 {
        s.push_str(&format!(".{ticks:07}"));
    }
    s
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::String(s) => write!(f, "{s}"),
            other => match other.coerced_string() {
                Some(s) => write!(f, "{s}"),
                None => Ok(()),
            },
        }
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueType::Null => "null",
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Date => "date",
            ValueType::Bytes => "bytes",
            ValueType::Guid => "guid",
            ValueType::Uri => "uri",
            ValueType::TimeSpan => "timespan",
        };
        write!(f, "{name}")
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(d: DateTime<FixedOffset>) -> Self {
        Value::Date(d)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Uuid> for Value {
    fn from(g: Uuid) -> Self {
        Value::Guid(g)
    }
}

impl From<TimeDelta> for Value {
    fn from(t: TimeDelta) -> Self {
        Value::TimeSpan(t)
    }
}
