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

//! The AST of JSON Path.

use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Write;
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

use crate::json::Value;

/// A compiled JSON path: an ordered list of filters.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPath {
    pub(crate) filters: Vec<Filter>,
}

impl JsonPath {
    /// Creates a path from an already built filter list.
    pub fn from_filters(filters: Vec<Filter>) -> Self {
        JsonPath { filters }
    }

    /// Returns the filters of the path.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }
}

/// One stage of a path, turning a sequence of candidate nodes into another.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `$` inside a query restarts from the document root.
    Root,
    /// `.name` selects a property of an object, `.*` every property value.
    Field(Option<String>),
    /// `['a','b']` selects several properties, in the listed order.
    FieldMultiple(Vec<String>),
    /// `[n]` selects an item of an array or constructor, `[*]` every item.
    ArrayIndex(Option<i32>),
    /// `[n1,n2,..]` selects several items, in the listed order.
    ArrayMultipleIndex(Vec<i32>),
    /// `[start:end:step]` selects a slice of an array.
    /// Missing bounds are resolved against the array when evaluating.
    ArraySlice {
        start: Option<i32>,
        end: Option<i32>,
        step: Option<i32>,
    },
    /// `..name` selects the value of every property with the name at any depth,
    /// `..*` every descendant.
    Scan(Option<String>),
    /// `..['a','b']` selects the values of properties with any of the names at any depth.
    ScanMultiple(Vec<String>),
    /// `[?(<expression>)]` selects the children matching the expression.
    Query(Box<Expression>),
    /// `..[?(<expression>)]` selects the descendants matching the expression.
    QueryScan(Box<Expression>),
    /// Pipes the candidates through each filter in turn.
    And(Vec<Filter>),
    /// Runs each filter on the same candidates and merges the results,
    /// keeping the first occurrence of each node.
    Or(Vec<Filter>),
}

/// A boolean expression inside `?(...)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A comparison, or an existence test when `right` is `None`.
    Boolean {
        op: CompareOp,
        left: Operand,
        right: Option<Operand>,
    },
    /// `&&` or `||` over several expressions.
    Composite {
        op: LogicalOp,
        expressions: Vec<Expression>,
    },
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Literal value.
    Literal(Value),
    /// `/pattern/flags`.
    Regex(RegexLiteral),
    /// A path starting at `@` (the current node) or `$` (the root, the first
    /// filter is then [`Filter::Root`]).
    Path(Vec<Filter>),
}

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==` compares with string coercion.
    Eq,
    /// `!=` and `<>`.
    Ne,
    /// `===` compares without string coercion.
    StrictEq,
    /// `!==`.
    StrictNe,
    /// `<`.
    Lt,
    /// `<=`.
    Le,
    /// `>`.
    Gt,
    /// `>=`.
    Ge,
    /// `=~` matches a string against a regular expression.
    RegexMatch,
    /// A bare operand tests that it selects anything.
    Exists,
}

/// A logical operator combining expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// `&&`
    And,
    /// `||`
    Or,
}

/// A `/pattern/flags` literal.
///
/// The pattern is compiled on first use and then cached.
#[derive(Debug, Clone)]
pub struct RegexLiteral {
    pattern: Box<str>,
    flags: Box<str>,
    regex: OnceLock<Result<Regex, regex::Error>>,
}

impl RegexLiteral {
    /// Flags understood after the closing slash.
    pub(crate) const FLAGS: &'static str = "imsx";

    pub(crate) fn new(pattern: &str, flags: &str) -> Self {
        RegexLiteral {
            pattern: pattern.into(),
            flags: flags.into(),
            regex: OnceLock::new(),
        }
    }

    /// Reads `/pattern/flags` text, as found in document strings.
    pub(crate) fn from_source(source: &str) -> Option<Self> {
        let rest = source.strip_prefix('/')?;
        let end = rest.rfind('/')?;
        let flags: String = rest[end + 1..]
            .chars()
            .filter(|c| Self::FLAGS.contains(*c))
            .collect();
        Some(Self::new(&rest[..end], &flags))
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }

    /// Returns the compiled regex.
    pub fn regex(&self) -> Result<&Regex, regex::Error> {
        self.regex
            .get_or_init(|| {
                RegexBuilder::new(&self.pattern)
                    .case_insensitive(self.flags.contains('i'))
                    .multi_line(self.flags.contains('m'))
                    .dot_matches_new_line(self.flags.contains('s'))
                    .ignore_whitespace(self.flags.contains('x'))
                    .build()
            })
            .as_ref()
            .map_err(Clone::clone)
    }
}

impl PartialEq for RegexLiteral {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.flags == other.flags
    }
}

/// Characters that force a property name into bracket notation.
///
/// Operator characters are included because they end a sub-path inside a query.
const SPECIAL_CHARS: &[char] = &[
    '.', ' ', '\'', '/', '"', '[', ']', '(', ')', '\t', '\n', '\r', '\u{c}', '\u{8}', '\\',
    '\u{85}', '\u{2028}', '\u{2029}', '=', '<', '>', '!', '&', '|',
];

/// Appends a property access to `out`: `.name` (or `name` without the dot at
/// the start of a path) when the name is plain, `['name']` otherwise.
pub(crate) fn write_member(out: &mut impl Write, name: &str, leading_dot: bool) {
    let plain = !name.is_empty() && name != "*" && !name.contains(SPECIAL_CHARS);
    // writing to a String never fails
    let _ = if plain {
        write!(out, "{}{name}", if leading_dot { "." } else { "" })
    } else {
        write!(out, "[{}]", Quoted(name))
    };
}

/// A single-quoted, escaped string.
struct Quoted<'a>(&'a str);

impl Display for Quoted<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_char('\'')?;
        for c in self.0.chars() {
            match c {
                '\'' => f.write_str("\\'")?,
                '\\' => f.write_str("\\\\")?,
                '\u{8}' => f.write_str("\\b")?,
                '\t' => f.write_str("\\t")?,
                '\n' => f.write_str("\\n")?,
                '\u{c}' => f.write_str("\\f")?,
                '\r' => f.write_str("\\r")?,
                c => f.write_char(c)?,
            }
        }
        f.write_char('\'')
    }
}

struct QuotedList<'a>(&'a [String]);

impl Display for QuotedList<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, name) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", Quoted(name))?;
        }
        Ok(())
    }
}

/// Writes filters after a `$` or `@`.
fn write_filters(f: &mut Formatter<'_>, filters: &[Filter]) -> std::fmt::Result {
    for filter in filters {
        write!(f, "{filter}")?;
    }
    Ok(())
}

impl Display for JsonPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "$")?;
        write_filters(f, &self.filters)
    }
}

/// Renders path text that parses back to the same filter.
///
/// `And` and `Or` have no path syntax and render as `and(@f, @g)` and
/// `or(@f, @g)`, which the parser does not accept.
impl Display for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "$"),
            Self::Field(Some(name)) => {
                let mut s = String::new();
                write_member(&mut s, name, true);
                write!(f, "{s}")
            }
            Self::Field(None) => write!(f, ".*"),
            Self::FieldMultiple(names) => write!(f, "[{}]", QuotedList(names)),
            Self::ArrayIndex(Some(i)) => write!(f, "[{i}]"),
            Self::ArrayIndex(None) => write!(f, "[*]"),
            Self::ArrayMultipleIndex(indexes) => {
                write!(f, "[")?;
                for (i, index) in indexes.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{index}")?;
                }
                write!(f, "]")
            }
            Self::ArraySlice { start, end, step } => {
                let bound = |b: &Option<i32>| b.map(|b| b.to_string()).unwrap_or_default();
                write!(f, "[{}:{}", bound(start), bound(end))?;
                if step.is_some() {
                    write!(f, ":{}", bound(step))?;
                }
                write!(f, "]")
            }
            Self::Scan(Some(name)) => {
                let mut s = String::new();
                write_member(&mut s, name, false);
                write!(f, "..{s}")
            }
            Self::Scan(None) => write!(f, "..*"),
            Self::ScanMultiple(names) => write!(f, "..[{}]", QuotedList(names)),
            Self::Query(expr) => write!(f, "[?({expr})]"),
            Self::QueryScan(expr) => write!(f, "..[?({expr})]"),
            Self::And(filters) | Self::Or(filters) => {
                let op = if matches!(self, Self::And(_)) { "and" } else { "or" };
                write!(f, "{op}(")?;
                for (i, filter) in filters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "@{filter}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean {
                left, right: None, ..
            } => write!(f, "{left}"),
            Self::Boolean {
                op,
                left,
                right: Some(right),
            } => write!(f, "{left} {op} {right}"),
            // nested composites only ever come last, so no parentheses are needed
            // for the text to parse back into the same tree
            Self::Composite { op, expressions } => {
                for (i, expr) in expressions.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {op} ")?;
                    }
                    write!(f, "{expr}")?;
                }
                Ok(())
            }
        }
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(Value::String(s)) => write!(f, "{}", Quoted(s)),
            Self::Literal(v @ (Value::Null | Value::Boolean(_) | Value::Integer(_) | Value::Float(_))) => {
                write!(f, "{v}")
            }
            Self::Literal(v) => write!(f, "{}", Quoted(&v.to_string())),
            Self::Regex(regex) => write!(f, "{regex}"),
            Self::Path(filters) => match filters.split_first() {
                Some((Filter::Root, rest)) => {
                    write!(f, "$")?;
                    write_filters(f, rest)
                }
                _ => {
                    write!(f, "@")?;
                    write_filters(f, filters)
                }
            },
        }
    }
}

impl Display for RegexLiteral {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}/{}", self.pattern.replace('/', "\\/"), self.flags)
    }
}

impl Display for CompareOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eq => write!(f, "=="),
            Self::Ne => write!(f, "!="),
            Self::StrictEq => write!(f, "==="),
            Self::StrictNe => write!(f, "!=="),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
            Self::RegexMatch => write!(f, "=~"),
            Self::Exists => write!(f, "exists"),
        }
    }
}

impl Display for LogicalOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "&&"),
            Self::Or => write!(f, "||"),
        }
    }
}
