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

//! JSON Path parser.
//!
//! The path grammar is driven by a single cursor over the input: the parser
//! looks at one character, decides, and moves on. Small tokens (operators,
//! keywords, integers and numbers) are read with `nom` combinators on the
//! remaining input.

use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::i32,
    combinator::{all_consuming, value},
    number::complete::recognize_float,
    IResult, Offset,
};

use crate::ast::*;
use crate::json::Value;

impl JsonPath {
    /// Parse a JSON Path from string.
    pub fn new(s: &str) -> Result<Self> {
        let filters = Parser::new(s).parse_main()?;
        tracing::debug!(path = s, filters = filters.len(), "compiled json path");
        Ok(JsonPath { filters })
    }
}

impl FromStr for JsonPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// The error type returned when parsing a JSON path.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("at position {position}, {message}")]
pub struct Error {
    position: usize,
    message: Box<str>,
}

impl Error {
    /// Returns the byte offset in the path where parsing failed.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the message without the position.
    pub fn message(&self) -> &str {
        &self.message
    }
}

type Result<T> = std::result::Result<T, Error>;

struct Parser<'a> {
    input: &'a str,
    /// The input not consumed yet.
    rest: &'a str,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Parser { input, rest: input }
    }

    fn position(&self) -> usize {
        self.input.offset(self.rest)
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest.chars().nth(1)
    }

    fn bump(&mut self) {
        let mut chars = self.rest.chars();
        chars.next();
        self.rest = chars.as_str();
    }

    fn eat_whitespace(&mut self) {
        self.rest = self.rest.trim_start_matches(' ');
    }

    /// Consumes `s` if the input continues with it.
    fn eat(&mut self, s: &str) -> bool {
        match self.rest.strip_prefix(s) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    /// The input between `start` and the cursor.
    fn since(&self, start: usize) -> &'a str {
        &self.input[start..self.position()]
    }

    fn error(&self, message: impl Into<Box<str>>) -> Error {
        Error {
            position: self.position(),
            message: message.into(),
        }
    }

    /// Returns the next character, failing with `message` at the end of input.
    fn expect_more(&self, message: &str) -> Result<char> {
        self.peek().ok_or_else(|| self.error(message))
    }

    /// Applies a nom parser to the remaining input.
    fn apply<T>(&mut self, parser: impl FnOnce(&'a str) -> IResult<&'a str, T>) -> Option<T> {
        let (rest, output) = parser(self.rest).ok()?;
        self.rest = rest;
        Some(output)
    }

    fn parse_main(&mut self) -> Result<Vec<Filter>> {
        let mut filters = vec![];
        self.eat_whitespace();
        if self.rest.trim_end_matches(' ').is_empty() || self.rest.trim_end_matches(' ') == "$" {
            return Ok(filters);
        }
        if self.peek() == Some('$') && matches!(self.peek_second(), Some('.' | '[')) {
            self.bump();
        }
        let part_start = self.position();
        if !self.parse_path(&mut filters, part_start, false)? {
            self.eat_whitespace();
            if let Some(c) = self.peek() {
                return Err(self.error(format!(
                    "Unexpected character while parsing path: {c}"
                )));
            }
        }
        Ok(filters)
    }

    /// Parses member accesses and indexers until the end of the path.
    ///
    /// Returns `true` if the end of input was reached, `false` if parsing stopped
    /// at a character belonging to the enclosing context.
    fn parse_path(
        &mut self,
        filters: &mut Vec<Filter>,
        mut part_start: usize,
        query: bool,
    ) -> Result<bool> {
        let mut scan = false;
        let mut following_indexer = false;
        let mut following_dot = false;

        while let Some(c) = self.peek() {
            match c {
                '[' | '(' => {
                    if self.position() > part_start {
                        filters.push(member_filter(self.since(part_start), scan));
                        scan = false;
                    }
                    filters.push(self.parse_indexer(c, scan)?);
                    scan = false;
                    // skip the closing bracket
                    self.bump();
                    part_start = self.position();
                    following_indexer = true;
                    following_dot = false;
                }
                ']' | ')' | ' ' => break,
                '.' => {
                    if self.position() > part_start {
                        filters.push(member_filter(self.since(part_start), scan));
                        scan = false;
                    }
                    self.bump();
                    if self.peek() == Some('.') {
                        scan = true;
                        self.bump();
                    }
                    part_start = self.position();
                    following_indexer = false;
                    following_dot = true;
                }
                '=' | '<' | '!' | '>' | '|' | '&' if query => break,
                c => {
                    if following_indexer {
                        return Err(self.error(format!(
                            "Unexpected character following indexer: {c}"
                        )));
                    }
                    self.bump();
                }
            }
        }

        let at_end = self.rest.is_empty();
        if self.position() > part_start {
            let member = self.since(part_start).trim_end_matches(' ');
            filters.push(member_filter(member, scan));
        } else if following_dot && (at_end || query) {
            return Err(self.error("Unexpected end while parsing path."));
        }
        Ok(at_end)
    }

    /// Parses the content of `[...]` or `(...)`, leaving the cursor on the
    /// closing character.
    fn parse_indexer(&mut self, open: char, scan: bool) -> Result<Filter> {
        self.bump();
        let close = if open == '[' { ']' } else { ')' };
        self.expect_more("Path ended with open indexer.")?;
        self.eat_whitespace();
        match self.expect_more("Path ended with open indexer.")? {
            '\'' => self.parse_quoted_field(close, scan),
            '?' => self.parse_query(close, scan),
            _ => self.parse_array_indexer(close),
        }
    }

    /// Parses `'a'` or `'a', 'b'`.
    fn parse_quoted_field(&mut self, close: char, scan: bool) -> Result<Filter> {
        let mut names = vec![];
        while let Some(c) = self.peek() {
            if c != '\'' {
                return Err(self.error(format!(
                    "Unexpected character while parsing path indexer: {c}"
                )));
            }
            let name = self.read_quoted_string('\'')?;
            self.eat_whitespace();
            match self.expect_more("Path ended with open indexer.")? {
                c if c == close => {
                    if names.is_empty() {
                        return Ok(if scan {
                            Filter::Scan(Some(name))
                        } else {
                            Filter::Field(Some(name))
                        });
                    }
                    names.push(name);
                    return Ok(if scan {
                        Filter::ScanMultiple(names)
                    } else {
                        Filter::FieldMultiple(names)
                    });
                }
                ',' => {
                    self.bump();
                    self.eat_whitespace();
                    names.push(name);
                }
                c => {
                    return Err(self.error(format!(
                        "Unexpected character while parsing path indexer: {c}"
                    )))
                }
            }
        }
        Err(self.error("Path ended with open indexer."))
    }

    /// Reads a string starting at the opening `quote` and consumes the closing one.
    fn read_quoted_string(&mut self, quote: char) -> Result<String> {
        self.bump();
        let mut s = String::new();
        while let Some(c) = self.peek() {
            self.bump();
            if c == quote {
                return Ok(s);
            }
            if c != '\\' || self.rest.is_empty() {
                s.push(c);
                continue;
            }
            let escaped = self.expect_more("Path ended with an open string.")?;
            s.push(match escaped {
                'b' => '\u{8}',
                't' => '\t',
                'n' => '\n',
                'f' => '\u{c}',
                'r' => '\r',
                '\\' | '"' | '\'' | '/' => escaped,
                c => return Err(self.error(format!("Unknown escape character: \\{c}"))),
            });
            self.bump();
        }
        Err(self.error("Path ended with an open string."))
    }

    /// Parses `n`, `n1,n2,..`, `start:end:step` or `*`.
    fn parse_array_indexer(&mut self, close: char) -> Result<Filter> {
        let mut start = self.position();
        // where the current segment ended before trailing spaces
        let mut end: Option<usize> = None;
        let mut indexes: Option<Vec<i32>> = None;
        let mut colons = 0;
        let mut bounds: [Option<i32>; 3] = [None; 3];

        while let Some(c) = self.peek() {
            match c {
                ' ' => {
                    end = Some(self.position());
                    self.eat_whitespace();
                }
                c if c == close => {
                    let segment = &self.input[start..end.unwrap_or(self.position())];
                    if let Some(mut indexes) = indexes.take() {
                        if segment.is_empty() {
                            return Err(self.error("Array index expected."));
                        }
                        indexes.push(self.parse_index(segment)?);
                        return Ok(Filter::ArrayMultipleIndex(indexes));
                    }
                    if colons > 0 {
                        if !segment.is_empty() {
                            bounds[colons] = Some(self.parse_index(segment)?);
                        }
                        let [start, end, step] = bounds;
                        return Ok(Filter::ArraySlice { start, end, step });
                    }
                    if segment.is_empty() {
                        return Err(self.error("Array index expected."));
                    }
                    return Ok(Filter::ArrayIndex(Some(self.parse_index(segment)?)));
                }
                ',' if colons == 0 => {
                    let segment = &self.input[start..end.unwrap_or(self.position())];
                    if segment.is_empty() {
                        return Err(self.error("Array index expected."));
                    }
                    let index = self.parse_index(segment)?;
                    indexes.get_or_insert_with(Vec::new).push(index);
                    self.bump();
                    self.eat_whitespace();
                    start = self.position();
                    end = None;
                }
                ':' if indexes.is_none() && colons < 2 => {
                    let segment = &self.input[start..end.unwrap_or(self.position())];
                    if !segment.is_empty() {
                        bounds[colons] = Some(self.parse_index(segment)?);
                    }
                    colons += 1;
                    self.bump();
                    self.eat_whitespace();
                    start = self.position();
                    end = None;
                }
                '*' if self.position() == start && indexes.is_none() && colons == 0 => {
                    self.bump();
                    self.expect_more("Path ended with open indexer.")?;
                    self.eat_whitespace();
                    return match self.expect_more("Path ended with open indexer.")? {
                        c if c == close => Ok(Filter::ArrayIndex(None)),
                        c => Err(self.error(format!(
                            "Unexpected character while parsing path indexer: {c}"
                        ))),
                    };
                }
                c if (c.is_ascii_digit() || c == '-') && end.is_none() => self.bump(),
                c => {
                    return Err(self.error(format!(
                        "Unexpected character while parsing path indexer: {c}"
                    )))
                }
            }
        }
        Err(self.error("Path ended with open indexer."))
    }

    fn parse_index(&self, segment: &str) -> Result<i32> {
        match all_consuming(i32::<&str, nom::error::Error<&str>>)(segment) {
            Ok((_, index)) => Ok(index),
            Err(_) => Err(self.error(format!("Invalid array index: {segment}"))),
        }
    }

    /// Parses `?(expression)`.
    fn parse_query(&mut self, close: char, scan: bool) -> Result<Filter> {
        self.bump();
        let c = self.expect_more("Path ended with open indexer.")?;
        if c != '(' {
            return Err(self.error(format!(
                "Unexpected character while parsing path indexer: {c}"
            )));
        }
        self.bump();
        let expr = self.parse_expression()?;
        // skip the `)` closing the expression
        self.bump();
        self.expect_more("Path ended with open indexer.")?;
        self.eat_whitespace();
        match self.expect_more("Path ended with open indexer.")? {
            c if c == close => Ok(if scan {
                Filter::QueryScan(Box::new(expr))
            } else {
                Filter::Query(Box::new(expr))
            }),
            c => Err(self.error(format!(
                "Unexpected character while parsing path indexer: {c}"
            ))),
        }
    }

    /// Parses comparisons joined by `&&` and `||`, leaving the cursor on the
    /// closing `)`.
    ///
    /// A run of the same operator forms one composite. When the operator changes,
    /// a new composite is nested as the last member of the current one, so
    /// `a && b || c` reads as `a && (b || c)`.
    fn parse_expression(&mut self) -> Result<Expression> {
        // the chain of open composites, outermost first
        let mut levels: Vec<(LogicalOp, Vec<Expression>)> = vec![];

        while !self.rest.is_empty() {
            self.eat_whitespace();
            let left = self.parse_side()?;
            let (op, right) = match self.peek() {
                Some(')' | '|' | '&') => (CompareOp::Exists, None),
                _ => {
                    let op = self.parse_compare_op()?;
                    (op, Some(self.parse_side()?))
                }
            };
            let expr = Expression::Boolean { op, left, right };

            let logical = match self.peek() {
                Some(')') => {
                    let mut expr = expr;
                    while let Some((op, mut expressions)) = levels.pop() {
                        expressions.push(expr);
                        expr = Expression::Composite { op, expressions };
                    }
                    return Ok(expr);
                }
                Some('&') if self.eat("&&") => LogicalOp::And,
                Some('|') if self.eat("||") => LogicalOp::Or,
                Some(c) => {
                    return Err(self.error(format!(
                        "Unexpected character while parsing path query: {c}"
                    )))
                }
                None => break,
            };
            match levels.last_mut() {
                Some((op, expressions)) if *op == logical => expressions.push(expr),
                _ => levels.push((logical, vec![expr])),
            }
        }
        Err(self.error("Path ended with open query."))
    }

    /// Parses a sub-path or a literal, and the spaces after it.
    fn parse_side(&mut self) -> Result<Operand> {
        self.eat_whitespace();
        let c = self.expect_more("Path ended with open query.")?;
        let operand = match c {
            '$' | '@' => {
                let mut filters = vec![];
                if c == '$' {
                    filters.push(Filter::Root);
                }
                self.bump();
                let part_start = self.position();
                if self.parse_path(&mut filters, part_start, true)? {
                    return Err(self.error("Path ended with open query."));
                }
                Operand::Path(filters)
            }
            '\'' | '"' => Operand::Literal(Value::String(self.read_quoted_string(c)?)),
            '/' => Operand::Regex(self.read_regex()?),
            c if c.is_ascii_digit() || c == '-' => Operand::Literal(self.read_number()?),
            _ => match self.apply(keyword) {
                Some(value) => Operand::Literal(value),
                None => {
                    return Err(self.error(format!(
                        "Unexpected character while parsing path query: {c}"
                    )))
                }
            },
        };
        self.eat_whitespace();
        self.expect_more("Path ended with open query.")?;
        Ok(operand)
    }

    /// Reads an integer, or a float when the text has a fraction or exponent.
    fn read_number(&mut self) -> Result<Value> {
        let c = self.peek().unwrap_or('-');
        let text = self
            .apply(recognize_float::<&str, nom::error::Error<&str>>)
            .ok_or_else(|| {
                self.error(format!("Unexpected character while parsing path query: {c}"))
            })?;
        if !text.contains(['.', 'e', 'E']) {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Value::Integer(i));
            }
        }
        text.parse::<f64>()
            .map(Value::Float)
            .map_err(|_| self.error(format!("Could not read query value: {text}")))
    }

    /// Reads `/pattern/flags`.
    fn read_regex(&mut self) -> Result<RegexLiteral> {
        self.bump();
        let mut pattern = String::new();
        while let Some(c) = self.peek() {
            self.bump();
            match c {
                '/' => {
                    // letters other than the known flags are skipped
                    let mut flags = String::new();
                    while let Some(flag) = self.peek().filter(|c| c.is_alphabetic()) {
                        if RegexLiteral::FLAGS.contains(flag) {
                            flags.push(flag);
                        }
                        self.bump();
                    }
                    return Ok(RegexLiteral::new(&pattern, &flags));
                }
                '\\' => match self.peek() {
                    // `\/` stands for a slash in the pattern
                    Some('/') => {
                        pattern.push('/');
                        self.bump();
                    }
                    Some(escaped) => {
                        pattern.push('\\');
                        pattern.push(escaped);
                        self.bump();
                    }
                    None => pattern.push('\\'),
                },
                c => pattern.push(c),
            }
        }
        Err(self.error("Path ended with an open regex."))
    }

    fn parse_compare_op(&mut self) -> Result<CompareOp> {
        if self.rest.chars().count() < 2 {
            return Err(self.error("Path ended with open query."));
        }
        self.apply(compare_op)
            .ok_or_else(|| self.error("Could not read query operator."))
    }
}

/// `.name`, `..name`, `.*` or `..*`.
fn member_filter(member: &str, scan: bool) -> Filter {
    let name = (member != "*").then(|| member.to_owned());
    if scan {
        Filter::Scan(name)
    } else {
        Filter::Field(name)
    }
}

fn compare_op(input: &str) -> IResult<&str, CompareOp> {
    alt((
        value(CompareOp::StrictEq, tag("===")),
        value(CompareOp::Eq, tag("==")),
        value(CompareOp::RegexMatch, tag("=~")),
        value(CompareOp::StrictNe, tag("!==")),
        value(CompareOp::Ne, tag("!=")),
        value(CompareOp::Ne, tag("<>")),
        value(CompareOp::Le, tag("<=")),
        value(CompareOp::Lt, tag("<")),
        value(CompareOp::Ge, tag(">=")),
        value(CompareOp::Gt, tag(">")),
    ))(input)
}

fn keyword(input: &str) -> IResult<&str, Value> {
    alt((
        value(Value::Boolean(true), tag("true")),
        value(Value::Boolean(false), tag("false")),
        value(Value::Null, tag("null")),
    ))(input)
}
