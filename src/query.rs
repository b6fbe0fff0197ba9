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

//! Matching of query expressions `?(...)`.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::iter;

use crate::ast::*;
use crate::eval::{evaluate, Error, Result};
use crate::json::{NodeRef, Value};

/// One value produced by an operand.
enum Item<'a, 'd> {
    Node(NodeRef<'d>),
    Literal(&'a Value),
    Regex(&'a RegexLiteral),
}

impl Item<'_, '_> {
    /// The primitive value of the item, `None` for containers.
    fn value(&self) -> Option<Cow<'_, Value>> {
        match self {
            Item::Node(node) => node.as_value().map(Cow::Borrowed),
            Item::Literal(value) => Some(Cow::Borrowed(*value)),
            Item::Regex(regex) => Some(Cow::Owned(Value::String(regex.to_string()))),
        }
    }
}

impl Operand {
    fn items<'a, 'd: 'a>(
        &'a self,
        root: NodeRef<'d>,
        current: NodeRef<'d>,
    ) -> Box<dyn Iterator<Item = Result<Item<'a, 'd>>> + 'a> {
        match self {
            Operand::Literal(value) => Box::new(iter::once(Ok(Item::Literal(value)))),
            Operand::Regex(regex) => Box::new(iter::once(Ok(Item::Regex(regex)))),
            Operand::Path(filters) => {
                Box::new(evaluate(filters, root, current, false).map(|node| node.map(Item::Node)))
            }
        }
    }
}

impl Expression {
    /// Returns `true` if the expression holds for `current`.
    ///
    /// Sub-paths starting with `@` are evaluated from `current`, those
    /// starting with `$` from `root`. A comparison holds if any value on the
    /// left and any value on the right satisfy it.
    pub fn is_match<'d>(&self, root: NodeRef<'d>, current: NodeRef<'d>) -> Result<bool> {
        match self {
            Expression::Composite {
                op: LogicalOp::And,
                expressions,
            } => {
                for expr in expressions {
                    if !expr.is_match(root, current)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Expression::Composite {
                op: LogicalOp::Or,
                expressions,
            } => {
                for expr in expressions {
                    if expr.is_match(root, current)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Expression::Boolean {
                left, right: None, ..
            } => Ok(left.items(root, current).next().transpose()?.is_some()),
            Expression::Boolean {
                op,
                left,
                right: Some(right),
            } => {
                let mut lefts = left.items(root, current).peekable();
                if lefts.peek().is_none() {
                    return Ok(false);
                }
                let rights = right.items(root, current).collect::<Result<Vec<_>>>()?;
                for left in lefts {
                    let left = left?;
                    for right in &rights {
                        if compare(*op, &left, right)? {
                            return Ok(true);
                        }
                    }
                }
                Ok(false)
            }
        }
    }
}

fn compare(op: CompareOp, left: &Item<'_, '_>, right: &Item<'_, '_>) -> Result<bool> {
    if op == CompareOp::RegexMatch {
        return regex_match(left, right);
    }
    let (Some(left), Some(right)) = (left.value(), right.value()) else {
        // containers only ever differ
        return Ok(matches!(op, CompareOp::Ne | CompareOp::Exists));
    };
    let ordering = || left.compare(&right);
    Ok(match op {
        CompareOp::Eq => left.loose_eq(&right),
        CompareOp::Ne => !left.loose_eq(&right),
        CompareOp::StrictEq => left.strict_eq(&right),
        CompareOp::StrictNe => !left.strict_eq(&right),
        CompareOp::Lt => ordering() == Some(Ordering::Less),
        CompareOp::Le => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Gt => ordering() == Some(Ordering::Greater),
        CompareOp::Ge => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
        CompareOp::Exists => true,
        CompareOp::RegexMatch => false,
    })
}

/// Matches a string on the left against a pattern on the right.
///
/// A pattern coming from the document is a string in the `/pattern/flags` form.
fn regex_match(left: &Item<'_, '_>, right: &Item<'_, '_>) -> Result<bool> {
    let regex = match right {
        Item::Regex(regex) => Cow::Borrowed(*regex),
        other => match other.value().as_deref() {
            Some(Value::String(source)) => match RegexLiteral::from_source(source) {
                Some(regex) => Cow::Owned(regex),
                None => return Ok(false),
            },
            _ => return Ok(false),
        },
    };
    let value = left.value();
    let Some(Value::String(input)) = value.as_deref() else {
        return Ok(false);
    };
    let compiled = regex.regex().map_err(|e| Error::InvalidRegex {
        pattern: regex.pattern().into(),
        message: e.to_string().into(),
    })?;
    Ok(compiled.is_match(input))
}
