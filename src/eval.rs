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

//! Evaluation of JSON paths.
//!
//! Every filter turns a lazy sequence of candidate nodes into another one.
//! Nothing is computed until the final sequence is pulled.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::iter;

use crate::ast::*;
use crate::json::{LineInfo, NodeRef, NodeType};

pub type Result<T> = std::result::Result<T, Error>;

/// A lazy sequence of nodes produced by a filter.
///
/// `'p` is the lifetime of the path, `'d` the lifetime of the document.
pub type Nodes<'p, 'd> = Box<dyn Iterator<Item = Result<NodeRef<'d>>> + 'p>;

/// The error type returned when evaluating a JSON path.
///
/// Except for [`Error::ZeroStep`] and [`Error::InvalidRegex`], these are only
/// raised when the caller asked for an error when nothing matches.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Property '{name}' does not exist on object.{location}")]
    NoProperty { name: Box<str>, location: Location },
    #[error("Property '{name}' not valid on {node_type}.{location}")]
    PropertyNotValid {
        name: Box<str>,
        node_type: NodeType,
        location: Location,
    },
    #[error("Properties {names} not valid on {node_type}.{location}")]
    PropertiesNotValid {
        names: Box<str>,
        node_type: NodeType,
        location: Location,
    },
    #[error("Index {index} outside the bounds of {node_type}.{location}")]
    IndexOutOfBounds {
        index: i32,
        node_type: NodeType,
        location: Location,
    },
    #[error("Index {index} not valid on {node_type}.{location}")]
    IndexNotValid {
        index: Box<str>,
        node_type: NodeType,
        location: Location,
    },
    #[error("Array slice of {start} to {end} returned no results.{location}")]
    EmptySlice {
        start: Box<str>,
        end: Box<str>,
        location: Location,
    },
    #[error("Array slice is not valid on {node_type}.{location}")]
    SliceNotValid {
        node_type: NodeType,
        location: Location,
    },
    #[error("Step cannot be zero.")]
    ZeroStep,
    #[error("Invalid regex /{pattern}/: {message}")]
    InvalidRegex { pattern: Box<str>, message: Box<str> },
    #[error("Path returned multiple tokens.")]
    MultipleTokens,
}

/// Where in the document a node that did not match sits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub path: String,
    pub line_info: Option<LineInfo>,
}

impl Location {
    fn of(node: NodeRef<'_>) -> Self {
        Location {
            path: node.path(),
            line_info: node.line_info(),
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() && self.line_info.is_none() {
            return Ok(());
        }
        write!(f, " Path '{}'", self.path)?;
        if let Some(LineInfo { line, position }) = self.line_info {
            write!(f, ", line {line}, position {position}")?;
        }
        write!(f, ".")
    }
}

/// Yields nothing for the candidate, or an error if no match is an error.
macro_rules! no_match {
    ($strict:expr, $err:expr) => {{
        if $strict {
            let err = $err;
            tracing::trace!(%err, "no match");
            return Box::new(iter::once(Err(err)));
        }
        return Box::new(iter::empty());
    }};
}

impl JsonPath {
    /// Evaluates the path against a document, starting at its root.
    ///
    /// Every call returns a new independent sequence.
    pub fn evaluate<'p, 'd: 'p>(
        &'p self,
        root: NodeRef<'d>,
        error_when_no_match: bool,
    ) -> Nodes<'p, 'd> {
        evaluate(&self.filters, root, root, error_when_no_match)
    }

    /// Returns all nodes selected by the path, ignoring what does not match.
    pub fn query<'d>(&self, root: NodeRef<'d>) -> Result<Vec<NodeRef<'d>>> {
        self.select(root, false)
    }

    /// Returns all nodes selected by the path.
    pub fn select<'d>(
        &self,
        root: NodeRef<'d>,
        error_when_no_match: bool,
    ) -> Result<Vec<NodeRef<'d>>> {
        self.evaluate(root, error_when_no_match).collect()
    }

    /// Returns the single node selected by the path, if any.
    ///
    /// Fails with [`Error::MultipleTokens`] if more than one node is selected.
    pub fn select_one<'d>(
        &self,
        root: NodeRef<'d>,
        error_when_no_match: bool,
    ) -> Result<Option<NodeRef<'d>>> {
        let mut nodes = self.evaluate(root, error_when_no_match);
        let first = nodes.next().transpose()?;
        match nodes.next().transpose()? {
            Some(_) => Err(Error::MultipleTokens),
            None => Ok(first),
        }
    }
}

/// Threads `current` through the filters in order.
///
/// `root` is the node that `$` refers to inside queries.
pub fn evaluate<'p, 'd: 'p>(
    filters: &'p [Filter],
    root: NodeRef<'d>,
    current: NodeRef<'d>,
    error_when_no_match: bool,
) -> Nodes<'p, 'd> {
    let mut nodes: Nodes<'p, 'd> = Box::new(iter::once(Ok(current)));
    for filter in filters {
        nodes = filter.execute(root, nodes, error_when_no_match);
    }
    nodes
}

impl Filter {
    /// Applies the filter to every candidate.
    ///
    /// Errors in `current` are passed through unchanged.
    pub fn execute<'p, 'd: 'p>(
        &'p self,
        root: NodeRef<'d>,
        current: Nodes<'p, 'd>,
        error_when_no_match: bool,
    ) -> Nodes<'p, 'd> {
        let strict = error_when_no_match;
        match self {
            Filter::Root => Box::new(iter::once(Ok(root))),
            Filter::Field(name) => each(current, move |node| {
                if !node.is_object() {
                    no_match!(
                        strict,
                        Error::PropertyNotValid {
                            name: name.as_deref().unwrap_or("*").into(),
                            node_type: node.node_type(),
                            location: Location::of(node),
                        }
                    );
                }
                let Some(name) = name else {
                    return Box::new(node.values().map(Ok));
                };
                match node.get(name) {
                    Some(value) => Box::new(iter::once(Ok(value))),
                    None => no_match!(
                        strict,
                        Error::NoProperty {
                            name: name.as_str().into(),
                            location: Location::of(node),
                        }
                    ),
                }
            }),
            Filter::FieldMultiple(names) => each(current, move |node| {
                if !node.is_object() {
                    no_match!(
                        strict,
                        Error::PropertiesNotValid {
                            names: quoted_names(names).into(),
                            node_type: node.node_type(),
                            location: Location::of(node),
                        }
                    );
                }
                // missing names are skipped even when no match is an error
                Box::new(names.iter().filter_map(move |name| node.get(name)).map(Ok))
            }),
            Filter::ArrayIndex(Some(index)) => each(current, move |node| {
                Box::new(index_item(node, *index, strict).transpose().into_iter())
            }),
            Filter::ArrayIndex(None) => each(current, move |node| {
                if !node.is_indexable() {
                    no_match!(
                        strict,
                        Error::IndexNotValid {
                            index: "*".into(),
                            node_type: node.node_type(),
                            location: Location::of(node),
                        }
                    );
                }
                Box::new(node.values().map(Ok))
            }),
            Filter::ArrayMultipleIndex(indexes) => each(current, move |node| {
                Box::new(
                    indexes
                        .iter()
                        .filter_map(move |&index| index_item(node, index, strict).transpose()),
                )
            }),
            Filter::ArraySlice { start, end, step } => {
                if *step == Some(0) {
                    return Box::new(iter::once(Err(Error::ZeroStep)));
                }
                each(current, move |node| slice(node, *start, *end, *step, strict))
            }
            Filter::Scan(name) => each(current, move |node| {
                let this = name.is_none().then_some(node);
                let descendants = node.descendants().filter_map(move |d| match d.property_name() {
                    Some(property) if Some(property) == name.as_deref() => d.first(),
                    Some(_) => None,
                    None => name.is_none().then_some(d),
                });
                Box::new(this.into_iter().chain(descendants).map(Ok))
            }),
            Filter::ScanMultiple(names) => each(current, move |node| {
                Box::new(
                    node.descendants()
                        .filter(move |d| {
                            d.property_name()
                                .is_some_and(|property| names.iter().any(|n| n == property))
                        })
                        .filter_map(|d| d.first())
                        .map(Ok),
                )
            }),
            Filter::Query(expr) => each(current, move |node| {
                Box::new(
                    node.values()
                        .filter_map(move |child| matching(expr, root, child)),
                )
            }),
            Filter::QueryScan(expr) => each(current, move |node| {
                Box::new(
                    iter::once(node)
                        .chain(node.descendants().filter(|d| !d.is_property()))
                        .filter_map(move |d| matching(expr, root, d)),
                )
            }),
            Filter::And(filters) => deferred(move || {
                let mut nodes: Vec<_> = current.collect();
                for filter in filters {
                    nodes = filter
                        .execute(root, Box::new(nodes.into_iter()), strict)
                        .collect();
                }
                nodes
            }),
            Filter::Or(filters) => deferred(move || {
                let input: Vec<_> = current.collect();
                let mut seen = HashSet::new();
                let mut output = vec![];
                for filter in filters {
                    for item in filter.execute(root, Box::new(input.clone().into_iter()), strict) {
                        match item {
                            Ok(node) if !seen.insert(node.id()) => {}
                            item => output.push(item),
                        }
                    }
                }
                output
            }),
        }
    }
}

/// Applies `f` to every candidate and chains the results.
fn each<'p, 'd: 'p>(
    current: Nodes<'p, 'd>,
    f: impl Fn(NodeRef<'d>) -> Nodes<'p, 'd> + 'p,
) -> Nodes<'p, 'd> {
    Box::new(current.flat_map(move |candidate| match candidate {
        Ok(node) => f(node),
        Err(err) => Box::new(iter::once(Err(err))),
    }))
}

/// A sequence computed in full on the first pull.
fn deferred<'p, 'd: 'p>(f: impl FnOnce() -> Vec<Result<NodeRef<'d>>> + 'p) -> Nodes<'p, 'd> {
    let mut f = Some(f);
    Box::new(iter::from_fn(move || f.take().map(|f| f())).flatten())
}

fn matching<'d>(expr: &Expression, root: NodeRef<'d>, node: NodeRef<'d>) -> Option<Result<NodeRef<'d>>> {
    match expr.is_match(root, node) {
        Ok(true) => Some(Ok(node)),
        Ok(false) => None,
        Err(err) => Some(Err(err)),
    }
}

/// Returns the item at `index`, `None` when it does not exist and no match is
/// not an error.
fn index_item(node: NodeRef<'_>, index: i32, strict: bool) -> Result<Option<NodeRef<'_>>> {
    if !node.is_indexable() {
        return escalate(strict, || Error::IndexNotValid {
            index: index.to_string().into(),
            node_type: node.node_type(),
            location: Location::of(node),
        });
    }
    // negative indexes are out of bounds
    match usize::try_from(index).ok().and_then(|i| node.index(i)) {
        Some(item) => Ok(Some(item)),
        None => escalate(strict, || Error::IndexOutOfBounds {
            index,
            node_type: node.node_type(),
            location: Location::of(node),
        }),
    }
}

/// Builds the error only when no match is an error.
fn escalate<T>(strict: bool, err: impl FnOnce() -> Error) -> Result<Option<T>> {
    if strict {
        let err = err();
        tracing::trace!(%err, "no match");
        return Err(err);
    }
    Ok(None)
}

/// Python-like slicing of an array.
fn slice<'p, 'd: 'p>(
    node: NodeRef<'d>,
    start: Option<i32>,
    end: Option<i32>,
    step: Option<i32>,
    strict: bool,
) -> Nodes<'p, 'd> {
    if !node.is_array() {
        no_match!(
            strict,
            Error::SliceNotValid {
                node_type: node.node_type(),
                location: Location::of(node),
            }
        );
    }
    let count = node.len() as i64;
    let step = i64::from(step.unwrap_or(1));
    let forward = step > 0;

    let mut from = match start {
        Some(start) if start < 0 => count + i64::from(start),
        Some(start) => i64::from(start),
        None if forward => 0,
        None => count - 1,
    };
    let mut to = match end {
        Some(end) if end < 0 => count + i64::from(end),
        Some(end) => i64::from(end),
        None if forward => count,
        None => -1,
    };
    if forward {
        from = from.clamp(0, count);
    } else {
        from = from.min(count - 1);
    }
    to = to.clamp(-1, count);

    let valid = move |i: i64| if forward { i < to } else { i > to };
    if !valid(from) {
        let bound = |b: Option<i32>| -> Box<str> { b.map_or_else(|| "*".into(), |b| b.to_string().into()) };
        no_match!(
            strict,
            Error::EmptySlice {
                start: bound(start),
                end: bound(end),
                location: Location::of(node),
            }
        );
    }
    let mut i = from;
    Box::new(iter::from_fn(move || {
        if !valid(i) {
            return None;
        }
        let item = usize::try_from(i).ok().and_then(|i| node.index(i));
        i += step;
        item.map(Ok)
    }))
}

/// `'a', 'b'`
fn quoted_names(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
