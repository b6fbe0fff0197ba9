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

//! [JSONPath] queries over an in-memory JSON document tree.
//!
//! A [`Document`] holds a JSON value as a tree of nodes with parent and
//! sibling links. A [`JsonPath`] is compiled once into a list of filters and
//! can then be evaluated against any number of documents.
//!
//! # Usage
//!
//! ```rust
//! use json_token_path::{Document, JsonPath};
//!
//! let doc = Document::from_json_str(r#"[{"a": 1}, {"a": 2}]"#).unwrap();
//! let path = JsonPath::new("$[?(@.a > 1)].a").unwrap();
//!
//! let nodes = path.query(doc.root()).unwrap();
//! assert_eq!(nodes.len(), 1);
//! assert_eq!(nodes[0].to_json(), 2);
//! ```
//!
//! Missing properties and indexes are skipped by default. Pass
//! `error_when_no_match = true` to get an error instead:
//!
//! ```rust
//! use json_token_path::{select_token, Document};
//!
//! let doc = Document::from_json_str(r#"{"a": 1}"#).unwrap();
//! assert!(select_token(doc.root(), "$.b", false).unwrap().is_none());
//! assert!(select_token(doc.root(), "$.b", true).is_err());
//! ```
//!
//! [JSONPath]: https://goessner.net/articles/JsonPath/

mod ast;
mod eval;
mod json;
mod parser;
mod query;

pub use ast::{CompareOp, Expression, Filter, JsonPath, LogicalOp, Operand, RegexLiteral};
pub use eval::{evaluate, Error as EvalError, Location, Nodes};
pub use json::{
    BuildError, Children, Descendants, Document, LineInfo, NodeId, NodeInit, NodeRef, NodeType,
    Value, ValueType,
};
pub use parser::Error as ParseError;

/// The error type returned when selecting nodes by path text.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Selects all nodes matching `path`, starting at `root`.
pub fn select_tokens<'d>(
    root: NodeRef<'d>,
    path: &str,
    error_when_no_match: bool,
) -> Result<Vec<NodeRef<'d>>, Error> {
    Ok(JsonPath::new(path)?.select(root, error_when_no_match)?)
}

/// Selects the single node matching `path`, starting at `root`.
///
/// Fails if more than one node matches.
pub fn select_token<'d>(
    root: NodeRef<'d>,
    path: &str,
    error_when_no_match: bool,
) -> Result<Option<NodeRef<'d>>, Error> {
    Ok(JsonPath::new(path)?.select_one(root, error_when_no_match)?)
}

impl<'d> NodeRef<'d> {
    /// Selects all nodes matching `path`, starting at this node.
    pub fn select_tokens(
        self,
        path: &str,
        error_when_no_match: bool,
    ) -> Result<Vec<NodeRef<'d>>, Error> {
        select_tokens(self, path, error_when_no_match)
    }

    /// Selects the single node matching `path`, starting at this node.
    pub fn select_token(
        self,
        path: &str,
        error_when_no_match: bool,
    ) -> Result<Option<NodeRef<'d>>, Error> {
        select_token(self, path, error_when_no_match)
    }
}
