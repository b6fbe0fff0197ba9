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

//! The JSON document tree.
//!
//! A [`Document`] owns every node of one JSON value in a single arena. Nodes refer
//! to each other by [`NodeId`]: every node knows its parent, its previous and next
//! sibling, and its first and last child. This makes it possible to walk the
//! whole tree iteratively, without recursion, see [`Descendants`].
//!
//! - [`Document`]: the arena and its builder methods.
//! - [`NodeRef`]: a cheap, copyable handle to a node inside a document.
//! - [`Value`]: the primitive held by a leaf node.

use std::fmt::{Debug, Display, Formatter};

use indexmap::IndexMap;

mod serde_json;
mod value;

pub use value::{Value, ValueType};

/// Index of a node within its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Line and position of a node in the text it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInfo {
    pub line: usize,
    pub position: usize,
}

/// The variant of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Object,
    Array,
    Constructor,
    Property,
    Value,
}

/// A node to be added to a document.
///
/// Containers start out empty and are filled with [`Document::insert`] and
/// [`Document::push`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeInit {
    Object,
    Array,
    Constructor(String),
    Value(Value),
}

/// The error type returned when building a document.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("can not add property to {0}")]
    NotAnObject(NodeType),
    #[error("can not add item to {0}")]
    NotIndexable(NodeType),
    #[error("can not add property {0}, a property with the same name already exists")]
    DuplicateProperty(Box<str>),
    #[error("node {0:?} does not belong to this document")]
    UnknownNode(NodeId),
}

#[derive(Debug, Clone)]
enum Kind {
    /// Maps names to property nodes, in insertion order.
    Object(IndexMap<String, NodeId>),
    Array(Vec<NodeId>),
    Constructor(String, Vec<NodeId>),
    /// The value is the only child.
    Property(String),
    Value(Value),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: Kind,
    parent: Option<NodeId>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    first: Option<NodeId>,
    last: Option<NodeId>,
    line_info: Option<LineInfo>,
}

/// An in-memory JSON document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    /// Creates a document with the given root node.
    pub fn new(root: impl Into<NodeInit>) -> Self {
        let mut doc = Document { nodes: vec![] };
        doc.alloc(root.into());
        doc
    }

    /// Returns the root node.
    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            doc: self,
            id: self.root_id(),
        }
    }

    /// Returns the id of the root node.
    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    /// Returns the node with the given id.
    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_>> {
        (id.0 < self.nodes.len()).then_some(NodeRef { doc: self, id })
    }

    /// Returns the number of nodes, including properties.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A document always holds its root, so this is never `true`.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a property to an object and returns the id of its value.
    pub fn insert(
        &mut self,
        object: NodeId,
        name: impl Into<String>,
        node: impl Into<NodeInit>,
    ) -> Result<NodeId, BuildError> {
        let name = name.into();
        match &self.data(object)?.kind {
            Kind::Object(properties) if properties.contains_key(&name) => {
                return Err(BuildError::DuplicateProperty(name.into()));
            }
            Kind::Object(_) => {}
            _ => return Err(BuildError::NotAnObject(self.node_type(object))),
        }
        Ok(self.append_property(object, name, node.into()))
    }

    /// Appends an item to an array or constructor and returns its id.
    pub fn push(
        &mut self,
        container: NodeId,
        node: impl Into<NodeInit>,
    ) -> Result<NodeId, BuildError> {
        if !matches!(self.data(container)?.kind, Kind::Array(_) | Kind::Constructor(..)) {
            return Err(BuildError::NotIndexable(self.node_type(container)));
        }
        Ok(self.append_item(container, node.into()))
    }

    /// Records where a node was read from.
    pub fn set_line_info(&mut self, id: NodeId, line_info: LineInfo) -> Result<(), BuildError> {
        self.nodes
            .get_mut(id.0)
            .ok_or(BuildError::UnknownNode(id))?
            .line_info = Some(line_info);
        Ok(())
    }

    fn data(&self, id: NodeId) -> Result<&NodeData, BuildError> {
        self.nodes.get(id.0).ok_or(BuildError::UnknownNode(id))
    }

    fn node_type(&self, id: NodeId) -> NodeType {
        NodeRef { doc: self, id }.node_type()
    }

    fn alloc(&mut self, init: NodeInit) -> NodeId {
        let kind = match init {
            NodeInit::Object => Kind::Object(IndexMap::new()),
            NodeInit::Array => Kind::Array(vec![]),
            NodeInit::Constructor(name) => Kind::Constructor(name, vec![]),
            NodeInit::Value(v) => Kind::Value(v),
        };
        self.alloc_kind(kind)
    }

    fn alloc_kind(&mut self, kind: Kind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            prev: None,
            next: None,
            first: None,
            last: None,
            line_info: None,
        });
        id
    }

    /// Links `child` as the last child of `parent`.
    fn link(&mut self, parent: NodeId, child: NodeId) {
        let prev = self.nodes[parent.0].last;
        match prev {
            Some(prev) => self.nodes[prev.0].next = Some(child),
            None => self.nodes[parent.0].first = Some(child),
        }
        self.nodes[parent.0].last = Some(child);
        let node = &mut self.nodes[child.0];
        node.parent = Some(parent);
        node.prev = prev;
    }

    /// Callers guarantee `object` is an object without a property `name`.
    pub(crate) fn append_property(&mut self, object: NodeId, name: String, init: NodeInit) -> NodeId {
        let property = self.alloc_kind(Kind::Property(name.clone()));
        if let Kind::Object(properties) = &mut self.nodes[object.0].kind {
            properties.insert(name, property);
        }
        self.link(object, property);
        let value = self.alloc(init);
        self.link(property, value);
        value
    }

    /// Callers guarantee `container` is an array or constructor.
    pub(crate) fn append_item(&mut self, container: NodeId, init: NodeInit) -> NodeId {
        let item = self.alloc(init);
        if let Kind::Array(items) | Kind::Constructor(_, items) = &mut self.nodes[container.0].kind {
            items.push(item);
        }
        self.link(container, item);
        item
    }
}

/// A borrowed node of a [`Document`].
#[derive(Clone, Copy)]
pub struct NodeRef<'d> {
    doc: &'d Document,
    id: NodeId,
}

impl<'d> NodeRef<'d> {
    /// Returns the id of the node.
    pub fn id(self) -> NodeId {
        self.id
    }

    /// Returns the document that owns the node.
    pub fn document(self) -> &'d Document {
        self.doc
    }

    fn data(self) -> &'d NodeData {
        &self.doc.nodes[self.id.0]
    }

    fn at(self, id: Option<NodeId>) -> Option<Self> {
        id.map(|id| NodeRef { doc: self.doc, id })
    }

    /// Returns the variant of the node.
    pub fn node_type(self) -> NodeType {
        match self.data().kind {
            Kind::Object(_) => NodeType::Object,
            Kind::Array(_) => NodeType::Array,
            Kind::Constructor(..) => NodeType::Constructor,
            Kind::Property(_) => NodeType::Property,
            Kind::Value(_) => NodeType::Value,
        }
    }

    pub fn is_object(self) -> bool {
        matches!(self.data().kind, Kind::Object(_))
    }

    pub fn is_array(self) -> bool {
        matches!(self.data().kind, Kind::Array(_))
    }

    pub fn is_property(self) -> bool {
        matches!(self.data().kind, Kind::Property(_))
    }

    /// Returns `true` for arrays and constructors.
    pub fn is_indexable(self) -> bool {
        matches!(self.data().kind, Kind::Array(_) | Kind::Constructor(..))
    }

    /// If the node is a primitive, returns its value.
    pub fn as_value(self) -> Option<&'d Value> {
        match &self.data().kind {
            Kind::Value(v) => Some(v),
            _ => None,
        }
    }

    /// If the node is a primitive, returns its type tag.
    pub fn value_type(self) -> Option<ValueType> {
        self.as_value().map(Value::value_type)
    }

    /// If the node is a property, returns its name.
    pub fn property_name(self) -> Option<&'d str> {
        match &self.data().kind {
            Kind::Property(name) => Some(name),
            _ => None,
        }
    }

    /// If the node is a constructor, returns its name.
    pub fn constructor_name(self) -> Option<&'d str> {
        match &self.data().kind {
            Kind::Constructor(name, _) => Some(name),
            _ => None,
        }
    }

    pub fn parent(self) -> Option<Self> {
        self.at(self.data().parent)
    }

    pub fn previous(self) -> Option<Self> {
        self.at(self.data().prev)
    }

    pub fn next(self) -> Option<Self> {
        self.at(self.data().next)
    }

    pub fn first(self) -> Option<Self> {
        self.at(self.data().first)
    }

    pub fn last(self) -> Option<Self> {
        self.at(self.data().last)
    }

    /// Returns `true` if the node has at least one child.
    pub fn has_values(self) -> bool {
        self.data().first.is_some()
    }

    /// Returns the number of children.
    ///
    /// For an object these are its properties.
    pub fn len(self) -> usize {
        match &self.data().kind {
            Kind::Object(properties) => properties.len(),
            Kind::Array(items) | Kind::Constructor(_, items) => items.len(),
            Kind::Property(_) => 1,
            Kind::Value(_) => 0,
        }
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Returns the value of the property with the given name.
    pub fn get(self, name: &str) -> Option<Self> {
        match &self.data().kind {
            Kind::Object(properties) => self.at(properties.get(name).copied())?.first(),
            _ => None,
        }
    }

    /// Like [`get`](Self::get), but falls back to the first property whose name
    /// matches ignoring case.
    pub fn get_ignore_case(self, name: &str) -> Option<Self> {
        let Kind::Object(properties) = &self.data().kind else {
            return None;
        };
        if let Some(value) = self.get(name) {
            return Some(value);
        }
        let folded = |s: &str| s.chars().flat_map(char::to_lowercase).collect::<String>();
        let name = folded(name);
        properties
            .iter()
            .find(|(key, _)| folded(key) == name)
            .and_then(|(_, &property)| self.at(Some(property))?.first())
    }

    /// Returns the item at the given index of an array or constructor.
    pub fn index(self, index: usize) -> Option<Self> {
        match &self.data().kind {
            Kind::Array(items) | Kind::Constructor(_, items) => {
                self.at(items.get(index).copied())
            }
            _ => None,
        }
    }

    /// Iterates over the direct children, following sibling links.
    ///
    /// The children of an object are its properties.
    pub fn children(self) -> Children<'d> {
        Children { next: self.first() }
    }

    /// Iterates over the child values: property values of an object, items of an
    /// array or constructor.
    pub fn values(self) -> impl Iterator<Item = NodeRef<'d>> + 'd {
        self.children()
            .filter_map(|child| if child.is_property() { child.first() } else { Some(child) })
    }

    /// Iterates over all descendants in document order, properties included.
    pub fn descendants(self) -> Descendants<'d> {
        Descendants {
            origin: self,
            current: Some(self),
        }
    }

    /// Returns where the node was read from, if known.
    pub fn line_info(self) -> Option<LineInfo> {
        self.data().line_info
    }

    /// Returns the path from the root to this node, like `a.b[0]['x y']`.
    ///
    /// The path of a property is the path of its value.
    pub fn path(self) -> String {
        enum Segment<'d> {
            Name(&'d str),
            Index(usize),
        }
        let mut segments = vec![];
        let mut node = self;
        while let Some(parent) = node.parent() {
            if let Some(name) = parent.property_name() {
                segments.push(Segment::Name(name));
                match parent.parent() {
                    Some(object) => node = object,
                    None => break,
                }
            } else if let Some(name) = node.property_name() {
                segments.push(Segment::Name(name));
                node = parent;
            } else {
                let index = parent.values().position(|v| v == node).unwrap_or_default();
                segments.push(Segment::Index(index));
                node = parent;
            }
        }
        let mut path = String::new();
        for segment in segments.iter().rev() {
            match segment {
                Segment::Name(name) => {
                    let leading_dot = !path.is_empty();
                    crate::ast::write_member(&mut path, name, leading_dot);
                }
                Segment::Index(i) => path.push_str(&format!("[{i}]")),
            }
        }
        path
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.as_value() {
            Some(v) => write!(f, "{:?}", v),
            None => write!(f, "{}('{}')", self.node_type(), self.path()),
        }
    }
}

impl Display for NodeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Object => write!(f, "object"),
            Self::Array => write!(f, "array"),
            Self::Constructor => write!(f, "constructor"),
            Self::Property => write!(f, "property"),
            Self::Value => write!(f, "value"),
        }
    }
}

impl From<Value> for NodeInit {
    fn from(v: Value) -> Self {
        NodeInit::Value(v)
    }
}

macro_rules! impl_from_primitive {
    ($($t:ty),*) => {
        $(
            impl From<$t> for NodeInit {
                fn from(v: $t) -> Self {
                    NodeInit::Value(Value::from(v))
                }
            }
        )*
    };
}

impl_from_primitive!(bool, i64, f64, &str, String);

/// Iterator over the direct children of a node.
#[derive(Debug, Clone)]
pub struct Children<'d> {
    next: Option<NodeRef<'d>>,
}

impl<'d> Iterator for Children<'d> {
    type Item = NodeRef<'d>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.next();
        Some(node)
    }
}

/// Pre-order iterator over the descendants of a node.
///
/// The walk follows first-child, next-sibling and parent links, so it needs no
/// stack however deep the tree is.
#[derive(Debug, Clone)]
pub struct Descendants<'d> {
    origin: NodeRef<'d>,
    /// The last node returned, `None` once the walk is over.
    current: Option<NodeRef<'d>>,
}

impl<'d> Iterator for Descendants<'d> {
    type Item = NodeRef<'d>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut node = self.current?;
        let next = match node.first() {
            Some(child) => Some(child),
            None => loop {
                if node == self.origin {
                    break None;
                }
                if let Some(sibling) = node.next() {
                    break Some(sibling);
                }
                match node.parent() {
                    Some(parent) => node = parent,
                    None => break None,
                }
            },
        };
        self.current = next;
        next
    }
}
