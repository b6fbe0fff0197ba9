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

use ::serde_json::{Map, Number};

use super::{Document, NodeId, NodeInit, NodeRef, Value};

impl Document {
    /// Parses JSON text into a document.
    pub fn from_json_str(s: &str) -> Result<Self, ::serde_json::Error> {
        let value: ::serde_json::Value = ::serde_json::from_str(s)?;
        Ok(Document::from(&value))
    }
}

impl From<&::serde_json::Value> for Document {
    fn from(value: &::serde_json::Value) -> Self {
        let mut doc = Document::new(shell(value));
        let root = doc.root_id();
        fill(&mut doc, root, value);
        tracing::debug!(nodes = doc.len(), "built document from json");
        doc
    }
}

/// A scalar, or an empty container to be filled by [`fill`].
fn shell(value: &::serde_json::Value) -> NodeInit {
    match value {
        ::serde_json::Value::Null => NodeInit::Value(Value::Null),
        ::serde_json::Value::Bool(b) => NodeInit::Value(Value::Boolean(*b)),
        ::serde_json::Value::Number(n) => NodeInit::Value(number(n)),
        ::serde_json::Value::String(s) => NodeInit::Value(Value::String(s.clone())),
        ::serde_json::Value::Array(_) => NodeInit::Array,
        ::serde_json::Value::Object(_) => NodeInit::Object,
    }
}

fn number(n: &Number) -> Value {
    match n.as_i64() {
        Some(i) => Value::Integer(i),
        // u64 above i64::MAX and all non-integral numbers
        None => n.as_f64().map_or(Value::Null, Value::Float),
    }
}

fn fill(doc: &mut Document, id: NodeId, value: &::serde_json::Value) {
    match value {
        ::serde_json::Value::Array(items) => {
            for item in items {
                let child = doc.append_item(id, shell(item));
                fill(doc, child, item);
            }
        }
        ::serde_json::Value::Object(object) => {
            for (name, item) in object {
                let child = doc.append_property(id, name.clone(), shell(item));
                fill(doc, child, item);
            }
        }
        _ => {}
    }
}

impl NodeRef<'_> {
    /// Converts the node into a [`serde_json::Value`](::serde_json::Value).
    ///
    /// Primitives without a JSON counterpart become their canonical strings,
    /// constructors become arrays of their items and a property becomes its value.
    pub fn to_json(self) -> ::serde_json::Value {
        if let Some(value) = self.as_value() {
            return match value {
                Value::Null => ::serde_json::Value::Null,
                Value::Boolean(b) => ::serde_json::Value::Bool(*b),
                Value::Integer(i) => ::serde_json::Value::Number(Number::from(*i)),
                Value::Float(f) => Number::from_f64(*f)
                    .map_or(::serde_json::Value::Null, ::serde_json::Value::Number),
                Value::String(s) => ::serde_json::Value::String(s.clone()),
                other => ::serde_json::Value::String(other.to_string()),
            };
        }
        if self.is_object() {
            let object: Map<String, ::serde_json::Value> = self
                .children()
                .filter_map(|p| Some((p.property_name()?.to_owned(), p.first()?.to_json())))
                .collect();
            return ::serde_json::Value::Object(object);
        }
        if self.is_property() {
            return self.first().map_or(::serde_json::Value::Null, NodeRef::to_json);
        }
        ::serde_json::Value::Array(self.values().map(NodeRef::to_json).collect())
    }
}
