//! Core data model types for conversion.
//!
//! The converter reads a [`FlatDocument`] and produces a tree of [`Node`]s whose leaves are
//! [`TypedValue`]s: scalars that remember whether they were actually derived from input data.

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Flat key→value document as exported by the instrument software.
///
/// Keys are opaque strings (conventionally `.`-joined); lookups are exact.
pub type FlatDocument = BTreeMap<String, String>;

/// Children of a container node, keyed by field name.
pub type Object = BTreeMap<String, Node>;

/// Logical data type of a mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
}

impl DataType {
    /// Parse a declared type name from a mapping table (case-insensitive).
    ///
    /// Accepts `int`, `float`, `float64`, `bool` and `string`. Anything else is `None`.
    pub fn from_declared(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "int" => Some(Self::Int64),
            "float" | "float64" => Some(Self::Float64),
            "bool" => Some(Self::Bool),
            "string" => Some(Self::Utf8),
            _ => None,
        }
    }

    /// The zero value of this type.
    pub fn zero(self) -> Value {
        match self {
            Self::Int64 => Value::Int64(0),
            Self::Float64 => Value::Float64(0.0),
            Self::Bool => Value::Bool(false),
            Self::Utf8 => Value::Utf8(String::new()),
        }
    }
}

/// A single scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// The [`DataType`] this value belongs to.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Int64(_) => DataType::Int64,
            Self::Float64(_) => DataType::Float64,
            Self::Bool(_) => DataType::Bool,
            Self::Utf8(_) => DataType::Utf8,
        }
    }
}

/// A typed scalar that distinguishes "set from source data" from "absent".
///
/// An unset value is equivalent to a missing field no matter what it holds; the pruner removes
/// it before serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    value: Value,
    unit: String,
    is_set: bool,
}

impl TypedValue {
    /// A value that was derived from input data.
    pub fn set(value: Value, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
            is_set: true,
        }
    }

    /// An absent value of the given type. Holds the type's zero value.
    pub fn unset(data_type: DataType) -> Self {
        Self {
            value: data_type.zero(),
            unit: String::new(),
            is_set: false,
        }
    }

    pub fn is_set(&self) -> bool {
        self.is_set
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Unit label; only meaningful for numeric values. Empty when none.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn data_type(&self) -> DataType {
        self.value.data_type()
    }
}

impl Serialize for TypedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if !self.is_set {
            return serializer.serialize_none();
        }
        let numeric = matches!(self.value, Value::Int64(_) | Value::Float64(_));
        if numeric && !self.unit.is_empty() {
            let mut map = serializer.serialize_map(Some(2))?;
            map.serialize_entry("value", &ScalarRef(&self.value))?;
            map.serialize_entry("unit", &self.unit)?;
            map.end()
        } else {
            ScalarRef(&self.value).serialize(serializer)
        }
    }
}

struct ScalarRef<'a>(&'a Value);

impl Serialize for ScalarRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Int64(v) => serializer.serialize_i64(*v),
            Value::Float64(v) => serializer.serialize_f64(*v),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Utf8(v) => serializer.serialize_str(v),
        }
    }
}

/// A node of the output tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Container of named children.
    Object(Object),
    /// Ordered sequence, normally of containers.
    Array(Vec<Node>),
    /// Typed leaf produced by conversion.
    Value(TypedValue),
    /// Pre-built JSON supplied by a caller. Kept by the pruner unless it is `null`.
    Raw(serde_json::Value),
}

impl Node {
    /// An empty container.
    pub fn object() -> Self {
        Self::Object(Object::new())
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&TypedValue> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Look up a descendant by dot path. Numeric segments index into arrays.
    ///
    /// ```
    /// use oscem_converter::types::{Node, TypedValue, Value};
    ///
    /// let mut root = oscem_converter::types::Object::new();
    /// root.insert(
    ///     "detectors".to_string(),
    ///     Node::Array(vec![Node::Object(
    ///         [("name".to_string(), Node::Value(TypedValue::set(Value::Utf8("K3".into()), "")))]
    ///             .into_iter()
    ///             .collect(),
    ///     )]),
    /// );
    /// let tree = Node::Object(root);
    /// let name = tree.get("detectors.0.name").and_then(Node::as_value).unwrap();
    /// assert_eq!(name.value(), &Value::Utf8("K3".into()));
    /// ```
    pub fn get(&self, path: &str) -> Option<&Node> {
        let mut current = self;
        for segment in path.split('.') {
            current = match current {
                Self::Object(map) => map.get(segment)?,
                Self::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Render the node as a `serde_json::Value`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Self::Array(items) => serializer.collect_seq(items),
            Self::Value(v) => v.serialize(serializer),
            Self::Raw(v) => v.serialize(serializer),
        }
    }
}
