//! A2UI Data Model
//!
//! The DataModel is the JSON document attached to a surface. Components hold
//! JSON Pointer strings into it rather than inline data, which keeps streamed
//! messages small.

use serde::{Serialize, Serializer, de::DeserializeOwned};
use serde_json::{Map, Value};

use super::pointer::{self, PointerError};

/// A JSON document addressed through JSON Pointer paths.
///
/// The model supports:
/// - Reading values by pointer, raw or typed
/// - Pointer writes, array appends and merge patches
/// - A version counter bumped on every mutation
///
/// # Example
///
/// ```rust,ignore
/// let mut model = DataModel::new();
///
/// model.set("/user/name", json!("Alice"))?;
/// model.append("/events", vec![json!({"date": "2024-01-01", "title": "Kickoff"})])?;
///
/// let name = model.get_string("/user/name"); // Some("Alice")
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DataModel {
    /// The root data value
    data: Value,

    /// Version counter for change detection
    version: u64,
}

impl Default for DataModel {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for DataModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.data.serialize(serializer)
    }
}

impl DataModel {
    /// Create a new empty data model (`{}`)
    pub fn new() -> Self {
        DataModel {
            data: Value::Object(Map::new()),
            version: 0,
        }
    }

    /// Create a data model with initial data
    pub fn with_data(data: Value) -> Self {
        DataModel { data, version: 0 }
    }

    /// Get the current version number
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Resolve a pointer, surfacing malformed pointers as errors.
    pub fn resolve(&self, path: &str) -> Result<Option<&Value>, PointerError> {
        pointer::resolve_pointer(&self.data, path)
    }

    /// Get a value at the given path. Malformed pointers read as absent.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.resolve(path).ok().flatten()
    }

    /// Get a string value at the given path
    pub fn get_string(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }

    /// Get a number value at the given path
    pub fn get_number(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(|v| v.as_f64())
    }

    /// Get a boolean value at the given path
    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(|v| v.as_bool())
    }

    /// Get an array value at the given path
    pub fn get_array(&self, path: &str) -> Option<&Vec<Value>> {
        self.get(path).and_then(|v| v.as_array())
    }

    /// Get an object value at the given path
    pub fn get_object(&self, path: &str) -> Option<&Map<String, Value>> {
        self.get(path).and_then(|v| v.as_object())
    }

    /// Deserialize the value at `path` into `T`.
    ///
    /// Returns `None` when the path is absent or the value does not fit `T`.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.get(path)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a value at the given path.
    ///
    /// Creates intermediate objects/arrays as needed.
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), PointerError> {
        self.data = pointer::set_pointer(&self.data, path, value)?;
        self.version += 1;
        Ok(())
    }

    /// Append items to the array at `path`, creating it if absent.
    pub fn append(&mut self, path: &str, items: Vec<Value>) -> Result<(), PointerError> {
        self.data = pointer::append_at_pointer(&self.data, path, items)?;
        self.version += 1;
        Ok(())
    }

    /// Deep-merge `patch` into the root object.
    ///
    /// `null` deletes a key; objects merge into objects; anything else
    /// replaces. A non-object root is treated as `{}`.
    pub fn patch(&mut self, patch: &Map<String, Value>) {
        let mut root = match std::mem::take(&mut self.data) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        merge_patch(&mut root, patch);
        self.data = Value::Object(root);
        self.version += 1;
    }

    /// Get the entire data as a Value
    pub fn as_value(&self) -> &Value {
        &self.data
    }
}

/// Merge `patch` into `target` one level at a time.
///
/// Recursion only happens where both sides hold a plain object at the same
/// key. Arrays are replaced wholesale.
pub fn merge_patch(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        if value.is_null() {
            target.shift_remove(key);
            continue;
        }
        if let (Value::Object(nested), Some(Value::Object(existing))) = (value, target.get_mut(key)) {
            merge_patch(existing, nested);
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}
