//! Release context shared between plugins.

use serde_json::{Map, Value};

/// Shared state for one release run.
///
/// Values are addressed by dotted paths (`github.username`). Writes merge
/// into existing mappings, so a plugin setting one key under a namespace
/// leaves its siblings in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleaseContext {
    root: Map<String, Value>,
}

impl ReleaseContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value at a dotted path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        segments.try_fold(self.root.get(first)?, |value, key| value.get(key))
    }

    /// Returns the string at a dotted path.
    #[must_use]
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Returns the boolean at a dotted path.
    #[must_use]
    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Value::as_bool)
    }

    /// Returns the integer at a dotted path.
    #[must_use]
    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(Value::as_u64)
    }

    /// Merges a mapping into the context.
    ///
    /// Nested objects merge key by key; any other value replaces what was
    /// there. A non-object `partial` is ignored.
    pub fn set(&mut self, partial: Value) {
        if let Value::Object(partial) = partial {
            merge(&mut self.root, partial);
        }
    }

    /// Sets a single value at a dotted path, creating parents as needed.
    pub fn set_path(&mut self, path: &str, value: Value) {
        let nested = path
            .rsplit('.')
            .fold(value, |inner, key| {
                let mut map = Map::new();
                map.insert(key.to_string(), inner);
                Value::Object(map)
            });
        self.set(nested);
    }

    /// Returns `true` if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Returns the whole store as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }
}

fn merge(target: &mut Map<String, Value>, partial: Map<String, Value>) {
    for (key, value) in partial {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => merge(existing, incoming),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}
