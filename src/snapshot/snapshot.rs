use crate::binder::{BoundMethod, MethodTable};
use crate::namespace::NamespaceKey;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::ops::Index;
use std::sync::Arc;

/// One field of a namespace entry: a piece of state or a bound method.
#[derive(Clone, Debug)]
pub enum Field {
    Value(Value),
    Method(BoundMethod),
}

impl Field {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Field::Value(value) => Some(value),
            Field::Method(_) => None,
        }
    }

    pub fn as_method(&self) -> Option<&BoundMethod> {
        match self {
            Field::Method(method) => Some(method),
            Field::Value(_) => None,
        }
    }
}

/// A unit's contribution to the snapshot: its state fields followed by its
/// methods.
#[derive(Clone, Debug, Default)]
pub struct NamespaceEntry {
    fields: IndexMap<String, Field>,
}

impl NamespaceEntry {
    /// Merge state and methods. A method replaces a state field of the same
    /// name.
    pub fn new(state: Map<String, Value>, methods: MethodTable) -> Self {
        let mut fields = IndexMap::with_capacity(state.len() + methods.len());
        for (name, value) in state {
            fields.insert(name, Field::Value(value));
        }
        for (name, method) in methods {
            fields.insert(name, Field::Method(method));
        }
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// A state field by name.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(Field::as_value)
    }

    /// A bound method by name.
    pub fn method(&self, name: &str) -> Option<&BoundMethod> {
        self.get(name).and_then(Field::as_method)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// State fields only, as a JSON object.
    pub fn state_json(&self) -> Value {
        let state = self
            .fields
            .iter()
            .filter_map(|(name, field)| field.as_value().map(|v| (name.clone(), v.clone())))
            .collect::<Map<_, _>>();
        Value::Object(state)
    }
}

impl Index<&str> for NamespaceEntry {
    type Output = Field;

    fn index(&self, name: &str) -> &Field {
        match self.get(name) {
            Some(field) => field,
            None => panic!("no field `{name}` in namespace entry"),
        }
    }
}

type Entries = IndexMap<NamespaceKey, Arc<NamespaceEntry>>;

/// An immutable, ordered map from namespace key to unit entry.
///
/// Cloning a snapshot is cheap and yields the same object (see
/// [`Snapshot::ptr_eq`]); folding an entry in always yields a new one.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    entries: Arc<Entries>,
    version: u64,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fold one unit's entry into a new snapshot.
    ///
    /// An existing key keeps its position, so the key order is stable across
    /// re-renders.
    pub fn with_entry(&self, key: NamespaceKey, entry: NamespaceEntry) -> Self {
        let mut entries = Entries::clone(&self.entries);
        entries.insert(key, Arc::new(entry));
        Self {
            entries: Arc::new(entries),
            version: self.version + 1,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Arc<NamespaceEntry>> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &NamespaceKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NamespaceKey, &Arc<NamespaceEntry>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of folds that produced this snapshot.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether both handles point at the same snapshot object.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    /// State of every namespace as one JSON object, methods left out.
    pub fn state_json(&self) -> Value {
        let state = self
            .entries
            .iter()
            .map(|(key, entry)| (key.to_string(), entry.state_json()))
            .collect::<Map<_, _>>();
        Value::Object(state)
    }
}

impl Index<&str> for Snapshot {
    type Output = NamespaceEntry;

    fn index(&self, key: &str) -> &NamespaceEntry {
        match self.get(key) {
            Some(entry) => entry.as_ref(),
            None => panic!("no namespace `{key}` in snapshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn entry_exposes_state_fields() {
        let entry = NamespaceEntry::new(state(json!({"b": 1, "a": 2})), MethodTable::new());
        assert_eq!(entry.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(entry.value("a"), Some(&json!(2)));
        assert!(entry.method("a").is_none());
    }

    #[test]
    fn fold_produces_new_snapshot() {
        let empty = Snapshot::empty();
        let one = empty.with_entry(
            NamespaceKey::derive("Counter"),
            NamespaceEntry::new(state(json!({"count": 0})), MethodTable::new()),
        );

        assert!(empty.is_empty());
        assert_eq!(one.len(), 1);
        assert!(!one.ptr_eq(&empty));
        assert!(one.ptr_eq(&one.clone()));
        assert_eq!(one.version(), 1);
        assert_eq!(one["counter"].value("count"), Some(&json!(0)));
    }

    #[test]
    fn refold_keeps_position_and_shares_other_entries() {
        let snapshot = Snapshot::empty()
            .with_entry(
                NamespaceKey::derive("Counter"),
                NamespaceEntry::new(state(json!({"count": 0})), MethodTable::new()),
            )
            .with_entry(
                NamespaceKey::derive("Toggle"),
                NamespaceEntry::new(state(json!({"on": false})), MethodTable::new()),
            );

        let next = snapshot.with_entry(
            NamespaceKey::derive("Counter"),
            NamespaceEntry::new(state(json!({"count": 1})), MethodTable::new()),
        );

        assert_eq!(
            next.keys().map(NamespaceKey::as_str).collect::<Vec<_>>(),
            vec!["counter", "toggle"]
        );
        assert!(Arc::ptr_eq(&snapshot.entries["toggle"], &next.entries["toggle"]));
        assert_eq!(snapshot.state_json(), json!({"counter": {"count": 0}, "toggle": {"on": false}}));
        assert_eq!(next.state_json(), json!({"counter": {"count": 1}, "toggle": {"on": false}}));
    }
}
