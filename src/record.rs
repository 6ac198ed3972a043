use crate::core::{DbError, Result, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Reads one field of a record. `None` means the record does not carry the field.
pub type Accessor<R> = Arc<dyn Fn(&R) -> Option<Value> + Send + Sync>;

type AccessorFactory<R> = Arc<dyn Fn(&str) -> Option<Accessor<R>> + Send + Sync>;

/// Table of named field accessors for a record type.
///
/// Field references are looked up here once, when an operator is built; the
/// resulting accessors are then applied to every row of every invocation.
/// A factory may be installed for record types whose fields are only known by
/// name (JSON objects, maps); it is consulted for names with no explicit entry.
pub struct FieldAccessors<R> {
    fields: HashMap<String, Accessor<R>>,
    factory: Option<AccessorFactory<R>>,
}

impl<R> FieldAccessors<R> {
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
            factory: None,
        }
    }

    /// Register an accessor that may report the field as absent.
    pub fn field<F>(mut self, name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&R) -> Option<Value> + Send + Sync + 'static,
    {
        self.fields.insert(name.into(), Arc::new(accessor));
        self
    }

    /// Register an accessor for a field every record carries.
    pub fn value<F, V>(self, name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&R) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.field(name, move |record| Some(accessor(record).into()))
    }

    /// Install a factory consulted for names without an explicit accessor.
    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str) -> Option<Accessor<R>> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Resolve a field path to its accessor.
    pub fn resolve(&self, path: &str) -> Result<Accessor<R>> {
        if let Some(accessor) = self.fields.get(path) {
            return Ok(Arc::clone(accessor));
        }
        self.factory
            .as_ref()
            .and_then(|factory| factory(path))
            .ok_or_else(|| DbError::Binding(format!("no accessor registered for field '{}'", path)))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.resolve(path).is_ok()
    }

    /// Names with an explicit accessor, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<R> Default for FieldAccessors<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for FieldAccessors<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAccessors")
            .field("fields", &self.names())
            .field("dynamic", &self.factory.is_some())
            .finish()
    }
}

impl FieldAccessors<serde_json::Value> {
    /// Accessors for JSON object records; dotted paths walk nested objects.
    pub fn json() -> Self {
        Self::new().with_factory(|path| {
            let segments: Vec<String> = path.split('.').map(str::to_string).collect();
            let accessor: Accessor<serde_json::Value> = Arc::new(move |record: &serde_json::Value| {
                let mut current = record;
                for segment in &segments {
                    current = current.get(segment.as_str())?;
                }
                Value::from_json(current)
            });
            Some(accessor)
        })
    }
}

impl FieldAccessors<BTreeMap<String, Value>> {
    /// Accessors for map records keyed by field name.
    pub fn map() -> Self {
        Self::new().with_factory(|path| {
            let key = path.to_string();
            let accessor: Accessor<BTreeMap<String, Value>> =
                Arc::new(move |record: &BTreeMap<String, Value>| record.get(&key).cloned());
            Some(accessor)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct User {
        id: i64,
        name: String,
        email: Option<String>,
    }

    #[test]
    fn test_explicit_accessors() {
        let accessors = FieldAccessors::<User>::new()
            .value("id", |u: &User| u.id)
            .value("name", |u: &User| u.name.clone())
            .field("email", |u: &User| u.email.clone().map(Value::from));

        let user = User {
            id: 7,
            name: "ash".into(),
            email: None,
        };
        assert_eq!(accessors.resolve("id").unwrap()(&user), Some(Value::Integer(7)));
        assert_eq!(accessors.resolve("name").unwrap()(&user), Some(Value::from("ash")));
        assert_eq!(accessors.resolve("email").unwrap()(&user), None);
        assert_eq!(accessors.names(), vec!["email", "id", "name"]);
    }

    #[test]
    fn test_unknown_field_is_binding_error() {
        let accessors = FieldAccessors::<User>::new().value("id", |u: &User| u.id);
        let err = accessors.resolve("age").err().unwrap();
        assert!(matches!(err, DbError::Binding(_)));
        assert!(!accessors.contains("age"));
    }

    #[test]
    fn test_json_accessors_walk_paths() {
        let accessors = FieldAccessors::json();
        let record = json!({"id": 10, "profile": {"name": "lucy"}});

        assert_eq!(accessors.resolve("id").unwrap()(&record), Some(Value::Integer(10)));
        assert_eq!(
            accessors.resolve("profile.name").unwrap()(&record),
            Some(Value::from("lucy"))
        );
        assert_eq!(accessors.resolve("profile.age").unwrap()(&record), None);
    }

    #[test]
    fn test_map_accessors() {
        let accessors = FieldAccessors::map();
        let mut record = BTreeMap::new();
        record.insert("id".to_string(), Value::Integer(3));

        assert_eq!(accessors.resolve("id").unwrap()(&record), Some(Value::Integer(3)));
        assert_eq!(accessors.resolve("name").unwrap()(&record), None);
    }
}
