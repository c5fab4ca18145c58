use super::{DeferError, Record, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn new_persist_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generic persisted row used by the in-memory store.
///
/// Two entities are equal when their persist ids are equal, regardless of
/// field contents, so a stale copy and a freshly fetched copy of the same
/// row compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub persist_id: String,
    pub fields: serde_json::Value,
    pub persisted: bool,
}

impl Entity {
    /// Creates an unsaved entity. `fields` must be a JSON object.
    pub fn new(fields: serde_json::Value) -> Result<Self> {
        if !fields.is_object() {
            return Err(DeferError::InvalidArgument(format!(
                "entity fields must be a JSON object, got {}",
                fields
            )));
        }
        Ok(Self {
            persist_id: new_persist_id(),
            fields,
            persisted: false,
        })
    }

    pub fn with_id(persist_id: impl Into<String>, fields: serde_json::Value) -> Result<Self> {
        let mut entity = Self::new(fields)?;
        entity.persist_id = persist_id.into();
        Ok(entity)
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Returns a single field, if present.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: serde_json::Value) -> Result<()> {
        let fields = self.fields.as_object_mut().ok_or_else(|| {
            DeferError::InvalidArgument("entity fields must be a JSON object".to_string())
        })?;
        fields.insert(name.into(), value);
        Ok(())
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.persist_id == other.persist_id
    }
}

impl Eq for Entity {}

impl Record for Entity {
    type Id = String;

    fn id(&self) -> String {
        self.persist_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_rejects_non_object_fields() {
        let err = Entity::new(json!([1, 2])).unwrap_err();
        assert!(matches!(err, DeferError::InvalidArgument(_)));
    }

    #[test]
    fn test_entity_equality_by_persist_id() {
        let a = Entity::with_id("a", json!({"name": "old"})).unwrap();
        let b = Entity::with_id("a", json!({"name": "new"})).unwrap();
        let c = Entity::with_id("c", json!({"name": "old"})).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_entity_new_is_unsaved() {
        let mut entity = Entity::new(json!({})).unwrap();
        assert!(!entity.is_persisted());
        entity.set_field("title", json!("Rust")).unwrap();
        assert_eq!(entity.field("title"), Some(&json!("Rust")));
        assert_eq!(entity.id(), entity.persist_id);
    }
}
