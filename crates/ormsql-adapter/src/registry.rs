//! Registry of defined models.

use std::sync::Arc;

use ormsql_core::ModelSchema;
use parking_lot::RwLock;

/// Models known to an adapter, in definition order.
///
/// Lookups hand out `Arc` snapshots, so redefining a model never affects a
/// call already in flight.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: RwLock<Vec<Arc<ModelSchema>>>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model, replacing any model of the same name in place.
    pub fn insert(&self, model: ModelSchema) -> Arc<ModelSchema> {
        let model = Arc::new(model);
        let mut models = self.models.write();
        match models.iter_mut().find(|m| m.name == model.name) {
            Some(slot) => *slot = Arc::clone(&model),
            None => models.push(Arc::clone(&model)),
        }
        model
    }

    /// Snapshot of the named model.
    pub fn get(&self, name: &str) -> Option<Arc<ModelSchema>> {
        self.models.read().iter().find(|m| m.name == name).cloned()
    }

    /// Snapshots of every model, in definition order.
    pub fn all(&self) -> Vec<Arc<ModelSchema>> {
        self.models.read().clone()
    }

    /// Number of models.
    pub fn len(&self) -> usize {
        self.models.read().len()
    }

    /// True when no model is defined.
    pub fn is_empty(&self) -> bool {
        self.models.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormsql_core::{PropertyDef, PropertyType};

    #[test]
    fn test_insert_and_get() {
        let registry = ModelRegistry::new();
        assert!(registry.is_empty());

        registry.insert(ModelSchema::new("Person"));
        registry.insert(ModelSchema::new("Order"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("Order").unwrap().name, "Order");
        assert!(registry.get("Missing").is_none());
    }

    #[test]
    fn test_redefine_keeps_position() {
        let registry = ModelRegistry::new();
        registry.insert(ModelSchema::new("A"));
        let old = registry.insert(ModelSchema::new("B"));
        registry.insert(ModelSchema::new("C"));

        let new = registry.insert(
            ModelSchema::new("B").with_property(PropertyDef::new("x", PropertyType::String)),
        );
        let names: Vec<_> = registry.all().iter().map(|m| m.name.clone()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert!(old.properties.is_empty());
        assert_eq!(new.properties.len(), 1);
        assert_eq!(registry.get("B").unwrap().properties.len(), 1);
    }
}
