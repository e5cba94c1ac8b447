//! Resource enrichment registry.
//!
//! Hosts register per-type enrichers that add computed attributes to a
//! resource snapshot after store lookup (e.g. derive `custom.highValue` from
//! a purchase request's total). Enrichers are looked up by resource type;
//! unregistered types pass through unchanged.

use std::collections::HashMap;

use verdict_types::AttributeValue;

use crate::attributes::Resource;

/// An enricher mutates the resource's `custom` attribute table in place.
///
/// The instance id is `None` when only type-level defaults were resolved.
pub type Enricher =
    Box<dyn Fn(Option<&str>, &mut HashMap<String, AttributeValue>) + Send + Sync>;

/// Type-keyed table of resource enrichers.
#[derive(Default)]
pub struct EnrichmentRegistry {
    enrichers: HashMap<String, Enricher>,
}

impl EnrichmentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an enricher for a resource type, replacing any previous one.
    pub fn register<F>(&mut self, resource_type: &str, enricher: F)
    where
        F: Fn(Option<&str>, &mut HashMap<String, AttributeValue>) + Send + Sync + 'static,
    {
        self.enrichers
            .insert(resource_type.to_string(), Box::new(enricher));
    }

    /// Applies the registered enricher for the resource's type, if any.
    pub fn apply(&self, resource: &mut Resource) {
        if let Some(enricher) = self.enrichers.get(&resource.resource_type) {
            enricher(resource.resource_id.as_deref(), &mut resource.custom);
        }
    }
}

impl std::fmt::Debug for EnrichmentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentRegistry")
            .field("types", &self.enrichers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enricher_applies_by_type() {
        let mut registry = EnrichmentRegistry::new();
        registry.register("purchase_request", |id, custom| {
            custom.insert(
                "hasInstance".to_string(),
                AttributeValue::Bool(id.is_some()),
            );
        });

        let mut resource = Resource::type_defaults("purchase_request");
        registry.apply(&mut resource);
        assert_eq!(
            resource.custom.get("hasInstance"),
            Some(&AttributeValue::Bool(false))
        );

        let mut other = Resource::type_defaults("report");
        registry.apply(&mut other);
        assert!(other.custom.is_empty());
    }

    #[test]
    fn test_reregistering_replaces() {
        let mut registry = EnrichmentRegistry::new();
        registry.register("doc", |_, custom| {
            custom.insert("v".to_string(), AttributeValue::Int(1));
        });
        registry.register("doc", |_, custom| {
            custom.insert("v".to_string(), AttributeValue::Int(2));
        });

        let mut resource = Resource::type_defaults("doc");
        registry.apply(&mut resource);
        assert_eq!(resource.custom.get("v"), Some(&AttributeValue::Int(2)));
    }
}
