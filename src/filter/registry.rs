//! Filter factories by name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::filter::builtin;
use crate::filter::spec::FilterSpec;
use crate::filter::GatewayFilter;

/// Builds a filter instance from its validated spec.
pub type FilterFactory =
    Arc<dyn Fn(&FilterSpec) -> Result<Arc<dyn GatewayFilter>, String> + Send + Sync>;

/// Maps filter names to factories.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    factories: HashMap<String, FilterFactory>,
}

impl FilterRegistry {
    /// A registry with no filters.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in filters.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Register (or replace) the factory for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&FilterSpec) -> Result<Arc<dyn GatewayFilter>, String> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build a filter; `None` if no factory is registered under the spec's name.
    pub fn build(&self, spec: &FilterSpec) -> Option<Result<Arc<dyn GatewayFilter>, String>> {
        self.factories.get(spec.name()).map(|factory| factory(spec))
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("filters", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FilterDefinition, Phase};

    #[derive(Debug)]
    struct Noop;

    impl GatewayFilter for Noop {
        fn name(&self) -> &str {
            "Noop"
        }
    }

    #[test]
    fn test_builtins_registered() {
        let registry = FilterRegistry::with_builtins();
        for name in ["AddRequestHeader", "AddResponseHeader", "Logger", "RequireHeader"] {
            assert!(registry.contains(name), "missing {}", name);
        }
        assert!(FilterRegistry::new().names().is_empty());
    }

    #[test]
    fn test_custom_factory() {
        let mut registry = FilterRegistry::new();
        registry.register("Noop", |_spec| Ok(Arc::new(Noop) as Arc<dyn GatewayFilter>));

        let spec = FilterSpec::from_definition(&FilterDefinition::new("Noop", Phase::Pre)).unwrap();
        let filter = registry.build(&spec).unwrap().unwrap();
        assert_eq!(filter.name(), "Noop");

        let unknown = FilterSpec::from_definition(&FilterDefinition::new("Other", Phase::Pre)).unwrap();
        assert!(registry.build(&unknown).is_none());
    }
}
