use std::any::Any;
use std::collections::HashMap;

use crate::error::GraphError;
use crate::filter::Filter;

/// A filter constructor taking an opaque, plugin-specific config
/// (spec §6: "Filters are registered by string name ... with a factory
/// taking `(Host*, void* config)`"). The host is injected by the runtime at
/// `add` time, not by the factory, so factories here only need the config.
pub type FilterFactory =
    Box<dyn Fn(&dyn Any) -> Result<Box<dyn Filter>, GraphError> + Send + Sync>;

/// Maps a plugin name (`"MPEG_DASH"`, `"TsDemuxer"`, `"HTTP"`, ...) to the
/// factory that builds it, mirroring `original_source`'s
/// `Factory::registerModule`.
#[derive(Default)]
pub struct FilterRegistry {
    factories: HashMap<&'static str, FilterFactory>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, factory: FilterFactory) -> Result<(), GraphError> {
        if self.factories.contains_key(name) {
            return Err(GraphError::DuplicateFilter(name.to_string()));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn build(&self, name: &str, config: &dyn Any) -> Result<Box<dyn Filter>, GraphError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| GraphError::UnknownFilter(name.to_string()))?;
        factory(config)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Filter, FilterHost};
    use crate::pin::{Input, Output};
    use std::sync::Arc;

    struct NoopFilter;
    impl Filter for NoopFilter {
        fn name(&self) -> &str {
            "noop"
        }
        fn inputs(&self) -> &[Arc<Input>] {
            &[]
        }
        fn outputs(&self) -> &[Output] {
            &[]
        }
        fn process(&mut self, _host: &dyn FilterHost) -> Result<(), crate::error::FilterError> {
            Ok(())
        }
        fn flush(&mut self, _host: &dyn FilterHost) -> Result<(), crate::error::FilterError> {
            Ok(())
        }
    }

    #[test]
    fn unknown_name_errors() {
        let registry = FilterRegistry::new();
        assert!(registry.build("NOPE", &()).is_err());
    }

    #[test]
    fn duplicate_registration_errors() {
        let mut registry = FilterRegistry::new();
        registry
            .register("Noop", Box::new(|_cfg| Ok(Box::new(NoopFilter) as Box<dyn Filter>)))
            .unwrap();
        let err = registry.register("Noop", Box::new(|_cfg| Ok(Box::new(NoopFilter) as Box<dyn Filter>)));
        assert!(err.is_err());
    }

    #[test]
    fn registered_factory_builds() {
        let mut registry = FilterRegistry::new();
        registry
            .register("Noop", Box::new(|_cfg| Ok(Box::new(NoopFilter) as Box<dyn Filter>)))
            .unwrap();
        let filter = registry.build("Noop", &()).unwrap();
        assert_eq!(filter.name(), "noop");
    }
}
