//! Process-wide driver registry.
//!
//! Maps a URL scheme to a driver constructor. Registration is
//! idempotent-forbidding: two backends claiming the same scheme in one
//! program is a fatal configuration error, so `register` panics on a
//! duplicate. Lookup of an unknown scheme is a normal error, since the
//! caller chose the scheme from user input.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::error::{MigrateError, Result};

use super::Driver;

/// Constructs a fresh, uninitialized driver.
pub type Constructor = fn() -> Box<dyn Driver>;

/// Hook applied to every driver built for a scheme, before `initialize`.
/// Used by the named-method extension to attach a method set.
type InitHook = Arc<dyn Fn(&mut dyn Driver) + Send + Sync>;

struct Factory {
    constructor: Constructor,
    init_hooks: Vec<InitHook>,
}

/// A table of driver factories keyed by URL scheme.
///
/// One process-wide instance lives behind [`global`]; separate instances are
/// constructed directly in tests.
#[derive(Default)]
pub struct Registry {
    factories: Mutex<HashMap<String, Factory>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver constructor for a scheme.
    ///
    /// Panics on a duplicate scheme or if a probe instance reports an
    /// invalid filename extension (fail fast at startup, not at run time).
    pub fn register(&self, scheme: &str, constructor: Constructor) {
        verify_filename_extension(scheme, constructor().as_ref());
        let mut factories = self.factories.lock().expect("driver registry poisoned");
        if factories.contains_key(scheme) {
            panic!("driver registry: register called twice for scheme '{scheme}'");
        }
        factories.insert(
            scheme.to_string(),
            Factory {
                constructor,
                init_hooks: Vec::new(),
            },
        );
    }

    /// Add an init hook for an already-registered scheme.
    ///
    /// Panics if the scheme is unknown: hooks are wired at startup, and a
    /// hook for a missing driver indicates a broken program.
    pub fn add_init_hook<F>(&self, scheme: &str, hook: F)
    where
        F: Fn(&mut dyn Driver) + Send + Sync + 'static,
    {
        let mut factories = self.factories.lock().expect("driver registry poisoned");
        match factories.get_mut(scheme) {
            Some(factory) => factory.init_hooks.push(Arc::new(hook)),
            None => panic!("driver registry: init hook for unregistered scheme '{scheme}'"),
        }
    }

    /// Build an uninitialized driver for a scheme, applying init hooks.
    pub fn build(&self, scheme: &str) -> Result<Box<dyn Driver>> {
        let factories = self.factories.lock().expect("driver registry poisoned");
        let factory = factories
            .get(scheme)
            .ok_or_else(|| MigrateError::DriverNotFound(scheme.to_string()))?;
        let mut driver = (factory.constructor)();
        for hook in &factory.init_hooks {
            hook(driver.as_mut());
        }
        Ok(driver)
    }

    /// Sorted list of registered scheme names.
    pub fn drivers(&self) -> Vec<String> {
        let factories = self.factories.lock().expect("driver registry poisoned");
        let mut names: Vec<String> = factories.keys().cloned().collect();
        names.sort();
        names
    }
}

fn verify_filename_extension(scheme: &str, driver: &dyn Driver) {
    let extension = driver.filename_extension();
    if extension.is_empty() {
        panic!("driver '{scheme}': filename_extension() returned an empty string");
    }
    if extension.starts_with('.') {
        panic!("driver '{scheme}': filename_extension() must not start with a dot");
    }
}

/// The process-wide registry, seeded with the built-in drivers on first use.
///
/// Third-party backends register here at startup via
/// `registry::global().register(...)`.
pub fn global() -> &'static Registry {
    static GLOBAL: OnceLock<Registry> = OnceLock::new();
    GLOBAL.get_or_init(|| {
        let registry = Registry::new();
        registry.register("postgres", crate::drivers::postgres::constructor);
        registry.register("generic", crate::drivers::generic::constructor);
        registry
    })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::driver::testing::memory_constructor;
    use crate::file::MigrationFile;
    use crate::pipe::Pipe;

    #[test]
    fn test_register_and_build() {
        let registry = Registry::new();
        registry.register("mem", memory_constructor);
        let driver = registry.build("mem").unwrap();
        assert_eq!(driver.filename_extension(), "mem");
    }

    #[test]
    fn test_unknown_scheme_is_normal_error() {
        let registry = Registry::new();
        let err = registry.build("nope").unwrap_err();
        assert!(matches!(err, MigrateError::DriverNotFound(_)));
    }

    #[test]
    #[should_panic(expected = "register called twice")]
    fn test_duplicate_registration_panics() {
        let registry = Registry::new();
        registry.register("mem", memory_constructor);
        registry.register("mem", memory_constructor);
    }

    #[test]
    fn test_drivers_sorted() {
        let registry = Registry::new();
        registry.register("zeta", memory_constructor);
        registry.register("alpha", memory_constructor);
        assert_eq!(registry.drivers(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_global_has_builtin_drivers() {
        let names = global().drivers();
        assert!(names.contains(&"postgres".to_string()));
        assert!(names.contains(&"generic".to_string()));
    }

    struct BadExtensionDriver(&'static str);

    #[async_trait]
    impl Driver for BadExtensionDriver {
        async fn initialize(&mut self, _url: &str) -> Result<()> {
            Ok(())
        }
        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
        fn filename_extension(&self) -> &'static str {
            self.0
        }
        async fn migrate(&mut self, _file: MigrationFile, _pipe: Pipe) {}
        async fn version(&mut self) -> Result<u64> {
            Ok(0)
        }
    }

    fn empty_extension_constructor() -> Box<dyn Driver> {
        Box::new(BadExtensionDriver(""))
    }

    fn dotted_extension_constructor() -> Box<dyn Driver> {
        Box::new(BadExtensionDriver(".sql"))
    }

    #[test]
    #[should_panic(expected = "empty string")]
    fn test_empty_extension_rejected_at_registration() {
        Registry::new().register("bad", empty_extension_constructor);
    }

    #[test]
    #[should_panic(expected = "must not start with a dot")]
    fn test_dotted_extension_rejected_at_registration() {
        Registry::new().register("bad", dotted_extension_constructor);
    }

    #[test]
    #[should_panic(expected = "unregistered scheme")]
    fn test_init_hook_for_unknown_scheme_panics() {
        Registry::new().add_init_hook("missing", |_| {});
    }
}
