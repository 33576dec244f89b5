//! Named-method invocation extension.
//!
//! An alternate migration mechanism for backends where migration content is
//! not a script but a list of symbolic names, one per line, each naming a
//! registered callable. Callables take either no argument or a
//! backend-specific session handle; they are collected into a [`MethodSet`]
//! dispatch table built once at registration time, then invoked strictly in
//! file order by [`Migrator`]. The first name that fails to resolve, match
//! its session type, or execute aborts the remainder of the file;
//! already-invoked callables are not rolled back by this layer.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use crate::driver::registry;
use crate::error::{MigrateError, Result};
use crate::file::MigrationFile;
use crate::pipe::{Pipe, PipeMessage};

/// Outcome of one migration method.
pub type MethodResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[allow(clippy::type_complexity)]
enum MethodFn {
    NoArg(Arc<dyn Fn() -> BoxFuture<'static, MethodResult> + Send + Sync>),
    WithSession(
        Arc<
            dyn for<'a> Fn(&'a mut (dyn Any + Send)) -> Result<BoxFuture<'a, MethodResult>>
                + Send
                + Sync,
        >,
    ),
}

/// Builder for a [`MethodSet`]. Arity and session type are pinned here, at
/// insertion time, rather than checked by reflection at call time.
#[derive(Default)]
pub struct MethodSetBuilder {
    methods: HashMap<String, MethodFn>,
}

impl MethodSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zero-argument method.
    ///
    /// Panics if the name is already registered: two callables claiming the
    /// same name is a fatal configuration error.
    pub fn method<F, Fut>(mut self, name: &str, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = MethodResult> + Send + 'static,
    {
        self.insert(name, MethodFn::NoArg(Arc::new(move || Box::pin(f()))));
        self
    }

    /// Register a method taking the backend session handle.
    ///
    /// The concrete session type `S` is captured here; an invocation against
    /// a session of any other type fails with `WrongSignature`.
    pub fn session_method<S, F>(mut self, name: &str, f: F) -> Self
    where
        S: Any + Send,
        F: for<'a> Fn(&'a mut S) -> BoxFuture<'a, MethodResult> + Send + Sync + 'static,
    {
        let method_name = name.to_string();
        self.insert(
            name,
            MethodFn::WithSession(Arc::new(move |session: &mut (dyn Any + Send)| {
                match session.downcast_mut::<S>() {
                    Some(session) => Ok(f(session)),
                    None => Err(MigrateError::WrongSignature(method_name.clone())),
                }
            })),
        );
        self
    }

    pub fn build(self) -> MethodSet {
        MethodSet {
            methods: Arc::new(self.methods),
        }
    }

    fn insert(&mut self, name: &str, f: MethodFn) {
        if self.methods.insert(name.to_string(), f).is_some() {
            panic!("method '{name}' registered twice");
        }
    }
}

/// An immutable dispatch table from method name to callable.
///
/// Cheap to clone; one set is attached per driver instance.
#[derive(Clone)]
pub struct MethodSet {
    methods: Arc<HashMap<String, MethodFn>>,
}

impl MethodSet {
    pub fn builder() -> MethodSetBuilder {
        MethodSetBuilder::new()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Resolve and invoke one method against the given session handle.
    pub async fn invoke(&self, name: &str, session: &mut (dyn Any + Send)) -> Result<()> {
        match self.methods.get(name) {
            None => Err(MigrateError::MissingMethod(name.to_string())),
            Some(MethodFn::NoArg(f)) => f()
                .await
                .map_err(|err| MigrateError::invocation_failed(name, err)),
            Some(MethodFn::WithSession(f)) => f(session)?
                .await
                .map_err(|err| MigrateError::invocation_failed(name, err)),
        }
    }
}

/// Applies a migration file by invoking its listed methods in file order.
pub struct Migrator {
    methods: MethodSet,
}

impl Migrator {
    pub fn new(methods: MethodSet) -> Self {
        Self { methods }
    }

    /// Invoke every method named in `file`, top to bottom, against `session`.
    ///
    /// Returns the first failure without invoking the remaining names. The
    /// caller reports the error through its pipe and handles any version-row
    /// bookkeeping.
    pub async fn migrate(
        &self,
        file: &mut MigrationFile,
        pipe: &Pipe,
        session: &mut (dyn Any + Send),
    ) -> Result<()> {
        let names = method_names(file.read_content().await?);
        for name in names {
            self.methods.invoke(&name, session).await?;
            debug!(method = %name, "migration method invoked");
            let _ = pipe.send(PipeMessage::Progress(format!("invoked {name}")));
        }
        Ok(())
    }
}

/// Parse migration content into method names: one per line, whitespace
/// trimmed, blank lines skipped.
pub(crate) fn method_names(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Attach a method set to every driver the registry builds for `scheme`.
///
/// Call this at startup, before connecting. Panics if the scheme is not
/// registered or its driver does not support named-method migrations, since
/// both indicate a broken program rather than bad user input.
pub fn register_method_set_for_driver(scheme: &str, methods: MethodSet) {
    // Probe a fresh instance now so a script-only driver fails here, at
    // startup, instead of on the first build.
    match registry::global().build(scheme) {
        Ok(mut probe) => {
            if let Err(err) = probe.register_methods(methods.clone()) {
                panic!("cannot attach method set to driver '{scheme}': {err}");
            }
        }
        Err(err) => panic!("cannot attach method set to driver '{scheme}': {err}"),
    }
    let scheme_name = scheme.to_string();
    registry::global().add_init_hook(scheme, move |driver| {
        if let Err(err) = driver.register_methods(methods.clone()) {
            panic!("cannot attach method set to driver '{scheme_name}': {err}");
        }
    });
}
