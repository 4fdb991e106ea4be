//! Test units and the registry that holds them.
//!
//! A [`TestUnit`] represents one executable test class: a name plus an
//! ordered set of methods. Units are registered into an explicit, append-only
//! [`Registry`] value passed by reference into the execution loop; the
//! registration order is preserved and observable.

use crate::context::{Interrupt, TestContext};
use std::fmt;
use std::sync::Arc;

/// Body of a single test method.
pub type TestBody = Arc<dyn Fn(&mut TestContext) -> Result<(), Interrupt> + Send + Sync>;

/// A named, executable method belonging to a unit.
#[derive(Clone)]
pub struct TestMethod {
    pub name: String,
    pub body: TestBody,
}

impl fmt::Debug for TestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestMethod")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// One executable test class.
pub trait TestUnit: Send + Sync {
    /// Name of the unit, used in qualified `"Unit#method"` forms.
    fn name(&self) -> &str;

    /// All runnable methods, in a stable order that is deterministic across
    /// runs for the same unit.
    fn test_methods(&self) -> Vec<TestMethod>;
}

/// A [`TestUnit`] built method by method, in declaration order.
pub struct UnitDef {
    name: String,
    methods: Vec<TestMethod>,
}

impl UnitDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    /// Append a named method. Methods run in the order they were added.
    pub fn method<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut TestContext) -> Result<(), Interrupt> + Send + Sync + 'static,
    {
        self.methods.push(TestMethod {
            name: name.into(),
            body: Arc::new(body),
        });
        self
    }
}

impl TestUnit for UnitDef {
    fn name(&self) -> &str {
        &self.name
    }

    fn test_methods(&self) -> Vec<TestMethod> {
        self.methods.clone()
    }
}

/// Append-only, ordered collection of registered units.
#[derive(Default)]
pub struct Registry {
    units: Vec<Arc<dyn TestUnit>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a unit. Registration order is preserved.
    pub fn register<U: TestUnit + 'static>(&mut self, unit: U) {
        self.units.push(Arc::new(unit));
    }

    /// Append an already-shared unit.
    pub fn register_arc(&mut self, unit: Arc<dyn TestUnit>) {
        self.units.push(unit);
    }

    /// Registered units, in registration order.
    pub fn units(&self) -> &[Arc<dyn TestUnit>] {
        &self.units
    }

    /// Drop every registered unit.
    pub fn reset(&mut self) {
        self.units.clear();
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
