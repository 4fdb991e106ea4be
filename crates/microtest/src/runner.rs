//! The execution loop: filter resolution, per-method isolation, and the
//! default harness.
//!
//! Every selected method runs in a fresh context; a fault raised while the
//! body executes never escapes the loop. Panics are caught at the
//! single-method boundary and recorded as unexpected errors, so one broken
//! method cannot abort the run.

use crate::backtrace;
use crate::context::TestContext;
use crate::filter::{FilterResult, MethodFilter};
use crate::options::Options;
use crate::registry::{Registry, TestMethod, TestUnit};
use crate::reporter::{
    CompositeReporter, OutputSink, ProgressReporter, Reporter, SummaryReporter,
};
use crate::result::{Failure, MethodResult};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Cooperative cancellation flag, observed between method executions and
/// never mid-method.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The loop stops before its next method and
    /// flushes the reporter chain so partial progress stays visible.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a run loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Cancelled,
}

/// Executes registered units against a compiled method filter.
pub struct Runner {
    filter: MethodFilter,
    options: Options,
}

impl Runner {
    /// Compile `options.filter` and build a runner. An unparseable
    /// `/regex/` filter is an error for the embedding caller, never a test
    /// outcome.
    pub fn new(options: Options) -> FilterResult<Self> {
        let filter = MethodFilter::parse(options.filter.as_deref())?;
        Ok(Self { filter, options })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Run one unit's filtered methods in enumeration order, recording each
    /// result. Makes no reporter lifecycle calls, so several units can share
    /// one reporter lifecycle.
    pub fn run_unit(
        &self,
        unit: &dyn TestUnit,
        reporter: &mut dyn Reporter,
        cancel: &CancelToken,
    ) -> RunStatus {
        for method in unit.test_methods() {
            if cancel.is_cancelled() {
                return RunStatus::Cancelled;
            }
            if !self.filter.matches(unit.name(), &method.name) {
                continue;
            }
            run_one_method(unit, &method, reporter);
        }
        RunStatus::Completed
    }

    /// Run every registered unit, in registration order.
    ///
    /// Calls `reporter.start()` before iterating. On cancellation the
    /// reporter chain's `report()` is flushed before returning; on normal
    /// completion `report()` is left to the caller, supporting multiple runs
    /// under one reporter lifecycle.
    pub fn run_all(
        &self,
        registry: &Registry,
        reporter: &mut dyn Reporter,
        cancel: &CancelToken,
    ) -> RunStatus {
        reporter.start();
        for unit in registry.units() {
            if self.run_unit(unit.as_ref(), reporter, cancel) == RunStatus::Cancelled {
                reporter.report();
                return RunStatus::Cancelled;
            }
        }
        RunStatus::Completed
    }
}

/// Execute a single method body and record its outcome.
///
/// Outcome conversion: normal return is a pass, an assertion interrupt is a
/// failure, a skip interrupt is a skip, and a panic is an unexpected error.
pub fn run_one_method(unit: &dyn TestUnit, method: &TestMethod, reporter: &mut dyn Reporter) {
    let mut context = TestContext::new(unit.name(), &method.name);
    let body = &method.body;

    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&mut context)));
    let time = started.elapsed();

    let failures = match outcome {
        Ok(Ok(())) => Vec::new(),
        Ok(Err(interrupt)) => vec![interrupt.into_failure()],
        Err(payload) => vec![Failure::unexpected(
            "panic",
            panic_message(payload.as_ref()),
            backtrace::capture(),
        )],
    };

    let result = MethodResult {
        unit_name: unit.name().to_string(),
        method_name: method.name.clone(),
        assertions: context.assertions(),
        failures,
        time,
    };
    reporter.record(&result);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Callback applied to the default composite reporter before the run
/// starts. Configurators run in registration order.
pub type ReporterConfigurator = Box<dyn FnOnce(&mut CompositeReporter)>;

/// Run every registered unit under the default reporter chain and return
/// the overall verdict (`true` means exit status 0).
///
/// Assembles a composite of one progress and one summary reporter over
/// `sink`, applies `configurators` in order, runs, and flushes `report()`
/// once (the cancellation path inside the loop already reports).
pub fn run(
    registry: &Registry,
    options: Options,
    sink: OutputSink,
    configurators: Vec<ReporterConfigurator>,
    cancel: &CancelToken,
) -> FilterResult<bool> {
    let runner = Runner::new(options)?;

    let mut composite = CompositeReporter::new();
    composite.push(Box::new(ProgressReporter::new(
        sink.clone(),
        runner.options(),
    )));
    composite.push(Box::new(SummaryReporter::new(sink, runner.options())));
    for configure in configurators {
        configure(&mut composite);
    }

    if runner.run_all(registry, &mut composite, cancel) == RunStatus::Completed {
        composite.report();
    }
    Ok(composite.passed())
}
