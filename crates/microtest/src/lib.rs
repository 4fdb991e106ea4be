//! microtest — a small test-execution and reporting engine.
//!
//! The engine runs registered test units, filters their methods by name
//! pattern, executes each method in isolation, classifies the outcome
//! (pass / failure / skip / unexpected fault), and streams results through a
//! composable chain of reporters:
//! - Registration and execution (`registry`, `runner`)
//! - Assertions and per-method state (`context`)
//! - Typed outcomes and failure rendering (`result`, `backtrace`)
//! - Progress, statistics, summary, and composite reporters (`reporter`)
//!
//! Execution is strictly single-threaded and synchronous; cancellation is
//! delivered through a [`CancelToken`] observed between methods.
//!
//! # Example
//!
//! ```
//! use microtest::{CancelToken, Options, Registry, UnitDef};
//!
//! let mut registry = Registry::new();
//! registry.register(
//!     UnitDef::new("MathTest")
//!         .method("test_addition", |ctx| ctx.assert_eq(&4, &(2 + 2))),
//! );
//!
//! let (sink, _buffer) = microtest::buffer_sink();
//! let passed = microtest::run(
//!     &registry,
//!     Options::default(),
//!     sink,
//!     Vec::new(),
//!     &CancelToken::new(),
//! )
//! .unwrap();
//! assert!(passed);
//! ```

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backtrace;
pub mod context;
pub mod filter;
pub mod options;
pub mod registry;
pub mod reporter;
pub mod result;
pub mod runner;

// Re-export commonly used types
pub use backtrace::{BacktraceFilter, NO_BACKTRACE};
pub use context::{guards, Interrupt, TestContext};
pub use filter::{FilterError, FilterResult, MethodFilter};
pub use options::{Options, OptionsError, OptionsResult};
pub use registry::{Registry, TestBody, TestMethod, TestUnit, UnitDef};
pub use reporter::{
    buffer_contents, buffer_sink, stdout_sink, CompositeReporter, OutputSink, ProgressReporter,
    Reporter, StatisticsReporter, SummaryReporter,
};
pub use result::{default_markers, Failure, FailureKind, MethodResult};
pub use runner::{run, run_one_method, CancelToken, ReporterConfigurator, RunStatus, Runner};
