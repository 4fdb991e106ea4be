//! Per-method execution context and assertion helpers.
//!
//! A fresh [`TestContext`] is created for every executed method and consumed
//! into its result. Assertion helpers return [`Interrupt`] through `?`, so a
//! method body stops at its first failing assertion; the runner converts the
//! interrupt into a recorded failure at the execution boundary.

use crate::backtrace;
use crate::result::Failure;
use std::fmt::Debug;
use thiserror::Error;

/// Early exit raised inside a test method body.
#[derive(Debug, Error)]
pub enum Interrupt {
    /// An assertion did not hold.
    #[error("{}", .0.message)]
    Failed(Failure),
    /// The method asked to be skipped.
    #[error("{}", .0.message)]
    Skipped(Failure),
    /// A fault outside the assertion/skip mechanism, surfaced explicitly.
    #[error("{}", .0.message)]
    Unexpected(Failure),
}

impl Interrupt {
    /// Wrap a foreign error, preserving its type name and message.
    pub fn unexpected<E: std::error::Error>(error: &E) -> Self {
        Self::Unexpected(Failure::unexpected(
            std::any::type_name::<E>(),
            error.to_string(),
            backtrace::capture(),
        ))
    }

    /// The failure to record for this interrupt.
    pub fn into_failure(self) -> Failure {
        match self {
            Self::Failed(failure) | Self::Skipped(failure) | Self::Unexpected(failure) => failure,
        }
    }
}

/// Execution state of one running test method.
pub struct TestContext {
    unit_name: String,
    method_name: String,
    assertions: u64,
}

impl TestContext {
    pub(crate) fn new(unit_name: &str, method_name: &str) -> Self {
        Self {
            unit_name: unit_name.to_string(),
            method_name: method_name.to_string(),
            assertions: 0,
        }
    }

    /// Name of the running method.
    pub fn name(&self) -> &str {
        &self.method_name
    }

    /// Name of the unit the method belongs to.
    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    /// Number of assertions executed so far.
    pub fn assertions(&self) -> u64 {
        self.assertions
    }

    /// Fails with `message` unless `test` is truthy.
    pub fn assert(&mut self, test: bool, message: impl Into<String>) -> Result<(), Interrupt> {
        self.assertions += 1;
        if test {
            Ok(())
        } else {
            Err(Interrupt::Failed(Failure::assertion(
                message,
                backtrace::capture(),
            )))
        }
    }

    /// Fails unless `expected == actual`.
    pub fn assert_eq<T: PartialEq + Debug>(
        &mut self,
        expected: &T,
        actual: &T,
    ) -> Result<(), Interrupt> {
        self.assert(
            expected == actual,
            format!("Expected: {:?}\n  Actual: {:?}", expected, actual),
        )
    }

    /// Fails with `message` if `test` is truthy.
    pub fn refute(&mut self, test: bool, message: impl Into<String>) -> Result<(), Interrupt> {
        self.assert(!test, message)
    }

    /// Fails if `unexpected == actual`.
    pub fn refute_eq<T: PartialEq + Debug>(
        &mut self,
        unexpected: &T,
        actual: &T,
    ) -> Result<(), Interrupt> {
        self.refute(
            unexpected == actual,
            format!("Expected {:?} to not be equal to {:?}", unexpected, actual),
        )
    }

    /// Fails unconditionally.
    pub fn flunk(&mut self, message: impl Into<String>) -> Result<(), Interrupt> {
        self.assert(false, message)
    }

    /// An assertion that always passes. Useful to mark a method as
    /// deliberately assertion-free.
    pub fn pass(&mut self) -> Result<(), Interrupt> {
        self.assert(true, "")
    }

    /// Skips the rest of the method. Skipped runs are reported separately
    /// and never fail the overall run.
    pub fn skip(&mut self, reason: impl Into<String>) -> Result<(), Interrupt> {
        Err(Interrupt::Skipped(Failure::skip(
            reason,
            backtrace::capture(),
        )))
    }

    /// Skips when `condition` holds.
    pub fn skip_if(&mut self, condition: bool, reason: impl Into<String>) -> Result<(), Interrupt> {
        if condition {
            self.skip(reason)
        } else {
            Ok(())
        }
    }

    /// Skips unless `condition` holds.
    pub fn skip_unless(
        &mut self,
        condition: bool,
        reason: impl Into<String>,
    ) -> Result<(), Interrupt> {
        self.skip_if(!condition, reason)
    }
}

/// Guard predicates for skipping platform-specific tests.
pub mod guards {
    /// Is this running on Windows?
    pub fn windows() -> bool {
        cfg!(windows)
    }

    /// Is this running on a Unix-family platform?
    pub fn unix() -> bool {
        cfg!(unix)
    }
}
