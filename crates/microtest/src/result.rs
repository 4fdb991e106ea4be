//! Typed outcomes of running a single test method.
//!
//! Running a method yields a [`MethodResult`] carrying at most one
//! [`Failure`]. The failure kind distinguishes assertion violations, explicit
//! skips, and unexpected faults; skips never fail a run.

use crate::backtrace::BacktraceFilter;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

/// Frames raised by assertion/skip helpers, identified by verb. Captured
/// frames carry fully qualified symbols (``in `a::b::assert` ``), so the
/// verb is matched at the end of the path.
const MARKER_PATTERN: &str =
    r"in `(?:[\w<>]+::)*(assert|refute|flunk|pass|fail|raise|must|wont|skip)";

/// Default marker set identifying assertion/skip helper frames.
pub fn default_markers() -> &'static Regex {
    static MARKERS: OnceLock<Regex> = OnceLock::new();
    MARKERS.get_or_init(|| Regex::new(MARKER_PATTERN).expect("marker pattern is valid"))
}

fn in_suffix() -> &'static Regex {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    SUFFIX.get_or_init(|| Regex::new(r":in .*$").expect("suffix pattern is valid"))
}

/// What kind of failure a method produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// An explicit assertion violation raised by test code.
    Assertion,
    /// A deliberate early exit requested by the unit itself.
    Skip,
    /// Any fault not raised through the assertion/skip mechanism.
    Unexpected {
        /// Type name of the original fault.
        class_name: String,
    },
}

/// A recorded failure: kind, message, and the backtrace captured where it
/// was raised (innermost frame first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    pub backtrace: Vec<String>,
}

impl Failure {
    pub fn assertion(message: impl Into<String>, backtrace: Vec<String>) -> Self {
        Self {
            kind: FailureKind::Assertion,
            message: message.into(),
            backtrace,
        }
    }

    pub fn skip(message: impl Into<String>, backtrace: Vec<String>) -> Self {
        Self {
            kind: FailureKind::Skip,
            message: message.into(),
            backtrace,
        }
    }

    pub fn unexpected(
        class_name: impl Into<String>,
        message: impl Into<String>,
        backtrace: Vec<String>,
    ) -> Self {
        Self {
            kind: FailureKind::Unexpected {
                class_name: class_name.into(),
            },
            message: message.into(),
            backtrace,
        }
    }

    /// Human-readable label for this kind of failure.
    pub fn result_label(&self) -> &'static str {
        match self.kind {
            FailureKind::Assertion => "Failure",
            FailureKind::Skip => "Skipped",
            FailureKind::Unexpected { .. } => "Error",
        }
    }

    /// Single-character code, always the first character of the label.
    pub fn result_code(&self) -> char {
        self.result_label().chars().next().unwrap_or('?')
    }

    pub fn is_skip(&self) -> bool {
        self.kind == FailureKind::Skip
    }

    pub fn is_unexpected(&self) -> bool {
        matches!(self.kind, FailureKind::Unexpected { .. })
    }

    /// Where was this run before an assertion was raised?
    ///
    /// Walks the trace from the outermost end inward, stopping at the first
    /// assertion/skip helper frame and returning the last frame visited
    /// before it, with any trailing ``:in `symbol` `` suffix stripped. With
    /// no marker frame present the walk ends at the innermost frame.
    pub fn location(&self) -> String {
        self.location_with(default_markers())
    }

    /// [`location`](Self::location) with a caller-supplied marker set.
    pub fn location_with(&self, markers: &Regex) -> String {
        let mut last_before_marker = "";
        for frame in self.backtrace.iter().rev() {
            if markers.is_match(frame) {
                break;
            }
            last_before_marker = frame;
        }
        in_suffix().replace(last_before_marker, "").into_owned()
    }

    /// Full message text. Unexpected errors render as
    /// `"Class: message"` followed by the filtered backtrace, one frame per
    /// line, indented.
    pub fn full_message(&self) -> String {
        self.full_message_with(&BacktraceFilter::default())
    }

    /// [`full_message`](Self::full_message) with a caller-supplied filter.
    pub fn full_message_with(&self, filter: &BacktraceFilter) -> String {
        match &self.kind {
            FailureKind::Unexpected { class_name } => {
                let trace = filter.filter(Some(&self.backtrace)).join("\n    ");
                format!("{}: {}\n    {}", class_name, self.message, trace)
            }
            _ => self.message.clone(),
        }
    }
}

/// Outcome of one executed method: the consumed per-method context.
///
/// Holds at most the first failure encountered; later assertions in the same
/// method are never evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResult {
    /// Name of the unit the method belongs to.
    pub unit_name: String,
    /// Name of the executed method.
    pub method_name: String,
    /// Number of assertions executed in this run.
    pub assertions: u64,
    /// Recorded failures; in practice zero or one entries.
    pub failures: Vec<Failure>,
    /// Wall-clock execution time of the method body.
    pub time: Duration,
}

impl MethodResult {
    /// Did this run pass?
    ///
    /// Skipped runs are not considered passing, but they do not cause the
    /// overall run to fail.
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Was this run skipped?
    pub fn skipped(&self) -> bool {
        self.failure().is_some_and(Failure::is_skip)
    }

    /// Did this run raise an unexpected fault?
    pub fn error(&self) -> bool {
        self.failure().is_some_and(Failure::is_unexpected)
    }

    /// The first (and only) failure, if any.
    pub fn failure(&self) -> Option<&Failure> {
        self.failures.first()
    }

    /// Single character to print for this result: the failure's code, or
    /// `'.'` for a pass.
    pub fn result_code(&self) -> char {
        self.failure().map_or('.', Failure::result_code)
    }

    /// `"Unit#method"`, with the failure origin appended for non-error
    /// failures.
    pub fn location(&self) -> String {
        self.location_with(default_markers())
    }

    /// [`location`](Self::location) with a caller-supplied marker set.
    pub fn location_with(&self, markers: &Regex) -> String {
        let mut location = format!("{}#{}", self.unit_name, self.method_name);
        if !self.passed() && !self.error() {
            if let Some(failure) = self.failure() {
                location.push_str(&format!(" [{}]", failure.location_with(markers)));
            }
        }
        location
    }

    /// Rendered detail block, one per failure:
    /// `"<label>:\n<location>:\n<message>\n"`.
    pub fn render(&self) -> String {
        self.render_with(default_markers(), &BacktraceFilter::default())
    }

    /// [`render`](Self::render) with a caller-supplied marker set and
    /// backtrace filter.
    pub fn render_with(&self, markers: &Regex, filter: &BacktraceFilter) -> String {
        self.failures
            .iter()
            .map(|failure| {
                format!(
                    "{}:\n{}:\n{}\n",
                    failure.result_label(),
                    self.location_with(markers),
                    failure.full_message_with(filter)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
