//! The reporter chain: progress, statistics, summary, composite.
//!
//! Reporters consume a stream of [`MethodResult`] values between an explicit
//! `start()`/`report()` lifecycle and render to a caller-supplied shared text
//! sink. The composite fans every call out to its children in attachment
//! order; its verdict is the AND over theirs.

use crate::backtrace::BacktraceFilter;
use crate::options::{Options, NO_SKIP_MSG_ENV};
use crate::result::{default_markers, MethodResult};
use regex::Regex;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Shared text sink reporters write to.
pub type OutputSink = Arc<Mutex<dyn Write + Send>>;

/// Sink over standard output.
pub fn stdout_sink() -> OutputSink {
    Arc::new(Mutex::new(io::stdout()))
}

/// Sink over an in-memory buffer, plus a handle to read it back.
pub fn buffer_sink() -> (OutputSink, Arc<Mutex<Vec<u8>>>) {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let sink: OutputSink = buffer.clone();
    (sink, buffer)
}

/// Read everything written to a [`buffer_sink`] so far.
pub fn buffer_contents(buffer: &Arc<Mutex<Vec<u8>>>) -> String {
    buffer
        .lock()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

// Reporting must never abort the run: sink errors are ignored.
fn write_sink(sink: &OutputSink, text: &str) {
    if let Ok(mut out) = sink.lock() {
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}

/// A consumer of result events.
///
/// Lifecycle: `start()` once, any number of `record()` calls, `report()`
/// once. `passed()` may be queried at any point.
pub trait Reporter {
    /// Starts reporting on the run.
    fn start(&mut self) {}

    /// Record one completed method result.
    fn record(&mut self, _result: &MethodResult) {}

    /// Outputs the summary of the run.
    fn report(&mut self) {}

    /// Did everything recorded so far pass?
    fn passed(&self) -> bool {
        true
    }
}

/// Prints the "dots" during the run. Purely a side-effecting sink; carries
/// no aggregate state of its own.
pub struct ProgressReporter {
    sink: OutputSink,
    verbose: bool,
}

impl ProgressReporter {
    pub fn new(sink: OutputSink, options: &Options) -> Self {
        Self {
            sink,
            verbose: options.verbose,
        }
    }
}

impl Reporter for ProgressReporter {
    fn record(&mut self, result: &MethodResult) {
        let mut text = String::new();
        if self.verbose {
            text.push_str(&format!(
                "{}#{} = {:.2} s = ",
                result.unit_name,
                result.method_name,
                result.time.as_secs_f64()
            ));
        }
        text.push(result.result_code());
        if self.verbose {
            text.push('\n');
        }
        write_sink(&self.sink, &text);
    }
}

/// Gathers statistics about a run. Does no output of its own; meant to be
/// composed by a reporter that does.
#[derive(Default)]
pub struct StatisticsReporter {
    /// Number of methods recorded.
    pub count: u64,
    /// Total assertions across recorded methods.
    pub assertions: u64,
    /// Non-passing or skipped results, in the order recorded.
    pub results: Vec<MethodResult>,
    pub start_time: Option<Instant>,
    /// Derived during `report()`.
    pub total_time: Duration,
    pub failures: usize,
    pub errors: usize,
    pub skips: usize,
}

impl StatisticsReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for StatisticsReporter {
    fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    fn record(&mut self, result: &MethodResult) {
        self.count += 1;
        self.assertions += result.assertions;
        if !result.passed() || result.skipped() {
            self.results.push(result.clone());
        }
    }

    fn report(&mut self) {
        self.total_time = self
            .start_time
            .map(|started| started.elapsed())
            .unwrap_or_default();
        self.failures = self
            .results
            .iter()
            .filter(|r| r.failure().is_some_and(|f| !f.is_skip() && !f.is_unexpected()))
            .count();
        self.errors = self.results.iter().filter(|r| r.error()).count();
        self.skips = self.results.iter().filter(|r| r.skipped()).count();
    }

    fn passed(&self) -> bool {
        self.results.iter().all(MethodResult::skipped)
    }
}

/// Prints the header, failure details, and summary at the end of the run.
pub struct SummaryReporter {
    stats: StatisticsReporter,
    sink: OutputSink,
    options: Options,
    markers: Regex,
    trace_filter: BacktraceFilter,
}

impl SummaryReporter {
    pub fn new(sink: OutputSink, options: &Options) -> Self {
        Self {
            stats: StatisticsReporter::new(),
            sink,
            options: options.clone(),
            markers: default_markers().clone(),
            trace_filter: BacktraceFilter::default(),
        }
    }

    /// Replace the marker set used to locate failure origins in detail
    /// blocks.
    pub fn with_markers(mut self, markers: Regex) -> Self {
        self.markers = markers;
        self
    }

    /// Replace the backtrace filter applied to error detail blocks.
    pub fn with_backtrace_filter(mut self, filter: BacktraceFilter) -> Self {
        self.trace_filter = filter;
        self
    }

    /// The underlying aggregates, valid after `report()`.
    pub fn stats(&self) -> &StatisticsReporter {
        &self.stats
    }

    fn statistics_line(&self) -> String {
        let total = self.stats.total_time.as_secs_f64();
        let (run_rate, assertion_rate) = if total > 0.0 {
            (
                self.stats.count as f64 / total,
                self.stats.assertions as f64 / total,
            )
        } else {
            (0.0, 0.0)
        };
        format!(
            "Finished in {:.6}s, {:.4} runs/s, {:.4} assertions/s.",
            total, run_rate, assertion_rate
        )
    }

    fn aggregated_results(&self) -> String {
        let blocks: Vec<String> = self
            .stats
            .results
            .iter()
            .filter(|result| self.options.verbose || !result.skipped())
            .enumerate()
            .map(|(index, result)| {
                format!(
                    "\n{:3}) {}",
                    index + 1,
                    result.render_with(&self.markers, &self.trace_filter)
                )
            })
            .collect();
        blocks.join("\n") + "\n"
    }

    fn summary_line(&self) -> String {
        let any_skipped = self.stats.results.iter().any(MethodResult::skipped);
        // The environment is consulted here, at render time, so directly
        // built Options honor the suppression variable too.
        let suppressed =
            self.options.no_skip_hint || std::env::var_os(NO_SKIP_MSG_ENV).is_some();
        let extra = if any_skipped && !self.options.verbose && !suppressed {
            "\n\nYou have skipped tests. Run with --verbose for details."
        } else {
            ""
        };
        format!(
            "{} runs, {} assertions, {} failures, {} errors, {} skips{}",
            self.stats.count,
            self.stats.assertions,
            self.stats.failures,
            self.stats.errors,
            self.stats.skips,
            extra
        )
    }
}

impl Reporter for SummaryReporter {
    fn start(&mut self) {
        self.stats.start();
        write_sink(
            &self.sink,
            &format!(
                "Run options: {}\n\n# Running:\n\n",
                self.options.orig_args.join(" ")
            ),
        );
    }

    fn record(&mut self, result: &MethodResult) {
        self.stats.record(result);
    }

    fn report(&mut self) {
        self.stats.report();

        let mut text = String::new();
        if !self.options.verbose {
            text.push('\n'); // finish the dots
        }
        text.push('\n');
        text.push_str(&self.statistics_line());
        text.push('\n');
        // aggregated_results always ends with a newline of its own.
        text.push_str(&self.aggregated_results());
        text.push_str(&self.summary_line());
        text.push('\n');
        write_sink(&self.sink, &text);
    }

    fn passed(&self) -> bool {
        self.stats.passed()
    }
}

/// Dispatches to multiple reporters as one.
#[derive(Default)]
pub struct CompositeReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl CompositeReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add another reporter to the mix. Events fan out in attachment order.
    pub fn push(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.push(reporter);
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl Reporter for CompositeReporter {
    fn start(&mut self) {
        for reporter in &mut self.reporters {
            reporter.start();
        }
    }

    fn record(&mut self, result: &MethodResult) {
        for reporter in &mut self.reporters {
            reporter.record(result);
        }
    }

    fn report(&mut self) {
        for reporter in &mut self.reporters {
            reporter.report();
        }
    }

    fn passed(&self) -> bool {
        self.reporters.iter().all(|reporter| reporter.passed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Failure;
    use pretty_assertions::assert_eq;

    fn result(method: &str, assertions: u64, failures: Vec<Failure>) -> MethodResult {
        MethodResult {
            unit_name: "MathTest".to_string(),
            method_name: method.to_string(),
            assertions,
            failures,
            time: Duration::from_millis(10),
        }
    }

    fn pass(method: &str) -> MethodResult {
        result(method, 1, Vec::new())
    }

    fn fail(method: &str) -> MethodResult {
        result(method, 1, vec![Failure::assertion("boom", Vec::new())])
    }

    fn skip(method: &str) -> MethodResult {
        result(method, 0, vec![Failure::skip("later", Vec::new())])
    }

    #[test]
    fn progress_prints_one_code_per_result() {
        let (sink, buffer) = buffer_sink();
        let mut progress = ProgressReporter::new(sink, &Options::default());
        progress.record(&pass("test_a"));
        progress.record(&fail("test_b"));
        progress.record(&skip("test_c"));
        assert_eq!(buffer_contents(&buffer), ".FS");
    }

    #[test]
    fn verbose_progress_prints_full_lines() {
        let (sink, buffer) = buffer_sink();
        let options = Options {
            verbose: true,
            ..Options::default()
        };
        let mut progress = ProgressReporter::new(sink, &options);
        progress.record(&pass("test_a"));
        assert_eq!(buffer_contents(&buffer), "MathTest#test_a = 0.01 s = .\n");
    }

    #[test]
    fn statistics_tracks_counts_and_retains_non_passing() {
        let mut stats = StatisticsReporter::new();
        stats.start();
        stats.record(&pass("test_a"));
        stats.record(&fail("test_b"));
        stats.record(&skip("test_c"));
        stats.record(&pass("test_d"));
        stats.report();

        assert_eq!(stats.count, 4);
        assert_eq!(stats.assertions, 3);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.errors, 0);
        assert_eq!(stats.skips, 1);
        let retained: Vec<&str> = stats.results.iter().map(|r| r.method_name.as_str()).collect();
        assert_eq!(retained, vec!["test_b", "test_c"]);
    }

    #[test]
    fn statistics_passes_when_only_skips_are_retained() {
        let mut stats = StatisticsReporter::new();
        stats.start();
        stats.record(&pass("test_a"));
        stats.record(&skip("test_b"));
        assert!(stats.passed());

        stats.record(&fail("test_c"));
        assert!(!stats.passed());
    }

    #[test]
    fn summary_header_echoes_the_run_options() {
        let (sink, buffer) = buffer_sink();
        let options = Options {
            orig_args: vec!["-n".to_string(), "foo".to_string()],
            ..Options::default()
        };
        let mut summary = SummaryReporter::new(sink, &options);
        summary.start();
        assert_eq!(buffer_contents(&buffer), "Run options: -n foo\n\n# Running:\n\n");
    }

    #[test]
    fn summary_line_counts_and_skip_hint() {
        let (sink, buffer) = buffer_sink();
        let mut summary = SummaryReporter::new(sink, &Options::default());
        summary.start();
        summary.record(&pass("test_a"));
        summary.record(&pass("test_b"));
        summary.record(&skip("test_c"));
        summary.report();

        let output = buffer_contents(&buffer);
        assert!(output.contains(
            "3 runs, 2 assertions, 0 failures, 0 errors, 1 skips\n\nYou have skipped tests. Run with --verbose for details."
        ));
        // Skip details are withheld outside verbose mode.
        assert!(!output.contains("Skipped:"));
    }

    #[test]
    fn verbose_summary_lists_skip_blocks_without_the_hint() {
        let (sink, buffer) = buffer_sink();
        let options = Options {
            verbose: true,
            ..Options::default()
        };
        let mut summary = SummaryReporter::new(sink, &options);
        summary.start();
        summary.record(&skip("test_c"));
        summary.report();

        let output = buffer_contents(&buffer);
        assert!(output.contains("  1) Skipped:\nMathTest#test_c"));
        assert!(!output.contains("You have skipped tests"));
    }

    #[test]
    fn suppression_flag_removes_the_skip_hint() {
        let (sink, buffer) = buffer_sink();
        let options = Options {
            no_skip_hint: true,
            ..Options::default()
        };
        let mut summary = SummaryReporter::new(sink, &options);
        summary.start();
        summary.record(&skip("test_c"));
        summary.report();

        let output = buffer_contents(&buffer);
        assert!(output.contains("1 runs, 0 assertions, 0 failures, 0 errors, 1 skips\n"));
        assert!(!output.contains("You have skipped tests"));
    }

    #[test]
    fn failure_blocks_are_numbered_from_one() {
        let (sink, buffer) = buffer_sink();
        let mut summary = SummaryReporter::new(sink, &Options::default());
        summary.start();
        summary.record(&fail("test_b"));
        summary.record(&fail("test_e"));
        summary.report();

        let output = buffer_contents(&buffer);
        assert!(output.contains("  1) Failure:\nMathTest#test_b"));
        assert!(output.contains("  2) Failure:\nMathTest#test_e"));
    }

    #[test]
    fn custom_marker_set_drives_failure_locations() {
        let (sink, buffer) = buffer_sink();
        let markers = Regex::new("in `check").unwrap();
        let mut summary =
            SummaryReporter::new(sink, &Options::default()).with_markers(markers);
        summary.start();

        let mut failing = fail("test_b");
        failing.failures[0].backtrace = vec![
            "helpers.rs:5:in `check_equal`".to_string(),
            "user_tests.rs:9:in `test_b`".to_string(),
        ];
        summary.record(&failing);
        summary.report();

        let output = buffer_contents(&buffer);
        assert!(output.contains("MathTest#test_b [user_tests.rs:9]"));
        assert!(!output.contains("[helpers.rs:5]"));
    }

    #[test]
    fn custom_backtrace_filter_trims_error_details() {
        let (sink, buffer) = buffer_sink();
        let filter = BacktraceFilter::new(Regex::new("helpers").unwrap()).with_debug(false);
        let mut summary =
            SummaryReporter::new(sink, &Options::default()).with_backtrace_filter(filter);
        summary.start();

        let erroring = result(
            "test_c",
            0,
            vec![Failure::unexpected(
                "panic",
                "boom",
                vec![
                    "user_tests.rs:3:in `test_c`".to_string(),
                    "helpers.rs:9:in `glue`".to_string(),
                ],
            )],
        );
        summary.record(&erroring);
        summary.report();

        let output = buffer_contents(&buffer);
        assert!(output.contains("panic: boom\n    user_tests.rs:3:in `test_c`\n"));
        assert!(!output.contains("helpers.rs:9"));
    }

    struct FixedVerdict(bool);

    impl Reporter for FixedVerdict {
        fn passed(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn composite_verdict_is_the_and_over_children() {
        let mut all_green = CompositeReporter::new();
        all_green.push(Box::new(FixedVerdict(true)));
        all_green.push(Box::new(FixedVerdict(true)));
        assert!(all_green.passed());

        let mut one_red = CompositeReporter::new();
        one_red.push(Box::new(FixedVerdict(true)));
        one_red.push(Box::new(FixedVerdict(false)));
        one_red.push(Box::new(FixedVerdict(true)));
        assert!(!one_red.passed());

        assert!(CompositeReporter::new().passed());
    }

    #[test]
    fn composite_fans_out_in_attachment_order() {
        let (first_sink, first) = buffer_sink();
        let (second_sink, second) = buffer_sink();
        let mut composite = CompositeReporter::new();
        composite.push(Box::new(ProgressReporter::new(first_sink, &Options::default())));
        composite.push(Box::new(ProgressReporter::new(second_sink, &Options::default())));

        composite.start();
        composite.record(&fail("test_b"));
        composite.report();

        assert_eq!(buffer_contents(&first), "F");
        assert_eq!(buffer_contents(&second), "F");
    }
}
