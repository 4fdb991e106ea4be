//! Backtrace capture and filtering.
//!
//! Failures carry their backtrace as an ordered list of frame strings
//! (innermost first) in the form ``file:line:in `symbol` ``. The filter trims
//! engine-internal frames so failure output points at user code, with a
//! three-tier fallback that never produces an empty trace from a non-empty
//! input.

use regex::Regex;
use std::backtrace::Backtrace;

/// Sentinel frame used when a failure carries no backtrace at all.
pub const NO_BACKTRACE: &str = "No backtrace";

/// Default pattern identifying this engine's own frames.
const INTERNAL_PATTERN: &str = r"microtest::|[/\\]microtest[/\\]src[/\\]";

/// Environment variable that switches the filter into debug passthrough.
pub const DEBUG_ENV: &str = "MICROTEST_DEBUG";

/// Trims a stack trace to the frames outside the engine's own
/// implementation path.
#[derive(Debug, Clone)]
pub struct BacktraceFilter {
    internal: Regex,
    debug: bool,
}

impl Default for BacktraceFilter {
    fn default() -> Self {
        Self::new(Regex::new(INTERNAL_PATTERN).expect("internal pattern is valid"))
    }
}

impl BacktraceFilter {
    /// Create a filter suppressing frames that match `internal`.
    ///
    /// The debug passthrough is seeded from the `MICROTEST_DEBUG`
    /// environment variable.
    pub fn new(internal: Regex) -> Self {
        Self {
            internal,
            debug: std::env::var_os(DEBUG_ENV).is_some(),
        }
    }

    /// Force the debug passthrough on or off.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Filter a trace down to user-relevant frames.
    ///
    /// Tiers, each applied only if the previous yields nothing:
    /// 1. absent input returns the `"No backtrace"` sentinel
    /// 2. debug mode returns an unmodified copy
    /// 3. the longest leading run of non-internal frames
    /// 4. every non-internal frame, wherever it sits
    /// 5. the original trace, unfiltered
    pub fn filter(&self, backtrace: Option<&[String]>) -> Vec<String> {
        let Some(frames) = backtrace else {
            return vec![NO_BACKTRACE.to_string()];
        };

        if self.debug {
            return frames.to_vec();
        }

        let leading: Vec<String> = frames
            .iter()
            .take_while(|frame| !self.internal.is_match(frame))
            .cloned()
            .collect();
        if !leading.is_empty() {
            return leading;
        }

        let external: Vec<String> = frames
            .iter()
            .filter(|frame| !self.internal.is_match(frame))
            .cloned()
            .collect();
        if !external.is_empty() {
            return external;
        }

        frames.to_vec()
    }
}

/// Capture the current call stack as normalized frame strings.
///
/// Frames read ``file:line:in `symbol` `` when source information is
/// available, or just the symbol otherwise.
pub fn capture() -> Vec<String> {
    parse_frames(&Backtrace::force_capture().to_string())
}

/// Parse the std `Backtrace` display format into frame strings.
///
/// The display format interleaves `N: symbol` lines with indented
/// `at path:line:col` lines; frames without source info have no `at` line.
fn parse_frames(rendered: &str) -> Vec<String> {
    let mut frames = Vec::new();
    let mut pending: Option<String> = None;

    for line in rendered.lines() {
        let trimmed = line.trim_start();
        if let Some(location) = trimmed.strip_prefix("at ") {
            if let Some(symbol) = pending.take() {
                // Drop the trailing column, keeping file:line.
                let location = location.trim_end();
                let location = match location.rfind(':') {
                    Some(idx) => &location[..idx],
                    None => location,
                };
                frames.push(format!("{}:in `{}`", location, symbol));
            }
            continue;
        }
        if let Some((index, symbol)) = trimmed.split_once(": ") {
            if index.trim().parse::<usize>().is_ok() {
                if let Some(previous) = pending.replace(symbol.trim_end().to_string()) {
                    frames.push(previous);
                }
            }
        }
    }
    if let Some(symbol) = pending {
        frames.push(symbol);
    }

    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    fn filter() -> BacktraceFilter {
        BacktraceFilter::default().with_debug(false)
    }

    #[test]
    fn absent_trace_yields_sentinel() {
        assert_eq!(filter().filter(None), vec![NO_BACKTRACE.to_string()]);
    }

    #[test]
    fn debug_mode_returns_unmodified_copy() {
        let input = frames(&["microtest::context::assert", "user.rs:3:in `test_x`"]);
        let filtered = BacktraceFilter::default()
            .with_debug(true)
            .filter(Some(&input));
        assert_eq!(filtered, input);
    }

    #[test]
    fn leading_user_frames_survive() {
        let input = frames(&[
            "user.rs:3:in `test_x`",
            "user.rs:9:in `helper`",
            "runner.rs:40:in `microtest::runner::run_one_method`",
        ]);
        let filtered = filter().filter(Some(&input));
        assert_eq!(filtered, frames(&["user.rs:3:in `test_x`", "user.rs:9:in `helper`"]));
    }

    #[test]
    fn buried_user_frames_are_selected_when_no_leading_run() {
        let input = frames(&[
            "context.rs:12:in `microtest::context::assert`",
            "user.rs:3:in `test_x`",
            "runner.rs:40:in `microtest::runner::run_one_method`",
        ]);
        let filtered = filter().filter(Some(&input));
        assert_eq!(filtered, frames(&["user.rs:3:in `test_x`"]));
    }

    #[test]
    fn fully_internal_trace_is_returned_unfiltered() {
        let input = frames(&[
            "context.rs:12:in `microtest::context::assert`",
            "runner.rs:40:in `microtest::runner::run_one_method`",
        ]);
        let filtered = filter().filter(Some(&input));
        assert_eq!(filtered, input);
    }

    #[test]
    fn empty_trace_stays_empty() {
        let input: Vec<String> = Vec::new();
        assert_eq!(filter().filter(Some(&input)), Vec::<String>::new());
    }

    #[test]
    fn parse_frames_merges_symbol_and_location_lines() {
        let rendered = "   0: microtest::context::TestContext::assert\n             at /work/crates/microtest/src/context.rs:52:17\n   1: my_crate::tests::test_math\n             at /work/src/lib.rs:10:9\n   2: __libc_start_main\n";
        let parsed = parse_frames(rendered);
        assert_eq!(
            parsed,
            frames(&[
                "/work/crates/microtest/src/context.rs:52:in `microtest::context::TestContext::assert`",
                "/work/src/lib.rs:10:in `my_crate::tests::test_math`",
                "__libc_start_main",
            ])
        );
    }

    #[test]
    fn capture_produces_frames() {
        assert!(!capture().is_empty());
    }
}
