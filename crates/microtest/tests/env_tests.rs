//! Environment-driven behavior. Kept in its own binary so setting process
//! environment variables cannot race the other output tests.

use microtest::options::NO_SKIP_MSG_ENV;
use microtest::{buffer_contents, buffer_sink, CancelToken, Options, Registry, UnitDef};

#[test]
fn skip_hint_suppression_applies_to_directly_built_options() {
    std::env::set_var(NO_SKIP_MSG_ENV, "1");

    let mut registry = Registry::new();
    registry.register(UnitDef::new("EnvUnit").method("test_later", |ctx| ctx.skip("later")));

    // Options built by hand, bypassing from_args: the variable is consulted
    // when the summary is rendered, not only at parse time.
    let (sink, buffer) = buffer_sink();
    let passed = microtest::run(
        &registry,
        Options::default(),
        sink,
        Vec::new(),
        &CancelToken::new(),
    )
    .unwrap();
    assert!(passed);

    let output = buffer_contents(&buffer);
    assert!(output.contains("1 runs, 0 assertions, 0 failures, 0 errors, 1 skips\n"));
    assert!(!output.contains("You have skipped tests"));

    std::env::remove_var(NO_SKIP_MSG_ENV);
}
