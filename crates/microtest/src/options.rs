//! Run options and their command-line parser.
//!
//! The engine itself only reads the [`Options`] fields; `from_args` is the
//! bundled collaborator that populates them from a raw argument list.

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable that suppresses the skipped-tests hint.
pub const NO_SKIP_MSG_ENV: &str = "MICROTEST_NO_SKIP_MSG";

pub type OptionsResult<T> = Result<T, OptionsError>;

/// Argument parsing errors
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("{0}")]
    Parse(#[from] clap::Error),
}

/// Options consumed by the engine for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Options {
    /// Random seed, reserved for deterministic ordering extensions; not
    /// otherwise used by the core.
    pub seed: Option<u64>,
    /// Toggles detailed progress and summary rendering.
    pub verbose: bool,
    /// Method filter: exact string or slash-delimited regex.
    pub filter: Option<String>,
    /// Raw argument list, echoed in the summary header only.
    pub orig_args: Vec<String>,
    /// Suppresses the skip hint in the summary.
    pub no_skip_hint: bool,
}

#[derive(Parser)]
#[command(name = "microtest", version, about = "microtest options")]
struct Cli {
    /// Sets random seed.
    #[arg(short = 's', long, value_name = "SEED")]
    seed: Option<u64>,

    /// Verbose. Show progress processing files.
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Filter run on /regexp/ or string.
    #[arg(short = 'n', long = "name", value_name = "PATTERN")]
    name: Option<String>,
}

impl Options {
    /// Parse an argument list (without the program name) into options.
    ///
    /// The raw list is echoed back in `orig_args`; the skip-hint suppression
    /// flag is seeded from the `MICROTEST_NO_SKIP_MSG` environment variable.
    pub fn from_args<I, S>(args: I) -> OptionsResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let orig_args: Vec<String> = args.into_iter().map(Into::into).collect();
        let cli = Cli::try_parse_from(
            std::iter::once("microtest".to_string()).chain(orig_args.iter().cloned()),
        )?;

        Ok(Self {
            seed: cli.seed,
            verbose: cli.verbose,
            filter: cli.name,
            orig_args,
            no_skip_hint: std::env::var_os(NO_SKIP_MSG_ENV).is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn recognized_flags_populate_the_options() {
        let options = Options::from_args(["-v", "-n", "foo", "-s", "42"]).unwrap();
        assert!(options.verbose);
        assert_eq!(options.filter.as_deref(), Some("foo"));
        assert_eq!(options.seed, Some(42));
        assert_eq!(options.orig_args, vec!["-v", "-n", "foo", "-s", "42"]);
    }

    #[test]
    fn long_flags_are_accepted() {
        let options = Options::from_args(["--verbose", "--name", "/^test_/", "--seed", "7"]).unwrap();
        assert!(options.verbose);
        assert_eq!(options.filter.as_deref(), Some("/^test_/"));
        assert_eq!(options.seed, Some(7));
    }

    #[test]
    fn empty_args_yield_defaults() {
        let options = Options::from_args(Vec::<String>::new()).unwrap();
        assert!(!options.verbose);
        assert_eq!(options.filter, None);
        assert_eq!(options.seed, None);
        assert!(options.orig_args.is_empty());
    }

    #[test]
    fn unknown_flags_are_an_error() {
        assert!(Options::from_args(["--bogus"]).is_err());
    }

    #[test]
    fn non_integer_seed_is_an_error() {
        assert!(Options::from_args(["--seed", "not-a-number"]).is_err());
    }
}
