//! Method selection by name pattern.
//!
//! A filter string wrapped in slashes (`/pat/`) compiles as a regex; any
//! other string matches exactly. Either way a method is selected when the
//! filter matches its bare name or its qualified `"Unit#method"` form.

use regex::Regex;
use thiserror::Error;

pub type FilterResult<T> = Result<T, FilterError>;

/// Filter parsing errors
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid filter pattern /{pattern}/: {error}")]
    InvalidPattern {
        pattern: String,
        error: regex::Error,
    },
}

/// A compiled method filter.
#[derive(Debug, Clone)]
pub enum MethodFilter {
    /// Match everything; the default when no filter is given.
    All,
    /// Slash-delimited regex form.
    Pattern(Regex),
    /// Exact string comparison, not prefix or substring.
    Exact(String),
}

impl MethodFilter {
    /// Parse an optional filter string.
    pub fn parse(spec: Option<&str>) -> FilterResult<Self> {
        let Some(spec) = spec else {
            return Ok(Self::All);
        };

        if let Some(pattern) = spec
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
        {
            let regex = Regex::new(pattern).map_err(|error| FilterError::InvalidPattern {
                pattern: pattern.to_string(),
                error,
            })?;
            return Ok(Self::Pattern(regex));
        }

        Ok(Self::Exact(spec.to_string()))
    }

    /// Does this filter select `method_name` on `unit_name`?
    pub fn matches(&self, unit_name: &str, method_name: &str) -> bool {
        let qualified = format!("{}#{}", unit_name, method_name);
        match self {
            Self::All => true,
            Self::Pattern(regex) => regex.is_match(method_name) || regex.is_match(&qualified),
            Self::Exact(text) => text == method_name || text == &qualified,
        }
    }
}
