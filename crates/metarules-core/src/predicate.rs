// URL applicability predicates attached to inline extractors

use crate::error::RuleError;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

type TestFn = dyn Fn(&str) -> bool + Send + Sync;

/// A predicate over the page URL deciding whether an extractor is attempted.
///
/// Equality is identity of the underlying function: two handles are equal when
/// they share the same predicate, which is what cloning a `UrlTest` produces.
#[derive(Clone)]
pub struct UrlTest {
    description: Arc<str>,
    predicate: Arc<TestFn>,
}

impl UrlTest {
    /// Wrap an arbitrary predicate. `description` is only used for display.
    pub fn new<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            description: Arc::from(description.into()),
            predicate: Arc::new(predicate),
        }
    }

    /// Matches URLs containing `needle` anywhere.
    pub fn contains(needle: impl Into<String>) -> Self {
        let needle = needle.into();
        let description = format!("contains '{}'", needle);
        Self::new(description, move |url| url.contains(needle.as_str()))
    }

    /// Matches URLs starting with `prefix`.
    pub fn prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let description = format!("prefix '{}'", prefix);
        Self::new(description, move |url| url.starts_with(prefix.as_str()))
    }

    /// Matches URLs against a regular expression.
    pub fn regex(pattern: &str) -> Result<Self, RuleError> {
        let re = Regex::new(pattern).map_err(|source| RuleError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self::new(format!("regex '{}'", pattern), move |url| {
            re.is_match(url)
        }))
    }

    /// Matches URLs whose host is `host` or one of its subdomains.
    /// URLs that fail to parse never match.
    pub fn host(host: &str) -> Result<Self, RuleError> {
        let expected = host.trim().trim_end_matches('.').to_ascii_lowercase();
        if expected.is_empty() || expected.contains(['/', ':', ' ']) {
            return Err(RuleError::InvalidHost(host.to_string()));
        }

        let description = format!("host '{}'", expected);
        Ok(Self::new(description, move |url| {
            let Ok(parsed) = url::Url::parse(url) else {
                return false;
            };
            let Some(actual) = parsed.host_str() else {
                return false;
            };
            let actual = actual.to_ascii_lowercase();
            actual == expected
                || actual
                    .strip_suffix(expected.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        }))
    }

    pub fn matches(&self, url: &str) -> bool {
        (self.predicate)(url)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// True when both handles share the same predicate function.
    pub fn ptr_eq(&self, other: &UrlTest) -> bool {
        Arc::ptr_eq(&self.predicate, &other.predicate)
    }
}

impl PartialEq for UrlTest {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for UrlTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UrlTest").field(&self.description).finish()
    }
}

impl fmt::Display for UrlTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}
