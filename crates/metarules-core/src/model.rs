// rule model: extractors, test-wrapped rules, rule sets and inline groups

use crate::error::RuleError;
use crate::predicate::UrlTest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Input handed to extractors by the execution engine.
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    pub url: &'a str,
    pub html: &'a str,
}

type ExtractFnInner = dyn Fn(&Page<'_>) -> Option<Value> + Send + Sync;

/// A named extraction function. Cloning shares the function.
#[derive(Clone)]
pub struct ExtractFn {
    name: Arc<str>,
    func: Arc<ExtractFnInner>,
}

impl ExtractFn {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Page<'_>) -> Option<Value> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.into()),
            func: Arc::new(func),
        }
    }

    pub fn call(&self, page: &Page<'_>) -> Option<Value> {
        (self.func)(page)
    }

    /// True when both handles share the same function.
    pub fn ptr_eq(&self, other: &ExtractFn) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl PartialEq for ExtractFn {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ExtractFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExtractFn").field(&self.name).finish()
    }
}

/// Extractor referenced by name, as written in rule manifests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractorRef(pub String);

impl ExtractorRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl From<&str> for ExtractorRef {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Anything that can be shown by name in plans and listings.
pub trait Labeled {
    fn label(&self) -> &str;
}

impl Labeled for ExtractFn {
    fn label(&self) -> &str {
        &self.name
    }
}

impl Labeled for ExtractorRef {
    fn label(&self) -> &str {
        &self.0
    }
}

/// One entry of an extractor list: the extractor plus an optional URL test.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule<E> {
    pub extractor: E,
    pub test: Option<UrlTest>,
}

impl<E> Rule<E> {
    pub fn new(extractor: E) -> Self {
        Self { extractor, test: None }
    }

    /// Whether this rule should be attempted for `url`. Untested rules always apply.
    pub fn applies_to(&self, url: &str) -> bool {
        self.test.as_ref().map_or(true, |test| test.matches(url))
    }

    pub fn map<T>(self, f: impl FnOnce(E) -> T) -> Rule<T> {
        Rule {
            extractor: f(self.extractor),
            test: self.test,
        }
    }
}

impl<E: Clone> Rule<E> {
    /// A copy of this rule carrying `test`. `self` is left as it was.
    pub fn with_test(&self, test: UrlTest) -> Self {
        Self {
            extractor: self.extractor.clone(),
            test: Some(test),
        }
    }
}

impl<E> From<E> for Rule<E> {
    fn from(extractor: E) -> Self {
        Rule::new(extractor)
    }
}

/// Ordered candidate extractors for a single property.
pub type ExtractorList<E> = Vec<Rule<E>>;

/// Ordered `(property, extractors)` pairs. Built once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet<E> {
    pairs: Vec<(String, ExtractorList<E>)>,
}

impl<E> Default for RuleSet<E> {
    fn default() -> Self {
        Self { pairs: Vec::new() }
    }
}

impl<E> RuleSet<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pairs without checking for repeated property names.
    pub fn from_pairs(pairs: Vec<(String, ExtractorList<E>)>) -> Self {
        Self { pairs }
    }

    /// Build from pairs, rejecting empty or repeated property names.
    pub fn try_from_pairs(pairs: Vec<(String, ExtractorList<E>)>) -> Result<Self, RuleError> {
        let mut seen = HashSet::new();
        for (property, _) in &pairs {
            if property.trim().is_empty() {
                return Err(RuleError::EmptyProperty);
            }
            if !seen.insert(property.as_str()) {
                return Err(RuleError::DuplicateProperty(property.clone()));
            }
        }
        Ok(Self { pairs })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Extractors for `property` (first occurrence).
    pub fn get(&self, property: &str) -> Option<&[Rule<E>]> {
        self.pairs
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, rules)| rules.as_slice())
    }

    pub fn contains(&self, property: &str) -> bool {
        self.get(property).is_some()
    }

    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Rule<E>])> {
        self.pairs
            .iter()
            .map(|(name, rules)| (name.as_str(), rules.as_slice()))
    }

    pub fn into_pairs(self) -> Vec<(String, ExtractorList<E>)> {
        self.pairs
    }

    /// Convert every extractor, keeping property order and attached tests.
    pub fn try_map<T, Er>(
        &self,
        mut f: impl FnMut(&str, &E) -> Result<T, Er>,
    ) -> Result<RuleSet<T>, Er> {
        let mut pairs = Vec::with_capacity(self.pairs.len());
        for (property, rules) in &self.pairs {
            let mut mapped = Vec::with_capacity(rules.len());
            for rule in rules {
                mapped.push(Rule {
                    extractor: f(property, &rule.extractor)?,
                    test: rule.test.clone(),
                });
            }
            pairs.push((property.clone(), mapped));
        }
        Ok(RuleSet { pairs })
    }
}

impl<E> FromIterator<(String, ExtractorList<E>)> for RuleSet<E> {
    fn from_iter<I: IntoIterator<Item = (String, ExtractorList<E>)>>(iter: I) -> Self {
        Self::from_pairs(iter.into_iter().collect())
    }
}

/// Caller-supplied rules merged on top of a base rule set for one scrape.
///
/// `test`, when present, is attached to every extractor the group contributes.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineRuleGroup<E> {
    test: Option<UrlTest>,
    rules: Vec<(String, ExtractorList<E>)>,
}

impl<E> Default for InlineRuleGroup<E> {
    fn default() -> Self {
        Self {
            test: None,
            rules: Vec::new(),
        }
    }
}

impl<E> InlineRuleGroup<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test(mut self, test: UrlTest) -> Self {
        self.test = Some(test);
        self
    }

    /// Add extractors for `property`. Repeating a property extends its list.
    pub fn rule<I, R>(mut self, property: impl Into<String>, extractors: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule<E>>,
    {
        let property = property.into();
        let extractors = extractors.into_iter().map(Into::into);
        match self.rules.iter_mut().find(|(name, _)| *name == property) {
            Some((_, list)) => list.extend(extractors),
            None => self.rules.push((property, extractors.collect())),
        }
        self
    }

    pub fn test(&self) -> Option<&UrlTest> {
        self.test.as_ref()
    }

    pub fn rules(&self) -> impl Iterator<Item = (&str, &[Rule<E>])> {
        self.rules
            .iter()
            .map(|(name, rules)| (name.as_str(), rules.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn try_map<T, Er>(
        &self,
        mut f: impl FnMut(&str, &E) -> Result<T, Er>,
    ) -> Result<InlineRuleGroup<T>, Er> {
        let mut rules = Vec::with_capacity(self.rules.len());
        for (property, list) in &self.rules {
            let mut mapped = Vec::with_capacity(list.len());
            for rule in list {
                mapped.push(Rule {
                    extractor: f(property, &rule.extractor)?,
                    test: rule.test.clone(),
                });
            }
            rules.push((property.clone(), mapped));
        }
        Ok(InlineRuleGroup {
            test: self.test.clone(),
            rules,
        })
    }
}
