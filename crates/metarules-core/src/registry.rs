// bind extractor names from manifests to extraction functions

use crate::error::RuleError;
use crate::model::{ExtractFn, ExtractorRef, InlineRuleGroup, Page, RuleSet};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<String, ExtractFn>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `func` under `name`, replacing any previous registration.
    pub fn register<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&Page<'_>) -> Option<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        self.extractors
            .insert(name.clone(), ExtractFn::new(name, func));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ExtractFn> {
        self.extractors.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.extractors.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.extractors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn resolve(&self, property: &str, reference: &ExtractorRef) -> Result<ExtractFn, RuleError> {
        self.get(&reference.0)
            .cloned()
            .ok_or_else(|| RuleError::UnknownExtractor {
                property: property.to_string(),
                name: reference.0.clone(),
            })
    }

    pub fn bind_rules(&self, rules: &RuleSet<ExtractorRef>) -> Result<RuleSet<ExtractFn>, RuleError> {
        rules.try_map(|property, reference| self.resolve(property, reference))
    }

    pub fn bind_group(
        &self,
        group: &InlineRuleGroup<ExtractorRef>,
    ) -> Result<InlineRuleGroup<ExtractFn>, RuleError> {
        group.try_map(|property, reference| self.resolve(property, reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rule;
    use crate::predicate::UrlTest;

    fn registry() -> ExtractorRegistry {
        let mut registry = ExtractorRegistry::new();
        registry
            .register("const:bar", |_page| Some(Value::from("bar")))
            .register("url", |page| Some(Value::from(page.url)));
        registry
    }

    #[test]
    fn test_bind_rules_keeps_order_and_tests() {
        let test = UrlTest::contains("x");
        let rules = RuleSet::from_pairs(vec![(
            "foo".to_string(),
            vec![
                Rule::new(ExtractorRef::new("url")).with_test(test.clone()),
                Rule::new(ExtractorRef::new("const:bar")),
            ],
        )]);
        let bound = registry().bind_rules(&rules).unwrap();
        let foo = bound.get("foo").unwrap();
        let page = Page { url: "https://x.com", html: "" };
        assert_eq!(foo[0].extractor.call(&page), Some(Value::from("https://x.com")));
        assert_eq!(foo[0].test.as_ref(), Some(&test));
        assert_eq!(foo[1].extractor.call(&page), Some(Value::from("bar")));
    }

    #[test]
    fn test_bind_unknown_extractor() {
        let rules = RuleSet::from_pairs(vec![(
            "foo".to_string(),
            vec![Rule::new(ExtractorRef::new("missing"))],
        )]);
        let err = registry().bind_rules(&rules).unwrap_err();
        assert_eq!(err.to_string(), "unknown extractor 'missing' for property 'foo'");
    }

    #[test]
    fn test_bind_group_keeps_group_test() {
        let group = InlineRuleGroup::new()
            .with_test(UrlTest::contains("x"))
            .rule("foo", [ExtractorRef::new("url")]);
        let bound = registry().bind_group(&group).unwrap();
        assert_eq!(bound.test(), group.test());
    }

    #[test]
    fn test_names_sorted() {
        assert_eq!(registry().names(), ["const:bar", "url"]);
    }
}
