// merge inline rule groups on top of a base rule set without touching either input

use crate::model::{InlineRuleGroup, Rule, RuleSet};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, trace};

/// Merges inline rule groups into a base rule set.
///
/// Inline extractors are tried before base extractors for the same property,
/// earlier groups before later ones. Properties unknown to the base set are
/// appended in the order they are first seen.
#[derive(Debug, Clone, Default)]
pub struct RuleMerger {
    omit: BTreeSet<String>,
}

impl RuleMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop these properties from the merged output, whichever side defines them.
    pub fn omit<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.omit.extend(properties.into_iter().map(Into::into));
        self
    }

    pub fn omitted(&self) -> &BTreeSet<String> {
        &self.omit
    }

    pub fn merge<E: Clone>(&self, inline: &[InlineRuleGroup<E>], base: &RuleSet<E>) -> RuleSet<E> {
        let mut pairs: Vec<(String, Vec<Rule<E>>)> = base
            .iter()
            .filter(|(property, _)| !self.omit.contains(*property))
            .map(|(property, rules)| (property.to_string(), rules.to_vec()))
            .collect();

        // first occurrence wins when the base repeats a property
        let mut index: HashMap<String, usize> = HashMap::with_capacity(pairs.len());
        for (i, (property, _)) in pairs.iter().enumerate() {
            index.entry(property.clone()).or_insert(i);
        }

        // inline extractors already placed at the front of each list
        let mut inline_len = vec![0usize; pairs.len()];

        for (group_idx, group) in inline.iter().enumerate() {
            let test = group.test();
            let mut added = 0usize;

            for (property, rules) in group.rules() {
                if self.omit.contains(property) {
                    trace!(property, group = group_idx, "skipping omitted property");
                    continue;
                }

                let wrapped: Vec<Rule<E>> = rules
                    .iter()
                    .map(|rule| match test {
                        Some(test) => rule.with_test(test.clone()),
                        None => rule.clone(),
                    })
                    .collect();
                added += wrapped.len();

                match index.get(property) {
                    Some(&i) => {
                        let at = inline_len[i];
                        inline_len[i] += wrapped.len();
                        pairs[i].1.splice(at..at, wrapped);
                    }
                    None => {
                        index.insert(property.to_string(), pairs.len());
                        inline_len.push(wrapped.len());
                        pairs.push((property.to_string(), wrapped));
                    }
                }
            }

            debug!(
                group = group_idx,
                test = test.map(|t| t.description()),
                extractors = added,
                "merged inline rule group"
            );
        }

        RuleSet::from_pairs(pairs)
    }
}

/// Merge with no omitted properties.
pub fn merge_rules<E: Clone>(inline: &[InlineRuleGroup<E>], base: &RuleSet<E>) -> RuleSet<E> {
    RuleMerger::default().merge(inline, base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExtractorRef;
    use crate::predicate::UrlTest;

    fn r(name: &str) -> ExtractorRef {
        ExtractorRef::new(name)
    }

    fn base(pairs: &[(&str, &[&str])]) -> RuleSet<ExtractorRef> {
        RuleSet::from_pairs(
            pairs
                .iter()
                .map(|(p, names)| (p.to_string(), names.iter().map(|n| Rule::new(r(n))).collect()))
                .collect(),
        )
    }

    fn names(set: &RuleSet<ExtractorRef>, property: &str) -> Vec<String> {
        set.get(property)
            .unwrap()
            .iter()
            .map(|rule| rule.extractor.0.clone())
            .collect()
    }

    #[test]
    fn test_merge_empty() {
        let result = merge_rules::<ExtractorRef>(&[], &RuleSet::new());
        assert!(result.is_empty());
    }

    #[test]
    fn test_base_only_is_copied() {
        let b = base(&[("title", &["h"]), ("image", &["i"])]);
        let result = merge_rules(&[], &b);
        assert_eq!(result, b);
    }

    #[test]
    fn test_inline_precedes_base_across_groups() {
        let b = base(&[("title", &["h1", "h2"])]);
        let groups = vec![
            InlineRuleGroup::new().rule("title", [r("g1"), r("g2")]),
            InlineRuleGroup::new().rule("title", [r("g3")]),
        ];
        let result = merge_rules(&groups, &b);
        assert_eq!(names(&result, "title"), ["g1", "g2", "g3", "h1", "h2"]);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_new_properties_appended_in_first_seen_order() {
        let b = base(&[("title", &["h"])]);
        let groups = vec![
            InlineRuleGroup::new().rule("foo", [r("f")]).rule("bar", [r("b")]),
            InlineRuleGroup::new().rule("baz", [r("z")]).rule("foo", [r("f2")]),
        ];
        let result = merge_rules(&groups, &b);
        let order: Vec<_> = result.properties().collect();
        assert_eq!(order, ["title", "foo", "bar", "baz"]);
        assert_eq!(names(&result, "foo"), ["f", "f2"]);
    }

    #[test]
    fn test_group_test_attached_to_group_extractors_only() {
        let b = base(&[("title", &["h"])]);
        let test = UrlTest::contains("x");
        let groups = vec![InlineRuleGroup::new()
            .with_test(test.clone())
            .rule("title", [r("g")])];
        let result = merge_rules(&groups, &b);
        let title = result.get("title").unwrap();
        assert_eq!(title[0].test.as_ref(), Some(&test));
        assert!(title[1].test.is_none());
    }

    #[test]
    fn test_group_test_replaces_entry_test_on_copy() {
        let own = UrlTest::contains("own");
        let group_test = UrlTest::contains("group");
        let groups = vec![InlineRuleGroup::<ExtractorRef>::new()
            .with_test(group_test.clone())
            .rule("image", [Rule::new(r("i")).with_test(own.clone())])];
        let result = merge_rules(&groups, &RuleSet::new());
        assert_eq!(result.get("image").unwrap()[0].test.as_ref(), Some(&group_test));

        let (_, original) = groups[0].rules().next().unwrap();
        assert_eq!(original[0].test.as_ref(), Some(&own));
    }

    #[test]
    fn test_entry_test_kept_without_group_test() {
        let own = UrlTest::contains("own");
        let groups = vec![InlineRuleGroup::<ExtractorRef>::new()
            .rule("image", [Rule::new(r("i")).with_test(own.clone())])];
        let result = merge_rules(&groups, &RuleSet::new());
        assert_eq!(result.get("image").unwrap()[0].test.as_ref(), Some(&own));
    }

    #[test]
    fn test_duplicate_base_property_targets_first() {
        let b = base(&[("title", &["a"]), ("title", &["b"])]);
        let groups = vec![InlineRuleGroup::new().rule("title", [r("g")])];
        let result = merge_rules(&groups, &b);
        let pairs = result.into_pairs();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].1.len(), 2);
        assert_eq!(pairs[1].1.len(), 1);
    }

    #[test]
    fn test_omit_drops_base_and_inline() {
        let b = base(&[("title", &["h"]), ("image", &["i"])]);
        let groups = vec![InlineRuleGroup::new().rule("image", [r("g")]).rule("logo", [r("l")])];
        let result = RuleMerger::new().omit(["image", "logo"]).merge(&groups, &b);
        let order: Vec<_> = result.properties().collect();
        assert_eq!(order, ["title"]);
    }

    #[test]
    fn test_empty_inline_list_creates_empty_property() {
        let groups = vec![InlineRuleGroup::<ExtractorRef>::new().rule("foo", Vec::<ExtractorRef>::new())];
        let result = merge_rules(&groups, &RuleSet::new());
        assert_eq!(result.get("foo").map(|rules| rules.len()), Some(0));
    }
}
