// evaluate URL tests against a merged rule set to plan extractor order

use crate::model::{Labeled, RuleSet};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedExtractor {
    /// Position in the property's merged extractor list.
    pub position: usize,
    pub name: String,
    pub test: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyPlan {
    pub property: String,
    pub extractors: Vec<PlannedExtractor>,
    /// Extractors whose test rejected the URL.
    pub skipped: usize,
}

/// List every property with the extractors that would be attempted, in order.
///
/// With `url` set, extractors whose test rejects it are left out and counted
/// in `skipped`. Without a URL nothing is filtered.
pub fn plan<E: Labeled>(rules: &RuleSet<E>, url: Option<&str>) -> Vec<PropertyPlan> {
    rules
        .iter()
        .map(|(property, list)| {
            let mut extractors = Vec::with_capacity(list.len());
            let mut skipped = 0;

            for (position, rule) in list.iter().enumerate() {
                if let Some(url) = url {
                    if !rule.applies_to(url) {
                        skipped += 1;
                        continue;
                    }
                }
                extractors.push(PlannedExtractor {
                    position,
                    name: rule.extractor.label().to_string(),
                    test: rule.test.as_ref().map(|t| t.description().to_string()),
                });
            }

            PropertyPlan {
                property: property.to_string(),
                extractors,
                skipped,
            }
        })
        .collect()
}

pub fn plan_for_url<E: Labeled>(rules: &RuleSet<E>, url: &str) -> Vec<PropertyPlan> {
    plan(rules, Some(url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_rules;
    use crate::model::{ExtractorRef, InlineRuleGroup, Rule};
    use crate::predicate::UrlTest;

    fn merged() -> RuleSet<ExtractorRef> {
        let base = RuleSet::from_pairs(vec![(
            "image".to_string(),
            vec![Rule::new(ExtractorRef::new("og:image"))],
        )]);
        let groups = vec![InlineRuleGroup::new()
            .with_test(UrlTest::contains("youtube"))
            .rule("image", [ExtractorRef::new("youtube:thumbnail")])];
        merge_rules(&groups, &base)
    }

    #[test]
    fn test_plan_without_url_lists_everything() {
        let plans = plan(&merged(), None);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].extractors.len(), 2);
        assert_eq!(plans[0].extractors[0].name, "youtube:thumbnail");
        assert_eq!(plans[0].extractors[0].test.as_deref(), Some("contains 'youtube'"));
        assert_eq!(plans[0].skipped, 0);
    }

    #[test]
    fn test_plan_for_matching_url() {
        let plans = plan_for_url(&merged(), "https://www.youtube.com/watch?v=1");
        let names: Vec<_> = plans[0].extractors.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["youtube:thumbnail", "og:image"]);
    }

    #[test]
    fn test_plan_skips_rejected_extractors() {
        let plans = plan_for_url(&merged(), "https://vimeo.com/1");
        assert_eq!(plans[0].skipped, 1);
        assert_eq!(plans[0].extractors.len(), 1);
        assert_eq!(plans[0].extractors[0].name, "og:image");
        assert_eq!(plans[0].extractors[0].position, 1);
    }
}
