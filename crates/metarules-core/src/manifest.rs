// TOML rule manifests: base rules, inline groups and omitted properties by extractor name

use crate::error::RuleError;
use crate::model::{ExtractorRef, InlineRuleGroup, Rule, RuleSet};
use crate::predicate::UrlTest;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A rules file.
///
/// ```toml
/// omit = ["logo"]
///
/// [[rules]]
/// property = "title"
/// extractors = ["og:title", "html:title"]
///
/// [[groups]]
/// test = { host = "youtube.com" }
///
/// [[groups.rules]]
/// property = "image"
/// extractors = ["youtube:thumbnail"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuleManifest {
    #[serde(default)]
    pub omit: Vec<String>,
    #[serde(default)]
    pub rules: Vec<PropertyRules>,
    #[serde(default)]
    pub groups: Vec<GroupManifest>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyRules {
    pub property: String,
    pub extractors: Vec<ExtractorEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GroupManifest {
    pub test: Option<TestSpec>,
    #[serde(default)]
    pub rules: Vec<PropertyRules>,
}

/// Either a bare extractor name or a name with its own URL test.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ExtractorEntry {
    Name(String),
    Detailed(DetailedExtractor),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DetailedExtractor {
    pub name: String,
    pub test: Option<TestSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestSpec {
    Contains(String),
    Prefix(String),
    Regex(String),
    Host(String),
}

impl TestSpec {
    pub fn compile(&self) -> Result<UrlTest, RuleError> {
        match self {
            TestSpec::Contains(needle) => Ok(UrlTest::contains(needle.as_str())),
            TestSpec::Prefix(prefix) => Ok(UrlTest::prefix(prefix.as_str())),
            TestSpec::Regex(pattern) => UrlTest::regex(pattern),
            TestSpec::Host(host) => UrlTest::host(host),
        }
    }
}

impl ExtractorEntry {
    pub fn name(&self) -> &str {
        match self {
            ExtractorEntry::Name(name) => name,
            ExtractorEntry::Detailed(detailed) => &detailed.name,
        }
    }

    fn to_rule(&self) -> Result<Rule<ExtractorRef>, RuleError> {
        let mut rule = Rule::new(ExtractorRef::new(self.name()));
        if let ExtractorEntry::Detailed(DetailedExtractor { test: Some(spec), .. }) = self {
            rule.test = Some(spec.compile()?);
        }
        Ok(rule)
    }
}

impl PropertyRules {
    fn to_pair(&self) -> Result<(String, Vec<Rule<ExtractorRef>>), RuleError> {
        if self.property.trim().is_empty() {
            return Err(RuleError::EmptyProperty);
        }
        let rules = self
            .extractors
            .iter()
            .map(ExtractorEntry::to_rule)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((self.property.clone(), rules))
    }
}

impl GroupManifest {
    pub fn to_group(&self) -> Result<InlineRuleGroup<ExtractorRef>, RuleError> {
        let mut group: InlineRuleGroup<ExtractorRef> = InlineRuleGroup::new();
        if let Some(spec) = &self.test {
            group = group.with_test(spec.compile()?);
        }
        for property in &self.rules {
            let (name, rules) = property.to_pair()?;
            group = group.rule(name, rules);
        }
        Ok(group)
    }
}

impl RuleManifest {
    /// Top-level `[[rules]]` as a base rule set. Repeated properties are rejected.
    pub fn base_rules(&self) -> Result<RuleSet<ExtractorRef>, RuleError> {
        let pairs = self
            .rules
            .iter()
            .map(PropertyRules::to_pair)
            .collect::<Result<Vec<_>, _>>()?;
        RuleSet::try_from_pairs(pairs)
    }

    /// `[[groups]]` as inline rule groups, in file order.
    pub fn inline_groups(&self) -> Result<Vec<InlineRuleGroup<ExtractorRef>>, RuleError> {
        self.groups.iter().map(GroupManifest::to_group).collect()
    }

    /// Every group an inline file contributes: top-level `[[rules]]` first as
    /// an untested group, then `[[groups]]`.
    pub fn as_inline(&self) -> Result<Vec<InlineRuleGroup<ExtractorRef>>, RuleError> {
        let mut groups = Vec::with_capacity(self.groups.len() + 1);
        if !self.rules.is_empty() {
            let untested = GroupManifest {
                test: None,
                rules: self.rules.clone(),
            };
            groups.push(untested.to_group()?);
        }
        groups.extend(self.inline_groups()?);
        Ok(groups)
    }

    /// Every extractor name referenced anywhere in the manifest.
    pub fn extractor_names(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rules
            .iter()
            .chain(self.groups.iter().flat_map(|g| g.rules.iter()))
            .flat_map(|p| {
                p.extractors
                    .iter()
                    .map(move |e| (p.property.as_str(), e.name()))
            })
    }
}

/// Parse manifest text. `path` is only used in error messages.
pub fn parse_manifest(content: &str, path: &Path) -> Result<RuleManifest, RuleError> {
    toml::from_str(content).map_err(|source| RuleError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_manifest(path: &Path) -> Result<RuleManifest, RuleError> {
    let content = fs::read_to_string(path).map_err(|source| RuleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest(&content, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> RuleManifest {
        parse_manifest(content, Path::new("rules.toml")).unwrap()
    }

    #[test]
    fn test_parse_base_rules() {
        let manifest = parse(
            r#"
[[rules]]
property = "title"
extractors = ["og:title", "html:title"]

[[rules]]
property = "image"
extractors = ["og:image"]
"#,
        );
        let base = manifest.base_rules().unwrap();
        let order: Vec<_> = base.properties().collect();
        assert_eq!(order, ["title", "image"]);
        assert_eq!(base.get("title").unwrap().len(), 2);
    }

    #[test]
    fn test_parse_groups_with_tests() {
        let manifest = parse(
            r#"
[[groups]]
test = { contains = "youtube" }

[[groups.rules]]
property = "image"
extractors = ["youtube:thumbnail", { name = "og:image", test = { prefix = "https://" } }]
"#,
        );
        let groups = manifest.inline_groups().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].test().unwrap().description(), "contains 'youtube'");
        let (property, rules) = groups[0].rules().next().unwrap();
        assert_eq!(property, "image");
        assert!(rules[0].test.is_none());
        assert_eq!(rules[1].test.as_ref().unwrap().description(), "prefix 'https://'");
    }

    #[test]
    fn test_as_inline_puts_top_level_rules_first() {
        let manifest = parse(
            r#"
[[rules]]
property = "author"
extractors = ["byline"]

[[groups]]
test = { host = "example.com" }
[[groups.rules]]
property = "author"
extractors = ["example:author"]
"#,
        );
        let groups = manifest.as_inline().unwrap();
        assert_eq!(groups.len(), 2);
        assert!(groups[0].test().is_none());
        assert!(groups[1].test().is_some());
    }

    #[test]
    fn test_duplicate_base_property_rejected() {
        let manifest = parse(
            r#"
[[rules]]
property = "title"
extractors = ["a"]

[[rules]]
property = "title"
extractors = ["b"]
"#,
        );
        assert!(matches!(
            manifest.base_rules(),
            Err(RuleError::DuplicateProperty(p)) if p == "title"
        ));
    }

    #[test]
    fn test_invalid_regex_reported() {
        let manifest = parse(
            r#"
[[groups]]
test = { regex = "(" }
"#,
        );
        assert!(matches!(
            manifest.inline_groups(),
            Err(RuleError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = parse_manifest("[[rules]]\nproperty = \"a\"\nextractors = []\nweight = 3\n", Path::new("x.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("x.toml"));
    }

    #[test]
    fn test_non_list_extractors_rejected() {
        let result = parse_manifest("[[rules]]\nproperty = \"a\"\nextractors = \"og:title\"\n", Path::new("x.toml"));
        assert!(matches!(result, Err(RuleError::Parse { .. })));
    }

    #[test]
    fn test_extractor_names() {
        let manifest = parse(
            r#"
[[rules]]
property = "title"
extractors = ["og:title"]

[[groups]]
[[groups.rules]]
property = "image"
extractors = [{ name = "og:image" }]
"#,
        );
        let names: Vec<_> = manifest.extractor_names().collect();
        assert_eq!(names, [("title", "og:title"), ("image", "og:image")]);
    }
}
