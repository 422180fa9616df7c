use crate::manifest::{load_manifest, RuleManifest};
use crate::merge::RuleMerger;
use crate::model::{ExtractorRef, InlineRuleGroup, RuleSet};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const RULES_DIR: &str = ".metarules";
pub const RULES_FILE: &str = "rules.toml";
pub const LOCAL_RULES_FILE: &str = "rules.local.toml";

/// Base rules, inline groups and omitted properties gathered from every layer.
#[derive(Debug, Clone)]
pub struct LoadedRules {
    pub base: RuleSet<ExtractorRef>,
    pub inline: Vec<InlineRuleGroup<ExtractorRef>>,
    pub omit: BTreeSet<String>,
    /// Files that contributed, in the order they were applied.
    pub sources: Vec<PathBuf>,
}

impl LoadedRules {
    pub fn merger(&self) -> RuleMerger {
        RuleMerger::new().omit(self.omit.iter().cloned())
    }

    pub fn merged(&self) -> RuleSet<ExtractorRef> {
        self.merger().merge(&self.inline, &self.base)
    }
}

pub fn project_rules_path(root: &Path) -> PathBuf {
    root.join(RULES_DIR).join(RULES_FILE)
}

pub fn local_rules_path(root: &Path) -> PathBuf {
    root.join(RULES_DIR).join(LOCAL_RULES_FILE)
}

/// `~/.metarules/rules.toml`, if a home directory is known.
pub fn user_rules_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(RULES_DIR).join(RULES_FILE))
}

/// Load rules with precedence (earlier inline groups are tried first):
/// 1. `extra_inline` files, in the order given - required
/// 2. Local rules (`.metarules/rules.local.toml`) - optional
/// 3. Groups declared in the project rules file
/// 4. User rules (`~/.metarules/rules.toml`) - optional
///
/// The project file's `[[rules]]` form the base rule set.
pub fn load_rules_with_precedence(root: &Path, extra_inline: &[PathBuf]) -> Result<LoadedRules> {
    load_rules_from(root, extra_inline, user_rules_path().as_deref())
}

/// Same as [`load_rules_with_precedence`] with an explicit user rules file.
pub fn load_rules_from(root: &Path, extra_inline: &[PathBuf], user_rules: Option<&Path>) -> Result<LoadedRules> {
    let project_path = project_rules_path(root);
    if !project_path.exists() {
        return Err(crate::error::RuleError::MissingRules(project_path).into());
    }

    let project = load_manifest(&project_path)?;
    let base = project
        .base_rules()
        .with_context(|| format!("Invalid base rules in {}", project_path.display()))?;

    let mut inline = Vec::new();
    let mut omit: BTreeSet<String> = project.omit.iter().cloned().collect();
    let mut sources = Vec::new();

    for path in extra_inline {
        let manifest = load_manifest(path)?;
        push_inline(&manifest, path, &mut inline, &mut omit)?;
        sources.push(path.clone());
    }

    let local_path = local_rules_path(root);
    if local_path.exists() {
        match load_optional(&local_path).and_then(|m| inline_groups_of(&m, &local_path).map(|g| (m, g))) {
            Ok((manifest, groups)) => {
                inline.extend(groups);
                omit.extend(manifest.omit.iter().cloned());
                sources.push(local_path.clone());
            }
            Err(e) => warn!("Failed to load local rules: {:#}", e),
        }
    }

    inline.extend(
        project
            .inline_groups()
            .with_context(|| format!("Invalid inline groups in {}", project_path.display()))?,
    );
    sources.push(project_path.clone());

    if let Some(user_path) = user_rules.filter(|p| p.exists()) {
        // HOME may be the project root itself
        if same_file(user_path, &project_path) || same_file(user_path, &local_path) {
            debug!(path = %user_path.display(), "user rules are the project rules, skipping");
        } else {
            // user files never omit project properties
            match load_optional(user_path).and_then(|m| inline_groups_of(&m, user_path)) {
                Ok(groups) => {
                    inline.extend(groups);
                    sources.push(user_path.to_path_buf());
                }
                Err(e) => warn!("Failed to load user rules: {:#}", e),
            }
        }
    }

    debug!(
        properties = base.len(),
        groups = inline.len(),
        omitted = omit.len(),
        "loaded rules"
    );

    Ok(LoadedRules {
        base,
        inline,
        omit,
        sources,
    })
}

fn load_optional(path: &Path) -> Result<RuleManifest> {
    load_manifest(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn inline_groups_of(manifest: &RuleManifest, path: &Path) -> Result<Vec<InlineRuleGroup<ExtractorRef>>> {
    manifest
        .as_inline()
        .with_context(|| format!("Invalid inline rules in {}", path.display()))
}

/// Both paths resolve to the same file on disk.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn push_inline(
    manifest: &RuleManifest,
    path: &Path,
    inline: &mut Vec<InlineRuleGroup<ExtractorRef>>,
    omit: &mut BTreeSet<String>,
) -> Result<()> {
    inline.extend(inline_groups_of(manifest, path)?);
    omit.extend(manifest.omit.iter().cloned());
    Ok(())
}
