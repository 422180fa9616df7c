// Linting and validation for rule manifests

use crate::config::{local_rules_path, project_rules_path};
use crate::error::RuleError;
use crate::manifest::{load_manifest, RuleManifest};
use owo_colors::OwoColorize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LintIssue {
    pub severity: Severity,
    pub file: String,
    pub message: String,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Default)]
pub struct LintResult {
    pub issues: Vec<LintIssue>,
}

impl LintResult {
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    pub fn add_error(&mut self, file: &str, message: &str) {
        self.push(Severity::Error, file, message, None);
    }

    pub fn add_warning(&mut self, file: &str, message: &str) {
        self.push(Severity::Warning, file, message, None);
    }

    fn push(&mut self, severity: Severity, file: &str, message: &str, suggestion: Option<&str>) {
        self.issues.push(LintIssue {
            severity,
            file: file.to_string(),
            message: message.to_string(),
            suggestion: suggestion.map(str::to_string),
        });
    }

    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|i| i.severity == Severity::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues.iter().filter(|i| i.severity == Severity::Warning).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Issues grouped per file in the order files were first reported,
    /// errors ahead of warnings within each file.
    pub fn by_file(&self) -> Vec<(&str, Vec<&LintIssue>)> {
        let mut files: Vec<(&str, Vec<&LintIssue>)> = Vec::new();
        for issue in &self.issues {
            match files.iter_mut().find(|(file, _)| *file == issue.file) {
                Some((_, issues)) => issues.push(issue),
                None => files.push((issue.file.as_str(), vec![issue])),
            }
        }
        for (_, issues) in &mut files {
            issues.sort_by_key(|issue| issue.severity);
        }
        files
    }

    pub fn print(&self) {
        if self.issues.is_empty() {
            println!("{} {}", "✅".bright_green(), "All checks passed!".green().bold());
            return;
        }

        let files = self.by_file();
        for (file, issues) in &files {
            println!("{}", file.bold());
            for issue in issues {
                match issue.severity {
                    Severity::Error => println!("  {}   {}", "error".red().bold(), issue.message),
                    Severity::Warning => println!("  {} {}", "warning".yellow().bold(), issue.message),
                }
                if let Some(suggestion) = &issue.suggestion {
                    println!("          {} {}", "hint:".bright_blue(), suggestion);
                }
            }
            println!();
        }

        let summary = format!(
            "{} error(s), {} warning(s) in {} file(s)",
            self.error_count(),
            self.warning_count(),
            files.len()
        );
        if self.has_errors() {
            println!("{}", summary.red());
        } else {
            println!("{}", summary.yellow());
        }
    }
}

/// The error and every cause beneath it on one line.
fn describe(err: RuleError) -> String {
    format!("{:#}", anyhow::Error::new(err))
}

/// Validate the project rules file: it must exist, parse, and form a valid base set.
pub fn validate_project(root: &Path) -> LintResult {
    let mut result = LintResult::new();
    let path = project_rules_path(root);
    let file = path.display().to_string();

    if !path.exists() {
        result.push(
            Severity::Error,
            &file,
            "Project rules file not found",
            Some("Create it with at least one [[rules]] table"),
        );
        return result;
    }

    let manifest = match load_manifest(&path) {
        Ok(manifest) => manifest,
        Err(e) => {
            result.add_error(&file, &describe(e));
            return result;
        }
    };

    if let Err(e) = manifest.base_rules() {
        result.add_error(&file, &describe(e));
    }
    if manifest.rules.is_empty() {
        result.add_warning(&file, "No base rules defined");
    }

    check_manifest(&manifest, &file, &mut result);
    result
}

/// Validate a file that only contributes inline groups.
pub fn validate_inline(path: &Path) -> LintResult {
    let mut result = LintResult::new();
    let file = path.display().to_string();

    match load_manifest(path) {
        Ok(manifest) => check_manifest(&manifest, &file, &mut result),
        Err(e) => result.add_error(&file, &describe(e)),
    }
    result
}

fn check_manifest(manifest: &RuleManifest, file: &str, result: &mut LintResult) {
    if let Err(e) = manifest.inline_groups() {
        result.add_error(file, &describe(e));
    }

    let mut defined = HashSet::new();
    for property in &manifest.rules {
        defined.insert(property.property.as_str());
        if property.extractors.is_empty() {
            result.add_warning(file, &format!("Property '{}' has no extractors", property.property));
        }
    }

    for (i, group) in manifest.groups.iter().enumerate() {
        if group.rules.is_empty() {
            result.add_warning(file, &format!("Group {} has no rules", i + 1));
        }
        let mut seen = HashSet::new();
        for property in &group.rules {
            defined.insert(property.property.as_str());
            if !seen.insert(property.property.as_str()) {
                result.push(
                    Severity::Warning,
                    file,
                    &format!("Group {} lists property '{}' more than once", i + 1, property.property),
                    Some("Combine the extractors into a single [[groups.rules]] entry"),
                );
            }
            if property.extractors.is_empty() {
                result.add_warning(file, &format!("Property '{}' has no extractors", property.property));
            }
        }
    }

    for name in &manifest.omit {
        if !defined.contains(name.as_str()) {
            result.add_warning(file, &format!("Omitted property '{}' is not defined in this file", name));
        }
    }
}

/// Run all lint checks: project rules, local rules, then any extra inline files.
pub fn lint_all(root: &Path, extra_inline: &[PathBuf]) -> LintResult {
    let mut result = validate_project(root);

    let local = local_rules_path(root);
    if local.exists() {
        result.issues.extend(validate_inline(&local).issues);
    }
    for path in extra_inline {
        result.issues.extend(validate_inline(path).issues);
    }

    result
}
