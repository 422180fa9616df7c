pub mod config;
pub mod error;
pub mod lint;
pub mod manifest;
pub mod merge;
pub mod model;
pub mod planner;
pub mod predicate;
pub mod registry;

pub use error::RuleError;
pub use merge::{merge_rules, RuleMerger};
pub use model::{ExtractFn, ExtractorList, ExtractorRef, InlineRuleGroup, Labeled, Page, Rule, RuleSet};
pub use predicate::UrlTest;
pub use registry::ExtractorRegistry;

use anyhow::Result;
use owo_colors::OwoColorize;
use planner::PropertyPlan;
use std::path::{Path, PathBuf};

/// Print the merged rule order for the rules under `root`.
pub fn cmd_merge(root: &Path, inline: &[PathBuf], json_output: bool) -> Result<()> {
    let loaded = config::load_rules_with_precedence(root, inline)?;
    let merged = loaded.merged();
    let plans = planner::plan(&merged, None);

    if json_output {
        let output = serde_json::json!({
            "sources": loaded.sources.iter().map(|p| p.to_string_lossy()).collect::<Vec<_>>(),
            "omitted": loaded.omit,
            "properties": plans,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("{} {}", "▸".bright_cyan(), "Merged rules".bright_cyan().bold());
    println!(
        "   {} base properties, {} inline groups",
        loaded.base.len(),
        loaded.inline.len()
    );
    if !loaded.omit.is_empty() {
        let omitted: Vec<&str> = loaded.omit.iter().map(String::as_str).collect();
        println!("   omitted: {}", omitted.join(", ").bright_black());
    }
    println!();
    println!("{}", plan_table(&plans));
    Ok(())
}

/// Print the extractors that would be attempted for `url`, in order.
pub fn cmd_plan(root: &Path, inline: &[PathBuf], url: &str, json_output: bool) -> Result<()> {
    let loaded = config::load_rules_with_precedence(root, inline)?;
    let merged = loaded.merged();
    let plans = planner::plan_for_url(&merged, url);

    if json_output {
        let output = serde_json::json!({
            "url": url,
            "properties": plans,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("{} {} {}", "▸".bright_cyan(), "Plan for".bright_cyan().bold(), url.bright_white());
    println!();
    println!("{}", plan_table(&plans));

    let skipped: usize = plans.iter().map(|p| p.skipped).sum();
    if skipped > 0 {
        println!();
        println!("   {} extractors skipped by URL tests", skipped.to_string().yellow());
    }
    Ok(())
}

/// Validate rule files; fails when any error is found.
pub fn cmd_lint(root: &Path, inline: &[PathBuf]) -> Result<()> {
    let result = lint::lint_all(root, inline);
    result.print();

    if result.has_errors() {
        anyhow::bail!("Lint failed with {} errors", result.error_count());
    }
    Ok(())
}

fn plan_table(plans: &[PropertyPlan]) -> comfy_table::Table {
    use comfy_table::presets::UTF8_FULL;
    use comfy_table::{Cell, Color, Row, Table};

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Property", "#", "Extractor", "Test"]);

    for plan in plans {
        if plan.extractors.is_empty() {
            table.add_row(Row::from(vec![
                Cell::new(&plan.property).fg(Color::Cyan),
                Cell::new("-"),
                Cell::new("(none)").fg(Color::DarkGrey),
                Cell::new(""),
            ]));
            continue;
        }
        for (i, extractor) in plan.extractors.iter().enumerate() {
            let property = if i == 0 { plan.property.as_str() } else { "" };
            table.add_row(Row::from(vec![
                Cell::new(property).fg(Color::Cyan),
                Cell::new(extractor.position + 1),
                Cell::new(&extractor.name).fg(Color::White),
                Cell::new(extractor.test.as_deref().unwrap_or("")).fg(Color::Yellow),
            ]));
        }
    }

    table
}
