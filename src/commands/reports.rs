use crate::cli::{ReportLocation, ReportsCommand};
use crate::config::load_config;
use crate::errors::EXIT_OK;
use crate::paths::{get_qualified_module_name, parse_qualified_name};
use crate::reports::{CleanupSummary, ReportFile, ReportManager, ReportType};
use anyhow::Result;
use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

pub fn handle_reports(command: ReportsCommand) -> Result<i32> {
    match command {
        ReportsCommand::List {
            report_type,
            module,
            location,
        } => list_reports(report_type, module.as_deref(), &location),
        ReportsCommand::Clean {
            report_type,
            keep,
            dry_run,
            location,
        } => clean_reports(report_type, keep, dry_run, &location),
        ReportsCommand::Name { path } => {
            print_name(&path);
            Ok(EXIT_OK)
        }
    }
}

fn manager_for(location: &ReportLocation) -> (ReportManager, crate::config::AnalyzerConfig) {
    let config = load_config(&location.project_root);
    (ReportManager::new(location.report_root(&config)), config)
}

fn selected_types(report_type: Option<ReportType>) -> Vec<ReportType> {
    report_type.map_or_else(|| ReportType::ALL.to_vec(), |t| vec![t])
}

fn files_present(file: &ReportFile) -> &'static str {
    match (file.has_markdown, file.has_json) {
        (true, true) => "md + json",
        (true, false) => "md only",
        (false, true) => "json only",
        (false, false) => "-",
    }
}

fn list_reports(
    report_type: Option<ReportType>,
    module: Option<&str>,
    location: &ReportLocation,
) -> Result<i32> {
    let (manager, _) = manager_for(location);
    let mut files = Vec::new();
    for report_type in selected_types(report_type) {
        files.extend(
            manager
                .list_reports(report_type)?
                .into_iter()
                .filter(|f| module.is_none_or(|m| f.name.module_name == m)),
        );
    }

    if files.is_empty() {
        println!("No reports under {}", manager.root().display());
        return Ok(EXIT_OK);
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Module", "Tool", "Type", "Timestamp", "Files"]);
    for file in &files {
        table.add_row(vec![
            file.name.module_name.clone(),
            file.name.tool_name.clone(),
            file.name.report_type.to_string(),
            file.name.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            files_present(file).to_string(),
        ]);
    }
    println!("{table}");
    println!("{} report(s) under {}", files.len(), manager.root().display());
    Ok(EXIT_OK)
}

fn clean_reports(
    report_type: Option<ReportType>,
    keep: Option<usize>,
    dry_run: bool,
    location: &ReportLocation,
) -> Result<i32> {
    let (manager, config) = manager_for(location);
    let keep = config.keep(keep);
    let mut summary = CleanupSummary::default();
    for report_type in selected_types(report_type) {
        summary.merge(manager.cleanup_all(report_type, keep, dry_run)?);
    }

    let verb = if dry_run { "Would delete" } else { "Deleted" };
    for path in &summary.deleted {
        println!("{} {}", verb.red(), path.display());
    }
    for path in &summary.protected {
        println!("{} {} (younger than the safety window)", "Kept".yellow(), path.display());
    }
    println!(
        "{} {} file(s), kept {} recent report(s) past the retention count",
        verb,
        summary.deleted.len(),
        summary.protected.len()
    );
    Ok(EXIT_OK)
}

fn print_name(path: &str) {
    let qualified = get_qualified_module_name(path);
    println!("{}", qualified.bold());
    if let Some(parsed) = parse_qualified_name(&qualified) {
        println!("  base name: {}", parsed.base_name);
        println!("  type:      {}", parsed.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selected_types() {
        assert_eq!(selected_types(None).len(), 4);
        assert_eq!(selected_types(Some(ReportType::Suite)), vec![ReportType::Suite]);
    }
}
