use crate::cli::ReportLocation;
use crate::config::load_config;
use crate::errors::{AnalyzerError, EXIT_OK};
use crate::paths::get_qualified_module_name;
use crate::pipeline::validate_module_name;
use crate::progress::track;
use crate::reports::ReportManager;
use anyhow::Result;
use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

pub fn handle_progress(
    path: &str,
    module_name: Option<String>,
    target: f64,
    location: &ReportLocation,
) -> Result<i32> {
    if !(0.0..=100.0).contains(&target) {
        return Err(AnalyzerError::InvalidArgument(format!(
            "--target must be between 0 and 100, got {target}"
        ))
        .into());
    }
    let module = match module_name {
        Some(name) => validate_module_name(&name)?,
        None => get_qualified_module_name(path),
    };
    let config = load_config(&location.project_root);
    let manager = ReportManager::new(location.report_root(&config));

    let Some(summary) = track(&manager, &module, target)? else {
        println!(
            "No coverage reports for {} under {}. Run `test-analyzer coverage {}` first.",
            module.bold(),
            manager.root().display(),
            path
        );
        return Ok(EXIT_OK);
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Generated", "Coverage", "Change"]);
    let mut previous: Option<f64> = None;
    for sample in &summary.samples {
        let change = previous
            .map(|p| format!("{:+.1}", sample.percent - p))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            sample.generated_at.format("%Y-%m-%d %H:%M").to_string(),
            format!("{:.1}%", sample.percent),
            change,
        ]);
        previous = Some(sample.percent);
    }

    println!("Coverage history for {}\n", module.bold());
    println!("{table}");
    let progress = format!("{:.1}%", summary.progress_percent);
    let progress = if summary.progress_percent >= 100.0 {
        progress.green()
    } else if summary.delta() < 0.0 {
        progress.red()
    } else {
        progress.yellow()
    };
    println!(
        "\nProgress toward {:.1}%: {} ({:+.1} points since the first report)",
        summary.target_percent,
        progress,
        summary.delta()
    );
    match (summary.estimated_remaining_tests, summary.test_count) {
        (Some(0), _) => println!("Target reached."),
        (Some(remaining), Some(count)) => println!(
            "Roughly {} more test(s) needed at the current {:.2} points per test ({} tests today)",
            remaining.to_string().bold(),
            summary.current().map(|c| c.percent).unwrap_or_default() / count as f64,
            count
        ),
        _ => println!(
            "Run `test-analyzer tests {}` to estimate how many more tests are needed.",
            path
        ),
    }
    Ok(EXIT_OK)
}
