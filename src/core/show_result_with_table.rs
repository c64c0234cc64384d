use prettytable::{format, row, Cell, Row, Table};
use serde_json::json;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::core::result_aggregator::FAILURE_SAMPLE_LIMIT;
use crate::models::result::{Diagnosis, RunSummary};
use crate::models::run_config::RunConfig;

// [HH:MM:SS]，取不到本地时区时用UTC
pub fn now_hms() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_default()
}

pub fn print_run_header(config: &RunConfig) {
    let ts = now_hms();
    println!("[{ts}] url={}", config.url);
    println!(
        "[{ts}] model={} concurrency={} rounds={} abort_ratio={}",
        config.model, config.concurrency, config.rounds, config.abort_ratio
    );
    println!(
        "[{ts}] abort_window={}s..{}s timeout={}s max_tokens={}",
        config.abort_min_secs, config.abort_max_secs, config.timeout_secs, config.max_tokens
    );
    if let Some(dir) = &config.out_dir {
        println!("[{ts}] saving raw responses to {}", dir.display());
    }
    println!();
}

pub fn hint_lines(diagnosis: Diagnosis) -> &'static [&'static str] {
    match diagnosis {
        Diagnosis::Clean => &[],
        Diagnosis::ExpectedDisruption => &[
            "Failures are mostly timeouts or connection resets around client aborts, that's expected.",
        ],
        Diagnosis::ServerDown => &[
            "Widespread connection refused / cannot connect: the server has likely crashed.",
        ],
    }
}

pub fn show_result_with_table(summary: &RunSummary) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);

    table.add_row(row!["metric", "value"]);
    table.add_row(row!["total", summary.total]);
    table.add_row(row!["ok", summary.ok]);
    table.add_row(row!["failed", summary.failed]);
    table.add_row(row!["aborted", summary.aborted]);
    table.add_row(row!["avg_bytes", format!("{:.1}", summary.avg_bytes)]);
    table.add_row(row!["avg_dur_s", format!("{:.3}", summary.avg_duration_secs)]);
    table.add_row(row!["min_dur_s", format!("{:.3}", summary.min_duration_secs)]);
    table.add_row(row!["max_dur_s", format!("{:.3}", summary.max_duration_secs)]);
    table.add_row(row!["p50_dur", format!("{} ms", summary.duration_ms.p50)]);
    table.add_row(row!["p95_dur", format!("{} ms", summary.duration_ms.p95)]);
    table.add_row(row!["p99_dur", format!("{} ms", summary.duration_ms.p99)]);
    table.add_row(row!["p50_ttfb", format!("{} ms", summary.ttfb_ms.p50)]);
    table.add_row(row!["elapsed_s", format!("{:.3}", summary.elapsed_secs)]);
    println!("===== Summary =====");
    table.printstd();

    if summary.failure_samples.is_empty() {
        return;
    }
    println!();
    println!("Failures (show up to {FAILURE_SAMPLE_LIMIT}):");
    for outcome in &summary.failure_samples {
        println!("  idx={} err={}", outcome.index, outcome.error_text);
    }

    let mut errors_table = Table::new();
    errors_table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    errors_table.add_row(row!["kind", "error", "count"]);
    for failure in &summary.failure_counts {
        errors_table.add_row(Row::new(vec![
            Cell::new(failure.kind.as_str()),
            Cell::new(&failure.message).style_spec("R"),
            Cell::new(&failure.count.to_string()),
        ]));
    }
    println!();
    println!("Errors:");
    errors_table.printstd();

    println!();
    for line in hint_lines(summary.diagnosis()) {
        println!("{line}");
    }
}

pub fn print_json(config: &RunConfig, summary: &RunSummary) -> anyhow::Result<()> {
    let report = json!({
        "config": config,
        "summary": summary,
        "diagnosis": summary.diagnosis(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
