// Entry point and high-level CLI flow.
//
// One invocation loads the sales sheet, normalizes every row, builds the
// dashboard view for the selected week and writes it out:
// - a detail table and group colors as CSV,
// - the weekly revenue series as a wide CSV for charting,
// - everything together as `dashboard.json`,
// with markdown previews printed to stdout.
mod error;
mod loader;
mod normalize;
mod output;
mod reports;
mod types;
mod util;

use chrono::Datelike;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use types::Dashboard;

#[derive(Parser, Debug)]
#[command(about = "Sales performance report: ranks, weekly revenue and group colors")]
struct Args {
    /// Source spreadsheet (xlsx, xlsm, xls, ods or csv).
    #[arg(long, default_value = "sales_data.xlsx")]
    input: String,

    /// Worksheet to read. Defaults to the first sheet.
    #[arg(long)]
    sheet: Option<String>,

    /// Only show records of this week in the detail table.
    #[arg(long, conflicts_with = "current_week")]
    week: Option<i32>,

    /// Filter the detail table by the current calendar week.
    #[arg(long)]
    current_week: bool,

    /// Directory for the generated files.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Rows shown in each console preview.
    #[arg(long, default_value_t = 10)]
    preview_rows: usize,

    /// Print the selectable weeks of the current year and exit.
    #[arg(long)]
    list_weeks: bool,

    /// Log filter, e.g. `debug` or `sales_report=trace`. Falls back to RUST_LOG, then `info`.
    #[arg(long)]
    log_level: Option<String>,
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(l) => EnvFilter::new(l),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn selected_week(args: &Args) -> Option<i32> {
    if args.current_week {
        Some(util::current_week(chrono::Local::now().date_naive()))
    } else {
        args.week
    }
}

/// Write every output file. A failed write is reported and the rest still run.
fn write_outputs(dashboard: &Dashboard, out_dir: &std::path::Path) {
    if let Err(e) = std::fs::create_dir_all(out_dir) {
        error!(dir = %out_dir.display(), error = %e, "cannot create output directory");
        return;
    }

    let detail = reports::detail_rows(&dashboard.records, &dashboard.colors);
    let files: [(&str, Result<(), Box<dyn std::error::Error>>); 4] = [
        (
            "sales_detail.csv",
            output::write_csv(&out_dir.join("sales_detail.csv"), &detail),
        ),
        (
            "weekly_revenue.csv",
            output::write_series_csv(
                &out_dir.join("weekly_revenue.csv"),
                &dashboard.series,
                &dashboard.colors,
            ),
        ),
        (
            "group_colors.csv",
            output::write_csv(
                &out_dir.join("group_colors.csv"),
                &reports::color_rows(&dashboard.colors),
            ),
        ),
        (
            "dashboard.json",
            output::write_json(&out_dir.join("dashboard.json"), dashboard),
        ),
    ];
    for (name, result) in files {
        match result {
            Ok(()) => info!(file = name, "written"),
            Err(e) => error!(file = name, error = %e, "write failed"),
        }
    }
}

fn print_dashboard(dashboard: &Dashboard, preview_rows: usize) {
    let summary = &dashboard.summary;
    match summary.selected_week {
        Some(w) => {
            let year = chrono::Local::now().date_naive().year();
            println!("Sales and margin analysis: {}\n", util::week_label(year, w));
        }
        None => println!("Sales and margin analysis: all weeks\n"),
    }

    println!("Detailed analysis by group\n");
    output::preview_table_rows(
        &reports::detail_rows(&dashboard.records, &dashboard.colors),
        preview_rows,
    );

    println!(
        "Revenue by week ({} weeks, {} groups)\n",
        summary.distinct_weeks, summary.distinct_groups
    );
    if dashboard.colors.is_empty() {
        println!("(no groups)\n");
    } else {
        output::preview_table_rows(&reports::color_rows(&dashboard.colors), preview_rows);
    }

    println!("Awards\n");
    output::preview_table_rows(&reports::rank_legend(), 3);

    println!(
        "Summary: {} of {} records in view, revenue {}",
        util::format_int(summary.records_in_view as u64),
        util::format_int(summary.total_records as u64),
        util::format_rub(summary.revenue_in_view)
    );
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    if args.list_weeks {
        let year = chrono::Local::now().date_naive().year();
        for (_, label) in util::week_options(year) {
            println!("{}", label);
        }
        return ExitCode::SUCCESS;
    }

    let week = selected_week(&args);
    let (records, load_report) = match loader::load_and_normalize(&args.input, args.sheet.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!(error = %e, "load failed");
            eprintln!("Error: {}", e.user_message());
            return ExitCode::FAILURE;
        }
    };

    println!(
        "Processing dataset... ({} rows loaded from {})",
        util::format_int(load_report.total_rows as u64),
        load_report.sheet.as_deref().unwrap_or(&args.input)
    );
    if !load_report.ignored_columns.is_empty() {
        println!("Ignored columns: {}", load_report.ignored_columns.join(", "));
    }
    if load_report.missing_group > 0 {
        println!(
            "Note: {} rows have no group name.",
            util::format_int(load_report.missing_group as u64)
        );
    }
    if load_report.parse_errors > 0 {
        println!(
            "Note: {} rows skipped due to parse errors.",
            util::format_int(load_report.parse_errors as u64)
        );
    }
    if load_report.missing_week > 0 {
        println!(
            "Note: {} rows have no week and are left out of the chart.",
            util::format_int(load_report.missing_week as u64)
        );
    }
    println!();

    let dashboard = reports::build_dashboard(records, week);
    print_dashboard(&dashboard, args.preview_rows);
    write_outputs(&dashboard, &args.out_dir);
    ExitCode::SUCCESS
}
