// Entry point and high-level console flow.
//
// Mirrors the original dashboard's interaction model without its UI layer:
// - Option [1] loads and normalizes the consumption CSV, printing diagnostics.
// - Option [2] renders the dashboard for a selected year: estimate metrics,
//   yearly trends, selected-year metrics, monthly tables and the multi-year
//   comparison, and exports each aggregate as CSV/JSON.
// - Re-running option [2] with another year recomputes every aggregate from
//   the cached record set.
mod loader;
mod output;
mod reports;
mod types;
mod util;

use once_cell::sync::Lazy;
use reports::{Metric, COMPARISON_YEARS, ESTIMATE_CUTOFF_YEAR};
use std::io::{self, Write};
use std::sync::Mutex;
use types::{
    MeasurementRecord, MonthlyAmountRow, RecordRow, SummaryStats, VolumeComparisonRow,
    YearMonthRow, YearlyRow,
};

const INPUT_FILE: &str = "consolidado_agua.csv";

// Simple in-memory app state so the CSV is loaded/normalized once but the
// dashboard can be regenerated for different years in a single run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { data: None }));

struct AppState {
    data: Option<Vec<MeasurementRecord>>,
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask the user whether to go back to the menu after rendering the dashboard.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to menu (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        let resp = buf.trim().to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: load and normalize the consumption CSV.
///
/// On success the `Vec<MeasurementRecord>` is cached in `APP_STATE` and a
/// short textual summary of the load is printed.
fn handle_load() {
    match loader::load_from_path(INPUT_FILE) {
        Ok((data, report)) => {
            println!(
                "Processing dataset... ({} rows loaded, {} with a valid measurement date)",
                util::format_int(report.total_rows as i64),
                util::format_int(report.dated_rows as i64)
            );
            if report.bad_dates > 0 {
                println!(
                    "Note: {} rows have an unparseable date and are excluded from calendar groupings.",
                    util::format_int(report.bad_dates as i64)
                );
            }
            if report.bad_values > 0 {
                println!(
                    "Note: {} numeric cells could not be parsed and are treated as missing.",
                    util::format_int(report.bad_values as i64)
                );
            }
            println!();
            let mut state = APP_STATE.lock().unwrap();
            state.data = Some(data);
        }
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

fn yearly_rows(yearly: &std::collections::BTreeMap<i32, reports::YearTotals>) -> Vec<YearlyRow> {
    yearly
        .iter()
        .map(|(year, t)| YearlyRow {
            year: *year,
            volume_m3: util::format_opt(t.volume_m3, 0),
            amount: util::format_opt(t.amount, 2),
        })
        .collect()
}

fn monthly_amount_rows(series: &[reports::MonthValue]) -> Vec<MonthlyAmountRow> {
    series
        .iter()
        .map(|c| MonthlyAmountRow {
            month: c.label,
            amount: util::format_opt(c.value, 2),
        })
        .collect()
}

fn volume_comparison_rows(series: &[reports::MonthVolumes]) -> Vec<VolumeComparisonRow> {
    series
        .iter()
        .map(|c| VolumeComparisonRow {
            month: c.label,
            measured_m3: util::format_opt(c.measured_m3, 0),
            billed_m3: util::format_opt(c.billed_m3, 0),
        })
        .collect()
}

fn year_month_rows(cells: &[reports::YearMonthCell]) -> Vec<YearMonthRow> {
    cells
        .iter()
        .map(|c| YearMonthRow {
            year: c.year,
            month: c.label,
            amount: util::format_opt(c.value, 2),
        })
        .collect()
}

/// Prompt for one year out of the distinct set present in the data.
fn prompt_year(years: &[i32]) -> i32 {
    loop {
        let listed: Vec<String> = years.iter().map(|y| y.to_string()).collect();
        println!("Available years: {}", listed.join(", "));
        print!("Select the year: ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        if let Ok(year) = buf.trim().parse::<i32>() {
            if years.contains(&year) {
                return year;
            }
        }
        println!("Invalid choice. Please enter one of the listed years.");
    }
}

/// Handle option [2]: recompute every aggregate from the cached records for
/// the chosen year and render/export the dashboard.
///
/// This function is intentionally side-effectful:
/// - writes the aggregate CSV exports and `summary.json`,
/// - and prints Markdown previews of each table to the console.
fn handle_dashboard() {
    let data = {
        let state = APP_STATE.lock().unwrap();
        state.data.clone()
    };
    let Some(data) = data else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };

    let years = reports::distinct_years(&data);
    if years.is_empty() {
        println!("Error: No rows with a valid measurement date; nothing to report.\n");
        return;
    }
    let selected_year = prompt_year(&years);
    println!();

    println!("Generating dashboard for {}...", selected_year);
    println!("Outputs saved to individual files...\n");

    // Forward estimate from the years before the cutoff.
    let yearly = reports::yearly_totals(&data);
    let estimate = reports::estimate(&yearly, ESTIMATE_CUTOFF_YEAR);
    println!("Estimate {}:", ESTIMATE_CUTOFF_YEAR);
    println!(
        "  Estimated consumption: {} m³",
        util::format_opt(estimate.volume_m3, 0)
    );
    println!(
        "  Estimated amount:      R$ {}\n",
        util::format_opt(estimate.amount, 2)
    );

    let trend = yearly_rows(&yearly);
    let trend_file = "consumo_valor_por_ano.csv";
    if let Err(e) = output::write_csv(trend_file, &trend) {
        eprintln!("Write error: {}", e);
    }
    println!("Yearly Trend: Consumption and Amount per Year\n");
    output::preview_table_rows(&trend, trend.len());
    println!("(Full table exported to {})\n", trend_file);

    // Selected-year headline metrics, with the billed-vs-measured delta
    // suppressed when the measured total is zero or missing.
    let summary = reports::year_summary(&data, selected_year);
    println!("Metrics for {}:", selected_year);
    println!(
        "  Measured volume: {} m³",
        util::format_opt(summary.measured_volume_m3, 0)
    );
    match summary.billed_delta_pct {
        Some(delta) => println!(
            "  Billed volume:   {} m³ ({}% vs measured)",
            util::format_opt(summary.billed_volume_m3, 0),
            util::format_number(delta, 2)
        ),
        None => println!(
            "  Billed volume:   {} m³ (delta unavailable)",
            util::format_opt(summary.billed_volume_m3, 0)
        ),
    }
    println!(
        "  Total amount:    R$ {}\n",
        util::format_opt(summary.amount, 2)
    );

    let monthly = reports::monthly_totals_for_year(&data, selected_year, Metric::Amount);
    let monthly_rows = monthly_amount_rows(&monthly);
    let monthly_file = "valor_mensal.csv";
    if let Err(e) = output::write_csv(monthly_file, &monthly_rows) {
        eprintln!("Write error: {}", e);
    }
    println!("Monthly Amount - {}\n", selected_year);
    output::preview_table_rows(&monthly_rows, monthly_rows.len());
    println!("(Full table exported to {})\n", monthly_file);

    let comparison = reports::monthly_volume_comparison(&data, selected_year);
    let comparison_rows = volume_comparison_rows(&comparison);
    let comparison_file = "medido_vs_faturado.csv";
    if let Err(e) = output::write_csv(comparison_file, &comparison_rows) {
        eprintln!("Write error: {}", e);
    }
    println!("Measured vs Billed Volume - {}\n", selected_year);
    output::preview_table_rows(&comparison_rows, comparison_rows.len());
    println!("(Full table exported to {})\n", comparison_file);

    let multi_year = reports::year_month_comparison(&data, &COMPARISON_YEARS, Metric::Amount);
    let multi_year_rows = year_month_rows(&multi_year);
    let multi_year_file = "comparativo_valor_anos.csv";
    if let Err(e) = output::write_csv(multi_year_file, &multi_year_rows) {
        eprintln!("Write error: {}", e);
    }
    println!(
        "Monthly Amount Comparison - {} to {}\n",
        COMPARISON_YEARS[0],
        COMPARISON_YEARS[COMPARISON_YEARS.len() - 1]
    );
    output::preview_table_rows(&multi_year_rows, 12);
    println!("(Full table exported to {})\n", multi_year_file);

    // Full normalized listing, undated rows included.
    let listing: Vec<RecordRow> = data.iter().map(RecordRow::from).collect();
    let listing_file = "registros_normalizados.csv";
    if let Err(e) = output::write_csv(listing_file, &listing) {
        eprintln!("Write error: {}", e);
    }
    println!(
        "(Normalized record listing exported to {})\n",
        listing_file
    );

    let stats = SummaryStats {
        selected_year,
        measured_volume_m3: summary.measured_volume_m3,
        billed_volume_m3: summary.billed_volume_m3,
        billed_delta_pct: summary.billed_delta_pct,
        total_amount: summary.amount,
        estimated_volume_m3: estimate.volume_m3,
        estimated_amount: estimate.amount,
    };
    if let Err(e) = output::write_json("summary.json", &stats) {
        eprintln!("Write error: {}", e);
    }
    println!("Summary stats written to summary.json\n");
}

fn main() {
    loop {
        println!("Water Consumption Report");
        println!("[1] Load the file");
        println!("[2] Show dashboard\n");
        match read_choice().as_str() {
            "1" => {
                handle_load();
            }
            "2" => {
                println!();
                handle_dashboard();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
}
