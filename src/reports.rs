// The aggregation pipeline: pure functions from the normalized record slice
// to the derived series the dashboard renders. Everything here is recomputed
// from scratch on each interaction; nothing holds state.
use crate::types::MeasurementRecord;
use crate::util::{mean, percent_delta, sum_present, MONTH_LABELS};
use std::collections::BTreeMap;

/// Years strictly before this one feed the forward estimate.
pub const ESTIMATE_CUTOFF_YEAR: i32 = 2025;

/// Fixed year set of the multi-year monthly comparison chart.
pub const COMPARISON_YEARS: [i32; 5] = [2020, 2021, 2022, 2023, 2024];

/// Which numeric field of a record an aggregation sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    MeasuredVolume,
    BilledVolume,
    Amount,
}

impl Metric {
    fn of(self, r: &MeasurementRecord) -> Option<f64> {
        match self {
            Metric::MeasuredVolume => r.measured_volume_m3,
            Metric::BilledVolume => r.billed_volume_m3,
            Metric::Amount => r.amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearTotals {
    pub volume_m3: Option<f64>,
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub volume_m3: Option<f64>,
    pub amount: Option<f64>,
}

/// One cell of a 12-month series. `value == None` means the month had no
/// contributing rows, which is not the same as a zero sum.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthValue {
    pub label: &'static str,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthVolumes {
    pub label: &'static str,
    pub measured_m3: Option<f64>,
    pub billed_m3: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearMonthCell {
    pub year: i32,
    pub label: &'static str,
    pub value: Option<f64>,
}

/// Selected-year headline metrics. The billed-vs-measured delta is `None`
/// whenever the measured total is zero or missing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearSummary {
    pub measured_volume_m3: Option<f64>,
    pub billed_volume_m3: Option<f64>,
    pub amount: Option<f64>,
    pub billed_delta_pct: Option<f64>,
}

/// Sorted distinct years present in the data, for the year selector.
pub fn distinct_years(records: &[MeasurementRecord]) -> Vec<i32> {
    let mut years: Vec<i32> = records.iter().filter_map(|r| r.year).collect();
    years.sort_unstable();
    years.dedup();
    years
}

/// Per-year totals of measured volume and amount. Undated records are
/// excluded; a year appears only if at least one record carries it.
pub fn yearly_totals(records: &[MeasurementRecord]) -> BTreeMap<i32, YearTotals> {
    let mut map: BTreeMap<i32, Vec<&MeasurementRecord>> = BTreeMap::new();
    for r in records {
        if let Some(year) = r.year {
            map.entry(year).or_default().push(r);
        }
    }
    map.into_iter()
        .map(|(year, rows)| {
            let totals = YearTotals {
                volume_m3: sum_present(rows.iter().map(|r| r.measured_volume_m3)),
                amount: sum_present(rows.iter().map(|r| r.amount)),
            };
            (year, totals)
        })
        .collect()
}

/// Forward estimate: the mean of the yearly totals across all years strictly
/// before the cutoff, per metric independently. With no qualifying years the
/// estimate is absent, never zero.
pub fn estimate(yearly: &BTreeMap<i32, YearTotals>, cutoff_year: i32) -> Estimate {
    let volumes: Vec<f64> = yearly
        .iter()
        .filter(|(year, _)| **year < cutoff_year)
        .filter_map(|(_, t)| t.volume_m3)
        .collect();
    let amounts: Vec<f64> = yearly
        .iter()
        .filter(|(year, _)| **year < cutoff_year)
        .filter_map(|(_, t)| t.amount)
        .collect();
    Estimate {
        volume_m3: mean(&volumes),
        amount: mean(&amounts),
    }
}

fn monthly_sums<F>(records: &[MeasurementRecord], year: i32, field: F) -> [Option<f64>; 12]
where
    F: Fn(&MeasurementRecord) -> Option<f64>,
{
    let mut out = [None; 12];
    for (idx, slot) in out.iter_mut().enumerate() {
        let month = idx as u32 + 1;
        *slot = sum_present(
            records
                .iter()
                .filter(|r| r.year == Some(year) && r.month == Some(month))
                .map(&field),
        );
    }
    out
}

/// Monthly totals of one metric for the given year, reindexed onto the full
/// Jan..Dez order: always 12 cells, empty months explicit.
pub fn monthly_totals_for_year(
    records: &[MeasurementRecord],
    year: i32,
    metric: Metric,
) -> Vec<MonthValue> {
    let sums = monthly_sums(records, year, |r| metric.of(r));
    MONTH_LABELS
        .iter()
        .copied()
        .zip(sums)
        .map(|(label, value)| MonthValue { label, value })
        .collect()
}

/// Measured vs billed volume for the given year, month by month in calendar
/// order.
pub fn monthly_volume_comparison(records: &[MeasurementRecord], year: i32) -> Vec<MonthVolumes> {
    let measured = monthly_sums(records, year, |r| r.measured_volume_m3);
    let billed = monthly_sums(records, year, |r| r.billed_volume_m3);
    MONTH_LABELS
        .iter()
        .copied()
        .zip(measured.into_iter().zip(billed))
        .map(|(label, (measured_m3, billed_m3))| MonthVolumes {
            label,
            measured_m3,
            billed_m3,
        })
        .collect()
}

/// Monthly totals of one metric for a fixed set of years, one cell per
/// (year, month), ordered year-major then calendar-month minor.
pub fn year_month_comparison(
    records: &[MeasurementRecord],
    years: &[i32],
    metric: Metric,
) -> Vec<YearMonthCell> {
    let mut years: Vec<i32> = years.to_vec();
    years.sort_unstable();
    years.dedup();
    let mut cells = Vec::with_capacity(years.len() * 12);
    for year in years {
        let sums = monthly_sums(records, year, |r| metric.of(r));
        for (label, value) in MONTH_LABELS.iter().copied().zip(sums) {
            cells.push(YearMonthCell { year, label, value });
        }
    }
    cells
}

/// Headline totals for the selected year, with the billed-vs-measured percent
/// delta guarded against a zero or missing measured total.
pub fn year_summary(records: &[MeasurementRecord], year: i32) -> YearSummary {
    let in_year = |r: &&MeasurementRecord| r.year == Some(year);
    let measured = sum_present(
        records
            .iter()
            .filter(in_year)
            .map(|r| r.measured_volume_m3),
    );
    let billed = sum_present(records.iter().filter(in_year).map(|r| r.billed_volume_m3));
    let amount = sum_present(records.iter().filter(in_year).map(|r| r.amount));
    YearSummary {
        measured_volume_m3: measured,
        billed_volume_m3: billed,
        amount,
        billed_delta_pct: percent_delta(billed, measured),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(date: &str, measured: f64, billed: f64, amount: f64) -> MeasurementRecord {
        MeasurementRecord::new(
            NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
            Some(measured),
            Some(billed),
            Some(amount),
        )
    }

    fn undated(measured: f64, amount: f64) -> MeasurementRecord {
        MeasurementRecord::new(None, Some(measured), None, Some(amount))
    }

    #[test]
    fn yearly_totals_match_per_record_sums() {
        let records = vec![
            rec("2022-01-10", 10.0, 11.0, 100.0),
            rec("2022-06-10", 20.0, 19.0, 200.0),
            rec("2023-02-01", 5.0, 5.0, 50.0),
            undated(999.0, 999.0),
        ];
        let totals = yearly_totals(&records);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[&2022].volume_m3, Some(30.0));
        assert_eq!(totals[&2022].amount, Some(300.0));
        assert_eq!(totals[&2023].volume_m3, Some(5.0));

        // The undated row is retained in the record set but grouped nowhere.
        assert_eq!(records.len(), 4);
        assert!(distinct_years(&records) == vec![2022, 2023]);
    }

    #[test]
    fn sums_ignore_missing_values_without_zeroing() {
        let records = vec![
            MeasurementRecord::new(
                NaiveDate::from_ymd_opt(2022, 1, 5),
                None,
                Some(3.0),
                Some(40.0),
            ),
            rec("2022-02-05", 7.0, 8.0, 60.0),
        ];
        let totals = yearly_totals(&records);
        assert_eq!(totals[&2022].volume_m3, Some(7.0));
        assert_eq!(totals[&2022].amount, Some(100.0));
    }

    #[test]
    fn estimate_is_mean_of_years_before_cutoff() {
        let mut yearly = BTreeMap::new();
        for (year, total) in [(2020, 100.0), (2021, 200.0), (2022, 300.0)] {
            yearly.insert(
                year,
                YearTotals {
                    volume_m3: Some(total),
                    amount: Some(total * 10.0),
                },
            );
        }
        let est = estimate(&yearly, 2023);
        assert_eq!(est.volume_m3, Some(200.0));
        assert_eq!(est.amount, Some(2000.0));

        // No qualifying years: absent, not zero.
        let empty = estimate(&yearly, 2020);
        assert_eq!(empty.volume_m3, None);
        assert_eq!(empty.amount, None);
    }

    #[test]
    fn monthly_totals_cover_all_twelve_months() {
        let records = vec![
            rec("2023-03-15", 10.0, 10.0, 120.0),
            rec("2023-03-20", 2.0, 2.0, 30.0),
            rec("2023-07-01", 4.0, 4.0, 45.0),
            rec("2022-03-01", 99.0, 99.0, 999.0),
        ];
        let series = monthly_totals_for_year(&records, 2023, Metric::Amount);
        assert_eq!(series.len(), 12);
        assert_eq!(series[2].label, "Mar");
        assert_eq!(series[2].value, Some(150.0));
        assert_eq!(series[6].label, "Jul");
        assert_eq!(series[6].value, Some(45.0));
        let empty_months = series.iter().filter(|c| c.value.is_none()).count();
        assert_eq!(empty_months, 10);
    }

    #[test]
    fn month_order_is_calendar_regardless_of_input_order() {
        let shuffled = vec![
            rec("2023-10-01", 1.0, 1.0, 1.0),
            rec("2023-02-01", 1.0, 1.0, 2.0),
            rec("2023-07-01", 1.0, 1.0, 3.0),
            rec("2023-01-01", 1.0, 1.0, 4.0),
        ];
        let series = monthly_totals_for_year(&shuffled, 2023, Metric::Amount);
        let labels: Vec<&str> = series.iter().map(|c| c.label).collect();
        assert_eq!(labels, MONTH_LABELS);
        assert_eq!(series[0].value, Some(4.0)); // Jan
        assert_eq!(series[9].value, Some(1.0)); // Out
    }

    #[test]
    fn volume_comparison_pairs_measured_and_billed() {
        let records = vec![
            rec("2024-05-10", 12.0, 13.0, 90.0),
            rec("2024-05-25", 3.0, 3.0, 20.0),
        ];
        let series = monthly_volume_comparison(&records, 2024);
        assert_eq!(series.len(), 12);
        assert_eq!(series[4].label, "Mai");
        assert_eq!(series[4].measured_m3, Some(15.0));
        assert_eq!(series[4].billed_m3, Some(16.0));
        assert_eq!(series[0].measured_m3, None);
    }

    #[test]
    fn year_month_comparison_is_year_major_month_minor() {
        let records = vec![
            rec("2021-04-01", 1.0, 1.0, 10.0),
            rec("2022-11-01", 1.0, 1.0, 20.0),
        ];
        let cells = year_month_comparison(&records, &[2022, 2021], Metric::Amount);
        assert_eq!(cells.len(), 24);
        assert_eq!(cells[0].year, 2021);
        assert_eq!(cells[0].label, "Jan");
        assert_eq!(cells[3].value, Some(10.0)); // 2021 Abr
        assert_eq!(cells[12].year, 2022);
        assert_eq!(cells[22].value, Some(20.0)); // 2022 Nov
        assert!(cells[1].value.is_none());
    }

    #[test]
    fn year_summary_guards_delta_denominator() {
        let records = vec![
            rec("2023-01-05", 10.0, 12.0, 100.0),
            rec("2023-02-05", 10.0, 10.0, 100.0),
        ];
        let summary = year_summary(&records, 2023);
        assert_eq!(summary.measured_volume_m3, Some(20.0));
        assert_eq!(summary.billed_volume_m3, Some(22.0));
        assert_eq!(summary.amount, Some(200.0));
        assert_eq!(summary.billed_delta_pct, Some(10.0));

        // A year with no measured volume yields no delta, not a fault.
        let no_measured = vec![MeasurementRecord::new(
            NaiveDate::from_ymd_opt(2024, 1, 5),
            None,
            Some(5.0),
            Some(50.0),
        )];
        let summary = year_summary(&no_measured, 2024);
        assert_eq!(summary.measured_volume_m3, None);
        assert_eq!(summary.billed_delta_pct, None);
    }
}
