use crate::util::month_label;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tabled::Tabled;

/// One normalized billing measurement. Immutable after load; every aggregate
/// is recomputed from a slice of these.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub measured_at: Option<NaiveDate>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub month_label: Option<&'static str>,
    pub measured_volume_m3: Option<f64>,
    pub billed_volume_m3: Option<f64>,
    pub amount: Option<f64>,
}

impl MeasurementRecord {
    /// Build a record from parsed fields, deriving the calendar columns from
    /// the date. A record without a date keeps its numeric fields but carries
    /// no year/month, so it never lands in a calendar grouping.
    pub fn new(
        measured_at: Option<NaiveDate>,
        measured_volume_m3: Option<f64>,
        billed_volume_m3: Option<f64>,
        amount: Option<f64>,
    ) -> Self {
        let year = measured_at.map(|d| d.year());
        let month = measured_at.map(|d| d.month());
        let month_label = month.and_then(month_label);
        MeasurementRecord {
            measured_at,
            year,
            month,
            month_label,
            measured_volume_m3,
            billed_volume_m3,
            amount,
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct YearlyRow {
    #[serde(rename = "Ano")]
    #[tabled(rename = "Ano")]
    pub year: i32,
    #[serde(rename = "VolumeMedido_m3")]
    #[tabled(rename = "Volume Medido (m³)")]
    pub volume_m3: String,
    #[serde(rename = "Valor")]
    #[tabled(rename = "Valor (R$)")]
    pub amount: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MonthlyAmountRow {
    #[serde(rename = "Mes")]
    #[tabled(rename = "Mês")]
    pub month: &'static str,
    #[serde(rename = "Valor")]
    #[tabled(rename = "Valor (R$)")]
    pub amount: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct VolumeComparisonRow {
    #[serde(rename = "Mes")]
    #[tabled(rename = "Mês")]
    pub month: &'static str,
    #[serde(rename = "VolumeMedido_m3")]
    #[tabled(rename = "Medido (m³)")]
    pub measured_m3: String,
    #[serde(rename = "VolumeFaturado_m3")]
    #[tabled(rename = "Faturado (m³)")]
    pub billed_m3: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct YearMonthRow {
    #[serde(rename = "Ano")]
    #[tabled(rename = "Ano")]
    pub year: i32,
    #[serde(rename = "Mes")]
    #[tabled(rename = "Mês")]
    pub month: &'static str,
    #[serde(rename = "Valor")]
    #[tabled(rename = "Valor (R$)")]
    pub amount: String,
}

/// Full-listing export row, one per normalized record (undated rows included).
#[derive(Debug, Serialize, Clone)]
pub struct RecordRow {
    #[serde(rename = "Medicao")]
    pub measured_at: Option<NaiveDate>,
    #[serde(rename = "Ano")]
    pub year: Option<i32>,
    #[serde(rename = "Mes")]
    pub month: Option<&'static str>,
    #[serde(rename = "VolumeMedido_m3")]
    pub measured_volume_m3: Option<f64>,
    #[serde(rename = "VolumeFaturado_m3")]
    pub billed_volume_m3: Option<f64>,
    #[serde(rename = "Valor")]
    pub amount: Option<f64>,
}

impl From<&MeasurementRecord> for RecordRow {
    fn from(r: &MeasurementRecord) -> Self {
        RecordRow {
            measured_at: r.measured_at,
            year: r.year,
            month: r.month_label,
            measured_volume_m3: r.measured_volume_m3,
            billed_volume_m3: r.billed_volume_m3,
            amount: r.amount,
        }
    }
}

/// Headline numbers written to `summary.json` after each dashboard run.
#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub selected_year: i32,
    pub measured_volume_m3: Option<f64>,
    pub billed_volume_m3: Option<f64>,
    pub billed_delta_pct: Option<f64>,
    pub total_amount: Option<f64>,
    pub estimated_volume_m3: Option<f64>,
    pub estimated_amount: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_fields_derive_from_date() {
        let d = NaiveDate::from_ymd_opt(2023, 12, 5);
        let r = MeasurementRecord::new(d, Some(10.0), Some(11.0), Some(80.5));
        assert_eq!(r.year, Some(2023));
        assert_eq!(r.month, Some(12));
        assert_eq!(r.month_label, Some("Dez"));
    }

    #[test]
    fn undated_record_has_no_calendar_fields() {
        let r = MeasurementRecord::new(None, Some(10.0), None, Some(80.5));
        assert_eq!(r.year, None);
        assert_eq!(r.month, None);
        assert_eq!(r.month_label, None);
        assert_eq!(r.measured_volume_m3, Some(10.0));
    }

    #[test]
    fn calendar_derivation_is_idempotent() {
        let d = NaiveDate::from_ymd_opt(2022, 3, 1);
        let once = MeasurementRecord::new(d, Some(1.0), Some(2.0), Some(3.0));
        let twice = MeasurementRecord::new(
            once.measured_at,
            once.measured_volume_m3,
            once.billed_volume_m3,
            once.amount,
        );
        assert_eq!(once, twice);
    }
}
