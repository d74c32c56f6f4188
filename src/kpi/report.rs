use std::collections::BTreeMap;

use serde::Serialize;

use super::display::{percent_1, ResultView};
use super::domain::ReportMonth;
use super::repository::KpiResultRecord;

/// Scores above this fraction are flagged as suspiciously high.
const ANOMALY_UPPER: f64 = 1.2;
/// Scores below this fraction are flagged as likely data-entry gaps.
const ANOMALY_LOWER: f64 = 0.4;
const ANOMALY_LIMIT: usize = 10;

/// Personal dashboard aggregates for one employee's records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_kpis: usize,
    pub approved: usize,
    pub pending: usize,
    pub completion_rate: u32,
    pub monthly_averages: Vec<MonthlyAverage>,
}

/// Average final result per reporting month, the dashboard chart series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyAverage {
    pub month: &'static str,
    pub average: f64,
}

impl DashboardStats {
    pub fn from_records(records: &[KpiResultRecord]) -> Self {
        let total_kpis = records.len();
        let approved = records
            .iter()
            .filter(|record| record.result.is_locked)
            .count();
        let completion_rate = if total_kpis > 0 {
            (approved * 100 / total_kpis) as u32
        } else {
            0
        };

        let mut buckets: BTreeMap<ReportMonth, (f64, usize)> = BTreeMap::new();
        for record in records {
            let entry = buckets.entry(record.result.period.month).or_insert((0.0, 0));
            entry.0 += record.result.final_result.unwrap_or(0.0);
            entry.1 += 1;
        }

        let monthly_averages = buckets
            .into_iter()
            .map(|(month, (sum, count))| MonthlyAverage {
                month: month.label(),
                average: round_2(sum / count as f64),
            })
            .collect();

        Self {
            total_kpis,
            approved,
            pending: total_kpis - approved,
            completion_rate,
            monthly_averages,
        }
    }
}

/// Manager command-center aggregates over a team's records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSummary {
    pub total_staff: usize,
    /// Employees whose every record in the slice is locked.
    pub done: usize,
    pub pending: usize,
    pub average_score: String,
    pub completion_rate: f64,
}

impl TeamSummary {
    pub fn from_records(records: &[KpiResultRecord], total_staff: usize) -> Self {
        let mut per_employee: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for record in records {
            let entry = per_employee
                .entry(record.owner.username.as_str())
                .or_insert((0, 0));
            entry.0 += 1;
            if record.result.is_locked {
                entry.1 += 1;
            }
        }

        let done = per_employee
            .values()
            .filter(|(total, locked)| *total > 0 && total == locked)
            .count();
        let pending = per_employee.len() - done;

        let average = if records.is_empty() {
            0.0
        } else {
            records
                .iter()
                .map(|record| record.result.final_result.unwrap_or(0.0))
                .sum::<f64>()
                / records.len() as f64
        };

        let completion_rate = if total_staff > 0 {
            round_1(done as f64 / total_staff as f64 * 100.0)
        } else {
            0.0
        };

        Self {
            total_staff,
            done,
            pending,
            average_score: percent_1(average),
            completion_rate,
        }
    }
}

/// Records whose final score sits outside the expected band, highest first,
/// capped for the dashboard panel.
pub fn anomalies(records: &[KpiResultRecord]) -> Vec<ResultView> {
    let mut flagged: Vec<&KpiResultRecord> = records
        .iter()
        .filter(|record| {
            record
                .result
                .final_result
                .map(|score| score > ANOMALY_UPPER || score < ANOMALY_LOWER)
                .unwrap_or(false)
        })
        .collect();

    flagged.sort_by(|a, b| {
        let left = a.result.final_result.unwrap_or(0.0);
        let right = b.result.final_result.unwrap_or(0.0);
        right.partial_cmp(&left).unwrap_or(std::cmp::Ordering::Equal)
    });

    flagged
        .into_iter()
        .take(ANOMALY_LIMIT)
        .map(KpiResultRecord::view)
        .collect()
}

fn round_1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round_2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
