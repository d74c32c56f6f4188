use std::io::Read;

use serde::{Deserialize, Deserializer};

use super::domain::{KpiResult, Period, ReportMonth, ResultId, Semester};
use super::repository::{
    Directory, DirectoryError, KpiResultRecord, RepositoryError, ResultRepository,
};
use super::scoring;

/// Scoring-band defaults applied to rows the import creates.
#[derive(Debug, Clone, Copy)]
pub struct ImportDefaults {
    pub min: f64,
    pub max: f64,
}

impl Default for ImportDefaults {
    fn default() -> Self {
        Self {
            min: super::domain::DEFAULT_MIN,
            max: super::domain::DEFAULT_MAX,
        }
    }
}

/// Outcome counters for a bulk import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("row {row}: no employee with username '{username}'")]
    UnknownEmployee { row: usize, username: String },
    #[error("row {row}: no KPI named '{kpi}'")]
    UnknownKpi { row: usize, kpi: String },
    #[error("row {row}: unrecognized semester '{value}'")]
    BadSemester { row: usize, value: String },
    #[error("row {row}: unrecognized month '{value}'")]
    BadMonth { row: usize, value: String },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// One CSV line of the bulk import sheet. Weight, set target, and achievement
/// may be blank; period and reference columns are mandatory.
#[derive(Debug, Deserialize)]
struct ImportRow {
    year: i32,
    semester: String,
    employee: String,
    kpi: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    weight: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    target_set: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    achievement: Option<f64>,
    month: String,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .replace(',', "")
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn parse_semester(value: &str) -> Option<Semester> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1st sem" | "1" => Some(Semester::First),
        "2nd sem" | "2" => Some(Semester::Second),
        _ => None,
    }
}

/// Import result rows from CSV, upserting on (year, semester, employee, KPI,
/// month). New rows take the policy min/max defaults; existing rows keep
/// their bounds and entry fields and only refresh weight, set target, and any
/// imported achievement. Every touched row is renormalized and rescored
/// before it is persisted.
pub fn import_results<R, Repo, Dir>(
    reader: R,
    repository: &Repo,
    directory: &Dir,
    defaults: ImportDefaults,
) -> Result<ImportSummary, ImportError>
where
    R: Read,
    Repo: ResultRepository + ?Sized,
    Dir: Directory + ?Sized,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut summary = ImportSummary::default();

    for (index, parsed) in csv_reader.deserialize::<ImportRow>().enumerate() {
        let row_number = index + 2; // header occupies line 1
        let row = parsed?;

        let owner = directory
            .employee_by_username(&row.employee)?
            .ok_or_else(|| ImportError::UnknownEmployee {
                row: row_number,
                username: row.employee.clone(),
            })?;
        let kpi = directory
            .kpi_by_name(&row.kpi)?
            .ok_or_else(|| ImportError::UnknownKpi {
                row: row_number,
                kpi: row.kpi.clone(),
            })?;

        let semester = parse_semester(&row.semester).ok_or_else(|| ImportError::BadSemester {
            row: row_number,
            value: row.semester.clone(),
        })?;
        let month = ReportMonth::parse(&row.month).ok_or_else(|| ImportError::BadMonth {
            row: row_number,
            value: row.month.clone(),
        })?;

        let period = Period {
            year: row.year,
            semester,
            month,
        };

        match repository.find_by_key(period, &owner.username, &kpi.name)? {
            Some(mut record) => {
                record.result.weight = row.weight;
                record.result.target_set = row.target_set;
                if row.achievement.is_some() {
                    record.result.achievement = row.achievement;
                }
                record.kpi = kpi;
                scoring::recompute_on_save(&mut record.result, &record.kpi);
                repository.update(record)?;
                summary.updated += 1;
            }
            None => {
                let mut result = KpiResult::new(period);
                result.min = defaults.min;
                result.max = defaults.max;
                result.weight = row.weight;
                result.target_set = row.target_set;
                result.achievement = row.achievement;
                scoring::recompute_on_save(&mut result, &kpi);

                let id = ResultId(format!(
                    "{}-{}-{}-{}-{}",
                    row.year,
                    semester.label().replace(' ', "_"),
                    month.label(),
                    owner.username,
                    kpi.name.to_ascii_lowercase().replace(' ', "-"),
                ));
                repository.insert(KpiResultRecord {
                    id,
                    result,
                    kpi,
                    owner,
                })?;
                summary.created += 1;
            }
        }
    }

    Ok(summary)
}
