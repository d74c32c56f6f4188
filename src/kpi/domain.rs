use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for persisted KPI result rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultId(pub String);

/// Semantics of a KPI's ratio: which direction counts as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KpiType {
    /// Ratio is achievement over target; more is better.
    BiggerIsBetter,
    /// Ratio is target over achievement; less is better.
    SmallerIsBetter,
    /// Incident counter; zero mistakes earns the max ratio outright.
    MistakeCount,
}

impl KpiType {
    pub const fn label(self) -> &'static str {
        match self {
            KpiType::BiggerIsBetter => "bigger_is_better",
            KpiType::SmallerIsBetter => "smaller_is_better",
            KpiType::MistakeCount => "mistake_count",
        }
    }
}

/// Per-period KPI configuration. Every flag is always present so the scoring
/// and display branches never have to probe for missing attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiDefinition {
    pub name: String,
    pub kpi_type: KpiType,
    /// Achievement is fed by an upstream system and read-only to end users.
    pub from_external_system: bool,
    /// The working target is recalculated as a percentage of the set target.
    pub uses_percentage_calculation: bool,
    /// Penalty KPI: any recorded achievement means instant failure.
    pub treat_any_achievement_as_zero_score: bool,
    /// Render values as percentages regardless of the calculation mode.
    pub force_percent_display: bool,
    pub active: bool,
}

impl KpiDefinition {
    pub fn new(name: impl Into<String>, kpi_type: KpiType) -> Self {
        Self {
            name: name.into(),
            kpi_type,
            from_external_system: false,
            uses_percentage_calculation: false,
            treat_any_achievement_as_zero_score: false,
            force_percent_display: false,
            active: true,
        }
    }
}

/// Half-year reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Semester {
    First,
    Second,
}

impl Semester {
    pub const fn label(self) -> &'static str {
        match self {
            Semester::First => "1st SEM",
            Semester::Second => "2nd SEM",
        }
    }
}

/// Reporting slot inside a semester, ending in the consolidated final entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReportMonth {
    M1,
    M2,
    M3,
    M4,
    M5,
    Final,
}

impl ReportMonth {
    pub const fn label(self) -> &'static str {
        match self {
            ReportMonth::M1 => "1st",
            ReportMonth::M2 => "2nd",
            ReportMonth::M3 => "3rd",
            ReportMonth::M4 => "4th",
            ReportMonth::M5 => "5th",
            ReportMonth::Final => "final",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1st" => Some(ReportMonth::M1),
            "2nd" => Some(ReportMonth::M2),
            "3rd" => Some(ReportMonth::M3),
            "4th" => Some(ReportMonth::M4),
            "5th" => Some(ReportMonth::M5),
            "final" => Some(ReportMonth::Final),
            _ => None,
        }
    }
}

/// The (year, semester, month) coordinate a result row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub semester: Semester,
    pub month: ReportMonth,
}

/// Department with the group label that backs group-manager scoping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub name: String,
    pub group: String,
}

/// Employee record resolved from the directory.
///
/// Level 0 is a group manager, level 1 a department manager, and level 2 and
/// above are individual contributors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub username: String,
    pub name: String,
    pub department: Department,
    pub level: u8,
    pub active: bool,
}

pub const GROUP_MANAGER_LEVEL: u8 = 0;
pub const DEPT_MANAGER_LEVEL: u8 = 1;

/// One KPI result row: the raw numbers entered over a period plus the derived
/// weighted score.
///
/// `final_result` is never written directly; it is recomputed from the other
/// fields on every save. Unset numeric fields read as zero during scoring,
/// except the `target_input`/`achievement` pair whose absence short-circuits
/// the whole computation to a zero score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiResult {
    pub period: Period,
    pub weight: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub target_set: Option<f64>,
    pub target_input: Option<f64>,
    pub achievement: Option<f64>,
    pub final_result: Option<f64>,
    pub is_locked: bool,
    pub locked_at: Option<NaiveDate>,
    pub active: bool,
}

pub const DEFAULT_MIN: f64 = 0.4;
pub const DEFAULT_MAX: f64 = 1.4;

impl KpiResult {
    pub fn new(period: Period) -> Self {
        Self {
            period,
            weight: None,
            min: DEFAULT_MIN,
            max: DEFAULT_MAX,
            target_set: None,
            target_input: None,
            achievement: None,
            final_result: None,
            is_locked: false,
            locked_at: None,
            active: true,
        }
    }
}
