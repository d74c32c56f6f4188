use serde::Serialize;

use super::domain::{Employee, KpiDefinition, KpiResult, ResultId};

/// Render a fraction as a percentage with one decimal, e.g. `0.8` -> `80.0%`.
pub fn percent_1(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Percentage with three decimals and thousands grouping, e.g. `12.5` ->
/// `1,250.000%`.
pub fn percent_3(value: f64) -> String {
    format!("{}%", group_thousands(&format!("{:.3}", value * 100.0)))
}

/// Percentage with two decimals and thousands grouping, the total-score line.
pub fn percent_2(value: f64) -> String {
    format!("{}%", group_thousands(&format!("{:.2}", value * 100.0)))
}

/// Raw number with four decimals and thousands grouping.
pub fn plain_4(value: f64) -> String {
    group_thousands(&format!("{:.4}", value))
}

fn group_thousands(formatted: &str) -> String {
    let (number, fraction) = match formatted.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (formatted, None),
    };
    let (sign, digits) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };

    let mut grouped = String::with_capacity(formatted.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Row view with every number preformatted the way the entry grid renders it.
///
/// The percent-vs-plain branching below is deliberate and ordered: a zero set
/// target always renders plain (a percentage of nothing is meaningless), the
/// explicit display flag wins next, percentage-calculated KPIs render as
/// percentages, and non-percentage KPIs still render as percentages when the
/// set target is itself a fraction below one.
#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    pub id: ResultId,
    pub kpi_name: String,
    pub employee_name: String,
    pub year: i32,
    pub semester: &'static str,
    pub month: &'static str,
    pub kpi_type: &'static str,
    pub display_weight: String,
    pub display_min: String,
    pub display_target_set: String,
    pub display_max: String,
    pub display_target_input: String,
    pub display_achievement: String,
    pub display_factor: String,
    pub display_final_result: String,
    pub form_value_target_input: String,
    pub form_value_achievement: String,
    pub is_locked: bool,
    pub active: bool,
}

pub fn result_view(
    id: &ResultId,
    result: &KpiResult,
    kpi: &KpiDefinition,
    owner: &Employee,
) -> ResultView {
    let target_set_is_zero = result.target_set == Some(0.0);
    let fractional_target = result.target_set.map(|ts| ts < 1.0).unwrap_or(false);

    let display_target_set = match result.target_set {
        None => String::new(),
        Some(ts) if ts == 0.0 => plain_4(ts),
        Some(ts) => {
            if kpi.force_percent_display
                || kpi.uses_percentage_calculation
                || ts < 1.0
            {
                percent_3(ts)
            } else {
                plain_4(ts)
            }
        }
    };

    let entry_display = |value: Option<f64>| -> String {
        match value {
            None => String::new(),
            Some(v) if target_set_is_zero => plain_4(v),
            Some(v) => {
                if kpi.force_percent_display
                    || kpi.uses_percentage_calculation
                    || (!kpi.uses_percentage_calculation && fractional_target)
                {
                    percent_3(v)
                } else {
                    plain_4(v)
                }
            }
        }
    };

    let display_factor = match (result.final_result, result.weight) {
        (Some(final_result), Some(weight)) if weight != 0.0 => {
            percent_1(final_result / weight)
        }
        _ => String::new(),
    };

    ResultView {
        id: id.clone(),
        kpi_name: kpi.name.clone(),
        employee_name: owner.name.clone(),
        year: result.period.year,
        semester: result.period.semester.label(),
        month: result.period.month.label(),
        kpi_type: kpi.kpi_type.label(),
        display_weight: result.weight.map(percent_1).unwrap_or_default(),
        display_min: format!("{:.1}", result.min),
        display_target_set,
        display_max: format!("{:.1}", result.max),
        display_target_input: entry_display(result.target_input),
        display_achievement: entry_display(result.achievement),
        display_factor,
        display_final_result: result.final_result.map(percent_1).unwrap_or_default(),
        form_value_target_input: result.target_input.map(plain_4).unwrap_or_default(),
        form_value_achievement: result.achievement.map(plain_4).unwrap_or_default(),
        is_locked: result.is_locked,
        active: result.active,
    }
}
