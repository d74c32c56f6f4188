use super::domain::{KpiDefinition, KpiResult, KpiType};

/// Compute the weighted final score for a result row.
///
/// Pure function of the row and its KPI configuration. Every potential
/// division by zero is a defined branch yielding `0.0`, so there is no error
/// path: a missing or zero denominator is domain behavior (no score yet), not
/// an exceptional state.
///
/// Branch order matters and must not be rearranged:
/// 1. unset working target or achievement is a defined zero-score state;
/// 2. penalty KPIs short-circuit before any ratio math and skip the clamp;
/// 3. mistake counters score against the set target;
/// 4. percentage KPIs first reduce achievement to a fraction of the working
///    target, then compare against the set target;
/// 5. everything else compares achievement and working target directly;
/// 6. the ratio from steps 3-5 is clamped: below `min` scores zero, above
///    `max` caps at `max * weight`.
pub fn compute_final_result(result: &KpiResult, kpi: &KpiDefinition) -> f64 {
    if result.target_input.is_none() || result.achievement.is_none() {
        return 0.0;
    }

    let achievement = result.achievement.unwrap_or(0.0);
    let target_set = result.target_set.unwrap_or(0.0);
    let target_input = result.target_input.unwrap_or(0.0);
    let weight = result.weight.unwrap_or(0.0);

    if kpi.treat_any_achievement_as_zero_score {
        if achievement > 0.0 {
            return 0.0;
        }
        return weight * result.max;
    }

    let ratio = if kpi.kpi_type == KpiType::MistakeCount {
        if achievement == 0.0 {
            result.max
        } else {
            // achievement != 0 here, but keep the zero guard symmetric with
            // the other ratio branches
            safe_div(target_set, achievement)
        }
    } else if kpi.uses_percentage_calculation {
        let achieved_ratio = safe_div(achievement, target_input);
        match kpi.kpi_type {
            KpiType::SmallerIsBetter => safe_div(target_set, achieved_ratio),
            _ => safe_div(achieved_ratio, target_set),
        }
    } else {
        match kpi.kpi_type {
            KpiType::SmallerIsBetter => safe_div(target_input, achievement),
            _ => safe_div(achievement, target_input),
        }
    };

    if ratio < result.min {
        return 0.0;
    }
    if ratio > result.max {
        return result.max * weight;
    }
    ratio * weight
}

fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Force the working target to mirror the set target for KPIs that do not use
/// percentage calculation. Runs unconditionally on every persist.
pub fn normalize_before_save(result: &mut KpiResult, kpi: &KpiDefinition) {
    if !kpi.uses_percentage_calculation {
        result.target_input = result.target_set;
    }
}

/// Save-time pipeline: normalize the working target, then rederive the final
/// result. Idempotent, so a concurrent last-write-wins persist is safe.
pub fn recompute_on_save(result: &mut KpiResult, kpi: &KpiDefinition) {
    normalize_before_save(result, kpi);
    result.final_result = Some(compute_final_result(result, kpi));
}
