use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::{
    Employee, KpiDefinition, KpiResult, DEPT_MANAGER_LEVEL, GROUP_MANAGER_LEVEL,
};

/// The actor behind a request, passed explicitly into every resolver call
/// instead of living in ambient request state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorContext {
    SuperAdmin,
    Staff(Employee),
    /// Authenticated user with no matching employee record.
    Unknown,
}

/// Role of an actor relative to one specific result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorRole {
    Owner,
    DeptManager,
    GroupManager,
    SuperAdmin,
    Other,
}

impl ActorRole {
    /// Managers and admins keep write access to locked rows and may apply or
    /// release the approval lock.
    pub fn is_reviewer(self) -> bool {
        matches!(
            self,
            ActorRole::DeptManager | ActorRole::GroupManager | ActorRole::SuperAdmin
        )
    }
}

impl ActorContext {
    /// Derive the actor's role for a row owned by `owner`.
    ///
    /// Scope rules: a level-0 manager covers every department in their group,
    /// a level-1 manager covers their own department, and everyone else only
    /// covers themselves. Superadmins bypass scope entirely.
    pub fn role_for(&self, owner: &Employee) -> ActorRole {
        match self {
            ActorContext::SuperAdmin => ActorRole::SuperAdmin,
            ActorContext::Unknown => ActorRole::Other,
            ActorContext::Staff(actor) => {
                if actor.level == GROUP_MANAGER_LEVEL
                    && actor.department.group == owner.department.group
                {
                    ActorRole::GroupManager
                } else if actor.level == DEPT_MANAGER_LEVEL
                    && actor.department.name == owner.department.name
                {
                    ActorRole::DeptManager
                } else if actor.username == owner.username {
                    ActorRole::Owner
                } else {
                    ActorRole::Other
                }
            }
        }
    }
}

/// Writable fields of a result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiField {
    Year,
    Semester,
    Employee,
    Kpi,
    Weight,
    Min,
    TargetSet,
    Max,
    TargetInput,
    Achievement,
    Month,
    FinalResult,
}

impl KpiField {
    pub const fn label(self) -> &'static str {
        match self {
            KpiField::Year => "year",
            KpiField::Semester => "semester",
            KpiField::Employee => "employee",
            KpiField::Kpi => "kpi",
            KpiField::Weight => "weight",
            KpiField::Min => "min",
            KpiField::TargetSet => "target_set",
            KpiField::Max => "max",
            KpiField::TargetInput => "target_input",
            KpiField::Achievement => "achievement",
            KpiField::Month => "month",
            KpiField::FinalResult => "final_result",
        }
    }
}

/// Resolve the set of fields `actor` may write on one result row.
///
/// Pure function of the actor, the row state, and the KPI flags. The caller
/// enforces the outcome at the field-assignment boundary; this only reports
/// what is writable. Period identity, weight, bounds, the set target, the
/// derived result, and the owning employee are read-only by default; the set
/// target opens up for superadmins and the max bound for managers in scope.
pub fn resolve_editable_fields(
    actor: &ActorContext,
    result: &KpiResult,
    kpi: &KpiDefinition,
    owner: &Employee,
) -> BTreeSet<KpiField> {
    if !result.active {
        return BTreeSet::new();
    }

    let role = actor.role_for(owner);
    if role == ActorRole::Other {
        return BTreeSet::new();
    }

    let mut editable: BTreeSet<KpiField> =
        [KpiField::TargetInput, KpiField::Achievement, KpiField::Month]
            .into_iter()
            .collect();

    match role {
        ActorRole::SuperAdmin => {
            editable.insert(KpiField::Kpi);
            editable.insert(KpiField::TargetSet);
        }
        ActorRole::DeptManager | ActorRole::GroupManager => {
            editable.insert(KpiField::Kpi);
            editable.insert(KpiField::Max);
        }
        ActorRole::Owner | ActorRole::Other => {}
    }

    if kpi.from_external_system {
        editable.remove(&KpiField::Achievement);
    }
    if !kpi.uses_percentage_calculation {
        // the working target mirrors the set target, so editing it would be
        // overwritten on the next save anyway
        editable.remove(&KpiField::TargetInput);
    }

    if result.is_locked && !role.is_reviewer() {
        return BTreeSet::new();
    }

    editable
}
