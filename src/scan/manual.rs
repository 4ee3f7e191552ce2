//! Operator-driven changes to violations and rules

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::ScanError;
use crate::model::{Actor, Rule, RuleStatus, Violation, ViolationStatus};
use crate::store::{RuleStore, ViolationFilter, ViolationStore};

/// Set the status of one violation by storage id
pub fn update_violation_status<V: ViolationStore + ?Sized>(
    store: &V,
    id: i64,
    status: ViolationStatus,
    actor: Actor,
    now: DateTime<Utc>,
) -> Result<Violation, ScanError> {
    let mut violation = store
        .get_violation(id)?
        .ok_or(ScanError::ViolationNotFound(id))?;

    violation.set_status(status, actor, now);
    store.upsert_violations(std::slice::from_ref(&violation))?;

    info!(
        "Updated violation {} to {} by {}",
        id,
        status.as_str(),
        violation.updated_by
    );
    Ok(violation)
}

/// Resolve every OPEN violation for a rule/component pair
///
/// Returns how many records were resolved; zero leaves storage untouched.
pub fn resolve_all_violations_for_rule<V: ViolationStore + ?Sized>(
    store: &V,
    rule_id: &str,
    component_id: &str,
    actor: Actor,
    now: DateTime<Utc>,
) -> Result<usize, ScanError> {
    let filter = ViolationFilter {
        rule_id: Some(rule_id.to_string()),
        component_id: Some(component_id.to_string()),
        status: Some(ViolationStatus::Open),
    };
    let mut violations = store.find_violations(&filter)?;
    if violations.is_empty() {
        return Ok(0);
    }

    for violation in &mut violations {
        violation.set_status(ViolationStatus::Resolved, actor.clone(), now);
    }
    store.upsert_violations(&violations)?;

    info!(
        "Resolved {} violations for rule {} in component {}",
        violations.len(),
        rule_id,
        component_id
    );
    Ok(violations.len())
}

pub fn update_rule_status<R: RuleStore + ?Sized>(
    store: &R,
    rule_id: &str,
    status: RuleStatus,
    actor: Actor,
    now: DateTime<Utc>,
) -> Result<Rule, ScanError> {
    let mut rule = store
        .get_rule(rule_id)?
        .ok_or_else(|| ScanError::RuleNotFound(rule_id.to_string()))?;

    rule.status = status;
    rule.updated_by = actor;
    rule.updated_at = now;
    store.save_rule(&rule)?;

    info!("Updated rule {} to {}", rule_id, status.as_str());
    Ok(rule)
}

/// Validate and store a rule, updating in place when the id already exists
///
/// An existing rule keeps its creation audit fields.
pub fn save_rule<R: RuleStore + ?Sized>(
    store: &R,
    mut rule: Rule,
    actor: Actor,
    now: DateTime<Utc>,
) -> Result<Rule, ScanError> {
    rule.validate()?;

    match store.get_rule(&rule.id)? {
        Some(existing) => {
            rule.created_by = existing.created_by;
            rule.created_at = existing.created_at;
            info!("Updating rule {}", rule.id);
        }
        None => {
            rule.created_by = actor.clone();
            rule.created_at = now;
            info!("Adding rule {}", rule.id);
        }
    }
    rule.updated_by = actor;
    rule.updated_at = now;

    store.save_rule(&rule)?;
    Ok(rule)
}
