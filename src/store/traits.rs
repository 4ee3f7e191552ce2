//! Collaborator traits the scanner reads from and writes to

#[cfg(test)]
use mockall::automock;

use crate::error::StoreError;
use crate::model::{
    ComponentRef, ComponentSnapshot, ProgramLanguage, Rule, RuleStatus, Violation,
    ViolationStatus,
};

/// Source of component snapshots
#[cfg_attr(test, automock)]
pub trait ComponentSource: Send + Sync + 'static {
    /// All components eligible for a sweep
    fn list_components(&self) -> Result<Vec<ComponentRef>, StoreError>;

    /// Full snapshot by storage id, `None` if unknown
    fn get_component(&self, id: &str) -> Result<Option<ComponentSnapshot>, StoreError>;
}

/// Storage for evergreen rules
#[cfg_attr(test, automock)]
pub trait RuleStore: Send + Sync + 'static {
    /// Rules scoped to `language` whose status is one of `statuses`
    fn find_rules(
        &self,
        language: ProgramLanguage,
        statuses: &[RuleStatus],
    ) -> Result<Vec<Rule>, StoreError>;

    fn get_rule(&self, id: &str) -> Result<Option<Rule>, StoreError>;

    /// Insert or replace by rule id
    fn save_rule(&self, rule: &Rule) -> Result<(), StoreError>;
}

/// Filter for listing violations; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViolationFilter {
    pub rule_id: Option<String>,
    pub component_id: Option<String>,
    pub status: Option<ViolationStatus>,
}

/// Storage for violation records, keyed by `(rule_id, component_id)`
#[cfg_attr(test, automock)]
pub trait ViolationStore: Send + Sync + 'static {
    /// The single live record for a rule/component pair
    fn find_violation(
        &self,
        rule_id: &str,
        component_id: &str,
    ) -> Result<Option<Violation>, StoreError>;

    fn get_violation(&self, id: i64) -> Result<Option<Violation>, StoreError>;

    fn find_violations(&self, filter: &ViolationFilter) -> Result<Vec<Violation>, StoreError>;

    /// Persist a batch atomically, overwriting by `(rule_id, component_id)`
    fn upsert_violations(&self, violations: &[Violation]) -> Result<(), StoreError>;
}
