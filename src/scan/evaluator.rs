//! Rule evaluation for a single (rule, component) pair
//!
//! Given a rule, a component snapshot and the violation already stored for the
//! pair (if any), decides what the stored record should become:
//!
//! | rule   | existing record   | compliant | result                   |
//! |--------|-------------------|-----------|--------------------------|
//! | DRAFT  | not RESOLVED      | any       | IGNORED                  |
//! | ACTIVE | none/OPEN/IGNORED | no        | OPEN                     |
//! | any    | RESOLVED          | no        | nothing (stays RESOLVED) |
//! | any    | any               | yes       | RESOLVED                 |
//! | any    | none              | yes       | nothing                  |
//! | DRAFT  | none              | no        | nothing                  |

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::ModelError;
use crate::model::{
    Actor, ComponentSnapshot, DependencyTarget, DependencyViolation, Rule, RuleStatus,
    RuntimeTarget, Violation, ViolationStatus,
};
use crate::version::comparator::is_version_compliant;
use crate::version::operator::VersionOperator;

/// Runtime half of a rule that the component fails
#[derive(Debug, Clone, PartialEq, Eq)]
struct RuntimeFinding {
    /// Observed runtime, absent when the component reports none
    current: Option<RuntimeTarget>,
    target: RuntimeTarget,
}

/// Evaluate `rule` against `component`
///
/// Returns the record to persist, or `None` when nothing should be written.
/// `existing` is reused (same id, same `created_at`) when present.
pub fn evaluate(
    rule: &Rule,
    component: &ComponentSnapshot,
    existing: Option<Violation>,
    now: DateTime<Utc>,
) -> Result<Option<Violation>, ModelError> {
    let reused = existing.is_some();
    let mut violation = existing
        .unwrap_or_else(|| Violation::new(&rule.id, &component.id, Actor::System, now));

    match rule.status {
        RuleStatus::Draft if reused && !violation.is(ViolationStatus::Resolved) => {
            info!(
                "Rule is in DRAFT status, setting violation status to IGNORED: ruleId={}, componentId={}",
                rule.id, component.id
            );
            violation.set_status(ViolationStatus::Ignored, Actor::System, now);
            return Ok(Some(violation));
        }
        RuleStatus::Active if violation.is(ViolationStatus::Ignored) => {
            info!(
                "Rule changed from DRAFT to ACTIVE, setting violation status to OPEN: ruleId={}, componentId={}",
                rule.id, component.id
            );
            violation.set_status(ViolationStatus::Open, Actor::System, now);
        }
        _ => {}
    }

    let runtime_finding = rule
        .target
        .runtime()
        .and_then(|target| check_runtime(target, component));
    let dependency_violations = match rule.target.dependency() {
        Some(target) => check_dependencies(target, component)?,
        None => Vec::new(),
    };

    if let Some(finding) = &runtime_finding {
        info!(
            "Runtime violation found: ruleId={}, current={}, target={}{}",
            rule.id,
            finding
                .current
                .as_ref()
                .map_or("none", |current| current.version.as_str()),
            finding.target.operator,
            finding.target.version
        );
    }
    if !dependency_violations.is_empty() {
        info!(
            "Dependency violations found: ruleId={}, count={}",
            rule.id,
            dependency_violations.len()
        );
    }

    let has_violation = runtime_finding.is_some() || !dependency_violations.is_empty();

    if has_violation {
        if rule.status == RuleStatus::Active && !violation.is(ViolationStatus::Resolved) {
            record_findings(&mut violation, runtime_finding, dependency_violations);
            violation.set_status(ViolationStatus::Open, Actor::System, now);
            return Ok(Some(violation));
        }
        debug!(
            "Violation not surfaced: ruleId={}, componentId={}, ruleStatus={}, violationStatus={:?}",
            rule.id,
            component.id,
            rule.status.as_str(),
            violation.status
        );
        return Ok(None);
    }

    if reused {
        info!(
            "Violation resolved: ruleId={}, componentId={}",
            rule.id, component.id
        );
        record_findings(&mut violation, None, Vec::new());
        violation.set_status(ViolationStatus::Resolved, Actor::System, now);
        return Ok(Some(violation));
    }

    Ok(None)
}

fn check_runtime(target: &RuntimeTarget, component: &ComponentSnapshot) -> Option<RuntimeFinding> {
    match &component.runtime {
        None => Some(RuntimeFinding {
            current: None,
            target: target.clone(),
        }),
        Some(runtime)
            if !is_version_compliant(Some(runtime.version.as_str()), &target.version, target.operator) =>
        {
            Some(RuntimeFinding {
                // Observed value, not a constraint
                current: Some(RuntimeTarget {
                    runtime_type: runtime.runtime_type,
                    version: runtime.version.clone(),
                    operator: VersionOperator::Equal,
                }),
                target: target.clone(),
            })
        }
        Some(_) => None,
    }
}

fn check_dependencies(
    target: &DependencyTarget,
    component: &ComponentSnapshot,
) -> Result<Vec<DependencyViolation>, ModelError> {
    component
        .dependencies
        .iter()
        .filter(|dependency| target.matches(&dependency.artefact))
        .filter(|dependency| {
            !is_version_compliant(Some(dependency.version.as_str()), &target.version, target.operator)
        })
        .map(|dependency| {
            debug!(
                "Dependency violation found: artefact={}, current={}, target={}{}",
                dependency.artefact, dependency.version, target.operator, target.version
            );
            DependencyViolation::new(
                DependencyTarget {
                    artefact: dependency.artefact.clone(),
                    version: dependency.version.clone(),
                    operator: target.operator,
                },
                target.clone(),
            )
        })
        .collect()
}

fn record_findings(
    violation: &mut Violation,
    runtime: Option<RuntimeFinding>,
    dependency_violations: Vec<DependencyViolation>,
) {
    match runtime {
        Some(finding) => {
            violation.runtime_current_version = finding.current;
            violation.runtime_target_version = Some(finding.target);
        }
        None => {
            violation.runtime_current_version = None;
            violation.runtime_target_version = None;
        }
    }
    violation.dependency_violations = dependency_violations;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dependency, ProgramLanguage, RuleTarget, RuntimeInfo, RuntimeType};
    use chrono::TimeZone;
    use rstest::rstest;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    fn jdk(version: &str, operator: VersionOperator) -> RuntimeTarget {
        RuntimeTarget {
            runtime_type: RuntimeType::Jdk,
            version: version.to_string(),
            operator,
        }
    }

    fn spring_boot(version: &str) -> DependencyTarget {
        DependencyTarget {
            artefact: "org.springframework.boot".to_string(),
            version: version.to_string(),
            operator: VersionOperator::GreaterEqual,
        }
    }

    fn jdk_rule(status: RuleStatus) -> Rule {
        Rule::new(
            "r-jdk17",
            "JDK 17 or newer",
            ProgramLanguage::Java,
            RuleTarget::RuntimeOnly(jdk("17", VersionOperator::GreaterEqual)),
        )
        .with_status(status)
    }

    fn component(jdk_version: Option<&str>, dependencies: &[(&str, &str)]) -> ComponentSnapshot {
        ComponentSnapshot {
            id: "c-1".to_string(),
            component_id: "billing-service".to_string(),
            branch: "main".to_string(),
            language: ProgramLanguage::Java,
            runtime: jdk_version.map(|version| RuntimeInfo {
                runtime_type: RuntimeType::Jdk,
                version: version.to_string(),
            }),
            dependencies: dependencies
                .iter()
                .map(|(artefact, version)| Dependency {
                    artefact: artefact.to_string(),
                    version: version.to_string(),
                    dependency_type: None,
                })
                .collect(),
        }
    }

    fn existing(status: ViolationStatus) -> Violation {
        let mut violation = Violation::new("r-jdk17", "c-1", Actor::System, at(0));
        violation.id = Some(7);
        violation.status = Some(status);
        violation
    }

    #[test]
    fn outdated_runtime_opens_violation_with_versions() {
        let rule = jdk_rule(RuleStatus::Active);

        let violation = evaluate(&rule, &component(Some("11"), &[]), None, at(1))
            .unwrap()
            .unwrap();

        assert_eq!(violation.status, Some(ViolationStatus::Open));
        assert_eq!(violation.rule_id, "r-jdk17");
        assert_eq!(violation.component_id, "c-1");
        assert_eq!(
            violation.runtime_current_version,
            Some(jdk("11", VersionOperator::Equal))
        );
        assert_eq!(
            violation.runtime_target_version,
            Some(jdk("17", VersionOperator::GreaterEqual))
        );
        assert!(violation.dependency_violations.is_empty());
        assert_eq!(violation.created_by, Actor::System);
        assert_eq!(violation.created_at, at(1));
        assert_eq!(violation.resolved_at, None);
    }

    #[test]
    fn missing_runtime_info_is_a_violation_without_current_version() {
        let rule = jdk_rule(RuleStatus::Active);

        let violation = evaluate(&rule, &component(None, &[]), None, at(1))
            .unwrap()
            .unwrap();

        assert_eq!(violation.status, Some(ViolationStatus::Open));
        assert_eq!(violation.runtime_current_version, None);
        assert_eq!(
            violation.runtime_target_version,
            Some(jdk("17", VersionOperator::GreaterEqual))
        );
    }

    #[test]
    fn malformed_runtime_version_fails_closed() {
        let rule = jdk_rule(RuleStatus::Active);

        let violation = evaluate(&rule, &component(Some("openjdk-17"), &[]), None, at(1))
            .unwrap()
            .unwrap();

        assert_eq!(violation.status, Some(ViolationStatus::Open));
    }

    #[test]
    fn compliant_component_without_prior_violation_yields_nothing() {
        let rule = jdk_rule(RuleStatus::Active);

        let result = evaluate(&rule, &component(Some("21"), &[]), None, at(1)).unwrap();

        assert_eq!(result, None);
    }

    #[test]
    fn compliant_component_resolves_prior_open_violation() {
        let rule = jdk_rule(RuleStatus::Active);
        let mut prior = existing(ViolationStatus::Open);
        prior.runtime_current_version = Some(jdk("11", VersionOperator::Equal));
        prior.runtime_target_version = Some(jdk("17", VersionOperator::GreaterEqual));

        let violation = evaluate(&rule, &component(Some("17"), &[]), Some(prior), at(2))
            .unwrap()
            .unwrap();

        assert_eq!(violation.id, Some(7));
        assert_eq!(violation.status, Some(ViolationStatus::Resolved));
        assert_eq!(violation.resolved_at, Some(at(2)));
        assert_eq!(violation.updated_at, at(2));
        assert_eq!(violation.created_at, at(0));
        assert_eq!(violation.runtime_current_version, None);
        assert_eq!(violation.runtime_target_version, None);
    }

    #[test]
    fn draft_rule_ignores_prior_open_violation_then_active_reopens_it() {
        let outdated = component(Some("11"), &[]);

        let ignored = evaluate(
            &jdk_rule(RuleStatus::Draft),
            &outdated,
            Some(existing(ViolationStatus::Open)),
            at(1),
        )
        .unwrap()
        .unwrap();
        assert_eq!(ignored.status, Some(ViolationStatus::Ignored));
        assert_eq!(ignored.updated_at, at(1));

        let reopened = evaluate(&jdk_rule(RuleStatus::Active), &outdated, Some(ignored), at(2))
            .unwrap()
            .unwrap();
        assert_eq!(reopened.status, Some(ViolationStatus::Open));
        assert_eq!(reopened.id, Some(7));
        assert_eq!(reopened.created_at, at(0));
    }

    #[test]
    fn draft_rule_ignores_prior_violation_even_when_compliant() {
        let result = evaluate(
            &jdk_rule(RuleStatus::Draft),
            &component(Some("21"), &[]),
            Some(existing(ViolationStatus::Open)),
            at(1),
        )
        .unwrap()
        .unwrap();

        assert_eq!(result.status, Some(ViolationStatus::Ignored));
    }

    #[test]
    fn draft_rule_without_prior_violation_creates_nothing() {
        let result = evaluate(
            &jdk_rule(RuleStatus::Draft),
            &component(Some("11"), &[]),
            None,
            at(1),
        )
        .unwrap();

        assert_eq!(result, None);
    }

    #[test]
    fn active_rule_resolves_ignored_violation_when_compliant() {
        let result = evaluate(
            &jdk_rule(RuleStatus::Active),
            &component(Some("21"), &[]),
            Some(existing(ViolationStatus::Ignored)),
            at(1),
        )
        .unwrap()
        .unwrap();

        assert_eq!(result.status, Some(ViolationStatus::Resolved));
    }

    #[rstest]
    #[case(RuleStatus::Active)]
    #[case(RuleStatus::Draft)]
    fn resolved_violation_stays_resolved_while_still_failing(#[case] status: RuleStatus) {
        let result = evaluate(
            &jdk_rule(status),
            &component(Some("11"), &[]),
            Some(existing(ViolationStatus::Resolved)),
            at(1),
        )
        .unwrap();

        assert_eq!(result, None);
    }

    #[rstest]
    #[case(RuleStatus::Active, Some("11"), Some(ViolationStatus::Open))]
    #[case(RuleStatus::Active, Some("21"), None)]
    #[case(RuleStatus::Draft, Some("11"), None)]
    fn repeated_evaluation_does_not_toggle_status(
        #[case] rule_status: RuleStatus,
        #[case] jdk_version: Option<&str>,
        #[case] expected: Option<ViolationStatus>,
    ) {
        let rule = jdk_rule(rule_status);
        let snapshot = component(jdk_version, &[]);

        let first = evaluate(&rule, &snapshot, None, at(1)).unwrap();
        let second = evaluate(&rule, &snapshot, first.clone(), at(2)).unwrap();
        let third = evaluate(&rule, &snapshot, second.clone(), at(3)).unwrap();

        assert_eq!(first.as_ref().and_then(|v| v.status), expected);
        assert_eq!(second.as_ref().and_then(|v| v.status), expected);
        assert_eq!(third.as_ref().and_then(|v| v.status), expected);
    }

    #[test]
    fn repeated_evaluation_of_open_violation_refreshes_snapshot_only() {
        let rule = jdk_rule(RuleStatus::Active);
        let snapshot = component(Some("11"), &[]);

        let first = evaluate(&rule, &snapshot, Some(existing(ViolationStatus::Open)), at(1))
            .unwrap()
            .unwrap();
        let second = evaluate(&rule, &snapshot, Some(first.clone()), at(2))
            .unwrap()
            .unwrap();

        assert_eq!(Violation { updated_at: at(1), ..second }, first);
    }

    #[test]
    fn dependency_prefix_match_reports_each_outdated_dependency() {
        let rule = Rule::new(
            "r-boot3",
            "Spring Boot 3",
            ProgramLanguage::Java,
            RuleTarget::DependencyOnly(spring_boot("3.0.0")),
        )
        .with_status(RuleStatus::Active);
        let snapshot = component(
            Some("17"),
            &[
                ("org.springframework.boot.starter-web", "2.7.18"),
                ("org.springframework.boot.starter-data-jpa", "3.2.1"),
                ("org.springframework.boot.starter-test", "2.7.0"),
                ("com.fasterxml.jackson.core", "2.0.0"),
            ],
        );

        let violation = evaluate(&rule, &snapshot, None, at(1)).unwrap().unwrap();

        let current: Vec<_> = violation
            .dependency_violations
            .iter()
            .map(|d| (d.current().artefact.as_str(), d.current().version.as_str()))
            .collect();
        assert_eq!(
            current,
            vec![
                ("org.springframework.boot.starter-web", "2.7.18"),
                ("org.springframework.boot.starter-test", "2.7.0"),
            ]
        );
        for dependency_violation in &violation.dependency_violations {
            assert_eq!(dependency_violation.target(), &spring_boot("3.0.0"));
            assert_eq!(
                dependency_violation.current().operator,
                VersionOperator::GreaterEqual
            );
        }
        assert_eq!(violation.runtime_current_version, None);
        assert_eq!(violation.runtime_target_version, None);
    }

    #[test]
    fn dependency_without_version_is_a_violation() {
        let rule = Rule::new(
            "r-boot3",
            "Spring Boot 3",
            ProgramLanguage::Java,
            RuleTarget::DependencyOnly(spring_boot("3.0.0")),
        )
        .with_status(RuleStatus::Active);

        let violation = evaluate(
            &rule,
            &component(Some("17"), &[("org.springframework.boot:starter", "")]),
            None,
            at(1),
        )
        .unwrap()
        .unwrap();

        assert_eq!(violation.dependency_violations.len(), 1);
    }

    #[test]
    fn combined_target_clears_runtime_details_once_runtime_is_fixed() {
        let rule = Rule::new(
            "r-both",
            "JDK 17 and Boot 3",
            ProgramLanguage::Java,
            RuleTarget::Both {
                runtime: jdk("17", VersionOperator::GreaterEqual),
                dependency: spring_boot("3.0.0"),
            },
        )
        .with_status(RuleStatus::Active);

        let before = evaluate(
            &rule,
            &component(Some("11"), &[("org.springframework.boot.starter-web", "2.7.18")]),
            None,
            at(1),
        )
        .unwrap()
        .unwrap();
        assert!(before.runtime_target_version.is_some());
        assert_eq!(before.dependency_violations.len(), 1);

        let after = evaluate(
            &rule,
            &component(Some("17"), &[("org.springframework.boot.starter-web", "2.7.18")]),
            Some(before),
            at(2),
        )
        .unwrap()
        .unwrap();
        assert_eq!(after.status, Some(ViolationStatus::Open));
        assert_eq!(after.runtime_current_version, None);
        assert_eq!(after.runtime_target_version, None);
        assert_eq!(after.dependency_violations.len(), 1);
    }

    #[test]
    fn unmatched_dependencies_are_ignored() {
        let rule = Rule::new(
            "r-boot3",
            "Spring Boot 3",
            ProgramLanguage::Java,
            RuleTarget::DependencyOnly(spring_boot("3.0.0")),
        )
        .with_status(RuleStatus::Active);

        let result = evaluate(
            &rule,
            &component(Some("17"), &[("io.micronaut:micronaut-core", "1.0.0")]),
            None,
            at(1),
        )
        .unwrap();

        assert_eq!(result, None);
    }
}
