//! Violation records produced by scans

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::model::rule::{DependencyTarget, RuntimeTarget};

const SYSTEM_ACTOR: &str = "System";

/// Who performed a mutation
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Actor {
    /// Scheduled and on-demand scans
    #[default]
    System,
    User(String),
}

impl Actor {
    pub fn user(name: impl Into<String>) -> Self {
        Actor::User(name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Actor::System => SYSTEM_ACTOR,
            Actor::User(name) => name,
        }
    }
}

impl From<String> for Actor {
    fn from(name: String) -> Self {
        if name == SYSTEM_ACTOR {
            Actor::System
        } else {
            Actor::User(name)
        }
    }
}

impl From<Actor> for String {
    fn from(actor: Actor) -> Self {
        actor.as_str().to_string()
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationStatus {
    Open,
    /// Suppressed while the rule is in DRAFT
    Ignored,
    Resolved,
}

impl ViolationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationStatus::Open => "OPEN",
            ViolationStatus::Ignored => "IGNORED",
            ViolationStatus::Resolved => "RESOLVED",
        }
    }
}

impl FromStr for ViolationStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(ViolationStatus::Open),
            "IGNORED" => Ok(ViolationStatus::Ignored),
            "RESOLVED" => Ok(ViolationStatus::Resolved),
            _ => Err(ModelError::Validation(format!(
                "unknown violation status: {s}"
            ))),
        }
    }
}

/// A dependency that fails a rule's dependency target
///
/// The current artefact always equals or extends the target artefact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DependencyViolationSpec", rename_all = "camelCase")]
pub struct DependencyViolation {
    dependency_current_version: DependencyTarget,
    dependency_target_version: DependencyTarget,
}

impl DependencyViolation {
    pub fn new(current: DependencyTarget, target: DependencyTarget) -> Result<Self, ModelError> {
        if !target.matches(&current.artefact) {
            return Err(ModelError::ArtefactMismatch {
                current: current.artefact,
                target: target.artefact,
            });
        }
        Ok(Self {
            dependency_current_version: current,
            dependency_target_version: target,
        })
    }

    pub fn current(&self) -> &DependencyTarget {
        &self.dependency_current_version
    }

    pub fn target(&self) -> &DependencyTarget {
        &self.dependency_target_version
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DependencyViolationSpec {
    dependency_current_version: DependencyTarget,
    dependency_target_version: DependencyTarget,
}

impl TryFrom<DependencyViolationSpec> for DependencyViolation {
    type Error = ModelError;

    fn try_from(spec: DependencyViolationSpec) -> Result<Self, Self::Error> {
        DependencyViolation::new(
            spec.dependency_current_version,
            spec.dependency_target_version,
        )
    }
}

/// Non-compliance of one component against one rule
///
/// At most one record exists per `(rule_id, component_id)`. Records are never
/// deleted; they move to RESOLVED instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Storage id, `None` until first persisted
    pub id: Option<i64>,
    pub rule_id: String,
    pub component_id: String,
    /// `None` only on a freshly built record that has not been evaluated
    pub status: Option<ViolationStatus>,
    pub runtime_current_version: Option<RuntimeTarget>,
    pub runtime_target_version: Option<RuntimeTarget>,
    pub dependency_violations: Vec<DependencyViolation>,
    pub created_by: Actor,
    pub updated_by: Actor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Violation {
    /// Fresh, unevaluated record attributed to `actor`
    pub fn new(
        rule_id: impl Into<String>,
        component_id: impl Into<String>,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            rule_id: rule_id.into(),
            component_id: component_id.into(),
            status: None,
            runtime_current_version: None,
            runtime_target_version: None,
            dependency_violations: Vec::new(),
            created_by: actor.clone(),
            updated_by: actor,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        }
    }

    /// Overwrite status and stamp the audit fields; RESOLVED also stamps `resolved_at`
    pub fn set_status(&mut self, status: ViolationStatus, actor: Actor, now: DateTime<Utc>) {
        self.status = Some(status);
        self.updated_by = actor;
        self.updated_at = now;
        if status == ViolationStatus::Resolved {
            self.resolved_at = Some(now);
        }
    }

    pub fn is(&self, status: ViolationStatus) -> bool {
        self.status == Some(status)
    }
}
