//! Evergreen rules: a language scope plus a runtime and/or dependency target

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::model::component::{ProgramLanguage, RuntimeType};
use crate::model::violation::Actor;
use crate::version::comparator::is_valid_version;
use crate::version::operator::VersionOperator;

/// Lifecycle status of a rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleStatus {
    /// Evaluated, but violations are kept IGNORED
    #[default]
    Draft,
    Active,
    /// Excluded from scanning
    Archived,
}

impl RuleStatus {
    /// Statuses picked up by a scan
    pub const SCANNABLE: [RuleStatus; 2] = [RuleStatus::Draft, RuleStatus::Active];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Draft => "DRAFT",
            RuleStatus::Active => "ACTIVE",
            RuleStatus::Archived => "ARCHIVED",
        }
    }
}

impl FromStr for RuleStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(RuleStatus::Draft),
            "ACTIVE" => Ok(RuleStatus::Active),
            "ARCHIVED" => Ok(RuleStatus::Archived),
            _ => Err(ModelError::Validation(format!("unknown rule status: {s}"))),
        }
    }
}

/// Required runtime version, e.g. JDK >= 17
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeTarget {
    pub runtime_type: RuntimeType,
    pub version: String,
    pub operator: VersionOperator,
}

/// Required dependency version, matched by artefact prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyTarget {
    pub artefact: String,
    pub version: String,
    pub operator: VersionOperator,
}

impl DependencyTarget {
    /// `org.springframework.boot` matches `org.springframework.boot.starter-web`
    pub fn matches(&self, artefact: &str) -> bool {
        artefact.starts_with(&self.artefact)
    }
}

/// What a rule checks. At least one of the two targets is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TargetSpec", into = "TargetSpec")]
pub enum RuleTarget {
    RuntimeOnly(RuntimeTarget),
    DependencyOnly(DependencyTarget),
    Both {
        runtime: RuntimeTarget,
        dependency: DependencyTarget,
    },
}

impl RuleTarget {
    /// Build a target from optional parts, validating versions and artefact
    pub fn new(
        runtime: Option<RuntimeTarget>,
        dependency: Option<DependencyTarget>,
    ) -> Result<Self, ModelError> {
        let target = match (runtime, dependency) {
            (Some(runtime), Some(dependency)) => RuleTarget::Both {
                runtime,
                dependency,
            },
            (Some(runtime), None) => RuleTarget::RuntimeOnly(runtime),
            (None, Some(dependency)) => RuleTarget::DependencyOnly(dependency),
            (None, None) => {
                return Err(ModelError::Validation(
                    "rule target must specify a runtime target, a dependency target, or both"
                        .to_string(),
                ));
            }
        };
        target.validate()?;
        Ok(target)
    }

    pub fn runtime(&self) -> Option<&RuntimeTarget> {
        match self {
            RuleTarget::RuntimeOnly(runtime) | RuleTarget::Both { runtime, .. } => Some(runtime),
            RuleTarget::DependencyOnly(_) => None,
        }
    }

    pub fn dependency(&self) -> Option<&DependencyTarget> {
        match self {
            RuleTarget::DependencyOnly(dependency) | RuleTarget::Both { dependency, .. } => {
                Some(dependency)
            }
            RuleTarget::RuntimeOnly(_) => None,
        }
    }

    fn validate(&self) -> Result<(), ModelError> {
        if let Some(runtime) = self.runtime()
            && !is_valid_version(&runtime.version)
        {
            return Err(ModelError::Validation(format!(
                "invalid runtime target version: {:?}",
                runtime.version
            )));
        }
        if let Some(dependency) = self.dependency() {
            if dependency.artefact.trim().is_empty() {
                return Err(ModelError::Validation(
                    "dependency target artefact must not be empty".to_string(),
                ));
            }
            if !is_valid_version(&dependency.version) {
                return Err(ModelError::Validation(format!(
                    "invalid dependency target version: {:?}",
                    dependency.version
                )));
            }
        }
        Ok(())
    }
}

/// Wire form of [`RuleTarget`]: two optional fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    runtime_target: Option<RuntimeTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dependency_target: Option<DependencyTarget>,
}

impl TryFrom<TargetSpec> for RuleTarget {
    type Error = ModelError;

    fn try_from(spec: TargetSpec) -> Result<Self, Self::Error> {
        RuleTarget::new(spec.runtime_target, spec.dependency_target)
    }
}

impl From<RuleTarget> for TargetSpec {
    fn from(target: RuleTarget) -> Self {
        match target {
            RuleTarget::RuntimeOnly(runtime) => TargetSpec {
                runtime_target: Some(runtime),
                dependency_target: None,
            },
            RuleTarget::DependencyOnly(dependency) => TargetSpec {
                runtime_target: None,
                dependency_target: Some(dependency),
            },
            RuleTarget::Both {
                runtime,
                dependency,
            } => TargetSpec {
                runtime_target: Some(runtime),
                dependency_target: Some(dependency),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// When a rule must be met and how much a miss matters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compliance {
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: RuleStatus,
    pub language: ProgramLanguage,
    pub target: RuleTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance: Option<Compliance>,
    #[serde(default)]
    pub created_by: Actor,
    #[serde(default)]
    pub updated_by: Actor,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Rule {
    /// New DRAFT rule attributed to the system
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        language: ProgramLanguage,
        target: RuleTarget,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            status: RuleStatus::Draft,
            language,
            target,
            compliance: None,
            created_by: Actor::System,
            updated_by: Actor::System,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: RuleStatus) -> Self {
        self.status = status;
        self
    }

    /// Creation-time checks; the evaluator assumes these hold
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.id.trim().is_empty() {
            return Err(ModelError::Validation("rule id must not be empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(ModelError::Validation(format!(
                "rule {} must have a name",
                self.id
            )));
        }
        self.target.validate()
    }
}
