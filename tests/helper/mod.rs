//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;

use evergreen_scan::error::StoreError;
use evergreen_scan::model::{
    ComponentRef, ComponentSnapshot, Dependency, DependencyTarget, ProgramLanguage, Rule,
    RuleStatus, RuleTarget, RuntimeInfo, RuntimeTarget, RuntimeType,
};
use evergreen_scan::scan::Scanner;
use evergreen_scan::store::{ComponentSource, SqliteStore};
use evergreen_scan::version::VersionOperator;

pub const SPRING_BOOT: &str = "org.springframework.boot";

/// Creates a SQLite store in a temp directory; keep the `TempDir` alive
pub fn create_test_store() -> (TempDir, Arc<SqliteStore>) {
    let temp_dir = TempDir::new().unwrap();
    let store = SqliteStore::new(&temp_dir.path().join("evergreen.db")).unwrap();
    (temp_dir, Arc::new(store))
}

pub fn sqlite_scanner(store: &Arc<SqliteStore>) -> Scanner<SqliteStore, SqliteStore, SqliteStore> {
    Scanner::new(Arc::clone(store), Arc::clone(store), Arc::clone(store))
}

pub fn java_component(id: &str, jdk: &str, boot: &str) -> ComponentSnapshot {
    ComponentSnapshot {
        id: id.to_string(),
        component_id: format!("{id}-service"),
        branch: "main".to_string(),
        language: ProgramLanguage::Java,
        runtime: Some(RuntimeInfo {
            runtime_type: RuntimeType::Jdk,
            version: jdk.to_string(),
        }),
        dependencies: vec![
            Dependency {
                artefact: format!("{SPRING_BOOT}:spring-boot-starter-web"),
                version: boot.to_string(),
                dependency_type: Some("compile".to_string()),
            },
            Dependency {
                artefact: "com.fasterxml.jackson.core:jackson-databind".to_string(),
                version: "2.15.2".to_string(),
                dependency_type: Some("compile".to_string()),
            },
        ],
    }
}

pub fn jdk_rule(id: &str, version: &str, status: RuleStatus) -> Rule {
    Rule::new(
        id,
        format!("JDK >= {version}"),
        ProgramLanguage::Java,
        RuleTarget::RuntimeOnly(RuntimeTarget {
            runtime_type: RuntimeType::Jdk,
            version: version.to_string(),
            operator: VersionOperator::GreaterEqual,
        }),
    )
    .with_status(status)
}

pub fn boot_rule(id: &str, version: &str, status: RuleStatus) -> Rule {
    Rule::new(
        id,
        format!("Spring Boot >= {version}"),
        ProgramLanguage::Java,
        RuleTarget::DependencyOnly(DependencyTarget {
            artefact: SPRING_BOOT.to_string(),
            version: version.to_string(),
            operator: VersionOperator::GreaterEqual,
        }),
    )
    .with_status(status)
}

/// Component source that fails for one id and delegates everything else
pub struct FailingComponentSource {
    pub inner: Arc<SqliteStore>,
    pub failing_id: String,
}

impl ComponentSource for FailingComponentSource {
    fn list_components(&self) -> Result<Vec<ComponentRef>, StoreError> {
        self.inner.list_components()
    }

    fn get_component(&self, id: &str) -> Result<Option<ComponentSnapshot>, StoreError> {
        if id == self.failing_id {
            return Err(StoreError::Corrupt(format!("component {id}")));
        }
        self.inner.get_component(id)
    }
}
