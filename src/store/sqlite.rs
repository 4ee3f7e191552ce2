use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::model::{
    Actor, Compliance, ComponentRef, ComponentSnapshot, Dependency, DependencyViolation,
    ProgramLanguage, Rule, RuleStatus, RuleTarget, RuntimeInfo, RuntimeTarget, Violation,
    ViolationStatus,
};
use crate::store::traits::{ComponentSource, RuleStore, ViolationFilter, ViolationStore};

/// Schema migrations
/// Each version contains a list of SQL statements to execute
const MIGRATIONS: &[&[&str]] = &[
    // v1: rule lookup by scan scope
    &["CREATE INDEX IF NOT EXISTS idx_rules_language_status ON rules(language, status)"],
    // v2: violation listing by status
    &["CREATE INDEX IF NOT EXISTS idx_violations_status ON violations(status)"],
];

const VIOLATION_COLUMNS: &str = r#"
    id, rule_id, component_id, status, runtime_current, runtime_target,
    dependency_violations, created_by, updated_by, created_at, updated_at, resolved_at
"#;

const RULE_COLUMNS: &str = r#"
    id, name, description, status, language, target, compliance,
    created_by, updated_by, created_at, updated_at
"#;

/// SQLite-backed store for components, rules and violations
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(db_path: &Path) -> Result<Self, StoreError> {
        info!("Initializing evergreen database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::from_connection(conn)
    }

    /// Store backed by a private in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;
        info!("Evergreen database initialized");
        Ok(store)
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        debug!("Creating database schema");

        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS components (
                id TEXT PRIMARY KEY,
                component_id TEXT NOT NULL,
                branch TEXT NOT NULL,
                language TEXT NOT NULL,
                runtime TEXT,
                dependencies TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS rules (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                status TEXT NOT NULL,
                language TEXT NOT NULL,
                target TEXT NOT NULL,
                compliance TEXT,
                created_by TEXT NOT NULL,
                updated_by TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS violations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                rule_id TEXT NOT NULL,
                component_id TEXT NOT NULL,
                status TEXT NOT NULL,
                runtime_current TEXT,
                runtime_target TEXT,
                dependency_violations TEXT NOT NULL,
                created_by TEXT NOT NULL,
                updated_by TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                resolved_at INTEGER,
                UNIQUE(rule_id, component_id)
            )
            "#,
            [],
        )?;

        Self::apply_migrations(&conn)?;

        debug!("Database schema created successfully");
        Ok(())
    }

    /// Apply pending migrations based on user_version pragma
    fn apply_migrations(conn: &Connection) -> Result<(), StoreError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, statements) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                for sql in *statements {
                    conn.execute(sql, [])?;
                }
                debug!("Applied migration v{}", version);
            }
        }

        let target_version = MIGRATIONS.len() as i32;
        if target_version > current_version {
            conn.pragma_update(None, "user_version", target_version)?;
            debug!("Updated schema version to v{}", target_version);
        }

        Ok(())
    }

    /// Insert or replace component snapshots
    pub fn save_components(&self, components: &[ComponentSnapshot]) -> Result<(), StoreError> {
        let now = Utc::now().timestamp_millis();
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO components (id, component_id, branch, language, runtime, dependencies, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    component_id = excluded.component_id,
                    branch = excluded.branch,
                    language = excluded.language,
                    runtime = excluded.runtime,
                    dependencies = excluded.dependencies,
                    updated_at = excluded.updated_at
                "#,
            )?;
            for component in components {
                stmt.execute(params![
                    component.id,
                    component.component_id,
                    component.branch,
                    component.language.as_str(),
                    to_json_opt(component.runtime.as_ref())?,
                    serde_json::to_string(&component.dependencies)?,
                    now,
                ])?;
            }
        }
        tx.commit()?;

        debug!("Saved {} components", components.len());
        Ok(())
    }
}

impl ComponentSource for SqliteStore {
    fn list_components(&self) -> Result<Vec<ComponentRef>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT id, component_id FROM components ORDER BY id")?;

        let refs = stmt
            .query_map([], |row| {
                Ok(ComponentRef {
                    id: row.get(0)?,
                    component_id: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(refs)
    }

    fn get_component(&self, id: &str) -> Result<Option<ComponentSnapshot>, StoreError> {
        let conn = self.lock_conn()?;
        let row = conn
            .query_row(
                r#"
                SELECT id, component_id, branch, language, runtime, dependencies
                FROM components WHERE id = ?1
                "#,
                [id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, component_id, branch, language, runtime, dependencies)) = row else {
            return Ok(None);
        };

        Ok(Some(ComponentSnapshot {
            id,
            component_id,
            branch,
            language: parse_column(&language)?,
            runtime: from_json_opt::<RuntimeInfo>(runtime)?,
            dependencies: serde_json::from_str::<Vec<Dependency>>(&dependencies)?,
        }))
    }
}

impl RuleStore for SqliteStore {
    fn find_rules(
        &self,
        language: ProgramLanguage,
        statuses: &[RuleStatus],
    ) -> Result<Vec<Rule>, StoreError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        // Build WHERE IN clause with placeholders
        let placeholders: Vec<_> = (0..statuses.len())
            .map(|i| format!("?{}", i + 2))
            .collect();
        let query = format!(
            "SELECT {RULE_COLUMNS} FROM rules WHERE language = ?1 AND status IN ({}) ORDER BY id",
            placeholders.join(", ")
        );

        let params = std::iter::once(language.as_str())
            .chain(statuses.iter().map(RuleStatus::as_str));

        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
            .query_map(params_from_iter(params), RuleRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(RuleRow::into_rule).collect()
    }

    fn get_rule(&self, id: &str) -> Result<Option<Rule>, StoreError> {
        let conn = self.lock_conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {RULE_COLUMNS} FROM rules WHERE id = ?1"),
                [id],
                RuleRow::from_row,
            )
            .optional()?;

        row.map(RuleRow::into_rule).transpose()
    }

    fn save_rule(&self, rule: &Rule) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO rules (id, name, description, status, language, target, compliance,
                               created_by, updated_by, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                status = excluded.status,
                language = excluded.language,
                target = excluded.target,
                compliance = excluded.compliance,
                updated_by = excluded.updated_by,
                updated_at = excluded.updated_at
            "#,
            params![
                rule.id,
                rule.name,
                rule.description,
                rule.status.as_str(),
                rule.language.as_str(),
                serde_json::to_string(&rule.target)?,
                to_json_opt(rule.compliance.as_ref())?,
                rule.created_by.as_str(),
                rule.updated_by.as_str(),
                rule.created_at.timestamp_millis(),
                rule.updated_at.timestamp_millis(),
            ],
        )?;

        debug!("Saved rule {} ({})", rule.id, rule.status.as_str());
        Ok(())
    }
}

impl ViolationStore for SqliteStore {
    fn find_violation(
        &self,
        rule_id: &str,
        component_id: &str,
    ) -> Result<Option<Violation>, StoreError> {
        let conn = self.lock_conn()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {VIOLATION_COLUMNS} FROM violations WHERE rule_id = ?1 AND component_id = ?2"
                ),
                [rule_id, component_id],
                ViolationRow::from_row,
            )
            .optional()?;

        row.map(ViolationRow::into_violation).transpose()
    }

    fn get_violation(&self, id: i64) -> Result<Option<Violation>, StoreError> {
        let conn = self.lock_conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {VIOLATION_COLUMNS} FROM violations WHERE id = ?1"),
                [id],
                ViolationRow::from_row,
            )
            .optional()?;

        row.map(ViolationRow::into_violation).transpose()
    }

    fn find_violations(&self, filter: &ViolationFilter) -> Result<Vec<Violation>, StoreError> {
        let mut clauses = Vec::new();
        let mut values: Vec<&str> = Vec::new();

        if let Some(rule_id) = &filter.rule_id {
            values.push(rule_id);
            clauses.push(format!("rule_id = ?{}", values.len()));
        }
        if let Some(component_id) = &filter.component_id {
            values.push(component_id);
            clauses.push(format!("component_id = ?{}", values.len()));
        }
        if let Some(status) = filter.status {
            values.push(status.as_str());
            clauses.push(format!("status = ?{}", values.len()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let query = format!("SELECT {VIOLATION_COLUMNS} FROM violations {where_clause} ORDER BY id");

        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
            .query_map(params_from_iter(values), ViolationRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(ViolationRow::into_violation).collect()
    }

    fn upsert_violations(&self, violations: &[Violation]) -> Result<(), StoreError> {
        if violations.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        {
            // created_at/created_by are kept from the first insert
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO violations (rule_id, component_id, status, runtime_current, runtime_target,
                                        dependency_violations, created_by, updated_by,
                                        created_at, updated_at, resolved_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ON CONFLICT(rule_id, component_id) DO UPDATE SET
                    status = excluded.status,
                    runtime_current = excluded.runtime_current,
                    runtime_target = excluded.runtime_target,
                    dependency_violations = excluded.dependency_violations,
                    updated_by = excluded.updated_by,
                    updated_at = excluded.updated_at,
                    resolved_at = excluded.resolved_at
                "#,
            )?;

            for violation in violations {
                let Some(status) = violation.status else {
                    return Err(StoreError::Unevaluated {
                        rule_id: violation.rule_id.clone(),
                        component_id: violation.component_id.clone(),
                    });
                };
                stmt.execute(params![
                    violation.rule_id,
                    violation.component_id,
                    status.as_str(),
                    to_json_opt(violation.runtime_current_version.as_ref())?,
                    to_json_opt(violation.runtime_target_version.as_ref())?,
                    serde_json::to_string(&violation.dependency_violations)?,
                    violation.created_by.as_str(),
                    violation.updated_by.as_str(),
                    violation.created_at.timestamp_millis(),
                    violation.updated_at.timestamp_millis(),
                    violation.resolved_at.map(|at| at.timestamp_millis()),
                ])?;
            }
        }
        tx.commit()?;

        debug!("Upserted {} violations", violations.len());
        Ok(())
    }
}

/// Raw `rules` row, decoded outside the rusqlite callback
struct RuleRow {
    id: String,
    name: String,
    description: Option<String>,
    status: String,
    language: String,
    target: String,
    compliance: Option<String>,
    created_by: String,
    updated_by: String,
    created_at: i64,
    updated_at: i64,
}

impl RuleRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            status: row.get(3)?,
            language: row.get(4)?,
            target: row.get(5)?,
            compliance: row.get(6)?,
            created_by: row.get(7)?,
            updated_by: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn into_rule(self) -> Result<Rule, StoreError> {
        Ok(Rule {
            status: parse_column(&self.status)?,
            language: parse_column(&self.language)?,
            target: serde_json::from_str::<RuleTarget>(&self.target)?,
            compliance: from_json_opt::<Compliance>(self.compliance)?,
            created_by: Actor::from(self.created_by),
            updated_by: Actor::from(self.updated_by),
            created_at: from_millis(self.created_at)?,
            updated_at: from_millis(self.updated_at)?,
            id: self.id,
            name: self.name,
            description: self.description,
        })
    }
}

/// Raw `violations` row, decoded outside the rusqlite callback
struct ViolationRow {
    id: i64,
    rule_id: String,
    component_id: String,
    status: String,
    runtime_current: Option<String>,
    runtime_target: Option<String>,
    dependency_violations: String,
    created_by: String,
    updated_by: String,
    created_at: i64,
    updated_at: i64,
    resolved_at: Option<i64>,
}

impl ViolationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            rule_id: row.get(1)?,
            component_id: row.get(2)?,
            status: row.get(3)?,
            runtime_current: row.get(4)?,
            runtime_target: row.get(5)?,
            dependency_violations: row.get(6)?,
            created_by: row.get(7)?,
            updated_by: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
            resolved_at: row.get(11)?,
        })
    }

    fn into_violation(self) -> Result<Violation, StoreError> {
        Ok(Violation {
            id: Some(self.id),
            status: Some(parse_column::<ViolationStatus>(&self.status)?),
            runtime_current_version: from_json_opt::<RuntimeTarget>(self.runtime_current)?,
            runtime_target_version: from_json_opt::<RuntimeTarget>(self.runtime_target)?,
            dependency_violations: serde_json::from_str::<Vec<DependencyViolation>>(
                &self.dependency_violations,
            )?,
            created_by: Actor::from(self.created_by),
            updated_by: Actor::from(self.updated_by),
            created_at: from_millis(self.created_at)?,
            updated_at: from_millis(self.updated_at)?,
            resolved_at: self.resolved_at.map(from_millis).transpose()?,
            rule_id: self.rule_id,
            component_id: self.component_id,
        })
    }
}

fn parse_column<T>(value: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {ms}")))
}

fn to_json_opt<T: serde::Serialize>(value: Option<&T>) -> Result<Option<String>, StoreError> {
    value
        .map(serde_json::to_string)
        .transpose()
        .map_err(StoreError::from)
}

fn from_json_opt<T: serde::de::DeserializeOwned>(
    value: Option<String>,
) -> Result<Option<T>, StoreError> {
    value
        .map(|json| serde_json::from_str::<T>(&json))
        .transpose()
        .map_err(StoreError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DependencyTarget, RuntimeType};
    use crate::version::operator::VersionOperator;
    use chrono::TimeZone;
    use rstest::rstest;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, SqliteStore) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let store = SqliteStore::new(&db_path).unwrap();
        (temp_dir, store)
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
    }

    fn component(id: &str, language: ProgramLanguage) -> ComponentSnapshot {
        ComponentSnapshot {
            id: id.to_string(),
            component_id: format!("{id}-name"),
            branch: "main".to_string(),
            language,
            runtime: Some(RuntimeInfo {
                runtime_type: RuntimeType::Jdk,
                version: "11".to_string(),
            }),
            dependencies: vec![Dependency {
                artefact: "org.springframework.boot:spring-boot-starter-web".to_string(),
                version: "2.7.18".to_string(),
                dependency_type: Some("compile".to_string()),
            }],
        }
    }

    fn rule(id: &str, language: ProgramLanguage, status: RuleStatus) -> Rule {
        let mut rule = Rule::new(
            id,
            format!("rule {id}"),
            language,
            RuleTarget::RuntimeOnly(RuntimeTarget {
                runtime_type: RuntimeType::Jdk,
                version: "17".to_string(),
                operator: VersionOperator::GreaterEqual,
            }),
        )
        .with_status(status);
        rule.created_at = at(1);
        rule.updated_at = at(1);
        rule
    }

    fn open_violation(rule_id: &str, component_id: &str) -> Violation {
        let mut violation = Violation::new(rule_id, component_id, Actor::System, at(1));
        violation.status = Some(ViolationStatus::Open);
        violation.runtime_target_version = Some(RuntimeTarget {
            runtime_type: RuntimeType::Jdk,
            version: "17".to_string(),
            operator: VersionOperator::GreaterEqual,
        });
        violation.dependency_violations = vec![
            DependencyViolation::new(
                DependencyTarget {
                    artefact: "org.springframework.boot:spring-boot-starter-web".to_string(),
                    version: "2.7.18".to_string(),
                    operator: VersionOperator::GreaterEqual,
                },
                DependencyTarget {
                    artefact: "org.springframework.boot".to_string(),
                    version: "3.2.0".to_string(),
                    operator: VersionOperator::GreaterEqual,
                },
            )
            .unwrap(),
        ];
        violation
    }

    #[test]
    fn save_and_get_component() {
        let (_temp_dir, store) = create_test_store();
        let snapshot = component("c-1", ProgramLanguage::Java);

        store.save_components(&[snapshot.clone()]).unwrap();

        assert_eq!(store.get_component("c-1").unwrap(), Some(snapshot));
        assert_eq!(store.get_component("missing").unwrap(), None);
    }

    #[test]
    fn save_components_replaces_existing_snapshot() {
        let (_temp_dir, store) = create_test_store();
        let mut snapshot = component("c-1", ProgramLanguage::Java);
        store.save_components(&[snapshot.clone()]).unwrap();

        snapshot.runtime = None;
        store.save_components(&[snapshot.clone()]).unwrap();

        assert_eq!(store.get_component("c-1").unwrap().unwrap().runtime, None);
        assert_eq!(store.list_components().unwrap().len(), 1);
    }

    #[test]
    fn list_components_returns_refs_in_id_order() {
        let (_temp_dir, store) = create_test_store();
        store
            .save_components(&[
                component("c-2", ProgramLanguage::Java),
                component("c-1", ProgramLanguage::Python),
            ])
            .unwrap();

        let refs = store.list_components().unwrap();

        assert_eq!(
            refs,
            vec![
                ComponentRef {
                    id: "c-1".to_string(),
                    component_id: "c-1-name".to_string(),
                },
                ComponentRef {
                    id: "c-2".to_string(),
                    component_id: "c-2-name".to_string(),
                },
            ]
        );
    }

    #[rstest]
    #[case(ProgramLanguage::Java, &[RuleStatus::Draft, RuleStatus::Active], vec!["r-active", "r-draft"])]
    #[case(ProgramLanguage::Java, &[RuleStatus::Active], vec!["r-active"])]
    #[case(ProgramLanguage::Java, &[RuleStatus::Archived], vec!["r-archived"])]
    #[case(ProgramLanguage::Python, &[RuleStatus::Draft, RuleStatus::Active], vec!["r-python"])]
    #[case(ProgramLanguage::Java, &[], vec![])]
    fn find_rules_filters_by_language_and_status(
        #[case] language: ProgramLanguage,
        #[case] statuses: &[RuleStatus],
        #[case] expected: Vec<&str>,
    ) {
        let (_temp_dir, store) = create_test_store();
        for rule in [
            rule("r-active", ProgramLanguage::Java, RuleStatus::Active),
            rule("r-draft", ProgramLanguage::Java, RuleStatus::Draft),
            rule("r-archived", ProgramLanguage::Java, RuleStatus::Archived),
            rule("r-python", ProgramLanguage::Python, RuleStatus::Active),
        ] {
            store.save_rule(&rule).unwrap();
        }

        let ids: Vec<_> = store
            .find_rules(language, statuses)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();

        assert_eq!(ids, expected);
    }

    #[test]
    fn save_rule_round_trips_and_updates_in_place() {
        let (_temp_dir, store) = create_test_store();
        let mut saved = rule("r-1", ProgramLanguage::Java, RuleStatus::Draft);
        store.save_rule(&saved).unwrap();
        assert_eq!(store.get_rule("r-1").unwrap(), Some(saved.clone()));

        saved.status = RuleStatus::Active;
        saved.updated_by = Actor::user("alice");
        saved.updated_at = at(2);
        store.save_rule(&saved).unwrap();

        assert_eq!(store.get_rule("r-1").unwrap(), Some(saved));
        assert_eq!(store.get_rule("missing").unwrap(), None);
    }

    #[test]
    fn upsert_violations_inserts_and_assigns_id() {
        let (_temp_dir, store) = create_test_store();
        let violation = open_violation("r-1", "c-1");

        store.upsert_violations(&[violation.clone()]).unwrap();

        let found = store.find_violation("r-1", "c-1").unwrap().unwrap();
        assert!(found.id.is_some());
        assert_eq!(Violation { id: None, ..found.clone() }, violation);
        assert_eq!(store.get_violation(found.id.unwrap()).unwrap(), Some(found));
    }

    #[test]
    fn upsert_violations_keeps_one_record_per_rule_and_component() {
        let (_temp_dir, store) = create_test_store();
        store.upsert_violations(&[open_violation("r-1", "c-1")]).unwrap();
        let first = store.find_violation("r-1", "c-1").unwrap().unwrap();

        let mut resolved = open_violation("r-1", "c-1");
        resolved.created_at = at(5);
        resolved.set_status(ViolationStatus::Resolved, Actor::user("bob"), at(3));
        store.upsert_violations(&[resolved]).unwrap();

        let all = store.find_violations(&ViolationFilter::default()).unwrap();
        assert_eq!(all.len(), 1);
        let stored = &all[0];
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.status, Some(ViolationStatus::Resolved));
        assert_eq!(stored.resolved_at, Some(at(3)));
        assert_eq!(stored.updated_by, Actor::user("bob"));
        assert_eq!(stored.created_at, at(1));
    }

    #[test]
    fn upsert_violations_rejects_unevaluated_record() {
        let (_temp_dir, store) = create_test_store();
        let violation = Violation::new("r-1", "c-1", Actor::System, at(1));

        let result = store.upsert_violations(&[open_violation("r-2", "c-1"), violation]);

        assert!(matches!(result, Err(StoreError::Unevaluated { .. })));
        // The batch is atomic
        assert!(store.find_violation("r-2", "c-1").unwrap().is_none());
    }

    #[test]
    fn find_violations_applies_filter() {
        let (_temp_dir, store) = create_test_store();
        let mut ignored = open_violation("r-2", "c-1");
        ignored.status = Some(ViolationStatus::Ignored);
        store
            .upsert_violations(&[
                open_violation("r-1", "c-1"),
                open_violation("r-1", "c-2"),
                ignored,
            ])
            .unwrap();

        let by_rule = store
            .find_violations(&ViolationFilter {
                rule_id: Some("r-1".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_rule.len(), 2);

        let open_for_c1 = store
            .find_violations(&ViolationFilter {
                component_id: Some("c-1".to_string()),
                status: Some(ViolationStatus::Open),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(open_for_c1.len(), 1);
        assert_eq!(open_for_c1[0].rule_id, "r-1");
    }

    #[test]
    fn reopening_database_keeps_schema_version() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        {
            let store = SqliteStore::new(&db_path).unwrap();
            store.upsert_violations(&[open_violation("r-1", "c-1")]).unwrap();
        }

        let store = SqliteStore::new(&db_path).unwrap();
        let version: i32 = store
            .lock_conn()
            .unwrap()
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();

        assert_eq!(version, MIGRATIONS.len() as i32);
        assert!(store.find_violation("r-1", "c-1").unwrap().is_some());
    }
}
