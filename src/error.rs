use thiserror::Error;

/// Errors raised while building domain values (rules, violations, enum names)
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Dependency artefacts do not match: current={current}, target={target}")]
    ArtefactMismatch { current: String, target: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Refusing to persist unevaluated violation for rule {rule_id} / component {component_id}")]
    Unevaluated {
        rule_id: String,
        component_id: String,
    },
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    #[error("Violation not found: {0}")]
    ViolationNotFound(i64),

    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),

    #[error("Scan task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
