//! Component snapshots consumed by the scanner

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Programming language a component is written in; rules are scoped by it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgramLanguage {
    Java,
    Python,
    Nodejs,
    React,
    Vue,
    Angular,
    Javascript,
    Unknown,
}

impl ProgramLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramLanguage::Java => "JAVA",
            ProgramLanguage::Python => "PYTHON",
            ProgramLanguage::Nodejs => "NODEJS",
            ProgramLanguage::React => "REACT",
            ProgramLanguage::Vue => "VUE",
            ProgramLanguage::Angular => "ANGULAR",
            ProgramLanguage::Javascript => "JAVASCRIPT",
            ProgramLanguage::Unknown => "UNKNOWN",
        }
    }
}

impl FromStr for ProgramLanguage {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "JAVA" => Ok(ProgramLanguage::Java),
            "PYTHON" => Ok(ProgramLanguage::Python),
            "NODEJS" => Ok(ProgramLanguage::Nodejs),
            "REACT" => Ok(ProgramLanguage::React),
            "VUE" => Ok(ProgramLanguage::Vue),
            "ANGULAR" => Ok(ProgramLanguage::Angular),
            "JAVASCRIPT" => Ok(ProgramLanguage::Javascript),
            "UNKNOWN" => Ok(ProgramLanguage::Unknown),
            _ => Err(ModelError::Validation(format!("unknown language: {s}"))),
        }
    }
}

/// Runtime a component runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeType {
    Jdk,
    Python,
    NodeJs,
    Go,
    Dotnet,
    Php,
    Kotlin,
    Scala,
    Groovy,
    Unknown,
}

impl RuntimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeType::Jdk => "JDK",
            RuntimeType::Python => "PYTHON",
            RuntimeType::NodeJs => "NODE_JS",
            RuntimeType::Go => "GO",
            RuntimeType::Dotnet => "DOTNET",
            RuntimeType::Php => "PHP",
            RuntimeType::Kotlin => "KOTLIN",
            RuntimeType::Scala => "SCALA",
            RuntimeType::Groovy => "GROOVY",
            RuntimeType::Unknown => "UNKNOWN",
        }
    }
}

impl FromStr for RuntimeType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "JDK" => Ok(RuntimeType::Jdk),
            "PYTHON" => Ok(RuntimeType::Python),
            "NODE_JS" => Ok(RuntimeType::NodeJs),
            "GO" => Ok(RuntimeType::Go),
            "DOTNET" => Ok(RuntimeType::Dotnet),
            "PHP" => Ok(RuntimeType::Php),
            "KOTLIN" => Ok(RuntimeType::Kotlin),
            "SCALA" => Ok(RuntimeType::Scala),
            "GROOVY" => Ok(RuntimeType::Groovy),
            "UNKNOWN" => Ok(RuntimeType::Unknown),
            _ => Err(ModelError::Validation(format!("unknown runtime type: {s}"))),
        }
    }
}

/// Observed runtime of a component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeInfo {
    #[serde(rename = "type")]
    pub runtime_type: RuntimeType,
    pub version: String,
}

/// One entry of a component's dependency manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    /// For maven this is `groupId:artifactId`
    pub artefact: String,
    /// Empty when the manifest does not pin a version
    #[serde(default)]
    pub version: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub dependency_type: Option<String>,
}

/// Lightweight handle used to enumerate components for a sweep
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentRef {
    /// Storage id of the snapshot
    pub id: String,
    /// Logical component name
    pub component_id: String,
}

/// Read-only snapshot of a tracked component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSnapshot {
    pub id: String,
    pub component_id: String,
    #[serde(default)]
    pub branch: String,
    pub language: ProgramLanguage,
    #[serde(default, rename = "runtimeInfo")]
    pub runtime: Option<RuntimeInfo>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl ComponentSnapshot {
    pub fn component_ref(&self) -> ComponentRef {
        ComponentRef {
            id: self.id.clone(),
            component_id: self.component_id.clone(),
        }
    }
}
