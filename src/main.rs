use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use evergreen_scan::config::AppConfig;
use evergreen_scan::logging::init_logging;
use evergreen_scan::model::{Actor, ComponentSnapshot, Rule, RuleStatus, ViolationStatus};
use evergreen_scan::scan::{Scanner, manual, run_periodic};
use evergreen_scan::store::{SqliteStore, ViolationFilter, ViolationStore};

type SqliteScanner = Scanner<SqliteStore, SqliteStore, SqliteStore>;

#[derive(Parser)]
#[command(name = "evergreen")]
#[command(version, about = "Evergreen compliance rule violation scanner")]
struct Cli {
    /// Config file (defaults to <data_dir>/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overrides database.path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan all components periodically until interrupted
    Run,
    /// Scan all components once, or a single component
    Scan {
        #[arg(long)]
        component: Option<String>,
    },
    /// Load components or rules from a JSON array file
    Import {
        #[command(subcommand)]
        target: ImportTarget,
    },
    Violation {
        #[command(subcommand)]
        action: ViolationAction,
    },
    Rule {
        #[command(subcommand)]
        action: RuleAction,
    },
}

#[derive(Subcommand)]
enum ImportTarget {
    Components {
        file: PathBuf,
    },
    Rules {
        file: PathBuf,
        #[arg(long, default_value = "System")]
        actor: String,
    },
}

#[derive(Subcommand)]
enum ViolationAction {
    /// Set the status of one violation
    SetStatus {
        id: i64,
        status: ViolationStatus,
        #[arg(long)]
        actor: String,
    },
    /// Resolve all OPEN violations of a rule in a component
    ResolveAll {
        #[arg(long)]
        rule: String,
        #[arg(long)]
        component: String,
        #[arg(long)]
        actor: String,
    },
    /// Print violations as JSON lines
    List {
        #[arg(long)]
        rule: Option<String>,
        #[arg(long)]
        component: Option<String>,
        #[arg(long)]
        status: Option<ViolationStatus>,
    },
}

#[derive(Subcommand)]
enum RuleAction {
    SetStatus {
        id: String,
        status: RuleStatus,
        #[arg(long)]
        actor: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database.path = Some(db);
    }
    let _guard = init_logging(&config.log)?;

    let store = Arc::new(open_store(&config.db_path())?);

    match cli.command {
        Command::Run => runtime()?.block_on(async {
            run_periodic(scanner(&store), &config.scan, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
            })
            .await;
        }),
        Command::Scan {
            component: Some(id),
        } => {
            let written = scanner(&store).scan_component(&id)?;
            println!("{written}");
        }
        Command::Scan { component: None } => {
            let summary = runtime()?.block_on(scanner(&store).scan_all(config.scan.concurrency))?;
            println!("{}", serde_json::to_string(&summary)?);
        }
        Command::Import { target } => import(&store, target)?,
        Command::Violation { action } => violation(&store, action)?,
        Command::Rule {
            action: RuleAction::SetStatus { id, status, actor },
        } => {
            let rule = manual::update_rule_status(
                store.as_ref(),
                &id,
                status,
                Actor::from(actor),
                Utc::now(),
            )?;
            println!("{}", serde_json::to_string(&rule)?);
        }
    }

    Ok(())
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

fn open_store(path: &Path) -> anyhow::Result<SqliteStore> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    info!("Opening database {}", path.display());
    Ok(SqliteStore::new(path)?)
}

fn scanner(store: &Arc<SqliteStore>) -> SqliteScanner {
    Scanner::new(Arc::clone(store), Arc::clone(store), Arc::clone(store))
}

fn import(store: &SqliteStore, target: ImportTarget) -> anyhow::Result<()> {
    match target {
        ImportTarget::Components { file } => {
            let components: Vec<ComponentSnapshot> = read_json(&file)?;
            store.save_components(&components)?;
            println!("{}", components.len());
        }
        ImportTarget::Rules { file, actor } => {
            let rules: Vec<Rule> = read_json(&file)?;
            let actor = Actor::from(actor);
            let now = Utc::now();
            let count = rules.len();
            for rule in rules {
                manual::save_rule(store, rule, actor.clone(), now)?;
            }
            println!("{count}");
        }
    }
    Ok(())
}

fn violation(store: &SqliteStore, action: ViolationAction) -> anyhow::Result<()> {
    match action {
        ViolationAction::SetStatus { id, status, actor } => {
            let violation =
                manual::update_violation_status(store, id, status, Actor::from(actor), Utc::now())?;
            println!("{}", serde_json::to_string(&violation)?);
        }
        ViolationAction::ResolveAll {
            rule,
            component,
            actor,
        } => {
            let resolved = manual::resolve_all_violations_for_rule(
                store,
                &rule,
                &component,
                Actor::from(actor),
                Utc::now(),
            )?;
            println!("{resolved}");
        }
        ViolationAction::List {
            rule,
            component,
            status,
        } => {
            let filter = ViolationFilter {
                rule_id: rule,
                component_id: component,
                status,
            };
            for violation in store.find_violations(&filter)? {
                println!("{}", serde_json::to_string(&violation)?);
            }
        }
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}
