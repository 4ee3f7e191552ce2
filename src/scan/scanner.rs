//! Component scans: evaluate every applicable rule and persist the results

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::ScanError;
use crate::model::RuleStatus;
use crate::scan::evaluator::evaluate;
use crate::store::{ComponentSource, RuleStore, ViolationStore};

/// Totals for one sweep over all components
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub batch_id: String,
    /// Components whose scan completed
    pub scanned: usize,
    /// Components whose scan failed and was skipped
    pub failed: usize,
    /// Violation records written across all components
    pub violations_written: usize,
}

/// Runs rule evaluation against stored components
pub struct Scanner<C, R, V> {
    components: Arc<C>,
    rules: Arc<R>,
    violations: Arc<V>,
}

// Manual impl: cloning only clones the Arcs
impl<C, R, V> Clone for Scanner<C, R, V> {
    fn clone(&self) -> Self {
        Self {
            components: Arc::clone(&self.components),
            rules: Arc::clone(&self.rules),
            violations: Arc::clone(&self.violations),
        }
    }
}

impl<C, R, V> Scanner<C, R, V>
where
    C: ComponentSource,
    R: RuleStore,
    V: ViolationStore,
{
    pub fn new(components: Arc<C>, rules: Arc<R>, violations: Arc<V>) -> Self {
        Self {
            components,
            rules,
            violations,
        }
    }

    /// Scan one component and persist the resulting violations as one batch
    ///
    /// Returns the number of violation records written. A missing component is
    /// an error; a component with nothing to report is not.
    pub fn scan_component(&self, id: &str) -> Result<usize, ScanError> {
        info!("Starting violation scan for component {}", id);

        let component = self
            .components
            .get_component(id)?
            .ok_or_else(|| ScanError::ComponentNotFound(id.to_string()))?;

        let rules = self
            .rules
            .find_rules(component.language, &RuleStatus::SCANNABLE)?;
        info!(
            "Found {} rules for component language {}",
            rules.len(),
            component.language.as_str()
        );

        let now = Utc::now();
        let mut results = Vec::new();

        for rule in &rules {
            debug!(
                "Checking rule: id={}, name={}, status={}",
                rule.id,
                rule.name,
                rule.status.as_str()
            );

            let existing = self.violations.find_violation(&rule.id, &component.id)?;
            if let Some(violation) = evaluate(rule, &component, existing, now)? {
                info!(
                    "Found violation for rule: id={}, status={:?}",
                    rule.id, violation.status
                );
                results.push(violation);
            }
        }

        if results.is_empty() {
            info!("No violations found for component {}", id);
            return Ok(0);
        }

        self.violations.upsert_violations(&results)?;
        info!("Saved {} violations for component {}", results.len(), id);

        Ok(results.len())
    }

    /// Scan every component with at most `concurrency` scans in flight
    ///
    /// Each component is handled by exactly one worker. Failures are logged and
    /// counted; they never stop the sweep.
    pub async fn scan_all(&self, concurrency: usize) -> Result<ScanSummary, ScanError> {
        let batch_id = format!("{:x}", Utc::now().timestamp_millis());
        info!("Starting rule violation scan, batchId: {}", batch_id);

        let mut components = self.components.list_components()?;
        let mut seen = HashSet::new();
        components.retain(|component| seen.insert(component.id.clone()));

        if components.is_empty() {
            info!(
                "No components found for rule violation scan, batchId: {}",
                batch_id
            );
            return Ok(ScanSummary {
                batch_id,
                ..Default::default()
            });
        }
        info!(
            "Found {} components to scan for rule violations, batchId: {}",
            components.len(),
            batch_id
        );

        let outcomes: Vec<_> = stream::iter(components)
            .map(|component| {
                let scanner = self.clone();
                async move {
                    let id = component.id.clone();
                    let outcome =
                        tokio::task::spawn_blocking(move || scanner.scan_component(&component.id))
                            .await
                            .map_err(|e| ScanError::Task(e.to_string()))
                            .and_then(|result| result);
                    (id, outcome)
                }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut summary = ScanSummary {
            batch_id,
            ..Default::default()
        };
        for (id, outcome) in outcomes {
            match outcome {
                Ok(written) => {
                    summary.scanned += 1;
                    summary.violations_written += written;
                }
                Err(e) => {
                    error!("Failed to scan component {} for violations: {}", id, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Completed rule violation scan, batchId: {}, scanned={}, failed={}, written={}",
            summary.batch_id, summary.scanned, summary.failed, summary.violations_written
        );

        Ok(summary)
    }
}
