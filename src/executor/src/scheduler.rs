use std::collections::HashMap;
use std::time::Duration;

use dependency_planner::DependencyGraph;
use indexmap::IndexSet;
use resource_model::{Resource, WarehouseBackend, WarehouseError};
use thiserror::Error;

use crate::retry::RetryBudgets;

#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    pub max_concurrent: usize,
    pub max_retry: u32,
    pub check_frequency: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            max_concurrent: 4,
            max_retry: 3,
            check_frequency: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("retries exhausted submitting '{0}'")]
    RetriesExhausted(String),
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
}

/// Drives `graph` to completion against `backend`, polling and
/// (re)submitting resources until every key is up to date.
///
/// Each tick: the ready set (keys with no remaining pending dependencies)
/// is ordered running-keys-first, then lexicographically within each
/// half, so in-flight jobs get their status checked before new work is
/// considered. Walking that order, the first key that would need a new
/// submission while the concurrency slots are already full stops the
/// tick immediately — remaining ready keys this tick are left for the
/// next one rather than scanned for slack capacity.
pub async fn execute(
    mut graph: DependencyGraph,
    resources: &HashMap<String, Resource>,
    backend: &dyn WarehouseBackend,
    config: ExecutorConfig,
) -> Result<(), ExecutorError> {
    let mut running: IndexSet<String> = IndexSet::new();
    let mut retry_budgets = RetryBudgets::new(config.max_retry);
    let mut dep_update_times: HashMap<String, i64> = HashMap::new();

    while !graph.is_empty() {
        let ordered = ordered_ready(&graph, &running);
        let mut completed = Vec::new();

        for key in &ordered {
            let resource = resources.get(key).expect("ready key must have a matching resource");

            if running.contains(key) {
                if resource.is_running(backend).await? {
                    continue;
                }
                running.shift_remove(key);
            }

            if resource.exists(backend).await? {
                if resource.should_update(backend).await? {
                    if !try_submit(key, resource, backend, &mut running, &mut retry_budgets, config.max_concurrent).await? {
                        break;
                    }
                    continue;
                }
                let self_time = resource.update_time(backend).await?.unwrap_or(i64::MIN);
                let dep_time = dep_update_times.get(key).copied().unwrap_or(i64::MIN);
                if self_time < dep_time {
                    if !try_submit(key, resource, backend, &mut running, &mut retry_budgets, config.max_concurrent).await? {
                        break;
                    }
                    continue;
                }
                completed.push(key.clone());
            } else {
                if !try_submit(key, resource, backend, &mut running, &mut retry_budgets, config.max_concurrent).await? {
                    break;
                }
            }
        }

        for key in &completed {
            running.shift_remove(key);
            graph.pending.shift_remove(key);
        }
        if !completed.is_empty() {
            for (n, deps) in graph.pending.iter_mut() {
                for key in &completed {
                    if deps.shift_remove(key) {
                        let completed_resource = resources.get(key).expect("completed key must have a matching resource");
                        let completed_time = completed_resource.update_time(backend).await?.unwrap_or(i64::MIN);
                        let slot = dep_update_times.entry(n.clone()).or_insert(i64::MIN);
                        *slot = (*slot).max(completed_time);
                    }
                }
            }
        }

        if !graph.is_empty() && !running.is_empty() {
            tokio::time::sleep(config.check_frequency).await;
        }
    }

    Ok(())
}

/// Attempts to submit `key` for (re)materialization if a concurrency slot
/// is available. Returns `Ok(false)` when the slot check fails, signaling
/// the caller to break out of this tick's scan rather than try the
/// remaining ready keys. A retryable failure from `create()` leaves the
/// key un-added to `running` so it is reconsidered next tick.
async fn try_submit(
    key: &str,
    resource: &Resource,
    backend: &dyn WarehouseBackend,
    running: &mut IndexSet<String>,
    retry_budgets: &mut RetryBudgets,
    max_concurrent: usize,
) -> Result<bool, ExecutorError> {
    if running.len() >= max_concurrent {
        return Ok(false);
    }
    if retry_budgets.try_consume(key).is_err() {
        return Err(ExecutorError::RetriesExhausted(key.to_string()));
    }
    match resource.create(backend).await {
        Ok(_job) => {
            running.insert(key.to_string());
            Ok(true)
        }
        Err(err) if err.is_retryable() => {
            tracing::warn!(key, %err, "retryable failure creating resource, will retry next tick");
            Ok(true)
        }
        Err(err) => Err(ExecutorError::Warehouse(err)),
    }
}

fn ordered_ready(graph: &DependencyGraph, running: &IndexSet<String>) -> Vec<String> {
    let (mut running_ready, mut other_ready): (Vec<String>, Vec<String>) =
        graph.ready_keys().into_iter().partition(|k| running.contains(k));
    running_ready.sort();
    other_ready.sort();
    running_ready.into_iter().chain(other_ready).collect()
}
