//! Long-Running Operations
//!
//! Named background work with pollable status. Each operation runs on its
//! own tokio task; the service only keeps a registry of what was started,
//! where it is, and what it produced.
//!
//! Results are type-erased in the registry and recovered with
//! [`LongRunningOperationService::get_result`], which checks the type the
//! caller asks for.
//!
//! Finished operations are kept for a retention period (one hour by default)
//! and pruned the next time an operation is started.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

const DEFAULT_RETENTION_SECS: i64 = 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LongRunningOperationStatus {
    NotFound,
    Enqueued,
    Running,
    Completed,
    Failed,
}

impl LongRunningOperationStatus {
    /// Enqueued or running
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Enqueued | Self::Running)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LongRunningOperationError {
    #[error("An operation named '{0}' is already running")]
    AlreadyRunning(String),

    #[error("Operation {0} not found")]
    NotFound(Uuid),

    #[error("Operation {0} has not completed yet")]
    Pending(Uuid),

    #[error("Operation {id} failed: {message}")]
    Failed { id: Uuid, message: String },

    #[error("Result of operation {0} has a different type")]
    ResultTypeMismatch(Uuid),
}

struct OperationRecord {
    name: String,
    status: LongRunningOperationStatus,
    result: Option<Arc<dyn Any + Send + Sync>>,
    error: Option<String>,
    finished_at: Option<DateTime<Utc>>,
}

impl OperationRecord {
    fn is_expired(&self, now: DateTime<Utc>, retention: chrono::Duration) -> bool {
        self.finished_at
            .map(|finished| now - finished >= retention)
            .unwrap_or(false)
    }
}

type Registry = Arc<RwLock<HashMap<Uuid, OperationRecord>>>;

#[derive(Clone)]
pub struct LongRunningOperationService {
    operations: Registry,
    retention: chrono::Duration,
}

impl Default for LongRunningOperationService {
    fn default() -> Self {
        Self::with_retention(chrono::Duration::seconds(DEFAULT_RETENTION_SECS))
    }
}

impl LongRunningOperationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep finished operations for `retention` before pruning them
    pub fn with_retention(retention: chrono::Duration) -> Self {
        Self {
            operations: Registry::default(),
            retention,
        }
    }

    /// Start `work` in the background
    ///
    /// # Returns
    ///
    /// The handle to poll with, or `AlreadyRunning` when an operation with the
    /// same name is still enqueued or running and `allow_concurrent` is false.
    pub async fn run<T, E, F>(
        &self,
        name: &str,
        work: F,
        allow_concurrent: bool,
    ) -> Result<Uuid, LongRunningOperationError>
    where
        T: Send + Sync + 'static,
        E: Display + Send + 'static,
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let id = Uuid::new_v4();
        {
            let mut operations = self.operations.write().await;
            let now = Utc::now();
            let before = operations.len();
            operations.retain(|_, op| !op.is_expired(now, self.retention));
            if operations.len() < before {
                debug!("Pruned {} finished operations", before - operations.len());
            }

            if !allow_concurrent
                && operations
                    .values()
                    .any(|op| op.name == name && op.status.is_active())
            {
                debug!("Operation '{}' already running, not starting another", name);
                return Err(LongRunningOperationError::AlreadyRunning(name.to_string()));
            }
            operations.insert(
                id,
                OperationRecord {
                    name: name.to_string(),
                    status: LongRunningOperationStatus::Enqueued,
                    result: None,
                    error: None,
                    finished_at: None,
                },
            );
        }

        let operations = Arc::clone(&self.operations);
        let name = name.to_string();
        tokio::spawn(async move {
            set_status(&operations, id, LongRunningOperationStatus::Running).await;

            // a panicking operation must still end up Failed
            let outcome = tokio::spawn(work).await;

            let mut registry = operations.write().await;
            let Some(record) = registry.get_mut(&id) else {
                return;
            };
            record.finished_at = Some(Utc::now());
            match outcome {
                Ok(Ok(value)) => {
                    record.status = LongRunningOperationStatus::Completed;
                    record.result = Some(Arc::new(value));
                    info!("Operation '{}' ({}) completed", name, id);
                }
                Ok(Err(e)) => {
                    record.status = LongRunningOperationStatus::Failed;
                    record.error = Some(e.to_string());
                    warn!("Operation '{}' ({}) failed: {}", name, id, e);
                }
                Err(e) => {
                    record.status = LongRunningOperationStatus::Failed;
                    record.error = Some(e.to_string());
                    warn!("Operation '{}' ({}) aborted: {}", name, id, e);
                }
            }
        });

        Ok(id)
    }

    pub async fn get_status(&self, id: Uuid) -> LongRunningOperationStatus {
        self.operations
            .read()
            .await
            .get(&id)
            .map(|op| op.status)
            .unwrap_or(LongRunningOperationStatus::NotFound)
    }

    /// Name the operation was started with
    pub async fn get_name(&self, id: Uuid) -> Option<String> {
        self.operations
            .read()
            .await
            .get(&id)
            .map(|op| op.name.clone())
    }

    /// The value a completed operation produced
    pub async fn get_result<T: Clone + 'static>(
        &self,
        id: Uuid,
    ) -> Result<T, LongRunningOperationError> {
        let operations = self.operations.read().await;
        let record = operations
            .get(&id)
            .ok_or(LongRunningOperationError::NotFound(id))?;

        match record.status {
            LongRunningOperationStatus::Completed => record
                .result
                .as_ref()
                .and_then(|value| value.downcast_ref::<T>())
                .cloned()
                .ok_or(LongRunningOperationError::ResultTypeMismatch(id)),
            LongRunningOperationStatus::Failed => Err(LongRunningOperationError::Failed {
                id,
                message: record.error.clone().unwrap_or_default(),
            }),
            LongRunningOperationStatus::NotFound => Err(LongRunningOperationError::NotFound(id)),
            LongRunningOperationStatus::Enqueued | LongRunningOperationStatus::Running => {
                Err(LongRunningOperationError::Pending(id))
            }
        }
    }

    /// Poll until the operation is no longer enqueued or running
    pub async fn wait(&self, id: Uuid) -> LongRunningOperationStatus {
        loop {
            let status = self.get_status(id).await;
            if !status.is_active() {
                return status;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

async fn set_status(operations: &Registry, id: Uuid, status: LongRunningOperationStatus) {
    if let Some(record) = operations.write().await.get_mut(&id) {
        record.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_completed_result_is_typed() {
        let service = LongRunningOperationService::new();
        let id = service
            .run("count", async { Ok::<_, String>(42usize) }, false)
            .await
            .unwrap();

        assert_eq!(service.wait(id).await, LongRunningOperationStatus::Completed);
        assert_eq!(service.get_result::<usize>(id).await, Ok(42));
        assert_eq!(
            service.get_result::<String>(id).await,
            Err(LongRunningOperationError::ResultTypeMismatch(id))
        );
    }

    #[tokio::test]
    async fn test_failure_is_reported() {
        let service = LongRunningOperationService::new();
        let id = service
            .run("broken", async { Err::<(), _>("disk full") }, false)
            .await
            .unwrap();

        assert_eq!(service.wait(id).await, LongRunningOperationStatus::Failed);
        assert_eq!(
            service.get_result::<()>(id).await,
            Err(LongRunningOperationError::Failed {
                id,
                message: "disk full".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_same_name_rejected_while_running() {
        let service = LongRunningOperationService::new();
        let (release, gate) = oneshot::channel::<()>();
        let first = service
            .run(
                "branch",
                async move {
                    let _ = gate.await;
                    Ok::<_, String>(())
                },
                false,
            )
            .await
            .unwrap();

        let second = service
            .run("branch", async { Ok::<_, String>(()) }, false)
            .await;
        assert_eq!(
            second,
            Err(LongRunningOperationError::AlreadyRunning("branch".to_string()))
        );
        assert_eq!(
            service.get_result::<()>(first).await,
            Err(LongRunningOperationError::Pending(first))
        );

        // concurrency allowed: a second run starts anyway
        let concurrent = service
            .run("branch", async { Ok::<_, String>(()) }, true)
            .await
            .unwrap();

        release.send(()).unwrap();
        assert_eq!(service.wait(first).await, LongRunningOperationStatus::Completed);
        assert_eq!(service.wait(concurrent).await, LongRunningOperationStatus::Completed);
        assert!(service
            .run("branch", async { Ok::<_, String>(()) }, false)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_finished_operations_are_pruned() {
        let service = LongRunningOperationService::with_retention(chrono::Duration::zero());
        let first = service
            .run("first", async { Ok::<_, String>(1usize) }, false)
            .await
            .unwrap();
        assert_eq!(service.wait(first).await, LongRunningOperationStatus::Completed);
        assert_eq!(service.get_name(first).await.as_deref(), Some("first"));

        let (release, gate) = oneshot::channel::<()>();
        let second = service
            .run(
                "second",
                async move {
                    let _ = gate.await;
                    Ok::<_, String>(2usize)
                },
                false,
            )
            .await
            .unwrap();

        assert_eq!(service.get_status(first).await, LongRunningOperationStatus::NotFound);
        assert_eq!(
            service.get_result::<usize>(first).await,
            Err(LongRunningOperationError::NotFound(first))
        );

        // a running operation is never pruned
        service
            .run("third", async { Ok::<_, String>(3usize) }, true)
            .await
            .unwrap();
        assert!(service.get_status(second).await.is_active());

        release.send(()).unwrap();
        assert_eq!(service.wait(second).await, LongRunningOperationStatus::Completed);
        assert_eq!(service.get_result::<usize>(second).await, Ok(2));
    }

    #[tokio::test]
    async fn test_default_retention_keeps_results() {
        let service = LongRunningOperationService::new();
        let first = service
            .run("first", async { Ok::<_, String>(1usize) }, false)
            .await
            .unwrap();
        service.wait(first).await;
        service
            .run("second", async { Ok::<_, String>(2usize) }, false)
            .await
            .unwrap();

        assert_eq!(service.get_result::<usize>(first).await, Ok(1));
    }

    #[tokio::test]
    async fn test_unknown_handle() {
        let service = LongRunningOperationService::new();
        let id = Uuid::new_v4();
        assert_eq!(service.get_status(id).await, LongRunningOperationStatus::NotFound);
        assert_eq!(
            service.get_result::<()>(id).await,
            Err(LongRunningOperationError::NotFound(id))
        );
    }
}
