use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use todochain_store::TodoStore;
use todochain_types::{time, Todo};

use crate::backoff::RetryPolicy;
use crate::config::SweeperConfig;
use crate::error::SyncResult;
use crate::orchestrator::{SyncOrchestrator, SyncOutcome};

/// Counters of one sweeper run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Todos returned by the selection queries.
    pub scanned: usize,
    /// Sync attempts actually run.
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Skipped for backoff or because an attempt was already in flight.
    pub deferred: usize,
}

impl SweepReport {
    fn merge(&mut self, other: SweepReport) {
        self.scanned += other.scanned;
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.deferred += other.deferred;
    }
}

/// Periodically retries failed syncs and picks up abandoned pending ones.
///
/// Retries go through [`SyncOrchestrator::try_sync`], the same attempt logic
/// as the write path. The retry cap is enforced by the selection query.
pub struct RetrySweeper {
    orchestrator: SyncOrchestrator,
    store: Arc<dyn TodoStore>,
    policy: RetryPolicy,
    config: SweeperConfig,
}

impl RetrySweeper {
    pub fn new(
        orchestrator: SyncOrchestrator,
        store: Arc<dyn TodoStore>,
        policy: RetryPolicy,
        config: SweeperConfig,
    ) -> Self {
        Self {
            orchestrator,
            store,
            policy,
            config,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    /// One pass over failed and stale pending todos.
    pub async fn run_once(&self) -> SyncResult<SweepReport> {
        self.run_once_at(time::now_millis()).await
    }

    /// One pass, judging backoff and staleness as of `now`.
    pub async fn run_once_at(&self, now: DateTime<Utc>) -> SyncResult<SweepReport> {
        let mut report = SweepReport::default();

        let failed = self
            .store
            .list_failed_syncs(self.policy.max_retries(), self.config.batch_size)
            .await?;
        report.merge(self.retry(&failed, now, true).await);

        let stale_after =
            TimeDelta::from_std(self.config.stale_pending_after()).unwrap_or(TimeDelta::MAX);
        if let Some(cutoff) = now.checked_sub_signed(stale_after) {
            let stale = self
                .store
                .list_stale_pending(cutoff, self.config.batch_size)
                .await?;
            report.merge(self.retry(&stale, now, false).await);
        }

        if report.scanned > 0 {
            debug!(
                scanned = report.scanned,
                attempted = report.attempted,
                succeeded = report.succeeded,
                failed = report.failed,
                deferred = report.deferred,
                "sweep finished"
            );
        }
        Ok(report)
    }

    async fn retry(&self, todos: &[Todo], now: DateTime<Utc>, backoff: bool) -> SweepReport {
        let mut report = SweepReport {
            scanned: todos.len(),
            ..SweepReport::default()
        };
        for todo in todos {
            if backoff && !self.policy.is_due(todo, now) {
                report.deferred += 1;
                continue;
            }
            match self.orchestrator.try_sync(todo).await {
                Ok(SyncOutcome::Busy) => report.deferred += 1,
                Ok(outcome) => {
                    report.attempted += 1;
                    if outcome.is_synced() {
                        report.succeeded += 1;
                    } else if matches!(outcome, SyncOutcome::Failed { .. }) {
                        report.failed += 1;
                    }
                }
                Err(e) => {
                    warn!(todo_id = %todo.id, error = %e, "sweeper could not retry todo");
                    report.attempted += 1;
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Run on the configured interval until the returned handle is stopped.
    pub fn start(self: Arc<Self>) -> SweeperHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let interval = self.config.interval();
        info!(?interval, batch_size = self.config.batch_size, "retry sweeper started");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.run_once().await {
                            Ok(report) if report.attempted > 0 => info!(
                                attempted = report.attempted,
                                succeeded = report.succeeded,
                                failed = report.failed,
                                "retry sweep"
                            ),
                            Ok(_) => {}
                            Err(e) => warn!(error = %e, "retry sweep failed"),
                        }
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("retry sweeper stopped");
        });

        SweeperHandle { stop: stop_tx, task }
    }
}

impl std::fmt::Debug for RetrySweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrySweeper")
            .field("policy", &self.policy)
            .field("config", &self.config)
            .finish()
    }
}

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper and wait for its current run to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "retry sweeper task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
