//! Reconciliation loop

use crate::apply::{apply, DryRunEffects, Effects, LiveEffects};
use crate::collect::{collect_actual, collect_desired};
use crate::config::ReconcilerConfig;
use crate::error::{ApplyError, ReconcileError, ReconcileResult};
use crate::plan::{plan, PlanCounts};
use crate::source::DocumentSource;
use chrono::{DateTime, Utc};
use dashsync_grafana::DashboardStore;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::watch;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::Instrument;
use uuid::Uuid;

/// Where the loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Waiting for the document source's initial listing
    WaitingForSync,
    /// A cycle is in flight
    Reconciling,
    /// Waiting for the next tick or change notification
    Idle,
    /// Cancelled, or never synced
    Stopped,
}

/// Outcome of one reconciliation cycle
#[derive(Debug)]
pub struct ReconcileReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub planned: PlanCounts,
    pub errors: Vec<ApplyError>,
}

impl ReconcileReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Drives the dashboard store toward the declared dashboards.
///
/// Cycles never overlap: the loop only considers the next tick once the
/// current cycle has returned.
pub struct ReconciliationLoop {
    config: ReconcilerConfig,
    source: Arc<dyn DocumentSource>,
    store: Arc<dyn DashboardStore>,
    effects: Arc<dyn Effects>,
    state_tx: watch::Sender<LoopState>,
}

impl ReconciliationLoop {
    /// Create a loop with explicit effects
    pub fn new(
        config: ReconcilerConfig,
        source: Arc<dyn DocumentSource>,
        store: Arc<dyn DashboardStore>,
        effects: Arc<dyn Effects>,
    ) -> Self {
        let (state_tx, _) = watch::channel(LoopState::WaitingForSync);
        Self {
            config,
            source,
            store,
            effects,
            state_tx,
        }
    }

    /// Create a loop whose effects follow `config.dry_run`
    pub fn from_config(
        config: ReconcilerConfig,
        source: Arc<dyn DocumentSource>,
        store: Arc<dyn DashboardStore>,
    ) -> Self {
        let effects: Arc<dyn Effects> = if config.dry_run {
            Arc::new(DryRunEffects)
        } else {
            Arc::new(LiveEffects::new(store.clone()))
        };
        Self::new(config, source, store, effects)
    }

    /// Observe state transitions
    pub fn state(&self) -> watch::Receiver<LoopState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: LoopState) {
        self.state_tx.send_replace(state);
    }

    /// Run one full cycle: collect, plan, apply.
    ///
    /// Collection failures abort the cycle and are returned; action failures
    /// are reported in the [`ReconcileReport`].
    pub async fn reconcile_once(&self) -> ReconcileResult<ReconcileReport> {
        let cycle_id = Uuid::new_v4();
        let span = tracing::info_span!("reconcile", cycle = %cycle_id);

        async move {
            let started_at = Utc::now();
            let clock = Instant::now();
            tracing::info!("Reconciling");

            let actual = collect_actual(self.store.as_ref(), &self.config.marker_tag).await?;
            let desired = collect_desired(self.source.as_ref(), &self.config.marker_tag).await?;

            let plan = plan(&actual, desired);
            let planned = plan.counts();
            tracing::info!(
                create = planned.create,
                update = planned.update,
                delete = planned.delete,
                "Planned {} actions",
                planned.total()
            );

            let errors = apply(plan, self.effects.as_ref()).await;
            let report = ReconcileReport {
                cycle_id,
                started_at,
                finished_at: Utc::now(),
                planned,
                errors,
            };

            let elapsed_ms = clock.elapsed().as_millis();
            if report.is_success() {
                tracing::info!(elapsed_ms, "Reconciliation was successful");
            } else {
                tracing::error!(
                    failed = report.errors.len(),
                    planned = planned.total(),
                    elapsed_ms,
                    "Reconciliation finished with failures"
                );
            }
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Run until `shutdown` flips to `true` (or its sender is dropped).
    ///
    /// Returns an error only when the loop never got to reconcile: the
    /// configuration is invalid, or the document source did not sync before
    /// cancellation or the sync timeout.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> ReconcileResult<()> {
        if let Err(e) = self.start(&mut shutdown).await {
            self.set_state(LoopState::Stopped);
            return Err(e);
        }
        tracing::info!(
            marker_tag = %self.config.marker_tag,
            interval_secs = self.config.reconcile_interval_secs,
            dry_run = self.config.dry_run,
            "Document source synced, starting reconciliation"
        );

        let mut changes = self.source.subscribe();
        let mut ticker = interval(self.config.reconcile_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            self.set_state(LoopState::Idle);
            tokio::select! {
                _ = ticker.tick() => {}
                _ = next_change(&mut changes) => {
                    tracing::debug!("Configuration documents changed");
                }
                _ = cancelled(&mut shutdown) => break,
            }

            drain(&mut changes);
            self.set_state(LoopState::Reconciling);
            tokio::select! {
                result = self.reconcile_once() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Reconciliation failed");
                    }
                }
                _ = cancelled(&mut shutdown) => {
                    tracing::warn!("Abandoning in-flight reconciliation");
                    break;
                }
            }
            ticker.reset();
        }

        self.set_state(LoopState::Stopped);
        tracing::info!("Reconciliation loop stopped");
        Ok(())
    }

    async fn start(&self, shutdown: &mut watch::Receiver<bool>) -> ReconcileResult<()> {
        self.config.validate()?;
        self.wait_for_sync(shutdown).await
    }

    async fn wait_for_sync(&self, shutdown: &mut watch::Receiver<bool>) -> ReconcileResult<()> {
        self.set_state(LoopState::WaitingForSync);
        let deadline = self.config.sync_timeout().map(|t| (Instant::now() + t, t));
        let mut poll = interval(self.config.sync_poll_interval());

        loop {
            if self.source.has_synced() {
                return Ok(());
            }
            if let Some((deadline, timeout)) = deadline {
                if Instant::now() >= deadline {
                    return Err(ReconcileError::SyncTimeout(timeout));
                }
            }
            tokio::select! {
                _ = poll.tick() => {}
                _ = cancelled(shutdown) => return Err(ReconcileError::NotSynced),
            }
        }
    }
}

/// Resolves once shutdown is requested or can no longer be requested
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Resolves on the next change notification; pends forever without a stream
async fn next_change(changes: &mut Option<broadcast::Receiver<()>>) {
    let Some(rx) = changes.as_mut() else {
        return std::future::pending().await;
    };
    match rx.recv().await {
        Ok(()) | Err(RecvError::Lagged(_)) => return,
        Err(RecvError::Closed) => {}
    }
    tracing::debug!("Change notifications closed, relying on the interval");
    *changes = None;
    std::future::pending().await
}

/// Coalesce notifications that queued up before a cycle starts
fn drain(changes: &mut Option<broadcast::Receiver<()>>) {
    if let Some(rx) = changes.as_mut() {
        loop {
            match rx.try_recv() {
                Ok(()) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Closed) => {
                    *changes = None;
                    break;
                }
            }
        }
    }
}
