use crate::updater::orchestrator::{TimerOutcome, UpdateOrchestrator};
use crate::updater::schedule::Cadence;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// The recurring update timer. Can be paused without affecting forced updates.
pub struct UpdateSchedule {
    cadence: Cadence,
    enabled: AtomicBool,
}

impl UpdateSchedule {
    pub fn new(cadence: Cadence) -> Self {
        Self {
            cadence,
            enabled: AtomicBool::new(true),
        }
    }

    pub fn cadence(&self) -> &Cadence {
        &self.cadence
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Fires the orchestrator on every cadence tick until `shutdown` resolves.
    pub async fn run(
        &self,
        orchestrator: Arc<UpdateOrchestrator>,
        shutdown: impl Future<Output = ()>,
    ) {
        tokio::pin!(shutdown);
        info!("Update timer started ({})", self.cadence);

        loop {
            let now = Utc::now();
            let Some(next) = self.cadence.next_after(now) else {
                warn!("Schedule {} never fires again, timer stopped", self.cadence);
                return;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            debug!("Next scheduled update at {}", next);

            tokio::select! {
                _ = sleep(wait) => {}
                _ = &mut shutdown => break,
            }

            if !self.is_enabled() {
                debug!("Timer disabled, tick skipped");
                continue;
            }

            tokio::select! {
                outcome = orchestrator.on_timer() => {
                    if let TimerOutcome::Failed(e) = outcome {
                        debug!("Scheduled update failed: {}", e);
                    }
                }
                _ = &mut shutdown => break,
            }
        }

        info!("Updates stopped");
    }
}
