use crate::model::{Snapshot, TransportError, UpdateError};
use crate::parser::Parser;
use crate::scraper::Scraper;
use crate::storage::CacheStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Result of a timer-driven trigger.
#[derive(Debug)]
pub enum TimerOutcome {
    Completed(Arc<Snapshot>),
    Failed(UpdateError),
    /// Another run was in progress; this tick did nothing.
    Coalesced,
}

/// Result of an on-demand trigger.
#[derive(Debug)]
pub enum ForceOutcome {
    Updated(Arc<Snapshot>),
    /// The current snapshot is younger than the freshness threshold.
    Fresh(Arc<Snapshot>),
    Failed {
        previous: Option<Arc<Snapshot>>,
        error: UpdateError,
    },
}

/// Drives fetch -> extract -> build -> publish, one run at a time.
pub struct UpdateOrchestrator {
    scraper: Arc<dyn Scraper>,
    parser: Arc<dyn Parser>,
    store: Arc<CacheStore>,
    source_url: String,
    freshness: Duration,
    run_lock: Mutex<()>,
}

impl UpdateOrchestrator {
    pub fn new(
        scraper: Arc<dyn Scraper>,
        parser: Arc<dyn Parser>,
        store: Arc<CacheStore>,
        source_url: String,
        freshness: Duration,
    ) -> Self {
        Self {
            scraper,
            parser,
            store,
            source_url,
            freshness,
            run_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Runs an update unless one is already in progress.
    pub async fn on_timer(&self) -> TimerOutcome {
        let Ok(_guard) = self.run_lock.try_lock() else {
            info!("⏭ Update already running, tick coalesced");
            return TimerOutcome::Coalesced;
        };

        match self.run_once().await {
            Ok(snapshot) => TimerOutcome::Completed(snapshot),
            Err(e) => {
                report_failure(&e);
                TimerOutcome::Failed(e)
            }
        }
    }

    /// Runs an update on request, waiting for any run in progress first.
    ///
    /// A snapshot younger than the freshness threshold is returned as is,
    /// including one published by the run we waited for.
    pub async fn force(&self) -> ForceOutcome {
        if let Some(snapshot) = self.store.fresh(self.freshness) {
            info!("Snapshot is fresh, skipping forced update");
            return ForceOutcome::Fresh(snapshot);
        }

        let _guard = self.run_lock.lock().await;
        if let Some(snapshot) = self.store.fresh(self.freshness) {
            info!("Snapshot refreshed while waiting, skipping forced update");
            return ForceOutcome::Fresh(snapshot);
        }

        match self.run_once().await {
            Ok(snapshot) => ForceOutcome::Updated(snapshot),
            Err(error) => {
                report_failure(&error);
                ForceOutcome::Failed {
                    previous: self.store.read(),
                    error,
                }
            }
        }
    }

    /// One full run. Callers hold the run lock.
    async fn run_once(&self) -> Result<Arc<Snapshot>, UpdateError> {
        info!("🔄 Updating cache from {}", self.source_url);
        let fetched_at = Utc::now();

        let fetch_started = Instant::now();
        let html = self.scraper.fetch(&self.source_url).await?;
        info!("fetch: {:?}", fetch_started.elapsed());

        let started = Instant::now();
        let fields = self.parser.parse(&html)?;
        info!("parse: {:?}", started.elapsed());

        let snapshot = self
            .store
            .publish(Snapshot::assemble(fields, &self.source_url, fetched_at), fetch_started);
        info!(
            "✅ Cached data: college {}-{}, popular {}-{}, {} regions, reported update {:?}",
            snapshot.college.biden,
            snapshot.college.trump,
            snapshot.popular.biden,
            snapshot.popular.trump,
            snapshot.states.len(),
            snapshot.source.updated
        );
        Ok(snapshot)
    }
}

fn report_failure(error: &UpdateError) {
    match error {
        UpdateError::Transport(TransportError::Timeout) => {
            warn!("⏳ Upstream fetch timed out, keeping previous snapshot")
        }
        UpdateError::Transport(e) => warn!("❌ Fetch failed, keeping previous snapshot: {}", e),
        UpdateError::Extraction(e) => error!("❌ Extraction failed, keeping previous snapshot: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CollegeVotes, ExtractedFields, ExtractionError, PopularVotes};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Serves whatever body it currently holds; `None` is a 503.
    struct MockScraper {
        calls: AtomicUsize,
        body: std::sync::Mutex<Option<String>>,
        gate: Option<Arc<Notify>>,
        latency: Duration,
    }

    impl MockScraper {
        fn new(body: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                body: std::sync::Mutex::new(Some(body.to_string())),
                gate: None,
                latency: Duration::ZERO,
            }
        }

        fn slow(body: &str, latency: Duration) -> Self {
            Self {
                latency,
                ..Self::new(body)
            }
        }

        fn gated(body: &str, gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(body)
            }
        }

        fn set_body(&self, body: Option<&str>) {
            *self.body.lock().unwrap() = body.map(str::to_string);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Scraper for MockScraper {
        async fn fetch(&self, _url: &str) -> Result<String, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            let body = self.body.lock().unwrap().clone();
            body.ok_or(TransportError::Status(503))
        }
    }

    /// Reads `"<biden>,<trump>"`.
    struct StubParser;

    impl Parser for StubParser {
        fn parse(&self, html: &str) -> Result<ExtractedFields, ExtractionError> {
            let invalid = || ExtractionError::InvalidNumber {
                field: "college.biden",
                text: html.to_string(),
            };
            let (biden, trump) = html.split_once(',').ok_or_else(invalid)?;
            Ok(ExtractedFields {
                college: CollegeVotes {
                    biden: biden.parse().map_err(|_| invalid())?,
                    trump: trump.parse().map_err(|_| invalid())?,
                    remaining: None,
                },
                popular: PopularVotes { biden: 0, trump: 0 },
                regions: BTreeMap::new(),
                reported_update: None,
            })
        }
    }

    fn orchestrator(scraper: Arc<MockScraper>) -> Arc<UpdateOrchestrator> {
        Arc::new(UpdateOrchestrator::new(
            scraper,
            Arc::new(StubParser),
            Arc::new(CacheStore::new()),
            "https://example.test/results".to_string(),
            Duration::from_millis(5000),
        ))
    }

    async fn wait_for_calls(scraper: &MockScraper, calls: usize) {
        while scraper.calls() < calls {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn force_twice_within_threshold_fetches_once() {
        let scraper = Arc::new(MockScraper::new("270,268"));
        let orchestrator = orchestrator(scraper.clone());

        assert!(matches!(orchestrator.force().await, ForceOutcome::Updated(_)));
        tokio::time::advance(Duration::from_millis(4000)).await;
        match orchestrator.force().await {
            ForceOutcome::Fresh(snapshot) => assert_eq!(snapshot.college.biden, 270),
            other => panic!("expected fresh snapshot, got {:?}", other),
        }
        assert_eq!(scraper.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn force_after_threshold_fetches_again() {
        let scraper = Arc::new(MockScraper::new("270,268"));
        let orchestrator = orchestrator(scraper.clone());

        assert!(matches!(orchestrator.force().await, ForceOutcome::Updated(_)));
        tokio::time::advance(Duration::from_millis(5001)).await;
        scraper.set_body(Some("279,268"));
        match orchestrator.force().await {
            ForceOutcome::Updated(snapshot) => assert_eq!(snapshot.college.biden, 279),
            other => panic!("expected update, got {:?}", other),
        }
        assert_eq!(scraper.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn freshness_counts_from_fetch_start() {
        let scraper = Arc::new(MockScraper::slow("270,268", Duration::from_millis(1000)));
        let orchestrator = orchestrator(scraper.clone());
        let first = Instant::now();

        assert!(matches!(orchestrator.force().await, ForceOutcome::Updated(_)));
        assert!(Instant::now() - first >= Duration::from_millis(1000));

        tokio::time::sleep_until(first + Duration::from_millis(4500)).await;
        assert!(matches!(orchestrator.force().await, ForceOutcome::Fresh(_)));
        assert_eq!(scraper.calls(), 1);

        // 5500 ms after the first fetch began, 4500 ms after it was published
        tokio::time::sleep_until(first + Duration::from_millis(5500)).await;
        assert!(matches!(orchestrator.force().await, ForceOutcome::Updated(_)));
        assert_eq!(scraper.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_run_keeps_previous_snapshot() {
        let scraper = Arc::new(MockScraper::new("270,268"));
        let orchestrator = orchestrator(scraper.clone());
        assert!(matches!(orchestrator.on_timer().await, TimerOutcome::Completed(_)));

        tokio::time::advance(Duration::from_millis(6000)).await;
        scraper.set_body(Some("<html>redesigned page</html>"));
        match orchestrator.force().await {
            ForceOutcome::Failed { previous, error } => {
                assert_eq!(previous.unwrap().college.biden, 270);
                assert!(matches!(error, UpdateError::Extraction(_)));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(orchestrator.store().read().unwrap().college.trump, 268);
    }

    #[tokio::test]
    async fn transport_failure_leaves_store_empty() {
        let scraper = Arc::new(MockScraper::new("270,268"));
        scraper.set_body(None);
        let orchestrator = orchestrator(scraper.clone());

        match orchestrator.on_timer().await {
            TimerOutcome::Failed(UpdateError::Transport(TransportError::Status(503))) => {}
            other => panic!("expected transport failure, got {:?}", other),
        }
        assert!(matches!(
            orchestrator.force().await,
            ForceOutcome::Failed { previous: None, .. }
        ));
        assert!(orchestrator.store().read().is_none());
    }

    #[tokio::test]
    async fn timer_tick_coalesces_while_running() {
        let gate = Arc::new(Notify::new());
        let scraper = Arc::new(MockScraper::gated("270,268", gate.clone()));
        let orchestrator = orchestrator(scraper.clone());

        let first = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.on_timer().await })
        };
        wait_for_calls(&scraper, 1).await;
        assert!(orchestrator.is_running());

        assert!(matches!(orchestrator.on_timer().await, TimerOutcome::Coalesced));

        gate.notify_one();
        assert!(matches!(first.await.unwrap(), TimerOutcome::Completed(_)));
        assert_eq!(scraper.calls(), 1);
        assert!(!orchestrator.is_running());
    }

    #[tokio::test]
    async fn concurrent_forces_share_one_fetch() {
        let gate = Arc::new(Notify::new());
        let scraper = Arc::new(MockScraper::gated("270,268", gate.clone()));
        let orchestrator = orchestrator(scraper.clone());

        let forces: Vec<_> = (0..3)
            .map(|_| {
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move { orchestrator.force().await })
            })
            .collect();
        wait_for_calls(&scraper, 1).await;
        gate.notify_one();

        let outcomes = futures::future::join_all(forces).await;
        let updated = outcomes
            .iter()
            .filter(|o| matches!(o.as_ref().unwrap(), ForceOutcome::Updated(_)))
            .count();
        assert_eq!(updated, 1);
        assert_eq!(scraper.calls(), 1);
    }
}
