// control/listener.rs

use crate::control::command_handler::{handle_command, ControlCommand, ControlContext};
use crate::control::Shutdown;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tracing::{info, warn};

/// Reads console commands line by line until one requests a shutdown or the
/// input closes. End of input leaves the service running.
pub async fn listen_for_commands<R>(
    input: R,
    ctx: &ControlContext,
    shutdown: &watch::Sender<Option<Shutdown>>,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Some(command) = ControlCommand::parse(&line) else {
                    continue;
                };
                if let Some(reason) = handle_command(command, ctx).await {
                    shutdown.send_replace(Some(reason));
                    return;
                }
            }
            Ok(None) => {
                info!("Console input closed, commands disabled");
                return;
            }
            Err(e) => {
                warn!("Console read error: {}", e);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExtractedFields, ExtractionError, TransportError};
    use crate::parser::Parser;
    use crate::scraper::Scraper;
    use crate::storage::CacheStore;
    use crate::updater::{Cadence, UpdateOrchestrator, UpdateSchedule};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    struct Offline;

    #[async_trait::async_trait]
    impl Scraper for Offline {
        async fn fetch(&self, _url: &str) -> Result<String, TransportError> {
            Err(TransportError::Timeout)
        }
    }

    impl Parser for Offline {
        fn parse(&self, _html: &str) -> Result<ExtractedFields, ExtractionError> {
            Err(ExtractionError::MissingNode { field: "college.biden" })
        }
    }

    fn context() -> ControlContext {
        let orchestrator = UpdateOrchestrator::new(
            Arc::new(Offline),
            Arc::new(Offline),
            Arc::new(CacheStore::new()),
            "https://example.test/results".to_string(),
            Duration::from_secs(5),
        );
        ControlContext {
            orchestrator: Arc::new(orchestrator),
            schedule: Arc::new(UpdateSchedule::new(Cadence::parse("*/2 * * * *").unwrap())),
            started: Instant::now(),
        }
    }

    #[tokio::test]
    async fn applies_commands_until_shutdown() {
        let ctx = context();
        let (tx, rx) = watch::channel(None);
        let input: &[u8] = b"update disable\n\nstatus\nupdate now\nrestart\nstop\n";

        listen_for_commands(input, &ctx, &tx).await;

        assert!(!ctx.schedule.is_enabled());
        assert_eq!(*rx.borrow(), Some(Shutdown::Restart));
    }

    #[tokio::test]
    async fn end_of_input_does_not_shut_down() {
        let ctx = context();
        let (tx, rx) = watch::channel(None);
        let input: &[u8] = b"update disable\nupdate enable\nwhatever\n";

        listen_for_commands(input, &ctx, &tx).await;

        assert!(ctx.schedule.is_enabled());
        assert_eq!(*rx.borrow(), None);
    }
}
