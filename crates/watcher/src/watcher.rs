//! Status polling task and the session handle returned to callers.

use std::sync::Arc;
use std::time::Duration;

use cirrus_platform::{PlatformApi, StatusSample};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::config::WatchConfig;
use crate::context::WatchContext;
use crate::error::{Error, Result};
use crate::types::{StatusEvent, WatchOutcome};

/// Watches long-running operations by polling their status.
#[derive(Clone)]
pub struct StatusWatcher {
    api: Arc<dyn PlatformApi>,
    config: WatchConfig,
}

impl StatusWatcher {
    /// Create a new status watcher.
    pub fn new(api: Arc<dyn PlatformApi>, config: WatchConfig) -> Self {
        Self { api, config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Start watching `target_id`.
    ///
    /// Spawns one polling task that emits a `StatusEvent` each time the
    /// observed status differs from the last emission. The event channel
    /// holds a single event, so the task waits for the consumer before
    /// polling again. The channel closes after a terminal state, on
    /// cancellation, or when retries run out.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTarget` for an empty target id.
    pub fn watch(&self, ctx: WatchContext, target_id: &str) -> Result<WatchSession> {
        if target_id.trim().is_empty() {
            return Err(Error::invalid_target("target id must not be empty"));
        }

        let (tx, rx) = mpsc::channel(1);
        let poller = Poller {
            api: Arc::clone(&self.api),
            config: self.config.clone(),
            ctx,
            target_id: target_id.to_string(),
            tx,
        };

        info!(target_id, "Starting status watch");
        let handle = tokio::spawn(poller.run());

        Ok(WatchSession {
            target_id: target_id.to_string(),
            events: rx,
            handle,
        })
    }
}

/// A running watch: the event receiver plus the polling task.
#[derive(Debug)]
pub struct WatchSession {
    target_id: String,
    events: mpsc::Receiver<StatusEvent>,
    handle: JoinHandle<WatchOutcome>,
}

impl WatchSession {
    /// Get the watched target.
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Receive the next event. `None` once the session has ended.
    pub async fn next(&mut self) -> Option<StatusEvent> {
        self.events.recv().await
    }

    /// Stop consuming and wait for the polling task to end.
    ///
    /// Events not yet received are discarded; if the task was still running
    /// it ends with `WatchOutcome::ReceiverDropped`.
    ///
    /// # Errors
    ///
    /// Returns `Error::TaskFailed` if the polling task panicked.
    pub async fn finish(self) -> Result<WatchOutcome> {
        drop(self.events);
        Ok(self.handle.await?)
    }

    /// Receive every remaining event, then the outcome.
    ///
    /// # Errors
    ///
    /// Returns `Error::TaskFailed` if the polling task panicked.
    pub async fn collect(mut self) -> Result<(Vec<StatusEvent>, WatchOutcome)> {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        let outcome = self.handle.await?;
        Ok((events, outcome))
    }

    /// Consume the events as a `Stream`. The polling task is detached.
    pub fn into_stream(self) -> ReceiverStream<StatusEvent> {
        ReceiverStream::new(self.events)
    }
}

/// State owned by the polling task.
struct Poller {
    api: Arc<dyn PlatformApi>,
    config: WatchConfig,
    ctx: WatchContext,
    target_id: String,
    tx: mpsc::Sender<StatusEvent>,
}

impl Poller {
    async fn run(self) -> WatchOutcome {
        let outcome = self.poll_until_done().await;
        info!(target_id = %self.target_id, outcome = %outcome, "Status watch ended");
        // Dropping `self.tx` here closes the channel.
        outcome
    }

    async fn poll_until_done(&self) -> WatchOutcome {
        let mut last: Option<StatusSample> = None;
        let mut sequence: u64 = 0;
        let mut failures: u32 = 0;

        loop {
            if self.ctx.is_cancelled() {
                return WatchOutcome::Cancelled;
            }

            let sample = match self.api.get_status(&self.target_id).await {
                Ok(sample) => sample,
                Err(e) => {
                    failures = failures.saturating_add(1);
                    warn!(
                        target_id = %self.target_id,
                        attempt = failures,
                        error = %e,
                        "Failed to fetch operation status"
                    );
                    if self.config.retries_exhausted(failures) {
                        return WatchOutcome::RetriesExhausted {
                            attempts: failures,
                            last_error: e.to_string(),
                        };
                    }
                    if let Some(outcome) = self.wait(self.config.error_interval).await {
                        return outcome;
                    }
                    continue;
                }
            };
            failures = 0;

            let changed = last.as_ref().is_none_or(|prev| !prev.same_status(&sample));
            if changed {
                if self.ctx.is_cancelled() {
                    return WatchOutcome::Cancelled;
                }

                let state = sample.state;
                let event = StatusEvent {
                    sequence,
                    sample: sample.clone(),
                    previous: last.as_ref().map(|s| s.state),
                };
                debug!(target_id = %self.target_id, state = %state, sequence, "Status changed");

                if let Some(outcome) = self.emit(event).await {
                    return outcome;
                }
                sequence += 1;

                if state.is_terminal() {
                    return WatchOutcome::Completed(state);
                }
                last = Some(sample);
            }

            if let Some(outcome) = self.wait(self.config.poll_interval).await {
                return outcome;
            }
        }
    }

    /// Send one event, giving up if the context is cancelled while the
    /// channel is full.
    async fn emit(&self, event: StatusEvent) -> Option<WatchOutcome> {
        tokio::select! {
            biased;
            () = self.ctx.cancelled() => Some(WatchOutcome::Cancelled),
            sent = self.tx.send(event) => sent.err().map(|_| WatchOutcome::ReceiverDropped),
        }
    }

    /// Sleep between polls. Returns early with an outcome when the context is
    /// cancelled or the consumer goes away.
    async fn wait(&self, interval: Duration) -> Option<WatchOutcome> {
        tokio::select! {
            biased;
            () = self.ctx.cancelled() => Some(WatchOutcome::Cancelled),
            () = self.tx.closed() => Some(WatchOutcome::ReceiverDropped),
            () = tokio::time::sleep(interval) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_platform::{InMemoryPlatform, OperationState, StatusStep};

    async fn watcher_with(steps: Vec<StatusStep>) -> StatusWatcher {
        let platform = InMemoryPlatform::new_arc();
        platform.script_status("op_1", steps).await;
        StatusWatcher::new(platform, WatchConfig::for_testing())
    }

    #[tokio::test]
    async fn test_empty_target_rejected() {
        let watcher = watcher_with(vec![]).await;
        let result = watcher.watch(WatchContext::background(), "  ");
        assert!(matches!(result, Err(Error::InvalidTarget { .. })));
    }

    #[tokio::test]
    async fn test_sequence_numbers_and_previous_state() -> Result<()> {
        let watcher = watcher_with(vec![
            StatusStep::report(OperationState::Pending),
            StatusStep::report(OperationState::InProgress),
            StatusStep::report(OperationState::Succeeded),
        ])
        .await;

        let session = watcher.watch(WatchContext::background(), "op_1")?;
        assert_eq!(session.target_id(), "op_1");
        let (events, outcome) = session.collect().await?;

        let sequences = events.iter().map(|e| e.sequence).collect::<Vec<_>>();
        assert_eq!(sequences, vec![0, 1, 2]);
        assert_eq!(events.first().and_then(|e| e.previous), None);
        assert_eq!(
            events.last().and_then(|e| e.previous),
            Some(OperationState::InProgress)
        );
        assert_eq!(outcome, WatchOutcome::Completed(OperationState::Succeeded));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_target_retries_until_cap() -> Result<()> {
        let platform = InMemoryPlatform::new_arc();
        let config = WatchConfig::for_testing().with_max_fetch_retries(Some(2));
        let watcher = StatusWatcher::new(platform, config);

        let (events, outcome) = watcher
            .watch(WatchContext::background(), "missing")?
            .collect()
            .await?;

        assert!(events.is_empty());
        assert!(matches!(outcome, WatchOutcome::RetriesExhausted { attempts: 3, .. }));
        Ok(())
    }
}
