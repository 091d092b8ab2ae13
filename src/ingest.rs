//! Frame Ingestion
//!
//! Turns the frame stream into state updates and pushes.
//!
//! ## Architecture
//!
//! - **MonitorState**: owns the aggregator, the filtered log and the
//!   broadcast hub. All mutation of any of them goes through one lock, so a
//!   frame update and an observer joining can never interleave.
//! - **Monitor**: cloneable handle to that state, shared by the ingestion
//!   task and the HTTP layer.
//! - **Ingestor**: the single consumer of the bounded frame channel. Each
//!   frame is handled to completion before the next is taken.
//!
//! Per frame: record it, broadcast `detailedStats`, offer it to the log and,
//! only if it was logged, broadcast `filteredLogUpdate`. No batching.

use std::num::NonZeroUsize;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

use crate::frame::{FrameEvent, IdHex};
use crate::telemetry::{FilteredLog, LogEntry, StatsAggregator, StatsSnapshot};
use crate::websocket::{BroadcastHub, HubConfig, HubError, ObserverId, ObserverSender, ServerMessage};

/// Range filter settings for the filtered log
#[derive(Debug, Clone)]
pub struct FilterSettings {
    pub range: RangeInclusive<u32>,
    pub capacity: NonZeroUsize,
}

/// Capabilities of a monitor instance
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Filtered log settings; `None` disables the log and its pushes
    pub filter: Option<FilterSettings>,
    /// Push `uniqueIdCount` whenever a new identifier appears
    pub unique_id_count: bool,
    /// Hub limits
    pub hub: HubConfig,
}

/// What a single frame changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    /// The frame carried a previously unseen identifier
    pub new_identifier: bool,
    /// The frame passed the range filter and was logged
    pub logged: bool,
}

/// Aggregated state plus the observers it is pushed to
pub struct MonitorState {
    stats: StatsAggregator,
    log: Option<FilteredLog>,
    hub: BroadcastHub,
    unique_id_count: bool,
}

impl MonitorState {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            stats: StatsAggregator::new(),
            log: config
                .filter
                .map(|filter| FilteredLog::new(filter.range, filter.capacity)),
            hub: BroadcastHub::new(config.hub),
            unique_id_count: config.unique_id_count,
        }
    }

    /// Apply one frame and push the resulting updates
    pub fn ingest(&mut self, frame: &FrameEvent) -> IngestOutcome {
        let new_identifier = self.stats.record(frame.identifier);
        self.hub.broadcast(&self.stats_message());

        if new_identifier && self.unique_id_count {
            self.hub.broadcast(&self.unique_count_message());
        }

        let logged = match self.log.as_mut() {
            Some(log) => log.offer(frame),
            None => false,
        };
        if logged {
            self.hub.broadcast(&self.log_message());
        }

        IngestOutcome {
            new_identifier,
            logged,
        }
    }

    /// Full current state, in the order a joining observer receives it
    pub fn catch_up(&self) -> Vec<ServerMessage> {
        let mut messages = vec![self.stats_message()];
        if self.unique_id_count {
            messages.push(self.unique_count_message());
        }
        if self.log.is_some() {
            messages.push(self.log_message());
        }
        messages
    }

    /// Push the full current state to every observer
    pub fn broadcast_current(&self) {
        for message in self.catch_up() {
            self.hub.broadcast(&message);
        }
    }

    /// Register an observer; it receives the catch-up state immediately
    pub fn add_observer(&mut self, sender: ObserverSender) -> Result<ObserverId, HubError> {
        let catch_up = self.catch_up();
        self.hub.add_observer(sender, &catch_up)
    }

    /// Deregister an observer (idempotent)
    pub fn remove_observer(&mut self, id: &str) -> bool {
        self.hub.remove_observer(id)
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    pub fn log(&self) -> Option<&FilteredLog> {
        self.log.as_ref()
    }

    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Filtered log snapshot; empty when the log is disabled
    pub fn log_snapshot(&self) -> Vec<LogEntry> {
        self.log.as_ref().map(FilteredLog::snapshot).unwrap_or_default()
    }

    fn stats_message(&self) -> ServerMessage {
        ServerMessage::DetailedStats {
            stats: self.stats.snapshot(),
        }
    }

    fn log_message(&self) -> ServerMessage {
        ServerMessage::FilteredLogUpdate {
            log: self.log_snapshot(),
        }
    }

    fn unique_count_message(&self) -> ServerMessage {
        ServerMessage::UniqueIdCount {
            count: self.stats.unique_identifiers(),
        }
    }
}

/// Shared handle to the monitor state
#[derive(Clone)]
pub struct Monitor {
    state: Arc<Mutex<MonitorState>>,
    source_active: Arc<AtomicBool>,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(MonitorState::new(config))),
            source_active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Lock the state for a read or a multi-step update
    pub async fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().await
    }

    pub async fn ingest(&self, frame: &FrameEvent) -> IngestOutcome {
        self.state.lock().await.ingest(frame)
    }

    pub async fn add_observer(&self, sender: ObserverSender) -> Result<ObserverId, HubError> {
        self.state.lock().await.add_observer(sender)
    }

    pub async fn remove_observer(&self, id: &str) -> bool {
        self.state.lock().await.remove_observer(id)
    }

    pub async fn send_to(&self, id: &str, message: &ServerMessage) -> Result<(), HubError> {
        self.state.lock().await.hub().send_to(id, message)
    }

    pub async fn observer_count(&self) -> usize {
        self.state.lock().await.hub().observer_count()
    }

    /// Whether an ingestion task is currently consuming frames
    pub fn source_active(&self) -> bool {
        self.source_active.load(Ordering::Acquire)
    }

    fn set_source_active(&self, active: bool) {
        self.source_active.store(active, Ordering::Release);
    }
}

/// Single consumer of the frame channel
pub struct Ingestor {
    monitor: Monitor,
    frames: mpsc::Receiver<FrameEvent>,
}

impl Ingestor {
    pub fn new(monitor: Monitor, frames: mpsc::Receiver<FrameEvent>) -> Self {
        Self { monitor, frames }
    }

    /// Consume frames until every sender is gone
    ///
    /// Returns the number of frames processed.
    pub async fn run(mut self) -> u64 {
        self.monitor.set_source_active(true);
        self.monitor.lock().await.broadcast_current();
        tracing::info!("Frame ingestion started");

        let mut processed = 0u64;
        while let Some(frame) = self.frames.recv().await {
            let outcome = self.monitor.ingest(&frame).await;
            processed += 1;

            if outcome.new_identifier {
                tracing::debug!(identifier = %IdHex(frame.identifier), "New identifier");
            }
        }

        self.monitor.set_source_active(false);
        tracing::warn!(frames = processed, "Frame source closed, ingestion stopped");
        processed
    }

    /// Run the ingestion loop on its own task
    pub fn spawn(self) -> JoinHandle<u64> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::mailbox::{self, ObserverReceiver};

    fn config(capacity: usize, unique_id_count: bool) -> MonitorConfig {
        MonitorConfig {
            filter: Some(FilterSettings {
                range: 0x700..=0x77F,
                capacity: NonZeroUsize::new(capacity).unwrap(),
            }),
            unique_id_count,
            hub: HubConfig::default(),
        }
    }

    fn drain(rx: &mut ObserverReceiver) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        while let Some(text) = rx.try_recv() {
            out.push(serde_json::from_str(&text).unwrap());
        }
        out
    }

    fn types(messages: &[serde_json::Value]) -> Vec<&str> {
        messages.iter().map(|m| m["type"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_in_range_frame_pushes_stats_then_log() {
        let mut state = MonitorState::new(config(50, false));
        let (tx, mut rx) = mailbox::channel();
        state.add_observer(tx).unwrap();
        drain(&mut rx);

        let outcome = state.ingest(&FrameEvent::new(0x701, vec![1, 2, 3]));
        assert!(outcome.logged);
        assert!(outcome.new_identifier);

        let messages = drain(&mut rx);
        assert_eq!(types(&messages), vec!["detailedStats", "filteredLogUpdate"]);
        assert_eq!(messages[0]["stats"]["0x701"], 1);
        assert_eq!(messages[1]["log"][0]["data"], "010203");
    }

    #[test]
    fn test_out_of_range_frame_pushes_stats_only() {
        let mut state = MonitorState::new(config(50, false));
        state.ingest(&FrameEvent::new(0x700, vec![9]));
        let (tx, mut rx) = mailbox::channel();
        state.add_observer(tx).unwrap();
        drain(&mut rx);

        let before = state.log_snapshot();
        let outcome = state.ingest(&FrameEvent::new(0x050, vec![1]));
        assert!(!outcome.logged);
        assert_eq!(state.log_snapshot(), before);

        let messages = drain(&mut rx);
        assert_eq!(types(&messages), vec!["detailedStats"]);
    }

    #[test]
    fn test_catch_up_after_many_frames() {
        let mut state = MonitorState::new(config(50, false));
        for i in 0..1000u32 {
            state.ingest(&FrameEvent::new(0x6F0 + (i % 32), vec![i as u8]));
        }

        let (tx, mut rx) = mailbox::channel();
        state.add_observer(tx).unwrap();

        let messages = drain(&mut rx);
        assert_eq!(types(&messages), vec!["detailedStats", "filteredLogUpdate"]);

        let expected_stats = serde_json::to_value(state.stats_snapshot()).unwrap();
        let expected_log = serde_json::to_value(state.log_snapshot()).unwrap();
        assert_eq!(messages[0]["stats"], expected_stats);
        assert_eq!(messages[1]["log"], expected_log);
        assert_eq!(messages[1]["log"].as_array().unwrap().len(), 50);
    }

    #[test]
    fn test_unique_id_count_on_new_identifier() {
        let mut state = MonitorState::new(config(50, true));
        let (tx, mut rx) = mailbox::channel();
        state.add_observer(tx).unwrap();
        let join = drain(&mut rx);
        assert_eq!(
            types(&join),
            vec!["detailedStats", "uniqueIdCount", "filteredLogUpdate"]
        );

        state.ingest(&FrameEvent::new(0x100, vec![]));
        let messages = drain(&mut rx);
        assert_eq!(types(&messages), vec!["detailedStats", "uniqueIdCount"]);
        assert_eq!(messages[1]["count"], 1);

        state.ingest(&FrameEvent::new(0x100, vec![]));
        assert_eq!(types(&drain(&mut rx)), vec!["detailedStats"]);
    }

    #[test]
    fn test_filter_disabled() {
        let mut state = MonitorState::new(MonitorConfig {
            filter: None,
            unique_id_count: false,
            hub: HubConfig::default(),
        });
        let (tx, mut rx) = mailbox::channel();
        state.add_observer(tx).unwrap();
        assert_eq!(types(&drain(&mut rx)), vec!["detailedStats"]);

        let outcome = state.ingest(&FrameEvent::new(0x700, vec![1]));
        assert!(!outcome.logged);
        assert!(state.log().is_none());
        assert_eq!(types(&drain(&mut rx)), vec!["detailedStats"]);
    }

    #[tokio::test]
    async fn test_ingestor_consumes_channel() {
        let monitor = Monitor::new(config(2, false));
        let (obs_tx, mut obs_rx) = mailbox::channel();
        monitor.add_observer(obs_tx).await.unwrap();
        drain(&mut obs_rx);

        let (tx, rx) = mpsc::channel(8);
        let handle = Ingestor::new(monitor.clone(), rx).spawn();

        for id in [0x700, 0x701, 0x702, 0x100] {
            tx.send(FrameEvent::new(id, vec![0xAA])).await.unwrap();
        }
        drop(tx);

        let processed = handle.await.unwrap();
        assert_eq!(processed, 4);
        assert!(!monitor.source_active());

        let state = monitor.lock().await;
        let logged: Vec<String> = state
            .log_snapshot()
            .iter()
            .map(|e| e.identifier.to_string())
            .collect();
        assert_eq!(logged, vec!["0x701", "0x702"]);
        assert_eq!(state.stats().total_frames(), 4);
        drop(state);

        // Nothing was read meanwhile: only the newest snapshot of each kind
        // is pending, in the order it was produced
        let messages = drain(&mut obs_rx);
        assert_eq!(types(&messages), vec!["filteredLogUpdate", "detailedStats"]);
        assert_eq!(messages[0]["log"].as_array().unwrap().len(), 2);
        assert_eq!(messages[1]["stats"]["0x100"], 1);
        assert_eq!(messages[1]["stats"]["0x700"], 1);
    }

    #[test]
    fn test_stalled_observer_queue_stays_bounded() {
        let mut state = MonitorState::new(config(50, true));
        let (tx, mut rx) = mailbox::channel();
        state.add_observer(tx).unwrap();

        for i in 0..20_000u32 {
            state.ingest(&FrameEvent::new(0x700 + (i % 0x80), vec![0xDE, 0xAD, 0xBE, 0xEF]));
        }

        // One pending message per kind, each carrying the latest state
        assert_eq!(rx.len(), 3);
        let messages = drain(&mut rx);
        let latest_stats = serde_json::to_value(state.stats_snapshot()).unwrap();
        let stats = messages
            .iter()
            .find(|m| m["type"] == "detailedStats")
            .unwrap();
        assert_eq!(stats["stats"], latest_stats);
        let count = messages
            .iter()
            .find(|m| m["type"] == "uniqueIdCount")
            .unwrap();
        assert_eq!(count["count"], 0x80);
    }

    #[test]
    fn test_catch_up_precedes_pushes_of_same_kind() {
        let mut state = MonitorState::new(config(50, false));
        state.ingest(&FrameEvent::new(0x700, vec![1]));
        let (tx, mut rx) = mailbox::channel();
        state.add_observer(tx).unwrap();
        state.ingest(&FrameEvent::new(0x100, vec![2]));

        // The catch-up log is still pending; the stats catch-up was superseded
        let messages = drain(&mut rx);
        assert_eq!(types(&messages), vec!["filteredLogUpdate", "detailedStats"]);
        assert_eq!(messages[0]["log"][0]["id"], "0x700");
        assert_eq!(messages[1]["stats"]["0x100"], 1);
        assert_eq!(messages[1]["stats"]["0x700"], 1);
    }

    #[tokio::test]
    async fn test_monitor_remove_observer_idempotent() {
        let monitor = Monitor::new(config(50, false));
        let (tx, _rx) = mailbox::channel();
        let id = monitor.add_observer(tx).await.unwrap();

        assert!(monitor.remove_observer(&id).await);
        assert!(!monitor.remove_observer(&id).await);
        assert_eq!(monitor.observer_count().await, 0);
    }
}
