//! Tests for the async monitor loop.
//!
//! Time is paused so lockout timers fire as soon as the runtime is idle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chessbreak_core::error::StorageError;
use chessbreak_core::events::{ControlMessage, Signal};
use chessbreak_core::page::{markers, ControlHandle};
use chessbreak_core::storage::keys;
use chessbreak_core::{
    CoreError, DocumentPage, KvStore, MemoryStore, Monitor, MutationBatch, Options, Page,
    PageNode,
};
use chrono::Utc;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// A page the test can mutate while the monitor owns a handle to it.
#[derive(Clone)]
struct SharedPage(Arc<Mutex<DocumentPage>>);

impl SharedPage {
    fn new(page: DocumentPage) -> Self {
        Self(Arc::new(Mutex::new(page)))
    }

    fn append(&self, node: PageNode) -> MutationBatch {
        self.0.lock().unwrap().append(node)
    }

    fn disabled_count(&self) -> usize {
        self.0.lock().unwrap().disabled_count()
    }
}

impl Page for SharedPage {
    fn viewer_handle(&self) -> Option<String> {
        self.0.lock().unwrap().viewer_handle()
    }

    fn current_url(&self) -> Option<String> {
        self.0.lock().unwrap().current_url()
    }

    fn has_active_game_controls(&self) -> bool {
        self.0.lock().unwrap().has_active_game_controls()
    }

    fn player_names(&self) -> Option<(String, String)> {
        self.0.lock().unwrap().player_names()
    }

    fn viewer_rating(&self, viewer: &str) -> Option<i32> {
        self.0.lock().unwrap().viewer_rating(viewer)
    }

    fn new_game_controls(&self) -> Vec<ControlHandle> {
        self.0.lock().unwrap().new_game_controls()
    }

    fn set_disabled(&mut self, controls: &[ControlHandle], disabled: bool) -> usize {
        self.0.lock().unwrap().set_disabled(controls, disabled)
    }
}

fn board(url: &str, viewer: Option<&str>) -> DocumentPage {
    let player = |name: &str| {
        PageNode::with_class(markers::PLAYER_BLOCK)
            .child(PageNode::with_class(markers::PLAYER_USERNAME).text(name))
    };
    let mut root = PageNode::new();
    if let Some(viewer) = viewer {
        root = root.child(
            PageNode::new()
                .attr("id", markers::IDENTITY_ELEMENT_ID)
                .attr(markers::IDENTITY_ATTRIBUTE, viewer),
        );
    }
    let root = root
        .child(player("opponent"))
        .child(player("me"))
        .child(PageNode::with_class("new-game-component"));
    DocumentPage::new(root).with_url(url)
}

fn lost_panel() -> PageNode {
    PageNode::with_class("modal-wrapper").child(
        PageNode::with_class(markers::RESULT_PANEL)
            .child(PageNode::with_class(markers::RESULT_TITLE).text("Black Won"))
            .child(PageNode::with_class("game-over-buttons-component")),
    )
}

/// Timer ticks are whole milliseconds and wall-clock stamps are truncated
/// to milliseconds, so allow a little slack either way.
fn assert_close(actual: Duration, expected: Duration) {
    let slack = Duration::from_millis(50);
    assert!(
        actual + slack >= expected && actual <= expected + slack,
        "expected about {expected:?}, got {actual:?}"
    );
}

fn strict() -> Options {
    Options {
        max_losses: 1,
        session_length: 600,
        ..Options::default()
    }
}

struct Harness {
    page: SharedPage,
    mutations: mpsc::Sender<MutationBatch>,
    control: mpsc::Sender<ControlMessage>,
    signals: mpsc::Receiver<Signal>,
    handle: tokio::task::JoinHandle<Monitor<SharedPage, MemoryStore, Options>>,
}

async fn launch(store: MemoryStore) -> Harness {
    let page = SharedPage::new(board("https://www.chess.com/play/online", Some("me")));
    let monitor = Monitor::start(page.clone(), strict(), store).await.unwrap();
    let (mutations, mutation_rx) = mpsc::channel(16);
    let (control, control_rx) = mpsc::channel(16);
    let (signal_tx, signals) = mpsc::channel(16);
    let handle = tokio::spawn(monitor.run(mutation_rx, control_rx, signal_tx));
    Harness {
        page,
        mutations,
        control,
        signals,
        handle,
    }
}

#[tokio::test(start_paused = true)]
async fn lockout_starts_and_ends_on_timer() {
    let mut h = launch(MemoryStore::new()).await;

    let began = Instant::now();
    h.mutations.send(h.page.append(lost_panel())).await.unwrap();
    assert_eq!(
        h.signals.recv().await,
        Some(Signal::TiltStarted { timeout: 300_000 })
    );
    // the panel's own game-over buttons and the sidebar button
    assert_eq!(h.page.disabled_count(), 2);

    assert_eq!(
        h.signals.recv().await,
        Some(Signal::TiltEnded { timeout: 300_000 })
    );
    assert_close(began.elapsed(), Duration::from_secs(300));
    assert_eq!(h.page.disabled_count(), 0);

    drop(h.mutations);
    let monitor = h.handle.await.unwrap();
    assert!(!monitor.machine().lockout().active);
    assert_eq!(monitor.machine().lockout().cumulative_tilt_count, 1);
}

#[tokio::test(start_paused = true)]
async fn clear_stats_cancels_the_timer() {
    let mut h = launch(MemoryStore::new()).await;

    h.mutations.send(h.page.append(lost_panel())).await.unwrap();
    assert!(matches!(
        h.signals.recv().await,
        Some(Signal::TiltStarted { .. })
    ));

    tokio::time::sleep(Duration::from_secs(60)).await;
    h.control.send(ControlMessage::ClearStats).await.unwrap();
    assert_eq!(
        h.signals.recv().await,
        Some(Signal::TiltEnded { timeout: 300_000 })
    );
    assert_eq!(h.page.disabled_count(), 0);

    // the cancelled timer must not fire a second end
    let late = tokio::time::timeout(Duration::from_secs(600), h.signals.recv()).await;
    assert!(late.is_err());

    drop(h.mutations);
    let monitor = h.handle.await.unwrap();
    assert_eq!(monitor.machine().counters().losses, 0);
    assert!(monitor.machine().history().is_empty());
}

#[tokio::test(start_paused = true)]
async fn reinjection_finishes_the_persisted_lockout() {
    let now = Utc::now().timestamp_millis();
    let store = MemoryStore::new()
        .with(keys::SESSION_START, Value::from(now - 60_000))
        .with(keys::CURRENT_TIMEOUT_START, Value::from(now - 120_000))
        .with(keys::CURRENT_TIMEOUT, Value::from(300_000))
        .with(keys::TOTAL_TILT_COUNT, Value::from(1));
    let began = Instant::now();
    let mut h = launch(store).await;
    assert_eq!(h.page.disabled_count(), 1);

    assert_eq!(
        h.signals.recv().await,
        Some(Signal::TiltEnded { timeout: 300_000 })
    );
    assert_close(began.elapsed(), Duration::from_secs(180));
    assert_eq!(h.page.disabled_count(), 0);

    drop(h.mutations);
    let monitor = h.handle.await.unwrap();
    assert_eq!(monitor.machine().lockout().cumulative_tilt_count, 1);
}

#[tokio::test(start_paused = true)]
async fn closed_control_channel_keeps_monitor_running() {
    let mut h = launch(MemoryStore::new()).await;
    drop(h.control);

    h.mutations.send(h.page.append(lost_panel())).await.unwrap();
    assert!(matches!(
        h.signals.recv().await,
        Some(Signal::TiltStarted { .. })
    ));
    drop(h.mutations);
    h.handle.await.unwrap();
}

#[tokio::test]
async fn refuses_other_sites() {
    let page = board("https://lichess.org/tv", Some("me"));
    let result = Monitor::start(page, strict(), MemoryStore::new()).await;
    assert!(matches!(result, Err(CoreError::UnsupportedPage(_))));
}

#[tokio::test]
async fn refuses_to_start_without_identity() {
    let page = board("https://www.chess.com/play", None);
    let result = Monitor::start(page, strict(), MemoryStore::new()).await;
    assert!(matches!(result, Err(CoreError::IdentityUnresolved)));
}

/// Fails the first `n` reads.
struct SlowStore {
    inner: MemoryStore,
    failures_left: AtomicUsize,
}

impl KvStore for SlowStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(StorageError::Unavailable("still loading".into()));
        }
        self.inner.get(key)
    }

    fn set_many(&mut self, entries: &[(&str, Value)]) -> Result<(), StorageError> {
        self.inner.set_many(entries)
    }
}

#[tokio::test(start_paused = true)]
async fn start_polls_store_until_readable() {
    let store = SlowStore {
        inner: MemoryStore::new().with(keys::TOTAL_TILT_COUNT, Value::from(7)),
        failures_left: AtomicUsize::new(3),
    };
    let page = board("https://www.chess.com/play", Some("me"));

    let began = Instant::now();
    let monitor = Monitor::start(page, strict(), store).await.unwrap();
    assert_close(began.elapsed(), Duration::from_secs(3));
    assert_eq!(monitor.machine().lockout().cumulative_tilt_count, 7);
}
