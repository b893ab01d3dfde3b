//! Async driver for [`TiltMachine`].
//!
//! A single task owns the machine and the page and multiplexes three inputs
//! with `tokio::select!`: mutation batches, control messages and the lockout
//! timer. Each input is handled to completion before the next is polled, so
//! the machine never sees interleaved events.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::{Instant, Sleep};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{CoreError, Result};
use crate::events::{ControlMessage, Signal};
use crate::game::PlayerIdentity;
use crate::page::{MutationBatch, Page};
use crate::storage::{KvStore, OptionsSource, SessionSnapshot};
use crate::tilt::{LockoutToken, TiltMachine};

/// Delay between attempts to read persisted state at start-up.
pub const LOAD_RETRY: Duration = Duration::from_secs(1);

const SUPPORTED_HOST: &str = "chess.com";

/// Ensure `url` points at the supported site or one of its subdomains.
pub fn check_host(url: Option<&str>) -> Result<()> {
    let raw = url.ok_or_else(|| CoreError::UnsupportedPage("page has no URL".to_string()))?;
    let parsed =
        Url::parse(raw).map_err(|e| CoreError::UnsupportedPage(format!("{raw}: {e}")))?;
    match parsed.host_str() {
        Some(host) if host == SUPPORTED_HOST || host.ends_with(".chess.com") => Ok(()),
        _ => Err(CoreError::UnsupportedPage(raw.to_string())),
    }
}

/// Wall-clock time that advances with the tokio clock.
#[derive(Debug, Clone, Copy)]
struct MonotonicClock {
    origin: Instant,
    wall: DateTime<Utc>,
}

impl MonotonicClock {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
            wall: Utc::now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall + elapsed
    }
}

/// The one pending lockout timer, if any.
#[derive(Default)]
pub struct LockoutTimer {
    armed: Option<(LockoutToken, Pin<Box<Sleep>>)>,
}

impl LockoutTimer {
    /// Arm for `token`, replacing whatever was armed before.
    pub fn arm(&mut self, token: LockoutToken, after: Duration) {
        self.armed = Some((token, Box::pin(tokio::time::sleep(after))));
    }

    /// Disarm. Returns the token that was pending.
    pub fn cancel(&mut self) -> Option<LockoutToken> {
        self.armed.take().map(|(token, _)| token)
    }

    pub fn armed_token(&self) -> Option<LockoutToken> {
        self.armed.as_ref().map(|(token, _)| *token)
    }

    /// Resolves when the armed timer fires; never resolves when disarmed.
    ///
    /// Cancel safe: the sleep lives in `self`, so dropping this future loses
    /// nothing.
    pub async fn fired(&mut self) -> LockoutToken {
        let Some((token, sleep)) = self.armed.as_mut() else {
            return pending().await;
        };
        let token = *token;
        sleep.as_mut().await;
        self.armed = None;
        token
    }
}

pub struct Monitor<P: Page, S: KvStore, O: OptionsSource> {
    machine: TiltMachine<S, O>,
    page: P,
    clock: MonotonicClock,
    timer: LockoutTimer,
}

impl<P: Page, S: KvStore, O: OptionsSource> Monitor<P, S, O> {
    /// Check the page, resolve the viewer and load persisted state.
    ///
    /// Reading the store is retried every [`LOAD_RETRY`] until it succeeds.
    ///
    /// # Errors
    ///
    /// Fails when the page is not on the supported site or the viewer's
    /// handle cannot be resolved.
    pub async fn start(mut page: P, options_source: O, store: S) -> Result<Self> {
        check_host(page.current_url().as_deref())?;
        let identity = PlayerIdentity::resolve(page.viewer_handle())?;

        let snapshot = loop {
            match SessionSnapshot::load(&store) {
                Ok(snapshot) => break snapshot,
                Err(e) => warn!("Session state not readable yet, retrying: {e}"),
            }
            tokio::time::sleep(LOAD_RETRY).await;
        };

        let clock = MonotonicClock::new();
        let machine = TiltMachine::resume(
            identity,
            &mut page,
            options_source,
            store,
            snapshot,
            clock.now(),
        );
        let mut monitor = Self {
            machine,
            page,
            clock,
            timer: LockoutTimer::default(),
        };
        monitor.sync_timer();
        Ok(monitor)
    }

    pub fn machine(&self) -> &TiltMachine<S, O> {
        &self.machine
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    /// Drive the machine until the mutation source closes, forwarding every
    /// emitted signal to `signals`. Returns the monitor for inspection.
    pub async fn run(
        mut self,
        mut mutations: mpsc::Receiver<MutationBatch>,
        mut control: mpsc::Receiver<ControlMessage>,
        signals: mpsc::Sender<Signal>,
    ) -> Self {
        info!("Monitor event loop started");
        let mut control_open = true;

        loop {
            let emitted = tokio::select! {
                batch = mutations.recv() => match batch {
                    Some(batch) => {
                        let now = self.clock.now();
                        self.machine.on_mutations(&batch, &mut self.page, now)
                    }
                    None => {
                        info!("Page closed, stopping monitor");
                        break;
                    }
                },

                message = control.recv(), if control_open => match message {
                    Some(message) => {
                        let now = self.clock.now();
                        self.machine.on_control(message, &mut self.page, now)
                    }
                    None => {
                        debug!("Control channel closed");
                        control_open = false;
                        Vec::new()
                    }
                },

                token = self.timer.fired() => {
                    let now = self.clock.now();
                    self.machine.on_lockout_elapsed(token, &mut self.page, now)
                }
            };

            for signal in emitted {
                if signals.send(signal).await.is_err() {
                    debug!(?signal, "No notification dispatcher listening");
                }
            }
            self.sync_timer();
        }

        self.timer.cancel();
        info!("Monitor event loop exiting");
        self
    }

    /// Match the timer to the machine's lockout deadline.
    fn sync_timer(&mut self) {
        match self.machine.lockout_deadline() {
            Some((token, deadline)) if self.timer.armed_token() != Some(token) => {
                let wait = (deadline - self.clock.now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                debug!(wait_ms = wait.as_millis() as u64, "Lockout timer armed");
                self.timer.arm(token, wait);
            }
            Some(_) => {}
            None => {
                if self.timer.cancel().is_some() {
                    debug!("Lockout timer cancelled");
                }
            }
        }
    }
}
