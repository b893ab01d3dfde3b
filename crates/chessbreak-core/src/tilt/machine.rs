//! The tilt state machine.
//!
//! [`TiltMachine`] owns every piece of in-memory state (lifecycle phase,
//! session counters, rating track, history, lockout) and is driven by three
//! inputs: mutation batches, control messages and lockout expiry. Each input
//! is handled to completion before the next one, and every state change is
//! followed by a wholesale snapshot write.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::counters::SessionCounters;
use super::lockout::{lockout_duration, LockoutActuator, LockoutToken, TiltLockoutState};
use super::trigger;
use crate::error::Result;
use crate::events::{ControlMessage, Signal};
use crate::game::{
    classify_result, GameHistory, GamePhase, LifecycleDetector, LifecycleEvent, OutcomeRecord,
    PlayerIdentity, Players, RatingExtractor, RatingTrack, SignedDeltaScanner,
};
use crate::page::{markers, MutationBatch, Page, PageNode};
use crate::storage::{KvStore, Options, OptionsSource, SessionSnapshot};

pub struct TiltMachine<S: KvStore, O: OptionsSource> {
    identity: PlayerIdentity,
    options: Options,
    options_source: O,
    store: S,
    detector: LifecycleDetector,
    counters: SessionCounters,
    history: GameHistory,
    rating: RatingTrack,
    lockout: TiltLockoutState,
    actuator: LockoutActuator,
    extractor: Box<dyn RatingExtractor + Send + Sync>,
    game_started_at: Option<i64>,
}

impl<S: KvStore, O: OptionsSource> TiltMachine<S, O> {
    /// Resolve the viewer, load options and persisted state, and reconcile.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IdentityUnresolved`](crate::CoreError::IdentityUnresolved)
    /// when the page does not expose the viewer's handle, and
    /// [`CoreError::Storage`](crate::CoreError::Storage) when the store cannot
    /// be read. Nothing is written in either case, so durable state survives.
    pub fn start(
        page: &mut dyn Page,
        options_source: O,
        store: S,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let identity = PlayerIdentity::resolve(page.viewer_handle())?;
        let snapshot = SessionSnapshot::load(&store)?;
        Ok(Self::resume(
            identity,
            page,
            options_source,
            store,
            snapshot,
            now,
        ))
    }

    /// Build from an already loaded snapshot and reconcile it with `now`.
    ///
    /// An expired or missing session is reset and persisted. A lockout
    /// window that is still open is resumed without counting a new tilt.
    pub fn resume(
        identity: PlayerIdentity,
        page: &mut dyn Page,
        options_source: O,
        store: S,
        snapshot: SessionSnapshot,
        now: DateTime<Utc>,
    ) -> Self {
        let options = options_source.load_options().unwrap_or_else(|e| {
            warn!("Failed to load options, using defaults: {e}");
            Options::default()
        });
        let now_ms = now.timestamp_millis();

        let counters = SessionCounters {
            wins: snapshot.stats.win,
            losses: snapshot.stats.loss,
            draws: snapshot.stats.draw,
            streak: snapshot.streak,
            session_start: snapshot.session_start.unwrap_or(now_ms),
            session_length_ms: options.session_length_ms(),
        };
        let mut lockout = TiltLockoutState::new(snapshot.total_tilt_count);
        lockout.started_at = snapshot.timeout_start;
        lockout.duration_ms = snapshot.timeout_ms;

        let mut machine = Self {
            identity,
            options,
            options_source,
            store,
            detector: LifecycleDetector::new(),
            counters,
            history: snapshot.history,
            rating: snapshot.rating,
            lockout,
            actuator: LockoutActuator::new(),
            extractor: Box::new(SignedDeltaScanner::new()),
            game_started_at: None,
        };

        if snapshot.session_start.is_none() || machine.counters.is_expired(now_ms) {
            machine.reset_session(now_ms);
            machine.persist(now_ms);
        }

        if let (Some(started), Some(ends)) = (machine.lockout.started_at, machine.lockout.ends_at())
        {
            if ends > now_ms {
                let duration = machine.lockout.duration_ms;
                machine.lockout.activate(started, duration);
                machine.actuator.apply(page);
                info!(remaining_ms = ends - now_ms, "Resumed lockout");
            }
        }

        info!(viewer = %machine.identity, "Tilt monitor started");
        machine
    }

    /// Swap the rating delta strategy.
    pub fn with_extractor(mut self, extractor: Box<dyn RatingExtractor + Send + Sync>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn identity(&self) -> &PlayerIdentity {
        &self.identity
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn phase(&self) -> GamePhase {
        self.detector.phase()
    }

    pub fn counters(&self) -> &SessionCounters {
        &self.counters
    }

    pub fn history(&self) -> &GameHistory {
        &self.history
    }

    pub fn rating(&self) -> &RatingTrack {
        &self.rating
    }

    pub fn lockout(&self) -> &TiltLockoutState {
        &self.lockout
    }

    /// Start of the game in progress, if one was witnessed.
    pub fn game_started_at(&self) -> Option<i64> {
        self.game_started_at
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// When the active lockout should end, tagged with its token.
    pub fn lockout_deadline(&self) -> Option<(LockoutToken, DateTime<Utc>)> {
        if !self.lockout.active {
            return None;
        }
        let ends = DateTime::from_timestamp_millis(self.lockout.ends_at()?)?;
        Some((self.lockout.token(), ends))
    }

    /// Everything that gets persisted, as of now.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            stats: self.counters.stats(),
            streak: self.counters.streak,
            session_start: Some(self.counters.session_start),
            session_length: self.options.session_length,
            timeout_ms: self.lockout.duration_ms,
            timeout_start: self.lockout.started_at,
            history: self.history.clone(),
            total_tilt_count: self.lockout.cumulative_tilt_count,
            rating: self.rating,
        }
    }

    /// Process one mutation batch.
    pub fn on_mutations(
        &mut self,
        batch: &MutationBatch,
        page: &mut dyn Page,
        now: DateTime<Utc>,
    ) -> Vec<Signal> {
        let mut signals = Vec::new();
        for event in self.detector.observe(batch, &*page) {
            match event {
                LifecycleEvent::GameStarted => self.on_game_started(&*page, now),
                LifecycleEvent::GameEnded(panel) => {
                    signals.extend(self.on_game_ended(&panel, page, now));
                }
            }
        }

        if self.lockout.active {
            self.actuator.ensure_applied(page);
        }
        signals
    }

    /// Process an inbound control message.
    pub fn on_control(
        &mut self,
        message: ControlMessage,
        page: &mut dyn Page,
        now: DateTime<Utc>,
    ) -> Vec<Signal> {
        match message {
            ControlMessage::OptionsUpdated => {
                self.refresh_options();
                Vec::new()
            }
            ControlMessage::ClearStats => self.clear_stats(page, now),
        }
    }

    /// The lockout timer identified by `token` fired.
    ///
    /// A token from a lockout that was since cancelled or replaced is
    /// ignored.
    pub fn on_lockout_elapsed(
        &mut self,
        token: LockoutToken,
        page: &mut dyn Page,
        now: DateTime<Utc>,
    ) -> Vec<Signal> {
        if !self.lockout.active || token != self.lockout.token() {
            debug!("Ignoring stale lockout timer");
            return Vec::new();
        }
        let signal = self.end_lockout(page);
        if self.options.auto_reset_stats {
            self.counters.clear_results();
            info!("Session stats reset after lockout");
        }
        self.persist(now.timestamp_millis());
        vec![signal]
    }

    fn on_game_started(&mut self, page: &dyn Page, now: DateTime<Utc>) {
        let now_ms = now.timestamp_millis();
        self.game_started_at = Some(now_ms);
        // sessionStart marks the session, not the game: only a new session restamps it.
        if self.counters.is_expired(now_ms) {
            self.reset_session(now_ms);
        }
        if self.options.track_rating_changes {
            if let Some(rating) = page.viewer_rating(self.identity.as_str()) {
                self.rating.observe(rating);
            }
        }
        info!("Game started");
        self.persist(now_ms);
    }

    fn on_game_ended(
        &mut self,
        panel: &PageNode,
        page: &mut dyn Page,
        now: DateTime<Utc>,
    ) -> Vec<Signal> {
        let now_ms = now.timestamp_millis();
        let (top, bottom) = page.player_names().unwrap_or_default();
        if !self.identity.is_participant(&top, &bottom) {
            debug!(%top, %bottom, "Viewer is not playing this game, ignoring result");
            return Vec::new();
        }

        let title = panel
            .find(markers::RESULT_TITLE)
            .map(PageNode::text_content)
            .unwrap_or_default();
        let reason = panel
            .find(markers::RESULT_SUBTITLE)
            .map(PageNode::text_content)
            .unwrap_or_default();
        let result = classify_result(&title);

        let rating_change = if self.options.track_rating_changes {
            self.extractor.extract(panel)
        } else {
            None
        };
        if let Some(delta) = rating_change {
            if self.rating.apply_delta(delta).is_none() {
                debug!(delta, "Rating change seen before any rating was known");
            }
        }

        if self.options.store_game_history {
            self.history.push(OutcomeRecord {
                result,
                reason: reason.trim().to_string(),
                timestamp: now_ms,
                players: Players {
                    top,
                    bottom,
                    username: self.identity.as_str().to_string(),
                },
                url: page.current_url(),
                rating_change,
            });
        }

        self.counters.record(result);
        info!(
            result = result.as_str(),
            streak = self.counters.streak,
            "Game recorded"
        );

        let mut signals = Vec::new();
        if let Some(reason) = trigger::evaluate(&self.options, self.counters.streak, &self.rating) {
            signals.extend(self.begin_lockout(page, now_ms, reason));
        }
        self.persist(now_ms);

        if self.counters.is_expired(now_ms) {
            self.reset_session(now_ms);
            self.persist(now_ms);
        }
        self.game_started_at = None;
        signals
    }

    fn begin_lockout(
        &mut self,
        page: &mut dyn Page,
        now_ms: i64,
        reason: trigger::TriggerReason,
    ) -> Option<Signal> {
        if self.lockout.active {
            debug!(%reason, "Already locked out, not extending");
            return None;
        }
        let multiplier = self
            .options
            .enable_progressive_timeouts
            .then_some(self.options.progressive_timeout_multiplier);
        let duration = lockout_duration(
            self.options.timeout_ms(),
            multiplier,
            self.lockout.cumulative_tilt_count,
        );
        self.lockout.cumulative_tilt_count += 1;
        self.lockout.activate(now_ms, duration);
        self.actuator.apply(page);
        info!(
            %reason,
            duration_ms = duration,
            total = self.lockout.cumulative_tilt_count,
            "Lockout started"
        );
        Some(Signal::TiltStarted { timeout: duration })
    }

    fn end_lockout(&mut self, page: &mut dyn Page) -> Signal {
        self.actuator.release(page);
        self.lockout.deactivate();
        info!(duration_ms = self.lockout.duration_ms, "Lockout ended");
        Signal::TiltEnded {
            timeout: self.lockout.duration_ms,
        }
    }

    fn clear_stats(&mut self, page: &mut dyn Page, now: DateTime<Utc>) -> Vec<Signal> {
        let mut signals = Vec::new();
        if self.lockout.active {
            signals.push(self.end_lockout(page));
        }
        self.lockout.clear_window();
        self.counters.clear_results();
        self.history.clear();
        info!("Session stats cleared");
        self.persist(now.timestamp_millis());
        signals
    }

    fn refresh_options(&mut self) {
        match self.options_source.load_options() {
            Ok(fresh) => {
                self.options.refresh_policy(&fresh);
                self.counters.session_length_ms = self.options.session_length_ms();
                info!(
                    max_losses = self.options.max_losses,
                    session_length = self.options.session_length,
                    timeout_duration = self.options.timeout_duration,
                    "Options refreshed"
                );
            }
            Err(e) => warn!("Failed to reload options, keeping current policy: {e}"),
        }
    }

    fn reset_session(&mut self, now_ms: i64) {
        self.counters.reset(now_ms);
        self.rating.rebaseline();
        info!("New session started");
    }

    fn persist(&mut self, now_ms: i64) {
        let pruned = self
            .history
            .prune(now_ms, self.options.game_history_retention);
        if pruned > 0 {
            debug!(pruned, "Pruned expired history");
        }
        if let Err(e) = self.snapshot().persist(&mut self.store) {
            warn!("Failed to persist session state: {e}");
        }
    }
}
