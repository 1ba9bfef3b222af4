//! Orchestrator: owns the lifecycle, the capture thread and the
//! decide/act loop.
//!
//! `start()` blocks its caller for the whole run: it calibrates from the
//! overlay's events, spawns the capture thread, then runs decide/act
//! cycles until cancelled. `stop()` may be called from any other thread.

use anyhow::{anyhow, bail, Context, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::automation::actions::ActionDispatcher;
use crate::automation::cancel::CancelToken;
use crate::automation::config::AgentConfig;
use crate::automation::input::InputDriver;
use crate::automation::state::LifecycleState;
use crate::calibration::{CalibrationEvent, CalibrationState};
use crate::capture::archive::archive_frame;
use crate::capture::{run_capture_loop, ScreenCapturer};
use crate::decision::{DecisionEngine, TextGenerator};
use crate::game::GameStateStore;
use crate::geometry::Rect;
use crate::ocr::{StateExtractor, TextRecognizer};

/// Poll interval of [`join_with_timeout`].
const JOIN_POLL: Duration = Duration::from_millis(10);

/// External collaborators injected into the orchestrator.
#[derive(Clone)]
pub struct Collaborators {
    pub capturer: Arc<dyn ScreenCapturer>,
    pub recognizer: Arc<dyn TextRecognizer>,
    pub generator: Arc<dyn TextGenerator>,
    pub input: Arc<dyn InputDriver>,
}

/// Waits up to `timeout` for `handle` to finish.
///
/// Returns false if the thread was still running at the deadline; it is
/// then detached and left to finish on its own.
pub fn join_with_timeout<T>(handle: JoinHandle<T>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            tracing::warn!(
                "Thread '{}' did not finish within {:?}, abandoning it",
                handle.thread().name().unwrap_or("<unnamed>"),
                timeout
            );
            return false;
        }
        thread::sleep(JOIN_POLL);
    }
    if handle.join().is_err() {
        tracing::error!("Joined thread had panicked");
    }
    true
}

pub struct Orchestrator {
    config: AgentConfig,
    capturer: Arc<dyn ScreenCapturer>,
    extractor: Arc<StateExtractor>,
    engine: DecisionEngine,
    dispatcher: ActionDispatcher,
    store: Arc<GameStateStore>,
    state: Mutex<LifecycleState>,
    cancel: Mutex<CancelToken>,
    capture_handle: Mutex<Option<JoinHandle<()>>>,
}

/// Locks a mutex, recovering the data if a panicking thread poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl Orchestrator {
    pub fn new(config: AgentConfig, collaborators: Collaborators) -> Self {
        let extractor = StateExtractor::new(collaborators.recognizer, config.detection.clone());
        let engine = DecisionEngine::new(
            collaborators.generator,
            config.strategy.clone(),
            &config.generator,
        );
        let dispatcher = ActionDispatcher::new(collaborators.input, config.actions.clone());
        Self {
            capturer: collaborators.capturer,
            extractor: Arc::new(extractor),
            engine,
            dispatcher,
            store: Arc::new(GameStateStore::new()),
            state: Mutex::new(LifecycleState::Idle),
            cancel: Mutex::new(CancelToken::new()),
            capture_handle: Mutex::new(None),
            config,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        *lock(&self.state)
    }

    pub fn store(&self) -> &GameStateStore {
        &self.store
    }

    /// Moves to `to` if the current state is one of `from`.
    fn transition(&self, from: &[LifecycleState], to: LifecycleState) -> bool {
        let mut state = lock(&self.state);
        if from.contains(&*state) {
            tracing::debug!("Lifecycle: {} -> {}", *state, to);
            *state = to;
            true
        } else {
            false
        }
    }

    /// Runs calibration, then the capture thread and decide/act loop.
    ///
    /// Blocks until the run ends. Calling it while not `Idle` logs a
    /// warning and returns immediately.
    pub fn start(&self, events: &Receiver<CalibrationEvent>) -> Result<()> {
        let cancel = {
            let mut state = lock(&self.state);
            if *state != LifecycleState::Idle {
                tracing::warn!("start() ignored: orchestrator is {}", *state);
                return Ok(());
            }
            *state = LifecycleState::Calibrating;
            let token = CancelToken::new();
            *lock(&self.cancel) = token.clone();
            token
        };
        self.store.reset();
        tracing::info!("Orchestrator started, waiting for calibration");

        let calibration = match self.calibrate(events, &cancel) {
            Ok(Some(calibration)) => calibration,
            Ok(None) => {
                tracing::info!("Calibration cancelled");
                return Ok(());
            }
            Err(e) => {
                self.transition(
                    &[LifecycleState::Calibrating, LifecycleState::AwaitingConfirmation],
                    LifecycleState::Idle,
                );
                return Err(e);
            }
        };

        let (Some(rect), Some(round_rect)) = (calibration.rect(), calibration.round_rect()) else {
            self.transition(&[LifecycleState::AwaitingConfirmation], LifecycleState::Idle);
            bail!("Confirmed calibration has no rectangle");
        };
        if !self.transition(&[LifecycleState::AwaitingConfirmation], LifecycleState::Running) {
            tracing::info!("Stopped before the run began");
            return Ok(());
        }
        tracing::info!("Calibration confirmed: store {}, round area {}", rect, round_rect);

        if let Err(e) = self.spawn_capture(rect, round_rect, cancel.clone()) {
            self.shutdown();
            return Err(e);
        }

        let result = self.run_loop(&cancel);
        if let Err(e) = &result {
            tracing::error!("Main loop failed, stopping: {:#}", e);
            self.shutdown();
        }
        result
    }

    /// Folds overlay events until the user confirms.
    ///
    /// Returns `None` if cancelled first.
    fn calibrate(
        &self,
        events: &Receiver<CalibrationEvent>,
        cancel: &CancelToken,
    ) -> Result<Option<CalibrationState>> {
        let poll = Duration::from_millis(self.config.calibration.confirm_poll_ms.max(1));
        let deadline = self
            .config
            .calibration
            .confirm_timeout_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs));
        let offset = self.config.calibration.round_area;
        let mut calibration = CalibrationState::new();

        while !cancel.is_cancelled() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                bail!("Calibration was not confirmed in time");
            }

            match events.recv_timeout(poll) {
                Ok(CalibrationEvent::Changed(rect)) => {
                    calibration.propose(rect, &offset);
                    self.transition(
                        &[LifecycleState::Calibrating, LifecycleState::AwaitingConfirmation],
                        LifecycleState::AwaitingConfirmation,
                    );
                    tracing::info!("Store area proposed: {}", rect.normalized());
                }
                Ok(CalibrationEvent::Confirmed(true)) => {
                    if calibration.confirm() {
                        return Ok(Some(calibration));
                    }
                    tracing::warn!("Confirmation received before any area was proposed");
                }
                Ok(CalibrationEvent::Confirmed(false)) => {
                    calibration.reject();
                    self.transition(
                        &[LifecycleState::AwaitingConfirmation],
                        LifecycleState::Calibrating,
                    );
                    tracing::info!("Store area rejected, recalibrating");
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    if cancel.is_cancelled() {
                        break;
                    }
                    return Err(anyhow!("Calibration overlay closed before confirmation"));
                }
            }
        }
        Ok(None)
    }

    fn spawn_capture(&self, rect: Rect, round_rect: Rect, cancel: CancelToken) -> Result<()> {
        let capturer = self.capturer.clone();
        let extractor = self.extractor.clone();
        let store = self.store.clone();
        let interval = Duration::from_millis(self.config.capture.interval_ms);
        let read_round = self.config.detection.read_round_area;
        let archive_slots = self
            .config
            .capture
            .archive_frames
            .then_some(self.config.capture.archive_slots);

        let handle = thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || {
                run_capture_loop(capturer.as_ref(), rect, interval, &cancel, |frame| {
                    let round_frame = if read_round {
                        capturer
                            .capture(round_rect)
                            .map_err(|e| tracing::warn!("Round area capture failed: {:#}", e))
                            .ok()
                    } else {
                        None
                    };
                    store.update(extractor.extract(&frame, round_frame.as_ref()));

                    if let Some(slots) = archive_slots {
                        if let Err(e) = archive_frame(&frame, slots, &crate::paths::get_screenshots_dir()) {
                            tracing::warn!("Frame archival failed: {:#}", e);
                        }
                    }
                });
            })
            .context("Failed to spawn capture thread")?;

        *lock(&self.capture_handle) = Some(handle);
        Ok(())
    }

    fn run_loop(&self, cancel: &CancelToken) -> Result<()> {
        let interval = Duration::from_millis(self.config.runtime.decision_interval_ms);
        while !cancel.is_cancelled() {
            match catch_unwind(AssertUnwindSafe(|| self.cycle(cancel))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e),
                Err(_) => bail!("Decision cycle panicked"),
            }
            if !cancel.sleep(interval) {
                break;
            }
        }
        tracing::info!("Main loop exited");
        Ok(())
    }

    /// One decide/act cycle.
    fn cycle(&self, cancel: &CancelToken) -> Result<()> {
        let capture_died = lock(&self.capture_handle)
            .as_ref()
            .is_some_and(|h| h.is_finished());
        if capture_died && !cancel.is_cancelled() {
            bail!("Capture thread exited unexpectedly");
        }

        let Some(decision) = self.engine.make_decision(&self.store) else {
            return Ok(());
        };
        if cancel.is_cancelled() {
            return Ok(());
        }
        tracing::info!("Executing decision: {:?}", decision);
        let success = self.dispatcher.execute(&decision, &self.store);
        tracing::info!("Decision executed (success: {})", success);
        Ok(())
    }

    /// Requests the run to end and waits (bounded) for the capture thread.
    ///
    /// Returns false, with a warning, if nothing is running.
    pub fn stop(&self) -> bool {
        if !self.begin_stop() {
            tracing::warn!("stop() ignored: orchestrator is {}", self.state());
            return false;
        }
        self.finish_stop();
        true
    }

    /// Like `stop()` but silent when already stopping or stopped.
    fn shutdown(&self) {
        if self.begin_stop() {
            self.finish_stop();
        }
    }

    fn begin_stop(&self) -> bool {
        self.transition(
            &[
                LifecycleState::Calibrating,
                LifecycleState::AwaitingConfirmation,
                LifecycleState::Running,
            ],
            LifecycleState::Stopping,
        )
    }

    fn finish_stop(&self) {
        tracing::info!("Stopping orchestrator");
        lock(&self.cancel).cancel();

        let handle = lock(&self.capture_handle).take();
        if let Some(handle) = handle {
            let timeout = Duration::from_millis(self.config.runtime.join_timeout_ms);
            join_with_timeout(handle, timeout);
        }

        self.transition(&[LifecycleState::Stopping], LifecycleState::Idle);
        tracing::info!("Orchestrator stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::config::ActionBinding;
    use crate::capture::Frame;
    use anyhow::Result;
    use image::RgbaImage;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc::{channel, Sender};
    use tracing_subscriber::prelude::*;

    struct FakeCapturer {
        panic: AtomicBool,
    }

    impl ScreenCapturer for FakeCapturer {
        fn capture(&self, rect: Rect) -> Result<Frame> {
            if self.panic.load(Ordering::SeqCst) {
                panic!("capture device vanished");
            }
            Ok(Frame::new(RgbaImage::new(8, 8), (rect.left, rect.top)))
        }
    }

    struct BlankRecognizer;

    impl TextRecognizer for BlankRecognizer {
        fn recognize(&self, _img: &RgbaImage) -> Result<String> {
            Ok(String::new())
        }
    }

    struct FixedGenerator(Option<&'static str>);

    impl TextGenerator for FixedGenerator {
        fn generate(&self, _prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<Option<String>> {
            Ok(self.0.map(str::to_string))
        }
    }

    struct PanickingGenerator;

    impl TextGenerator for PanickingGenerator {
        fn generate(&self, _prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<Option<String>> {
            panic!("model backend crashed");
        }
    }

    /// Blocks inside the request the way a slow model backend does.
    struct SlowGenerator {
        entered: AtomicBool,
        delay: Duration,
    }

    impl TextGenerator for SlowGenerator {
        fn generate(&self, _prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<Option<String>> {
            self.entered.store(true, Ordering::SeqCst);
            thread::sleep(self.delay);
            Ok(None)
        }
    }

    #[derive(Default)]
    struct CountingInput {
        keys: AtomicUsize,
    }

    impl InputDriver for CountingInput {
        fn move_to(&self, _x: i32, _y: i32, _duration: Duration) -> Result<()> {
            Ok(())
        }
        fn click(&self) -> Result<()> {
            Ok(())
        }
        fn double_click(&self) -> Result<()> {
            Ok(())
        }
        fn press(&self) -> Result<()> {
            Ok(())
        }
        fn release(&self) -> Result<()> {
            Ok(())
        }
        fn key_press(&self, _key: &str) -> Result<()> {
            self.keys.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Counts WARN events on the thread it is installed on.
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    struct Harness {
        orchestrator: Arc<Orchestrator>,
        input: Arc<CountingInput>,
        capturer: Arc<FakeCapturer>,
        events: Sender<CalibrationEvent>,
        runner: JoinHandle<Result<()>>,
    }

    fn test_config() -> AgentConfig {
        let mut config = AgentConfig::default();
        config.capture.interval_ms = 10;
        config.calibration.confirm_poll_ms = 5;
        config.runtime.decision_interval_ms = 10;
        config.runtime.join_timeout_ms = 1000;
        config.actions.action_delay_ms = 0;
        config.actions.mouse_move_ms = 0;
        config.actions.refresh_shop = ActionBinding::Key("d".to_string());
        config
    }

    fn harness(reply: Option<&'static str>) -> Harness {
        harness_with(test_config(), Arc::new(FixedGenerator(reply)))
    }

    fn harness_with(config: AgentConfig, generator: Arc<dyn TextGenerator>) -> Harness {
        let input = Arc::new(CountingInput::default());
        let capturer = Arc::new(FakeCapturer {
            panic: AtomicBool::new(false),
        });
        let collaborators = Collaborators {
            capturer: capturer.clone(),
            recognizer: Arc::new(BlankRecognizer),
            generator,
            input: input.clone(),
        };
        let orchestrator = Arc::new(Orchestrator::new(config, collaborators));
        let (events, receiver) = channel();
        let runner = {
            let orchestrator = orchestrator.clone();
            thread::spawn(move || orchestrator.start(&receiver))
        };
        Harness {
            orchestrator,
            input,
            capturer,
            events,
            runner,
        }
    }

    fn wait_for(what: &str, mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "timed out waiting for {}", what);
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn confirm(h: &Harness) {
        send_confirmation(h);
        wait_for("running", || h.orchestrator.state() == LifecycleState::Running);
    }

    fn send_confirmation(h: &Harness) {
        wait_for("calibrating", || h.orchestrator.state() == LifecycleState::Calibrating);
        h.events
            .send(CalibrationEvent::Changed(Rect::from_corners(10, 500, 210, 600)))
            .unwrap();
        wait_for("awaiting", || {
            h.orchestrator.state() == LifecycleState::AwaitingConfirmation
        });
        h.events.send(CalibrationEvent::Confirmed(true)).unwrap();
    }

    #[test]
    fn test_runs_decisions_until_stopped() {
        let h = harness(Some("刷新商店"));
        confirm(&h);
        wait_for("key press", || h.input.keys.load(Ordering::SeqCst) > 0);

        assert!(h.orchestrator.stop());
        assert_eq!(h.orchestrator.state(), LifecycleState::Idle);
        h.runner.join().unwrap().unwrap();
    }

    #[test]
    fn test_stop_twice_warns_once() {
        let h = harness(None);
        confirm(&h);

        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
        tracing::subscriber::with_default(subscriber, || {
            assert!(h.orchestrator.stop());
            assert_eq!(h.orchestrator.state(), LifecycleState::Idle);
            assert!(!h.orchestrator.stop());
        });

        assert_eq!(warnings.load(Ordering::SeqCst), 1);
        assert_eq!(h.orchestrator.state(), LifecycleState::Idle);
        h.runner.join().unwrap().unwrap();
    }

    #[test]
    fn test_start_while_running_is_noop() {
        let h = harness(None);
        confirm(&h);

        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
        let (_tx, rx) = channel();
        tracing::subscriber::with_default(subscriber, || {
            h.orchestrator.start(&rx).unwrap();
        });

        assert_eq!(warnings.load(Ordering::SeqCst), 1);
        assert_eq!(h.orchestrator.state(), LifecycleState::Running);
        h.orchestrator.stop();
        h.runner.join().unwrap().unwrap();
    }

    #[test]
    fn test_reject_returns_to_calibrating() {
        let h = harness(None);
        wait_for("calibrating", || h.orchestrator.state() == LifecycleState::Calibrating);
        h.events
            .send(CalibrationEvent::Changed(Rect::from_corners(0, 0, 50, 50)))
            .unwrap();
        wait_for("awaiting", || {
            h.orchestrator.state() == LifecycleState::AwaitingConfirmation
        });
        h.events.send(CalibrationEvent::Confirmed(false)).unwrap();
        wait_for("calibrating again", || {
            h.orchestrator.state() == LifecycleState::Calibrating
        });

        assert!(h.orchestrator.stop());
        h.runner.join().unwrap().unwrap();
        assert_eq!(h.orchestrator.state(), LifecycleState::Idle);
    }

    #[test]
    fn test_capture_thread_death_stops_run() {
        let h = harness(None);
        confirm(&h);
        h.capturer.panic.store(true, Ordering::SeqCst);

        let result = h.runner.join().unwrap();
        assert!(result.is_err());
        assert_eq!(h.orchestrator.state(), LifecycleState::Idle);
    }

    #[test]
    fn test_overlay_closed_during_calibration_is_error() {
        let h = harness(None);
        wait_for("calibrating", || h.orchestrator.state() == LifecycleState::Calibrating);
        drop(h.events);
        assert!(h.runner.join().unwrap().is_err());
        assert_eq!(h.orchestrator.state(), LifecycleState::Idle);
    }

    #[test]
    fn test_confirmation_timeout_returns_to_idle() {
        let mut config = test_config();
        config.calibration.confirm_timeout_secs = Some(0);
        let h = harness_with(config, Arc::new(FixedGenerator(None)));

        let err = h.runner.join().unwrap().unwrap_err();
        assert!(err.to_string().contains("not confirmed in time"));
        assert_eq!(h.orchestrator.state(), LifecycleState::Idle);
    }

    #[test]
    fn test_panicking_cycle_stops_run() {
        let h = harness_with(test_config(), Arc::new(PanickingGenerator));
        // The first cycle may panic before Running is observable.
        send_confirmation(&h);

        let err = h.runner.join().unwrap().unwrap_err();
        assert!(err.to_string().contains("panicked"));
        assert_eq!(h.orchestrator.state(), LifecycleState::Idle);
        assert_eq!(h.input.keys.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_worker_stuck_in_generation_is_abandoned() {
        let generator = Arc::new(SlowGenerator {
            entered: AtomicBool::new(false),
            delay: Duration::from_secs(2),
        });
        let h = harness_with(test_config(), generator.clone());
        confirm(&h);
        wait_for("generation", || generator.entered.load(Ordering::SeqCst));

        let started = Instant::now();
        assert!(h.orchestrator.stop());
        assert_eq!(h.orchestrator.state(), LifecycleState::Idle);
        assert!(!join_with_timeout(h.runner, Duration::from_millis(50)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_join_with_timeout_abandons_slow_thread() {
        let handle = thread::spawn(|| thread::sleep(Duration::from_millis(300)));
        let started = Instant::now();
        assert!(!join_with_timeout(handle, Duration::from_millis(20)));
        assert!(started.elapsed() < Duration::from_millis(250));

        let handle = thread::spawn(|| {});
        assert!(join_with_timeout(handle, Duration::from_secs(1)));
    }
}
