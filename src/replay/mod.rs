//! Plays a recorded script back against the application under test.

pub mod input;
pub mod report;

pub use input::{InjectError, InputInjector, WindowControl, WindowInfo};
pub use report::{ReplayError, ReplayReport};

use crate::compare::{AssertionFailure, CapturePolicy, Comparator, ComparisonResult, PolicyOutcome};
use crate::config::ReplayConfig;
use crate::export::script::{Instruction, Position, Script};
use crate::recorder::capture::ScreenCapture;
use crate::recorder::dispatch::UiDispatcher;
use crate::recorder::input_event::Phase;
use crate::recorder::window_info::WindowError;
use image::RgbaImage;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

pub struct Runner {
    config: ReplayConfig,
    policy: CapturePolicy,
    injector: Box<dyn InputInjector>,
    windows: Box<dyn WindowControl>,
    capture: Box<dyn ScreenCapture>,
    dispatcher: Arc<dyn UiDispatcher>,
}

impl Runner {
    pub fn new(
        config: ReplayConfig,
        policy: CapturePolicy,
        injector: Box<dyn InputInjector>,
        windows: Box<dyn WindowControl>,
        capture: Box<dyn ScreenCapture>,
        dispatcher: Arc<dyn UiDispatcher>,
    ) -> Self {
        Self {
            config,
            policy,
            injector,
            windows,
            capture,
            dispatcher,
        }
    }

    /// Execute every instruction in order.
    ///
    /// Window and injection errors abort the run. Image assertions never do;
    /// they are collected in the returned report.
    pub fn run(&self, script: &Script) -> Result<ReplayReport, ReplayError> {
        let mut report = ReplayReport::new();
        for instruction in script.iter() {
            log::debug!("replay: {instruction}");
            self.execute(instruction, &mut report)?;
            report.executed += 1;
        }
        log::info!(
            "replay finished: {} instructions, {} failures",
            report.executed,
            report.failures().len()
        );
        Ok(report)
    }

    fn execute(
        &self,
        instruction: &Instruction,
        report: &mut ReplayReport,
    ) -> Result<(), ReplayError> {
        match instruction {
            Instruction::WaitForWindow => self.wait_for_window().map(|_| ()),
            Instruction::Delay { ms } => {
                thread::sleep(self.config.scaled_delay(*ms));
                Ok(())
            }
            Instruction::Key { phase, code, raise } => {
                self.raise_opt(raise.as_deref())?;
                match phase {
                    Phase::Pressed => self.injector.press_key(*code)?,
                    Phase::Released => self.injector.release_key(*code)?,
                }
                self.wait_for_events()
            }
            Instruction::Wheel { amount, raise } => {
                self.raise_opt(raise.as_deref())?;
                self.injector.scroll(*amount)?;
                self.wait_for_events()
            }
            Instruction::Move { to, raise } => {
                self.raise_opt(raise.as_deref())?;
                self.move_to(*to)
            }
            Instruction::Button {
                phase,
                button,
                at,
                raise,
            } => {
                self.raise_opt(raise.as_deref())?;
                self.move_to(*at)?;
                match phase {
                    Phase::Pressed => self.injector.press_button(*button)?,
                    Phase::Released => self.injector.release_button(*button)?,
                }
                self.wait_for_events()
            }
            Instruction::Compare { file, threshold } => {
                self.compare(file, threshold.unwrap_or(self.config.threshold), report);
                Ok(())
            }
        }
    }

    /// Block until the UI thread has processed everything injected so far.
    fn wait_for_events(&self) -> Result<(), ReplayError> {
        self.dispatcher.drain().map_err(ReplayError::Dispatch)
    }

    /// Poll until any window of the application is active.
    pub fn wait_for_window(&self) -> Result<WindowInfo, ReplayError> {
        let started = Instant::now();
        loop {
            if let Some(window) = self.windows.active_window() {
                return Ok(window);
            }
            if let Some(timeout) = self.config.wait_for_window_timeout() {
                if started.elapsed() >= timeout {
                    return Err(ReplayError::WaitForWindowTimedOut(timeout));
                }
            }
            thread::sleep(self.config.window_poll());
        }
    }

    /// The active, visible window that window-relative positions refer to.
    fn focused_window(&self) -> Result<WindowInfo, ReplayError> {
        let deadline = Instant::now() + self.config.window_timeout();
        loop {
            match self.windows.active_window() {
                Some(window) if window.visible => return Ok(window),
                _ if Instant::now() >= deadline => return Err(WindowError::NotVisible.into()),
                _ => thread::sleep(self.config.window_lookup_poll()),
            }
        }
    }

    /// Bring the window called `name` to the front unless it already has focus.
    pub fn raise(&self, name: &str) -> Result<(), ReplayError> {
        let window = self
            .windows
            .window_named(name)
            .ok_or_else(|| WindowError::NotFound(name.to_string()))?;
        if !window.active {
            log::debug!("raising {name}");
            self.windows.bring_to_front(name);
        }
        Ok(())
    }

    fn raise_opt(&self, name: Option<&str>) -> Result<(), ReplayError> {
        match name {
            Some(name) => self.raise(name),
            None => Ok(()),
        }
    }

    fn resolve(&self, position: Position) -> Result<(i32, i32), ReplayError> {
        match position {
            Position::Screen { x, y } => Ok((x, y)),
            Position::Window { x, y } => Ok(self.focused_window()?.to_screen(x, y)),
        }
    }

    fn move_to(&self, position: Position) -> Result<(), ReplayError> {
        let (x, y) = self.resolve(position)?;
        self.injector.move_cursor(x, y)?;
        self.wait_for_events()
    }

    fn compare(&self, file: &str, threshold: f64, report: &mut ReplayReport) {
        report.comparisons += 1;

        let reference = match image::open(self.config.image_dir.join(file)) {
            Ok(image) => image.to_rgba8(),
            Err(err) => {
                log::error!("cannot read reference {file}: {err}");
                report.add_failure(AssertionFailure::ReferenceUnreadable {
                    file: file.to_string(),
                    reason: err.to_string(),
                });
                return;
            }
        };

        let comparator = Comparator::new(threshold).with_white_equals(self.policy.white_equals);
        let attempts = self.config.retry_attempts.max(1);
        let mut last: Option<(RgbaImage, ComparisonResult)> = None;
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.capture.capture() {
                Ok(live) => {
                    let result = comparator.compare(&reference, &live);
                    if result.matched {
                        log::debug!(
                            "{file} matched on attempt {attempt} ({:.2} dB)",
                            result.score
                        );
                        return;
                    }
                    last = Some((live, result));
                }
                Err(err) => {
                    log::warn!("capture for {file} failed on attempt {attempt}: {err}");
                    last_error = Some(err);
                }
            }
            if attempt < attempts {
                thread::sleep(self.config.retry_interval());
            }
        }

        let Some((live, result)) = last else {
            report.add_failure(AssertionFailure::CaptureFailed {
                file: file.to_string(),
                reason: last_error.map_or_else(|| "no capture".to_string(), |e| e.to_string()),
            });
            return;
        };

        let decision = self.policy.decide(&result);
        match self
            .policy
            .apply(decision, &result, &live, &self.config.image_dir, file)
        {
            PolicyOutcome::Passed => {}
            PolicyOutcome::Recaptured { .. } => report.recaptured.push(file.to_string()),
            PolicyOutcome::Failed(failure) => report.add_failure(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::script::SCRIPT_VERSION;
    use crate::recorder::capture::CaptureError;
    use crate::recorder::dispatch::InlineDispatcher;
    use crate::recorder::input_event::PointerButton;
    use crate::recorder::types::RecordingMode;
    use image::Rgba;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Injected {
        PressKey(u32),
        ReleaseKey(u32),
        Move(i32, i32),
        Press(PointerButton),
        Release(PointerButton),
        Scroll(i32),
    }

    #[derive(Clone, Default)]
    struct FakeInjector(Arc<Mutex<Vec<Injected>>>);

    impl FakeInjector {
        fn push(&self, action: Injected) -> Result<(), InjectError> {
            self.0.lock().unwrap().push(action);
            Ok(())
        }

        fn log(&self) -> Vec<Injected> {
            self.0.lock().unwrap().clone()
        }
    }

    impl InputInjector for FakeInjector {
        fn press_key(&self, code: u32) -> Result<(), InjectError> {
            self.push(Injected::PressKey(code))
        }
        fn release_key(&self, code: u32) -> Result<(), InjectError> {
            self.push(Injected::ReleaseKey(code))
        }
        fn move_cursor(&self, x: i32, y: i32) -> Result<(), InjectError> {
            self.push(Injected::Move(x, y))
        }
        fn press_button(&self, button: PointerButton) -> Result<(), InjectError> {
            self.push(Injected::Press(button))
        }
        fn release_button(&self, button: PointerButton) -> Result<(), InjectError> {
            self.push(Injected::Release(button))
        }
        fn scroll(&self, amount: i32) -> Result<(), InjectError> {
            self.push(Injected::Scroll(amount))
        }
    }

    #[derive(Clone, Default)]
    struct FakeWindows {
        windows: Arc<Mutex<Vec<WindowInfo>>>,
        raised: Arc<Mutex<Vec<String>>>,
    }

    impl FakeWindows {
        fn with(windows: Vec<WindowInfo>) -> Self {
            Self {
                windows: Arc::new(Mutex::new(windows)),
                ..Self::default()
            }
        }

        fn raised(&self) -> Vec<String> {
            self.raised.lock().unwrap().clone()
        }
    }

    impl WindowControl for FakeWindows {
        fn active_window(&self) -> Option<WindowInfo> {
            self.windows
                .lock()
                .unwrap()
                .iter()
                .find(|w| w.active)
                .cloned()
        }

        fn window_named(&self, name: &str) -> Option<WindowInfo> {
            self.windows
                .lock()
                .unwrap()
                .iter()
                .find(|w| w.name.as_deref() == Some(name))
                .cloned()
        }

        fn bring_to_front(&self, name: &str) {
            self.raised.lock().unwrap().push(name.to_string());
            for window in self.windows.lock().unwrap().iter_mut() {
                window.active = window.name.as_deref() == Some(name);
            }
        }
    }

    /// Returns queued frames in order, then repeats the last one.
    #[derive(Clone)]
    struct FakeCapture {
        frames: Arc<Mutex<VecDeque<RgbaImage>>>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeCapture {
        fn new(frames: Vec<RgbaImage>) -> Self {
            Self {
                frames: Arc::new(Mutex::new(frames.into())),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ScreenCapture for FakeCapture {
        fn capture(&self) -> Result<RgbaImage, CaptureError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut frames = self.frames.lock().unwrap();
            let frame = if frames.len() > 1 {
                frames.pop_front()
            } else {
                frames.front().cloned()
            };
            frame.ok_or(CaptureError::NoActiveWindow)
        }
    }

    #[derive(Default)]
    struct CountingDispatcher(AtomicUsize);

    impl UiDispatcher for CountingDispatcher {
        fn is_ui_thread(&self) -> bool {
            true
        }

        fn post(&self, task: crate::recorder::dispatch::Task) -> Result<(), CaptureError> {
            task();
            Ok(())
        }

        fn drain(&self) -> Result<(), CaptureError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn main_window(active: bool) -> WindowInfo {
        WindowInfo {
            name: Some("MainWindow".into()),
            origin_x: 100,
            origin_y: 40,
            active,
            visible: true,
        }
    }

    fn fast_config(image_dir: &Path) -> ReplayConfig {
        ReplayConfig {
            image_dir: image_dir.to_path_buf(),
            retry_interval_ms: 0,
            window_poll_ms: 1,
            wait_for_window_timeout_ms: Some(20),
            window_lookup_poll_ms: 1,
            window_timeout_ms: 20,
            ..ReplayConfig::default()
        }
    }

    fn script(instructions: Vec<Instruction>) -> Script {
        Script {
            version: SCRIPT_VERSION,
            mode: RecordingMode::Relative,
            instructions,
        }
    }

    fn frame(rgb: [u8; 3]) -> RgbaImage {
        RgbaImage::from_pixel(16, 16, Rgba([rgb[0], rgb[1], rgb[2], 255]))
    }

    struct Harness {
        injector: FakeInjector,
        windows: FakeWindows,
        capture: FakeCapture,
        runner: Runner,
    }

    fn harness(
        config: ReplayConfig,
        policy: CapturePolicy,
        windows: Vec<WindowInfo>,
        frames: Vec<RgbaImage>,
    ) -> Harness {
        let injector = FakeInjector::default();
        let windows = FakeWindows::with(windows);
        let capture = FakeCapture::new(frames);
        let runner = Runner::new(
            config,
            policy,
            Box::new(injector.clone()),
            Box::new(windows.clone()),
            Box::new(capture.clone()),
            Arc::new(InlineDispatcher),
        );
        Harness {
            injector,
            windows,
            capture,
            runner,
        }
    }

    #[test]
    fn injects_window_relative_input() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(
            fast_config(dir.path()),
            CapturePolicy::default(),
            vec![main_window(true)],
            vec![],
        );
        let report = h
            .runner
            .run(&script(vec![
                Instruction::WaitForWindow,
                Instruction::Delay { ms: 0 },
                Instruction::Key {
                    phase: Phase::Pressed,
                    code: 65,
                    raise: Some("MainWindow".into()),
                },
                Instruction::Button {
                    phase: Phase::Pressed,
                    button: PointerButton::Primary,
                    at: Position::Window { x: 129, y: 46 },
                    raise: None,
                },
                Instruction::Button {
                    phase: Phase::Released,
                    button: PointerButton::Primary,
                    at: Position::Screen { x: 5, y: 6 },
                    raise: None,
                },
                Instruction::Wheel {
                    amount: -3,
                    raise: None,
                },
                Instruction::Key {
                    phase: Phase::Released,
                    code: 65,
                    raise: None,
                },
            ]))
            .expect("run");

        assert_eq!(report.executed, 7);
        assert!(report.is_success());
        assert_eq!(
            h.injector.log(),
            vec![
                Injected::PressKey(65),
                Injected::Move(229, 86),
                Injected::Press(PointerButton::Primary),
                Injected::Move(5, 6),
                Injected::Release(PointerButton::Primary),
                Injected::Scroll(-3),
                Injected::ReleaseKey(65),
            ]
        );
        // Already active, so nothing to raise.
        assert!(h.windows.raised().is_empty());
    }

    #[test]
    fn raise_brings_inactive_window_to_front() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(
            fast_config(dir.path()),
            CapturePolicy::default(),
            vec![main_window(false)],
            vec![],
        );
        h.runner.raise("MainWindow").expect("raise");
        assert_eq!(h.windows.raised(), ["MainWindow"]);
        h.runner.raise("MainWindow").expect("raise again");
        assert_eq!(h.windows.raised().len(), 1);
    }

    #[test]
    fn unknown_window_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(
            fast_config(dir.path()),
            CapturePolicy::default(),
            vec![main_window(true)],
            vec![],
        );
        let err = h
            .runner
            .run(&script(vec![Instruction::Wheel {
                amount: 1,
                raise: Some("Settings".into()),
            }]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Settings not found");
        assert!(h.injector.log().is_empty());
    }

    #[test]
    fn relative_position_without_visible_window_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut hidden = main_window(true);
        hidden.visible = false;
        let h = harness(
            fast_config(dir.path()),
            CapturePolicy::default(),
            vec![hidden],
            vec![],
        );
        let err = h
            .runner
            .run(&script(vec![Instruction::Move {
                to: Position::Window { x: 1, y: 1 },
                raise: None,
            }]))
            .unwrap_err();
        assert!(matches!(err, ReplayError::Window(WindowError::NotVisible)));
    }

    #[test]
    fn wait_for_window_honours_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let config = fast_config(dir.path());
        let h = harness(config, CapturePolicy::default(), vec![], vec![]);
        assert!(matches!(
            h.runner.wait_for_window(),
            Err(ReplayError::WaitForWindowTimedOut(_))
        ));
    }

    #[test]
    fn unchanged_screen_matches_on_first_capture() {
        let dir = tempfile::tempdir().unwrap();
        frame([10, 20, 30]).save(dir.path().join("s.png")).unwrap();
        let h = harness(
            fast_config(dir.path()),
            CapturePolicy::default(),
            vec![main_window(true)],
            vec![frame([10, 20, 30])],
        );
        let report = h
            .runner
            .run(&script(vec![Instruction::Compare {
                file: "s.png".into(),
                threshold: None,
            }]))
            .expect("run");
        assert!(report.is_success());
        assert_eq!(report.comparisons, 1);
        assert_eq!(h.capture.calls(), 1);
    }

    #[test]
    fn compare_retries_until_screen_settles() {
        let dir = tempfile::tempdir().unwrap();
        frame([10, 20, 30]).save(dir.path().join("s.png")).unwrap();
        let h = harness(
            fast_config(dir.path()),
            CapturePolicy::default(),
            vec![main_window(true)],
            vec![frame([200, 0, 0]), frame([0, 200, 0]), frame([10, 20, 30])],
        );
        let report = h
            .runner
            .run(&script(vec![Instruction::Compare {
                file: "s.png".into(),
                threshold: None,
            }]))
            .expect("run");
        assert!(report.is_success());
        assert_eq!(h.capture.calls(), 3);
    }

    #[test]
    fn failures_accumulate_and_run_continues() {
        let dir = tempfile::tempdir().unwrap();
        frame([10, 20, 30]).save(dir.path().join("s.png")).unwrap();
        let h = harness(
            fast_config(dir.path()),
            CapturePolicy::default(),
            vec![main_window(true)],
            vec![frame([250, 20, 30])],
        );
        let report = h
            .runner
            .run(&script(vec![
                Instruction::Compare {
                    file: "missing.png".into(),
                    threshold: None,
                },
                Instruction::Compare {
                    file: "s.png".into(),
                    threshold: None,
                },
                Instruction::Key {
                    phase: Phase::Pressed,
                    code: 32,
                    raise: None,
                },
            ]))
            .expect("run");

        assert_eq!(report.executed, 3);
        assert_eq!(report.failures().len(), 2);
        assert!(matches!(
            report.failures()[0],
            AssertionFailure::ReferenceUnreadable { .. }
        ));
        assert_eq!(
            report.failures()[1].to_string(),
            "Image does not match s.png. See s.delta.png"
        );
        assert!(dir.path().join("s.delta.png").exists());
        assert_eq!(h.capture.calls(), 10);
        assert_eq!(h.injector.log(), vec![Injected::PressKey(32)]);
    }

    #[test]
    fn per_instruction_threshold_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        frame([100, 100, 100])
            .save(dir.path().join("s.png"))
            .unwrap();
        // Off by 20 on every channel: about 22 dB.
        let h = harness(
            fast_config(dir.path()),
            CapturePolicy::default(),
            vec![main_window(true)],
            vec![frame([120, 120, 120])],
        );
        let report = h
            .runner
            .run(&script(vec![Instruction::Compare {
                file: "s.png".into(),
                threshold: Some(20.0),
            }]))
            .expect("run");
        assert!(report.is_success());
    }

    #[test]
    fn recapture_replaces_reference() {
        let dir = tempfile::tempdir().unwrap();
        frame([10, 20, 30]).save(dir.path().join("s.png")).unwrap();
        let policy = CapturePolicy {
            recapture: true,
            ..CapturePolicy::default()
        };
        let h = harness(
            fast_config(dir.path()),
            policy,
            vec![main_window(true)],
            vec![frame([90, 20, 30])],
        );
        let report = h
            .runner
            .run(&script(vec![Instruction::Compare {
                file: "s.png".into(),
                threshold: None,
            }]))
            .expect("run");
        assert!(report.is_success());
        assert_eq!(report.recaptured, ["s.png"]);
        let stored = image::open(dir.path().join("s.png")).unwrap().to_rgba8();
        assert_eq!(stored, frame([90, 20, 30]));
    }

    #[test]
    fn every_action_drains_ui_thread() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = Arc::new(CountingDispatcher::default());
        let runner = Runner::new(
            fast_config(dir.path()),
            CapturePolicy::default(),
            Box::new(FakeInjector::default()),
            Box::new(FakeWindows::with(vec![main_window(true)])),
            Box::new(FakeCapture::new(vec![])),
            dispatcher.clone(),
        );
        runner
            .run(&script(vec![
                Instruction::Key {
                    phase: Phase::Pressed,
                    code: 1,
                    raise: None,
                },
                // Move plus press.
                Instruction::Button {
                    phase: Phase::Pressed,
                    button: PointerButton::Secondary,
                    at: Position::Screen { x: 0, y: 0 },
                    raise: None,
                },
                Instruction::Delay { ms: 0 },
            ]))
            .expect("run");
        assert_eq!(dispatcher.0.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn capture_failures_are_collected() {
        let dir = tempfile::tempdir().unwrap();
        frame([1, 2, 3]).save(dir.path().join("s.png")).unwrap();
        let h = harness(
            fast_config(dir.path()),
            CapturePolicy::default(),
            vec![main_window(true)],
            vec![],
        );
        let report = h
            .runner
            .run(&script(vec![Instruction::Compare {
                file: "s.png".into(),
                threshold: None,
            }]))
            .expect("run");
        assert!(matches!(
            report.failures(),
            [AssertionFailure::CaptureFailed { .. }]
        ));
    }
}
