//! Application Coordinator
//!
//! Runs the capture loop and the translation worker on their own threads.
//! Frames flow through a single-slot queue: when the worker is still busy the
//! newest frame is dropped, so capture and display keep their cadence no
//! matter how long OCR or the translation request take.

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use image::DynamicImage;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::capture::frame::CapturedFrame;
use crate::capture::FrameSource;
use crate::config::AppConfig;
use crate::shared::{SharedAppState, WorkerMessage};
use crate::translation::{Translation, Translator};
use crate::vision::{FramePipeline, FrameText};

/// What happened to one frame in the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Translation published
    Translated,
    /// No text in the frame; display cleared
    Empty,
    /// Recognition failed; display unchanged
    RecognitionFailed,
    /// Translation failed; display unchanged
    TranslationFailed,
}

/// Recognizes and translates frames, publishing results to the shared state
pub struct TranslationWorker {
    pipeline: FramePipeline,
    translator: Box<dyn Translator>,
    target_language: String,
    state: Arc<RwLock<SharedAppState>>,
    runtime: tokio::runtime::Runtime,
}

impl TranslationWorker {
    /// Create a worker with its own single-threaded async runtime
    pub fn new(
        pipeline: FramePipeline,
        translator: Box<dyn Translator>,
        state: Arc<RwLock<SharedAppState>>,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to build worker runtime")?;
        let target_language = state.read().config.translation.target_language.clone();

        Ok(Self {
            pipeline,
            translator,
            target_language,
            state,
            runtime,
        })
    }

    /// Recognize and translate one frame
    pub fn handle_frame(&self, frame: &CapturedFrame) -> FrameOutcome {
        let frame_text = match self.pipeline.process_frame(frame) {
            Ok(text) => text,
            Err(e) => {
                warn!("Recognition failed for frame {}: {:#}", frame.sequence, e);
                let mut state = self.state.write();
                state.runtime.ocr_failures += 1;
                state.runtime.set_error(format!("Recognition failed: {:#}", e));
                return FrameOutcome::RecognitionFailed;
            }
        };

        {
            let mut state = self.state.write();
            state.runtime.frames_processed += 1;
            state.runtime.last_processing_ms = frame_text.processing_time_ms;
        }

        if frame_text.is_empty() {
            debug!("Frame {} has no text", frame.sequence);
            self.state.write().publish_empty(frame.sequence);
            return FrameOutcome::Empty;
        }

        let result = self
            .runtime
            .block_on(self.translator.translate(&frame_text.text, &self.target_language));

        match result {
            Ok(translation) => {
                debug!(
                    "Frame {} translated {:?} after capture: '{}' -> '{}'",
                    frame.sequence,
                    frame.timestamp.elapsed(),
                    frame_text.text,
                    translation.text
                );
                self.state
                    .write()
                    .publish_translation(frame.sequence, frame_text.text, translation.text);
                FrameOutcome::Translated
            }
            Err(e) => {
                warn!(
                    "Translation via {} failed for frame {}: {}",
                    self.translator.name(),
                    frame.sequence,
                    e
                );
                let mut state = self.state.write();
                state.runtime.translation_failures += 1;
                state.runtime.set_error(format!("Translation failed: {}", e));
                FrameOutcome::TranslationFailed
            }
        }
    }

    /// Process frames until the queue closes or a shutdown message arrives
    pub fn run(self, frames: Receiver<WorkerMessage>) {
        info!("Translation worker started (provider: {})", self.translator.name());

        while let Ok(message) = frames.recv() {
            match message {
                WorkerMessage::Frame(frame) => {
                    self.handle_frame(&frame);
                }
                WorkerMessage::Shutdown => break,
            }
        }

        info!("Translation worker stopped");
    }
}

/// Capture frames at a fixed rate and offer them to the worker
fn run_capture_loop<S: FrameSource>(
    mut source: S,
    frames: Sender<WorkerMessage>,
    state: Arc<RwLock<SharedAppState>>,
    stop: Arc<AtomicBool>,
    interval: Duration,
) {
    state.write().runtime.is_capturing = true;
    info!("Capture loop started ({:?} per frame)", interval);

    while !stop.load(Ordering::Relaxed) {
        let tick = Instant::now();

        match source.next_frame() {
            Ok(frame) => {
                state.write().runtime.frames_captured += 1;
                match frames.try_send(WorkerMessage::Frame(frame)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        state.write().runtime.frames_dropped += 1;
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        warn!("Translation worker is gone, stopping capture");
                        break;
                    }
                }
            }
            Err(e) => {
                warn!("Capture failed: {:#}", e);
                let mut state = state.write();
                state.runtime.capture_failures += 1;
                state.runtime.set_error(format!("Capture failed: {:#}", e));
            }
        }

        if let Some(rest) = interval.checked_sub(tick.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    // Waits for the worker to take any queued frame; fails only once it is gone
    let _ = frames.send(WorkerMessage::Shutdown);
    state.write().runtime.is_capturing = false;
    info!("Capture loop stopped");
}

/// Main application coordinator
pub struct TranslatorApp {
    /// Shared state between the threads and the display
    shared_state: Arc<RwLock<SharedAppState>>,
    /// Set to stop the capture loop
    stop: Arc<AtomicBool>,
    capture_handle: Option<JoinHandle<()>>,
    worker_handle: Option<JoinHandle<()>>,
}

impl TranslatorApp {
    /// Create a new application coordinator
    pub fn new(config: AppConfig) -> Self {
        Self {
            shared_state: Arc::new(RwLock::new(SharedAppState::new(config))),
            stop: Arc::new(AtomicBool::new(false)),
            capture_handle: None,
            worker_handle: None,
        }
    }

    /// Start the capture loop and the worker.
    ///
    /// The frame source is opened on the capture thread.
    pub fn start<F, S>(
        &mut self,
        open_source: F,
        pipeline: FramePipeline,
        translator: Box<dyn Translator>,
    ) -> Result<()>
    where
        F: FnOnce() -> Result<S> + Send + 'static,
        S: FrameSource,
    {
        let worker = TranslationWorker::new(pipeline, translator, self.shared_state.clone())?;
        let (frame_tx, frame_rx) = bounded(1);

        let worker_handle = std::thread::Builder::new()
            .name("translation-worker".to_string())
            .spawn(move || worker.run(frame_rx))
            .context("Failed to spawn worker thread")?;

        let state = self.shared_state.clone();
        let stop = self.stop.clone();
        let interval = state.read().config.capture.frame_interval();

        let capture_handle = std::thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || match open_source() {
                Ok(source) => run_capture_loop(source, frame_tx, state, stop, interval),
                Err(e) => {
                    tracing::error!("Failed to open capture source: {:#}", e);
                    state
                        .write()
                        .runtime
                        .set_error(format!("Capture unavailable: {:#}", e));
                }
            })
            .context("Failed to spawn capture thread")?;

        self.worker_handle = Some(worker_handle);
        self.capture_handle = Some(capture_handle);
        info!("Capture and translation threads started");

        Ok(())
    }

    /// Get current shared state
    pub fn state(&self) -> Arc<RwLock<SharedAppState>> {
        self.shared_state.clone()
    }

    /// Check if the capture loop is still running
    pub fn is_running(&self) -> bool {
        self.capture_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Stop capturing and wait for both threads
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);

        if let Some(handle) = self.capture_handle.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TranslatorApp {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Recognize and translate a single image (no display, no threads)
pub fn translate_image(
    image: &DynamicImage,
    pipeline: &FramePipeline,
    translator: &dyn Translator,
    target: &str,
) -> Result<(FrameText, Option<Translation>)> {
    let frame_text = pipeline.process(image)?;
    if frame_text.is_empty() {
        return Ok((frame_text, None));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?;
    let translation = runtime
        .block_on(translator.translate(&frame_text.text, target))
        .context("Translation failed")?;

    Ok((frame_text, Some(translation)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::TranslateError;
    use crate::vision::{TextRecognizer, VisionConfig};
    use anyhow::anyhow;
    use image::{GrayImage, Luma, RgbaImage};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;
    use std::sync::atomic::AtomicUsize;

    struct FixedOcr(&'static str);

    impl TextRecognizer for FixedOcr {
        fn recognize(&self, _image: &GrayImage) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    /// Prefixes the text; fails every call after `ok_calls`
    struct StubTranslator {
        calls: Arc<AtomicUsize>,
        ok_calls: usize,
    }

    impl StubTranslator {
        fn new(ok_calls: usize) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    calls: calls.clone(),
                    ok_calls,
                },
                calls,
            )
        }
    }

    #[async_trait::async_trait]
    impl Translator for StubTranslator {
        async fn translate(&self, text: &str, target: &str) -> Result<Translation, TranslateError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n >= self.ok_calls {
                return Err(TranslateError::RateLimited);
            }
            Ok(Translation {
                text: format!("[{}] {}", target, text),
                target: target.to_string(),
                detected_source: None,
                provider: "stub".to_string(),
            })
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    /// Yields the same frame forever
    struct RepeatSource {
        image: RgbaImage,
        next: u64,
    }

    impl FrameSource for RepeatSource {
        fn next_frame(&mut self) -> Result<CapturedFrame> {
            let frame = CapturedFrame::new(self.image.clone(), self.next);
            self.next += 1;
            Ok(frame)
        }
    }

    fn text_frame_image() -> RgbaImage {
        let mut img = GrayImage::from_pixel(300, 200, Luma([255]));
        draw_filled_rect_mut(&mut img, Rect::at(50, 50).of_size(120, 60), Luma([0]));
        DynamicImage::ImageLuma8(img).to_rgba8()
    }

    fn blank_frame_image() -> RgbaImage {
        RgbaImage::from_pixel(300, 200, image::Rgba([200, 200, 200, 255]))
    }

    fn worker(ocr: &'static str, translator: StubTranslator) -> (TranslationWorker, Arc<RwLock<SharedAppState>>) {
        let state = Arc::new(RwLock::new(SharedAppState::default()));
        let pipeline = FramePipeline::with_engine(&VisionConfig::default(), Box::new(FixedOcr(ocr)));
        let worker = TranslationWorker::new(pipeline, Box::new(translator), state.clone()).unwrap();
        (worker, state)
    }

    #[test]
    fn test_worker_publishes_translation() {
        let (translator, calls) = StubTranslator::new(usize::MAX);
        let (worker, state) = worker(" 开始游戏 ", translator);

        let outcome = worker.handle_frame(&CapturedFrame::new(text_frame_image(), 4));

        assert_eq!(outcome, FrameOutcome::Translated);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let state = state.read();
        assert_eq!(state.display.source_text, "开始游戏");
        assert_eq!(state.display.translated_text, "[en-US] 开始游戏");
        assert_eq!(state.display.frame_sequence, Some(4));
        assert_eq!(state.runtime.frames_processed, 1);
    }

    #[test]
    fn test_empty_frame_skips_translation() {
        let (translator, calls) = StubTranslator::new(usize::MAX);
        let (worker, state) = worker("unused", translator);

        worker.handle_frame(&CapturedFrame::new(text_frame_image(), 0));
        let outcome = worker.handle_frame(&CapturedFrame::new(blank_frame_image(), 1));

        assert_eq!(outcome, FrameOutcome::Empty);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(state.read().display.translated_text.is_empty());
    }

    #[test]
    fn test_translation_failure_keeps_previous_text() {
        let (translator, _calls) = StubTranslator::new(1);
        let (worker, state) = worker("你好", translator);

        assert_eq!(
            worker.handle_frame(&CapturedFrame::new(text_frame_image(), 0)),
            FrameOutcome::Translated
        );
        assert_eq!(
            worker.handle_frame(&CapturedFrame::new(text_frame_image(), 1)),
            FrameOutcome::TranslationFailed
        );

        let state = state.read();
        assert_eq!(state.display.translated_text, "[en-US] 你好");
        assert_eq!(state.display.frame_sequence, Some(0));
        assert_eq!(state.runtime.translation_failures, 1);
        assert!(state.runtime.last_error.as_deref().unwrap().contains("Rate limit"));
    }

    #[test]
    fn test_recognition_failure_keeps_previous_text() {
        struct BrokenOcr;
        impl TextRecognizer for BrokenOcr {
            fn recognize(&self, _image: &GrayImage) -> Result<String> {
                Err(anyhow!("tesseract missing"))
            }
        }

        let state = Arc::new(RwLock::new(SharedAppState::default()));
        state
            .write()
            .publish_translation(0, "旧".to_string(), "old".to_string());
        let config = VisionConfig {
            ocr_error_policy: crate::vision::OcrErrorPolicy::FailFrame,
            ..Default::default()
        };
        let pipeline = FramePipeline::with_engine(&config, Box::new(BrokenOcr));
        let (translator, calls) = StubTranslator::new(usize::MAX);
        let worker = TranslationWorker::new(pipeline, Box::new(translator), state.clone()).unwrap();

        let outcome = worker.handle_frame(&CapturedFrame::new(text_frame_image(), 1));

        assert_eq!(outcome, FrameOutcome::RecognitionFailed);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(state.read().display.translated_text, "old");
        assert_eq!(state.read().runtime.ocr_failures, 1);
    }

    #[test]
    fn test_app_runs_and_shuts_down() {
        let mut config = AppConfig::default();
        config.capture.max_fps = 100;
        let mut app = TranslatorApp::new(config);
        let state = app.state();

        let pipeline = FramePipeline::with_engine(&VisionConfig::default(), Box::new(FixedOcr("菜单")));
        let (translator, _calls) = StubTranslator::new(usize::MAX);
        let image = text_frame_image();

        app.start(move || Ok(RepeatSource { image, next: 0 }), pipeline, Box::new(translator))
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while state.read().display.translated_text.is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(app.is_running());

        app.shutdown();

        let state = state.read();
        assert_eq!(state.display.translated_text, "[en-US] 菜单");
        assert!(state.runtime.frames_captured >= 1);
        assert!(!state.runtime.is_capturing);
        assert!(!app.is_running());
    }

    /// Blocks in OCR until the test drops the release sender
    struct BlockingOcr {
        entered: Sender<()>,
        release: Receiver<()>,
    }

    impl TextRecognizer for BlockingOcr {
        fn recognize(&self, _image: &GrayImage) -> Result<String> {
            let _ = self.entered.try_send(());
            let _ = self.release.recv();
            Ok("文本".to_string())
        }
    }

    /// Every second capture fails
    struct FlakySource {
        inner: RepeatSource,
        calls: u64,
    }

    impl FrameSource for FlakySource {
        fn next_frame(&mut self) -> Result<CapturedFrame> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                return Err(anyhow!("frame lost"));
            }
            self.inner.next_frame()
        }
    }

    fn wait_until(state: &Arc<RwLock<SharedAppState>>, done: impl Fn(&SharedAppState) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if done(&state.read()) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_frames_dropped_while_worker_busy() {
        let mut config = AppConfig::default();
        config.capture.max_fps = 100;
        let mut app = TranslatorApp::new(config);
        let state = app.state();

        let (entered_tx, entered_rx) = bounded(1);
        let (release_tx, release_rx) = bounded::<()>(0);
        let ocr = BlockingOcr {
            entered: entered_tx,
            release: release_rx,
        };
        let pipeline = FramePipeline::with_engine(&VisionConfig::default(), Box::new(ocr));
        let (translator, _calls) = StubTranslator::new(usize::MAX);
        let image = text_frame_image();

        app.start(move || Ok(RepeatSource { image, next: 0 }), pipeline, Box::new(translator))
            .unwrap();

        entered_rx.recv_timeout(Duration::from_secs(10)).unwrap();
        let dropped = wait_until(&state, |s| s.runtime.frames_dropped >= 3);
        let processed_while_blocked = state.read().runtime.frames_processed;

        drop(release_tx);
        app.shutdown();

        assert!(dropped);
        assert_eq!(processed_while_blocked, 0);
        let state = state.read();
        assert!(state.runtime.frames_captured > state.runtime.frames_processed);
    }

    #[test]
    fn test_capture_failures_do_not_stop_the_loop() {
        let mut config = AppConfig::default();
        config.capture.max_fps = 100;
        let mut app = TranslatorApp::new(config);
        let state = app.state();

        let pipeline = FramePipeline::with_engine(&VisionConfig::default(), Box::new(FixedOcr("设置")));
        let (translator, _calls) = StubTranslator::new(usize::MAX);
        let source = FlakySource {
            inner: RepeatSource {
                image: text_frame_image(),
                next: 0,
            },
            calls: 0,
        };

        app.start(move || Ok(source), pipeline, Box::new(translator)).unwrap();

        let recovered = wait_until(&state, |s| {
            s.runtime.capture_failures >= 2 && s.runtime.frames_translated >= 2
        });
        app.shutdown();

        assert!(recovered);
        let state = state.read();
        assert_eq!(state.display.translated_text, "[en-US] 设置");
        assert!(state.runtime.frames_captured >= 2);
    }

    #[test]
    fn test_capture_loop_sends_shutdown_after_queued_frame() {
        let (tx, rx) = bounded(1);
        tx.try_send(WorkerMessage::Frame(CapturedFrame::new(RgbaImage::new(1, 1), 0)))
            .unwrap();

        let state = Arc::new(RwLock::new(SharedAppState::default()));
        let stop = Arc::new(AtomicBool::new(true));
        let source = RepeatSource {
            image: RgbaImage::new(1, 1),
            next: 1,
        };
        let handle = std::thread::spawn({
            let state = state.clone();
            move || run_capture_loop(source, tx, state, stop, Duration::from_millis(1))
        });

        assert!(matches!(rx.recv().unwrap(), WorkerMessage::Frame(_)));
        assert!(matches!(rx.recv().unwrap(), WorkerMessage::Shutdown));
        handle.join().unwrap();
        assert!(!state.read().runtime.is_capturing);
    }

    #[test]
    fn test_failing_source_does_not_panic() {
        let mut app = TranslatorApp::new(AppConfig::default());
        let state = app.state();
        let pipeline = FramePipeline::with_engine(&VisionConfig::default(), Box::new(FixedOcr("x")));
        let (translator, _calls) = StubTranslator::new(usize::MAX);

        app.start(
            || -> Result<RepeatSource> { Err(anyhow!("no display")) },
            pipeline,
            Box::new(translator),
        )
        .unwrap();
        app.shutdown();

        let error = state.read().runtime.last_error.clone().unwrap();
        assert!(error.contains("no display"));
    }

    #[test]
    fn test_translate_image() {
        let pipeline = FramePipeline::with_engine(&VisionConfig::default(), Box::new(FixedOcr("你好")));
        let (translator, _calls) = StubTranslator::new(usize::MAX);

        let image = DynamicImage::ImageRgba8(text_frame_image());
        let (frame_text, translation) = translate_image(&image, &pipeline, &translator, "en-US").unwrap();

        assert_eq!(frame_text.text, "你好");
        assert_eq!(translation.unwrap().text, "[en-US] 你好");

        let blank = DynamicImage::ImageRgba8(blank_frame_image());
        let (frame_text, translation) = translate_image(&blank, &pipeline, &translator, "en-US").unwrap();
        assert!(frame_text.is_empty());
        assert!(translation.is_none());
    }
}
