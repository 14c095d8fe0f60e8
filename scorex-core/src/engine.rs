use std::time::Duration;

use image::GrayImage;
use image::imageops;
use scorex_model::{
    ControlCommand, EngineEvent, ScanDirection, ScanMode, ScanState, aggregate,
};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analysis::analyze_page;
use crate::detector::KeypointDetector;
use crate::error::Result;
use crate::score::{ScorePage, ScoreSet};
use crate::transmit::ParameterSink;

/// Consecutive detector failures tolerated before a scan is abandoned.
const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Runtime knobs for the scan engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Wall-clock spacing between scan ticks.
    pub tick_interval: Duration,
    /// Width of the scan window in page pixels.
    pub window_width: u32,
    /// Continue onto the next page when the window leaves the current one.
    pub auto_advance: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            window_width: 60,
            auto_advance: false,
        }
    }
}

/// The scan engine: owns the score, the scan state, and the outbound sink.
///
/// All state lives on this struct and is mutated strictly between ticks, so
/// command handling never races a detection pass.
pub struct ScanEngine {
    config: EngineConfig,
    score: ScoreSet,
    detector: Box<dyn KeypointDetector>,
    sink: Box<dyn ParameterSink>,
    events: mpsc::UnboundedSender<EngineEvent>,
    state: ScanState,
    scan_id: Option<Uuid>,
    consecutive_failures: u32,
}

impl ScanEngine {
    pub fn new(
        config: EngineConfig,
        score: ScoreSet,
        detector: Box<dyn KeypointDetector>,
        sink: Box<dyn ParameterSink>,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Self {
        Self {
            config,
            score,
            detector,
            sink,
            events,
            state: ScanState::new(),
            scan_id: None,
            consecutive_failures: 0,
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Drive the engine until `Quit` arrives or the command channel closes.
    ///
    /// Commands always win over a pending tick; a tick that falls behind is
    /// skipped rather than replayed.
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<ControlCommand>,
    ) -> Result<()> {
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => {
                    match command {
                        Some(ControlCommand::Quit) | None => break,
                        Some(command) => {
                            let restart_clock =
                                matches!(command, ControlCommand::Scan);
                            self.apply(command).await;
                            if restart_clock {
                                ticker.reset();
                            }
                        }
                    }
                }

                _ = ticker.tick(), if self.state.is_scanning() => {
                    self.step().await;
                }
            }
        }

        self.state.mode = ScanMode::Idle;
        info!("scan engine stopping");
        self.emit(EngineEvent::Stopped);
        Ok(())
    }

    /// Apply one control command against the current state.
    async fn apply(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::Static => self.run_static().await,
            ControlCommand::Scan => self.start_scan(),
            ControlCommand::Reverse => {
                if self.state.is_scanning() {
                    self.state.direction = self.state.direction.flipped();
                    debug!(direction = ?self.state.direction, "direction flipped");
                } else {
                    debug!("reverse ignored outside a scan");
                }
            }
            ControlCommand::Forward => {
                if self.state.is_scanning() {
                    self.state.direction = ScanDirection::Forward;
                } else {
                    debug!("forward ignored outside a scan");
                }
            }
            ControlCommand::NextPage => self.change_page(ScoreSet::next),
            ControlCommand::PrevPage => self.change_page(ScoreSet::previous),
            // Quit never reaches apply; the run loop consumes it.
            ControlCommand::Quit => {}
        }
    }

    /// One whole-page static pass. The engine is idle again afterwards
    /// whatever the outcome.
    async fn run_static(&mut self) {
        self.finish_scan();
        self.state.mode = ScanMode::Static;

        match analyze_page(self.detector.as_ref(), self.score.current().image()) {
            Ok(analysis) => {
                info!(
                    count = analysis.object_count,
                    contrast = analysis.contrast,
                    proximity = analysis.proximity,
                    "static analysis complete"
                );
                if let Err(error) = self.sink.send_static(analysis.object_count).await {
                    warn!(%error, "object count transmission failed");
                }
                self.emit(EngineEvent::StaticAnalyzed(analysis));
            }
            Err(error) => {
                warn!(%error, "static analysis failed");
                self.emit(EngineEvent::StaticFailed);
            }
        }

        self.state.mode = ScanMode::Idle;
    }

    /// Begin (or restart) a scan from the leading edge of the current page.
    fn start_scan(&mut self) {
        self.finish_scan();

        self.state.mode = ScanMode::Scanning;
        self.state.rewind(self.score.current().width());
        self.consecutive_failures = 0;

        let scan_id = Uuid::new_v4();
        self.scan_id = Some(scan_id);
        info!(
            %scan_id,
            page = self.state.page_index,
            direction = ?self.state.direction,
            "scan started"
        );
        self.emit(EngineEvent::ScanStarted {
            scan_id,
            page_index: self.state.page_index,
        });
    }

    /// Close out the active scan, if any, with a `ScanFinished` event.
    fn finish_scan(&mut self) {
        if let Some(scan_id) = self.scan_id.take() {
            self.emit(EngineEvent::ScanFinished { scan_id });
        }
    }

    fn change_page(&mut self, step: fn(&mut ScoreSet) -> bool) {
        if !step(&mut self.score) {
            debug!(page = self.state.page_index, "already at the score boundary");
            return;
        }

        self.state.page_index = self.score.current_index();
        info!(page = self.state.page_index, "page changed");
        self.emit(EngineEvent::PageChanged {
            page_index: self.state.page_index,
        });

        if self.state.is_scanning() {
            self.state.rewind(self.score.current().width());
        }
    }

    /// One scan tick: detect in the window, emit the burst, advance the
    /// window. The clock advances even when detection fails so playback
    /// stays in time with the page duration.
    async fn step(&mut self) {
        let (window, page_width, page_duration) = {
            let page = self.score.current();
            (
                scan_window(page, self.state.position, self.config.window_width),
                page.width(),
                page.duration(),
            )
        };

        match self.detector.detect(&window) {
            Ok(features) => {
                self.consecutive_failures = 0;
                let snapshot = aggregate(&features);
                if let Err(error) = self.sink.send_scan(&snapshot).await {
                    warn!(%error, "parameter burst failed");
                }
            }
            Err(error) => {
                self.consecutive_failures += 1;
                warn!(
                    %error,
                    failures = self.consecutive_failures,
                    "detection failed, skipping tick"
                );
                if self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                    let failures = self.consecutive_failures;
                    self.consecutive_failures = 0;
                    self.state.mode = ScanMode::Idle;
                    self.finish_scan();
                    warn!(failures, "detector stalled, scan abandoned");
                    self.emit(EngineEvent::DetectorStalled { failures });
                    return;
                }
            }
        }

        self.advance(page_width, page_duration);
    }

    /// Move the window by one tick's worth of page travel.
    fn advance(&mut self, page_width: f32, page_duration: Duration) {
        self.state.elapsed += self.config.tick_interval;

        let travel = page_width * self.config.tick_interval.as_secs_f32()
            / page_duration.as_secs_f32();
        self.state.position += travel * self.state.direction.signum();

        if self.state.position < 0.0 || self.state.position >= page_width {
            self.on_page_exhausted();
        }
    }

    /// The window left the page: continue onto the next page when
    /// auto-advance allows it, otherwise return to idle.
    fn on_page_exhausted(&mut self) {
        if self.config.auto_advance && self.score.next() {
            self.state.page_index = self.score.current_index();
            info!(page = self.state.page_index, "advancing to next page");
            self.emit(EngineEvent::PageChanged {
                page_index: self.state.page_index,
            });
            self.state.rewind(self.score.current().width());
            return;
        }

        self.state.mode = ScanMode::Idle;
        self.state.position = self
            .state
            .position
            .clamp(0.0, self.score.current().width() - 1.0);
        info!("scan complete");
        self.finish_scan();
    }

    /// Events are informational; a departed listener is not an error.
    fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }
}

/// Full-height crop centred on the scan position, clipped to the page.
fn scan_window(page: &ScorePage, position: f32, window_width: u32) -> GrayImage {
    let half = window_width as f32 / 2.0;
    let left = (position - half).max(0.0) as u32;
    let right = (position + half).min(page.width()) as u32;
    let width = right.saturating_sub(left).max(1);
    imageops::crop_imm(page.image(), left, 0, width, page.height()).to_image()
}
