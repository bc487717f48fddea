//! The frame decision loop.
//!
//! Each iteration reads one frame, runs the detector, sends exactly one
//! command to the motor controller, then annotates and displays the frame.
//! Decisions carry no state between frames.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::{FollowerConfig, LoopSettings};
use crate::detect::{DetectionThresholds, DetectorBackend};
use crate::display::{DisplayEvent, FrameDisplay};
use crate::ingest::FrameSource;
use crate::overlay;
use crate::policy::{decide, Command, Decision, PolicySettings};
use crate::transport::CommandSink;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// The camera stopped delivering frames.
    EndOfStream,
    /// Quit key or window close.
    Quit,
    /// Shutdown flag raised (Ctrl-C).
    Shutdown,
    MaxFrames,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommandCounts {
    pub left: u64,
    pub right: u64,
    pub stop: u64,
}

impl CommandCounts {
    pub fn record(&mut self, command: Command) {
        match command {
            Command::Left => self.left += 1,
            Command::Right => self.right += 1,
            Command::Stop => self.stop += 1,
        }
    }

    pub fn get(&self, command: Command) -> u64 {
        match command {
            Command::Left => self.left,
            Command::Right => self.right,
            Command::Stop => self.stop,
        }
    }

    pub fn total(&self) -> u64 {
        self.left + self.right + self.stop
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    /// A frame was processed and its command sent.
    Continue(Decision),
    Finished(ExitReason),
}

/// What a finished run did. The final STOP sent on exit is not counted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub exit_reason: ExitReason,
    pub last_command: Option<Command>,
    pub counts: CommandCounts,
}

pub struct Follower {
    source: Box<dyn FrameSource>,
    detector: Box<dyn DetectorBackend>,
    sink: Box<dyn CommandSink>,
    display: Box<dyn FrameDisplay>,
    policy: PolicySettings,
    thresholds: DetectionThresholds,
    settings: LoopSettings,
    shutdown: Arc<AtomicBool>,
    frames: u64,
    counts: CommandCounts,
    last_command: Option<Command>,
    last_health_log: Instant,
    frames_at_last_health: u64,
}

impl Follower {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn DetectorBackend>,
        sink: Box<dyn CommandSink>,
        display: Box<dyn FrameDisplay>,
    ) -> Self {
        Self {
            source,
            detector,
            sink,
            display,
            policy: PolicySettings::default(),
            thresholds: DetectionThresholds::default(),
            settings: LoopSettings::default(),
            shutdown: Arc::new(AtomicBool::new(false)),
            frames: 0,
            counts: CommandCounts::default(),
            last_command: None,
            last_health_log: Instant::now(),
            frames_at_last_health: 0,
        }
    }

    /// Apply policy, thresholds and loop settings from a loaded config.
    pub fn with_config(self, config: &FollowerConfig) -> Self {
        self.with_policy(config.policy.clone())
            .with_thresholds(config.detector.thresholds)
            .with_loop_settings(config.run.clone())
    }

    pub fn with_policy(mut self, policy: PolicySettings) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_thresholds(mut self, thresholds: DetectionThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_loop_settings(mut self, settings: LoopSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Share a flag that stops the loop at the next frame boundary.
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn counts(&self) -> CommandCounts {
        self.counts
    }

    /// Process one frame.
    ///
    /// A failed camera read ends the stream. Detector and serial failures
    /// are returned as errors.
    pub fn step(&mut self) -> Result<StepOutcome> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Ok(StepOutcome::Finished(ExitReason::Shutdown));
        }
        if let Some(max) = self.settings.max_frames {
            if self.frames >= max {
                return Ok(StepOutcome::Finished(ExitReason::MaxFrames));
            }
        }

        let mut frame = match self.source.next_frame() {
            Ok(frame) => frame,
            Err(err) => {
                log::info!("camera {} ended: {:#}", self.source.name(), err);
                return Ok(StepOutcome::Finished(ExitReason::EndOfStream));
            }
        };

        let detections = self
            .detector
            .detect(&frame, &self.thresholds)
            .with_context(|| format!("{} detector failed", self.detector.name()))?;

        let decision = decide(&detections, frame.width, &self.policy);
        self.sink
            .send(decision.command)
            .with_context(|| format!("failed to send {} to {}", decision.command, self.sink.name()))?;

        self.frames += 1;
        self.counts.record(decision.command);
        if self.last_command != Some(decision.command) {
            log::info!("{}", describe(&decision));
        }
        log::debug!(
            "frame {}: {} detections, {} candidates -> {}",
            frame.sequence,
            detections.len(),
            decision.candidates,
            decision.command
        );
        self.last_command = Some(decision.command);

        overlay::annotate(
            &mut frame,
            &detections,
            &self.policy.target_label,
            self.policy.center_band_px,
        );
        let event = self.display.show(&frame).context("display failed")?;

        self.log_health();

        if event == DisplayEvent::Quit {
            return Ok(StepOutcome::Finished(ExitReason::Quit));
        }
        Ok(StepOutcome::Continue(decision))
    }

    /// Run until the stream ends, the operator quits or shutdown is requested.
    pub fn run(&mut self) -> Result<RunSummary> {
        log::info!(
            "follower running: camera={} detector={} serial={} band={}px",
            self.source.name(),
            self.detector.name(),
            self.sink.name(),
            self.policy.center_band_px
        );

        let exit_reason = loop {
            match self.step() {
                Ok(StepOutcome::Continue(_)) => {}
                Ok(StepOutcome::Finished(reason)) => break reason,
                Err(err) => {
                    self.send_final_stop();
                    return Err(err);
                }
            }
        };

        self.send_final_stop();
        let summary = RunSummary {
            frames: self.frames,
            exit_reason,
            last_command: self.last_command,
            counts: self.counts,
        };
        log::info!(
            "follower stopped ({:?}) after {} frames: L={} R={} S={}",
            summary.exit_reason,
            summary.frames,
            summary.counts.left,
            summary.counts.right,
            summary.counts.stop
        );
        Ok(summary)
    }

    fn send_final_stop(&mut self) {
        if !self.settings.stop_on_exit {
            return;
        }
        if let Err(err) = self.sink.send(Command::Stop) {
            log::warn!("final stop to {} failed: {:#}", self.sink.name(), err);
        }
    }

    fn log_health(&mut self) {
        let elapsed = self.last_health_log.elapsed();
        if elapsed < self.settings.health_log_interval {
            return;
        }
        let fps = (self.frames - self.frames_at_last_health) as f64 / elapsed.as_secs_f64();
        let stats = self.source.stats();
        log::info!(
            "camera health={} device={} captured={} processed={} fps={:.1} L={} R={} S={} last={}",
            self.source.is_healthy(),
            stats.device,
            stats.frames_captured,
            self.frames,
            fps,
            self.counts.left,
            self.counts.right,
            self.counts.stop,
            self.last_command
                .map(|command| command.to_string())
                .unwrap_or_else(|| "none".to_string())
        );
        self.last_health_log = Instant::now();
        self.frames_at_last_health = self.frames;
    }
}

fn describe(decision: &Decision) -> &'static str {
    match (decision.command, decision.target) {
        (Command::Left, _) => "moving left",
        (Command::Right, _) => "moving right",
        (Command::Stop, Some(_)) => "stopped: target in center",
        (Command::Stop, None) => "stopped: no target detected",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_track_each_command() {
        let mut counts = CommandCounts::default();
        for command in [Command::Left, Command::Stop, Command::Stop, Command::Right] {
            counts.record(command);
        }
        assert_eq!(counts.get(Command::Left), 1);
        assert_eq!(counts.get(Command::Stop), 2);
        assert_eq!(counts.get(Command::Right), 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn descriptions_distinguish_stop_reasons() {
        let centered = Decision {
            command: Command::Stop,
            target: Some(0),
            candidates: 1,
        };
        let empty = Decision {
            command: Command::Stop,
            target: None,
            candidates: 0,
        };
        assert_eq!(describe(&centered), "stopped: target in center");
        assert_eq!(describe(&empty), "stopped: no target detected");
    }
}
