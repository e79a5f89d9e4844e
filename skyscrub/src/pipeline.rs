//! The three stage processing pipeline.
//!
//! Stage 1 detects outliers, one worker per frame up to
//! `num_concurrent_renders`, completing in any order. Stage 2 is a single
//! thread that owns the resident frame arena and the streak table; it
//! consumes detection results in strict index order, runs the cross-frame
//! window passes, and releases frames once no future window can touch
//! them. Stage 3 paints and writes released frames, bounded by
//! `num_concurrent_saves`.
//!
//! Stages are joined by bounded channels, so admission control and the
//! cursor wait are blocking receives rather than sleep loops, and peak
//! memory stays proportional to the window size plus the channel depths.
//!
//! A frame that fails I/O is dropped from the output with an error log;
//! the rest of the run continues. Stage 2 still receives a delivery
//! notice for failed frames so the cursor never stalls on a hole.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use ndarray::Array3;

use crate::config::Config;
use crate::detect;
use crate::error::{Result, SkyscrubError};
use crate::frame::{Frame, FrameState, StateChangeCallback};
use crate::image_io::ImageSequence;
use crate::persist;
use crate::review::Callbacks;
use crate::streak::StreakTracker;

/// Counts reported after a run.
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub frame_count: usize,
    pub frames_completed: usize,
    pub frames_failed: usize,
    pub groups_painted: usize,
}

pub struct Pipeline {
    config: Config,
    callbacks: Callbacks,
    cancel: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(config: Config, callbacks: Callbacks) -> Result<Self> {
        config.validate()?;
        callbacks.validate()?;
        Ok(Pipeline {
            config,
            callbacks,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Setting this flag stops admission of new frames; work already in
    /// flight finishes normally, so no partial output files are written.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn run(&self, sequence: &dyn ImageSequence) -> Result<RunSummary> {
        let frame_count = sequence.frame_count();
        if frame_count == 0 {
            log::warn!("image sequence is empty, nothing to do");
            return Ok(RunSummary::default());
        }

        let output_dir = self.config.output_dir();
        fs::create_dir_all(&output_dir).map_err(|e| SkyscrubError::io(&output_dir, e))?;
        self.config.write_json(&output_dir)?;

        log::info!(
            "processing {} frames into {}",
            frame_count,
            output_dir.display()
        );

        let failed = AtomicUsize::new(0);
        let completed = AtomicUsize::new(0);
        let painted = AtomicUsize::new(0);

        let (index_tx, index_rx) = bounded::<usize>(self.config.num_concurrent_renders);
        let (detected_tx, detected_rx) =
            bounded::<(usize, Option<Frame>)>(self.config.num_concurrent_renders);
        let (finished_tx, finished_rx) = bounded::<Frame>(self.config.num_concurrent_saves);

        thread::scope(|scope| {
            let stage = InterFrameStage::new(&self.config, &self.callbacks, frame_count);
            scope.spawn(move || stage.run(detected_rx, finished_tx));

            for _ in 0..self.config.num_concurrent_saves {
                let finished_rx = finished_rx.clone();
                let observer = self.callbacks.frame_state_change.clone();
                let config = &self.config;
                let output_dir = &output_dir;
                let (completed, painted, failed) = (&completed, &painted, &failed);
                scope.spawn(move || {
                    for mut frame in finished_rx.iter() {
                        let index = frame.index;
                        match paint_and_write(
                            config,
                            sequence,
                            output_dir,
                            &mut frame,
                            observer.as_deref(),
                        ) {
                            Ok(groups) => {
                                completed.fetch_add(1, Ordering::Relaxed);
                                painted.fetch_add(groups, Ordering::Relaxed);
                            }
                            Err(e) => {
                                log::error!("frame {index} failed in final stage: {e}");
                                failed.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                });
            }

            for _ in 0..self.config.num_concurrent_renders {
                let index_rx = index_rx.clone();
                let detected_tx = detected_tx.clone();
                let observer = self.callbacks.frame_state_change.clone();
                let config = &self.config;
                let output_dir = &output_dir;
                let failed = &failed;
                scope.spawn(move || {
                    for index in index_rx.iter() {
                        let outcome = detect_frame(
                            config,
                            sequence,
                            output_dir,
                            index,
                            frame_count,
                            observer.as_deref(),
                        );
                        let payload = match outcome {
                            Ok(frame) => Some(frame),
                            Err(e) => {
                                log::error!("frame {index} failed in detection: {e}");
                                failed.fetch_add(1, Ordering::Relaxed);
                                None
                            }
                        };
                        if detected_tx.send((index, payload)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(detected_tx);
            drop(finished_rx);
            drop(index_rx);

            for index in 0..frame_count {
                if self.cancel.load(Ordering::Relaxed) {
                    log::warn!("cancelled, not admitting frames past {index}");
                    break;
                }
                if index_tx.send(index).is_err() {
                    break;
                }
            }
            drop(index_tx);
        });

        self.wait_for_reviews();

        let summary = RunSummary {
            frame_count,
            frames_completed: completed.load(Ordering::Relaxed),
            frames_failed: failed.load(Ordering::Relaxed),
            groups_painted: painted.load(Ordering::Relaxed),
        };
        log::info!(
            "run complete: {}/{} frames written, {} failed, {} groups painted",
            summary.frames_completed,
            summary.frame_count,
            summary.frames_failed,
            summary.groups_painted
        );
        Ok(summary)
    }

    /// Block until the review frontend has released every frame.
    fn wait_for_reviews(&self) {
        let pending = match &self.callbacks.pending_review_count {
            Some(pending) => pending,
            None => return,
        };
        let mut count = pending();
        while count > 0 {
            log::info!("waiting on {count} frames pending review");
            match &self.callbacks.review_done {
                Some(rx) => match rx.recv_timeout(Duration::from_secs(1)) {
                    Ok(()) | Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        log::warn!("review frontend went away with {count} frames pending");
                        return;
                    }
                },
                None => thread::sleep(Duration::from_millis(100)),
            }
            count = pending();
        }
    }
}

/// Indices of the frames detection compares against, nearest first. Also
/// the painting source order.
fn neighbor_indices(index: usize, frame_count: usize) -> Vec<usize> {
    let mut neighbors = Vec::with_capacity(2);
    if index > 0 {
        neighbors.push(index - 1);
    }
    if index + 1 < frame_count {
        neighbors.push(index + 1);
    }
    neighbors
}

/// Stage 1 work for one frame: load images and detect outlier groups, or
/// restore them from a previous run's cache.
fn detect_frame(
    config: &Config,
    sequence: &dyn ImageSequence,
    output_dir: &Path,
    index: usize,
    frame_count: usize,
    observer: Option<&StateChangeCallback>,
) -> Result<Frame> {
    let neighbors = neighbor_indices(index, frame_count);

    if config.write_outlier_group_files {
        if let Some(record) = persist::load_frame_record(output_dir, index)? {
            let buffer = sequence.read_frame(index)?;
            let (height, width, _) = buffer.dim();
            let mut frame = Frame::new(index, width, height, neighbors, record.into_groups()?);
            frame.set_state(FrameState::ReadyForInterFrameProcessing, observer);
            return Ok(frame);
        }
    }

    let mut frame = Frame::new(index, 0, 0, neighbors.clone(), Default::default());
    frame.set_state(FrameState::LoadingImages, observer);
    let buffer = sequence.read_frame(index)?;
    let neighbor_buffers: Vec<Array3<u16>> = neighbors
        .iter()
        .map(|&i| sequence.read_frame(i))
        .collect::<Result<_>>()?;
    let (height, width, _) = buffer.dim();
    frame.width = width;
    frame.height = height;

    frame.set_state(FrameState::DetectingOutliers, observer);
    let neighbor_refs: Vec<&Array3<u16>> = neighbor_buffers.iter().collect();
    let result = detect::detect_outliers(config, index, &buffer, &neighbor_refs)?;
    log::info!(
        "frame {index} has {} outlier groups",
        result.groups.len()
    );
    frame.outlier_groups = result.groups;
    frame.discarded = result.discarded;
    frame.set_state(FrameState::ReadyForInterFrameProcessing, observer);
    Ok(frame)
}

/// Stage 3 work for one released frame.
fn paint_and_write(
    config: &Config,
    sequence: &dyn ImageSequence,
    output_dir: &Path,
    frame: &mut Frame,
    observer: Option<&StateChangeCallback>,
) -> Result<usize> {
    frame.set_state(FrameState::ReloadingImages, observer);

    if config.write_outlier_group_files {
        persist::write_frame_record(output_dir, frame, config.max_pixel_distance())?;
    }

    let mut buffer = sequence.read_frame(frame.index)?;

    if config.test_paint {
        let mut overlay = buffer.clone();
        frame.test_paint(&mut overlay, &frame.discarded);
        sequence.write_test_frame(frame.index, &overlay)?;
    }

    let painted_groups = frame.paintable_group_count();
    if painted_groups > 0 {
        let source_index = frame
            .neighbor_indices
            .first()
            .copied()
            .ok_or(SkyscrubError::NoNeighbors { index: frame.index })?;
        frame.set_state(FrameState::Painting, observer);
        let source = sequence.read_frame(source_index)?;
        frame.paint_over(config, &mut buffer, &source);
    }

    frame.set_state(FrameState::WritingOutputFile, observer);
    sequence.write_frame(frame.index, &buffer)?;
    frame.set_state(FrameState::Complete, observer);
    Ok(painted_groups)
}

/// Stage 2: the only thread that touches the frame arena and the streak
/// table.
struct InterFrameStage<'a> {
    config: &'a Config,
    callbacks: &'a Callbacks,
    frame_count: usize,
    tracker: StreakTracker,
    arena: BTreeMap<usize, Frame>,
    /// Whether stage 1 has reported each index, successful or not. The
    /// cursor waits on delivery, not success, so failed frames leave a
    /// hole instead of a stall.
    delivered: Vec<bool>,
    cursor: usize,
}

impl<'a> InterFrameStage<'a> {
    fn new(config: &'a Config, callbacks: &'a Callbacks, frame_count: usize) -> Self {
        InterFrameStage {
            tracker: StreakTracker::new(config.clone()),
            config,
            callbacks,
            frame_count,
            arena: BTreeMap::new(),
            delivered: vec![false; frame_count],
            cursor: 0,
        }
    }

    fn run(mut self, detected_rx: Receiver<(usize, Option<Frame>)>, finished_tx: Sender<Frame>) {
        for (index, maybe_frame) in detected_rx.iter() {
            self.delivered[index] = true;
            if let Some(frame) = maybe_frame {
                self.arena.insert(index, frame);
            }
            while self.cursor < self.frame_count && self.window_delivered() {
                self.step(&finished_tx);
            }
        }

        // detection is done; anything undelivered is lost, so finish the
        // remaining windows with whatever is resident
        while self.cursor < self.frame_count {
            self.step(&finished_tx);
        }
        let leftover: Vec<usize> = self.arena.keys().copied().collect();
        for index in leftover {
            self.release(index, &finished_tx);
        }
    }

    fn window_bounds(&self) -> (usize, usize) {
        let radius = self.config.number_final_processing_neighbors_needed;
        let lo = self.cursor.saturating_sub(radius);
        let hi = (self.cursor + radius).min(self.frame_count - 1);
        (lo, hi)
    }

    fn window_delivered(&self) -> bool {
        let (lo, hi) = self.window_bounds();
        (lo..=hi).all(|i| self.delivered[i])
    }

    /// Process the window around the cursor, advance it, and release any
    /// frame no future window can reach.
    fn step(&mut self, finished_tx: &Sender<Frame>) {
        let (lo, hi) = self.window_bounds();
        let window: Vec<usize> = (lo..=hi).filter(|i| self.arena.contains_key(i)).collect();

        if let Some(frame) = self.arena.get_mut(&self.cursor) {
            frame.set_state(
                FrameState::InterFrameProcessing,
                self.callbacks.frame_state_change.as_deref(),
            );
        }
        self.tracker.process_window(&mut self.arena, &window);
        self.cursor += 1;

        let radius = self.config.number_final_processing_neighbors_needed;
        while let Some(&first) = self.arena.keys().next() {
            if first + radius >= self.cursor {
                break;
            }
            self.release(first, finished_tx);
        }
    }

    fn release(&mut self, index: usize, finished_tx: &Sender<Frame>) {
        self.tracker.finalize_frame(&mut self.arena, index);
        let mut frame = match self.arena.remove(&index) {
            Some(frame) => frame,
            None => return,
        };

        if let Some(check) = &self.callbacks.frame_check {
            if !frame.outlier_groups.is_empty() {
                check(&mut frame);
            }
        }

        frame.set_state(
            FrameState::OutlierProcessingComplete,
            self.callbacks.frame_state_change.as_deref(),
        );
        if finished_tx.send(frame).is_err() {
            log::error!("final stage is gone, dropping frame {index}");
        }
    }
}
