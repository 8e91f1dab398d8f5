use std::any::Any;
use std::num::NonZeroUsize;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use crate::calibration::{CalibrationOutcome, Calibrator};
use crate::config::BatchConfig;
use crate::error::{AutodarkError, Result};
use crate::io::fs_utils::list_image_files;
use crate::io::service::ImageFileService;

use super::completion::CompletionLatch;
use super::partition::partition;
use super::types::{BatchSummary, FileReport};

/// State shared by every worker of one batch.
struct BatchContext {
    latch: CompletionLatch,
    stop_requested: AtomicBool,
}

impl BatchContext {
    fn is_stopped(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }
}

/// Cloneable handle that asks a running batch to stop after the current files.
#[derive(Clone)]
pub struct StopHandle(Arc<BatchContext>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.stop_requested.store(true, Ordering::Release);
    }
}

/// Number of worker threads: online cores times jobs per core.
pub fn worker_count(jobs_per_core: usize) -> usize {
    let cores = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    cores * jobs_per_core.max(1)
}

/// Fans a directory of science frames out over a fixed pool of threads.
pub struct BatchDispatcher {
    service: Arc<dyn ImageFileService>,
    config: BatchConfig,
    workers: Option<usize>,
}

impl BatchDispatcher {
    pub fn new(service: Arc<dyn ImageFileService>, config: BatchConfig) -> Self {
        Self {
            service,
            config,
            workers: None,
        }
    }

    /// Use exactly `workers` threads instead of cores x jobs-per-core.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers.max(1));
        self
    }

    /// Validate the config, discover input files and start the workers.
    ///
    /// Returns as soon as the threads are running. `on_complete` fires once,
    /// on the thread that finishes the last file. An empty input directory
    /// starts nothing and never fires it.
    ///
    /// Dropping the returned handle does not cancel the run: it blocks until
    /// every worker has drained its slice. Use [`BatchHandle::stop`] or a
    /// [`StopHandle`] to end the batch early.
    pub fn start(self, on_complete: impl FnOnce() + Send + 'static) -> Result<BatchHandle> {
        self.config.validate()?;

        if let Some(flat) = &self.config.flat {
            info!(dir = %flat.display(), "Flat directory set, flat-field correction is not applied");
        }

        info!(dir = %self.config.input.display(), "Reading directory");
        let files = list_image_files(&self.config.input)?;
        if files.is_empty() {
            warn!(dir = %self.config.input.display(), "Can't find FITS files");
            return Ok(BatchHandle::empty());
        }

        let total = files.len();
        let workers = self
            .workers
            .unwrap_or_else(|| worker_count(self.config.jobs_per_core));
        let slices = partition(total, workers);
        let left = if workers > total { 0 } else { total % workers };
        info!(
            workers,
            jobs_per_core = self.config.jobs_per_core,
            total,
            per_worker = total / workers,
            left,
            "Starting calibrator"
        );

        let files: Arc<[PathBuf]> = files.into();
        let context = Arc::new(BatchContext {
            latch: CompletionLatch::new(total, on_complete),
            stop_requested: AtomicBool::new(false),
        });
        let calibrator = Arc::new(Calibrator::new(self.service, &self.config));
        let (tx, rx) = mpsc::channel();

        let mut handles = Vec::with_capacity(slices.len());
        for (id, range) in slices.into_iter().enumerate() {
            let files = Arc::clone(&files);
            let calibrator = Arc::clone(&calibrator);
            let context_for_worker = Arc::clone(&context);
            let tx = tx.clone();

            let spawned = std::thread::Builder::new()
                .name(format!("autodark-worker-{id}"))
                .spawn(move || {
                    run_worker(id, &files, range, &calibrator, &context_for_worker, &tx);
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    StopHandle(Arc::clone(&context)).stop();
                    join_all(std::mem::take(&mut handles));
                    return Err(e.into());
                }
            }
        }
        drop(tx);

        Ok(BatchHandle {
            context,
            workers: handles,
            reports: rx,
            total,
        })
    }
}

fn run_worker(
    id: usize,
    files: &[PathBuf],
    range: Range<usize>,
    calibrator: &Calibrator,
    context: &BatchContext,
    tx: &mpsc::Sender<FileReport>,
) {
    debug!(worker = id, start = range.start, len = range.len(), "Worker started");
    for path in &files[range] {
        if context.is_stopped() {
            debug!(worker = id, "Stop requested, leaving remaining files");
            break;
        }
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| calibrator.calibrate(path)))
            .unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                warn!(worker = id, file = %path.display(), %message, "Calibration panicked");
                CalibrationOutcome::Failed(AutodarkError::Panicked(message))
            });
        if context.latch.count_down() {
            info!("All files processed");
        }
        // The receiver may already be gone; the file still counts as done.
        let _ = tx.send(FileReport {
            worker: id,
            path: path.clone(),
            outcome,
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if handle.join().is_err() {
            warn!("Worker thread panicked");
        }
    }
}

/// A running batch.
///
/// Reports arrive one per processed file. Dropping the handle waits for the
/// workers to finish every remaining file; it never requests a stop.
pub struct BatchHandle {
    context: Arc<BatchContext>,
    workers: Vec<JoinHandle<()>>,
    reports: mpsc::Receiver<FileReport>,
    total: usize,
}

impl BatchHandle {
    fn empty() -> Self {
        let (_, rx) = mpsc::channel();
        Self {
            context: Arc::new(BatchContext {
                latch: CompletionLatch::new(0, || {}),
                stop_requested: AtomicBool::new(false),
            }),
            workers: Vec::new(),
            reports: rx,
            total: 0,
        }
    }

    pub fn total_files(&self) -> usize {
        self.total
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Files not yet finished.
    pub fn remaining(&self) -> usize {
        self.context.latch.remaining()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.context))
    }

    /// Next report, or `None` once every worker has exited.
    pub fn next_report(&self) -> Option<FileReport> {
        self.reports.recv().ok()
    }

    /// Drain all reports, join the workers and summarize.
    pub fn wait_with(mut self, mut on_report: impl FnMut(&FileReport)) -> BatchSummary {
        let mut summary = BatchSummary::new(self.total);
        while let Some(report) = self.next_report() {
            summary.record(&report.outcome);
            on_report(&report);
        }
        join_all(std::mem::take(&mut self.workers));
        summary
    }

    pub fn wait(self) -> BatchSummary {
        self.wait_with(|_| {})
    }

    /// Let workers finish their current file, then stop and summarize.
    pub fn stop(self) -> BatchSummary {
        self.stop_handle().stop();
        self.wait()
    }
}

impl Drop for BatchHandle {
    fn drop(&mut self) {
        join_all(std::mem::take(&mut self.workers));
    }
}
