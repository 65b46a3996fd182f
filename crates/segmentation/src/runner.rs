//! Asynchronous execution of segmentation runs.
//!
//! Drawing primitives run synchronously; segmentation is potentially slow
//! and runs on the blocking thread pool against cloned inputs, so no lock
//! is held while computing. At most one run is in flight at a time, a run
//! is cooperatively cancellable, and a cancelled run never touches the
//! mask store. Merging the result goes through the shared session mutex,
//! which also serializes it against pushes and undos.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use annotate_core::{AnnotationSession, LayerId};
use image::RgbImage;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::error::{Result, SegmentationError};
use crate::segmenter::{SegmentContext, SegmentationResult, Segmenter};

/// A session shared between the interactive surface and segmentation
/// merges. The mutex is the single mutation lock required around every
/// mask-affecting command.
pub type SharedSession = Arc<Mutex<AnnotationSession>>;

/// Launches segmentation runs, enforcing the single-flight rule.
#[derive(Debug, Default)]
pub struct SegmentationRunner {
    active: Arc<Mutex<Option<u64>>>,
    next_run_id: AtomicU64,
}

/// Handle to an in-flight run: cancel it, or wait for its result.
pub struct RunningSegmentation {
    cancel: Arc<AtomicBool>,
    receiver: oneshot::Receiver<Result<SegmentationResult>>,
}

impl SegmentationRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.active.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Start a run on the blocking pool. The segmenter must already be
    /// `Ready`; the image is moved in so the computation touches no shared
    /// state. Fails with `AlreadyRunning` while another run is in flight.
    pub fn spawn(&self, mut segmenter: Segmenter, image: RgbImage) -> Result<RunningSegmentation> {
        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut active = self.active.lock().map_err(|_| SegmentationError::LockPoisoned)?;
            if active.is_some() {
                return Err(SegmentationError::AlreadyRunning);
            }
            *active = Some(run_id);
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = oneshot::channel();
        let task_cancel = Arc::clone(&cancel);
        let active_slot = Arc::clone(&self.active);
        let algorithm = segmenter.kind();

        tokio::task::spawn_blocking(move || {
            info!(%algorithm, run_id, "segmentation run started");
            let ctx = SegmentContext::new(&image, &task_cancel);
            let result = segmenter.run(&ctx);

            if let Ok(mut active) = active_slot.lock() {
                if *active == Some(run_id) {
                    *active = None;
                }
            }
            if sender.send(result).is_err() {
                warn!(run_id, "segmentation result dropped, nobody is waiting");
            }
        });

        Ok(RunningSegmentation { cancel, receiver })
    }
}

impl RunningSegmentation {
    /// Request cooperative cancellation. The algorithm notices at its next
    /// checkpoint and the run resolves to `Cancelled` without any merge.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Wait for the run to finish. Event-driven callers await this; a
    /// blocking harness wraps it in `block_on`.
    pub async fn wait(self) -> Result<SegmentationResult> {
        self.receiver
            .await
            .map_err(|_| SegmentationError::Cancelled)?
    }
}

/// Run a ready segmenter to completion and union its proposal into the
/// target layer under the session lock.
pub async fn run_and_merge(
    runner: &SegmentationRunner,
    session: &SharedSession,
    layer: LayerId,
    segmenter: Segmenter,
    image: RgbImage,
) -> Result<()> {
    let handle = runner.spawn(segmenter, image)?;
    let result = handle.wait().await?;

    let algorithm: &'static str = result.algorithm.into();
    let mut session = session.lock().map_err(|_| SegmentationError::LockPoisoned)?;
    session.merge_mask(layer, &result.mask, algorithm)?;
    // The selection fed into this run is consumed with it.
    session.clear_selection();
    Ok(())
}
