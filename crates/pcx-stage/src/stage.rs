use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use pcx_types::{Block, CancelToken, PipelineConfig};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tracing::{debug, trace, warn};

use crate::error::{OutputError, SubmitError};
use crate::reorder::ReorderBuffer;

/// A block waiting for a worker. The slot permit travels with the item
/// until it is emitted or discarded.
struct Job {
    sequence: u64,
    block: Block,
    slot: OwnedSemaphorePermit,
}

/// A finished transform, possibly out of order.
struct Completion<E> {
    sequence: u64,
    outcome: Outcome<E>,
    _slot: OwnedSemaphorePermit,
}

enum Outcome<E> {
    Done(Result<Block, E>),
    /// The transform panicked.
    Lost,
}

/// State visible to both halves and the dispatcher.
struct Shared {
    slots: Arc<Semaphore>,
    faulted: AtomicBool,
    output_closed: AtomicBool,
    submitted: AtomicU64,
}

impl Shared {
    fn is_faulted(&self) -> bool {
        self.faulted.load(Ordering::SeqCst)
    }

    /// A transform failed or panicked: refuse new input and wake blocked
    /// submitters.
    fn fault(&self) {
        self.faulted.store(true, Ordering::SeqCst);
        self.slots.close();
    }

    /// Nobody will consume outputs any more.
    fn close_output(&self) {
        self.output_closed.store(true, Ordering::SeqCst);
        self.slots.close();
    }
}

/// Build an ordered parallel stage around `transform`.
///
/// Returns the producer half ([`StageInput`]) and the consumer half
/// ([`StageOutput`]). Each half is meant for a single task.
///
/// ```text
///   submit ──▶ [ job queue ] ──▶ dispatcher ──▶ worker 0 ─┐
///                                          ├──▶ worker 1 ─┼──▶ [ reorder buffer ] ──▶ next_output
///                                          └──▶ worker N ─┘      (by sequence)
/// ```
///
/// - Up to `degree_of_parallelism` transforms run at once on tokio's
///   blocking pool, so CPU-bound codecs never stall the async workers.
/// - At most `capacity + degree_of_parallelism` blocks are outstanding
///   (submitted but not yet returned by `next_output`). `submit` suspends
///   beyond that, which bounds the reorder buffer too.
/// - Outputs come out in submission order no matter which worker
///   finishes first.
///
/// # Panics
///
/// Must be called from within a tokio runtime (the dispatcher is spawned
/// immediately).
pub fn ordered_stage<F, E>(
    config: PipelineConfig,
    cancel: CancelToken,
    transform: F,
) -> (StageInput, StageOutput<E>)
where
    F: Fn(Block) -> Result<Block, E> + Send + Sync + 'static,
    E: Send + 'static,
{
    let workers = config.degree_of_parallelism.max(1);
    let outstanding = config.max_outstanding().max(1);

    let slots = Arc::new(Semaphore::new(outstanding));
    let shared = Arc::new(Shared {
        slots: Arc::clone(&slots),
        faulted: AtomicBool::new(false),
        output_closed: AtomicBool::new(false),
        submitted: AtomicU64::new(0),
    });

    let (job_tx, job_rx) = mpsc::channel(outstanding);
    let (done_tx, done_rx) = mpsc::unbounded_channel();

    debug!(workers, outstanding, "starting ordered stage");
    tokio::spawn(dispatch(
        job_rx,
        done_tx,
        Arc::new(transform),
        Arc::new(Semaphore::new(workers)),
        Arc::clone(&shared),
        cancel.clone(),
    ));

    let input = StageInput {
        jobs: Some(job_tx),
        slots,
        shared: Arc::clone(&shared),
        cancel: cancel.clone(),
        next_sequence: 0,
    };
    let output = StageOutput {
        completions: done_rx,
        reorder: ReorderBuffer::new(),
        shared,
        cancel,
        finished: false,
    };
    (input, output)
}

/// Pull jobs in submission order and hand each to a blocking worker once
/// a worker permit is free.
///
/// Exits when the input half completes, on cancellation, after a fault,
/// or once the output half is gone. Jobs still queued at that point are
/// dropped, releasing their slots.
async fn dispatch<F, E>(
    mut jobs: mpsc::Receiver<Job>,
    done: mpsc::UnboundedSender<Completion<E>>,
    transform: Arc<F>,
    workers: Arc<Semaphore>,
    shared: Arc<Shared>,
    cancel: CancelToken,
) where
    F: Fn(Block) -> Result<Block, E> + Send + Sync + 'static,
    E: Send + 'static,
{
    loop {
        let job = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            job = jobs.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        if shared.is_faulted() || done.is_closed() {
            trace!(sequence = job.sequence, "stage shutting down, dropping queued block");
            break;
        }

        let worker = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            permit = Arc::clone(&workers).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let transform = Arc::clone(&transform);
        let done = done.clone();
        let shared = Arc::clone(&shared);
        trace!(sequence = job.sequence, "dispatching block");

        tokio::task::spawn_blocking(move || {
            let Job {
                sequence,
                block,
                slot,
            } = job;

            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| transform(block))) {
                Ok(result) => {
                    if result.is_err() {
                        shared.fault();
                    }
                    Outcome::Done(result)
                }
                Err(_) => {
                    warn!(sequence, "stage worker panicked");
                    shared.fault();
                    Outcome::Lost
                }
            };
            drop(worker);

            // The output half may be gone; the completion (and its slot)
            // is then simply dropped.
            let _ = done.send(Completion {
                sequence,
                outcome,
                _slot: slot,
            });
        });
    }

    debug!(cancelled = cancel.is_cancelled(), "dispatcher finished");
}

/// Producer half of an ordered stage.
///
/// Dropping it is the same as calling [`complete`](Self::complete).
pub struct StageInput {
    jobs: Option<mpsc::Sender<Job>>,
    slots: Arc<Semaphore>,
    shared: Arc<Shared>,
    cancel: CancelToken,
    next_sequence: u64,
}

impl StageInput {
    /// Queue a block for transformation.
    ///
    /// Suspends while the stage already holds its maximum number of
    /// outstanding blocks. Returns the sequence number assigned to the
    /// block; numbers start at 0 and are never reused.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::Completed`] after [`complete`](Self::complete).
    /// - [`SubmitError::Faulted`] once any transform has failed.
    /// - [`SubmitError::Closed`] if the output half was dropped.
    /// - [`SubmitError::Cancelled`] if the token fires, including while
    ///   suspended.
    pub async fn submit(&mut self, block: Block) -> Result<u64, SubmitError> {
        if self.cancel.is_cancelled() {
            return Err(SubmitError::Cancelled);
        }
        let Some(jobs) = &self.jobs else {
            return Err(SubmitError::Completed);
        };
        if self.shared.is_faulted() {
            return Err(SubmitError::Faulted);
        }

        let slot = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(SubmitError::Cancelled),
            slot = Arc::clone(&self.slots).acquire_owned() => {
                slot.map_err(|_| self.closed_reason())?
            }
        };

        let sequence = self.next_sequence;
        jobs.send(Job {
            sequence,
            block,
            slot,
        })
        .await
        .map_err(|_| self.closed_reason())?;

        self.next_sequence += 1;
        self.shared.submitted.store(self.next_sequence, Ordering::SeqCst);
        trace!(sequence, "block submitted");
        Ok(sequence)
    }

    /// Stop accepting input. Queued and running blocks still finish and
    /// are emitted by the output half.
    pub fn complete(&mut self) {
        if self.jobs.take().is_some() {
            debug!(submitted = self.next_sequence, "stage input completed");
        }
    }

    pub fn is_completed(&self) -> bool {
        self.jobs.is_none()
    }

    /// Number of blocks submitted so far.
    pub fn submitted(&self) -> u64 {
        self.next_sequence
    }

    /// Free slots; `submit` suspends when this reaches zero.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    fn closed_reason(&self) -> SubmitError {
        if self.shared.is_faulted() {
            SubmitError::Faulted
        } else if self.cancel.is_cancelled() {
            SubmitError::Cancelled
        } else {
            SubmitError::Closed
        }
    }
}

/// Consumer half of an ordered stage.
///
/// Dropping it discards every buffered result and makes further
/// `submit` calls fail with [`SubmitError::Closed`].
pub struct StageOutput<E> {
    completions: mpsc::UnboundedReceiver<Completion<E>>,
    reorder: ReorderBuffer<Completion<E>>,
    shared: Arc<Shared>,
    cancel: CancelToken,
    finished: bool,
}

impl<E> StageOutput<E> {
    /// Wait for the next block in submission order.
    ///
    /// Suspends while the next-in-order block is still running, even if
    /// later blocks are already done. Returns `Ok(None)` once the input
    /// half has completed and every block has been emitted.
    ///
    /// # Errors
    ///
    /// - [`OutputError::Transform`] when the next block's transform
    ///   failed. Reported once; the stage then reports end of stream.
    /// - [`OutputError::WorkerLost`] if a worker panicked.
    /// - [`OutputError::Cancelled`] if the token fires.
    pub async fn next_output(&mut self) -> Result<Option<(u64, Block)>, OutputError<E>> {
        loop {
            if self.finished {
                return Ok(None);
            }
            if self.cancel.is_cancelled() {
                self.shutdown();
                return Err(OutputError::Cancelled);
            }

            if let Some((sequence, completion)) = self.reorder.pop_ready() {
                // Dropping the completion here releases its slot.
                let Completion { outcome, .. } = completion;
                return match outcome {
                    Outcome::Done(Ok(block)) => {
                        trace!(sequence, "block emitted");
                        Ok(Some((sequence, block)))
                    }
                    Outcome::Done(Err(source)) => {
                        debug!(sequence, "transform failed, stage terminating");
                        self.shutdown();
                        Err(OutputError::Transform { sequence, source })
                    }
                    Outcome::Lost => {
                        self.shutdown();
                        Err(OutputError::WorkerLost { sequence })
                    }
                };
            }

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    self.shutdown();
                    return Err(OutputError::Cancelled);
                }
                completion = self.completions.recv() => match completion {
                    Some(completion) => {
                        self.reorder.insert(completion.sequence, completion);
                    }
                    None => {
                        let sequence = self.reorder.next_expected();
                        let submitted = self.shared.submitted.load(Ordering::SeqCst);
                        self.shutdown();
                        if sequence < submitted {
                            return Err(OutputError::WorkerLost { sequence });
                        }
                        debug!(emitted = sequence, "stage drained");
                        return Ok(None);
                    }
                },
            }
        }
    }

    /// Throw away every remaining result until the completion channel
    /// closes, and return how many were discarded.
    ///
    /// Waits for the input half to complete (or be dropped) or for the
    /// token to fire. After an error or cancellation has already been
    /// reported the channel is closed and this returns at once; workers
    /// still running then finish on the blocking pool and their results
    /// are dropped.
    pub async fn discard_remaining(&mut self) -> usize {
        let mut discarded = self.reorder.clear();
        while self.completions.recv().await.is_some() {
            discarded += 1;
        }
        if discarded > 0 {
            warn!(discarded, "discarded undelivered stage outputs");
        }
        self.finished = true;
        self.shared.close_output();
        discarded
    }

    /// True once the stage has reported end of stream, an error, or
    /// cancellation.
    pub fn is_closed(&self) -> bool {
        self.finished
    }

    /// Results completed out of order and held back.
    pub fn buffered(&self) -> usize {
        self.reorder.len()
    }

    fn shutdown(&mut self) {
        self.finished = true;
        let discarded = self.reorder.clear();
        if discarded > 0 {
            warn!(discarded, "discarding out-of-order results after shutdown");
        }
        self.completions.close();
        while self.completions.try_recv().is_ok() {}
        self.shared.close_output();
    }
}

impl<E> Drop for StageOutput<E> {
    fn drop(&mut self) {
        self.shared.close_output();
    }
}
