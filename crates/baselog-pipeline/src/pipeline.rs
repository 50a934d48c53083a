use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use baselog_registry::{Inclusion, RegistryWriter, TransactionHandle};
use baselog_store::ContentStore;
use baselog_types::{ContentId, JournalMetadata};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::state::{Attempt, CommitOutcome, Phase, PipelineState, StepResult};

// ---------------------------------------------------------------------------
// InFlight guard
// ---------------------------------------------------------------------------

/// Holds the busy flag for the duration of one commit.
///
/// If the commit future is dropped before reaching a terminal state, the
/// guard publishes `Failed` with [`PipelineError::Abandoned`], keeping any
/// content id or transaction handle the attempt already produced.
struct InFlight<'a> {
    flag: &'a AtomicBool,
    state: &'a watch::Sender<PipelineState>,
    finished: bool,
}

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool, state: &'a watch::Sender<PipelineState>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self {
            flag,
            state,
            finished: false,
        })
    }

    fn finish(&mut self, terminal: PipelineState) {
        self.state.send_replace(terminal);
        self.finished = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.state.send_if_modified(|state| match abandoned(state) {
                Some(failed) => {
                    warn!(
                        phase = %state.phase(),
                        transaction = ?failed.transaction().map(|t| t.hash),
                        "commit abandoned mid-flight"
                    );
                    *state = failed;
                    true
                }
                None => false,
            });
        }
        self.flag.store(false, Ordering::Release);
    }
}

/// The terminal state for an attempt dropped while in `state`, or `None` if
/// no attempt is active.
fn abandoned(state: &PipelineState) -> Option<PipelineState> {
    let (attempt, content_id, transaction) = match state {
        PipelineState::Uploading { attempt } => (attempt, None, None),
        PipelineState::Signing {
            attempt,
            content_id,
        } => (attempt, Some(content_id.clone()), None),
        PipelineState::Confirming {
            attempt,
            content_id,
            transaction,
        } => (attempt, Some(content_id.clone()), Some(transaction.clone())),
        _ => return None,
    };
    Some(PipelineState::Failed {
        attempt: attempt.clone(),
        at: state.phase(),
        error: PipelineError::Abandoned,
        content_id,
        transaction,
    })
}

// ---------------------------------------------------------------------------
// CommitPipeline
// ---------------------------------------------------------------------------

/// Drives one journal note from upload to confirmed registry entry.
///
/// The pipeline runs `uploading -> signing -> confirming` and ends in
/// `success` or `failed`. At most one commit is in flight at a time; a
/// second call while one is running fails with
/// [`PipelineError::PipelineBusy`] without disturbing the first. Every
/// transition is published on a watch channel (see [`Self::subscribe`]).
///
/// Nothing is retried. Content uploaded by a commit that later fails stays
/// in the store unreferenced.
pub struct CommitPipeline<S: ?Sized, R: ?Sized> {
    store: Arc<S>,
    registry: Arc<R>,
    config: PipelineConfig,
    in_flight: AtomicBool,
    attempts: AtomicU64,
    state: watch::Sender<PipelineState>,
}

impl<S, R> CommitPipeline<S, R>
where
    S: ContentStore + ?Sized,
    R: RegistryWriter + ?Sized,
{
    pub fn new(store: Arc<S>, registry: Arc<R>, config: PipelineConfig) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self {
            store,
            registry,
            config,
            in_flight: AtomicBool::new(false),
            attempts: AtomicU64::new(0),
            state,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The current state.
    pub fn snapshot(&self) -> PipelineState {
        self.state.borrow().clone()
    }

    /// Receive every subsequent state change.
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Commit a note: upload it, write its content id to the registry under
    /// `metadata.tx_hash`, and wait for the write to be included.
    ///
    /// A blank title fails with `ValidationFailed` before any state change
    /// or network call. Validation runs before the busy check, so a blank
    /// title sent while another commit is in flight is still
    /// `ValidationFailed` rather than `PipelineBusy`.
    ///
    /// Dropping the returned future stops observation only. The pipeline
    /// ends in `Failed` with [`PipelineError::Abandoned`] and keeps whatever
    /// content id and transaction handle exist; a write already submitted
    /// may still be included.
    pub async fn commit(&self, metadata: JournalMetadata) -> PipelineResult<CommitOutcome> {
        if metadata.title_is_blank() {
            return Err(PipelineError::ValidationFailed(
                "title must not be empty".into(),
            ));
        }
        let mut guard =
            InFlight::acquire(&self.in_flight, &self.state).ok_or(PipelineError::PipelineBusy)?;

        let attempt = Arc::new(Attempt {
            seq: self.attempts.fetch_add(1, Ordering::Relaxed) + 1,
            metadata,
        });
        let started = Instant::now();
        let mut steps = Vec::with_capacity(3);

        // Upload.
        self.publish(PipelineState::Uploading {
            attempt: attempt.clone(),
        });
        let step = Instant::now();
        let content_id = match self.store.upload(&attempt.metadata).await {
            Ok(id) => id,
            Err(e) => {
                return Err(fail(&mut guard, &attempt, Phase::Uploading, e.into(), None, None))
            }
        };
        steps.push(StepResult {
            phase: Phase::Uploading,
            elapsed: step.elapsed(),
        });

        // Sign and submit.
        self.publish(PipelineState::Signing {
            attempt: attempt.clone(),
            content_id: content_id.clone(),
        });
        let step = Instant::now();
        let transaction = match self
            .registry
            .log_entry(&attempt.metadata.tx_hash, &content_id)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                return Err(fail(
                    &mut guard,
                    &attempt,
                    Phase::Signing,
                    e.into(),
                    Some(content_id),
                    None,
                ))
            }
        };
        steps.push(StepResult {
            phase: Phase::Signing,
            elapsed: step.elapsed(),
        });

        // Confirm.
        self.publish(PipelineState::Confirming {
            attempt: attempt.clone(),
            content_id: content_id.clone(),
            transaction: transaction.clone(),
        });
        let step = Instant::now();
        let inclusion = match self.confirm(&transaction).await {
            Ok(inclusion) => inclusion,
            Err(e) => {
                return Err(fail(
                    &mut guard,
                    &attempt,
                    Phase::Confirming,
                    e,
                    Some(content_id),
                    Some(transaction),
                ))
            }
        };
        steps.push(StepResult {
            phase: Phase::Confirming,
            elapsed: step.elapsed(),
        });

        info!(
            seq = attempt.seq,
            tx_hash = %attempt.metadata.tx_hash,
            %content_id,
            registry_tx = %transaction.hash,
            block = inclusion.block_number,
            "commit succeeded"
        );
        guard.finish(PipelineState::Success {
            attempt,
            content_id: content_id.clone(),
            transaction: transaction.clone(),
            inclusion,
        });

        Ok(CommitOutcome {
            content_id,
            transaction,
            inclusion,
            steps,
            elapsed: started.elapsed(),
        })
    }

    async fn confirm(&self, transaction: &TransactionHandle) -> PipelineResult<Inclusion> {
        let wait = self.registry.wait_for_inclusion(transaction);
        match self.config.confirmation_timeout() {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(result) => result.map_err(PipelineError::from),
                Err(_) => Err(PipelineError::ConfirmationTimeout(limit)),
            },
            None => wait.await.map_err(PipelineError::from),
        }
    }

    fn publish(&self, state: PipelineState) {
        if let Some(attempt) = state.attempt() {
            info!(
                seq = attempt.seq,
                tx_hash = %attempt.metadata.tx_hash,
                phase = %state.phase(),
                "commit phase"
            );
        }
        self.state.send_replace(state);
    }
}

fn fail(
    guard: &mut InFlight<'_>,
    attempt: &Arc<Attempt>,
    at: Phase,
    error: PipelineError,
    content_id: Option<ContentId>,
    transaction: Option<TransactionHandle>,
) -> PipelineError {
    warn!(
        seq = attempt.seq,
        tx_hash = %attempt.metadata.tx_hash,
        phase = %at,
        kind = %error.kind(),
        %error,
        "commit failed"
    );
    guard.finish(PipelineState::Failed {
        attempt: attempt.clone(),
        at,
        error: error.clone(),
        content_id,
        transaction,
    });
    error
}

impl<S: ?Sized, R: ?Sized> std::fmt::Debug for CommitPipeline<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitPipeline")
            .field("config", &self.config)
            .field("state", &self.state.borrow().phase())
            .finish()
    }
}
