//! Normalization strategies.
//!
//! A [`Normalizer`] turns a batch of source photos into [`NormalizedImage`]s,
//! returning one outcome per job in job order. Two interchangeable
//! implementations exist:
//!
//! - [`PooledNormalizer`] runs every job on a dedicated rayon pool. Jobs are
//!   issued in document order, may finish in any order, and are correlated
//!   back to their caller through the [`RequestTable`].
//! - [`InlineNormalizer`] runs jobs one after another on the calling thread.
//!
//! [`select_normalizer`] checks the environment once and picks one; callers
//! only ever see `dyn Normalizer`.

use super::backend::{BackendError, ImageBackend, NormalizedImage};
use super::params::{NormalizeParams, NormalizeSettings};
use crate::config::{NormalizerStrategy, ProcessingConfig, effective_threads};
use crate::types::Rotation;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

pub type RequestId = u64;

pub type NormalizeOutcome = Result<NormalizedImage, BackendError>;

/// One photo to normalize. Borrowed: the caller keeps ownership of the bytes.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeJob<'a> {
    pub source: &'a [u8],
    pub rotation: Rotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizerKind {
    Pooled,
    Inline,
}

impl std::fmt::Display for NormalizerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizerKind::Pooled => f.write_str("pooled"),
            NormalizerKind::Inline => f.write_str("inline"),
        }
    }
}

/// Normalization capability. Implementations differ only in where the work runs.
pub trait Normalizer: Send + Sync {
    fn kind(&self) -> NormalizerKind;

    /// Normalize every job. The result has one entry per job, in job order,
    /// regardless of the order in which the work completed.
    fn normalize_all(&self, jobs: &[NormalizeJob<'_>]) -> Vec<NormalizeOutcome>;
}

// ============================================================================
// Request correlation
// ============================================================================

/// Correlates in-flight normalization requests with their waiting callers.
///
/// Entries are inserted when a request is issued and removed when it
/// completes, successfully or not. Completion may happen on any thread.
#[derive(Debug, Default)]
pub struct RequestTable {
    next_id: AtomicU64,
    pending: Mutex<HashMap<RequestId, Sender<NormalizeOutcome>>>,
}

impl RequestTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<RequestId, Sender<NormalizeOutcome>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issue a new request id and the receiver its result will arrive on.
    pub fn register(&self) -> (RequestId, Receiver<NormalizeOutcome>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::channel();
        self.pending().insert(id, tx);
        (id, rx)
    }

    /// Deliver the result for `id` and drop its entry.
    ///
    /// Returns `false` when `id` is unknown (never issued or already completed).
    pub fn complete(&self, id: RequestId, outcome: NormalizeOutcome) -> bool {
        let Some(tx) = self.pending().remove(&id) else {
            return false;
        };
        // A caller that stopped listening is not an error for the worker.
        let _ = tx.send(outcome);
        true
    }

    /// Number of requests issued but not yet completed.
    pub fn in_flight(&self) -> usize {
        self.pending().len()
    }
}

/// Completes its request with [`BackendError::Dropped`] if the worker unwinds
/// before reporting a result, so the waiting caller never blocks forever.
struct Completion<'t> {
    table: &'t RequestTable,
    id: RequestId,
    done: bool,
}

impl Completion<'_> {
    fn finish(mut self, outcome: NormalizeOutcome) {
        self.done = true;
        self.table.complete(self.id, outcome);
    }
}

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.table.complete(self.id, Err(BackendError::Dropped(self.id)));
        }
    }
}

/// Run one backend call, turning a panic into an error for this job alone.
fn normalize_one<B: ImageBackend>(backend: &B, params: &NormalizeParams) -> NormalizeOutcome {
    panic::catch_unwind(AssertUnwindSafe(|| backend.normalize(params)))
        .unwrap_or_else(|payload| Err(BackendError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// Strategies
// ============================================================================

/// Runs normalization on a dedicated worker pool.
pub struct PooledNormalizer<B: ImageBackend> {
    backend: B,
    settings: NormalizeSettings,
    pool: rayon::ThreadPool,
    requests: RequestTable,
}

impl<B: ImageBackend> PooledNormalizer<B> {
    pub fn new(backend: B, settings: NormalizeSettings, pool: rayon::ThreadPool) -> Self {
        Self {
            backend,
            settings,
            pool,
            requests: RequestTable::new(),
        }
    }

    pub fn requests(&self) -> &RequestTable {
        &self.requests
    }
}

impl<B: ImageBackend> Normalizer for PooledNormalizer<B> {
    fn kind(&self) -> NormalizerKind {
        NormalizerKind::Pooled
    }

    fn normalize_all(&self, jobs: &[NormalizeJob<'_>]) -> Vec<NormalizeOutcome> {
        let backend = &self.backend;
        let settings = self.settings;
        let requests = &self.requests;

        // in_place_scope keeps this closure on the calling thread, so blocking
        // on the receivers below never occupies a pool worker.
        self.pool.in_place_scope(|scope| {
            let issued: Vec<(RequestId, Receiver<NormalizeOutcome>)> = jobs
                .iter()
                .map(|job| {
                    let (id, rx) = requests.register();
                    let completion = Completion {
                        table: requests,
                        id,
                        done: false,
                    };
                    let job = *job;
                    scope.spawn(move |_| {
                        let outcome =
                            normalize_one(backend, &settings.params(job.source, job.rotation));
                        debug!(request = id, ok = outcome.is_ok(), "normalization finished");
                        completion.finish(outcome);
                    });
                    (id, rx)
                })
                .collect();

            issued
                .into_iter()
                .map(|(id, rx)| rx.recv().unwrap_or(Err(BackendError::Dropped(id))))
                .collect()
        })
    }
}

/// Runs normalization synchronously on the calling thread.
pub struct InlineNormalizer<B: ImageBackend> {
    backend: B,
    settings: NormalizeSettings,
}

impl<B: ImageBackend> InlineNormalizer<B> {
    pub fn new(backend: B, settings: NormalizeSettings) -> Self {
        Self { backend, settings }
    }
}

impl<B: ImageBackend> Normalizer for InlineNormalizer<B> {
    fn kind(&self) -> NormalizerKind {
        NormalizerKind::Inline
    }

    fn normalize_all(&self, jobs: &[NormalizeJob<'_>]) -> Vec<NormalizeOutcome> {
        jobs.iter()
            .map(|job| normalize_one(&self.backend, &self.settings.params(job.source, job.rotation)))
            .collect()
    }
}

// ============================================================================
// Strategy selection
// ============================================================================

/// Try to build the dedicated worker pool. `None` when threads are unavailable.
pub fn try_worker_pool(threads: usize) -> Option<rayon::ThreadPool> {
    if threads < 2 {
        return None;
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("normalize-{i}"))
        .build()
        .map_err(|e| warn!("worker pool unavailable: {e}"))
        .ok()
}

/// Pick the normalization strategy once, from config and the environment.
///
/// - `inline` always runs synchronously.
/// - `auto` uses the worker pool when more than one core is available.
/// - `pooled` uses the worker pool even on a single core, and falls back to
///   inline only if the pool cannot be built.
pub fn select_normalizer<B: ImageBackend + 'static>(
    backend: B,
    settings: NormalizeSettings,
    processing: &ProcessingConfig,
) -> Box<dyn Normalizer> {
    let threads = effective_threads(processing);
    let pool = match processing.strategy {
        NormalizerStrategy::Inline => None,
        NormalizerStrategy::Auto => try_worker_pool(threads),
        NormalizerStrategy::Pooled => try_worker_pool(threads.max(2)),
    };

    match pool {
        Some(pool) => {
            debug!(threads = pool.current_num_threads(), "using pooled normalizer");
            Box::new(PooledNormalizer::new(backend, settings, pool))
        }
        None => {
            if processing.strategy == NormalizerStrategy::Pooled {
                warn!("falling back to inline normalization");
            }
            debug!("using inline normalizer");
            Box::new(InlineNormalizer::new(backend, settings))
        }
    }
}
