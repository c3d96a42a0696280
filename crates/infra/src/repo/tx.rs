//! Serializable transaction executor.
//!
//! [`serializable_tx`] runs a unit of work inside one transaction and makes
//! exactly one commit-or-rollback decision for it:
//!
//! | step | failure | rollback | returned |
//! |------|---------|----------|----------|
//! | begin | driver error | no | `Error::wrap` of the cause |
//! | set isolation | query error | yes | the isolation error |
//! | unit of work | its error | yes | the work's error, unchanged |
//! | commit | driver error | yes | `Error::wrap_db` of the cause |
//!
//! A failed rollback is never returned. It is logged as an operator alert and
//! counted in [`TxCounters::rollback_failures`], because a leaked transaction
//! may still hold locks.
//!
//! Nothing is retried. Callers that want to retry serialization conflicts can
//! check [`is_serialization_failure`](super::is_serialization_failure).

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use groundwork_core::{BoxError, Error};
use groundwork_observability::Logger;

use crate::scope::Scope;

/// Backend operations the executor drives.
#[async_trait]
pub trait Transactional: Send + Sync {
    /// What the unit of work receives: a DAO bound to the open transaction.
    type Handle: Clone + Send + Sync + 'static;

    async fn begin(&self, scope: &Scope) -> Result<Self::Handle, BoxError>;

    /// Raise the transaction to serializable isolation.
    async fn set_serializable(&self, handle: &Self::Handle) -> Result<(), Error>;

    async fn commit(&self, handle: &Self::Handle) -> Result<(), BoxError>;

    async fn rollback(&self, handle: &Self::Handle) -> Result<(), BoxError>;

    fn counters(&self) -> &TxCounters;

    /// Logger of the transaction handle, used for cleanup failures.
    fn handle_logger(&self, handle: &Self::Handle) -> Logger;
}

/// Process-lifetime transaction outcome counters.
#[derive(Debug, Default)]
pub struct TxCounters {
    begun: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
    rollback_failures: AtomicU64,
}

/// Point-in-time copy of [`TxCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxStats {
    pub begun: u64,
    pub committed: u64,
    pub rolled_back: u64,
    pub rollback_failures: u64,
}

impl TxCounters {
    pub fn snapshot(&self) -> TxStats {
        TxStats {
            begun: self.begun.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            rolled_back: self.rolled_back.load(Ordering::Relaxed),
            rollback_failures: self.rollback_failures.load(Ordering::Relaxed),
        }
    }

    /// Rollbacks that failed and may have leaked a transaction.
    pub fn rollback_failures(&self) -> u64 {
        self.rollback_failures.load(Ordering::Relaxed)
    }
}

/// Run `work` in a serializable transaction on `backend`.
pub async fn serializable_tx<B, T, F, Fut>(backend: &B, scope: &Scope, work: F) -> Result<T, Error>
where
    B: Transactional + ?Sized,
    F: FnOnce(B::Handle) -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let handle = match backend.begin(scope).await {
        Ok(handle) => handle,
        Err(cause) => return Err(Error::wrap(cause, "Error beginning transaction")),
    };
    let counters = backend.counters();
    counters.begun.fetch_add(1, Ordering::Relaxed);

    if let Err(err) = backend.set_serializable(&handle).await {
        let alert = "Failed to rollback transaction after setting isolation failed";
        rollback(backend, &handle, alert).await;
        return Err(err);
    }

    match work(handle.clone()).await {
        Ok(value) => match backend.commit(&handle).await {
            Ok(()) => {
                counters.committed.fetch_add(1, Ordering::Relaxed);
                Ok(value)
            }
            Err(cause) => {
                let err = Error::wrap_db(cause, "failed to commit transaction");
                let alert = "Failed to rollback transaction after failing to commit";
                rollback(backend, &handle, alert).await;
                Err(err)
            }
        },
        Err(err) => {
            let alert = "Failed to rollback transaction that returned an error";
            rollback(backend, &handle, alert).await;
            Err(err)
        }
    }
}

async fn rollback<B>(backend: &B, handle: &B::Handle, alert: &str)
where
    B: Transactional + ?Sized,
{
    let counters = backend.counters();
    match backend.rollback(handle).await {
        Ok(()) => {
            counters.rolled_back.fetch_add(1, Ordering::Relaxed);
        }
        Err(cause) => {
            counters.rollback_failures.fetch_add(1, Ordering::Relaxed);
            let err = Error::wrap_db(cause, "failed to rollback transaction");
            backend.handle_logger(handle).alert(&err, alert);
        }
    }
}
