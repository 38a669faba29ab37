//! All-or-nothing execution of a unit of work over the database and the
//! filesystem.
//!
//! The unit of work receives a [`TransactionContext`] holding an open
//! relational transaction and a fresh [`FsRollback`]. Every step stages the
//! paths it touches through `ctx.files` and writes rows through `ctx.tx`.
//! If the work returns an error (or panics) the transaction is rolled back
//! and every staged path is restored; otherwise the transaction commits and
//! the staged state is discarded.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use brandcfg_core::progress::{self, ProgressEvent, ProgressSink};
use brandcfg_db::DbPool;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::fs_rollback::{FsRollback, RollbackError};
use crate::locks::FileLocks;
use crate::relational::RelationalTx;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why the unit of work did not complete.
#[derive(Debug)]
pub enum FailureCause<E> {
    Work(E),
    /// The work panicked; carries the panic message.
    Panicked(String),
}

impl<E: fmt::Display> fmt::Display for FailureCause<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Work(e) => e.fmt(f),
            Self::Panicked(msg) => write!(f, "Operation panicked: {msg}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for FailureCause<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Work(e) => Some(e),
            Self::Panicked(_) => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SagaError<E: std::error::Error + 'static> {
    #[error("Failed to begin database transaction: {0}")]
    Begin(#[source] sqlx::Error),

    /// The work succeeded but the commit did not; files were undone.
    #[error("Failed to commit database transaction: {source}{}", rollback_suffix(None, .fs_rollback.as_ref()))]
    Commit {
        #[source]
        source: sqlx::Error,
        fs_rollback: Option<RollbackError>,
    },

    /// The work failed and both sides were rolled back. The display leads
    /// with the original cause; rollback failures are appended.
    #[error("{cause}{}", rollback_suffix(.db_rollback.as_ref(), .fs_rollback.as_ref()))]
    RolledBack {
        #[source]
        cause: FailureCause<E>,
        db_rollback: Option<sqlx::Error>,
        fs_rollback: Option<RollbackError>,
    },
}

impl<E: std::error::Error + 'static> SagaError<E> {
    /// The work error, when the failure came from the work itself.
    pub fn work_error(&self) -> Option<&E> {
        match self {
            Self::RolledBack {
                cause: FailureCause::Work(e),
                ..
            } => Some(e),
            _ => None,
        }
    }

    pub fn into_work_error(self) -> Result<E, Self> {
        match self {
            Self::RolledBack {
                cause: FailureCause::Work(e),
                ..
            } => Ok(e),
            other => Err(other),
        }
    }

    /// Whether any rollback step failed, leaving state that needs manual
    /// attention.
    pub fn rollback_incomplete(&self) -> bool {
        match self {
            Self::Begin(_) => false,
            Self::Commit { fs_rollback, .. } => fs_rollback.is_some(),
            Self::RolledBack {
                db_rollback,
                fs_rollback,
                ..
            } => db_rollback.is_some() || fs_rollback.is_some(),
        }
    }
}

fn rollback_suffix(db: Option<&sqlx::Error>, fs: Option<&RollbackError>) -> String {
    let mut out = String::new();
    if let Some(e) = db {
        out.push_str(&format!(" (database rollback failed: {e})"));
    }
    if let Some(e) = fs {
        out.push_str(&format!(" ({e})"));
    }
    out
}

// ---------------------------------------------------------------------------
// TransactionContext
// ---------------------------------------------------------------------------

/// Per-operation handles passed by `&mut` to every step.
pub struct TransactionContext {
    pub tx: RelationalTx,
    pub files: FsRollback,
    sink: Option<Arc<dyn ProgressSink>>,
    cancel: CancellationToken,
}

impl TransactionContext {
    pub fn sink(&self) -> Option<&dyn ProgressSink> {
        self.sink.as_deref()
    }

    /// Report a milestone.
    pub fn progress(&self, percentage: u8, text: &str, detail: &str) {
        progress::emit(self.sink(), ProgressEvent::running(percentage, text, detail));
    }

    /// Report a raw log line.
    pub fn log(&self, line: impl Into<String>) {
        progress::emit(self.sink(), ProgressEvent::log(line));
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs units of work transactionally. Cheap to clone; clones share the
/// file lock table.
#[derive(Clone)]
pub struct Orchestrator {
    pool: DbPool,
    locks: FileLocks,
}

impl Orchestrator {
    pub fn new(pool: DbPool) -> Self {
        Self::with_locks(pool, FileLocks::new())
    }

    /// Use an existing lock table, so several orchestrators serialize on the
    /// same files.
    pub fn with_locks(pool: DbPool, locks: FileLocks) -> Self {
        Self { pool, locks }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn locks(&self) -> &FileLocks {
        &self.locks
    }

    /// Run `work` with a token that is never cancelled.
    pub async fn execute<T, E, F>(
        &self,
        name: &str,
        sink: Option<Arc<dyn ProgressSink>>,
        work: F,
    ) -> Result<T, SagaError<E>>
    where
        F: for<'c> FnOnce(&'c mut TransactionContext) -> BoxFuture<'c, Result<T, E>> + Send,
        E: std::error::Error + Send + 'static,
    {
        self.execute_with_cancel(name, sink, CancellationToken::new(), work)
            .await
    }

    /// Run `work` inside one transaction and one filesystem rollback scope.
    ///
    /// Emits exactly one terminal event to `sink`: success after commit, or
    /// failed after rollback. Cancellation is cooperative; the work checks
    /// [`TransactionContext::is_cancelled`] and returns its own error.
    pub async fn execute_with_cancel<T, E, F>(
        &self,
        name: &str,
        sink: Option<Arc<dyn ProgressSink>>,
        cancel: CancellationToken,
        work: F,
    ) -> Result<T, SagaError<E>>
    where
        F: for<'c> FnOnce(&'c mut TransactionContext) -> BoxFuture<'c, Result<T, E>> + Send,
        E: std::error::Error + Send + 'static,
    {
        let tx = match RelationalTx::begin(&self.pool).await {
            Ok(tx) => tx,
            Err(e) => {
                tracing::error!(operation = name, error = %e, "Failed to begin transaction");
                if let Some(sink) = &sink {
                    sink.emit(ProgressEvent::failed(format!("{name} failed"), e.to_string()));
                }
                return Err(SagaError::Begin(e));
            }
        };

        let mut ctx = TransactionContext {
            tx,
            files: FsRollback::new(self.locks.clone()),
            sink,
            cancel,
        };

        tracing::info!(operation = name, "Operation started");
        let outcome = AssertUnwindSafe(async { work(&mut ctx).await })
            .catch_unwind()
            .await;

        let cause = match outcome {
            Ok(Ok(value)) => return commit(name, ctx, value).await,
            Ok(Err(e)) => FailureCause::Work(e),
            Err(payload) => FailureCause::Panicked(panic_message(payload.as_ref())),
        };
        Err(roll_back(name, ctx, cause).await)
    }
}

async fn commit<T, E>(name: &str, ctx: TransactionContext, value: T) -> Result<T, SagaError<E>>
where
    E: std::error::Error + 'static,
{
    let TransactionContext {
        tx,
        mut files,
        sink,
        ..
    } = ctx;
    let emit = |event: ProgressEvent| progress::emit(sink.as_deref(), event);

    match tx.commit().await {
        Ok(()) => {
            let kept = files.backup_count() + files.created_count() + files.stashed_count();
            files.clear().await;
            tracing::info!(operation = name, staged_paths = kept, "Operation committed");
            emit(ProgressEvent::success(
                format!("{name} completed"),
                "Changes committed",
            ));
            Ok(value)
        }
        Err(source) => {
            tracing::error!(operation = name, error = %source, "Commit failed, undoing file changes");
            emit(ProgressEvent::log("Commit failed, rolling back files"));
            let fs_rollback = files.undo().await.err();
            let err = SagaError::Commit {
                source,
                fs_rollback,
            };
            emit(ProgressEvent::failed(format!("{name} failed"), err.to_string()));
            Err(err)
        }
    }
}

async fn roll_back<E>(name: &str, ctx: TransactionContext, cause: FailureCause<E>) -> SagaError<E>
where
    E: std::error::Error + 'static,
{
    let TransactionContext {
        tx,
        mut files,
        sink,
        ..
    } = ctx;
    let emit = |event: ProgressEvent| progress::emit(sink.as_deref(), event);

    tracing::warn!(operation = name, cause = %cause, "Operation failed, rolling back");
    emit(ProgressEvent::log(format!("Operation failed: {cause}")));

    emit(ProgressEvent::log("Rolling back database"));
    let db_rollback = match tx.rollback().await {
        Ok(()) => {
            emit(ProgressEvent::log("Database rolled back"));
            None
        }
        Err(e) => {
            tracing::error!(operation = name, error = %e, "Database rollback failed");
            emit(ProgressEvent::log(format!("Database rollback failed: {e}")));
            Some(e)
        }
    };

    emit(ProgressEvent::log("Rolling back files"));
    let fs_rollback = match files.undo().await {
        Ok(()) => {
            emit(ProgressEvent::log("Files rolled back"));
            None
        }
        Err(e) => {
            emit(ProgressEvent::log(format!("File rollback failed: {e}")));
            Some(e)
        }
    };

    let err = SagaError::RolledBack {
        cause,
        db_rollback,
        fs_rollback,
    };
    emit(ProgressEvent::failed(format!("{name} failed"), err.to_string()));
    err
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
