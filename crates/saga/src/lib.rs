//! Transactional orchestration over a relational store and the filesystem.
//!
//! - [`FsRollback`]: stages filesystem paths before they are mutated and
//!   undoes every staged mutation on failure.
//! - [`FileLocks`]: per-path async locks shared by concurrent operations.
//! - [`codec`]: async read / atomic write of config documents.
//! - [`fsops`]: tracked directory and file operations.
//! - [`RelationalTx`]: begin/commit/rollback around one SQLite transaction.
//! - [`Orchestrator`]: runs a unit of work against a [`TransactionContext`]
//!   and commits both sides, or rolls both back.

pub mod codec;
pub mod fs_rollback;
pub mod fsops;
pub mod locks;
pub mod orchestrator;
pub mod relational;

pub use codec::CodecError;
pub use fs_rollback::{BackupKind, BackupRecord, FsError, FsRollback, RollbackError};
pub use locks::{FileLocks, PathGuard};
pub use orchestrator::{FailureCause, Orchestrator, SagaError, TransactionContext};
pub use relational::RelationalTx;
