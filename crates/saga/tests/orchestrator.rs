//! Orchestrator behavior against a migrated SQLite file and a scratch
//! directory.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use brandcfg_core::document::{ChannelSlot, ConfigValue};
use brandcfg_core::progress::{ProgressEvent, ProgressSink, ProgressStatus};
use brandcfg_db::models::brand::CreateBrandType;
use brandcfg_db::repositories::BrandTypeRepo;
use brandcfg_db::DbPool;
use brandcfg_saga::{codec, CodecError, FailureCause, FsError, Orchestrator, SagaError};
use tempfile::TempDir;
use tokio::fs;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
enum TestError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Fs(#[from] FsError),
    #[error("step exploded")]
    Boom,
    #[error("cancelled")]
    Cancelled,
}

async fn test_pool(dir: &TempDir) -> DbPool {
    let url = format!("sqlite://{}", dir.path().join("saga.db").display());
    let pool = brandcfg_db::create_pool(&url, 4).await.unwrap();
    brandcfg_db::run_migrations(&pool).await.unwrap();
    pool
}

fn recorder() -> (Arc<dyn ProgressSink>, mpsc::UnboundedReceiver<ProgressEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(tx), rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn terminal(events: &[ProgressEvent]) -> Vec<ProgressStatus> {
    events
        .iter()
        .map(|e| e.status)
        .filter(|s| *s != ProgressStatus::Running)
        .collect()
}

fn brand_type(code: &str) -> CreateBrandType {
    CreateBrandType {
        name: code.to_uppercase(),
        code: code.into(),
    }
}

async fn brand_type_exists(pool: &DbPool, code: &str) -> bool {
    let mut conn = pool.acquire().await.unwrap();
    BrandTypeRepo::find_by_code(&mut conn, code)
        .await
        .unwrap()
        .is_some()
}

// ---------------------------------------------------------------------------
// Commit and rollback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn success_commits_rows_and_keeps_files() {
    let dir = tempfile::tempdir().unwrap();
    let pool = test_pool(&dir).await;
    let orch = Orchestrator::new(pool.clone());
    let (sink, mut rx) = recorder();
    let file = dir.path().join("out").join("acme.js");

    let target = file.clone();
    let result: Result<i64, SagaError<TestError>> = orch
        .execute("Create", Some(sink), move |ctx| {
            Box::pin(async move {
                let row = BrandTypeRepo::create(&mut ctx.tx, &brand_type("novel")).await?;
                ctx.progress(50, "Row created", "");
                ctx.files.create_dir_all(target.parent().unwrap()).await?;
                ctx.files.stage(&target).await?;
                fs::write(&target, "export default {}\n")
                    .await
                    .map_err(|e| FsError::new("write", &target, e))?;
                Ok::<_, TestError>(row.id)
            })
        })
        .await;

    assert!(result.unwrap() > 0);
    assert!(brand_type_exists(&pool, "novel").await);
    assert!(file.exists());

    let events = drain(&mut rx);
    assert_eq!(terminal(&events), vec![ProgressStatus::Success]);
    assert_eq!(events.last().unwrap().percentage, Some(100));
    assert!(orch.locks().active() == 0);
}

#[tokio::test]
async fn failure_rolls_back_rows_and_files() {
    let dir = tempfile::tempdir().unwrap();
    let pool = test_pool(&dir).await;
    let orch = Orchestrator::new(pool.clone());
    let (sink, mut rx) = recorder();

    let existing = dir.path().join("baseConfigs").join("acme.js");
    fs::create_dir_all(existing.parent().unwrap()).await.unwrap();
    fs::write(&existing, "export default { h5: {} }\n").await.unwrap();
    let fresh = dir.path().join("img-acme");

    let (a, b) = (existing.clone(), fresh.clone());
    let result: Result<(), SagaError<TestError>> = orch
        .execute("Create", Some(sink), move |ctx| {
            Box::pin(async move {
                BrandTypeRepo::create(&mut ctx.tx, &brand_type("novel")).await?;

                let mut doc = codec::read(&a).await?;
                ctx.files.stage(&a).await?;
                doc.set_channel(
                    &ChannelSlot::Flat { host: "tth5".into() },
                    ConfigValue::from("x"),
                )
                .unwrap();
                codec::write(&doc, &a).await?;

                ctx.files.create_dir_all(b.join("icons")).await?;
                Err::<(), _>(TestError::Boom)
            })
        })
        .await;

    let err = result.unwrap_err();
    assert_matches!(
        &err,
        SagaError::RolledBack {
            cause: FailureCause::Work(TestError::Boom),
            db_rollback: None,
            fs_rollback: None,
        }
    );
    assert_eq!(err.to_string(), "step exploded");

    assert!(!brand_type_exists(&pool, "novel").await);
    assert_eq!(
        fs::read_to_string(&existing).await.unwrap(),
        "export default { h5: {} }\n"
    );
    assert!(!fresh.exists());

    let events = drain(&mut rx);
    assert_eq!(terminal(&events), vec![ProgressStatus::Failed]);
    let texts: Vec<_> = events.iter().map(|e| e.text.as_str()).collect();
    assert!(texts.contains(&"Rolling back database"));
    assert!(texts.contains(&"Database rolled back"));
    assert!(texts.contains(&"Files rolled back"));
}

#[tokio::test]
async fn undo_removes_nested_created_paths_deepest_first() {
    let dir = tempfile::tempdir().unwrap();
    let pool = test_pool(&dir).await;
    let orch = Orchestrator::new(pool);

    let root = dir.path().join("a");
    let base = root.clone();
    let result: Result<(), SagaError<TestError>> = orch
        .execute("Nested", None, move |ctx| {
            Box::pin(async move {
                let b = base.join("b");
                let c = b.join("c.txt");
                ctx.files.create_dir_all(&b).await?;
                ctx.files.stage(&c).await?;
                fs::write(&c, "c").await.map_err(|e| FsError::new("write", &c, e))?;
                // Staging again keeps the first observation.
                ctx.files.stage(&c).await?;
                assert!(!ctx.files.has_backup(&c));
                assert_eq!(ctx.files.created_count(), 2);
                Err::<(), _>(TestError::Boom)
            })
        })
        .await;

    assert_matches!(result, Err(SagaError::RolledBack { fs_rollback: None, .. }));
    assert!(!root.exists());
    assert!(dir.path().exists());
}

#[tokio::test]
async fn panic_in_work_is_rolled_back() {
    let dir = tempfile::tempdir().unwrap();
    let pool = test_pool(&dir).await;
    let orch = Orchestrator::new(pool.clone());
    let created = dir.path().join("half-written.js");

    async fn half_write(
        ctx: &mut brandcfg_saga::TransactionContext,
        path: PathBuf,
    ) -> Result<(), TestError> {
        BrandTypeRepo::create(&mut ctx.tx, &brand_type("novel")).await?;
        ctx.files.stage(&path).await?;
        fs::write(&path, "partial").await.unwrap();
        panic!("exploded mid-step");
    }

    let path = created.clone();
    let result: Result<(), SagaError<TestError>> = orch
        .execute("Panicky", None, move |ctx| Box::pin(half_write(ctx, path)))
        .await;

    let err = result.unwrap_err();
    assert_matches!(
        &err,
        SagaError::RolledBack { cause: FailureCause::Panicked(msg), .. } if msg == "exploded mid-step"
    );
    assert!(!created.exists());
    assert!(!brand_type_exists(&pool, "novel").await);
}

#[tokio::test]
async fn commit_failure_undoes_files() {
    let dir = tempfile::tempdir().unwrap();
    let pool = test_pool(&dir).await;
    let orch = Orchestrator::new(pool.clone());
    let (sink, mut rx) = recorder();
    let created = dir.path().join("orphan.js");

    let path = created.clone();
    let result: Result<(), SagaError<TestError>> = orch
        .execute("Orphan", Some(sink), move |ctx| {
            Box::pin(async move {
                // The dangling reference is only detected at COMMIT.
                sqlx::query("PRAGMA defer_foreign_keys = ON")
                    .execute(&mut *ctx.tx)
                    .await?;
                sqlx::query("INSERT INTO brands (code, type_id) VALUES ('ghost', 9999)")
                    .execute(&mut *ctx.tx)
                    .await?;
                ctx.files.stage(&path).await?;
                fs::write(&path, "x").await.map_err(|e| FsError::new("write", &path, e))?;
                Ok::<_, TestError>(())
            })
        })
        .await;

    assert_matches!(result, Err(SagaError::Commit { fs_rollback: None, .. }));
    assert!(!created.exists());
    assert_eq!(terminal(&drain(&mut rx)), vec![ProgressStatus::Failed]);
}

#[tokio::test]
async fn cancelled_work_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let pool = test_pool(&dir).await;
    let orch = Orchestrator::new(pool.clone());
    let cancel = CancellationToken::new();
    let created = dir.path().join("step-one.js");

    let (path, token) = (created.clone(), cancel.clone());
    let result: Result<(), SagaError<TestError>> = orch
        .execute_with_cancel("Cancellable", None, cancel, move |ctx| {
            Box::pin(async move {
                ctx.files.stage(&path).await?;
                fs::write(&path, "1").await.map_err(|e| FsError::new("write", &path, e))?;
                token.cancel();
                if ctx.is_cancelled() {
                    return Err(TestError::Cancelled);
                }
                Ok::<_, TestError>(())
            })
        })
        .await;

    assert_matches!(
        result,
        Err(SagaError::RolledBack { cause: FailureCause::Work(TestError::Cancelled), .. })
    );
    assert!(!created.exists());
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

async fn write_channel(
    ctx: &mut brandcfg_saga::TransactionContext,
    path: &PathBuf,
    host: &str,
) -> Result<(), TestError> {
    ctx.files.stage(path).await?;
    let mut doc = codec::read_or_empty(path).await?;
    doc.set_channel(&ChannelSlot::Flat { host: host.into() }, ConfigValue::from(host))
        .unwrap();
    codec::write(&doc, path).await?;
    Ok(())
}

#[tokio::test]
async fn concurrent_operations_on_one_file_keep_both_channels() {
    let dir = tempfile::tempdir().unwrap();
    let pool = test_pool(&dir).await;
    let orch = Orchestrator::new(pool);
    let file = dir.path().join("acme.js");
    let (staged_tx, staged_rx) = oneshot::channel::<()>();

    let first = {
        let path = file.clone();
        orch.execute("First", None, move |ctx| {
            Box::pin(async move {
                ctx.files.stage(&path).await?;
                let _ = staged_tx.send(());
                tokio::time::sleep(Duration::from_millis(50)).await;
                write_channel(ctx, &path, "h5").await
            })
        })
    };
    let second = {
        let path = file.clone();
        orch.execute("Second", None, move |ctx| {
            Box::pin(async move {
                let _ = staged_rx.await;
                write_channel(ctx, &path, "tth5").await
            })
        })
    };

    let (a, b): (Result<(), SagaError<TestError>>, Result<(), SagaError<TestError>>) =
        tokio::join!(first, second);
    a.unwrap();
    b.unwrap();

    let doc = codec::read(&file).await.unwrap();
    assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["h5", "tth5"]);
}
