mod common;

use std::time::Duration;

use brandcfg_core::document::ConfigDocument;
use brandcfg_core::kinds::ConfigKind;
use brandcfg_core::project_files::{self, PackageManifest, PlatformEntry};
use brandcfg_saga::{codec, fsops, FileLocks, FsRollback, Orchestrator};
use brandcfg_website::configs::NovelConfigService;
use brandcfg_website::ProjectFileService;
use common::Fixture;
use tokio::sync::oneshot;

fn entry(host: &str) -> PlatformEntry {
    PlatformEntry {
        brand: "acme".into(),
        host: host.into(),
        app_name: "Acme Reader".into(),
    }
}

#[tokio::test]
async fn unregister_waits_for_pending_registration_on_shared_files() {
    let fx = Fixture::new().await;
    let locks = FileLocks::new();
    let service = ProjectFileService::new(fx.layout.clone());

    let mut setup = FsRollback::new(locks.clone());
    service
        .register_platform(&mut setup, &entry("h5"), "/acme-h5/")
        .await
        .unwrap();
    setup.clear().await;

    let vite = fx.layout.vite_config_file.clone();
    let (staged_tx, staged_rx) = oneshot::channel::<()>();

    let register = {
        let mut files = FsRollback::new(locks.clone());
        let vite = vite.clone();
        async move {
            files.stage(&vite).await.unwrap();
            let _ = staged_tx.send(());
            tokio::time::sleep(Duration::from_millis(50)).await;
            let source = tokio::fs::read_to_string(&vite).await.unwrap();
            let updated = project_files::add_base_path(&source, "ksh5-acme", "/acme-ksh5/")
                .unwrap()
                .unwrap();
            fsops::write_atomic(&vite, updated.as_bytes()).await.unwrap();
            files.clear().await;
        }
    };
    let unregister = {
        let mut files = FsRollback::new(locks.clone());
        let service = service.clone();
        async move {
            let _ = staged_rx.await;
            service
                .unregister_platform(&mut files, "acme", "h5")
                .await
                .unwrap();
            files.clear().await;
        }
    };
    tokio::join!(register, unregister);

    let source = fx.read(&vite).await;
    assert_eq!(project_files::base_path_entry(&source, "h5-acme").unwrap(), None);
    assert_eq!(
        project_files::base_path_entry(&source, "ksh5-acme").unwrap().as_deref(),
        Some("/acme-ksh5/")
    );
    assert!(project_files::base_path_entry(&source, "h5-jinse").unwrap().is_some());
    assert_eq!(locks.active(), 0);
}

#[tokio::test]
async fn unregister_after_rolled_back_registration_keeps_other_entries() {
    let fx = Fixture::new().await;
    let locks = FileLocks::new();
    let service = ProjectFileService::new(fx.layout.clone());
    let package_before = fx.read(&fx.layout.package_file).await;

    let mut failed = FsRollback::new(locks.clone());
    service
        .register_platform(&mut failed, &entry("h5"), "/acme-h5/")
        .await
        .unwrap();
    failed.undo().await.unwrap();

    let mut files = FsRollback::new(locks.clone());
    service
        .unregister_platform(&mut files, "acme", "h5")
        .await
        .unwrap();
    files.clear().await;

    let package = PackageManifest::parse(&fx.read(&fx.layout.package_file).await).unwrap();
    assert!(package.has_platform("h5-jinse"));
    assert!(!package.has_platform("h5-acme"));
    let before: serde_json::Value = serde_json::from_str(&package_before).unwrap();
    let after: serde_json::Value =
        serde_json::from_str(&fx.read(&fx.layout.package_file).await).unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn brand_removal_waits_for_writer_creating_novel_file() {
    let fx = Fixture::new().await;
    let orchestrator = Orchestrator::new(fx.pool.clone());
    let locks = orchestrator.locks().clone();
    let novel = NovelConfigService::new(orchestrator, fx.layout.clone());
    let path = fx.layout.config_file(ConfigKind::Novel, "acme");
    tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
    let (staged_tx, staged_rx) = oneshot::channel::<()>();

    let writer = {
        let mut files = FsRollback::new(locks.clone());
        let path = path.clone();
        async move {
            files.stage(&path).await.unwrap();
            let _ = staged_tx.send(());
            tokio::time::sleep(Duration::from_millis(50)).await;
            let doc = ConfigDocument::parse(r#"export default {"acme": {"tth5": {"x": 1}}}"#).unwrap();
            codec::write(&doc, &path).await.unwrap();
            files.clear().await;
        }
    };
    let remover = {
        let mut files = FsRollback::new(locks.clone());
        async move {
            let _ = staged_rx.await;
            let removed = novel.remove_brand(&mut files, "acme").await.unwrap();
            files.clear().await;
            removed
        }
    };
    let ((), removed) = tokio::join!(writer, remover);

    assert!(removed);
    let doc = codec::read(&path).await.unwrap();
    assert!(!doc.contains_key("acme"));
}
