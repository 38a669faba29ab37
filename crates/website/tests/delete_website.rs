mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use brandcfg_core::document::{ChannelSlot, ConfigDocument};
use brandcfg_core::kinds::ConfigKind;
use brandcfg_core::progress::{FnSink, ProgressEvent, ProgressSink, ProgressStatus};
use brandcfg_core::project_files::{self, PackageManifest};
use brandcfg_core::types::DbId;
use brandcfg_db::models::client::ClientWithBrand;
use brandcfg_db::models::novel_config::CreateNovelConfig;
use brandcfg_db::repositories::{BaseConfigRepo, BrandRepo, ClientRepo};
use brandcfg_saga::{Orchestrator, TransactionContext};
use brandcfg_website::{ConfigStep, ConfigSteps, WebsiteError, WebsiteService};
use common::{drain, recorder, request, Fixture};
use tokio_util::sync::CancellationToken;

async fn create(fx: &Fixture, brand_id: i64, host: &str) -> i64 {
    fx.service()
        .create_website(request(brand_id, host), None, CancellationToken::new())
        .await
        .unwrap()
        .client_id
}

#[tokio::test]
async fn shared_brand_files_survive_until_last_website() {
    let fx = Fixture::new().await;
    let brand = fx.seed_brand("acme").await;
    let h5 = create(&fx, brand.id, "h5").await;
    let ksh5 = create(&fx, brand.id, "ksh5").await;
    let service = fx.service();

    let deleted = service
        .delete_website(h5, None, CancellationToken::new())
        .await
        .unwrap();
    assert!(!deleted.brand_removed);
    assert_eq!(deleted.host, "h5");

    let base_path = fx.layout.config_file(ConfigKind::Base, "acme");
    let base = ConfigDocument::parse(&fx.read(&base_path).await).unwrap();
    assert_eq!(base.keys().collect::<Vec<_>>(), vec!["ksh5"]);

    let vite = fx.read(&fx.layout.vite_config_file).await;
    assert_eq!(project_files::base_path_entry(&vite, "h5-acme").unwrap(), None);
    assert!(project_files::base_path_entry(&vite, "ksh5-acme").unwrap().is_some());
    let package = PackageManifest::parse(&fx.read(&fx.layout.package_file).await).unwrap();
    assert!(!package.has_platform("h5-acme"));
    assert!(package.has_platform("ksh5-acme"));

    assert!(!fx.layout.pages_file("acme", "h5").exists());
    assert!(fx.layout.pages_file("acme", "ksh5").exists());
    assert!(fx.layout.static_brand_dir("acme").exists());

    let mut conn = fx.pool.acquire().await.unwrap();
    assert!(ClientRepo::find_by_id(&mut conn, h5).await.unwrap().is_none());
    assert!(BaseConfigRepo::find_by_client(&mut conn, h5).await.unwrap().is_none());
    drop(conn);

    let (sink, mut rx) = recorder();
    let deleted = service
        .delete_website(ksh5, Some(sink), CancellationToken::new())
        .await
        .unwrap();
    assert!(deleted.brand_removed);

    for path in fx.layout.brand_config_files("acme") {
        assert!(!path.exists(), "{}", path.display());
    }
    assert!(!fx.layout.prebuild_brand_dir("acme").exists());
    assert!(!fx.layout.static_brand_dir("acme").exists());
    assert!(fx.layout.static_template_dir().join("logo.png").exists());

    let package = PackageManifest::parse(&fx.read(&fx.layout.package_file).await).unwrap();
    assert!(package.has_platform("h5-jinse"));
    assert!(!package.has_platform("ksh5-acme"));

    let mut conn = fx.pool.acquire().await.unwrap();
    assert!(BrandRepo::find_by_id(&mut conn, brand.id).await.unwrap().is_none());

    let events = drain(&mut rx);
    assert_eq!(events.last().unwrap().status, ProgressStatus::Success);
    assert!(events
        .iter()
        .any(|e| e.text.contains("No websites left for acme")));
}

#[tokio::test]
async fn last_website_prunes_only_its_novel_brand() {
    let fx = Fixture::new().await;
    let acme = fx.seed_brand("acme").await;
    let globex = fx.seed_brand("globex").await;
    let acme_client = create(&fx, acme.id, "tth5").await;
    create(&fx, globex.id, "tth5").await;

    fx.service()
        .delete_website(acme_client, None, CancellationToken::new())
        .await
        .unwrap();

    let novel = ConfigDocument::parse(&fx.read(&fx.layout.config_file(ConfigKind::Novel, "acme")).await).unwrap();
    assert_eq!(novel.keys().collect::<Vec<_>>(), vec!["globex"]);
    assert!(novel
        .channel(&ChannelSlot::Nested {
            brand: "globex".into(),
            host: "tth5".into()
        })
        .is_some());
}

#[tokio::test]
async fn deleting_only_website_restores_project_files() {
    let fx = Fixture::new().await;
    let brand = fx.seed_brand("acme").await;
    let vite_before = fx.read(&fx.layout.vite_config_file).await;
    let package_before: serde_json::Value =
        serde_json::from_str(&fx.read(&fx.layout.package_file).await).unwrap();

    let client = create(&fx, brand.id, "h5").await;
    fx.service()
        .delete_website(client, None, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(fx.read(&fx.layout.vite_config_file).await, vite_before);
    let package_after: serde_json::Value =
        serde_json::from_str(&fx.read(&fx.layout.package_file).await).unwrap();
    assert_eq!(package_after, package_before);
    assert!(!fx.layout.static_brand_dir("acme").exists());
}

#[tokio::test]
async fn unknown_client_is_not_found() {
    let fx = Fixture::new().await;
    let before = fx.snapshot().await;
    let (sink, mut rx) = recorder();

    let err = fx
        .service()
        .delete_website(404, Some(sink), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(fx.snapshot().await, before);
    assert_eq!(drain(&mut rx).last().unwrap().status, ProgressStatus::Failed);
}

/// A novel step that never touches the shared novel file.
struct NoNovel;

#[async_trait]
impl ConfigStep for NoNovel {
    type Input = CreateNovelConfig;

    fn kind(&self) -> ConfigKind {
        ConfigKind::Novel
    }

    async fn create(
        &self,
        _ctx: &mut TransactionContext,
        _client: &ClientWithBrand,
        _input: &CreateNovelConfig,
    ) -> Result<DbId, WebsiteError> {
        Ok(0)
    }

    async fn delete(
        &self,
        _ctx: &mut TransactionContext,
        _client: &ClientWithBrand,
    ) -> Result<bool, WebsiteError> {
        Ok(false)
    }
}

#[tokio::test]
async fn late_failure_restores_removed_brand_directories() {
    let fx = Fixture::new().await;
    let brand = fx.seed_brand("acme").await;
    let client = create(&fx, brand.id, "h5").await;

    let host_dir = fx.layout.prebuild_host_dir("acme", "h5");
    tokio::fs::create_dir_all(&host_dir).await.unwrap();
    tokio::fs::write(host_dir.join("index.html"), "<html></html>").await.unwrap();
    tokio::fs::write(fx.layout.static_brand_dir("acme").join("custom.png"), b"custom")
        .await
        .unwrap();

    // The shared novel file is unreadable, so pruning the brand from it fails
    // after every brand directory has already been removed.
    let novel = fx.layout.config_file(ConfigKind::Novel, "acme");
    tokio::fs::create_dir_all(novel.parent().unwrap()).await.unwrap();
    tokio::fs::write(&novel, "export default { broken").await.unwrap();
    let before = fx.snapshot().await;

    let orchestrator = Orchestrator::new(fx.pool.clone());
    let mut steps = ConfigSteps::standard(&orchestrator, fx.layout.clone());
    steps.novel = Arc::new(NoNovel);
    let service = WebsiteService::with_steps(orchestrator, fx.layout.clone(), steps);
    let (sink, mut rx) = recorder();

    let err = service
        .delete_website(client, Some(sink), CancellationToken::new())
        .await
        .unwrap_err();
    assert_matches!(&err, WebsiteError::Saga(saga) if !saga.rollback_incomplete());

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| e.percentage == Some(90)));
    assert_eq!(events.last().unwrap().status, ProgressStatus::Failed);

    assert_eq!(fx.snapshot().await, before);
    assert_eq!(fx.read(&host_dir.join("index.html")).await, "<html></html>");
    assert!(fx.layout.pages_file("acme", "h5").exists());
    assert!(fx.layout.manifest_file("acme").exists());
    assert!(fx.layout.static_brand_dir("acme").join("custom.png").exists());

    let mut conn = fx.pool.acquire().await.unwrap();
    assert!(ClientRepo::find_by_id(&mut conn, client).await.unwrap().is_some());
    assert!(BrandRepo::find_by_id(&mut conn, brand.id).await.unwrap().is_some());
}

#[tokio::test]
async fn cancelled_delete_restores_prebuild_channel_directory() {
    let fx = Fixture::new().await;
    let brand = fx.seed_brand("acme").await;
    let client = create(&fx, brand.id, "h5").await;
    let host_dir = fx.layout.prebuild_host_dir("acme", "h5");
    tokio::fs::create_dir_all(&host_dir).await.unwrap();
    tokio::fs::write(host_dir.join("index.html"), "<html></html>").await.unwrap();
    let before = fx.snapshot().await;

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let sink: Arc<dyn ProgressSink> = Arc::new(FnSink(move |event: ProgressEvent| {
        if event.percentage == Some(80) {
            token.cancel();
        }
    }));

    let err = fx
        .service()
        .delete_website(client, Some(sink), cancel)
        .await
        .unwrap_err();
    assert_matches!(err.root(), WebsiteError::Cancelled);
    assert_eq!(fx.snapshot().await, before);
    assert!(host_dir.join("index.html").exists());
}
