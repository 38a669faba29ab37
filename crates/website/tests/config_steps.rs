mod common;

use assert_matches::assert_matches;
use brandcfg_core::document::{ChannelSlot, ConfigDocument};
use brandcfg_core::error::CoreError;
use brandcfg_core::kinds::ConfigKind;
use brandcfg_core::progress::ProgressStatus;
use brandcfg_db::models::pay_config::CreatePayConfig;
use brandcfg_db::models::ui_config::CreateUiConfig;
use brandcfg_db::repositories::{PayConfigRepo, UiConfigRepo};
use brandcfg_website::configs::{BaseConfigService, PayConfigService, UiConfigService};
use brandcfg_website::WebsiteError;
use common::{drain, recorder, request, Fixture};
use tokio_util::sync::CancellationToken;

async fn website(fx: &Fixture, host: &str) -> i64 {
    let brand = fx.seed_brand("acme").await;
    fx.service()
        .create_website(request(brand.id, host), None, CancellationToken::new())
        .await
        .unwrap()
        .client_id
}

#[tokio::test]
async fn ui_update_rewrites_channel_and_row() {
    let fx = Fixture::new().await;
    let client = website(&fx, "h5").await;
    let service = fx.service();
    let ui = UiConfigService::new(service.orchestrator().clone(), fx.layout.clone());
    let (sink, mut rx) = recorder();

    let row = ui
        .update_by_client(
            client,
            CreateUiConfig {
                theme_bg_main: "#000000".into(),
                theme_bg_second: "#111111".into(),
                theme_text_main: Some("#eeeeee".into()),
            },
            Some(sink),
        )
        .await
        .unwrap();
    assert_eq!(row.theme_bg_main, "#000000");

    let channel = ui.channel_config(client).await.unwrap();
    assert_eq!(channel.get("bgStyle").unwrap().get("main").unwrap().as_str(), Some("#000000"));
    assert_eq!(channel.get("textColor").unwrap().get("main").unwrap().as_str(), Some("#eeeeee"));

    let mut conn = fx.pool.acquire().await.unwrap();
    let stored = UiConfigRepo::find_by_client(&mut conn, client).await.unwrap().unwrap();
    assert_eq!(stored.theme_text_main.as_deref(), Some("#eeeeee"));

    let events = drain(&mut rx);
    assert_eq!(events.last().unwrap().status, ProgressStatus::Success);
    assert_eq!(events.last().unwrap().text, "Update UI config completed");
}

#[tokio::test]
async fn ui_update_without_text_color_drops_it() {
    let fx = Fixture::new().await;
    let client = website(&fx, "h5").await;
    let ui = UiConfigService::new(fx.service().orchestrator().clone(), fx.layout.clone());

    ui.update_by_client(
        client,
        CreateUiConfig {
            theme_bg_main: "#000000".into(),
            theme_bg_second: "#111111".into(),
            theme_text_main: None,
        },
        None,
    )
    .await
    .unwrap();

    let channel = ui.channel_config(client).await.unwrap();
    assert!(channel.get("textColor").is_none());
}

#[tokio::test]
async fn invalid_base_update_changes_nothing() {
    let fx = Fixture::new().await;
    let client = website(&fx, "h5").await;
    let before = fx.snapshot().await;
    let base = BaseConfigService::new(fx.service().orchestrator().clone(), fx.layout.clone());

    let mut input = request(1, "h5").base_config;
    input.app_name.clear();
    input.cl.clear();

    let err = base.update_by_client(client, input, None).await.unwrap_err();
    assert_matches!(
        err,
        WebsiteError::Core(CoreError::Validation(msg)) if msg == "app_name is required, cl is required"
    );
    assert_eq!(fx.snapshot().await, before);
}

#[tokio::test]
async fn pay_update_rejects_enabled_mode_without_gateways() {
    let fx = Fixture::new().await;
    let client = website(&fx, "h5").await;
    let pay = PayConfigService::new(fx.service().orchestrator().clone(), fx.layout.clone());

    let err = pay
        .update_by_client(
            client,
            CreatePayConfig {
                renew_pay_enable: true,
                renew_pay_gateway_android: Some(3),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap_err();
    assert_matches!(err, WebsiteError::Core(CoreError::Validation(_)));
}

#[tokio::test]
async fn pay_delete_removes_row_and_channel() {
    let fx = Fixture::new().await;
    let client = website(&fx, "h5").await;
    let pay = PayConfigService::new(fx.service().orchestrator().clone(), fx.layout.clone());

    assert!(pay.delete_by_client(client, None).await.unwrap());

    let path = fx.layout.config_file(ConfigKind::Pay, "acme");
    let doc = ConfigDocument::parse(&fx.read(&path).await).unwrap();
    assert!(doc.channel(&ChannelSlot::Flat { host: "h5".into() }).is_none());

    let mut conn = fx.pool.acquire().await.unwrap();
    assert!(PayConfigRepo::find_by_client(&mut conn, client).await.unwrap().is_none());
    drop(conn);

    // A second delete finds no row and leaves the document alone.
    assert!(!pay.delete_by_client(client, None).await.unwrap());
    let err = pay.channel_config(client).await.unwrap_err();
    assert_matches!(err, WebsiteError::Core(CoreError::ChannelNotFound { .. }));
}

#[tokio::test]
async fn standalone_update_for_unknown_client_is_not_found() {
    let fx = Fixture::new().await;
    let before = fx.snapshot().await;
    let ui = UiConfigService::new(fx.service().orchestrator().clone(), fx.layout.clone());

    let err = ui
        .update_by_client(
            77,
            CreateUiConfig {
                theme_bg_main: "#000000".into(),
                theme_bg_second: "#111111".into(),
                theme_text_main: None,
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(fx.snapshot().await, before);
}
