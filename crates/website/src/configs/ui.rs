use std::sync::Arc;

use async_trait::async_trait;
use brandcfg_core::config::FileLayout;
use brandcfg_core::document::{ConfigMap, ConfigValue};
use brandcfg_core::kinds::ConfigKind;
use brandcfg_core::progress::ProgressSink;
use brandcfg_core::types::DbId;
use brandcfg_db::models::client::ClientWithBrand;
use brandcfg_db::models::ui_config::{CreateUiConfig, UiConfig};
use brandcfg_db::repositories::UiConfigRepo;
use brandcfg_saga::{Orchestrator, TransactionContext};
use serde_json::json;

use super::{find_client, read_channel, remove_channel, write_channel, ConfigStep};
use crate::error::WebsiteError;

const KIND: ConfigKind = ConfigKind::Ui;

/// Theme colors of one channel.
#[derive(Clone)]
pub struct UiConfigService {
    orchestrator: Orchestrator,
    layout: Arc<FileLayout>,
}

impl UiConfigService {
    pub fn new(orchestrator: Orchestrator, layout: Arc<FileLayout>) -> Self {
        Self {
            orchestrator,
            layout,
        }
    }

    /// `textColor` is only written when a main text color is set.
    pub fn format(config: &CreateUiConfig) -> ConfigValue {
        let mut map = ConfigMap::new();
        map.insert(
            "bgStyle".into(),
            ConfigValue::from(json!({
                "main": config.theme_bg_main,
                "second": config.theme_bg_second,
            })),
        );
        if let Some(text) = config.theme_text_main.as_deref().filter(|t| !t.is_empty()) {
            map.insert("textColor".into(), ConfigValue::from(json!({ "main": text })));
        }
        ConfigValue::Object(map)
    }

    pub async fn update_by_client(
        &self,
        client_id: DbId,
        input: CreateUiConfig,
        sink: Option<Arc<dyn ProgressSink>>,
    ) -> Result<UiConfig, WebsiteError> {
        let this = self.clone();
        let row = self
            .orchestrator
            .execute("Update UI config", sink, move |ctx| {
                Box::pin(async move {
                    let client = find_client(&mut ctx.tx, client_id).await?;
                    let row = match UiConfigRepo::update_by_client(&mut ctx.tx, client_id, &input).await? {
                        Some(row) => row,
                        None => UiConfigRepo::create(&mut ctx.tx, client_id, &input).await?,
                    };
                    let path = this.layout.config_file(KIND, &client.brand_code);
                    let slot = KIND.slot(&client.brand_code, &client.host);
                    write_channel(&mut ctx.files, &path, &slot, Self::format(&input)).await?;
                    Ok::<_, WebsiteError>(row)
                })
            })
            .await?;
        Ok(row)
    }

    pub async fn delete_by_client(
        &self,
        client_id: DbId,
        sink: Option<Arc<dyn ProgressSink>>,
    ) -> Result<bool, WebsiteError> {
        let this = self.clone();
        let deleted = self
            .orchestrator
            .execute("Delete UI config", sink, move |ctx| {
                Box::pin(async move {
                    let client = find_client(&mut ctx.tx, client_id).await?;
                    this.delete(ctx, &client).await
                })
            })
            .await?;
        Ok(deleted)
    }

    pub async fn channel_config(&self, client_id: DbId) -> Result<ConfigValue, WebsiteError> {
        let mut conn = self.orchestrator.pool().acquire().await?;
        let client = find_client(&mut conn, client_id).await?;
        read_channel(&self.layout, KIND, &client.brand_code, &client.host).await
    }
}

#[async_trait]
impl ConfigStep for UiConfigService {
    type Input = CreateUiConfig;

    fn kind(&self) -> ConfigKind {
        KIND
    }

    async fn create(
        &self,
        ctx: &mut TransactionContext,
        client: &ClientWithBrand,
        input: &CreateUiConfig,
    ) -> Result<DbId, WebsiteError> {
        let row = UiConfigRepo::create(&mut ctx.tx, client.id, input).await?;

        let path = self.layout.config_file(KIND, &client.brand_code);
        let slot = KIND.slot(&client.brand_code, &client.host);
        write_channel(&mut ctx.files, &path, &slot, Self::format(input)).await?;

        tracing::info!(brand = %client.brand_code, host = %client.host, id = row.id, "UI config created");
        Ok(row.id)
    }

    async fn delete(
        &self,
        ctx: &mut TransactionContext,
        client: &ClientWithBrand,
    ) -> Result<bool, WebsiteError> {
        let deleted = UiConfigRepo::delete_by_client(&mut ctx.tx, client.id).await?;
        let path = self.layout.config_file(KIND, &client.brand_code);
        remove_channel(&mut ctx.files, &path, &KIND.slot(&client.brand_code, &client.host)).await?;
        Ok(deleted)
    }
}
