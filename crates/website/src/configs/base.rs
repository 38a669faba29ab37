//! Base config: app identity of one channel.

use std::sync::Arc;

use async_trait::async_trait;
use brandcfg_core::config::FileLayout;
use brandcfg_core::document::ConfigValue;
use brandcfg_core::kinds::ConfigKind;
use brandcfg_core::progress::ProgressSink;
use brandcfg_core::types::DbId;
use brandcfg_db::models::base_config::{BaseConfig, CreateBaseConfig};
use brandcfg_db::models::client::ClientWithBrand;
use brandcfg_db::repositories::BaseConfigRepo;
use brandcfg_saga::{Orchestrator, TransactionContext};
use serde_json::json;
use validator::Validate;

use super::{find_client, read_channel, remove_channel, write_channel, ConfigStep};
use crate::error::WebsiteError;

const KIND: ConfigKind = ConfigKind::Base;

#[derive(Clone)]
pub struct BaseConfigService {
    orchestrator: Orchestrator,
    layout: Arc<FileLayout>,
}

impl BaseConfigService {
    pub fn new(orchestrator: Orchestrator, layout: Arc<FileLayout>) -> Self {
        Self {
            orchestrator,
            layout,
        }
    }

    /// Channel value written to `baseConfigs/{brand}.js`.
    pub fn format(config: &CreateBaseConfig) -> ConfigValue {
        ConfigValue::from(json!({
            "app_name": config.app_name,
            "platform": config.platform,
            "app_code": config.app_code,
            "product": config.product,
            "customer": config.customer,
            "appid": config.appid,
            "version": config.version,
            "cl": config.cl,
            "uc": config.uc,
        }))
    }

    /// Replace the client's base config (creating it if absent) and rewrite
    /// its channel, as one orchestrated operation.
    pub async fn update_by_client(
        &self,
        client_id: DbId,
        input: CreateBaseConfig,
        sink: Option<Arc<dyn ProgressSink>>,
    ) -> Result<BaseConfig, WebsiteError> {
        input.validate()?;
        let this = self.clone();
        let row = self
            .orchestrator
            .execute("Update base config", sink, move |ctx| {
                Box::pin(async move { this.apply_update(ctx, client_id, &input).await })
            })
            .await?;
        Ok(row)
    }

    /// Delete the client's base config row and channel as one orchestrated
    /// operation.
    pub async fn delete_by_client(
        &self,
        client_id: DbId,
        sink: Option<Arc<dyn ProgressSink>>,
    ) -> Result<bool, WebsiteError> {
        let this = self.clone();
        let deleted = self
            .orchestrator
            .execute("Delete base config", sink, move |ctx| {
                Box::pin(async move {
                    let client = find_client(&mut ctx.tx, client_id).await?;
                    this.delete(ctx, &client).await
                })
            })
            .await?;
        Ok(deleted)
    }

    /// The client's channel as currently written on disk.
    pub async fn channel_config(&self, client_id: DbId) -> Result<ConfigValue, WebsiteError> {
        let mut conn = self.orchestrator.pool().acquire().await?;
        let client = find_client(&mut conn, client_id).await?;
        read_channel(&self.layout, KIND, &client.brand_code, &client.host).await
    }

    async fn apply_update(
        &self,
        ctx: &mut TransactionContext,
        client_id: DbId,
        input: &CreateBaseConfig,
    ) -> Result<BaseConfig, WebsiteError> {
        let client = find_client(&mut ctx.tx, client_id).await?;
        let row = match BaseConfigRepo::update_by_client(&mut ctx.tx, client_id, input).await? {
            Some(row) => row,
            None => BaseConfigRepo::create(&mut ctx.tx, client_id, input).await?,
        };

        let path = self.layout.config_file(KIND, &client.brand_code);
        let slot = KIND.slot(&client.brand_code, &client.host);
        write_channel(&mut ctx.files, &path, &slot, Self::format(input)).await?;

        tracing::info!(brand = %client.brand_code, host = %client.host, "Base config updated");
        Ok(row)
    }
}

#[async_trait]
impl ConfigStep for BaseConfigService {
    type Input = CreateBaseConfig;

    fn kind(&self) -> ConfigKind {
        KIND
    }

    async fn create(
        &self,
        ctx: &mut TransactionContext,
        client: &ClientWithBrand,
        input: &CreateBaseConfig,
    ) -> Result<DbId, WebsiteError> {
        input.validate()?;
        let row = BaseConfigRepo::create(&mut ctx.tx, client.id, input).await?;

        let path = self.layout.config_file(KIND, &client.brand_code);
        let slot = KIND.slot(&client.brand_code, &client.host);
        write_channel(&mut ctx.files, &path, &slot, Self::format(input)).await?;

        tracing::info!(brand = %client.brand_code, host = %client.host, id = row.id, "Base config created");
        Ok(row.id)
    }

    async fn delete(
        &self,
        ctx: &mut TransactionContext,
        client: &ClientWithBrand,
    ) -> Result<bool, WebsiteError> {
        let deleted = BaseConfigRepo::delete_by_client(&mut ctx.tx, client.id).await?;
        let path = self.layout.config_file(KIND, &client.brand_code);
        remove_channel(&mut ctx.files, &path, &KIND.slot(&client.brand_code, &client.host)).await?;
        Ok(deleted)
    }
}
