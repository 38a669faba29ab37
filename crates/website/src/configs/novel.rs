//! Novel config: mini-program jump and login callback settings.
//!
//! Unlike the other kinds, every brand shares one `novelConfig.js`, keyed
//! `{brand: {host: config}}`. Removing a brand's last channel drops its
//! entry; [`NovelConfigService::remove_brand`] drops it outright.

use std::sync::Arc;

use async_trait::async_trait;
use brandcfg_core::config::FileLayout;
use brandcfg_core::document::ConfigValue;
use brandcfg_core::error::CoreError;
use brandcfg_core::kinds::ConfigKind;
use brandcfg_core::progress::ProgressSink;
use brandcfg_core::types::DbId;
use brandcfg_db::models::client::ClientWithBrand;
use brandcfg_db::models::novel_config::{CreateNovelConfig, NovelConfig};
use brandcfg_db::repositories::NovelConfigRepo;
use brandcfg_saga::{codec, FsRollback, Orchestrator, TransactionContext};
use serde_json::json;

use super::{find_client, read_channel, remove_channel, write_channel, ConfigStep};
use crate::error::WebsiteError;

const KIND: ConfigKind = ConfigKind::Novel;

#[derive(Clone)]
pub struct NovelConfigService {
    orchestrator: Orchestrator,
    layout: Arc<FileLayout>,
}

/// Both fields must be set when a channel requires a novel config.
pub fn validate_required(config: &CreateNovelConfig) -> Result<(), CoreError> {
    if config.tt_jump_home_url.is_empty() {
        return Err(CoreError::Validation("tt_jump_home_url is required".into()));
    }
    if config.tt_login_callback_domain.is_empty() {
        return Err(CoreError::Validation("tt_login_callback_domain is required".into()));
    }
    Ok(())
}

impl NovelConfigService {
    pub fn new(orchestrator: Orchestrator, layout: Arc<FileLayout>) -> Self {
        Self {
            orchestrator,
            layout,
        }
    }

    pub fn format(config: &CreateNovelConfig) -> ConfigValue {
        ConfigValue::from(json!({
            "tt_jump_home_url": config.tt_jump_home_url,
            "tt_login_callback_domain": config.tt_login_callback_domain,
        }))
    }

    pub async fn update_by_client(
        &self,
        client_id: DbId,
        input: CreateNovelConfig,
        sink: Option<Arc<dyn ProgressSink>>,
    ) -> Result<NovelConfig, WebsiteError> {
        let this = self.clone();
        let row = self
            .orchestrator
            .execute("Update novel config", sink, move |ctx| {
                Box::pin(async move {
                    let client = find_client(&mut ctx.tx, client_id).await?;
                    let row = match NovelConfigRepo::update_by_client(&mut ctx.tx, client_id, &input).await? {
                        Some(row) => row,
                        None => NovelConfigRepo::create(&mut ctx.tx, client_id, &input).await?,
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
            .execute("Delete novel config", sink, move |ctx| {
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

    /// Drop the whole `brand` entry from the shared file. Returns whether
    /// an entry was present.
    pub async fn remove_brand(&self, files: &mut FsRollback, brand: &str) -> Result<bool, WebsiteError> {
        let path = self.layout.config_file(KIND, brand);
        files.lock(&path).await;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(false);
        }

        files.stage(&path).await?;
        let mut doc = codec::read(&path).await?;
        if doc.remove(brand).is_none() {
            return Ok(false);
        }
        codec::write(&doc, &path).await?;
        tracing::info!(brand, "Removed brand from novel config");
        Ok(true)
    }
}

#[async_trait]
impl ConfigStep for NovelConfigService {
    type Input = CreateNovelConfig;

    fn kind(&self) -> ConfigKind {
        KIND
    }

    async fn create(
        &self,
        ctx: &mut TransactionContext,
        client: &ClientWithBrand,
        input: &CreateNovelConfig,
    ) -> Result<DbId, WebsiteError> {
        let row = NovelConfigRepo::create(&mut ctx.tx, client.id, input).await?;

        let path = self.layout.config_file(KIND, &client.brand_code);
        let slot = KIND.slot(&client.brand_code, &client.host);
        write_channel(&mut ctx.files, &path, &slot, Self::format(input)).await?;

        tracing::info!(brand = %client.brand_code, host = %client.host, id = row.id, "Novel config created");
        Ok(row.id)
    }

    async fn delete(
        &self,
        ctx: &mut TransactionContext,
        client: &ClientWithBrand,
    ) -> Result<bool, WebsiteError> {
        let deleted = NovelConfigRepo::delete_by_client(&mut ctx.tx, client.id).await?;
        if !deleted {
            tracing::debug!(client_id = client.id, "No novel config row to delete");
        }
        let path = self.layout.config_file(KIND, &client.brand_code);
        remove_channel(&mut ctx.files, &path, &KIND.slot(&client.brand_code, &client.host)).await?;
        Ok(deleted)
    }
}
