use std::sync::Arc;

use async_trait::async_trait;
use brandcfg_core::config::FileLayout;
use brandcfg_core::document::ConfigValue;
use brandcfg_core::kinds::ConfigKind;
use brandcfg_core::progress::ProgressSink;
use brandcfg_core::types::DbId;
use brandcfg_db::models::client::ClientWithBrand;
use brandcfg_db::models::common_config::{CommonConfig, CreateCommonConfig};
use brandcfg_db::repositories::CommonConfigRepo;
use brandcfg_saga::{Orchestrator, TransactionContext};
use serde_json::json;

use super::{find_client, read_channel, remove_channel, write_channel, ConfigStep};
use crate::error::WebsiteError;

const KIND: ConfigKind = ConfigKind::Common;

/// Delivery ids, legal links and script base of one channel.
#[derive(Clone)]
pub struct CommonConfigService {
    orchestrator: Orchestrator,
    layout: Arc<FileLayout>,
}

impl CommonConfigService {
    pub fn new(orchestrator: Orchestrator, layout: Arc<FileLayout>) -> Self {
        Self {
            orchestrator,
            layout,
        }
    }

    pub fn format(config: &CreateCommonConfig) -> ConfigValue {
        ConfigValue::from(json!({
            "deliver": {
                "business_id": {
                    "value": config.deliver_business_id,
                    "enable": config.deliver_business_id_enable,
                },
                "switch_id": {
                    "value": config.deliver_switch_id,
                    "enable": config.deliver_switch_id_enable,
                },
            },
            "protocol": {
                "company": config.protocol_company,
                "about": config.protocol_about,
                "privacy": config.protocol_privacy,
                "vod": config.protocol_vod,
                "userCancel": config.protocol_user_cancel,
            },
            "contact": config.contact_url,
            "script": { "base": config.script_base },
        }))
    }

    pub async fn update_by_client(
        &self,
        client_id: DbId,
        input: CreateCommonConfig,
        sink: Option<Arc<dyn ProgressSink>>,
    ) -> Result<CommonConfig, WebsiteError> {
        let this = self.clone();
        let row = self
            .orchestrator
            .execute("Update common config", sink, move |ctx| {
                Box::pin(async move {
                    let client = find_client(&mut ctx.tx, client_id).await?;
                    let row = match CommonConfigRepo::update_by_client(&mut ctx.tx, client_id, &input).await? {
                        Some(row) => row,
                        None => CommonConfigRepo::create(&mut ctx.tx, client_id, &input).await?,
                    };
                    this.write(ctx, &client, &input).await?;
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
            .execute("Delete common config", sink, move |ctx| {
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

    async fn write(
        &self,
        ctx: &mut TransactionContext,
        client: &ClientWithBrand,
        input: &CreateCommonConfig,
    ) -> Result<(), WebsiteError> {
        let path = self.layout.config_file(KIND, &client.brand_code);
        let slot = KIND.slot(&client.brand_code, &client.host);
        write_channel(&mut ctx.files, &path, &slot, Self::format(input)).await
    }
}

#[async_trait]
impl ConfigStep for CommonConfigService {
    type Input = CreateCommonConfig;

    fn kind(&self) -> ConfigKind {
        KIND
    }

    async fn create(
        &self,
        ctx: &mut TransactionContext,
        client: &ClientWithBrand,
        input: &CreateCommonConfig,
    ) -> Result<DbId, WebsiteError> {
        let row = CommonConfigRepo::create(&mut ctx.tx, client.id, input).await?;
        self.write(ctx, client, input).await?;
        tracing::info!(brand = %client.brand_code, host = %client.host, id = row.id, "Common config created");
        Ok(row.id)
    }

    async fn delete(
        &self,
        ctx: &mut TransactionContext,
        client: &ClientWithBrand,
    ) -> Result<bool, WebsiteError> {
        let deleted = CommonConfigRepo::delete_by_client(&mut ctx.tx, client.id).await?;
        let path = self.layout.config_file(KIND, &client.brand_code);
        remove_channel(&mut ctx.files, &path, &KIND.slot(&client.brand_code, &client.host)).await?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_nests_deliver_and_protocol() {
        let value = serde_json::Value::from(CommonConfigService::format(&CreateCommonConfig {
            deliver_business_id_enable: true,
            deliver_business_id: "biz-1".into(),
            protocol_user_cancel: "https://acme.example/cancel".into(),
            contact_url: "https://acme.example/contact".into(),
            script_base: "/acme/".into(),
            ..Default::default()
        }));
        assert_eq!(value["deliver"]["business_id"], json!({"value": "biz-1", "enable": true}));
        assert_eq!(value["deliver"]["switch_id"]["enable"], false);
        assert_eq!(value["protocol"]["userCancel"], "https://acme.example/cancel");
        assert_eq!(value["contact"], "https://acme.example/contact");
        assert_eq!(value["script"]["base"], "/acme/");
    }
}
