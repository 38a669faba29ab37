use std::sync::Arc;

use async_trait::async_trait;
use brandcfg_core::config::FileLayout;
use brandcfg_core::document::ConfigValue;
use brandcfg_core::error::CoreError;
use brandcfg_core::kinds::ConfigKind;
use brandcfg_core::progress::ProgressSink;
use brandcfg_core::types::DbId;
use brandcfg_db::models::client::ClientWithBrand;
use brandcfg_db::models::pay_config::{CreatePayConfig, PayConfig};
use brandcfg_db::repositories::PayConfigRepo;
use brandcfg_saga::{Orchestrator, TransactionContext};
use serde_json::json;

use super::{find_client, read_channel, remove_channel, write_channel, ConfigStep};
use crate::error::WebsiteError;

const KIND: ConfigKind = ConfigKind::Pay;

/// Payment gateways of one channel.
#[derive(Clone)]
pub struct PayConfigService {
    orchestrator: Orchestrator,
    layout: Arc<FileLayout>,
}

/// An enabled payment mode needs both gateway ids set and positive.
pub fn validate(config: &CreatePayConfig) -> Result<(), CoreError> {
    check_gateways(
        "normal pay",
        config.normal_pay_enable,
        config.normal_pay_gateway_android,
        config.normal_pay_gateway_ios,
    )?;
    check_gateways(
        "renew pay",
        config.renew_pay_enable,
        config.renew_pay_gateway_android,
        config.renew_pay_gateway_ios,
    )
}

fn check_gateways(
    mode: &str,
    enabled: bool,
    android: Option<i64>,
    ios: Option<i64>,
) -> Result<(), CoreError> {
    if !enabled {
        return Ok(());
    }
    let positive = |id: Option<i64>| id.is_some_and(|id| id > 0);
    if positive(android) && positive(ios) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "{mode} is enabled but its android/ios gateway ids are not set"
        )))
    }
}

impl PayConfigService {
    pub fn new(orchestrator: Orchestrator, layout: Arc<FileLayout>) -> Self {
        Self {
            orchestrator,
            layout,
        }
    }

    pub fn format(config: &CreatePayConfig) -> ConfigValue {
        ConfigValue::from(json!({
            "normal_pay": {
                "enable": config.normal_pay_enable,
                "gateway_id": {
                    "android": config.normal_pay_gateway_android,
                    "ios": config.normal_pay_gateway_ios,
                },
            },
            "renew_pay": {
                "enable": config.renew_pay_enable,
                "gateway_id": {
                    "android": config.renew_pay_gateway_android,
                    "ios": config.renew_pay_gateway_ios,
                },
            },
        }))
    }

    pub async fn update_by_client(
        &self,
        client_id: DbId,
        input: CreatePayConfig,
        sink: Option<Arc<dyn ProgressSink>>,
    ) -> Result<PayConfig, WebsiteError> {
        validate(&input)?;
        let this = self.clone();
        let row = self
            .orchestrator
            .execute("Update pay config", sink, move |ctx| {
                Box::pin(async move {
                    let client = find_client(&mut ctx.tx, client_id).await?;
                    let row = match PayConfigRepo::update_by_client(&mut ctx.tx, client_id, &input).await? {
                        Some(row) => row,
                        None => PayConfigRepo::create(&mut ctx.tx, client_id, &input).await?,
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
            .execute("Delete pay config", sink, move |ctx| {
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
impl ConfigStep for PayConfigService {
    type Input = CreatePayConfig;

    fn kind(&self) -> ConfigKind {
        KIND
    }

    async fn create(
        &self,
        ctx: &mut TransactionContext,
        client: &ClientWithBrand,
        input: &CreatePayConfig,
    ) -> Result<DbId, WebsiteError> {
        validate(input)?;
        let row = PayConfigRepo::create(&mut ctx.tx, client.id, input).await?;

        let path = self.layout.config_file(KIND, &client.brand_code);
        let slot = KIND.slot(&client.brand_code, &client.host);
        write_channel(&mut ctx.files, &path, &slot, Self::format(input)).await?;

        tracing::info!(brand = %client.brand_code, host = %client.host, id = row.id, "Pay config created");
        Ok(row.id)
    }

    async fn delete(
        &self,
        ctx: &mut TransactionContext,
        client: &ClientWithBrand,
    ) -> Result<bool, WebsiteError> {
        let deleted = PayConfigRepo::delete_by_client(&mut ctx.tx, client.id).await?;
        let path = self.layout.config_file(KIND, &client.brand_code);
        remove_channel(&mut ctx.files, &path, &KIND.slot(&client.brand_code, &client.host)).await?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn disabled_modes_need_no_gateways() {
        assert!(validate(&CreatePayConfig::default()).is_ok());
    }

    #[test]
    fn enabled_mode_requires_both_gateways() {
        let input = CreatePayConfig {
            normal_pay_enable: true,
            normal_pay_gateway_android: Some(12),
            normal_pay_gateway_ios: None,
            ..Default::default()
        };
        assert_matches!(validate(&input), Err(CoreError::Validation(msg)) if msg.starts_with("normal pay"));

        let input = CreatePayConfig {
            renew_pay_enable: true,
            renew_pay_gateway_android: Some(3),
            renew_pay_gateway_ios: Some(0),
            ..Default::default()
        };
        assert_matches!(validate(&input), Err(CoreError::Validation(msg)) if msg.starts_with("renew pay"));
    }

    #[test]
    fn format_writes_null_for_unset_gateways() {
        let value = serde_json::Value::from(PayConfigService::format(&CreatePayConfig {
            normal_pay_enable: true,
            normal_pay_gateway_android: Some(11),
            normal_pay_gateway_ios: Some(12),
            ..Default::default()
        }));
        assert_eq!(
            value,
            json!({
                "normal_pay": {"enable": true, "gateway_id": {"android": 11, "ios": 12}},
                "renew_pay": {"enable": false, "gateway_id": {"android": null, "ios": null}},
            })
        );
    }
}
