use brandcfg_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `pay_configs` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PayConfig {
    pub id: DbId,
    pub client_id: DbId,
    pub normal_pay_enable: bool,
    pub normal_pay_gateway_android: Option<i64>,
    pub normal_pay_gateway_ios: Option<i64>,
    pub renew_pay_enable: bool,
    pub renew_pay_gateway_android: Option<i64>,
    pub renew_pay_gateway_ios: Option<i64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for creating or fully replacing a pay config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreatePayConfig {
    pub normal_pay_enable: bool,
    pub normal_pay_gateway_android: Option<i64>,
    pub normal_pay_gateway_ios: Option<i64>,
    pub renew_pay_enable: bool,
    pub renew_pay_gateway_android: Option<i64>,
    pub renew_pay_gateway_ios: Option<i64>,
}
