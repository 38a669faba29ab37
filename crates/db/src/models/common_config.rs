use brandcfg_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `common_configs` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CommonConfig {
    pub id: DbId,
    pub client_id: DbId,
    pub deliver_business_id_enable: bool,
    pub deliver_business_id: String,
    pub deliver_switch_id_enable: bool,
    pub deliver_switch_id: String,
    pub protocol_company: String,
    pub protocol_about: String,
    pub protocol_privacy: String,
    pub protocol_vod: String,
    pub protocol_user_cancel: String,
    pub contact_url: String,
    pub script_base: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for creating or fully replacing a common config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateCommonConfig {
    pub deliver_business_id_enable: bool,
    pub deliver_business_id: String,
    pub deliver_switch_id_enable: bool,
    pub deliver_switch_id: String,
    pub protocol_company: String,
    pub protocol_about: String,
    pub protocol_privacy: String,
    pub protocol_vod: String,
    pub protocol_user_cancel: String,
    pub contact_url: String,
    /// Public base path of the built site, e.g. `/acme/`.
    pub script_base: String,
}
